//! C3 — System Catalog: enumerate, open, and validate on-disk systems;
//! derive the per-system action set from current mode and seeded history
//! (spec §4.3).
//!
//! Grounded on `status.rs`'s `status()` (iterate, build a small serializable
//! summary, skip what doesn't apply) for the shape of `list()`.

use std::fmt;

use anyhow::Result as AnyResult;

use crate::error::{RecoveryError, Result};
use crate::model::{Mode, System};

/// One of the five titled actions a system can expose (spec §4.3 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// "Install"
    Install,
    /// "Reinstall"
    Reinstall,
    /// "Recover"
    Recover,
    /// "Factory reset"
    FactoryReset,
    /// "Run normally"
    RunNormally,
}

impl ActionKind {
    /// The boot mode this action requests.
    pub fn mode(self) -> Mode {
        match self {
            ActionKind::Install => Mode::Install,
            ActionKind::Reinstall => Mode::Install,
            ActionKind::Recover => Mode::Recover,
            ActionKind::FactoryReset => Mode::FactoryReset,
            ActionKind::RunNormally => Mode::Run,
        }
    }

    /// The human-readable title, used verbatim in the restart log line
    /// (spec §4.4 step 7).
    pub fn title(self) -> &'static str {
        match self {
            ActionKind::Install => "Install",
            ActionKind::Reinstall => "Reinstall",
            ActionKind::Recover => "Recover",
            ActionKind::FactoryReset => "Factory reset",
            ActionKind::RunNormally => "Run normally",
        }
    }
}

/// A titled action available for a given system, as surfaced by `list()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    /// Which action this is.
    pub kind: ActionKind,
}

/// Summary of one on-disk system, as returned by [`SystemCatalog::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSummary {
    /// The on-disk label.
    pub label: String,
    /// Model name.
    pub model: String,
    /// Brand.
    pub brand: String,
    /// Whether this is the current system (spec §4.3: first entry of
    /// `seeded-systems`).
    pub current: bool,
    /// Actions available for this system in the device's current mode.
    pub actions: Vec<Action>,
}

/// Given the device's runtime mode and whether a label is the current
/// system, return the ordered action list (spec §4.3 derivation table).
/// `None` for `device_mode` means "unknown" (a legacy system); callers
/// outside the catalog reject that case before it reaches here (spec §4.4
/// step 2), so the catalog itself has no row for it.
pub fn derive_actions(device_mode: Mode, is_current: bool) -> Vec<ActionKind> {
    use ActionKind::*;
    use Mode::*;
    match (device_mode, is_current) {
        (Run, false) => vec![Install],
        (Run, true) => vec![Reinstall, Recover, FactoryReset, RunNormally],
        (Recover, false) => vec![Install],
        (Recover, true) => vec![Reinstall, FactoryReset, RunNormally],
        (Install, _) | (FactoryReset, _) => vec![Install],
    }
}

/// Narrow interface over the on-disk seed partition's systems directory.
/// Production code backs this with a real `<seed-root>/systems/` scan; tests
/// substitute an in-memory backend.
pub trait SeedBackend: fmt::Debug {
    /// List every label present in `<seed-root>/systems/`, in no particular
    /// order. Returns `Ok(None)` when the directory itself is absent or
    /// unreadable (spec §4.3/§8: both collapse to `NoSystems`).
    fn list_labels(&self) -> AnyResult<Option<Vec<String>>>;

    /// Strictly load one system's assertions. Fails (with the cause chained)
    /// on any signature/missing-file/shape error; a missing `model` file is
    /// fatal here (spec §3).
    fn open(&self, label: &str) -> AnyResult<System>;
}

/// Enumerate, open, and validate on-disk systems.
#[derive(Debug)]
pub struct SystemCatalog<B> {
    backend: B,
}

impl<B: SeedBackend> SystemCatalog<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// List every usable on-disk system, ASCII-ascending by label. A system
    /// that fails to load is silently skipped (spec §4.3/§7); the scan
    /// itself failing outright (absent/unreadable directory) is
    /// [`RecoveryError::NoSystems`].
    pub fn list(&self, device_mode: Mode, current_label: Option<&str>) -> Result<Vec<SystemSummary>> {
        let labels = self
            .backend
            .list_labels()
            .map_err(|e| RecoveryError::InternalError(format!("scanning systems: {e:#}")))?;
        let Some(mut labels) = labels else {
            return Err(RecoveryError::NoSystems);
        };
        labels.sort();
        let mut out = Vec::with_capacity(labels.len());
        for label in labels {
            let system = match self.backend.open(&label) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!("skipping system {label:?}: {e:#}");
                    continue;
                }
            };
            let current = current_label == Some(label.as_str());
            let actions = derive_actions(device_mode, current)
                .into_iter()
                .map(|kind| Action { kind })
                .collect();
            out.push(SystemSummary {
                label,
                model: system.model.model.clone(),
                brand: system.model.brand.clone(),
                current,
                actions,
            });
        }
        Ok(out)
    }

    /// Strictly load one system, wrapping any failure as
    /// [`RecoveryError::SeedLoad`] or [`RecoveryError::NotFound`].
    pub fn open(&self, label: &str) -> Result<System> {
        self.backend.open(label).map_err(|source| {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                if io_err.kind() == std::io::ErrorKind::NotFound {
                    return RecoveryError::NotFound {
                        label: label.to_string(),
                        source: std::io::Error::new(io_err.kind(), io_err.to_string()),
                    };
                }
            }
            RecoveryError::SeedLoad {
                label: label.to_string(),
                source,
            }
        })
    }

    /// Actions available for `label` given the device's current mode.
    pub fn actions(&self, label: &str, device_mode: Mode, current_label: Option<&str>) -> Vec<ActionKind> {
        derive_actions(device_mode, current_label == Some(label))
    }
}
