//! Data model shared by every component: systems, seeded-system records, the
//! mode-environment, and the bootloader variable keys (spec §3).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four boot modes a device can be running in. `run` is the
/// steady state; the other three only ever apply while `recovery-system` is
/// non-empty (invariant from spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Reinstall the device from this system.
    Install,
    /// Boot into this system to perform a recovery/repair.
    Recover,
    /// Wipe user data and reinstall from this system.
    FactoryReset,
    /// Ordinary steady-state operation.
    Run,
}

impl Mode {
    /// The wire/on-disk spelling used in the mode-environment and bootloader vars.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Install => "install",
            Mode::Recover => "recover",
            Mode::FactoryReset => "factory-reset",
            Mode::Run => "run",
        }
    }

    /// Parse the on-disk spelling. Returns `None` for anything else, which
    /// callers treat the same way `spec.md` treats an "unknown mode".
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "install" => Some(Mode::Install),
            "recover" => Some(Mode::Recover),
            "factory-reset" => Some(Mode::FactoryReset),
            "run" => Some(Mode::Run),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the five kinds of component a system's model can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    /// The root filesystem base.
    Base,
    /// The kernel.
    Kernel,
    /// The board/device-specific gadget.
    Gadget,
    /// The snapd-equivalent management component itself.
    Snapd,
    /// An ordinary application component.
    App,
}

/// A single required component named by a model declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentRef {
    /// Component name, e.g. `pc-kernel`.
    pub name: String,
    /// Signing-identity id for the component.
    pub id: String,
    /// What kind of component this is.
    pub kind: ComponentType,
    /// A pinned revision, if the model fixes one.
    pub pinned_revision: Option<String>,
    /// The channel to track when no revision is pinned.
    pub default_channel: Option<String>,
    /// Name of the base component this one is built against, if any.
    /// `None` for `Base` itself and for components (like `Snapd`) that
    /// carry no base dependency. Absent from older on-disk models.
    #[serde(default)]
    pub base: Option<String>,
    /// Names of other required components this one plugs a content
    /// interface into and needs as a default provider. Absent from older
    /// on-disk models.
    #[serde(default)]
    pub content_providers: Vec<String>,
}

/// Extension on disk for an asserted component blob, derived from its kind.
impl ComponentRef {
    /// File extension used for `<seed-root>/snaps/<name>_<rev>.<ext>`.
    pub fn file_extension(&self) -> &'static str {
        match self.kind {
            ComponentType::Gadget | ComponentType::Kernel | ComponentType::Base => "snap",
            ComponentType::Snapd => "snap",
            ComponentType::App => "snap",
        }
    }
}

/// A signed model declaration: brand, model, revision, grade, timestamp and
/// the signing key that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelDeclaration {
    /// Brand identifier, e.g. `generic`.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model assertion revision.
    pub revision: String,
    /// Grade string, e.g. `signed`, `dangerous`, `secured`.
    pub grade: String,
    /// When the assertion was signed.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the key that signed this assertion.
    pub signing_key_id: String,
}

/// A fully loaded on-disk system: its model, its brand account, and its
/// required components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct System {
    /// The on-disk label, e.g. `20191119`.
    pub label: String,
    /// The signed model declaration.
    pub model: ModelDeclaration,
    /// Signed brand account identifier.
    pub brand_account: String,
    /// Required components, in model order.
    pub required_components: Vec<ComponentRef>,
}

/// A record appended to `seeded-systems` every time a system is successfully
/// seeded as running. Position 0 is "most recently seeded", i.e. *current*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SeededSystem {
    /// The system label.
    pub label: String,
    /// Model name at the time this was seeded.
    pub model: String,
    /// Brand at the time this was seeded.
    pub brand: String,
    /// Model revision at the time this was seeded.
    pub revision: String,
    /// When this record was made.
    pub timestamp: DateTime<Utc>,
}

impl SeededSystem {
    /// Two records are duplicates per spec §3 if they share
    /// (label, model, brand, revision).
    pub fn same_identity(&self, other: &SeededSystem) -> bool {
        self.label == other.label
            && self.model == other.model
            && self.brand == other.brand
            && self.revision == other.revision
    }
}

/// The optional default-recovery-system record. At most one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DefaultRecoverySystem {
    /// The system label.
    pub label: String,
    /// Model name.
    pub model: String,
    /// Brand.
    pub brand: String,
    /// Model revision.
    pub revision: String,
    /// When the system was created.
    pub timestamp: DateTime<Utc>,
    /// When it was marked default.
    pub time_made_default: DateTime<Utc>,
}

/// The durable mode-environment record (spec §3/§4.1).
///
/// `ModeEnvStore` never interprets this beyond structural decoding; every
/// invariant listed in spec §3 is the caller's (the [`crate::manager::Manager`]'s)
/// responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModeEnv {
    /// Current boot mode, if the device has one (absent only for legacy
    /// systems that predate mode-environment tracking).
    pub mode: Option<Mode>,
    /// Active recovery system label. Non-empty in any non-run mode.
    pub recovery_system: String,
    /// Device model name.
    pub model: String,
    /// Device brand.
    pub brand: String,
    /// Device grade.
    pub grade: String,
    /// Signing key id used by the device's model.
    pub signing_key: String,
    /// Recovery systems eligible to boot.
    pub current_recovery_systems: Vec<String>,
    /// Recovery systems known to work.
    pub good_recovery_systems: Vec<String>,
    /// Kernel revisions currently in use.
    pub current_kernels: Vec<String>,
    /// Base snap currently in use.
    pub base: String,
}

impl ModeEnv {
    /// `good ⊆ current` (spec §3 invariant 1).
    pub fn good_is_subset_of_current(&self) -> bool {
        self.good_recovery_systems
            .iter()
            .all(|g| self.current_recovery_systems.iter().any(|c| c == g))
    }
}

/// The four bootloader variable keys this crate tracks (spec §6), and the
/// three legal values of `recovery_system_status`.
pub mod bootkeys {
    /// `snapd_recovery_mode`
    pub const MODE: &str = "snapd_recovery_mode";
    /// `snapd_recovery_system`
    pub const SYSTEM: &str = "snapd_recovery_system";
    /// `try_recovery_system`
    pub const TRY_SYSTEM: &str = "try_recovery_system";
    /// `recovery_system_status`
    pub const STATUS: &str = "recovery_system_status";

    /// `recovery_system_status=""`
    pub const STATUS_NONE: &str = "";
    /// `recovery_system_status="try"`
    pub const STATUS_TRY: &str = "try";
    /// `recovery_system_status="tried"`
    pub const STATUS_TRIED: &str = "tried";
}

/// Map of bootloader variables, keyed by the constants in [`bootkeys`].
pub type BootVars = BTreeMap<String, String>;
