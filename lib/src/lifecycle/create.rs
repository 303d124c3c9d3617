//! Create phase of C6: assemble a new recovery system's files on the seed
//! partition and provisionally register it, without yet trusting it.
//!
//! Grounded on `deploy.rs`'s resolve-then-stage-then-commit ordering: every
//! component this system needs is resolved and validated before the first
//! byte is written, and the mode-environment is only updated once every
//! write has succeeded.

use std::fmt;

use anyhow::Result as AnyResult;

use crate::error::{RecoveryError, Result};
use crate::lifecycle::task::TaskState;
use crate::model::{ComponentRef, DefaultRecoverySystem, ModeEnv};

/// Whether a component named by a validation set is required or merely
/// permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// The component must be present at the pinned revision.
    Required,
    /// The component may be present; if it is, it must match the pin.
    Optional,
}

/// One pin from a signed validation set assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSet {
    /// Signing account id.
    pub account_id: String,
    /// Validation set name.
    pub name: String,
    /// Monotonic sequence number.
    pub sequence: u32,
    /// Component name this entry pins.
    pub component: String,
    /// Pinned revision.
    pub revision: String,
    /// Whether the pin is required or merely constraining.
    pub presence: Presence,
}

/// Identity of one already-installed component revision, as reported by an
/// [`InstalledComponentsProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideInfo {
    /// Component name.
    pub name: String,
    /// Installed revision.
    pub revision: String,
    /// Signing-identity id.
    pub snap_id: String,
}

/// A component blob staged for writing into the new recovery system's
/// directory on the seed partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSnap {
    /// The component this blob satisfies.
    pub component: ComponentRef,
    /// Revision being staged.
    pub side_info: SideInfo,
}

/// Caller-supplied knobs for `CreateRecoverySystem` (spec §4.6, design note
/// "Configuration as an enumerated struct"). A fixed struct, never
/// positional or dynamic keyword arguments.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// When `true`, the new system is staged behind a post-reboot probe
    /// before being trusted: `Do` ends in `Wait`, and a failed try does not
    /// strip its label back out of `current-recovery-systems` (asymmetry
    /// preserved exactly; see `undo_failed_probe`). When `false`, the
    /// system is promoted to `good-recovery-systems` immediately, with no
    /// restart.
    pub test_system: bool,
    /// Update [`DefaultRecoverySystem`] to this label once the system is
    /// trusted (spec §4.6.1 step 7/§4.6.2).
    pub mark_default: bool,
    /// Prepend a [`crate::model::SeededSystem`] record for this label once
    /// it is trusted, making it *current* (spec §8 testable property 4).
    pub mark_current: bool,
    /// Validation-set pins to resolve required components against, in
    /// addition to what is already installed.
    pub validation_sets: Vec<ValidationSet>,
    /// Caller-supplied local component blobs, offered as source (i) ahead
    /// of per-task snap-setup carriers and the installed-components
    /// provider (spec §4.6.1 step 2).
    pub local_snaps: Vec<LocalSnap>,
}

/// Narrow interface over "what is installed right now", used to resolve a
/// model's required components into concrete revisions.
pub trait InstalledComponentsProvider: fmt::Debug {
    /// Every component currently installed, by name.
    fn installed(&self) -> AnyResult<Vec<SideInfo>>;
}

/// Narrow interface over writing component blobs into a recovery system's
/// directory on the seed partition, and removing them again.
pub trait SnapSetupCarrier: fmt::Debug {
    /// Stage `snaps` under the new system's directory. Returns the list of
    /// paths actually written, in write order, so a failed later step can
    /// unwind exactly what succeeded.
    fn stage(&self, label: &str, snaps: &[LocalSnap]) -> AnyResult<Vec<String>>;

    /// Remove every path previously returned by `stage` (or by a prior
    /// `remove` covering the same label). Best-effort: callers log and
    /// continue past individual failures, per the undo-phase propagation
    /// policy.
    fn remove(&self, label: &str, paths: &[String]) -> AnyResult<()>;
}

/// Everything a caller needs to finalize or undo a create that staged
/// files but has not yet been trusted.
///
/// This is the one piece of lifecycle state that must survive a reboot
/// between the `Do` phase and `Finalize`/`Undo`: an embedding binary is
/// expected to persist it via [`RecoverySystemSetup::to_json`] before
/// requesting the probe restart, and reload it with
/// [`RecoverySystemSetup::from_json`] on the next boot, the same shape
/// `SavedState`/`Status` take in the teacher's embedded update-status
/// tracker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecoverySystemSetup {
    /// The label being created.
    pub label: String,
    /// Paths written during the `Do` phase, in write order.
    pub written_paths: Vec<String>,
    /// The `test_system` flag this create was started with.
    pub test_system: bool,
    /// Whether this create should become the default once trusted.
    pub mark_default: bool,
    /// Whether this create should become *current* once trusted.
    pub mark_current: bool,
    /// The default-recovery-system record in effect before this create
    /// started, saved so undo can restore it verbatim (spec §4.6.3).
    pub previous_default: Option<DefaultRecoverySystem>,
    /// Current stage.
    pub state: TaskState,
}

impl RecoverySystemSetup {
    /// Serialize to the JSON form an embedding binary persists across the
    /// probe reboot.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse the JSON form written by [`RecoverySystemSetup::to_json`].
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Resolve every required component from one of three sources, in priority
/// order (spec §4.6.1 step 2): (i) caller-supplied `local_snaps`, (ii)
/// per-task snap-setup carriers (not modeled by this crate; see
/// `SnapSetupCarrier`'s doc comment), (iii) `installed`. Only (i) and (iii)
/// apply outside a remodel, which is this crate's only caller today.
///
/// A component absent from all three sources is an `InternalError` (spec
/// §4.6.1 step 2: "Failure to locate any required component"), distinct
/// from step 3's self-containedness check, which this function does not
/// perform — see [`check_self_contained`].
fn resolve_components(
    required: &[ComponentRef],
    local_snaps: &[LocalSnap],
    installed: &[SideInfo],
    validation_sets: &[ValidationSet],
) -> std::result::Result<Vec<LocalSnap>, RecoveryError> {
    let mut conflicts = Vec::new();
    let mut missing = Vec::new();
    let mut out = Vec::new();

    for component in required {
        let pins: Vec<&ValidationSet> = validation_sets
            .iter()
            .filter(|vs| vs.component == component.name)
            .collect();
        let distinct_revisions: std::collections::BTreeSet<&str> =
            pins.iter().map(|vs| vs.revision.as_str()).collect();
        if distinct_revisions.len() > 1 {
            conflicts.push(format!(
                "component \"{}\" is pinned to conflicting revisions {:?}",
                component.name, distinct_revisions
            ));
            continue;
        }

        let pinned_revision = pins.first().map(|vs| vs.revision.clone());
        let side_info = local_snaps
            .iter()
            .find(|s| s.component.name == component.name)
            .map(|s| s.side_info.clone())
            .or_else(|| installed.iter().find(|s| s.name == component.name).cloned());

        match (pinned_revision, side_info) {
            (Some(pinned), Some(side_info)) if side_info.revision != pinned => {
                conflicts.push(format!(
                    "component \"{}\" is installed at revision {} but pinned to {pinned}",
                    component.name, side_info.revision
                ));
            }
            (_, Some(side_info)) => out.push(LocalSnap {
                component: component.clone(),
                side_info,
            }),
            (_, None) => missing.push(component.name.clone()),
        }
    }

    if !conflicts.is_empty() {
        return Err(RecoveryError::ValidationSetConflict(conflicts.join("; ")));
    }
    if !missing.is_empty() {
        return Err(RecoveryError::InternalError(format!(
            "component(s) not present: {}",
            missing.join(", ")
        )));
    }
    Ok(out)
}

/// Enforce self-containedness (spec §4.6.1 step 3): every component's
/// declared base, and every content-interface default provider it names,
/// must itself be among `required`. Every violation is collected and listed
/// by snap name and missing identifier rather than failing on the first.
fn check_self_contained(required: &[ComponentRef]) -> std::result::Result<(), RecoveryError> {
    let present: std::collections::BTreeSet<&str> = required.iter().map(|c| c.name.as_str()).collect();
    let mut violations = Vec::new();

    for component in required {
        if let Some(base) = &component.base {
            if !present.contains(base.as_str()) {
                violations.push(format!(
                    "component \"{}\" requires base \"{base}\" which is not present",
                    component.name
                ));
            }
        }
        for provider in &component.content_providers {
            if !present.contains(provider.as_str()) {
                violations.push(format!(
                    "component \"{}\" requires content-interface default provider \"{provider}\" which is not present",
                    component.name
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(RecoveryError::SelfContainmentError(violations))
    }
}

/// Run the `Do` phase of `CreateRecoverySystem`: resolve components, stage
/// their blobs, and provisionally add `label` to
/// `current-recovery-systems` (not yet `good-recovery-systems`).
///
/// Callers are responsible for the change-conflict check (spec §5) before
/// calling this; it assumes it has exclusive use of `modeenv` for the
/// duration of the call. `seeded` is the device's `seeded` orchestrator-state
/// key (spec §4.6.1 step 1): a device still performing its initial seeding
/// refuses every create outright.
pub fn create<P: InstalledComponentsProvider, W: SnapSetupCarrier>(
    provider: &P,
    writer: &W,
    required_components: &[ComponentRef],
    modeenv: &mut ModeEnv,
    label: &str,
    options: &CreateOptions,
    previous_default: Option<DefaultRecoverySystem>,
    seeded: bool,
) -> Result<RecoverySystemSetup> {
    if !seeded {
        return Err(RecoveryError::UnsupportedAction(
            "device has not completed its initial seeding".to_string(),
        ));
    }
    if modeenv.current_recovery_systems.iter().any(|l| l == label) {
        return Err(RecoveryError::UnsupportedAction(format!(
            "recovery system \"{label}\" already exists"
        )));
    }

    check_self_contained(required_components)?;

    let installed = provider
        .installed()
        .map_err(|e| RecoveryError::InternalError(format!("listing installed components: {e:#}")))?;
    let snaps = resolve_components(
        required_components,
        &options.local_snaps,
        &installed,
        &options.validation_sets,
    )?;

    let written_paths = writer
        .stage(label, &snaps)
        .map_err(|e| RecoveryError::InternalError(format!("staging recovery system \"{label}\": {e:#}")))?;

    modeenv.current_recovery_systems.push(label.to_string());

    Ok(RecoverySystemSetup {
        label: label.to_string(),
        written_paths,
        test_system: options.test_system,
        mark_default: options.mark_default,
        mark_current: options.mark_current,
        previous_default,
        state: TaskState::Do,
    })
}
