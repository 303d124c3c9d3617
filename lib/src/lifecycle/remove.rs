//! Remove phase of C6: delete a recovery system's on-disk files and strip
//! its bookkeeping, rejecting the three protected cases spec §4.6.6 names.

use crate::error::{RecoveryError, Result};
use crate::lifecycle::create::SnapSetupCarrier;
use crate::model::{ComponentRef, DefaultRecoverySystem, ModeEnv};

/// The component blob paths unique to the system being removed, computed
/// once up front so a retry after a partial deletion has the same
/// authoritative list to finish with (spec §4.6.5 step 2).
///
/// `target`'s required components are compared by `(name, pinned_revision)`
/// identity against the union of every other system's required components;
/// anything not referenced elsewhere is unique to `target`.
pub fn unique_components<'a>(
    target: &'a [ComponentRef],
    others: impl IntoIterator<Item = &'a [ComponentRef]>,
) -> Vec<&'a ComponentRef> {
    let mut shared = std::collections::BTreeSet::new();
    for other in others {
        for c in other {
            shared.insert((c.name.as_str(), c.pinned_revision.as_deref()));
        }
    }
    target
        .iter()
        .filter(|c| !shared.contains(&(c.name.as_str(), c.pinned_revision.as_deref())))
        .collect()
}

/// Blob path for one component, matching the `<seed-root>/snaps/` layout
/// from spec §6.
pub fn component_blob_path(component: &ComponentRef) -> String {
    let rev = component.pinned_revision.as_deref().unwrap_or("current");
    format!("snaps/{}_{}.{}", component.name, rev, component.file_extension())
}

/// Remove `label`.
///
/// `unique_paths` is the already-computed list of component blob paths this
/// system alone referenced (see [`unique_components`]/[`component_blob_path`]);
/// callers persist it on the task before calling so a retry after partial
/// deletion converges to the same final disk state (spec §8 testable
/// property 5). A missing-file error from an individual deletion is not
/// itself fatal to the task (spec §4.6.5 step 4); `writer.remove` is
/// expected to swallow those and only propagate other I/O failures.
///
/// Idempotent: if `label` is already absent from `current-recovery-systems`
/// this is a no-op success, since a retried remove after a partial failure
/// must not itself fail.
///
/// Rejects removing: the current system, the last remaining system, and
/// the default recovery system.
pub fn remove<W: SnapSetupCarrier>(
    writer: &W,
    modeenv: &mut ModeEnv,
    default: Option<&DefaultRecoverySystem>,
    current_label: &str,
    label: &str,
    unique_paths: &[String],
) -> Result<()> {
    if !modeenv.current_recovery_systems.iter().any(|l| l == label) {
        return Ok(());
    }
    if label == current_label {
        return Err(RecoveryError::UnsupportedAction(format!(
            "cannot remove \"{label}\": it is the current system"
        )));
    }
    if modeenv.current_recovery_systems.len() == 1 {
        return Err(RecoveryError::UnsupportedAction(format!(
            "cannot remove \"{label}\": it is the last remaining recovery system"
        )));
    }
    if default.map(|d| d.label.as_str()) == Some(label) {
        return Err(RecoveryError::UnsupportedAction(format!(
            "cannot remove \"{label}\": it is the default recovery system"
        )));
    }

    modeenv.current_recovery_systems.retain(|l| l != label);
    modeenv.good_recovery_systems.retain(|l| l != label);

    if let Err(e) = writer.remove(label, unique_paths) {
        return Err(RecoveryError::InternalError(format!(
            "removing on-disk files for recovery system \"{label}\": {e:#}"
        )));
    }
    Ok(())
}
