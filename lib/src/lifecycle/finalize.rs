//! Finalize/undo phases of C6: settle a staged-but-untrusted recovery
//! system once its probe result (or the absence of any probe) is known.

use crate::error::{RecoveryError, Result};
use crate::lifecycle::create::{RecoverySystemSetup, SnapSetupCarrier};
use crate::lifecycle::task::TaskState;
use crate::model::ModeEnv;

/// Promote `setup.label` from provisional to trusted: add it to
/// `good-recovery-systems`. Called either immediately after a
/// non-probed create (`setup.state == Do`), or after a probed create's
/// restart barrier has cleared (`setup.state == Wait`).
///
/// When `setup.state == Wait`: if `pending_restart` is still `true` the
/// restart this create requested hasn't happened yet from this crate's
/// point of view, so this returns `Ok(())` without changing `setup.state`
/// — the caller (spec §4.6.2: "Finalize ... retr[ies]") should call again
/// later instead of treating this as success. Otherwise `tried_systems` is
/// consulted: `setup.label` present promotes; absent fails with the
/// message spec §4.6.2 requires, which callers route into undo.
pub fn finalize(
    setup: &mut RecoverySystemSetup,
    modeenv: &mut ModeEnv,
    tried_systems: &[String],
    pending_restart: bool,
) -> Result<()> {
    if setup.state == TaskState::Wait {
        if pending_restart {
            return Ok(());
        }
        if !tried_systems.iter().any(|l| l == &setup.label) {
            return Err(RecoveryError::UnsupportedAction(format!(
                "cannot promote recovery system \"{}\": system has not been successfully tried",
                setup.label
            )));
        }
    }
    if !modeenv.good_recovery_systems.iter().any(|l| l == &setup.label) {
        modeenv.good_recovery_systems.push(setup.label.clone());
    }
    setup.state = TaskState::Done;
    Ok(())
}

/// Roll back a create whose probe failed.
///
/// Files staged during `Do` are always removed, best-effort (failures are
/// logged and do not stop the unwind). Whether `setup.label` is stripped
/// back out of `current-recovery-systems` depends on `setup.test_system`:
/// a real (non-test) create fully unwinds its registration, but a
/// throwaway test-system create leaves its label registered even though
/// the probe failed — the asymmetry this crate's on-disk format has always
/// had, preserved rather than "fixed".
pub fn undo_failed_probe<W: SnapSetupCarrier>(
    setup: &mut RecoverySystemSetup,
    modeenv: &mut ModeEnv,
    writer: &W,
) -> Result<()> {
    if let Err(e) = writer.remove(&setup.label, &setup.written_paths) {
        tracing::warn!("cleanup of recovery system \"{}\" incomplete: {e:#}", setup.label);
    }

    if !setup.test_system {
        modeenv.current_recovery_systems.retain(|l| l != &setup.label);
        modeenv.good_recovery_systems.retain(|l| l != &setup.label);
    }

    setup.state = TaskState::Errored;
    Ok(())
}

/// Roll back a create that failed during the `Do` phase itself (before any
/// probe was ever attempted). Always a full unwind, regardless of
/// `test_system`: nothing durable was ever trusted.
pub fn undo_failed_do<W: SnapSetupCarrier>(setup: &mut RecoverySystemSetup, modeenv: &mut ModeEnv, writer: &W) -> Result<()> {
    if let Err(e) = writer.remove(&setup.label, &setup.written_paths) {
        tracing::warn!("cleanup of recovery system \"{}\" incomplete: {e:#}", setup.label);
    }
    modeenv.current_recovery_systems.retain(|l| l != &setup.label);
    modeenv.good_recovery_systems.retain(|l| l != &setup.label);
    setup.state = TaskState::Errored;
    Ok(())
}
