//! C4 — Action Dispatcher: validate a requested action against the
//! derivation table, commit the four bootloader variables, and request a
//! restart (spec §4.4).
//!
//! Grounded on `reboot.rs`'s `reboot()` (log, then hand off to an injected
//! restart collaborator) for the shape of the final step, and on
//! `deploy.rs`'s validate-then-commit ordering: nothing is written to the
//! bootloader until every check has passed.

use std::fmt;

use anyhow::Result as AnyResult;

use crate::catalog::{derive_actions, ActionKind, SystemCatalog, SeedBackend};
use crate::error::{RecoveryError, Result};
use crate::model::{bootkeys, BootVars, Mode};

/// Narrow interface over whatever actually restarts the device. An
/// out-of-scope collaborator per spec §1; production code hands off to the
/// real init system, tests record the request instead.
pub trait RestartRequest: fmt::Debug {
    /// Request an immediate restart. `reason` is informational only (the
    /// human-readable action title); the restart itself is unconditional.
    fn request_restart(&self, reason: &str) -> AnyResult<()>;
}

/// Build the four bootloader variables that commit the device to boot
/// `label` in `mode` on the next restart (spec §4.4 step 5, §6). This
/// always sets `try_recovery_system`/`recovery_system_status` back to their
/// rest values: a dispatched action is a direct commit, never a try.
fn commit_vars(label: &str, mode: Mode) -> BootVars {
    let mut vars = BootVars::new();
    vars.insert(bootkeys::MODE.into(), mode.as_str().into());
    vars.insert(bootkeys::SYSTEM.into(), label.into());
    vars.insert(bootkeys::TRY_SYSTEM.into(), String::new());
    vars.insert(bootkeys::STATUS.into(), bootkeys::STATUS_NONE.into());
    vars
}

/// Validate and commit a user-requested action on `label`, then restart.
///
/// `device_mode` and `current_label` describe the device's present state;
/// `seeding_label` is the label the device's *initial* seeding is still in
/// progress on — `Some` only while the device has not yet completed its
/// first seeding, per the `seeded` orchestrator-state key (spec §4.4 step
/// 3, §6). This is unrelated to whether some later `CreateRecoverySystem`
/// change happens to be in flight; callers pass `None` once `seeded` is
/// `true`, regardless of any in-flight lifecycle change. `device_mode ==
/// None` models a legacy system whose runtime mode this crate never
/// learned; that's rejected outright (step 2) rather than silently treated
/// as some default.
#[allow(clippy::too_many_arguments)]
pub fn request_system_action<B: SeedBackend, V: crate::bootvars::BootVarsBackend>(
    catalog: &SystemCatalog<B>,
    boot: &crate::bootvars::BootVarsGateway<V>,
    restart: &dyn RestartRequest,
    label: &str,
    action: ActionKind,
    device_mode: Option<Mode>,
    current_label: Option<&str>,
    seeding_label: Option<&str>,
) -> Result<()> {
    if label.is_empty() {
        return Err(RecoveryError::InternalError("system label is empty".into()));
    }
    let device_mode = device_mode
        .ok_or_else(|| RecoveryError::UnsupportedAction("system mode is unsupported".into()))?;
    let is_current = current_label == Some(label);
    // Same label + install is an escape hatch: reinstalling the system
    // currently being seeded is allowed even mid-seed.
    if seeding_label == Some(label) && action != ActionKind::Install {
        return Err(RecoveryError::SeedingConflict {
            label: label.to_string(),
        });
    }
    if action != ActionKind::RunNormally {
        catalog.open(label)?;
    }
    let allowed = derive_actions(device_mode, is_current);
    if !allowed.contains(&action) {
        return Err(RecoveryError::UnsupportedAction(format!(
            "{} is not available for system \"{label}\" while the device is in mode \"{device_mode}\"",
            action.title()
        )));
    }
    let mode = action.mode();
    if device_mode == mode && is_current && mode != Mode::Run {
        return Err(RecoveryError::UnsupportedAction(format!(
            "system \"{label}\" is already running in mode \"{mode}\""
        )));
    }
    let vars = commit_vars(label, mode);
    boot.set(&vars)
        .map_err(|e| RecoveryError::boot_io_for_action(label, mode, e))?;
    tracing::info!(
        "restarting into system \"{label}\" for action \"{}\"",
        action.title()
    );
    restart
        .request_restart(action.title())
        .map_err(|e| RecoveryError::boot_io("requesting restart", e))?;
    Ok(())
}

/// Restart into a system, bypassing the action-derivation table entirely
/// (spec §4.4's "reboot permits a broader set of (label, mode) combinations
/// than `request_system_action`"). `label`/`mode` default to the current
/// system/device mode when omitted. If both are omitted this is a bare
/// restart with no bootloader variable change at all — whatever the device
/// is already staged to boot into next. Otherwise the device mode must be
/// known, since an omitted `mode` defaults to it.
pub fn reboot<B: SeedBackend, V: crate::bootvars::BootVarsBackend>(
    catalog: &SystemCatalog<B>,
    boot: &crate::bootvars::BootVarsGateway<V>,
    restart: &dyn RestartRequest,
    label: Option<&str>,
    mode: Option<Mode>,
    device_mode: Option<Mode>,
    current_label: Option<&str>,
) -> Result<()> {
    if label.is_none() && mode.is_none() {
        tracing::info!("restarting for action \"Reboot\"");
        return restart
            .request_restart("Reboot")
            .map_err(|e| RecoveryError::boot_io("requesting restart", e));
    }
    let device_mode = device_mode.ok_or_else(|| {
        RecoveryError::UnsupportedAction("device mode is unknown; cannot default reboot target".into())
    })?;
    let mode = mode.unwrap_or(device_mode);
    let label = match label.or(current_label) {
        Some(l) => l,
        None => {
            return Err(RecoveryError::UnsupportedAction(
                "no system label given and no current system to default to".into(),
            ))
        }
    };
    if mode != Mode::Run {
        catalog.open(label)?;
    }
    let vars = commit_vars(label, mode);
    boot.set(&vars)
        .map_err(|e| RecoveryError::boot_io_for_action(label, mode, e))?;
    tracing::info!("restarting into system \"{label}\" for action \"Reboot\"");
    restart
        .request_restart("Reboot")
        .map_err(|e| RecoveryError::boot_io("requesting restart", e))?;
    Ok(())
}
