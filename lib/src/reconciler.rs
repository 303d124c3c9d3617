//! C5 — Tried-System Reconciler: runs once per boot to settle whatever the
//! previous boot left in `try_recovery_system`/`recovery_system_status`
//! (spec §4.5).
//!
//! Grounded on `reboot.rs`'s pattern of reading two related variables
//! together and writing both back atomically, never just one.

use crate::bootvars::{BootVarsBackend, BootVarsGateway};
use crate::error::{RecoveryError, Result};
use crate::model::{bootkeys, BootVars};

/// What the reconciler found and settled on this boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// `recovery_system_status` was already at rest (`""`); nothing to do.
    NoOp,
    /// The previous boot's try succeeded: the bootloader observed the
    /// system reach `"tried"` before this boot. The caller should record
    /// `label` as a known-good recovery system.
    Succeeded {
        /// The label that was being tried.
        label: String,
    },
    /// The previous boot's try never reached `"tried"`: either the try
    /// system failed to boot at all, or it booted but crashed before
    /// confirming itself. The caller should treat this as a failed probe.
    Failed {
        /// The label that was being tried.
        label: String,
    },
    /// `recovery_system_status` reached `"tried"` but `label` is not (or is
    /// no longer) in `current-recovery-systems`, or `status == "try"` with
    /// an empty `try_recovery_system` — spec §4.5's two inconsistent rows.
    /// The caller must not publish anything; this is logged and discarded.
    Inconsistent {
        /// Human-readable description of what was inconsistent.
        detail: String,
    },
}

/// Settles the try/tried bootloader variables exactly once per boot.
#[derive(Debug)]
pub struct Reconciler<B> {
    boot: BootVarsGateway<B>,
}

impl<B: BootVarsBackend> Reconciler<B> {
    /// Wrap a boot-variable gateway.
    pub fn new(boot: BootVarsGateway<B>) -> Self {
        Self { boot }
    }

    /// Read `try_recovery_system`/`recovery_system_status`, cross-check
    /// against `current_recovery_systems`, decide the outcome, and clear
    /// both variables atomically whenever the outcome is not
    /// [`ReconcileOutcome::NoOp`]. Idempotent: calling `ensure` again after
    /// it has already cleared the variables returns `NoOp`.
    ///
    /// `current_recovery_systems` is the mode-environment's list at the
    /// moment of the call (spec §4.5 decision table, third column).
    pub fn ensure(&self, current_recovery_systems: &[String]) -> Result<ReconcileOutcome> {
        let vars = self
            .boot
            .get(&[bootkeys::TRY_SYSTEM, bootkeys::STATUS])
            .map_err(|e| RecoveryError::boot_io("reading try/tried bootloader variables", e))?;
        let try_system = vars.get(bootkeys::TRY_SYSTEM).map(String::as_str).unwrap_or("");
        let status = vars.get(bootkeys::STATUS).map(String::as_str).unwrap_or("");

        let outcome = match (try_system, status) {
            ("", bootkeys::STATUS_NONE) => ReconcileOutcome::NoOp,
            ("", bootkeys::STATUS_TRY) => ReconcileOutcome::Inconsistent {
                detail: "recovery_system_status is \"try\" but try_recovery_system is empty".into(),
            },
            (label, bootkeys::STATUS_TRIED) => {
                if current_recovery_systems.iter().any(|l| l == label) {
                    tracing::info!("tried recovery system \"{label}\" was successful");
                    ReconcileOutcome::Succeeded {
                        label: label.to_string(),
                    }
                } else {
                    ReconcileOutcome::Inconsistent {
                        detail: format!(
                            "tried recovery system \"{label}\" is not in current-recovery-systems"
                        ),
                    }
                }
            }
            (label, _) if !label.is_empty() => {
                tracing::warn!("tried recovery system \"{label}\" failed");
                ReconcileOutcome::Failed {
                    label: label.to_string(),
                }
            }
            _ => ReconcileOutcome::NoOp,
        };

        if let ReconcileOutcome::Inconsistent { detail } = &outcome {
            tracing::error!("tried-system reconciler: {detail}");
        }
        if outcome != ReconcileOutcome::NoOp {
            self.clear()?;
        }
        Ok(outcome)
    }

    fn clear(&self) -> Result<()> {
        let mut vars = BootVars::new();
        vars.insert(bootkeys::TRY_SYSTEM.into(), String::new());
        vars.insert(bootkeys::STATUS.into(), bootkeys::STATUS_NONE.into());
        self.boot
            .set(&vars)
            .map_err(|e| RecoveryError::boot_io("clearing try/tried bootloader variables", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::InMemoryBootVars;

    #[test]
    fn test_noop_at_rest() {
        let reconciler = Reconciler::new(BootVarsGateway::new(InMemoryBootVars::default()));
        assert_eq!(reconciler.ensure(&[]).unwrap(), ReconcileOutcome::NoOp);
        assert_eq!(reconciler.ensure(&[]).unwrap(), ReconcileOutcome::NoOp);
    }

    #[test]
    fn test_tried_reports_success_and_clears() {
        let backend = InMemoryBootVars::preset(&[
            (bootkeys::TRY_SYSTEM, "20191119"),
            (bootkeys::STATUS, bootkeys::STATUS_TRIED),
        ]);
        let reconciler = Reconciler::new(BootVarsGateway::new(backend));
        let current = vec!["29112019".to_string(), "20191119".to_string()];
        let outcome = reconciler.ensure(&current).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Succeeded {
                label: "20191119".into()
            }
        );
        assert_eq!(reconciler.ensure(&current).unwrap(), ReconcileOutcome::NoOp);
    }

    #[test]
    fn test_stuck_try_reports_failure_and_clears() {
        let backend = InMemoryBootVars::preset(&[
            (bootkeys::TRY_SYSTEM, "20200318"),
            (bootkeys::STATUS, bootkeys::STATUS_TRY),
        ]);
        let reconciler = Reconciler::new(BootVarsGateway::new(backend));
        let outcome = reconciler.ensure(&[]).unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Failed {
                label: "20200318".into()
            }
        );
        assert_eq!(reconciler.ensure(&[]).unwrap(), ReconcileOutcome::NoOp);
    }

    #[test]
    fn test_tried_but_absent_from_current_is_inconsistent() {
        let backend = InMemoryBootVars::preset(&[
            (bootkeys::TRY_SYSTEM, "20191119"),
            (bootkeys::STATUS, bootkeys::STATUS_TRIED),
        ]);
        let reconciler = Reconciler::new(BootVarsGateway::new(backend));
        let outcome = reconciler.ensure(&[]).unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Inconsistent { .. }));
        // still cleared despite not being published
        let after = reconciler
            .boot
            .get(&[bootkeys::TRY_SYSTEM, bootkeys::STATUS])
            .unwrap();
        assert_eq!(after.get(bootkeys::TRY_SYSTEM).unwrap(), "");
    }

    #[test]
    fn test_empty_try_system_with_try_status_is_inconsistent() {
        let backend = InMemoryBootVars::preset(&[(bootkeys::STATUS, bootkeys::STATUS_TRY)]);
        let reconciler = Reconciler::new(BootVarsGateway::new(backend));
        let outcome = reconciler.ensure(&[]).unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Inconsistent { .. }));
    }

    #[test]
    fn test_clearing_sets_both_vars_together() {
        let backend = InMemoryBootVars::preset(&[
            (bootkeys::TRY_SYSTEM, "20191119"),
            (bootkeys::STATUS, bootkeys::STATUS_TRIED),
        ]);
        let gateway = BootVarsGateway::new(backend);
        let reconciler = Reconciler::new(gateway);
        reconciler.ensure(&["20191119".to_string()]).unwrap();
        let after = reconciler
            .boot
            .get(&[bootkeys::TRY_SYSTEM, bootkeys::STATUS])
            .unwrap();
        assert_eq!(after.get(bootkeys::TRY_SYSTEM).unwrap(), "");
        assert_eq!(after.get(bootkeys::STATUS).unwrap(), "");
    }
}
