//! The small state machine a lifecycle change moves through. Tracked
//! in-process by [`crate::manager::Manager`]; never itself persisted, since
//! the durable record of "what survives a reboot" is the mode-environment
//! plus whatever files were written to the seed partition.
//!
//! Grounded on `task.rs` in the teacher, trimmed to the states this crate's
//! changes actually pass through.

/// One stage of a `CreateRecoverySystem` or `RemoveRecoverySystem` change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Writing files and provisional mode-environment updates.
    Do,
    /// Waiting for a post-reboot probe to report back (only reachable when
    /// the change asked to be probed before being trusted).
    Wait,
    /// Promoting a probed-good system to `good-recovery-systems`.
    Finalize,
    /// Rolling back a failed `Do` or a failed probe.
    Undo,
    /// Deleting files left behind by a rolled-back change.
    Cleanup,
    /// The change completed successfully.
    Done,
    /// The change failed and was rolled back (or failed to roll back).
    Errored,
}
