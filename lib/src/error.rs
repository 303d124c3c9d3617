//! Error taxonomy crossing the public boundary of this crate (spec §7).
//!
//! Internal plumbing uses `anyhow::Result` with `fn-error-context::context`
//! annotations, the same as `bootloader.rs`/`deploy.rs` in the teacher. Every
//! operation named in spec §6 returns [`RecoveryError`] instead, so that
//! callers can match on a named kind rather than parse a message.

use std::fmt;

/// One of the three mutually-exclusive lifecycle change kinds (spec §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A `CreateRecoverySystem` change.
    CreateRecoverySystem,
    /// A `RemoveRecoverySystem` change.
    RemoveRecoverySystem,
    /// A remodel change. This crate never originates one; it only refuses to
    /// run concurrently with one (spec §1 Non-goals, §5).
    Remodel,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::CreateRecoverySystem => "create-recovery-system",
            ChangeKind::RemoveRecoverySystem => "remove-recovery-system",
            ChangeKind::Remodel => "remodel",
        };
        f.write_str(s)
    }
}

/// Opaque identifier of an in-flight lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeId(pub String);

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can cross the public boundary of this crate.
///
/// Propagation policy (spec §7): the catalog swallows per-system load
/// failures inside `list()` to preserve device usability; every other
/// boundary surfaces one of these. Lifecycle *do*-phase handlers never
/// swallow bootloader/mode-environment errors; *undo*-phase handlers log and
/// continue.
#[derive(thiserror::Error, Debug)]
pub enum RecoveryError {
    /// No usable on-disk systems (missing or permission-denied systems
    /// directory, or a directory with nothing in it that loads).
    #[error("no recovery systems available")]
    NoSystems,

    /// A requested label does not exist. The underlying "no such file" error
    /// is preserved so callers can test its `io::ErrorKind`.
    #[error("recovery system \"{label}\" not found")]
    NotFound {
        /// The label that was looked up.
        label: String,
        /// The originating I/O error, usually `io::ErrorKind::NotFound`.
        #[source]
        source: std::io::Error,
    },

    /// The request violated the action-derivation table, or the device mode
    /// forbids it outright.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    /// Loading a system's signed assertions failed.
    #[error("cannot load recovery system \"{label}\"")]
    SeedLoad {
        /// The label that failed to load.
        label: String,
        /// The underlying cause (signature, missing-file, or shape error).
        #[source]
        source: anyhow::Error,
    },

    /// The bootloader variable store failed.
    #[error("{context}: {source}")]
    BootIOError {
        /// Human-readable context, e.g. the message format required by
        /// spec §4.4 step 6.
        context: String,
        /// The underlying store failure.
        #[source]
        source: anyhow::Error,
    },

    /// The target label is the one currently being seeded on this boot.
    #[error("recovery system \"{label}\" is still being seeded")]
    SeedingConflict {
        /// The label being seeded.
        label: String,
    },

    /// Another lifecycle change of one of the three mutually-exclusive kinds
    /// is already in progress.
    #[error("a {kind} change ({id}) is already in progress")]
    ChangeConflict {
        /// The kind of the blocking change.
        kind: ChangeKind,
        /// The id of the blocking change.
        id: ChangeId,
    },

    /// Two validation sets pinned the same component to different revisions.
    #[error("validation set conflict: {0}")]
    ValidationSetConflict(String),

    /// One or more missing bases/default-providers; every violation is
    /// listed.
    #[error("system is not self-contained: {}", .0.join(", "))]
    SelfContainmentError(Vec<String>),

    /// The on-disk mode-environment file is missing when the device is not
    /// in an unversioned legacy mode (spec §4.1).
    #[error("mode-environment file is missing or corrupt")]
    FsCorrupt,

    /// A programmer/contract violation.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// This crate's boundary-crossing result type.
pub type Result<T> = std::result::Result<T, RecoveryError>;

impl RecoveryError {
    /// Build a [`RecoveryError::BootIOError`] with the exact context message
    /// required by spec §4.4 step 6.
    pub fn boot_io_for_action(label: &str, mode: crate::model::Mode, source: anyhow::Error) -> Self {
        RecoveryError::BootIOError {
            context: format!(
                "cannot set device to boot into system \"{label}\" in mode \"{mode}\""
            ),
            source,
        }
    }

    /// Build a generic [`RecoveryError::BootIOError`] for a gateway failure
    /// that isn't specifically about committing a boot request.
    pub fn boot_io(context: impl Into<String>, source: anyhow::Error) -> Self {
        RecoveryError::BootIOError {
            context: context.into(),
            source,
        }
    }
}
