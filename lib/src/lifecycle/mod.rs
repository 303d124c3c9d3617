//! C6 — System Lifecycle Engine: create, probe, finalize, undo, and remove
//! recovery systems (spec §4.6).
//!
//! Each phase is a free function over plain data rather than a method on a
//! stateful engine object, so [`crate::manager::Manager`] can interleave
//! them with its own mutex-guarded bookkeeping and with a reboot in
//! between `Do` and `Finalize`/`Undo`.

mod create;
mod finalize;
mod remove;
mod task;

pub use create::{
    create, CreateOptions, InstalledComponentsProvider, LocalSnap, Presence, RecoverySystemSetup,
    SideInfo, SnapSetupCarrier, ValidationSet,
};
pub use finalize::{finalize, undo_failed_do, undo_failed_probe};
pub use remove::{component_blob_path, remove, unique_components};
pub use task::TaskState;
