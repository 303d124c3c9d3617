//! Recovery-systems lifecycle core for an image-based appliance OS: the
//! mode-environment, the bootloader variable gateway, the on-disk system
//! catalog, the action dispatcher, the tried-system reconciler, and the
//! multi-reboot create/remove lifecycle engine, all wired together by
//! [`manager::Manager`].
//!
//! This crate has no CLI or HTTP surface of its own; an embedding binary
//! owns argument parsing, tracing initialization (via
//! `seedctl_utils::initialize_tracing`), and detecting the device's actual
//! boot mode before constructing a [`manager::Config`].

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

pub mod bootvars;
pub mod catalog;
pub mod dispatcher;
pub mod error;
#[cfg(test)]
mod fixture;
pub mod lifecycle;
pub mod manager;
pub mod model;
pub mod modeenv;
pub mod reconciler;

pub use error::{RecoveryError, Result};
