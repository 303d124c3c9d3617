//! The inevitable catchall "utils" crate. Generally only add
//! things here that only depend on the standard library and
//! "core" crates.
//!

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]

mod iterators;
mod path;
mod tracing_util;

pub use iterators::*;
pub use path::*;
pub use tracing_util::*;
