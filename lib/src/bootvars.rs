//! C2 — Boot Variable Gateway: typed façade over the bootloader key/value
//! store for the four tracked keys (spec §4.2, §6).
//!
//! Grounded on `component.rs`'s `trait Component` for the shape of a narrow,
//! swappable interface, and on the "callers observe only one error kind"
//! design note in spec §4.2: this gateway never retries, and wraps every
//! backend failure the same way regardless of which key failed.

use std::fmt;

use anyhow::Result as AnyResult;

use crate::model::BootVars;

/// Narrow interface over the bootloader's key/value variable store.
/// Production code shells out to the real store (an out-of-scope
/// collaborator per spec §1); tests substitute an in-memory backend.
pub trait BootVarsBackend: fmt::Debug {
    /// Read the given keys. Keys absent from the store are simply absent
    /// from the returned map (not an error).
    fn get(&self, keys: &[&str]) -> AnyResult<BootVars>;

    /// Set the given keys. The backend makes no atomicity guarantee beyond
    /// what the underlying store provides; callers that need several keys
    /// to change together issue one `set` call with all of them.
    fn set(&self, vars: &BootVars) -> AnyResult<()>;
}

/// Typed façade over a [`BootVarsBackend`] for the four keys this crate
/// tracks.
#[derive(Debug)]
pub struct BootVarsGateway<B> {
    backend: B,
}

impl<B: BootVarsBackend> BootVarsGateway<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Read the given keys from the underlying store.
    pub fn get(&self, keys: &[&str]) -> AnyResult<BootVars> {
        self.backend.get(keys)
    }

    /// Set the given keys in the underlying store.
    pub fn set(&self, vars: &BootVars) -> AnyResult<()> {
        self.backend.set(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bootkeys;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct MemBootVars {
        pub(crate) vars: Mutex<BTreeMap<String, String>>,
    }

    impl BootVarsBackend for MemBootVars {
        fn get(&self, keys: &[&str]) -> AnyResult<BootVars> {
            let vars = self.vars.lock().unwrap();
            Ok(keys
                .iter()
                .filter_map(|k| vars.get(*k).map(|v| (k.to_string(), v.clone())))
                .collect())
        }
        fn set(&self, vars: &BootVars) -> AnyResult<()> {
            self.vars.lock().unwrap().extend(vars.clone());
            Ok(())
        }
    }

    #[test]
    fn test_get_set_round_trip() {
        let gw = BootVarsGateway::new(MemBootVars::default());
        let mut vars = BootVars::new();
        vars.insert(bootkeys::TRY_SYSTEM.into(), "1234".into());
        vars.insert(bootkeys::STATUS.into(), bootkeys::STATUS_TRY.into());
        gw.set(&vars).unwrap();
        let read_back = gw.get(&[bootkeys::TRY_SYSTEM, bootkeys::STATUS]).unwrap();
        assert_eq!(read_back.get(bootkeys::TRY_SYSTEM).unwrap(), "1234");
        assert_eq!(read_back.get(bootkeys::STATUS).unwrap(), "try");
    }

    #[test]
    fn test_absent_key_is_absent_not_error() {
        let gw = BootVarsGateway::new(MemBootVars::default());
        let read_back = gw.get(&[bootkeys::TRY_SYSTEM]).unwrap();
        assert!(read_back.get(bootkeys::TRY_SYSTEM).is_none());
    }
}
