//! Shared test fixtures: in-memory stand-ins for every backend trait, so
//! component and integration tests never touch a real filesystem or
//! bootloader.
//!
//! Grounded on the teacher's own `lib/src/fixture.rs` (`FileDef`, a
//! `#[derive(Debug)] struct Fixture` with helper methods) for the general
//! shape of a dedicated fixture module; since this crate's backends are
//! narrow traits rather than a filesystem tree, the substitutes here hold
//! their state in memory instead of under a `tempfile::TempDir`.

#![cfg(test)]
#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result as AnyResult};
use chrono::{TimeZone, Utc};

use crate::bootvars::BootVarsBackend;
use crate::catalog::SeedBackend;
use crate::model::{BootVars, ComponentRef, ComponentType, ModelDeclaration, System};
use crate::modeenv::ModeEnvBackend;

/// In-memory [`ModeEnvBackend`].
#[derive(Debug, Default)]
pub(crate) struct InMemoryModeEnv {
    content: Mutex<Option<String>>,
}

impl ModeEnvBackend for InMemoryModeEnv {
    fn read_raw(&self) -> AnyResult<Option<String>> {
        Ok(self.content.lock().unwrap().clone())
    }
    fn write_raw(&self, content: &str) -> AnyResult<()> {
        *self.content.lock().unwrap() = Some(content.to_string());
        Ok(())
    }
}

/// In-memory [`BootVarsBackend`].
#[derive(Debug, Default)]
pub(crate) struct InMemoryBootVars {
    vars: Mutex<BTreeMap<String, String>>,
}

impl InMemoryBootVars {
    pub(crate) fn preset(vars: &[(&str, &str)]) -> Self {
        let map = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self {
            vars: Mutex::new(map),
        }
    }
}

impl BootVarsBackend for InMemoryBootVars {
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

/// In-memory [`SeedBackend`].
#[derive(Debug)]
pub(crate) struct InMemorySeedBackend {
    systems: Option<BTreeMap<String, ()>>,
    entries: BTreeMap<String, SeedEntryKind>,
    permission_denied: bool,
}

#[derive(Clone)]
enum SeedEntryKind {
    Ok { model: String, brand: String },
    Broken,
}

impl std::fmt::Debug for InMemorySeedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySeedBackend").finish()
    }
}

impl InMemorySeedBackend {
    /// The systems directory itself does not exist.
    pub(crate) fn new_absent() -> Self {
        Self {
            systems: None,
            entries: BTreeMap::new(),
            permission_denied: false,
        }
    }

    /// The systems directory exists but cannot be read.
    pub(crate) fn new_permission_denied() -> Self {
        Self {
            systems: None,
            entries: BTreeMap::new(),
            permission_denied: true,
        }
    }

    /// The systems directory exists and is empty.
    pub(crate) fn new_empty() -> Self {
        Self {
            systems: Some(BTreeMap::new()),
            entries: BTreeMap::new(),
            permission_denied: false,
        }
    }

    pub(crate) fn add_system(&mut self, label: &str, model: &str, brand: &str) -> &mut Self {
        self.systems.get_or_insert_with(BTreeMap::new).insert(label.to_string(), ());
        self.entries.insert(
            label.to_string(),
            SeedEntryKind::Ok {
                model: model.to_string(),
                brand: brand.to_string(),
            },
        );
        self
    }

    pub(crate) fn add_broken(&mut self, label: &str) -> &mut Self {
        self.systems.get_or_insert_with(BTreeMap::new).insert(label.to_string(), ());
        self.entries.insert(label.to_string(), SeedEntryKind::Broken);
        self
    }
}

impl SeedBackend for InMemorySeedBackend {
    fn list_labels(&self) -> AnyResult<Option<Vec<String>>> {
        if self.permission_denied {
            return Err(anyhow!("permission denied listing systems directory"));
        }
        Ok(self.systems.as_ref().map(|m| m.keys().cloned().collect()))
    }

    fn open(&self, label: &str) -> AnyResult<System> {
        match self.entries.get(label) {
            Some(SeedEntryKind::Ok { model, brand }) => Ok(sample_system(label, model, brand)),
            Some(SeedEntryKind::Broken) => Err(anyhow!("signature verification failed for {label}")),
            None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such system").into()),
        }
    }
}

/// Build a plausible [`System`] for test fixtures.
pub(crate) fn sample_system(label: &str, model: &str, brand: &str) -> System {
    let ts = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    System {
        label: label.to_string(),
        model: ModelDeclaration {
            brand: brand.to_string(),
            model: model.to_string(),
            revision: "1".to_string(),
            grade: "signed".to_string(),
            timestamp: ts,
            signing_key_id: "test-key".to_string(),
        },
        brand_account: brand.to_string(),
        required_components: vec![
            ComponentRef {
                name: "pc-kernel".to_string(),
                id: "pc-kernel-id".to_string(),
                kind: ComponentType::Kernel,
                pinned_revision: None,
                default_channel: Some("20/stable".to_string()),
                base: Some("core20".to_string()),
                content_providers: Vec::new(),
            },
            ComponentRef {
                name: "core20".to_string(),
                id: "core20-id".to_string(),
                kind: ComponentType::Base,
                pinned_revision: None,
                default_channel: Some("latest/stable".to_string()),
                base: None,
                content_providers: Vec::new(),
            },
        ],
    }
}

/// Records every restart request issued during a test, instead of actually
/// restarting anything.
#[derive(Debug, Default)]
pub(crate) struct RecordingRestart {
    pub(crate) requests: Mutex<Vec<String>>,
}

impl crate::dispatcher::RestartRequest for RecordingRestart {
    fn request_restart(&self, reason: &str) -> AnyResult<()> {
        self.requests.lock().unwrap().push(reason.to_string());
        Ok(())
    }
}
