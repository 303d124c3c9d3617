//! C1 — Mode-Environment Store: durable record of current boot mode, active
//! recovery system, model identity, and the two recovery lists.
//!
//! Grounded on `backend/statefile.rs`'s `StateLockGuard::update_state` in the
//! teacher (write-to-temp-in-same-directory + atomic rename, and a tolerant
//! read that returns `None` rather than erroring when nothing has been
//! written yet).

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write as _;

use anyhow::{Context, Result as AnyResult};
use camino::Utf8PathBuf;
use fn_error_context::context;
use seedctl_utils::PathQuotedDisplay;

use crate::error::RecoveryError;
use crate::model::ModeEnv;

/// Narrow interface over whatever durably stores the mode-environment's
/// bytes. Production code backs this with a real file; tests substitute an
/// in-memory backend (see `fixture.rs`).
pub trait ModeEnvBackend: fmt::Debug {
    /// Read the raw bytes of the mode-environment file, or `None` if it does
    /// not exist yet.
    fn read_raw(&self) -> AnyResult<Option<String>>;

    /// Atomically replace the mode-environment file's contents.
    fn write_raw(&self, content: &str) -> AnyResult<()>;
}

/// A [`ModeEnvBackend`] that stores the mode-environment as a real file,
/// replaced via write-to-temp + rename in the same directory (so the rename
/// is atomic on any POSIX filesystem).
#[derive(Debug)]
pub struct FileModeEnvBackend {
    path: Utf8PathBuf,
}

impl FileModeEnvBackend {
    /// Construct a backend rooted at the given file path.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModeEnvBackend for FileModeEnvBackend {
    #[context("Reading mode-environment")]
    fn read_raw(&self) -> AnyResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path)),
        }
    }

    #[context("Writing mode-environment")]
    fn write_raw(&self, content: &str) -> AnyResult<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("mode-environment path has no parent directory"))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", PathQuotedDisplay::new(&dir.as_std_path())))?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            anyhow::anyhow!(
                "renaming temp mode-environment into place at {}: {e}",
                PathQuotedDisplay::new(&self.path.as_std_path())
            )
        })?;
        Ok(())
    }
}

/// Durable store for the mode-environment, atomic on every write and
/// structurally-decode-only on every read (spec §4.1: semantic invariants are
/// the caller's responsibility, never enforced here).
#[derive(Debug)]
pub struct ModeEnvStore<B> {
    backend: B,
}

impl<B: ModeEnvBackend> ModeEnvStore<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Read the mode-environment.
    ///
    /// `legacy` should be `true` only when the device predates
    /// mode-environment tracking entirely; in that case a missing file
    /// yields the zero-value [`ModeEnv`] (mode `None`). Otherwise a missing
    /// file is [`RecoveryError::FsCorrupt`].
    pub fn read(&self, legacy: bool) -> crate::error::Result<ModeEnv> {
        match self.backend.read_raw() {
            Ok(Some(s)) => decode(&s).map_err(|_| RecoveryError::FsCorrupt),
            Ok(None) if legacy => Ok(ModeEnv::default()),
            Ok(None) => Err(RecoveryError::FsCorrupt),
            Err(e) => Err(RecoveryError::InternalError(format!(
                "reading mode-environment: {e:#}"
            ))),
        }
    }

    /// Replace the whole mode-environment. No partial updates are possible;
    /// the caller must read-modify-write the entire record.
    pub fn write(&self, env: &ModeEnv) -> crate::error::Result<()> {
        let encoded = encode(env);
        self.backend.write_raw(&encoded).map_err(|e| {
            RecoveryError::InternalError(format!("writing mode-environment: {e:#}"))
        })
    }
}

/// Encode a [`ModeEnv`] as a flat `kebab-case key=value` text file, one
/// entry per line, with list-valued keys comma-joined (SPEC_FULL.md §3).
fn encode(env: &ModeEnv) -> String {
    let mut out = String::new();
    let mut push = |k: &str, v: &str| {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push('\n');
    };
    push("mode", env.mode.map(|m| m.as_str()).unwrap_or(""));
    push("recovery-system", &env.recovery_system);
    push("model", &env.model);
    push("brand", &env.brand);
    push("grade", &env.grade);
    push("signing-key", &env.signing_key);
    push("current-recovery-systems", &env.current_recovery_systems.join(","));
    push("good-recovery-systems", &env.good_recovery_systems.join(","));
    push("current-kernels", &env.current_kernels.join(","));
    push("base", &env.base);
    out
}

fn decode(s: &str) -> AnyResult<ModeEnv> {
    let mut kv: BTreeMap<String, String> = BTreeMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (k, v) = line
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("malformed mode-environment line: {line:?}"))?;
        kv.insert(k.to_string(), v.to_string());
    }
    let list = |k: &str| -> Vec<String> {
        kv.get(k)
            .map(|v| v.split(',').filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default()
    };
    let get = |k: &str| kv.get(k).cloned().unwrap_or_default();
    let mode = match get("mode").as_str() {
        "" => None,
        other => Some(
            crate::model::Mode::parse(other)
                .ok_or_else(|| anyhow::anyhow!("unknown mode {other:?} in mode-environment"))?,
        ),
    };
    Ok(ModeEnv {
        mode,
        recovery_system: get("recovery-system"),
        model: get("model"),
        brand: get("brand"),
        grade: get("grade"),
        signing_key: get("signing-key"),
        current_recovery_systems: list("current-recovery-systems"),
        good_recovery_systems: list("good-recovery-systems"),
        current_kernels: list("current-kernels"),
        base: get("base"),
    })
}
