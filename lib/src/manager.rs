//! Top-level orchestrator: owns every backend and the single piece of
//! in-process state that must never be touched by two callers at once
//! (spec §5).
//!
//! Grounded on `store.rs`'s `Storage` (one struct owning every backend,
//! `Arc`-free since this crate is single-process) and on
//! `backend/statefile.rs`'s lock-guard pattern: the mutex is held only
//! across bookkeeping, never across an I/O call to the mode-environment or
//! bootloader backends.

use std::sync::Mutex;

use chrono::Utc;

use crate::bootvars::{BootVarsBackend, BootVarsGateway};
use crate::catalog::{ActionKind, SeedBackend, SystemCatalog, SystemSummary};
use crate::dispatcher::{self, RestartRequest};
use crate::error::{ChangeId, ChangeKind, RecoveryError, Result};
use crate::lifecycle::{
    self, CreateOptions, InstalledComponentsProvider, RecoverySystemSetup, SnapSetupCarrier,
};
use crate::model::{bootkeys, BootVars, ComponentRef, DefaultRecoverySystem, Mode, SeededSystem};
use crate::modeenv::{ModeEnvBackend, ModeEnvStore};
use crate::reconciler::{ReconcileOutcome, Reconciler};

/// Caller-supplied configuration, resolved once at construction (spec §2
/// ambient configuration section).
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the device predates mode-environment tracking (affects how
    /// a missing mode-environment file is interpreted; see
    /// [`crate::modeenv::ModeEnvStore::read`]).
    pub legacy_device: bool,
    /// The device's current runtime mode, as reported by whatever embeds
    /// this crate (an out-of-scope collaborator per spec §1: this crate
    /// never detects its own boot mode).
    pub device_mode: Mode,
    /// The label of the system currently running, if known.
    pub current_label: Option<String>,
    /// The device's optional default recovery system.
    pub default_recovery_system: Option<DefaultRecoverySystem>,
    /// Whether the device has completed its initial seeding (the
    /// `seeded` orchestrator-state key, spec §6). `false` only across the
    /// device's very first boot sequence, before any user-requested action
    /// or lifecycle change has ever run.
    pub seeded: bool,
    /// The label currently being seeded, while `seeded` is still `false`.
    /// Meaningless once `seeded` is `true`. This is the device's initial
    /// seeding target, not the label of any later `CreateRecoverySystem`
    /// change (spec §4.4 step 3 keys the seeding conflict on this, not on
    /// whether some unrelated lifecycle change happens to be in flight).
    pub seeding_label: Option<String>,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    in_flight: Option<(ChangeKind, ChangeId)>,
    next_change_id: u64,
    /// Set when a lifecycle change has requested a restart and cleared as
    /// soon as [`Manager::ensure`] runs, modeling "a boot has happened
    /// since" for the purposes of spec §4.6.2's `pending-restart` flag.
    pending_restart: bool,
    /// Labels a post-reboot probe has confirmed, consumed by
    /// [`Manager::finalize_recovery_system`] (spec §3 Tried-Systems).
    tried_systems: Vec<String>,
    /// `seeded-systems`, newest (= current) first (spec §3/§6).
    seeded_systems: Vec<SeededSystem>,
    /// The device's current default recovery system, if any. Starts from
    /// [`Config::default_recovery_system`]; mutated by `mark_default` and
    /// restored by undo.
    default: Option<DefaultRecoverySystem>,
}

/// Owns every backend this crate needs and serializes access to the
/// in-process state that must not be touched concurrently.
#[derive(Debug)]
pub struct Manager<ME, BV, SB, RS, IC, SSC> {
    config: Config,
    modeenv: ModeEnvStore<ME>,
    boot: BootVarsGateway<BV>,
    catalog: SystemCatalog<SB>,
    restart: RS,
    components: IC,
    snap_setup: SSC,
    state: Mutex<OrchestratorState>,
}

impl<ME, BV, SB, RS, IC, SSC> Manager<ME, BV, SB, RS, IC, SSC>
where
    ME: ModeEnvBackend,
    BV: BootVarsBackend,
    SB: SeedBackend,
    RS: RestartRequest,
    IC: InstalledComponentsProvider,
    SSC: SnapSetupCarrier,
{
    /// Construct a manager over the given backends.
    pub fn new(
        config: Config,
        modeenv_backend: ME,
        bootvars_backend: BV,
        seed_backend: SB,
        restart: RS,
        components: IC,
        snap_setup: SSC,
    ) -> Self {
        let default = config.default_recovery_system.clone();
        Self {
            config,
            modeenv: ModeEnvStore::new(modeenv_backend),
            boot: BootVarsGateway::new(bootvars_backend),
            catalog: SystemCatalog::new(seed_backend),
            restart,
            components,
            snap_setup,
            state: Mutex::new(OrchestratorState {
                default,
                ..OrchestratorState::default()
            }),
        }
    }

    /// The device's current default recovery system, if any.
    pub fn default_recovery_system(&self) -> Option<DefaultRecoverySystem> {
        self.state.lock().unwrap().default.clone()
    }

    /// `seeded-systems`, newest (= current) first.
    pub fn seeded_systems(&self) -> Vec<SeededSystem> {
        self.state.lock().unwrap().seeded_systems.clone()
    }

    /// List every usable on-disk system with its available actions.
    pub fn systems(&self) -> Result<Vec<SystemSummary>> {
        self.catalog
            .list(self.config.device_mode, self.config.current_label.as_deref())
    }

    /// Validate and commit a user-requested action, then restart.
    pub fn request_system_action(&self, label: &str, action: ActionKind) -> Result<()> {
        let seeding_label = if !self.config.seeded {
            self.config.seeding_label.as_deref()
        } else {
            None
        };
        dispatcher::request_system_action(
            &self.catalog,
            &self.boot,
            &self.restart,
            label,
            action,
            Some(self.config.device_mode),
            self.config.current_label.as_deref(),
            seeding_label,
        )?;
        self.state.lock().unwrap().pending_restart = true;
        Ok(())
    }

    /// Restart into a system, bypassing the action-derivation table.
    pub fn reboot(&self, label: Option<&str>, mode: Option<Mode>) -> Result<()> {
        dispatcher::reboot(
            &self.catalog,
            &self.boot,
            &self.restart,
            label,
            mode,
            Some(self.config.device_mode),
            self.config.current_label.as_deref(),
        )?;
        self.state.lock().unwrap().pending_restart = true;
        Ok(())
    }

    /// Run the tried-system reconciler once. Idempotent; safe to call on
    /// every startup (spec §4.5, §6 `Ensure`).
    ///
    /// Clears `pending_restart` first: by the time this runs, a boot has
    /// happened from this crate's point of view, which is exactly what
    /// [`Manager::finalize_recovery_system`]'s `Wait`/retry check needs to
    /// observe (spec §4.6.2). On [`ReconcileOutcome::Succeeded`], the label
    /// is appended (deduplicated) to the in-process `tried-systems` list.
    pub fn ensure(&self) -> Result<ReconcileOutcome> {
        let current_recovery_systems = self.modeenv.read(self.config.legacy_device)?.current_recovery_systems;
        let outcome =
            Reconciler::new(BootVarsGateway::new(PassthroughBootVars(&self.boot))).ensure(&current_recovery_systems)?;
        let mut state = self.state.lock().unwrap();
        state.pending_restart = false;
        if let ReconcileOutcome::Succeeded { label } = &outcome {
            if !state.tried_systems.iter().any(|l| l == label) {
                state.tried_systems.push(label.clone());
            }
        }
        Ok(outcome)
    }

    fn begin_change(&self, kind: ChangeKind) -> Result<ChangeId> {
        let mut state = self.state.lock().unwrap();
        if let Some((existing_kind, existing_id)) = &state.in_flight {
            return Err(RecoveryError::ChangeConflict {
                kind: *existing_kind,
                id: existing_id.clone(),
            });
        }
        state.next_change_id += 1;
        let id = ChangeId(format!("{kind}-{}", state.next_change_id));
        state.in_flight = Some((kind, id.clone()));
        Ok(id)
    }

    fn end_change(&self) {
        let mut state = self.state.lock().unwrap();
        state.in_flight = None;
    }

    /// Run the `Do` phase of creating a new recovery system: stage files
    /// and provisionally register `label`.
    ///
    /// When `options.test_system` is set, this also stages the post-reboot
    /// probe (spec §4.6.1 step 8): `try_recovery_system`/
    /// `recovery_system_status` are committed, the next boot is staged to
    /// `mode=recover, system=<label>`, and a restart is requested — the
    /// returned setup carries `state == Wait`. Otherwise the caller is
    /// expected to follow up immediately with
    /// [`Manager::finalize_recovery_system`] (`state == Do`, no restart).
    /// Either way the in-flight `CreateRecoverySystem` change started here
    /// is held open until a follow-up `finalize_recovery_system` or
    /// `undo_recovery_system` call releases it.
    pub fn create_recovery_system(
        &self,
        label: &str,
        required_components: &[ComponentRef],
        options: CreateOptions,
    ) -> Result<RecoverySystemSetup> {
        let _change = self.begin_change(ChangeKind::CreateRecoverySystem)?;
        let previous_default = self.state.lock().unwrap().default.clone();
        let outcome = (|| {
            let mut env = self.modeenv.read(self.config.legacy_device)?;
            let mut setup = lifecycle::create(
                &self.components,
                &self.snap_setup,
                required_components,
                &mut env,
                label,
                &options,
                previous_default,
                self.config.seeded,
            )?;
            if options.test_system {
                let mut vars = BootVars::new();
                vars.insert(bootkeys::TRY_SYSTEM.into(), label.to_string());
                vars.insert(bootkeys::STATUS.into(), bootkeys::STATUS_TRY.into());
                vars.insert(bootkeys::MODE.into(), Mode::Recover.as_str().into());
                vars.insert(bootkeys::SYSTEM.into(), label.to_string());
                self.boot
                    .set(&vars)
                    .map_err(|e| RecoveryError::boot_io_for_action(label, Mode::Recover, e))?;
                self.modeenv.write(&env)?;
                self.restart
                    .request_restart("probe recovery system")
                    .map_err(|e| RecoveryError::boot_io("requesting probe restart", e))?;
                self.state.lock().unwrap().pending_restart = true;
                setup.state = lifecycle::TaskState::Wait;
                tracing::info!("restarting to probe recovery system \"{label}\"");
            } else {
                self.modeenv.write(&env)?;
            }
            Ok(setup)
        })();
        if outcome.is_err() {
            self.end_change();
        }
        outcome
    }

    /// Finalize a created recovery system: called either right after
    /// `create_recovery_system` when no probe was requested, or after a
    /// probe's outcome is known (spec §4.6.2). Releases the in-flight
    /// `CreateRecoverySystem` change unless this returns with `setup.state
    /// == Wait`, meaning the restart barrier hasn't cleared yet and the
    /// caller should call again after the next [`Manager::ensure`].
    pub fn finalize_recovery_system(&self, mut setup: RecoverySystemSetup) -> Result<()> {
        let (pending_restart, tried_systems) = {
            let state = self.state.lock().unwrap();
            (state.pending_restart, state.tried_systems.clone())
        };
        let outcome = (|| {
            let mut env = self.modeenv.read(self.config.legacy_device)?;
            lifecycle::finalize(&mut setup, &mut env, &tried_systems, pending_restart)?;
            self.modeenv.write(&env)
        })();
        if setup.state == lifecycle::TaskState::Wait {
            return outcome;
        }
        if outcome.is_ok() {
            let mut state = self.state.lock().unwrap();
            state.tried_systems.retain(|l| l != &setup.label);
            if setup.mark_default {
                let now = Utc::now();
                state.default = Some(DefaultRecoverySystem {
                    label: setup.label.clone(),
                    model: String::new(),
                    brand: String::new(),
                    revision: setup.label.clone(),
                    timestamp: now,
                    time_made_default: now,
                });
            }
            if setup.mark_current {
                state.seeded_systems.insert(
                    0,
                    SeededSystem {
                        label: setup.label.clone(),
                        model: String::new(),
                        brand: String::new(),
                        revision: setup.label.clone(),
                        timestamp: Utc::now(),
                    },
                );
            }
        }
        self.end_change();
        outcome
    }

    /// Undo a recovery system whose post-reboot probe failed (or whose `Do`
    /// phase itself failed before any probe). Restores the previous default
    /// and drops any tried-systems entry this create's own probe left
    /// behind (spec §4.6.3), then releases the in-flight
    /// `CreateRecoverySystem` change.
    pub fn undo_recovery_system(&self, mut setup: RecoverySystemSetup) -> Result<()> {
        let was_probed = setup.state == lifecycle::TaskState::Wait;
        let outcome = (|| {
            let mut env = self.modeenv.read(self.config.legacy_device)?;
            if was_probed {
                lifecycle::undo_failed_probe(&mut setup, &mut env, &self.snap_setup)?;
            } else {
                lifecycle::undo_failed_do(&mut setup, &mut env, &self.snap_setup)?;
            }
            self.modeenv.write(&env)
        })();
        if outcome.is_ok() {
            let mut state = self.state.lock().unwrap();
            state.default = setup.previous_default.clone();
            state.tried_systems.retain(|l| l != &setup.label);
        }
        self.end_change();
        outcome
    }

    /// Remove a recovery system.
    ///
    /// Computes the unique-component set from the catalog before deleting
    /// anything (spec §4.6.5 step 2), so a caller that retries after a
    /// partial failure recomputes the same authoritative list from the
    /// same unchanged catalog state.
    pub fn remove_recovery_system(&self, label: &str) -> Result<()> {
        let current_label = self
            .config
            .current_label
            .clone()
            .ok_or_else(|| RecoveryError::InternalError("no current system known".into()))?;
        let _change = self.begin_change(ChangeKind::RemoveRecoverySystem)?;
        let outcome = (|| {
            let mut env = self.modeenv.read(self.config.legacy_device)?;
            let unique_paths = if env.current_recovery_systems.iter().any(|l| l == label) {
                let target = self.catalog.open(label)?;
                let mut others = Vec::new();
                for other_label in &env.current_recovery_systems {
                    if other_label == label {
                        continue;
                    }
                    if let Ok(other) = self.catalog.open(other_label) {
                        others.push(other.required_components);
                    }
                }
                let others_slices: Vec<&[ComponentRef]> = others.iter().map(|v| v.as_slice()).collect();
                lifecycle::unique_components(&target.required_components, others_slices)
                    .into_iter()
                    .map(lifecycle::component_blob_path)
                    .collect()
            } else {
                Vec::new()
            };
            lifecycle::remove(
                &self.snap_setup,
                &mut env,
                self.state.lock().unwrap().default.as_ref(),
                &current_label,
                label,
                &unique_paths,
            )?;
            self.modeenv.write(&env)
        })();
        self.end_change();
        outcome
    }
}

/// Lets [`Manager::ensure`] build a fresh [`Reconciler`] over the same
/// backend each time without taking ownership of it.
#[derive(Debug)]
struct PassthroughBootVars<'a, BV>(&'a BootVarsGateway<BV>);

impl<BV: BootVarsBackend> BootVarsBackend for PassthroughBootVars<'_, BV> {
    fn get(&self, keys: &[&str]) -> anyhow::Result<crate::model::BootVars> {
        self.0.get(keys)
    }
    fn set(&self, vars: &crate::model::BootVars) -> anyhow::Result<()> {
        self.0.set(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{InMemoryBootVars, InMemoryModeEnv, InMemorySeedBackend, RecordingRestart};
    use crate::lifecycle::{LocalSnap, SideInfo};
    use anyhow::Result as AnyResult;

    #[derive(Debug)]
    struct FakeComponents(Vec<SideInfo>);
    impl InstalledComponentsProvider for FakeComponents {
        fn installed(&self) -> AnyResult<Vec<SideInfo>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug, Default)]
    struct FakeSnapSetup;
    impl SnapSetupCarrier for FakeSnapSetup {
        fn stage(&self, label: &str, snaps: &[LocalSnap]) -> AnyResult<Vec<String>> {
            Ok(snaps
                .iter()
                .map(|s| format!("{label}/{}.snap", s.component.name))
                .collect())
        }
        fn remove(&self, _label: &str, _paths: &[String]) -> AnyResult<()> {
            Ok(())
        }
    }

    fn manager(
        device_mode: Mode,
        current_label: Option<&str>,
    ) -> Manager<InMemoryModeEnv, InMemoryBootVars, InMemorySeedBackend, RecordingRestart, FakeComponents, FakeSnapSetup>
    {
        let mut seed = InMemorySeedBackend::new_empty();
        seed.add_system("20191119", "my-model", "generic");
        Manager::new(
            Config {
                legacy_device: true,
                device_mode,
                current_label: current_label.map(String::from),
                default_recovery_system: None,
                seeded: true,
                seeding_label: None,
            },
            InMemoryModeEnv::default(),
            InMemoryBootVars::default(),
            seed,
            RecordingRestart::default(),
            FakeComponents(vec![]),
            FakeSnapSetup,
        )
    }

    #[test]
    fn test_request_action_then_ensure_noop() {
        let mgr = manager(Mode::Run, Some("20191119"));
        mgr.request_system_action("20191119", ActionKind::Reinstall).unwrap();
        assert_eq!(mgr.ensure().unwrap(), ReconcileOutcome::NoOp);
    }

    #[test]
    fn test_concurrent_create_is_rejected() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let _first = mgr.begin_change(ChangeKind::CreateRecoverySystem).unwrap();
        let err = mgr
            .create_recovery_system("20200318", &[], CreateOptions::default())
            .unwrap_err();
        assert!(matches!(err, RecoveryError::ChangeConflict { .. }));
    }

    #[test]
    fn test_unrelated_in_flight_create_does_not_block_other_actions() {
        // An in-flight CreateRecoverySystem change is not the same thing as
        // the device still performing its initial seeding: a user action on
        // an unrelated, already-seeded label must not be rejected just
        // because some other change happens to be in flight.
        let mgr = manager(Mode::Run, Some("20191119"));
        let _first = mgr.begin_change(ChangeKind::CreateRecoverySystem).unwrap();
        mgr.request_system_action("20191119", ActionKind::Reinstall).unwrap();
    }

    #[test]
    fn test_seeding_conflict_keyed_on_seeding_label_not_any_in_flight_change() {
        let mut seed = InMemorySeedBackend::new_empty();
        seed.add_system("20191119", "my-model", "generic");
        let mgr: Manager<
            InMemoryModeEnv,
            InMemoryBootVars,
            InMemorySeedBackend,
            RecordingRestart,
            FakeComponents,
            FakeSnapSetup,
        > = Manager::new(
            Config {
                legacy_device: true,
                device_mode: Mode::Run,
                current_label: None,
                default_recovery_system: None,
                seeded: false,
                seeding_label: Some("20191119".to_string()),
            },
            InMemoryModeEnv::default(),
            InMemoryBootVars::default(),
            seed,
            RecordingRestart::default(),
            FakeComponents(vec![]),
            FakeSnapSetup,
        );
        let err = mgr
            .request_system_action("20191119", ActionKind::Recover)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::SeedingConflict { .. }));
        // Install is the escape hatch even mid-seed.
        mgr.request_system_action("20191119", ActionKind::Install).unwrap();
    }

    #[test]
    fn test_create_recovery_system_rejects_when_device_not_seeded() {
        let mut seed = InMemorySeedBackend::new_empty();
        seed.add_system("20191119", "my-model", "generic");
        let mgr: Manager<
            InMemoryModeEnv,
            InMemoryBootVars,
            InMemorySeedBackend,
            RecordingRestart,
            FakeComponents,
            FakeSnapSetup,
        > = Manager::new(
            Config {
                legacy_device: true,
                device_mode: Mode::Run,
                current_label: None,
                default_recovery_system: None,
                seeded: false,
                seeding_label: Some("20191119".to_string()),
            },
            InMemoryModeEnv::default(),
            InMemoryBootVars::default(),
            seed,
            RecordingRestart::default(),
            FakeComponents(vec![]),
            FakeSnapSetup,
        );
        let err = mgr
            .create_recovery_system("20200318", &[], CreateOptions::default())
            .unwrap_err();
        assert!(matches!(err, RecoveryError::UnsupportedAction(_)));
        // The failed create released its in-flight change.
        mgr.begin_change(ChangeKind::CreateRecoverySystem).unwrap();
    }

    #[test]
    fn test_create_then_finalize_without_probe() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let setup = mgr
            .create_recovery_system("20200318", &[], CreateOptions::default())
            .unwrap();
        assert_eq!(setup.state, crate::lifecycle::TaskState::Do);
        mgr.finalize_recovery_system(setup).unwrap();
        let env = mgr.modeenv.read(true).unwrap();
        assert!(env.good_recovery_systems.contains(&"20200318".to_string()));
    }

    #[test]
    fn test_create_with_failed_probe_undo_fully_unwinds() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let options = CreateOptions {
            test_system: false,
            ..Default::default()
        };
        let setup = mgr.create_recovery_system("20200318", &[], options).unwrap();
        assert_eq!(setup.state, crate::lifecycle::TaskState::Do);
        mgr.undo_recovery_system(setup).unwrap();
        let env = mgr.modeenv.read(true).unwrap();
        assert!(!env.current_recovery_systems.contains(&"20200318".to_string()));
    }

    #[test]
    fn test_create_test_system_stages_probe_and_requests_restart() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let options = CreateOptions {
            test_system: true,
            ..Default::default()
        };
        let setup = mgr.create_recovery_system("20200318", &[], options).unwrap();
        assert_eq!(setup.state, crate::lifecycle::TaskState::Wait);
        assert!(mgr.state.lock().unwrap().pending_restart);
        assert_eq!(
            *mgr.restart.requests.lock().unwrap(),
            vec!["probe recovery system".to_string()]
        );
        let vars = mgr.boot.get(&[bootkeys::TRY_SYSTEM, bootkeys::STATUS]).unwrap();
        assert_eq!(vars.get(bootkeys::TRY_SYSTEM).unwrap(), "20200318");
        assert_eq!(vars.get(bootkeys::STATUS).unwrap(), bootkeys::STATUS_TRY);
    }

    #[test]
    fn test_create_test_system_failed_probe_leaves_label_registered() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let options = CreateOptions {
            test_system: true,
            ..Default::default()
        };
        let setup = mgr.create_recovery_system("20200318", &[], options).unwrap();
        mgr.undo_recovery_system(setup).unwrap();
        let env = mgr.modeenv.read(true).unwrap();
        assert!(env.current_recovery_systems.contains(&"20200318".to_string()));
        assert!(!env.good_recovery_systems.contains(&"20200318".to_string()));
    }

    #[test]
    fn test_create_test_system_successful_probe_promotes_and_marks_current() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let options = CreateOptions {
            test_system: true,
            mark_current: true,
            ..Default::default()
        };
        let setup = mgr.create_recovery_system("20200318", &[], options).unwrap();

        // A retry before the reboot barrier clears is a no-op retained Wait.
        let retry = mgr.finalize_recovery_system(setup.clone());
        assert!(retry.is_ok());

        // Simulate the reboot: the bootloader recorded a successful try.
        mgr.boot
            .set(&{
                let mut vars = BootVars::new();
                vars.insert(bootkeys::TRY_SYSTEM.into(), "20200318".into());
                vars.insert(bootkeys::STATUS.into(), bootkeys::STATUS_TRIED.into());
                vars
            })
            .unwrap();
        assert_eq!(
            mgr.ensure().unwrap(),
            ReconcileOutcome::Succeeded {
                label: "20200318".into()
            }
        );

        mgr.finalize_recovery_system(setup).unwrap();
        let env = mgr.modeenv.read(true).unwrap();
        assert!(env.good_recovery_systems.contains(&"20200318".to_string()));
        assert_eq!(mgr.seeded_systems()[0].label, "20200318");
    }

    #[test]
    fn test_remove_rejects_current_system() {
        let mgr = manager(Mode::Run, Some("20191119"));
        let setup = mgr
            .create_recovery_system("20191119", &[], CreateOptions::default())
            .unwrap();
        mgr.finalize_recovery_system(setup).unwrap();
        let setup = mgr
            .create_recovery_system("20200318", &[], CreateOptions::default())
            .unwrap();
        mgr.finalize_recovery_system(setup).unwrap();
        let err = mgr.remove_recovery_system("20191119").unwrap_err();
        assert!(matches!(err, RecoveryError::UnsupportedAction(_)));
    }
}
