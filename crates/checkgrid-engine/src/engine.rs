//! The event-driven engine that composes catalog, selection, cache, and runs.
//!
//! The engine is owned by a single task. Operations never block: network
//! requests are spawned onto the runtime and their completions come back as
//! [`EngineEvent`]s, which the owner feeds to [`Engine::handle`] (or lets
//! [`Engine::step`] receive and apply). The only timer is the one-shot
//! settle delay after a run is queued.
//!
//! ```text
//! load_catalog ──▶ GroupsLoaded / WorkersLoaded
//! toggle_*     ──▶ ResultFetched / HistoryFetched
//! run_check    ──▶ RunSubmitted ──(settle_delay)──▶ SettleDue ──▶ invalidate history
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use checkgrid_client::{CheckService, ClientError, ClientResult};
use checkgrid_core::config::DEFAULT_SETTLE_DELAY;
use checkgrid_core::kwargs;
use checkgrid_core::{
    CheckDefinition, CheckGridConfig, CheckGroup, CheckHistory, CheckResult, Kwargs, RunAck,
    Worker,
};

use crate::cache::{self, FetchKind};
use crate::catalog::{Catalog, CatalogPart};
use crate::error::{EngineError, EngineResult};
use crate::run::{RunPhase, RunTicket};
use crate::selection::{self, SelectionModel};
use crate::state::{CheckArena, CheckId, CheckRuntimeState};

/// Completion of an operation the engine started.
#[derive(Debug)]
pub enum EngineEvent {
    GroupsLoaded {
        generation: u64,
        outcome: ClientResult<Vec<CheckGroup>>,
    },
    WorkersLoaded {
        generation: u64,
        outcome: ClientResult<Vec<Worker>>,
    },
    ResultFetched {
        id: CheckId,
        outcome: ClientResult<CheckResult>,
    },
    HistoryFetched {
        id: CheckId,
        outcome: ClientResult<CheckHistory>,
    },
    RunSubmitted {
        id: CheckId,
        seq: u64,
        outcome: ClientResult<RunAck>,
    },
    SettleDue {
        id: CheckId,
        seq: u64,
    },
}

impl EngineEvent {
    /// Whether this event completes a network request (as opposed to a timer).
    fn is_request(&self) -> bool {
        !matches!(self, EngineEvent::SettleDue { .. })
    }
}

/// Check orchestration engine for one environment.
pub struct Engine<S: CheckService> {
    service: Arc<S>,
    environment: String,
    settle_delay: Duration,
    catalog: Catalog,
    selection: SelectionModel,
    checks: CheckArena,
    /// Pending settle timers, one per check at most.
    timers: HashMap<CheckId, JoinHandle<()>>,
    next_seq: u64,
    /// Requests spawned whose completion has not been handled yet.
    pending: usize,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl<S: CheckService> Engine<S> {
    /// Create an engine scoped to `environment` with the default settle delay.
    pub fn new(service: S, environment: &str) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            service: Arc::new(service),
            environment: environment.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            catalog: Catalog::new(),
            selection: SelectionModel::new(),
            checks: CheckArena::new(),
            timers: HashMap::new(),
            next_seq: 0,
            pending: 0,
            events_tx,
            events_rx,
        }
    }

    /// Create an engine from a loaded configuration.
    pub fn from_config(service: S, config: &CheckGridConfig) -> EngineResult<Self> {
        let delay = config
            .settle_delay()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(Self::new(service, &config.service.environment).with_settle_delay(delay))
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    /// Runtime state of `name`, if it has been referenced.
    pub fn check_state(&self, name: &str) -> Option<&CheckRuntimeState> {
        self.checks.by_name(name)
    }

    /// Number of checks with runtime state.
    pub fn tracked_checks(&self) -> usize {
        self.checks.len()
    }

    /// Requests in flight whose completion has not been handled.
    pub fn pending_requests(&self) -> usize {
        self.pending
    }

    // ── Event loop ─────────────────────────────────────────────────

    /// Receive one completion and apply it.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no event.
    pub async fn step(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle(event);
        }
    }

    /// Apply completions until no request is in flight.
    ///
    /// Settle timers are not waited for, but a timer that fires meanwhile
    /// is applied like any other event.
    pub async fn settle_pending(&mut self) {
        while self.pending > 0 {
            self.step().await;
        }
    }

    /// Apply completions until `name` has no open run ticket.
    pub async fn wait_for_run(&mut self, name: &str) {
        while self.run_phase(name).is_open() {
            self.step().await;
        }
        self.settle_pending().await;
    }

    /// Apply one completion.
    ///
    /// Events normally arrive through [`Engine::step`]. Each request event
    /// counts down [`Engine::pending_requests`] exactly once.
    pub fn handle(&mut self, event: EngineEvent) {
        if event.is_request() {
            self.pending = self.pending.saturating_sub(1);
        }

        match event {
            EngineEvent::GroupsLoaded { generation, outcome } => {
                if generation != self.catalog.generation() {
                    debug!(generation, "dropping stale check catalog response");
                    return;
                }
                match outcome {
                    Ok(groups) => {
                        self.catalog.publish_groups(groups);
                        self.refresh_resolved_kwargs();
                    }
                    Err(e) => self.catalog.fail(CatalogPart::Checks, e.to_string()),
                }
            }
            EngineEvent::WorkersLoaded { generation, outcome } => {
                if generation != self.catalog.generation() {
                    debug!(generation, "dropping stale worker list response");
                    return;
                }
                match outcome {
                    Ok(workers) => self.catalog.publish_workers(workers),
                    Err(e) => self.catalog.fail(CatalogPart::Workers, e.to_string()),
                }
            }
            EngineEvent::ResultFetched { id, outcome } => {
                let outcome = outcome.map_err(|e| self.fetch_error(id, FetchKind::Result, e));
                cache::complete_result(&mut self.checks, id, outcome);
            }
            EngineEvent::HistoryFetched { id, outcome } => {
                let outcome = outcome.map_err(|e| self.fetch_error(id, FetchKind::History, e));
                cache::complete_history(&mut self.checks, id, outcome);
            }
            EngineEvent::RunSubmitted { id, seq, outcome } => self.on_run_submitted(id, seq, outcome),
            EngineEvent::SettleDue { id, seq } => self.on_settle_due(id, seq),
        }
    }

    // ── Catalog ────────────────────────────────────────────────────

    /// Issue the two independent catalog requests.
    ///
    /// Calling again is the user-initiated retry; responses to an older
    /// load are dropped.
    pub fn load_catalog(&mut self) {
        let generation = self.catalog.begin_load();
        info!(environment = %self.environment, generation, "loading check catalog");

        let service = Arc::clone(&self.service);
        self.spawn_request(
            async move { service.grouped_checks().await },
            move |outcome| EngineEvent::GroupsLoaded { generation, outcome },
        );

        let service = Arc::clone(&self.service);
        self.spawn_request(
            async move { service.workers().await },
            move |outcome| EngineEvent::WorkersLoaded { generation, outcome },
        );
    }

    // ── Selection ──────────────────────────────────────────────────

    /// Expand or collapse a group. Returns `true` if it is now expanded.
    pub fn toggle_group(&mut self, group: &str) -> EngineResult<bool> {
        let checks = self.group_checks(group)?;
        let selected = self.selection.toggle_group(group);
        if selected {
            self.open_group(&checks);
        } else {
            self.close_group(&checks);
        }
        debug!(%group, selected, "group toggled");
        Ok(selected)
    }

    /// Expand every group, or collapse to the first if all are expanded.
    pub fn toggle_all_groups(&mut self) {
        let names: Vec<String> = self.catalog.groups().iter().map(|g| g.name.clone()).collect();
        let plan = self.selection.toggle_all_groups(&names);

        for group in &plan.opened {
            if let Ok(checks) = self.group_checks(group) {
                self.open_group(&checks);
            }
        }
        for group in &plan.closed {
            if let Ok(checks) = self.group_checks(group) {
                self.close_group(&checks);
            }
        }
    }

    pub fn is_group_selected(&self, group: &str) -> bool {
        self.selection.is_group_selected(group)
    }

    /// Flip the result detail of a check. Returns `true` if now shown.
    pub fn toggle_check_detail(&mut self, name: &str) -> EngineResult<bool> {
        self.toggle_shown(name, FetchKind::Result)
    }

    /// Flip the history panel of a check. Returns `true` if now shown.
    pub fn toggle_check_history(&mut self, name: &str) -> EngineResult<bool> {
        let shown = self.toggle_shown(name, FetchKind::History)?;
        if shown {
            self.selection.show_history(name);
        } else {
            self.selection.hide_history(name);
        }
        Ok(shown)
    }

    /// "Show all / hide all" for a group's result details.
    ///
    /// Hides every detail if any is shown, otherwise shows all of them.
    /// Returns `true` if details are now shown.
    pub fn toggle_group_details(&mut self, group: &str) -> EngineResult<bool> {
        let checks = self.group_checks(group)?;
        let names: Vec<&str> = checks.iter().map(|c| c.name.as_str()).collect();
        let show = !self.is_any_result_shown(&names);

        for check in &checks {
            let id = self.ensure_state(check);
            self.checks
                .update(id, |s| s.with_shown(FetchKind::Result, show));
            if show {
                self.fetch_if_absent(id, FetchKind::Result);
            }
        }
        Ok(show)
    }

    /// Whether any of `names` shows its result detail. False when empty.
    pub fn is_any_result_shown(&self, names: &[&str]) -> bool {
        selection::is_any_result_shown(names.iter().map(|n| self.checks.by_name(n)))
    }

    /// Whether all of `names` show their result detail. True when empty.
    pub fn are_all_details_shown(&self, names: &[&str]) -> bool {
        selection::are_all_details_shown(names.iter().map(|n| self.checks.by_name(n)))
    }

    // ── Cache ──────────────────────────────────────────────────────

    /// Fetch the latest result unless cached or already in flight.
    pub fn fetch_result_if_absent(&mut self, name: &str) -> EngineResult<bool> {
        let id = self.reference(name)?;
        Ok(self.fetch_if_absent(id, FetchKind::Result))
    }

    /// Fetch run history unless cached or already in flight.
    pub fn fetch_history_if_absent(&mut self, name: &str) -> EngineResult<bool> {
        let id = self.reference(name)?;
        Ok(self.fetch_if_absent(id, FetchKind::History))
    }

    /// Drop the cached result; re-fetch at once if the detail is shown.
    pub fn invalidate_result(&mut self, name: &str) -> EngineResult<()> {
        self.invalidate_by_name(name, FetchKind::Result)
    }

    /// Drop the cached history; re-fetch at once if it is shown.
    pub fn invalidate_history(&mut self, name: &str) -> EngineResult<()> {
        self.invalidate_by_name(name, FetchKind::History)
    }

    /// Explicit refresh: invalidate and fetch regardless of visibility.
    pub fn refresh_result(&mut self, name: &str) -> EngineResult<()> {
        let id = self.reference(name)?;
        self.invalidate(id, FetchKind::Result);
        self.fetch_if_absent(id, FetchKind::Result);
        Ok(())
    }

    /// Explicit refresh of the run history.
    pub fn refresh_history(&mut self, name: &str) -> EngineResult<()> {
        let id = self.reference(name)?;
        self.invalidate(id, FetchKind::History);
        self.fetch_if_absent(id, FetchKind::History);
        Ok(())
    }

    // ── Kwargs ─────────────────────────────────────────────────────

    /// Effective kwargs for a run of `name` right now.
    pub fn resolved_kwargs(&self, name: &str) -> EngineResult<Kwargs> {
        let check = self.definition(name)?;
        let overrides = self
            .checks
            .by_name(name)
            .map(|s| s.kwargs_overrides.clone())
            .unwrap_or_default();
        Ok(kwargs::resolve(check, &self.environment, &overrides))
    }

    /// Set a user override for one argument.
    pub fn set_kwarg_override(&mut self, name: &str, key: &str, value: Value) -> EngineResult<()> {
        let id = self.reference(name)?;
        let mut overrides = self.overrides_of(id);
        overrides.insert(key.to_string(), value);
        self.apply_overrides(name, id, overrides)
    }

    /// Remove a user override, falling back to schedule/default values.
    pub fn remove_kwarg_override(&mut self, name: &str, key: &str) -> EngineResult<()> {
        let id = self.reference(name)?;
        let mut overrides = self.overrides_of(id);
        overrides.remove(key);
        self.apply_overrides(name, id, overrides)
    }

    pub fn clear_kwarg_overrides(&mut self, name: &str) -> EngineResult<()> {
        let id = self.reference(name)?;
        self.apply_overrides(name, id, Kwargs::new())
    }

    // ── Runs ───────────────────────────────────────────────────────

    /// Submit a run of `name` with its effective kwargs.
    ///
    /// Returns `false` without sending anything while a previous run of the
    /// same check is still queueing or queued.
    pub fn run_check(&mut self, name: &str) -> EngineResult<bool> {
        let check = self.definition(name)?.clone();
        let id = self.ensure_state(&check);

        let Some(state) = self.checks.get(id) else {
            return Err(EngineError::UnknownCheck(name.to_string()));
        };
        if state.run_ticket.as_ref().is_some_and(RunTicket::is_open) {
            debug!(check = %name, "run already outstanding, ignoring");
            return Ok(false);
        }

        let overrides = state.kwargs_overrides.clone();
        let resolved = kwargs::resolve(&check, &self.environment, &overrides);

        self.next_seq += 1;
        let seq = self.next_seq;
        let ticket = RunTicket::submit(seq, resolved.clone());
        self.checks.update(id, |s| {
            s.with_kwargs(overrides, resolved.clone())
                .with_ticket(Some(ticket))
                .with_run_error(None)
        });
        self.cancel_timer(id);

        info!(check = %name, seq, "submitting run");
        let service = Arc::clone(&self.service);
        let check_name = name.to_string();
        self.spawn_request(
            async move { service.run_check(&check_name, &resolved).await },
            move |outcome| EngineEvent::RunSubmitted { id, seq, outcome },
        );
        Ok(true)
    }

    /// Close the run banner. Does not cancel an in-flight submission.
    pub fn dismiss_run(&mut self, name: &str) -> EngineResult<()> {
        self.definition(name)?;
        if let Some(id) = self.checks.id_of(name) {
            self.cancel_timer(id);
            self.checks
                .update(id, |s| s.with_ticket(None).with_run_error(None));
            debug!(check = %name, "run ticket dismissed");
        }
        Ok(())
    }

    /// Run phase of `name`; `Idle` when nothing is tracked.
    pub fn run_phase(&self, name: &str) -> RunPhase {
        self.checks
            .by_name(name)
            .map(CheckRuntimeState::run_phase)
            .unwrap_or(RunPhase::Idle)
    }

    /// Forget a check's runtime state and cancel its settle timer.
    pub fn release_check(&mut self, name: &str) -> bool {
        let Some((id, _)) = self.checks.release(name) else {
            return false;
        };
        self.cancel_timer(id);
        self.selection.hide_history(name);
        debug!(check = %name, "check state released");
        true
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Run `request` on its own task and report its outcome through `wrap`.
    ///
    /// A request task that panics or is cancelled still reports, as
    /// [`ClientError::Aborted`], so `pending` always drains.
    fn spawn_request<T, F, W>(&mut self, request: F, wrap: W)
    where
        T: Send + 'static,
        F: Future<Output = ClientResult<T>> + Send + 'static,
        W: FnOnce(ClientResult<T>) -> EngineEvent + Send + 'static,
    {
        self.pending += 1;
        let tx = self.events_tx.clone();
        let task = tokio::spawn(request);
        tokio::spawn(async move {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "request task failed");
                    Err(ClientError::Aborted(e.to_string()))
                }
            };
            // The receiver lives as long as the engine; a send error only
            // means the engine is gone.
            let _ = tx.send(wrap(outcome));
        });
    }

    fn schedule_settle(&mut self, id: CheckId, seq: u64) {
        let tx = self.events_tx.clone();
        let delay = self.settle_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(EngineEvent::SettleDue { id, seq });
        });
        if let Some(old) = self.timers.insert(id, handle) {
            old.abort();
        }
    }

    fn cancel_timer(&mut self, id: CheckId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }

    fn definition(&self, name: &str) -> EngineResult<&CheckDefinition> {
        self.catalog
            .find_check(name)
            .ok_or_else(|| EngineError::UnknownCheck(name.to_string()))
    }

    fn group_checks(&self, group: &str) -> EngineResult<Vec<CheckDefinition>> {
        self.catalog
            .group(group)
            .map(|g| g.checks.clone())
            .ok_or_else(|| EngineError::UnknownGroup(group.to_string()))
    }

    /// Id of a catalog check, creating its runtime state on first reference.
    fn reference(&mut self, name: &str) -> EngineResult<CheckId> {
        let check = self.definition(name)?.clone();
        Ok(self.ensure_state(&check))
    }

    fn ensure_state(&mut self, check: &CheckDefinition) -> CheckId {
        let (id, created) = self.checks.ensure(&check.name);
        if created {
            let resolved = kwargs::resolve(check, &self.environment, &Kwargs::new());
            self.checks
                .update(id, |s| s.with_kwargs(Kwargs::new(), resolved));
            debug!(check = %check.name, "check state created");
        }
        id
    }

    fn open_group(&mut self, checks: &[CheckDefinition]) {
        for check in checks {
            let id = self.ensure_state(check);
            self.fetch_if_absent(id, FetchKind::Result);
        }
    }

    fn close_group(&mut self, checks: &[CheckDefinition]) {
        for check in checks {
            let Some(id) = self.checks.id_of(&check.name) else {
                continue;
            };
            if self.checks.get(id).is_some_and(|s| s.show_history) {
                self.checks
                    .update(id, |s| s.with_shown(FetchKind::History, false));
                self.selection.hide_history(&check.name);
            }
        }
    }

    fn toggle_shown(&mut self, name: &str, kind: FetchKind) -> EngineResult<bool> {
        let id = self.reference(name)?;
        let shown = self
            .checks
            .update(id, |s| s.with_shown(kind, !s.is_shown(kind)))
            .is_some_and(|s| s.is_shown(kind));
        if shown {
            self.fetch_if_absent(id, kind);
        }
        Ok(shown)
    }

    fn fetch_if_absent(&mut self, id: CheckId, kind: FetchKind) -> bool {
        if !cache::begin_fetch(&mut self.checks, id, kind) {
            return false;
        }
        let Some(name) = self.checks.get(id).map(|s| s.name.clone()) else {
            return false;
        };
        debug!(check = %name, %kind, "fetching");

        let service = Arc::clone(&self.service);
        match kind {
            FetchKind::Result => self.spawn_request(
                async move { service.check_result(&name).await },
                move |outcome| EngineEvent::ResultFetched { id, outcome },
            ),
            FetchKind::History => self.spawn_request(
                async move { service.check_history(&name).await },
                move |outcome| EngineEvent::HistoryFetched { id, outcome },
            ),
        }
        true
    }

    fn invalidate(&mut self, id: CheckId, kind: FetchKind) {
        if cache::invalidate(&mut self.checks, id, kind) {
            self.fetch_if_absent(id, kind);
        }
    }

    fn invalidate_by_name(&mut self, name: &str, kind: FetchKind) -> EngineResult<()> {
        self.definition(name)?;
        // Nothing is cached for a check that was never referenced.
        if let Some(id) = self.checks.id_of(name) {
            self.invalidate(id, kind);
        }
        Ok(())
    }

    fn overrides_of(&self, id: CheckId) -> Kwargs {
        self.checks
            .get(id)
            .map(|s| s.kwargs_overrides.clone())
            .unwrap_or_default()
    }

    fn apply_overrides(&mut self, name: &str, id: CheckId, overrides: Kwargs) -> EngineResult<()> {
        let check = self.definition(name)?;
        let resolved = kwargs::resolve(check, &self.environment, &overrides);
        self.checks.update(id, |s| s.with_kwargs(overrides, resolved));
        Ok(())
    }

    /// Re-resolve kwargs of tracked checks after the catalog changed.
    fn refresh_resolved_kwargs(&mut self) {
        let updates: Vec<(CheckId, Kwargs)> = self
            .checks
            .iter()
            .filter_map(|(id, state)| {
                let check = self.catalog.find_check(&state.name)?;
                Some((
                    id,
                    kwargs::resolve(check, &self.environment, &state.kwargs_overrides),
                ))
            })
            .collect();
        for (id, resolved) in updates {
            self.checks.update(id, |s| {
                s.with_kwargs(s.kwargs_overrides.clone(), resolved)
            });
        }
    }

    fn fetch_error(
        &self,
        id: CheckId,
        kind: FetchKind,
        error: ClientError,
    ) -> EngineError {
        let check = self
            .checks
            .get(id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        warn!(%check, %kind, error = %error, "fetch failed");
        EngineError::Fetch {
            check,
            kind,
            reason: error.to_string(),
        }
    }

    fn on_run_submitted(&mut self, id: CheckId, seq: u64, outcome: ClientResult<RunAck>) {
        let Some(state) = self.checks.get(id) else {
            return;
        };
        let Some(ticket) = state.run_ticket.as_ref().filter(|t| t.seq == seq) else {
            debug!(check = %state.name, seq, "response for dismissed run ignored");
            return;
        };
        let name = state.name.clone();

        match outcome {
            Ok(ack) => {
                let Some(next) = ticket.queued(&ack.uuid) else {
                    return;
                };
                info!(check = %name, run_id = %ack.uuid, "run queued");
                self.checks.update(id, |s| s.with_ticket(Some(next)));
                self.schedule_settle(id, seq);
            }
            Err(e) => {
                let reason = e.to_string();
                let Some(next) = ticket.failed(&reason) else {
                    return;
                };
                warn!(check = %name, error = %reason, "run submission failed");
                let error = EngineError::Submission {
                    check: name,
                    reason,
                };
                self.checks
                    .update(id, |s| s.with_ticket(Some(next)).with_run_error(Some(error)));
            }
        }
    }

    fn on_settle_due(&mut self, id: CheckId, seq: u64) {
        self.timers.remove(&id);
        let Some(state) = self.checks.get(id) else {
            return;
        };
        let Some(next) = state
            .run_ticket
            .as_ref()
            .filter(|t| t.seq == seq)
            .and_then(RunTicket::settled)
        else {
            return;
        };
        info!(check = %state.name, seq, "run settled, refreshing history");

        self.invalidate(id, FetchKind::History);
        self.checks.update(id, |s| s.with_ticket(Some(next)));
    }
}

impl<S: CheckService> Drop for Engine<S> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
