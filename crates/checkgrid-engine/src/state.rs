//! Per-check runtime state and the arena that holds it.
//!
//! A `CheckRuntimeState` is an immutable record. Updates build a new record
//! and swap it into the arena slot, so every transition can be asserted on
//! in isolation. Slots are created lazily the first time a check is
//! referenced; released slots are never reused, so events addressed to a
//! released `CheckId` fall on the floor.

use std::collections::HashMap;
use std::sync::Arc;

use checkgrid_core::{CheckHistory, CheckResult, Kwargs};

use crate::cache::FetchKind;
use crate::error::EngineError;
use crate::run::{RunPhase, RunTicket};

/// Arena index of a check's runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckId(usize);

/// View state of one check for the current session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckRuntimeState {
    pub name: String,
    pub result: Option<Arc<CheckResult>>,
    pub result_in_flight: bool,
    pub show_result_detail: bool,
    pub history: Option<Arc<CheckHistory>>,
    pub history_in_flight: bool,
    pub show_history: bool,
    pub resolved_kwargs: Kwargs,
    pub kwargs_overrides: Kwargs,
    pub run_ticket: Option<RunTicket>,
    /// Why the last result fetch failed. Cleared by the next success.
    pub result_error: Option<EngineError>,
    pub history_error: Option<EngineError>,
    /// Why the current ticket's submission failed.
    pub run_error: Option<EngineError>,
    pub result_invalidations: u32,
    pub history_invalidations: u32,
}

impl CheckRuntimeState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn has_payload(&self, kind: FetchKind) -> bool {
        match kind {
            FetchKind::Result => self.result.is_some(),
            FetchKind::History => self.history.is_some(),
        }
    }

    pub fn in_flight(&self, kind: FetchKind) -> bool {
        match kind {
            FetchKind::Result => self.result_in_flight,
            FetchKind::History => self.history_in_flight,
        }
    }

    pub fn is_shown(&self, kind: FetchKind) -> bool {
        match kind {
            FetchKind::Result => self.show_result_detail,
            FetchKind::History => self.show_history,
        }
    }

    pub fn fetch_error(&self, kind: FetchKind) -> Option<&EngineError> {
        match kind {
            FetchKind::Result => self.result_error.as_ref(),
            FetchKind::History => self.history_error.as_ref(),
        }
    }

    pub fn run_phase(&self) -> RunPhase {
        self.run_ticket
            .as_ref()
            .map(|t| t.phase.clone())
            .unwrap_or(RunPhase::Idle)
    }

    pub fn with_fetch_started(&self, kind: FetchKind) -> Self {
        let mut next = self.clone();
        match kind {
            FetchKind::Result => next.result_in_flight = true,
            FetchKind::History => next.history_in_flight = true,
        }
        next
    }

    pub fn with_result(&self, result: CheckResult) -> Self {
        Self {
            result: Some(Arc::new(result)),
            result_in_flight: false,
            result_error: None,
            ..self.clone()
        }
    }

    pub fn with_history(&self, history: CheckHistory) -> Self {
        Self {
            history: Some(Arc::new(history)),
            history_in_flight: false,
            history_error: None,
            ..self.clone()
        }
    }

    /// Clear the in-flight flag and record why. The payload is untouched.
    pub fn with_fetch_failed(&self, kind: FetchKind, error: EngineError) -> Self {
        let mut next = self.clone();
        match kind {
            FetchKind::Result => {
                next.result_in_flight = false;
                next.result_error = Some(error);
            }
            FetchKind::History => {
                next.history_in_flight = false;
                next.history_error = Some(error);
            }
        }
        next
    }

    /// Drop the cached payload and count the invalidation.
    pub fn invalidated(&self, kind: FetchKind) -> Self {
        let mut next = self.clone();
        match kind {
            FetchKind::Result => {
                next.result = None;
                next.result_invalidations += 1;
            }
            FetchKind::History => {
                next.history = None;
                next.history_invalidations += 1;
            }
        }
        next
    }

    pub fn with_shown(&self, kind: FetchKind, shown: bool) -> Self {
        let mut next = self.clone();
        match kind {
            FetchKind::Result => next.show_result_detail = shown,
            FetchKind::History => next.show_history = shown,
        }
        next
    }

    pub fn with_kwargs(&self, overrides: Kwargs, resolved: Kwargs) -> Self {
        Self {
            kwargs_overrides: overrides,
            resolved_kwargs: resolved,
            ..self.clone()
        }
    }

    pub fn with_ticket(&self, ticket: Option<RunTicket>) -> Self {
        Self {
            run_ticket: ticket,
            ..self.clone()
        }
    }

    pub fn with_run_error(&self, error: Option<EngineError>) -> Self {
        Self {
            run_error: error,
            ..self.clone()
        }
    }
}

/// Id-keyed storage for the runtime state of referenced checks.
#[derive(Debug, Default)]
pub struct CheckArena {
    index: HashMap<String, CheckId>,
    slots: Vec<Option<CheckRuntimeState>>,
}

impl CheckArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, allocating a fresh state if none exists.
    ///
    /// The flag is `true` when the state was created by this call.
    pub fn ensure(&mut self, name: &str) -> (CheckId, bool) {
        if let Some(id) = self.index.get(name) {
            return (*id, false);
        }
        let id = CheckId(self.slots.len());
        self.slots.push(Some(CheckRuntimeState::new(name)));
        self.index.insert(name.to_string(), id);
        (id, true)
    }

    pub fn id_of(&self, name: &str) -> Option<CheckId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: CheckId) -> Option<&CheckRuntimeState> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn by_name(&self, name: &str) -> Option<&CheckRuntimeState> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Swap in a new record. Ignored for released ids.
    pub fn replace(&mut self, id: CheckId, state: CheckRuntimeState) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if slot.is_some() {
                *slot = Some(state);
            }
        }
    }

    /// Replace the record at `id` with `f(current)`.
    pub fn update<F>(&mut self, id: CheckId, f: F) -> Option<&CheckRuntimeState>
    where
        F: FnOnce(&CheckRuntimeState) -> CheckRuntimeState,
    {
        let next = f(self.get(id)?);
        self.replace(id, next);
        self.get(id)
    }

    /// Drop the state for `name`. Its id is retired.
    pub fn release(&mut self, name: &str) -> Option<(CheckId, CheckRuntimeState)> {
        let id = self.index.remove(name)?;
        let state = self.slots.get_mut(id.0)?.take()?;
        Some((id, state))
    }

    /// Number of live states.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CheckId, &CheckRuntimeState)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (CheckId(i), s)))
    }
}
