//! Lazy per-check cache of latest results and run history.
//!
//! These functions decide *whether* a request is needed and record the
//! outcome; the engine issues the requests. Per check and kind, at most one
//! fetch is in flight, and a cached payload suppresses further fetches until
//! it is invalidated.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use checkgrid_core::{CheckHistory, CheckResult};

use crate::error::EngineError;
use crate::state::{CheckArena, CheckId};

/// Which cached payload an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchKind {
    Result,
    History,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Result => f.write_str("result"),
            FetchKind::History => f.write_str("history"),
        }
    }
}

/// Mark a fetch as started unless one is unnecessary.
///
/// Returns `true` when the caller must issue the request: the payload is
/// absent and no fetch of that kind is in flight.
pub fn begin_fetch(checks: &mut CheckArena, id: CheckId, kind: FetchKind) -> bool {
    let Some(state) = checks.get(id) else {
        return false;
    };
    if state.has_payload(kind) || state.in_flight(kind) {
        debug!(check = %state.name, %kind, "fetch skipped: cached or in flight");
        return false;
    }
    let next = state.with_fetch_started(kind);
    checks.replace(id, next);
    true
}

/// Store a fetched result. The in-flight flag clears on either outcome.
pub fn complete_result(
    checks: &mut CheckArena,
    id: CheckId,
    outcome: Result<CheckResult, EngineError>,
) {
    checks.update(id, |state| match outcome {
        Ok(result) => state.with_result(result),
        Err(e) => state.with_fetch_failed(FetchKind::Result, e),
    });
}

/// Store fetched history. The in-flight flag clears on either outcome.
pub fn complete_history(
    checks: &mut CheckArena,
    id: CheckId,
    outcome: Result<CheckHistory, EngineError>,
) {
    checks.update(id, |state| match outcome {
        Ok(history) => state.with_history(history),
        Err(e) => state.with_fetch_failed(FetchKind::History, e),
    });
}

/// Drop the cached payload of `kind`.
///
/// Returns `true` when the payload is currently shown, in which case the
/// caller re-fetches immediately.
pub fn invalidate(checks: &mut CheckArena, id: CheckId, kind: FetchKind) -> bool {
    checks
        .update(id, |state| state.invalidated(kind))
        .is_some_and(|state| state.is_shown(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with(name: &str) -> (CheckArena, CheckId) {
        let mut arena = CheckArena::new();
        let (id, _) = arena.ensure(name);
        (arena, id)
    }

    fn fetch_error() -> EngineError {
        EngineError::Fetch {
            check: "a".to_string(),
            kind: FetchKind::Result,
            reason: "502".to_string(),
        }
    }

    #[test]
    fn begin_fetch_dedups_in_flight() {
        let (mut arena, id) = arena_with("a");
        assert!(begin_fetch(&mut arena, id, FetchKind::Result));
        assert!(!begin_fetch(&mut arena, id, FetchKind::Result));
        // The other kind is independent.
        assert!(begin_fetch(&mut arena, id, FetchKind::History));
    }

    #[test]
    fn cached_payload_suppresses_fetch_until_invalidated() {
        let (mut arena, id) = arena_with("a");
        assert!(begin_fetch(&mut arena, id, FetchKind::Result));
        complete_result(&mut arena, id, Ok(CheckResult::default()));

        for _ in 0..3 {
            assert!(!begin_fetch(&mut arena, id, FetchKind::Result));
        }

        invalidate(&mut arena, id, FetchKind::Result);
        assert!(arena.get(id).unwrap().result.is_none());
        assert!(begin_fetch(&mut arena, id, FetchKind::Result));
    }

    #[test]
    fn failed_fetch_does_not_stay_loading() {
        let (mut arena, id) = arena_with("a");
        assert!(begin_fetch(&mut arena, id, FetchKind::Result));
        complete_result(&mut arena, id, Err(fetch_error()));

        let state = arena.get(id).unwrap();
        assert!(!state.result_in_flight);
        assert!(state.result.is_none());
        assert_eq!(state.result_error, Some(fetch_error()));
        assert!(state.history_error.is_none());

        // A later attempt is allowed.
        assert!(begin_fetch(&mut arena, id, FetchKind::Result));
    }

    #[test]
    fn invalidate_reports_visibility() {
        let (mut arena, id) = arena_with("a");
        assert!(!invalidate(&mut arena, id, FetchKind::History));

        arena.update(id, |s| s.with_shown(FetchKind::History, true));
        assert!(invalidate(&mut arena, id, FetchKind::History));
        assert_eq!(arena.get(id).unwrap().history_invalidations, 2);
    }

    #[test]
    fn released_check_is_ignored() {
        let (mut arena, id) = arena_with("a");
        arena.release("a");
        assert!(!begin_fetch(&mut arena, id, FetchKind::Result));
        assert!(!invalidate(&mut arena, id, FetchKind::Result));
        complete_result(&mut arena, id, Ok(CheckResult::default()));
        assert!(arena.get(id).is_none());
    }
}
