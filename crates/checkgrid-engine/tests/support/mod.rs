//! In-memory `CheckService` that records every call.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use checkgrid_client::{CheckService, ClientError, ClientResult};
use checkgrid_core::{
    CheckDefinition, CheckGroup, CheckHistory, CheckResult, CheckStatus, Kwargs, RunAck, Worker,
};
use checkgrid_engine::Engine;

pub const ENVIRONMENT: &str = "data";

/// Engine over the standard fake with the catalog already loaded.
pub async fn loaded_engine() -> (Engine<FakeService>, FakeService) {
    let fake = FakeService::standard();
    let mut engine = Engine::new(fake.clone(), ENVIRONMENT);
    engine.load_catalog();
    engine.settle_pending().await;
    (engine, fake)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Groups,
    Workers,
    Result(String),
    History(String),
    Run(String, Kwargs),
}

#[derive(Default)]
struct Inner {
    groups: Vec<CheckGroup>,
    workers: Vec<Worker>,
    fail_groups: bool,
    fail_workers: bool,
    fail_runs: bool,
    crash_runs: bool,
    failing_checks: HashSet<String>,
    calls: Vec<Call>,
    runs: u32,
}

#[derive(Clone, Default)]
pub struct FakeService {
    inner: Arc<Mutex<Inner>>,
}

impl FakeService {
    pub fn new(groups: Vec<CheckGroup>, workers: Vec<Worker>) -> Self {
        let svc = Self::default();
        {
            let mut inner = svc.inner.lock().unwrap();
            inner.groups = groups;
            inner.workers = workers;
        }
        svc
    }

    pub fn standard() -> Self {
        Self::new(standard_groups(), standard_workers())
    }

    pub fn fail_groups(&self, fail: bool) {
        self.inner.lock().unwrap().fail_groups = fail;
    }

    pub fn fail_workers(&self, fail: bool) {
        self.inner.lock().unwrap().fail_workers = fail;
    }

    pub fn fail_runs(&self, fail: bool) {
        self.inner.lock().unwrap().fail_runs = fail;
    }

    /// `run_check` panics instead of answering.
    pub fn crash_runs(&self, crash: bool) {
        self.inner.lock().unwrap().crash_runs = crash;
    }

    /// Result and history requests for `name` fail.
    pub fn fail_check(&self, name: &str, fail: bool) {
        let mut inner = self.inner.lock().unwrap();
        if fail {
            inner.failing_checks.insert(name.to_string());
        } else {
            inner.failing_checks.remove(name);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn result_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Result(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::History(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn run_calls(&self) -> Vec<(String, Kwargs)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Run(name, kwargs) => Some((name, kwargs)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

fn unavailable(path: &str) -> ClientError {
    ClientError::Status {
        url: format!("fake://data/{path}"),
        status: 503,
        body: "unavailable".to_string(),
    }
}

impl CheckService for FakeService {
    async fn grouped_checks(&self) -> ClientResult<Vec<CheckGroup>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Groups);
        if inner.fail_groups {
            return Err(unavailable("checks/grouped"));
        }
        Ok(inner.groups.clone())
    }

    async fn workers(&self) -> ClientResult<Vec<Worker>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Workers);
        if inner.fail_workers {
            return Err(unavailable("lambdas"));
        }
        Ok(inner.workers.clone())
    }

    async fn check_result(&self, name: &str) -> ClientResult<CheckResult> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Result(name.to_string()));
        if inner.failing_checks.contains(name) {
            return Err(unavailable(&format!("checks/{name}")));
        }
        Ok(CheckResult {
            timestamp: Some("2024-05-01T06:00:00".to_string()),
            status: CheckStatus::Pass,
            summary: format!("{name} ok"),
            full_output: json!({"checked": name}),
        })
    }

    async fn check_history(&self, name: &str) -> ClientResult<CheckHistory> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::History(name.to_string()));
        if inner.failing_checks.contains(name) {
            return Err(unavailable(&format!("checks/{name}/history")));
        }
        let runs = inner.runs;
        serde_json::from_value(json!({
            "history": [["PASS", format!("{runs} runs so far"), {"uuid": format!("run-{runs}")}]]
        }))
        .map_err(ClientError::Encode)
    }

    async fn run_check(&self, name: &str, kwargs: &Kwargs) -> ClientResult<RunAck> {
        // Release the lock before panicking so later calls don't see poison.
        let crash = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(Call::Run(name.to_string(), kwargs.clone()));
            inner.crash_runs
        };
        if crash {
            panic!("run handler crashed for {name}");
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.fail_runs {
            return Err(unavailable(&format!("checks/{name}/run")));
        }
        inner.runs += 1;
        Ok(RunAck {
            uuid: format!("run-{}", inner.runs),
        })
    }
}

// ── Fixtures ───────────────────────────────────────────────────────

pub fn check(value: Value) -> CheckDefinition {
    serde_json::from_value(value).unwrap()
}

pub fn kwargs(value: Value) -> Kwargs {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Served out of order on purpose; the engine sorts on load.
pub fn standard_groups() -> Vec<CheckGroup> {
    vec![
        CheckGroup {
            name: "System checks".to_string(),
            checks: vec![
                check(json!({
                    "name": "elastic_status",
                    "title": "Elastic status",
                    "group": "System checks",
                    "module": "system_checks"
                })),
                check(json!({
                    "name": "indexing_progress",
                    "title": "Indexing progress",
                    "group": "System checks",
                    "module": "system_checks",
                    "registered_defaults": {"a": 1, "b": 2},
                    "schedule": {
                        "hourly_checks": {
                            "all": {"kwargs": {"b": 3}, "dependencies": []},
                            "cron": "cron(0 * * * ? *)"
                        }
                    }
                })),
            ],
        },
        CheckGroup {
            name: "Audit checks".to_string(),
            checks: vec![
                check(json!({"name": "workflow_audit", "title": "Workflow audit", "group": "Audit checks"})),
                check(json!({"name": "biosource_audit", "title": "Biosource audit", "group": "Audit checks"})),
                check(json!({"name": "file_audit", "title": "File audit", "group": "Audit checks"})),
            ],
        },
    ]
}

pub fn standard_workers() -> Vec<Worker> {
    serde_json::from_value(json!([
        {"lambda_name": "monthly_checks"},
        {"lambda_name": "hourly_checks", "lambda_checks": [{"check_name": "indexing_progress"}]}
    ]))
    .unwrap()
}

/// Catalog order of the audit group after sorting by title.
pub const AUDIT_ORDER: [&str; 3] = ["biosource_audit", "file_audit", "workflow_audit"];
