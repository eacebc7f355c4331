//! Domain types for the check catalog and its results.
//!
//! These mirror the JSON served by the check-execution service. Every
//! optional field defaults so that older services (which send fewer
//! fields) still deserialize.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Resolved argument mapping passed to a check invocation.
pub type Kwargs = Map<String, Value>;

/// Target name that matches every environment.
pub const ALL_TARGETS: &str = "all";

// ── Catalog ────────────────────────────────────────────────────────

/// One check definition in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckDefinition {
    /// Unique check id, used in every per-check endpoint.
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub group: String,
    /// Module the check function lives in on the server.
    #[serde(default)]
    pub module: String,
    /// Cron bindings in catalog order.
    #[serde(default, with = "schedule_map")]
    pub schedule: Vec<ScheduleEntry>,
    /// Defaults registered alongside the check function.
    #[serde(default, alias = "default_kwargs")]
    pub registered_defaults: Kwargs,
}

impl CheckDefinition {
    /// Title for display, falling back to the check name.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }
}

/// One cron binding of a check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScheduleEntry {
    pub name: String,
    /// Targets in catalog order. A target is `"all"` or an environment name.
    pub targets: Vec<ScheduleTarget>,
    pub cron: Option<String>,
    pub cron_description: Option<String>,
}

/// Arguments a schedule passes for one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScheduleTarget {
    #[serde(skip)]
    pub target: String,
    #[serde(default)]
    pub kwargs: Kwargs,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ScheduleTarget {
    /// Whether this target applies to `environment` (case-insensitive).
    pub fn matches(&self, environment: &str) -> bool {
        self.target == ALL_TARGETS || self.target.eq_ignore_ascii_case(environment)
    }
}

/// Named bucket of checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckGroup {
    #[serde(alias = "_name")]
    pub name: String,
    #[serde(default)]
    pub checks: Vec<CheckDefinition>,
}

/// A deployable worker that executes scheduled checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub lambda_name: String,
    #[serde(default)]
    pub lambda_function_name: Option<String>,
    #[serde(default)]
    pub lambda_description: Option<String>,
    #[serde(default)]
    pub lambda_checks: Vec<WorkerCheck>,
}

/// A check a worker runs on its schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerCheck {
    pub check_name: String,
    #[serde(default)]
    pub check_group: Option<String>,
}

// ── Results ────────────────────────────────────────────────────────

/// Outcome status reported by a check run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Error,
    Ignore,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Error => "ERROR",
            CheckStatus::Ignore => "IGNORE",
            CheckStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Latest result of a check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CheckResult {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: CheckStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub full_output: Value,
}

/// Run history of a check, newest first as served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CheckHistory {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// One row of run history. Serialized as `[status, label, meta]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub status: CheckStatus,
    pub label: String,
    pub meta: HistoryMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoryMeta {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub runtime_seconds: Option<f64>,
    #[serde(default)]
    pub queue_action: Option<String>,
}

impl Serialize for HistoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.status, &self.label, &self.meta).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HistoryEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (status, label, meta) =
            <(CheckStatus, String, Option<HistoryMeta>)>::deserialize(deserializer)?;
        Ok(Self {
            status,
            label,
            meta: meta.unwrap_or_default(),
        })
    }
}

/// Response to a run submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunAck {
    pub uuid: String,
}

// ── Schedule wire format ───────────────────────────────────────────

/// The schedule is served as an object keyed by schedule name. Each value
/// mixes target objects with `cron` / `cron_description` strings, so the
/// split happens here rather than through derive.
mod schedule_map {
    use serde::de::Error as _;

    use super::*;

    const CRON: &str = "cron";
    const CRON_DESCRIPTION: &str = "cron_description";

    pub fn serialize<S: Serializer>(
        entries: &[ScheduleEntry],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = Map::new();
        for entry in entries {
            let mut body = Map::new();
            for target in &entry.targets {
                let value = serde_json::to_value(target).map_err(serde::ser::Error::custom)?;
                body.insert(target.target.clone(), value);
            }
            if let Some(cron) = &entry.cron {
                body.insert(CRON.to_string(), Value::String(cron.clone()));
            }
            if let Some(desc) = &entry.cron_description {
                body.insert(CRON_DESCRIPTION.to_string(), Value::String(desc.clone()));
            }
            out.insert(entry.name.clone(), Value::Object(body));
        }
        out.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<ScheduleEntry>, D::Error> {
        let raw = Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut entries = Vec::with_capacity(raw.len());

        for (name, body) in raw {
            let Value::Object(body) = body else {
                return Err(D::Error::custom(format!(
                    "schedule entry {name:?} is not an object"
                )));
            };

            let mut entry = ScheduleEntry {
                name,
                ..Default::default()
            };
            for (key, value) in body {
                match (key.as_str(), value) {
                    (CRON, Value::String(s)) => entry.cron = Some(s),
                    (CRON_DESCRIPTION, Value::String(s)) => entry.cron_description = Some(s),
                    (_, value @ Value::Object(_)) => {
                        let mut target: ScheduleTarget =
                            serde_json::from_value(value).map_err(D::Error::custom)?;
                        target.target = key;
                        entry.targets.push(target);
                    }
                    // Unknown scalar metadata is ignored.
                    _ => {}
                }
            }
            entries.push(entry);
        }

        Ok(entries)
    }
}
