pub mod groups;
pub mod history;
pub mod kwargs;
pub mod result;
pub mod run;

use anyhow::Context;

use checkgrid_client::CheckService;
use checkgrid_core::kwargs::parse_override;
use checkgrid_core::HistoryEntry;
use checkgrid_engine::{CatalogPart, Engine};

/// Load the catalog. Fails only when the check list itself is unavailable.
pub async fn load_catalog<S: CheckService>(engine: &mut Engine<S>) -> anyhow::Result<()> {
    engine.load_catalog();
    engine.settle_pending().await;
    if let Some(err) = engine.catalog().load_error(CatalogPart::Checks) {
        anyhow::bail!("{err}");
    }
    Ok(())
}

/// Apply `--set key=value` arguments as kwarg overrides.
pub fn apply_overrides<S: CheckService>(
    engine: &mut Engine<S>,
    check: &str,
    set: &[String],
) -> anyhow::Result<()> {
    for raw in set {
        let (key, value) = parse_override(raw)
            .with_context(|| format!("invalid override {raw:?}, expected KEY=VALUE"))?;
        engine.set_kwarg_override(check, &key, value)?;
    }
    Ok(())
}

/// One history row as printed by `history` and `run --wait`.
pub fn format_history_row(entry: &HistoryEntry) -> String {
    let mut row = format!("{:<7} {}", entry.status.to_string(), entry.label);
    if let Some(timestamp) = &entry.meta.timestamp {
        row.push_str(&format!("  at {timestamp}"));
    }
    if let Some(runtime) = entry.meta.runtime_seconds {
        row.push_str(&format!("  ({runtime:.1}s)"));
    }
    if let Some(uuid) = &entry.meta.uuid {
        row.push_str(&format!("  [{uuid}]"));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkgrid_core::{CheckStatus, HistoryMeta};

    #[test]
    fn history_row_includes_known_meta() {
        let entry = HistoryEntry {
            status: CheckStatus::Warn,
            label: "2 items missing".to_string(),
            meta: HistoryMeta {
                uuid: Some("2024-05-01T06:00:00".to_string()),
                runtime_seconds: Some(3.4),
                ..HistoryMeta::default()
            },
        };
        assert_eq!(
            format_history_row(&entry),
            "WARN    2 items missing  (3.4s)  [2024-05-01T06:00:00]"
        );
    }

    #[test]
    fn history_row_without_meta() {
        let entry = HistoryEntry {
            status: CheckStatus::Pass,
            label: "ok".to_string(),
            meta: HistoryMeta::default(),
        };
        assert_eq!(format_history_row(&entry), "PASS    ok");
    }
}
