use anyhow::Context;
use tracing::info;

use checkgrid_client::CheckService;
use checkgrid_engine::{Engine, RunPhase};

pub async fn submit<S: CheckService>(
    engine: &mut Engine<S>,
    check: &str,
    set: &[String],
    wait: bool,
) -> anyhow::Result<()> {
    super::load_catalog(engine).await?;
    super::apply_overrides(engine, check, set)?;

    let kwargs = engine.resolved_kwargs(check)?;
    info!(%check, kwargs = %serde_json::Value::Object(kwargs.clone()), "submitting run");
    if !engine.run_check(check)? {
        anyhow::bail!("a run of {check} is already outstanding");
    }
    // Show the history panel so the settle refresh fetches it.
    if wait {
        engine.toggle_check_history(check)?;
    }
    engine.settle_pending().await;

    let ticket = engine
        .check_state(check)
        .and_then(|s| s.run_ticket.clone())
        .with_context(|| format!("run ticket for {check} disappeared"))?;
    if let RunPhase::Settled { error: Some(err) } = &ticket.phase {
        anyhow::bail!("run submission failed: {err}");
    }
    println!("queued {check} as {}", ticket.run_id.as_deref().unwrap_or("<unknown>"));

    if !wait {
        return Ok(());
    }

    engine.wait_for_run(check).await;
    let newest = engine
        .check_state(check)
        .and_then(|s| s.history.as_deref())
        .and_then(|h| h.history.first());
    match newest {
        Some(entry) => println!("{}", super::format_history_row(entry)),
        None => println!("no history yet, the run may still be in progress"),
    }
    Ok(())
}
