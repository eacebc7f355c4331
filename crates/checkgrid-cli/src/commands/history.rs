use anyhow::Context;

use checkgrid_client::CheckService;
use checkgrid_engine::Engine;

pub async fn show<S: CheckService>(
    engine: &mut Engine<S>,
    check: &str,
    limit: usize,
) -> anyhow::Result<()> {
    super::load_catalog(engine).await?;
    engine.toggle_check_history(check)?;
    engine.settle_pending().await;

    let state = engine
        .check_state(check)
        .with_context(|| format!("no state for {check}"))?;
    if let Some(err) = &state.history_error {
        anyhow::bail!("{err}");
    }
    let history = state
        .history
        .as_deref()
        .with_context(|| format!("no history recorded for {check}"))?;

    if history.history.is_empty() {
        println!("{check} has not run yet");
        return Ok(());
    }
    for entry in history.history.iter().take(limit) {
        println!("{}", super::format_history_row(entry));
    }
    Ok(())
}
