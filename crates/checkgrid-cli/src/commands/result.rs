use anyhow::Context;

use checkgrid_client::CheckService;
use checkgrid_engine::Engine;

pub async fn show<S: CheckService>(
    engine: &mut Engine<S>,
    check: &str,
    format: &str,
) -> anyhow::Result<()> {
    super::load_catalog(engine).await?;
    engine.toggle_check_detail(check)?;
    engine.settle_pending().await;

    let state = engine
        .check_state(check)
        .with_context(|| format!("no state for {check}"))?;
    if let Some(err) = &state.result_error {
        anyhow::bail!("{err}");
    }
    let result = state
        .result
        .as_deref()
        .with_context(|| format!("no result recorded for {check}"))?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(result)?),
        _ => {
            println!("{check} [{}]", result.status);
            if let Some(timestamp) = &result.timestamp {
                println!("  ran at {timestamp}");
            }
            println!("  {}", result.summary);
            if !result.full_output.is_null() {
                println!("{}", serde_json::to_string_pretty(&result.full_output)?);
            }
        }
    }

    Ok(())
}
