use checkgrid_client::CheckService;
use checkgrid_engine::Engine;

pub async fn show<S: CheckService>(
    engine: &mut Engine<S>,
    check: &str,
    set: &[String],
) -> anyhow::Result<()> {
    super::load_catalog(engine).await?;
    super::apply_overrides(engine, check, set)?;

    let kwargs = engine.resolved_kwargs(check)?;
    println!("{}", serde_json::to_string_pretty(&kwargs)?);
    Ok(())
}
