use checkgrid_client::CheckService;
use checkgrid_engine::{CatalogPart, Engine};

pub async fn list<S: CheckService>(engine: &mut Engine<S>, format: &str) -> anyhow::Result<()> {
    super::load_catalog(engine).await?;
    let catalog = engine.catalog();
    let workers_error = catalog.load_error(CatalogPart::Workers);

    match format {
        "json" => {
            let output = serde_json::json!({
                "environment": engine.environment(),
                "groups": catalog.groups(),
                "workers": catalog.workers(),
                "workers_error": workers_error.map(ToString::to_string),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            for group in catalog.groups() {
                println!("{} ({} checks)", group.name, group.checks.len());
                for check in &group.checks {
                    println!("  {:<40} {}", check.name, check.display_title());
                }
            }

            match workers_error {
                Some(err) => eprintln!("warning: {err}"),
                None => {
                    println!();
                    println!("Workers:");
                    for worker in catalog.workers() {
                        let checks = catalog.checks_for_worker(&worker.lambda_name);
                        println!("  {:<30} {} checks", worker.lambda_name, checks.len());
                        for check in checks {
                            println!("    {}", check.name);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
