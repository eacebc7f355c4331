mod support;

use checkgrid_engine::{CatalogPart, Engine, EngineError, EngineEvent, LoadStatus};
use support::*;

#[tokio::test]
async fn load_publishes_sorted_catalog() {
    let (engine, fake) = loaded_engine().await;

    let groups: Vec<_> = engine
        .catalog()
        .groups()
        .iter()
        .map(|g| g.name.as_str())
        .collect();
    assert_eq!(groups, vec!["Audit checks", "System checks"]);

    let audit: Vec<_> = engine.catalog().groups()[0]
        .checks
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(audit, AUDIT_ORDER);

    let workers: Vec<_> = engine
        .catalog()
        .workers()
        .iter()
        .map(|w| w.lambda_name.as_str())
        .collect();
    assert_eq!(workers, vec!["hourly_checks", "monthly_checks"]);

    assert_eq!(engine.catalog().status(CatalogPart::Checks), &LoadStatus::Loaded);
    assert_eq!(engine.catalog().status(CatalogPart::Workers), &LoadStatus::Loaded);
    assert_eq!(fake.count(&Call::Groups), 1);
    assert_eq!(fake.count(&Call::Workers), 1);
    assert_eq!(engine.pending_requests(), 0);
}

#[tokio::test]
async fn loading_creates_no_check_state() {
    let (engine, _fake) = loaded_engine().await;
    assert_eq!(engine.tracked_checks(), 0);
    assert!(engine.check_state("file_audit").is_none());
    assert!(engine.resolved_kwargs("indexing_progress").is_ok());
    assert_eq!(engine.tracked_checks(), 0);
}

#[tokio::test]
async fn worker_failure_keeps_checks_visible() {
    let fake = FakeService::standard();
    fake.fail_workers(true);
    let mut engine = Engine::new(fake.clone(), ENVIRONMENT);
    engine.load_catalog();
    engine.settle_pending().await;

    assert_eq!(engine.catalog().groups().len(), 2);
    assert!(engine.catalog().find_check("elastic_status").is_some());
    assert!(engine.catalog().workers().is_empty());
    assert!(engine.catalog().load_error(CatalogPart::Checks).is_none());
    assert!(matches!(
        engine.catalog().load_error(CatalogPart::Workers),
        Some(EngineError::Load {
            part: CatalogPart::Workers,
            ..
        })
    ));

    // Checks still work while the worker list is missing.
    assert!(engine.toggle_group("System checks").unwrap());
    engine.settle_pending().await;
    assert!(engine.check_state("elastic_status").unwrap().result.is_some());
}

#[tokio::test]
async fn checks_failure_is_reported_without_retry() {
    let fake = FakeService::standard();
    fake.fail_groups(true);
    let mut engine = Engine::new(fake.clone(), ENVIRONMENT);
    engine.load_catalog();
    engine.settle_pending().await;

    assert!(engine.catalog().groups().is_empty());
    assert!(engine.catalog().load_error(CatalogPart::Checks).is_some());
    assert_eq!(engine.catalog().status(CatalogPart::Workers), &LoadStatus::Loaded);
    assert_eq!(fake.count(&Call::Groups), 1);

    // Reloading is the retry.
    fake.fail_groups(false);
    engine.load_catalog();
    engine.settle_pending().await;
    assert_eq!(engine.catalog().groups().len(), 2);
    assert!(engine.catalog().load_error(CatalogPart::Checks).is_none());
    assert_eq!(fake.count(&Call::Groups), 2);
}

#[tokio::test]
async fn stale_catalog_responses_are_dropped() {
    let (mut engine, _fake) = loaded_engine().await;
    let stale = engine.catalog().generation() - 1;

    engine.handle(EngineEvent::GroupsLoaded {
        generation: stale,
        outcome: Ok(Vec::new()),
    });
    engine.handle(EngineEvent::WorkersLoaded {
        generation: stale,
        outcome: Ok(Vec::new()),
    });

    assert_eq!(engine.catalog().groups().len(), 2);
    assert_eq!(engine.catalog().workers().len(), 2);
}

#[tokio::test]
async fn overlapping_loads_settle_on_latest() {
    let fake = FakeService::standard();
    let mut engine = Engine::new(fake.clone(), ENVIRONMENT);
    engine.load_catalog();
    engine.load_catalog();
    assert_eq!(engine.pending_requests(), 4);
    engine.settle_pending().await;

    assert_eq!(engine.catalog().generation(), 2);
    assert_eq!(engine.catalog().status(CatalogPart::Checks), &LoadStatus::Loaded);
    assert_eq!(engine.catalog().groups().len(), 2);
}

#[tokio::test]
async fn operations_before_load_report_unknown_checks() {
    let fake = FakeService::standard();
    let mut engine = Engine::new(fake.clone(), ENVIRONMENT);

    assert_eq!(
        engine.run_check("file_audit"),
        Err(EngineError::UnknownCheck("file_audit".to_string()))
    );
    assert_eq!(
        engine.toggle_group("Audit checks"),
        Err(EngineError::UnknownGroup("Audit checks".to_string()))
    );
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn workers_map_to_catalog_checks() {
    let (engine, _fake) = loaded_engine().await;
    let checks = engine.catalog().checks_for_worker("hourly_checks");
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].name, "indexing_progress");
    assert!(engine.catalog().checks_for_worker("monthly_checks").is_empty());
}
