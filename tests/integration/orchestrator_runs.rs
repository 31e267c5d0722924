use crate::integration::support::{shop_plan, shop_spec, ScriptedGenerator};
use specforge::generator::LocalFileStore;
use specforge::orchestrator::{Orchestrator, RegenerationMode, RunRequest};
use specforge::scheduler::{CancellationSignal, ExecutionPlan, GenerationTask, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn orchestrator(dir: &TempDir, generator: &Arc<ScriptedGenerator>) -> Orchestrator {
    Orchestrator::new(
        generator.clone(),
        Arc::new(LocalFileStore::new(dir.path())),
    )
    .with_scheduler(SchedulerConfig::with_concurrency(4))
}

const ALL_FILES: [&str; 4] = [
    "models/order.go",
    "models/product.go",
    "models/user.go",
    "services/order_service.go",
];

#[tokio::test]
async fn first_run_generates_everything_and_persists_state() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);

    let report = orch
        .run(RunRequest::new(shop_spec(), shop_plan()))
        .await
        .unwrap();

    assert_eq!(report.mode, RegenerationMode::Full);
    assert!(report.change_set.has_changes());
    assert_eq!(report.patches.len(), 4);
    assert!(report.patches.iter().all(|p| p.reversible));
    assert_eq!(generator.calls(), ALL_FILES.to_vec());
    assert_eq!(report.levels.len(), 2);

    let state = orch.state_store().load().unwrap();
    assert_eq!(state.known_files().into_iter().collect::<Vec<_>>(), ALL_FILES.to_vec());
    assert_eq!(state.previous_spec.as_ref(), Some(&shop_spec()));
    assert!(state.last_run.is_some());
    let order_entities = &state.dependency_graph["models/order.go"];
    assert!(order_entities.contains("User"));
    assert!(order_entities.contains("Product"));
    assert!(dir.path().join(".specforge/state.json").exists());
}

#[tokio::test]
async fn unchanged_specification_is_up_to_date() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);
    orch.run(RunRequest::new(shop_spec(), shop_plan()))
        .await
        .unwrap();
    generator.reset_calls();

    let report = orch
        .run(RunRequest::new(shop_spec(), shop_plan()))
        .await
        .unwrap();

    assert_eq!(report.mode, RegenerationMode::UpToDate);
    assert!(report.patches.is_empty());
    assert_eq!(report.skipped.len(), 4);
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn modified_entity_regenerates_only_dependent_files() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);
    orch.run(RunRequest::new(shop_spec(), shop_plan()))
        .await
        .unwrap();
    generator.reset_calls();

    let mut changed = shop_spec();
    changed.data_model.entities[0]
        .attributes
        .insert("name".to_string(), "string".to_string());

    let report = orch
        .run(RunRequest::new(changed.clone(), shop_plan()))
        .await
        .unwrap();

    let RegenerationMode::Incremental { affected } = &report.mode else {
        panic!("expected incremental run, got {:?}", report.mode);
    };
    assert!(affected.contains("models/user.go"));
    assert!(!affected.contains("models/product.go"));
    assert_eq!(report.change_set.entities().modified, vec!["User"]);
    assert_eq!(
        generator.calls(),
        vec!["models/order.go", "models/user.go", "services/order_service.go"]
    );
    assert_eq!(report.skipped, vec!["models/product.go"]);
    assert!(report.patches.iter().all(|p| !p.reversible));

    let state = orch.state_store().load().unwrap();
    assert_eq!(state.previous_spec.as_ref(), Some(&changed));
}

#[tokio::test]
async fn failed_task_keeps_sibling_results_and_snapshot() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);
    orch.run(RunRequest::new(shop_spec(), shop_plan()))
        .await
        .unwrap();
    let before = orch.state_store().load().unwrap();
    generator.reset_calls();

    let mut changed = shop_spec();
    changed.data_model.entities[0]
        .attributes
        .insert("name".to_string(), "string".to_string());
    generator.fail_on("models/order.go");

    let failure = orch
        .run(RunRequest::new(changed.clone(), shop_plan()))
        .await
        .unwrap_err();
    assert!(!failure.is_cancelled());
    let report = failure.report.expect("partial report");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].task_id, "order-model");
    assert_eq!(report.generated_paths().collect::<Vec<_>>(), vec!["models/user.go"]);
    // Services depend on the failed level and never start.
    assert!(!generator.calls().contains(&"services/order_service.go".to_string()));

    let state = orch.state_store().load().unwrap();
    assert_eq!(state.previous_spec, before.previous_spec);
    assert_eq!(state.spec_checksum, before.spec_checksum);
    assert!(state.files["models/user.go"].generated_at > before.files["models/user.go"].generated_at);

    generator.clear_failures();
    generator.reset_calls();
    let retried = orch
        .run(RunRequest::new(changed.clone(), shop_plan()))
        .await
        .unwrap();
    assert!(retried.failed.is_empty());
    // user.go already matches the changed snapshot from the failed run.
    assert_eq!(
        generator.calls(),
        vec!["models/order.go", "services/order_service.go"]
    );
    assert_eq!(retried.skipped, vec!["models/user.go", "models/product.go"]);
    let state = orch.state_store().load().unwrap();
    assert_eq!(state.previous_spec.as_ref(), Some(&changed));
}

#[tokio::test]
async fn cancellation_surfaces_as_cancelled() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    generator.stall_on("models/order.go");
    let orch = orchestrator(&dir, &generator);

    let cancel = CancellationSignal::new();
    cancel.cancel_after(Duration::from_millis(30));
    let failure = orch
        .run(RunRequest::new(shop_spec(), shop_plan()).with_cancel(cancel))
        .await
        .unwrap_err();

    assert!(failure.is_cancelled());
    let report = failure.report.expect("partial report");
    assert!(report.generated_paths().any(|p| p == "models/user.go"));
    assert!(!generator.calls().contains(&"services/order_service.go".to_string()));

    let state = orch.state_store().load().unwrap();
    assert!(state.previous_spec.is_none());
    assert!(state.knows_file("models/user.go"));
}

#[tokio::test]
async fn invalid_plan_fails_before_anything_runs() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);
    let plan = ExecutionPlan::new("cyclic").with_phase(
        "all",
        vec![
            GenerationTask::produce_file("a", "models/user.go").with_dependencies(["b"]),
            GenerationTask::produce_file("b", "models/order.go").with_dependencies(["a"]),
        ],
    );

    let failure = orch
        .run(RunRequest::new(shop_spec(), plan))
        .await
        .unwrap_err();

    assert!(failure.report.is_none());
    assert!(failure.error.to_string().to_lowercase().contains("cycle"));
    assert!(generator.calls().is_empty());
    assert!(!dir.path().join(".specforge/state.json").exists());
}

#[tokio::test]
async fn invalid_specification_fails_before_anything_runs() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);
    let mut spec = shop_spec();
    spec.data_model.entities[1].name = "User".to_string();

    let failure = orch
        .run(RunRequest::new(spec, shop_plan()))
        .await
        .unwrap_err();

    assert!(failure.report.is_none());
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn patch_order_is_stable_across_concurrency() {
    let mut orders = Vec::new();
    for concurrency in [1, 8] {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = orchestrator(&dir, &generator)
            .with_scheduler(SchedulerConfig::with_concurrency(concurrency));
        let report = orch
            .run(RunRequest::new(shop_spec(), shop_plan()))
            .await
            .unwrap();
        orders.push(
            report
                .generated_paths()
                .map(str::to_string)
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(orders[0], orders[1]);
}

#[tokio::test]
async fn clear_state_forces_full_regeneration() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let orch = orchestrator(&dir, &generator);
    orch.run(RunRequest::new(shop_spec(), shop_plan()))
        .await
        .unwrap();

    assert!(orch.clear_state().unwrap());
    assert!(!orch.clear_state().unwrap());

    let decision = orch.preview(None, &shop_spec()).unwrap();
    assert_eq!(decision.mode, RegenerationMode::Full);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn orchestrators_sharing_a_directory_keep_both_records() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let users = orchestrator(&dir, &generator);
    let products = orchestrator(&dir, &generator);

    let user_plan = ExecutionPlan::new("users").with_phase(
        "models",
        vec![GenerationTask::produce_file("user-model", "models/user.go")],
    );
    let product_plan = ExecutionPlan::new("products").with_phase(
        "models",
        vec![GenerationTask::produce_file("product-model", "models/product.go")],
    );

    let (first, second) = tokio::join!(
        users.run(RunRequest::new(shop_spec(), user_plan)),
        products.run(RunRequest::new(shop_spec(), product_plan)),
    );
    first.unwrap();
    second.unwrap();

    let state = users.state_store().load().unwrap();
    assert!(state.knows_file("models/user.go"));
    assert!(state.knows_file("models/product.go"));
    assert_eq!(generator.calls(), vec!["models/product.go", "models/user.go"]);
}
