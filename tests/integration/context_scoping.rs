use crate::integration::support::{entity, package, shop_spec};
use specforge::context::{ContextFilter, ContextOptions};
use specforge::scheduler::GenerationTask;
use specforge::spec::{ApiContract, Specification};
use serde_json::json;
use std::sync::Arc;

fn filter(spec: Specification) -> ContextFilter {
    ContextFilter::new(Arc::new(spec), ContextOptions::default())
}

#[test]
fn model_file_sees_only_its_reference_closure() {
    let context = filter(shop_spec()).filter("models/order.go", &[]);

    assert!(!context.degraded);
    assert_eq!(context.entities, vec!["User", "Product", "Order"]);

    let product_only = filter(shop_spec()).filter("models/product.go", &[]);
    assert_eq!(product_only.entities, vec!["Product"]);
    assert!(product_only.reduction_percent > 0.0);
    assert!(product_only.reduction_percent <= 100.0);
}

#[test]
fn task_hints_pick_entities_for_generic_paths() {
    let task = GenerationTask::produce_file("seed", "internal/seed.go")
        .with_input(json!({"entities": ["Product"]}));
    let context = filter(shop_spec()).filter_task(&task);

    assert!(!context.degraded);
    assert_eq!(context.entities, vec!["Product"]);
}

#[test]
fn unrelated_file_degrades_to_full_specification() {
    let context = filter(shop_spec()).filter("cmd/main.go", &[]);

    assert!(context.degraded);
    assert_eq!(context.filtered_entity_count, context.original_entity_count);
    assert_eq!(context.entities, vec!["User", "Product", "Order"]);
}

#[test]
fn handler_files_carry_api_contracts() {
    let mut spec = shop_spec();
    spec.architecture.packages.push(package("handlers", &["services"]));
    spec.api_contracts = vec![
        ApiContract {
            method: "get".to_string(),
            endpoint: "/api/v1/orders/{id}".to_string(),
            ..Default::default()
        },
        ApiContract {
            method: "POST".to_string(),
            endpoint: "/api/v1/users".to_string(),
            ..Default::default()
        },
    ];
    let spec_filter = filter(spec);

    let handler = spec_filter.filter("handlers/order_handler.go", &[]);
    assert_eq!(handler.specification.api_contracts.len(), 2);

    let model = spec_filter.filter("models/order.go", &[]);
    assert!(model.specification.api_contracts.is_empty());
}

#[test]
fn long_reference_chains_stop_at_depth_bound() {
    let mut spec = Specification::default();
    spec.architecture.packages = vec![package("chain", &[])];
    let names = ["Alpha", "Bravo", "Charlie", "Delta"];
    for (i, name) in names.iter().enumerate() {
        let next = names[(i + 1) % names.len()];
        let pointer = format!("*{}", next);
        spec.data_model
            .entities
            .push(entity(name, "chain", &[("next", pointer.as_str())]));
    }
    let shallow = ContextFilter::new(
        Arc::new(spec),
        ContextOptions {
            max_depth: 1,
            ..Default::default()
        },
    );

    let context = shallow.filter("chain/alpha.go", &[]);
    assert_eq!(context.entities, vec!["Alpha", "Bravo"]);
}
