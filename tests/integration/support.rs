//! Shared fixtures: specification builders and a scriptable generator.

use async_trait::async_trait;
use parking_lot::Mutex;
use specforge::context::FilteredSpecification;
use specforge::error::ApiError;
use specforge::generator::Generator;
use specforge::scheduler::{CancellationSignal, ExecutionPlan, GenerationTask};
use specforge::spec::{Entity, Package, Specification};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

pub fn entity(name: &str, package: &str, attrs: &[(&str, &str)]) -> Entity {
    Entity {
        name: name.to_string(),
        package: package.to_string(),
        attributes: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn package(name: &str, deps: &[&str]) -> Package {
    Package {
        name: name.to_string(),
        path: name.to_string(),
        purpose: String::new(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
    }
}

/// models ← services, with User / Product / Order entities.
pub fn shop_spec() -> Specification {
    let mut spec = Specification::default();
    spec.version = "1.0".to_string();
    spec.architecture.packages = vec![package("models", &[]), package("services", &["models"])];
    spec.data_model.entities = vec![
        entity("User", "models", &[("id", "string"), ("email", "string")]),
        entity("Product", "models", &[("sku", "string")]),
        entity("Order", "models", &[("buyer", "*User"), ("items", "[]Product")]),
    ];
    spec
}

/// One model file per entity, then services depending on the whole models phase.
pub fn shop_plan() -> ExecutionPlan {
    ExecutionPlan::new("shop")
        .with_phase(
            "models",
            vec![
                GenerationTask::produce_file("user-model", "models/user.go"),
                GenerationTask::produce_file("product-model", "models/product.go"),
                GenerationTask::produce_file("order-model", "models/order.go"),
            ],
        )
        .with_phase(
            "services",
            vec![GenerationTask::produce_file("order-service", "services/order_service.go")
                .with_dependencies(["models"])],
        )
}

/// Generator that records calls, fails chosen paths and can stall.
#[derive(Default)]
pub struct ScriptedGenerator {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    stall: Mutex<HashSet<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, path: &str) {
        self.failing.lock().insert(path.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    /// Calls for `path` wait until cancelled.
    pub fn stall_on(&self, path: &str) {
        self.stall.lock().insert(path.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().clone();
        calls.sort();
        calls
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        task: &GenerationTask,
        context: &FilteredSpecification,
        cancel: &CancellationSignal,
    ) -> Result<String, ApiError> {
        self.calls.lock().push(task.target_path.clone());
        let stalls = self.stall.lock().contains(&task.target_path);
        if stalls {
            cancel.cancelled().await;
            return Err(ApiError::Cancelled);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        let fails = self.failing.lock().contains(&task.target_path);
        if fails {
            return Err(ApiError::Generator(format!(
                "upstream rejected {}",
                task.target_path
            )));
        }
        Ok(format!(
            "// {}\n// entities: {}\n",
            task.target_path,
            context.entities.join(",")
        ))
    }
}
