//! Generation plans: phases of tasks and their dependency expansion.

use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::scheduler::executor::Schedulable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Produces one output file through the generator. The only kind scheduled.
    ProduceFile,
    /// Fixed boilerplate rendered outside the generator.
    RenderTemplate,
    /// Post-generation command (formatters, test runs).
    RunCommand,
}

fn default_kind() -> TaskKind {
    TaskKind::ProduceFile
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationTask {
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: TaskKind,
    pub target_path: String,
    /// Opaque parameters handed to the generator.
    #[serde(default)]
    pub input: Value,
    /// Whether the task may run alongside its level siblings.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Task ids or phase ids this task waits for.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl GenerationTask {
    pub fn produce_file(id: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TaskKind::ProduceFile,
            target_path: target_path.into(),
            input: Value::Null,
            parallel: true,
            depends_on: Vec::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Entity names named by the input parameters: `"entities": [..]` or `"entity": ".."`.
    pub fn entity_hints(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if let Some(list) = self.input.get("entities").and_then(Value::as_array) {
            hints.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(single) = self.input.get("entity").and_then(Value::as_str) {
            if !hints.iter().any(|h| h == single) {
                hints.push(single.to_string());
            }
        }
        hints
    }

    /// Package this task generates into: `"package"` input, else the target's directory name.
    pub fn package_hint(&self) -> Option<String> {
        if let Some(package) = self.input.get("package").and_then(Value::as_str) {
            return Some(package.to_string());
        }
        std::path::Path::new(&self.target_path)
            .parent()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().to_string())
    }
}

impl Schedulable for GenerationTask {
    fn runs_alongside_siblings(&self) -> bool {
        self.parallel
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanPhase {
    pub id: String,
    /// Dependencies inherited by every task in the phase.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<GenerationTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub phases: Vec<PlanPhase>,
}

impl ExecutionPlan {
    pub fn new(plan_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            phases: Vec::new(),
        }
    }

    pub fn with_phase(mut self, id: impl Into<String>, tasks: Vec<GenerationTask>) -> Self {
        self.phases.push(PlanPhase {
            id: id.into(),
            depends_on: Vec::new(),
            tasks,
        });
        self
    }

    /// Every task with the id of its phase
    pub fn tasks(&self) -> impl Iterator<Item = (&PlanPhase, &GenerationTask)> {
        self.phases
            .iter()
            .flat_map(|phase| phase.tasks.iter().map(move |task| (phase, task)))
    }

    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Expand a task's dependency ids: phase ids become every task of that
    /// phase, task ids pass through. Unknown ids are a validation failure.
    pub fn expand_dependencies(
        &self,
        phase: &PlanPhase,
        task: &GenerationTask,
    ) -> Result<Vec<String>, GraphError> {
        let phases: BTreeMap<&str, &PlanPhase> =
            self.phases.iter().map(|p| (p.id.as_str(), p)).collect();
        let task_ids: HashSet<&str> = self.tasks().map(|(_, t)| t.id.as_str()).collect();

        let mut expanded: Vec<String> = Vec::new();
        let push = |id: &str, expanded: &mut Vec<String>| {
            if id != task.id && !expanded.iter().any(|e| e == id) {
                expanded.push(id.to_string());
            }
        };

        for dep in task.depends_on.iter().chain(phase.depends_on.iter()) {
            if let Some(dep_phase) = phases.get(dep.as_str()) {
                for member in &dep_phase.tasks {
                    push(&member.id, &mut expanded);
                }
            } else if task_ids.contains(dep.as_str()) {
                push(dep, &mut expanded);
            } else {
                return Err(GraphError::UnresolvedDependency {
                    task: task.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        Ok(expanded)
    }

    /// Structural checks over the whole plan: unique ids, resolvable
    /// dependencies, and no cycle across any task kind.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.id.as_str()) {
                return Err(GraphError::DuplicateNode(phase.id.clone()));
            }
        }
        for (_, task) in self.tasks() {
            if !seen.insert(task.id.as_str()) {
                return Err(GraphError::DuplicateNode(task.id.clone()));
            }
        }

        let mut full: DependencyGraph<()> = DependencyGraph::new();
        for (phase, task) in self.tasks() {
            let deps = self.expand_dependencies(phase, task)?;
            full.add_node_with_dependencies(task.id.clone(), (), deps)?;
        }
        full.validate()
    }

    /// Graph of every `ProduceFile` task.
    pub fn build_graph(&self) -> Result<DependencyGraph<GenerationTask>, GraphError> {
        self.build_graph_filtered(|_| true)
    }

    /// Graph of the `ProduceFile` tasks accepted by `select`. Dependencies on
    /// tasks left out stay in the node's list and count as satisfied.
    pub fn build_graph_filtered<F>(&self, select: F) -> Result<DependencyGraph<GenerationTask>, GraphError>
    where
        F: Fn(&GenerationTask) -> bool,
    {
        self.validate()?;
        let mut graph = DependencyGraph::new();
        for (phase, task) in self.tasks() {
            if task.kind != TaskKind::ProduceFile || !select(task) {
                continue;
            }
            let deps = self.expand_dependencies(phase, task)?;
            graph.add_node_with_dependencies(task.id.clone(), task.clone(), deps)?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layered_plan() -> ExecutionPlan {
        let mut template = GenerationTask::produce_file("go-mod", "go.mod");
        template.kind = TaskKind::RenderTemplate;
        ExecutionPlan::new("plan-1")
            .with_phase(
                "models",
                vec![
                    GenerationTask::produce_file("user-model", "models/user.go"),
                    GenerationTask::produce_file("order-model", "models/order.go"),
                ],
            )
            .with_phase("scaffold", vec![template])
            .with_phase(
                "services",
                vec![GenerationTask::produce_file("order-service", "services/order_service.go")
                    .with_dependencies(["models", "go-mod"])],
            )
    }

    #[test]
    fn phase_dependency_expands_to_members() {
        let plan = layered_plan();
        let (phase, task) = plan
            .tasks()
            .find(|(_, t)| t.id == "order-service")
            .unwrap();
        let deps = plan.expand_dependencies(phase, task).unwrap();
        assert_eq!(deps, vec!["user-model", "order-model", "go-mod"]);
    }

    #[test]
    fn only_produce_file_tasks_are_scheduled() {
        let mut graph = layered_plan().build_graph().unwrap();
        assert_eq!(graph.len(), 3);
        assert!(!graph.contains("go-mod"));
        graph.compute_levels();
        assert_eq!(graph.level_of("order-service"), Some(1));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let plan = ExecutionPlan::new("p").with_phase(
            "only",
            vec![GenerationTask::produce_file("a", "a.go").with_dependencies(["ghost"])],
        );
        assert_eq!(
            plan.build_graph().unwrap_err(),
            GraphError::UnresolvedDependency {
                task: "a".to_string(),
                dependency: "ghost".to_string()
            }
        );
    }

    #[test]
    fn cycle_through_template_task_is_detected() {
        let mut template = GenerationTask::produce_file("tpl", "README.md").with_dependencies(["b"]);
        template.kind = TaskKind::RenderTemplate;
        let plan = ExecutionPlan::new("p").with_phase(
            "all",
            vec![
                GenerationTask::produce_file("a", "a.go").with_dependencies(["tpl"]),
                GenerationTask::produce_file("b", "b.go").with_dependencies(["a"]),
                template,
            ],
        );
        assert!(matches!(
            plan.build_graph(),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn filtered_graph_keeps_dependency_ids() {
        let graph = layered_plan()
            .build_graph_filtered(|t| t.id != "user-model")
            .unwrap();
        assert!(!graph.contains("user-model"));
        let service = graph.get("order-service").unwrap();
        assert!(service.dependencies.contains(&"user-model".to_string()));
    }

    #[test]
    fn entity_hints_read_both_shapes() {
        let task = GenerationTask::produce_file("t", "x/y.go")
            .with_input(json!({"entities": ["User", "Order"], "entity": "User"}));
        assert_eq!(task.entity_hints(), vec!["User", "Order"]);
        assert_eq!(task.package_hint(), Some("x".to_string()));
    }

    #[test]
    fn deserializes_with_defaults() {
        let task: GenerationTask =
            serde_json::from_value(json!({"id": "a", "target_path": "a.go"})).unwrap();
        assert_eq!(task.kind, TaskKind::ProduceFile);
        assert!(task.parallel);
        assert!(task.depends_on.is_empty());
    }
}
