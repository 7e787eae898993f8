//! Action types for provisioning runs

use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A planned step against a single cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Kind of the target resource
    pub kind: ResourceKind,

    /// Logical name of the target resource
    pub resource_name: String,

    /// Human-readable description
    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        kind: ResourceKind,
        resource_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let resource_name = resource_name.into();
        Self {
            id: format!("{}-{}", action_type, resource_name),
            action_type,
            kind,
            resource_name,
            description: description.into(),
            details: HashMap::new(),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Delete a resource
    Delete,
    /// Resource already in the desired state
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied, in execution order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in the order they will run
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to delete, {} unchanged",
            self.create, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_summary() {
        let actions = vec![
            Action::new(
                ActionType::Create,
                ResourceKind::EcrRepository,
                "demo-repo",
                "Create ECR repository demo-repo",
            ),
            Action::new(
                ActionType::NoOp,
                ResourceKind::LogGroup,
                "demo-logs",
                "Log group demo-logs already exists",
            ),
        ];

        let plan = Plan::new(actions);
        assert!(plan.has_changes);

        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 0);
        assert_eq!(summary.no_change, 1);
    }

    #[test]
    fn test_empty_plan_has_no_changes() {
        let plan = Plan::empty();
        assert!(!plan.has_changes);

        let noop_only = Plan::new(vec![Action::new(
            ActionType::NoOp,
            ResourceKind::EcsCluster,
            "demo",
            "Cluster demo already exists",
        )]);
        assert!(!noop_only.has_changes);
    }
}
