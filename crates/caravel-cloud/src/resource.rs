//! Resource records and dependency ordering
//!
//! A [`ResourceRecord`] describes one named cloud resource and the records it
//! depends on. A [`ResourceStack`] holds the full set and produces the
//! creation order (dependencies first) and the teardown order (exact
//! reverse), so a resource with dependents is never deleted before them.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Kind of cloud resource managed by a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    EcrRepository,
    LogGroup,
    IamRole,
    Secret,
    EfsFileSystem,
    EfsMountTargets,
    SecurityGroup,
    LoadBalancer,
    TargetGroup,
    Listener,
    EcsCluster,
    TaskDefinition,
    EcsService,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::EcrRepository => "ecr-repository",
            ResourceKind::LogGroup => "log-group",
            ResourceKind::IamRole => "iam-role",
            ResourceKind::Secret => "secret",
            ResourceKind::EfsFileSystem => "efs-file-system",
            ResourceKind::EfsMountTargets => "efs-mount-targets",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::TargetGroup => "target-group",
            ResourceKind::Listener => "listener",
            ResourceKind::EcsCluster => "ecs-cluster",
            ResourceKind::TaskDefinition => "task-definition",
            ResourceKind::EcsService => "ecs-service",
        };
        write!(f, "{}", s)
    }
}

/// A named cloud resource with declared dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource kind
    pub kind: ResourceKind,

    /// Logical name, also used as the cloud-side name
    pub name: String,

    /// Logical names of resources this one depends on
    pub depends_on: Vec<String>,

    /// Kind-specific configuration
    pub config: serde_json::Value,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            depends_on: Vec::new(),
            config: serde_json::Value::Null,
        }
    }

    pub fn depends_on<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.depends_on = names.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Get a configuration value as a specific type
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// The full set of resources for one environment, in declaration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceStack {
    records: Vec<ResourceRecord>,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ResourceRecord) {
        self.records.push(record);
    }

    pub fn get(&self, name: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resources in creation order: every record appears after all of its
    /// dependencies. Ties keep declaration order, so the order is stable
    /// across runs.
    pub fn creation_order(&self) -> Result<Vec<&ResourceRecord>> {
        let by_name: HashMap<&str, &ResourceRecord> =
            self.records.iter().map(|r| (r.name.as_str(), r)).collect();

        for record in &self.records {
            for dep in &record.depends_on {
                if !by_name.contains_key(dep.as_str()) {
                    return Err(CloudError::UnknownDependency {
                        resource: record.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut ordered: Vec<&ResourceRecord> = Vec::with_capacity(self.records.len());
        let mut placed: HashSet<&str> = HashSet::new();

        // Kahn-style passes over the declaration order keep the result stable.
        while ordered.len() < self.records.len() {
            let before = ordered.len();

            for record in &self.records {
                if placed.contains(record.name.as_str()) {
                    continue;
                }
                if record
                    .depends_on
                    .iter()
                    .all(|d| placed.contains(d.as_str()))
                {
                    placed.insert(record.name.as_str());
                    ordered.push(record);
                }
            }

            if ordered.len() == before {
                let stuck = self
                    .records
                    .iter()
                    .find(|r| !placed.contains(r.name.as_str()))
                    .map(|r| r.name.clone())
                    .unwrap_or_default();
                return Err(CloudError::DependencyCycle(stuck));
            }
        }

        Ok(ordered)
    }

    /// Resources in teardown order: the exact reverse of creation order,
    /// so dependents are always deleted before their dependencies.
    pub fn teardown_order(&self) -> Result<Vec<&ResourceRecord>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stack() -> ResourceStack {
        let mut stack = ResourceStack::new();
        stack.add(ResourceRecord::new(ResourceKind::EcsCluster, "cluster"));
        stack.add(
            ResourceRecord::new(ResourceKind::EcsService, "service")
                .depends_on(&["cluster", "task-def", "target-group"]),
        );
        stack.add(ResourceRecord::new(ResourceKind::TaskDefinition, "task-def"));
        stack.add(ResourceRecord::new(ResourceKind::TargetGroup, "target-group"));
        stack
    }

    #[test]
    fn test_creation_order_respects_dependencies() {
        let stack = sample_stack();
        let order = stack.creation_order().unwrap();
        let names: Vec<&str> = order.iter().map(|r| r.name.as_str()).collect();

        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("cluster") < pos("service"));
        assert!(pos("task-def") < pos("service"));
        assert!(pos("target-group") < pos("service"));
    }

    #[test]
    fn test_teardown_order_is_reverse() {
        let stack = sample_stack();
        let creation: Vec<String> = stack
            .creation_order()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        let mut teardown: Vec<String> = stack
            .teardown_order()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        teardown.reverse();
        assert_eq!(creation, teardown);
    }

    #[test]
    fn test_stable_on_declaration_order() {
        let mut stack = ResourceStack::new();
        stack.add(ResourceRecord::new(ResourceKind::LogGroup, "logs"));
        stack.add(ResourceRecord::new(ResourceKind::EcrRepository, "repo"));
        stack.add(ResourceRecord::new(ResourceKind::IamRole, "role"));

        let names: Vec<&str> = stack
            .creation_order()
            .unwrap()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["logs", "repo", "role"]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut stack = ResourceStack::new();
        stack.add(ResourceRecord::new(ResourceKind::SecurityGroup, "a").depends_on(&["b"]));
        stack.add(ResourceRecord::new(ResourceKind::SecurityGroup, "b").depends_on(&["a"]));

        match stack.creation_order() {
            Err(CloudError::DependencyCycle(_)) => {}
            other => panic!("expected DependencyCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dependency_is_an_error() {
        let mut stack = ResourceStack::new();
        stack.add(ResourceRecord::new(ResourceKind::Listener, "http").depends_on(&["missing"]));

        match stack.creation_order() {
            Err(CloudError::UnknownDependency { resource, dependency }) => {
                assert_eq!(resource, "http");
                assert_eq!(dependency, "missing");
            }
            other => panic!("expected UnknownDependency, got {:?}", other),
        }
    }
}
