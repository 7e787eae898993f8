//! Provisioning and teardown orchestration
//!
//! Drives a [`CloudProvider`] over a [`ResourceStack`]: creation in
//! dependency order with a lookup before every create, teardown in reverse
//! order, identifiers recorded in the state file as they are assigned.
//! The first unexpected error aborts the run; whatever was recorded up to
//! that point is saved so a later run can resume or tear down.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::error::Result;
use crate::provider::CloudProvider;
use crate::resource::{ResourceRecord, ResourceStack};
use crate::state::{ResourceState, StackState, StateManager};
use std::path::Path;

/// Orchestrates provisioning and teardown for one environment
pub struct Orchestrator<'a, P: CloudProvider> {
    provider: &'a P,
    stack: &'a ResourceStack,
    state_manager: StateManager,
}

/// Live-vs-recorded view of one resource, for `status`
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub record: ResourceRecord,
    pub recorded: Option<ResourceState>,
    pub exists: bool,
}

impl<'a, P: CloudProvider> Orchestrator<'a, P> {
    pub fn new(provider: &'a P, stack: &'a ResourceStack, project_root: impl AsRef<Path>) -> Self {
        Self {
            provider,
            stack,
            state_manager: StateManager::new(project_root),
        }
    }

    /// Diff the desired stack against live lookups without mutating anything
    pub async fn plan(&self) -> Result<Plan> {
        let recorded = self.state_manager.load().await?;
        let mut actions = Vec::new();

        for record in self.stack.creation_order()? {
            let action = match self.provider.lookup(record, &recorded).await? {
                Some(_) => Action::new(
                    ActionType::NoOp,
                    record.kind,
                    &record.name,
                    format!("{} {} already exists", record.kind, record.name),
                ),
                None => Action::new(
                    ActionType::Create,
                    record.kind,
                    &record.name,
                    format!("Create {} {}", record.kind, record.name),
                ),
            };
            actions.push(action);
        }

        Ok(Plan::new(actions))
    }

    /// Provision the stack: check-then-create in dependency order.
    ///
    /// Existing resources are re-recorded and reported as no-ops, so a
    /// second run creates nothing. The first failure stops the run.
    pub async fn up(&self) -> Result<(ApplyResult, StackState)> {
        let lock = self.state_manager.acquire_lock().await?;
        let mut recorded = self.state_manager.load().await?;
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for record in self.stack.creation_order()? {
            let action_id = format!("create-{}", record.name);

            match self.provider.lookup(record, &recorded).await {
                Ok(Some(existing)) => {
                    tracing::info!("{} {} already exists", record.kind, record.name);
                    recorded.set_resource(&record.name, existing);
                    result.add_success(
                        action_id,
                        format!("{} {} already exists", record.kind, record.name),
                    );
                }
                Ok(None) => {
                    tracing::info!("Creating {} {}", record.kind, record.name);
                    match self.provider.create(record, &recorded).await {
                        Ok(created) => {
                            let id = created.id.clone();
                            recorded.set_resource(&record.name, created);
                            result.add_success(
                                action_id,
                                format!("Created {} {} ({})", record.kind, record.name, id),
                            );
                        }
                        Err(e) => {
                            result.add_failure(action_id, e.to_string());
                            break;
                        }
                    }
                }
                Err(e) => {
                    result.add_failure(action_id, e.to_string());
                    break;
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        self.state_manager.save(&recorded).await?;
        lock.release().await?;
        Ok((result, recorded))
    }

    /// Tear the stack down in reverse dependency order.
    ///
    /// Resources that are already gone count as deleted, so teardown of a
    /// never-provisioned environment succeeds.
    pub async fn down(&self) -> Result<ApplyResult> {
        let lock = self.state_manager.acquire_lock().await?;
        let mut recorded = self.state_manager.load().await?;
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for record in self.stack.teardown_order()? {
            let action_id = format!("delete-{}", record.name);

            match self.provider.delete(record, &recorded).await {
                Ok(()) => {
                    recorded.remove_resource(&record.name);
                    result.add_success(
                        action_id,
                        format!("Deleted {} {}", record.kind, record.name),
                    );
                }
                Err(e) => {
                    result.add_failure(action_id, e.to_string());
                    break;
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        self.state_manager.save(&recorded).await?;
        lock.release().await?;
        Ok(result)
    }

    /// Recorded state plus live existence for every resource in the stack
    pub async fn status(&self) -> Result<Vec<StatusEntry>> {
        let recorded = self.state_manager.load().await?;
        let mut entries = Vec::new();

        for record in self.stack.creation_order()? {
            let live = self.provider.lookup(record, &recorded).await?;
            entries.push(StatusEntry {
                record: record.clone(),
                recorded: recorded.get_resource(&record.name).cloned(),
                exists: live.is_some(),
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use crate::provider::AuthStatus;
    use crate::resource::ResourceKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// In-memory provider recording every operation in call order
    struct MockProvider {
        live: Mutex<HashMap<String, ResourceState>>,
        ops: Mutex<Vec<String>>,
        fail_on_create: Option<String>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                live: Mutex::new(HashMap::new()),
                ops: Mutex::new(Vec::new()),
                fail_on_create: None,
            }
        }

        fn failing_on(name: &str) -> Self {
            Self {
                fail_on_create: Some(name.to_string()),
                ..Self::new()
            }
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn creates(&self) -> usize {
            self.ops()
                .iter()
                .filter(|o| o.starts_with("create "))
                .count()
        }
    }

    #[async_trait]
    impl CloudProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn display_name(&self) -> &str {
            "Mock Cloud"
        }

        async fn check_auth(&self) -> Result<AuthStatus> {
            Ok(AuthStatus::ok("mock-account"))
        }

        async fn lookup(
            &self,
            record: &ResourceRecord,
            _recorded: &StackState,
        ) -> Result<Option<ResourceState>> {
            Ok(self.live.lock().unwrap().get(&record.name).cloned())
        }

        async fn create(
            &self,
            record: &ResourceRecord,
            _recorded: &StackState,
        ) -> Result<ResourceState> {
            if self.fail_on_create.as_deref() == Some(record.name.as_str()) {
                return Err(CloudError::ApiError(format!(
                    "create {} refused",
                    record.name
                )));
            }
            self.ops
                .lock()
                .unwrap()
                .push(format!("create {}", record.name));
            let state = ResourceState::new(format!("id-{}", record.name), record.kind);
            self.live
                .lock()
                .unwrap()
                .insert(record.name.clone(), state.clone());
            Ok(state)
        }

        async fn delete(
            &self,
            record: &ResourceRecord,
            _recorded: &StackState,
        ) -> Result<()> {
            // Deleting something that never existed is still a success
            self.ops
                .lock()
                .unwrap()
                .push(format!("delete {}", record.name));
            self.live.lock().unwrap().remove(&record.name);
            Ok(())
        }
    }

    fn sample_stack() -> ResourceStack {
        let mut stack = ResourceStack::new();
        stack.add(ResourceRecord::new(ResourceKind::EcrRepository, "repo"));
        stack.add(ResourceRecord::new(ResourceKind::EcsCluster, "cluster"));
        stack.add(
            ResourceRecord::new(ResourceKind::TaskDefinition, "task").depends_on(&["repo"]),
        );
        stack.add(
            ResourceRecord::new(ResourceKind::EcsService, "service")
                .depends_on(&["cluster", "task"]),
        );
        stack
    }

    #[tokio::test]
    async fn test_up_twice_creates_nothing_new() {
        let temp = tempdir().unwrap();
        let provider = MockProvider::new();
        let stack = sample_stack();
        let orch = Orchestrator::new(&provider, &stack, temp.path());

        let (first, _) = orch.up().await.unwrap();
        assert!(first.is_success());
        assert_eq!(provider.creates(), 4);

        let (second, _) = orch.up().await.unwrap();
        assert!(second.is_success());
        assert_eq!(provider.creates(), 4, "second run must not create");

        let plan = orch.plan().await.unwrap();
        assert!(!plan.has_changes);
    }

    #[tokio::test]
    async fn test_down_on_never_provisioned_env_succeeds() {
        let temp = tempdir().unwrap();
        let provider = MockProvider::new();
        let stack = sample_stack();
        let orch = Orchestrator::new(&provider, &stack, temp.path());

        let result = orch.down().await.unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_teardown_reverses_creation_order() {
        let temp = tempdir().unwrap();
        let provider = MockProvider::new();
        let stack = sample_stack();
        let orch = Orchestrator::new(&provider, &stack, temp.path());

        orch.up().await.unwrap();
        orch.down().await.unwrap();

        let ops = provider.ops();
        let creates: Vec<&str> = ops
            .iter()
            .filter_map(|o| o.strip_prefix("create "))
            .collect();
        let mut deletes: Vec<&str> = ops
            .iter()
            .filter_map(|o| o.strip_prefix("delete "))
            .collect();
        deletes.reverse();
        assert_eq!(creates, deletes);
    }

    #[tokio::test]
    async fn test_first_create_failure_aborts_run() {
        let temp = tempdir().unwrap();
        let provider = MockProvider::failing_on("task");
        let stack = sample_stack();
        let orch = Orchestrator::new(&provider, &stack, temp.path());

        let (result, recorded) = orch.up().await.unwrap();
        assert!(!result.is_success());
        assert_eq!(result.failed.len(), 1);
        // service comes after task and must not have been attempted
        assert!(provider.ops().iter().all(|o| o != "create service"));
        // partial identifiers survive for later teardown
        assert!(recorded.get_resource("repo").is_some());
        assert!(recorded.get_resource("service").is_none());
    }

    #[tokio::test]
    async fn test_plan_reports_missing_resources() {
        let temp = tempdir().unwrap();
        let provider = MockProvider::new();
        let stack = sample_stack();
        let orch = Orchestrator::new(&provider, &stack, temp.path());

        let plan = orch.plan().await.unwrap();
        assert!(plan.has_changes);
        assert_eq!(plan.summary().create, 4);
        assert_eq!(plan.summary().no_change, 0);
    }

    #[tokio::test]
    async fn test_status_reflects_live_and_recorded() {
        let temp = tempdir().unwrap();
        let provider = MockProvider::new();
        let stack = sample_stack();
        let orch = Orchestrator::new(&provider, &stack, temp.path());

        let before = orch.status().await.unwrap();
        assert!(before.iter().all(|e| !e.exists && e.recorded.is_none()));

        orch.up().await.unwrap();

        let after = orch.status().await.unwrap();
        assert!(after.iter().all(|e| e.exists && e.recorded.is_some()));
    }
}
