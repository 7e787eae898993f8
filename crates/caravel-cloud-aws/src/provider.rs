//! AWS provider implementation
//!
//! Implements lookup/create/delete for every resource kind in the stack.
//! Creates resolve cross-resource references (`*_ref` config keys) against
//! the identifiers recorded earlier in the run, and wait for eventually
//! consistent resources before returning so dependents can build on them.

use crate::awscli::AwsCli;
use crate::error::{AwsError, Result};
use caravel_cloud::{
    wait_until, AuthStatus, CloudProvider, ResourceKind, ResourceRecord, ResourceState,
    StackState, WaitConfig,
};
use async_trait::async_trait;
use serde_json::json;

/// Trust policy allowing ECS tasks to assume a role
const ECS_TASKS_TRUST_POLICY: &str = r#"{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Principal": {"Service": "ecs-tasks.amazonaws.com"},
      "Action": "sts:AssumeRole"
    }
  ]
}"#;

/// AWS provider driving the aws CLI
pub struct AwsProvider {
    cli: AwsCli,
    wait: WaitConfig,
}

impl AwsProvider {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            cli: AwsCli::new(region),
            wait: WaitConfig::default(),
        }
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Read a `*_ref` config key and resolve it against recorded state
    fn resolve<'s>(
        record: &ResourceRecord,
        recorded: &'s StackState,
        key: &str,
    ) -> Result<&'s ResourceState> {
        let name: String = record.get_config(key).ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no {} config", record.name, key))
        })?;
        recorded.get_resource(&name).ok_or_else(|| {
            AwsError::MissingReference(format!(
                "{} required by {} is not recorded yet",
                name, record.name
            ))
        })
    }

    fn subnet_ids(record: &ResourceRecord) -> Result<Vec<String>> {
        record.get_config("subnet_ids").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no subnet_ids config", record.name))
        })
    }

    fn vpc_id(record: &ResourceRecord) -> Result<String> {
        record.get_config("vpc_id").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no vpc_id config", record.name))
        })
    }

    async fn lookup_inner(
        &self,
        record: &ResourceRecord,
        _recorded: &StackState,
    ) -> Result<Option<ResourceState>> {
        let found = match record.kind {
            ResourceKind::EcrRepository => self.cli.get_repository(&record.name).await?.map(|r| {
                ResourceState::new(r.arn, record.kind)
                    .with_attribute("uri", json!(r.uri))
            }),
            ResourceKind::LogGroup => self
                .cli
                .get_log_group(&record.name)
                .await?
                .map(|g| ResourceState::new(g.name, record.kind)),
            ResourceKind::Secret => self
                .cli
                .get_secret(&record.name)
                .await?
                .map(|s| ResourceState::new(s.arn, record.kind)),
            ResourceKind::IamRole => self
                .cli
                .get_role(&record.name)
                .await?
                .map(|r| ResourceState::new(r.arn, record.kind)),
            ResourceKind::EfsFileSystem => self
                .cli
                .find_file_system(&record.name)
                .await?
                .map(|fs| ResourceState::new(fs.id, record.kind)),
            ResourceKind::SecurityGroup => {
                let vpc_id = Self::vpc_id(record)?;
                self.cli
                    .find_security_group(&record.name, &vpc_id)
                    .await?
                    .map(|sg| ResourceState::new(sg.id, record.kind))
            }
            ResourceKind::EfsMountTargets => self.lookup_mount_targets(record).await?,
            ResourceKind::LoadBalancer => self.cli.find_load_balancer(&record.name).await?.map(
                |lb| {
                    ResourceState::new(lb.arn, record.kind)
                        .with_attribute("dns_name", json!(lb.dns_name))
                },
            ),
            ResourceKind::TargetGroup => self
                .cli
                .find_target_group(&record.name)
                .await?
                .map(|tg| ResourceState::new(tg.arn, record.kind)),
            ResourceKind::Listener => self.lookup_listener(record).await?,
            ResourceKind::EcsCluster => self
                .cli
                .find_cluster(&record.name)
                .await?
                .map(|c| ResourceState::new(c.arn, record.kind)),
            ResourceKind::TaskDefinition => {
                let family: String = record.get_config("family").ok_or_else(|| {
                    AwsError::MissingReference(format!("{} has no family config", record.name))
                })?;
                self.cli.find_task_definition(&family).await?.map(|t| {
                    ResourceState::new(t.arn, record.kind)
                        .with_attribute("family", json!(t.family))
                        .with_attribute("revision", json!(t.revision))
                })
            }
            ResourceKind::EcsService => {
                let cluster: String = record.get_config("cluster_ref").ok_or_else(|| {
                    AwsError::MissingReference(format!("{} has no cluster_ref config", record.name))
                })?;
                self.cli
                    .find_service(&cluster, &record.name)
                    .await?
                    .map(|s| ResourceState::new(s.arn, record.kind))
            }
        };

        Ok(found)
    }

    /// Mount targets count as existing only when every subnet is covered
    async fn lookup_mount_targets(
        &self,
        record: &ResourceRecord,
    ) -> Result<Option<ResourceState>> {
        let fs_name: String = record.get_config("file_system_ref").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no file_system_ref config", record.name))
        })?;
        let Some(fs) = self.cli.find_file_system(&fs_name).await? else {
            return Ok(None);
        };

        let targets = self.cli.list_mount_targets(&fs.id).await?;
        let subnets = Self::subnet_ids(record)?;

        let all_covered = subnets
            .iter()
            .all(|s| targets.iter().any(|t| &t.subnet_id == s));
        if !all_covered {
            return Ok(None);
        }

        let ids: Vec<String> = targets.into_iter().map(|t| t.id).collect();
        Ok(Some(
            ResourceState::new(fs.id, record.kind)
                .with_attribute("mount_target_ids", json!(ids)),
        ))
    }

    async fn lookup_listener(&self, record: &ResourceRecord) -> Result<Option<ResourceState>> {
        let lb_name: String = record.get_config("load_balancer_ref").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no load_balancer_ref config", record.name))
        })?;
        let port: u16 = record.get_config("port").unwrap_or(80);

        let Some(lb) = self.cli.find_load_balancer(&lb_name).await? else {
            return Ok(None);
        };

        let listeners = self.cli.list_listeners(&lb.arn).await?;
        Ok(listeners
            .into_iter()
            .find(|l| l.port == Some(port))
            .map(|l| ResourceState::new(l.arn, record.kind)))
    }

    async fn create_inner(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let result = match record.kind {
            ResourceKind::EcrRepository => {
                let repo = self.cli.create_repository(&record.name).await?;
                Ok(ResourceState::new(repo.arn, record.kind)
                    .with_attribute("uri", json!(repo.uri)))
            }
            ResourceKind::LogGroup => {
                self.cli.create_log_group(&record.name).await?;
                Ok(ResourceState::new(record.name.clone(), record.kind))
            }
            ResourceKind::Secret => self.create_secret(record).await,
            ResourceKind::IamRole => self.create_role(record, recorded).await,
            ResourceKind::EfsFileSystem => self.create_file_system(record).await,
            ResourceKind::SecurityGroup => self.create_security_group(record, recorded).await,
            ResourceKind::EfsMountTargets => self.create_mount_targets(record, recorded).await,
            ResourceKind::LoadBalancer => self.create_load_balancer(record, recorded).await,
            ResourceKind::TargetGroup => self.create_target_group(record).await,
            ResourceKind::Listener => self.create_listener(record, recorded).await,
            ResourceKind::EcsCluster => {
                let cluster = self.cli.create_cluster(&record.name).await?;
                Ok(ResourceState::new(cluster.arn, record.kind))
            }
            ResourceKind::TaskDefinition => self.register_task_definition(record, recorded).await,
            ResourceKind::EcsService => self.create_service(record, recorded).await,
        };

        // Lost race with a concurrent creator: the resource being there is
        // the outcome we wanted, so fall back to the lookup.
        match result {
            Err(AwsError::AlreadyExists(_)) => {
                self.lookup_inner(record, recorded).await?.ok_or_else(|| {
                    AwsError::UnexpectedResponse(format!(
                        "{} reported as existing but lookup found nothing",
                        record.name
                    ))
                })
            }
            other => other,
        }
    }

    async fn create_secret(&self, record: &ResourceRecord) -> Result<ResourceState> {
        let value = match record.get_config::<Option<String>>("value_env").flatten() {
            Some(var) => std::env::var(&var).map_err(|_| {
                AwsError::MissingReference(format!(
                    "secret value environment variable {} is not set",
                    var
                ))
            })?,
            None => {
                tracing::warn!(
                    "No secret value source configured for {}, storing empty object",
                    record.name
                );
                "{}".to_string()
            }
        };

        let secret = self.cli.create_secret(&record.name, &value).await?;
        Ok(ResourceState::new(secret.arn, record.kind))
    }

    async fn create_role(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let role = self
            .cli
            .create_role(&record.name, ECS_TASKS_TRUST_POLICY)
            .await?;

        let managed: Vec<String> = record.get_config("managed_policies").unwrap_or_default();
        for policy_arn in &managed {
            self.cli.attach_role_policy(&record.name, policy_arn).await?;
        }

        // Execution role gets read access to exactly one secret
        if record.config.get("secret_ref").is_some() {
            let secret = Self::resolve(record, recorded, "secret_ref")?;
            let policy = json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "secretsmanager:GetSecretValue",
                    "Resource": secret.id,
                }]
            });
            self.cli
                .put_role_policy(&record.name, "read-app-secret", &policy.to_string())
                .await?;
        }

        Ok(ResourceState::new(role.arn, record.kind))
    }

    async fn create_file_system(&self, record: &ResourceRecord) -> Result<ResourceState> {
        let fs = self
            .cli
            .create_file_system(&record.name, &record.name)
            .await?;

        let fs_id = fs.id.clone();
        wait_until(&record.name, "available", &self.wait, || {
            let fs_id = fs_id.clone();
            async move {
                Ok(self
                    .cli
                    .get_file_system(&fs_id)
                    .await
                    .map_err(caravel_cloud::CloudError::from)?
                    .map(|f| f.is_available())
                    .unwrap_or(false))
            }
        })
        .await?;

        Ok(ResourceState::new(fs.id, record.kind))
    }

    async fn create_security_group(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let vpc_id = Self::vpc_id(record)?;
        let description: String = record
            .get_config("description")
            .unwrap_or_else(|| record.name.clone());

        let group_id = self
            .cli
            .create_security_group(&record.name, &description, &vpc_id)
            .await?;

        #[derive(serde::Deserialize)]
        struct CidrRule {
            port: u16,
            cidr: String,
        }
        let cidr_rules: Vec<CidrRule> = record.get_config("ingress_cidr").unwrap_or_default();
        for rule in cidr_rules {
            self.cli
                .authorize_ingress_cidr(&group_id, rule.port, &rule.cidr)
                .await?;
        }

        #[derive(serde::Deserialize)]
        struct GroupRule {
            port: u16,
            source_ref: String,
        }
        let group_rules: Vec<GroupRule> = record.get_config("ingress_from").unwrap_or_default();
        for rule in group_rules {
            let source = recorded.get_resource(&rule.source_ref).ok_or_else(|| {
                AwsError::MissingReference(format!(
                    "{} required by {} is not recorded yet",
                    rule.source_ref, record.name
                ))
            })?;
            self.cli
                .authorize_ingress_group(&group_id, rule.port, &source.id)
                .await?;
        }

        let self_ports: Vec<u16> = record.get_config("ingress_self").unwrap_or_default();
        for port in self_ports {
            self.cli
                .authorize_ingress_group(&group_id, port, &group_id)
                .await?;
        }

        Ok(ResourceState::new(group_id, record.kind))
    }

    async fn create_mount_targets(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let fs = Self::resolve(record, recorded, "file_system_ref")?;
        let sg = Self::resolve(record, recorded, "security_group_ref")?;
        let subnets = Self::subnet_ids(record)?;

        let existing = self.cli.list_mount_targets(&fs.id).await?;
        for subnet in &subnets {
            if existing.iter().any(|t| &t.subnet_id == subnet) {
                continue;
            }
            self.cli.create_mount_target(&fs.id, subnet, &sg.id).await?;
        }

        let fs_id = fs.id.clone();
        let subnet_count = subnets.len();
        wait_until(&record.name, "available", &self.wait, || {
            let fs_id = fs_id.clone();
            async move {
                let targets = self
                    .cli
                    .list_mount_targets(&fs_id)
                    .await
                    .map_err(caravel_cloud::CloudError::from)?;
                Ok(targets.len() >= subnet_count && targets.iter().all(|t| t.is_available()))
            }
        })
        .await?;

        let targets = self.cli.list_mount_targets(&fs.id).await?;
        let ids: Vec<String> = targets.into_iter().map(|t| t.id).collect();
        Ok(ResourceState::new(fs.id.clone(), record.kind)
            .with_attribute("mount_target_ids", json!(ids)))
    }

    async fn create_load_balancer(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let sg = Self::resolve(record, recorded, "security_group_ref")?;
        let subnets = Self::subnet_ids(record)?;

        let lb = self
            .cli
            .create_load_balancer(&record.name, &subnets, &sg.id)
            .await?;

        let name = record.name.clone();
        wait_until(&record.name, "active", &self.wait, || {
            let name = name.clone();
            async move {
                Ok(self
                    .cli
                    .find_load_balancer(&name)
                    .await
                    .map_err(caravel_cloud::CloudError::from)?
                    .map(|lb| lb.is_active())
                    .unwrap_or(false))
            }
        })
        .await?;

        Ok(ResourceState::new(lb.arn, record.kind)
            .with_attribute("dns_name", json!(lb.dns_name)))
    }

    async fn create_target_group(&self, record: &ResourceRecord) -> Result<ResourceState> {
        let port: u16 = record.get_config("port").unwrap_or(80);
        let vpc_id = Self::vpc_id(record)?;
        let health_check_path: String = record
            .get_config("health_check_path")
            .unwrap_or_else(|| "/health".to_string());

        let tg = self
            .cli
            .create_target_group(&record.name, port, &vpc_id, &health_check_path)
            .await?;
        Ok(ResourceState::new(tg.arn, record.kind))
    }

    async fn create_listener(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let lb = Self::resolve(record, recorded, "load_balancer_ref")?;
        let tg = Self::resolve(record, recorded, "target_group_ref")?;
        let port: u16 = record.get_config("port").unwrap_or(80);

        let listener = self.cli.create_listener(&lb.id, &tg.id, port).await?;
        Ok(ResourceState::new(listener.arn, record.kind))
    }

    async fn register_task_definition(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let family: String = record.get_config("family").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no family config", record.name))
        })?;
        let image: String = record.get_config("image").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no image config", record.name))
        })?;
        let cpu: String = record.get_config("cpu").unwrap_or_else(|| "256".into());
        let memory: String = record.get_config("memory").unwrap_or_else(|| "512".into());
        let container_name: String = record
            .get_config("container_name")
            .unwrap_or_else(|| "app".into());
        let container_port: u16 = record.get_config("container_port").unwrap_or(8000);
        let region: String = record.get_config("region").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no region config", record.name))
        })?;

        let log_group = Self::resolve(record, recorded, "log_group_ref")?;
        let execution_role = Self::resolve(record, recorded, "execution_role_ref")?;
        let task_role = Self::resolve(record, recorded, "task_role_ref")?;
        let secret = Self::resolve(record, recorded, "secret_ref")?;
        let file_system = Self::resolve(record, recorded, "file_system_ref")?;

        let input = json!({
            "family": family,
            "networkMode": "awsvpc",
            "requiresCompatibilities": ["FARGATE"],
            "cpu": cpu,
            "memory": memory,
            "executionRoleArn": execution_role.id,
            "taskRoleArn": task_role.id,
            "volumes": [{
                "name": "data",
                "efsVolumeConfiguration": {
                    "fileSystemId": file_system.id,
                    "transitEncryption": "ENABLED",
                }
            }],
            "containerDefinitions": [{
                "name": container_name,
                "image": image,
                "essential": true,
                "portMappings": [{"containerPort": container_port, "protocol": "tcp"}],
                "mountPoints": [{"sourceVolume": "data", "containerPath": "/data"}],
                "secrets": [{"name": "APP_SECRETS", "valueFrom": secret.id}],
                "logConfiguration": {
                    "logDriver": "awslogs",
                    "options": {
                        "awslogs-group": log_group.id,
                        "awslogs-region": region,
                        "awslogs-stream-prefix": "app",
                    }
                }
            }]
        });

        let task = self
            .cli
            .register_task_definition(&input.to_string())
            .await?;
        Ok(ResourceState::new(task.arn, record.kind)
            .with_attribute("family", json!(task.family))
            .with_attribute("revision", json!(task.revision)))
    }

    async fn create_service(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState> {
        let cluster: String = record.get_config("cluster_ref").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no cluster_ref config", record.name))
        })?;
        let task_definition = Self::resolve(record, recorded, "task_definition_ref")?;
        let target_group = Self::resolve(record, recorded, "target_group_ref")?;
        let security_group = Self::resolve(record, recorded, "security_group_ref")?;
        let subnets = Self::subnet_ids(record)?;
        let desired_count: u32 = record.get_config("desired_count").unwrap_or(1);
        let container_name: String = record
            .get_config("container_name")
            .unwrap_or_else(|| "app".into());
        let container_port: u16 = record.get_config("container_port").unwrap_or(8000);

        let input = json!({
            "cluster": cluster,
            "serviceName": record.name,
            "taskDefinition": task_definition.id,
            "desiredCount": desired_count,
            "launchType": "FARGATE",
            "networkConfiguration": {
                "awsvpcConfiguration": {
                    "subnets": subnets,
                    "securityGroups": [security_group.id],
                    "assignPublicIp": "ENABLED",
                }
            },
            "loadBalancers": [{
                "targetGroupArn": target_group.id,
                "containerName": container_name,
                "containerPort": container_port,
            }]
        });

        let service = self.cli.create_service(&input.to_string()).await?;
        Ok(ResourceState::new(service.arn, record.kind))
    }

    async fn delete_inner(&self, record: &ResourceRecord) -> Result<()> {
        let result = match record.kind {
            ResourceKind::EcrRepository => self.cli.delete_repository(&record.name).await,
            ResourceKind::LogGroup => self.cli.delete_log_group(&record.name).await,
            ResourceKind::Secret => self.cli.delete_secret(&record.name).await,
            ResourceKind::IamRole => self.delete_role(record).await,
            ResourceKind::EfsFileSystem => self.delete_file_system(record).await,
            ResourceKind::SecurityGroup => self.delete_security_group(record).await,
            ResourceKind::EfsMountTargets => self.delete_mount_targets(record).await,
            ResourceKind::LoadBalancer => self.delete_load_balancer(record).await,
            ResourceKind::TargetGroup => self.delete_target_group(record).await,
            ResourceKind::Listener => self.delete_listener(record).await,
            ResourceKind::EcsCluster => self.cli.delete_cluster(&record.name).await,
            ResourceKind::TaskDefinition => self.delete_task_definition(record).await,
            ResourceKind::EcsService => self.delete_service(record).await,
        };

        // Already gone is the state teardown wants
        match result {
            Ok(()) | Err(AwsError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_role(&self, record: &ResourceRecord) -> Result<()> {
        if self.cli.get_role(&record.name).await?.is_none() {
            return Ok(());
        }

        for policy_arn in self.cli.list_attached_role_policies(&record.name).await? {
            self.cli.detach_role_policy(&record.name, &policy_arn).await?;
        }
        for policy_name in self.cli.list_role_policies(&record.name).await? {
            self.cli.delete_role_policy(&record.name, &policy_name).await?;
        }
        self.cli.delete_role(&record.name).await
    }

    async fn delete_file_system(&self, record: &ResourceRecord) -> Result<()> {
        match self.cli.find_file_system(&record.name).await? {
            Some(fs) => self.cli.delete_file_system(&fs.id).await,
            None => Ok(()),
        }
    }

    async fn delete_security_group(&self, record: &ResourceRecord) -> Result<()> {
        let vpc_id = Self::vpc_id(record)?;
        match self.cli.find_security_group(&record.name, &vpc_id).await? {
            Some(sg) => self.cli.delete_security_group(&sg.id).await,
            None => Ok(()),
        }
    }

    async fn delete_mount_targets(&self, record: &ResourceRecord) -> Result<()> {
        let fs_name: String = record.get_config("file_system_ref").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no file_system_ref config", record.name))
        })?;
        let Some(fs) = self.cli.find_file_system(&fs_name).await? else {
            return Ok(());
        };

        for target in self.cli.list_mount_targets(&fs.id).await? {
            self.cli.delete_mount_target(&target.id).await?;
        }

        // The file system refuses deletion while mount targets linger
        let fs_id = fs.id.clone();
        wait_until(&record.name, "deleted", &self.wait, || {
            let fs_id = fs_id.clone();
            async move {
                let targets = self
                    .cli
                    .list_mount_targets(&fs_id)
                    .await
                    .map_err(caravel_cloud::CloudError::from)?;
                Ok(targets.is_empty())
            }
        })
        .await?;

        Ok(())
    }

    async fn delete_load_balancer(&self, record: &ResourceRecord) -> Result<()> {
        let Some(lb) = self.cli.find_load_balancer(&record.name).await? else {
            return Ok(());
        };
        self.cli.delete_load_balancer(&lb.arn).await?;

        // Security group deletion fails while the ALB's interfaces linger
        let name = record.name.clone();
        wait_until(&record.name, "deleted", &self.wait, || {
            let name = name.clone();
            async move {
                Ok(self
                    .cli
                    .find_load_balancer(&name)
                    .await
                    .map_err(caravel_cloud::CloudError::from)?
                    .is_none())
            }
        })
        .await?;

        Ok(())
    }

    async fn delete_target_group(&self, record: &ResourceRecord) -> Result<()> {
        match self.cli.find_target_group(&record.name).await? {
            Some(tg) => self.cli.delete_target_group(&tg.arn).await,
            None => Ok(()),
        }
    }

    async fn delete_listener(&self, record: &ResourceRecord) -> Result<()> {
        let lb_name: String = record.get_config("load_balancer_ref").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no load_balancer_ref config", record.name))
        })?;
        let port: u16 = record.get_config("port").unwrap_or(80);

        let Some(lb) = self.cli.find_load_balancer(&lb_name).await? else {
            return Ok(());
        };
        let listeners = self.cli.list_listeners(&lb.arn).await?;
        if let Some(listener) = listeners.into_iter().find(|l| l.port == Some(port)) {
            self.cli.delete_listener(&listener.arn).await?;
        }
        Ok(())
    }

    async fn delete_task_definition(&self, record: &ResourceRecord) -> Result<()> {
        let family: String = record.get_config("family").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no family config", record.name))
        })?;
        match self.cli.find_task_definition(&family).await? {
            Some(task) => self.cli.deregister_task_definition(&task.arn).await,
            None => Ok(()),
        }
    }

    async fn delete_service(&self, record: &ResourceRecord) -> Result<()> {
        let cluster: String = record.get_config("cluster_ref").ok_or_else(|| {
            AwsError::MissingReference(format!("{} has no cluster_ref config", record.name))
        })?;

        if self.cli.find_service(&cluster, &record.name).await?.is_none() {
            return Ok(());
        }

        self.cli.scale_service(&cluster, &record.name, 0).await?;
        self.cli.delete_service(&cluster, &record.name).await?;

        // Cluster deletion fails while the service is still draining
        let name = record.name.clone();
        wait_until(&record.name, "drained", &self.wait, || {
            let cluster = cluster.clone();
            let name = name.clone();
            async move {
                let service = self
                    .cli
                    .describe_service(&cluster, &name)
                    .await
                    .map_err(caravel_cloud::CloudError::from)?;
                Ok(service.map_or(true, |s| !s.is_active() && s.is_drained()))
            }
        })
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    async fn check_auth(&self) -> caravel_cloud::Result<AuthStatus> {
        match self.cli.check_auth().await {
            Ok(identity) => Ok(AuthStatus::ok(format!(
                "{} ({})",
                identity.account, identity.arn
            ))),
            Err(AwsError::AwsCliNotFound) => {
                Ok(AuthStatus::failed("aws CLI is not installed"))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn lookup(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> caravel_cloud::Result<Option<ResourceState>> {
        self.lookup_inner(record, recorded)
            .await
            .map_err(Into::into)
    }

    async fn create(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> caravel_cloud::Result<ResourceState> {
        self.create_inner(record, recorded)
            .await
            .map_err(Into::into)
    }

    async fn delete(
        &self,
        record: &ResourceRecord,
        _recorded: &StackState,
    ) -> caravel_cloud::Result<()> {
        self.delete_inner(record).await.map_err(Into::into)
    }
}
