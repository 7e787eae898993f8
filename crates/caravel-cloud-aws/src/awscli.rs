//! aws CLI wrapper
//!
//! Wraps the control-plane calls the provisioning workflow needs, one typed
//! method per call, all with `--output json`. Stderr from failed commands is
//! classified so "not found" and "already exists" can be treated as the
//! non-errors the idempotent workflow expects them to be.

use crate::error::{AwsError, Result};
use crate::types::*;
use std::process::Stdio;
use tokio::process::Command;

/// aws CLI wrapper, pinned to one region
pub struct AwsCli {
    region: String,
}

/// Stderr markers that mean the resource does not exist
const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFoundException",
    "RepositoryNotFoundException",
    "NoSuchEntity",
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "LoadBalancerNotFound",
    "TargetGroupNotFound",
    "ListenerNotFound",
    "FileSystemNotFound",
    "MountTargetNotFound",
    "InvalidGroup.NotFound",
    "Unable to describe task definition",
];

/// Stderr markers that mean the resource is already there
const ALREADY_EXISTS_MARKERS: &[&str] = &[
    "RepositoryAlreadyExistsException",
    "ResourceAlreadyExistsException",
    "EntityAlreadyExists",
    "ResourceExistsException",
    "InvalidGroup.Duplicate",
    "InvalidPermission.Duplicate",
    "MountTargetConflict",
    "DuplicateLoadBalancerName",
    "DuplicateTargetGroupName",
    "DuplicateListener",
];

impl AwsCli {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    /// Check that the aws CLI is installed and credentials resolve
    pub async fn check_auth(&self) -> Result<CallerIdentity> {
        let which = Command::new("which").arg("aws").output().await?;

        if !which.status.success() {
            return Err(AwsError::AwsCliNotFound);
        }

        let output = self.run_command(&["sts", "get-caller-identity"]).await;
        match output {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(AwsError::CommandFailed(stderr)) => Err(AwsError::AuthenticationFailed(stderr)),
            Err(e) => Err(e),
        }
    }

    /// Run an aws command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("aws");
        cmd.arg("--region").arg(&self.region);
        cmd.arg("--output").arg("json");
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: aws --region {} {}", self.region, args.join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(Self::classify(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a command and deserialize its JSON output
    async fn run_json<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let output = self.run_command(args).await?;
        Ok(serde_json::from_str(&output)?)
    }

    fn classify(stderr: String) -> AwsError {
        if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
            AwsError::NotFound(stderr)
        } else if ALREADY_EXISTS_MARKERS.iter().any(|m| stderr.contains(m)) {
            AwsError::AlreadyExists(stderr)
        } else {
            AwsError::CommandFailed(stderr)
        }
    }

    /// Map a not-found failure to `None`
    fn optional<T>(result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(AwsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // --- ECR ---

    pub async fn get_repository(&self, name: &str) -> Result<Option<EcrRepositoryInfo>> {
        let result: Result<DescribeRepositories> = self
            .run_json(&["ecr", "describe-repositories", "--repository-names", name])
            .await;
        Ok(Self::optional(result)?.and_then(|r| r.repositories.into_iter().next()))
    }

    pub async fn create_repository(&self, name: &str) -> Result<EcrRepositoryInfo> {
        let created: CreateRepository = self
            .run_json(&["ecr", "create-repository", "--repository-name", name])
            .await?;
        Ok(created.repository)
    }

    pub async fn delete_repository(&self, name: &str) -> Result<()> {
        self.run_command(&[
            "ecr",
            "delete-repository",
            "--repository-name",
            name,
            "--force",
        ])
        .await?;
        Ok(())
    }

    // --- CloudWatch Logs ---

    pub async fn get_log_group(&self, name: &str) -> Result<Option<LogGroupInfo>> {
        let groups: DescribeLogGroups = self
            .run_json(&[
                "logs",
                "describe-log-groups",
                "--log-group-name-prefix",
                name,
            ])
            .await?;
        // Prefix match; keep only the exact name
        Ok(groups.log_groups.into_iter().find(|g| g.name == name))
    }

    pub async fn create_log_group(&self, name: &str) -> Result<()> {
        self.run_command(&["logs", "create-log-group", "--log-group-name", name])
            .await?;
        Ok(())
    }

    pub async fn delete_log_group(&self, name: &str) -> Result<()> {
        self.run_command(&["logs", "delete-log-group", "--log-group-name", name])
            .await?;
        Ok(())
    }

    // --- IAM ---

    pub async fn get_role(&self, name: &str) -> Result<Option<RoleInfo>> {
        let result: Result<RoleEnvelope> =
            self.run_json(&["iam", "get-role", "--role-name", name]).await;
        Ok(Self::optional(result)?.map(|r| r.role))
    }

    pub async fn create_role(&self, name: &str, trust_policy: &str) -> Result<RoleInfo> {
        let created: RoleEnvelope = self
            .run_json(&[
                "iam",
                "create-role",
                "--role-name",
                name,
                "--assume-role-policy-document",
                trust_policy,
            ])
            .await?;
        Ok(created.role)
    }

    pub async fn attach_role_policy(&self, role: &str, policy_arn: &str) -> Result<()> {
        self.run_command(&[
            "iam",
            "attach-role-policy",
            "--role-name",
            role,
            "--policy-arn",
            policy_arn,
        ])
        .await?;
        Ok(())
    }

    pub async fn put_role_policy(
        &self,
        role: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<()> {
        self.run_command(&[
            "iam",
            "put-role-policy",
            "--role-name",
            role,
            "--policy-name",
            policy_name,
            "--policy-document",
            policy_document,
        ])
        .await?;
        Ok(())
    }

    pub async fn list_attached_role_policies(&self, role: &str) -> Result<Vec<String>> {
        let result: Result<AttachedPolicies> = self
            .run_json(&["iam", "list-attached-role-policies", "--role-name", role])
            .await;
        Ok(Self::optional(result)?
            .map(|p| p.attached_policies.into_iter().map(|a| a.policy_arn).collect())
            .unwrap_or_default())
    }

    pub async fn detach_role_policy(&self, role: &str, policy_arn: &str) -> Result<()> {
        self.run_command(&[
            "iam",
            "detach-role-policy",
            "--role-name",
            role,
            "--policy-arn",
            policy_arn,
        ])
        .await?;
        Ok(())
    }

    pub async fn list_role_policies(&self, role: &str) -> Result<Vec<String>> {
        let result: Result<RolePolicyNames> = self
            .run_json(&["iam", "list-role-policies", "--role-name", role])
            .await;
        Ok(Self::optional(result)?
            .map(|p| p.policy_names)
            .unwrap_or_default())
    }

    pub async fn delete_role_policy(&self, role: &str, policy_name: &str) -> Result<()> {
        self.run_command(&[
            "iam",
            "delete-role-policy",
            "--role-name",
            role,
            "--policy-name",
            policy_name,
        ])
        .await?;
        Ok(())
    }

    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.run_command(&["iam", "delete-role", "--role-name", name])
            .await?;
        Ok(())
    }

    // --- Secrets Manager ---

    pub async fn get_secret(&self, name: &str) -> Result<Option<SecretInfo>> {
        let result: Result<SecretInfo> = self
            .run_json(&["secretsmanager", "describe-secret", "--secret-id", name])
            .await;
        Self::optional(result)
    }

    pub async fn create_secret(&self, name: &str, value: &str) -> Result<SecretInfo> {
        self.run_json(&[
            "secretsmanager",
            "create-secret",
            "--name",
            name,
            "--secret-string",
            value,
        ])
        .await
    }

    pub async fn delete_secret(&self, name: &str) -> Result<()> {
        self.run_command(&[
            "secretsmanager",
            "delete-secret",
            "--secret-id",
            name,
            "--force-delete-without-recovery",
        ])
        .await?;
        Ok(())
    }

    // --- EFS ---

    pub async fn find_file_system(&self, creation_token: &str) -> Result<Option<FileSystemInfo>> {
        let described: DescribeFileSystems = self
            .run_json(&[
                "efs",
                "describe-file-systems",
                "--creation-token",
                creation_token,
            ])
            .await?;
        Ok(described.file_systems.into_iter().next())
    }

    pub async fn get_file_system(&self, id: &str) -> Result<Option<FileSystemInfo>> {
        let result: Result<DescribeFileSystems> = self
            .run_json(&["efs", "describe-file-systems", "--file-system-id", id])
            .await;
        Ok(Self::optional(result)?.and_then(|d| d.file_systems.into_iter().next()))
    }

    pub async fn create_file_system(
        &self,
        creation_token: &str,
        name: &str,
    ) -> Result<FileSystemInfo> {
        let tag = format!("Key=Name,Value={}", name);
        self.run_json(&[
            "efs",
            "create-file-system",
            "--creation-token",
            creation_token,
            "--encrypted",
            "--tags",
            &tag,
        ])
        .await
    }

    pub async fn delete_file_system(&self, id: &str) -> Result<()> {
        self.run_command(&["efs", "delete-file-system", "--file-system-id", id])
            .await?;
        Ok(())
    }

    pub async fn list_mount_targets(&self, file_system_id: &str) -> Result<Vec<MountTargetInfo>> {
        let result: Result<DescribeMountTargets> = self
            .run_json(&[
                "efs",
                "describe-mount-targets",
                "--file-system-id",
                file_system_id,
            ])
            .await;
        Ok(Self::optional(result)?
            .map(|d| d.mount_targets)
            .unwrap_or_default())
    }

    pub async fn create_mount_target(
        &self,
        file_system_id: &str,
        subnet_id: &str,
        security_group_id: &str,
    ) -> Result<MountTargetInfo> {
        self.run_json(&[
            "efs",
            "create-mount-target",
            "--file-system-id",
            file_system_id,
            "--subnet-id",
            subnet_id,
            "--security-groups",
            security_group_id,
        ])
        .await
    }

    pub async fn delete_mount_target(&self, id: &str) -> Result<()> {
        self.run_command(&["efs", "delete-mount-target", "--mount-target-id", id])
            .await?;
        Ok(())
    }

    // --- EC2 security groups ---

    pub async fn find_security_group(
        &self,
        name: &str,
        vpc_id: &str,
    ) -> Result<Option<SecurityGroupInfo>> {
        let name_filter = format!("Name=group-name,Values={}", name);
        let vpc_filter = format!("Name=vpc-id,Values={}", vpc_id);
        let described: DescribeSecurityGroups = self
            .run_json(&[
                "ec2",
                "describe-security-groups",
                "--filters",
                &name_filter,
                &vpc_filter,
            ])
            .await?;
        Ok(described.security_groups.into_iter().next())
    }

    pub async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String> {
        let created: CreateSecurityGroup = self
            .run_json(&[
                "ec2",
                "create-security-group",
                "--group-name",
                name,
                "--description",
                description,
                "--vpc-id",
                vpc_id,
            ])
            .await?;
        Ok(created.group_id)
    }

    /// Open a port to a CIDR range. A duplicate rule is not an error.
    pub async fn authorize_ingress_cidr(
        &self,
        group_id: &str,
        port: u16,
        cidr: &str,
    ) -> Result<()> {
        let port_str = port.to_string();
        let result = self
            .run_command(&[
                "ec2",
                "authorize-security-group-ingress",
                "--group-id",
                group_id,
                "--protocol",
                "tcp",
                "--port",
                &port_str,
                "--cidr",
                cidr,
            ])
            .await;
        match result {
            Ok(_) | Err(AwsError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Open a port to another security group. A duplicate rule is not an error.
    pub async fn authorize_ingress_group(
        &self,
        group_id: &str,
        port: u16,
        source_group_id: &str,
    ) -> Result<()> {
        let port_str = port.to_string();
        let result = self
            .run_command(&[
                "ec2",
                "authorize-security-group-ingress",
                "--group-id",
                group_id,
                "--protocol",
                "tcp",
                "--port",
                &port_str,
                "--source-group",
                source_group_id,
            ])
            .await;
        match result {
            Ok(_) | Err(AwsError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.run_command(&["ec2", "delete-security-group", "--group-id", group_id])
            .await?;
        Ok(())
    }

    // --- ELBv2 ---

    pub async fn find_load_balancer(&self, name: &str) -> Result<Option<LoadBalancerInfo>> {
        let result: Result<DescribeLoadBalancers> = self
            .run_json(&["elbv2", "describe-load-balancers", "--names", name])
            .await;
        Ok(Self::optional(result)?.and_then(|d| d.load_balancers.into_iter().next()))
    }

    pub async fn create_load_balancer(
        &self,
        name: &str,
        subnet_ids: &[String],
        security_group_id: &str,
    ) -> Result<LoadBalancerInfo> {
        let mut args: Vec<&str> = vec![
            "elbv2",
            "create-load-balancer",
            "--name",
            name,
            "--type",
            "application",
            "--security-groups",
            security_group_id,
            "--subnets",
        ];
        for subnet in subnet_ids {
            args.push(subnet.as_str());
        }

        let created: DescribeLoadBalancers = self.run_json(&args).await?;
        created
            .load_balancers
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::UnexpectedResponse("create-load-balancer returned no load balancer".into()))
    }

    pub async fn delete_load_balancer(&self, arn: &str) -> Result<()> {
        self.run_command(&["elbv2", "delete-load-balancer", "--load-balancer-arn", arn])
            .await?;
        Ok(())
    }

    pub async fn find_target_group(&self, name: &str) -> Result<Option<TargetGroupInfo>> {
        let result: Result<DescribeTargetGroups> = self
            .run_json(&["elbv2", "describe-target-groups", "--names", name])
            .await;
        Ok(Self::optional(result)?.and_then(|d| d.target_groups.into_iter().next()))
    }

    pub async fn create_target_group(
        &self,
        name: &str,
        port: u16,
        vpc_id: &str,
        health_check_path: &str,
    ) -> Result<TargetGroupInfo> {
        let port_str = port.to_string();
        let created: DescribeTargetGroups = self
            .run_json(&[
                "elbv2",
                "create-target-group",
                "--name",
                name,
                "--protocol",
                "HTTP",
                "--port",
                &port_str,
                "--vpc-id",
                vpc_id,
                "--target-type",
                "ip",
                "--health-check-path",
                health_check_path,
            ])
            .await?;
        created
            .target_groups
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::UnexpectedResponse("create-target-group returned no target group".into()))
    }

    pub async fn delete_target_group(&self, arn: &str) -> Result<()> {
        self.run_command(&["elbv2", "delete-target-group", "--target-group-arn", arn])
            .await?;
        Ok(())
    }

    pub async fn list_listeners(&self, load_balancer_arn: &str) -> Result<Vec<ListenerInfo>> {
        let result: Result<DescribeListeners> = self
            .run_json(&[
                "elbv2",
                "describe-listeners",
                "--load-balancer-arn",
                load_balancer_arn,
            ])
            .await;
        Ok(Self::optional(result)?
            .map(|d| d.listeners)
            .unwrap_or_default())
    }

    pub async fn create_listener(
        &self,
        load_balancer_arn: &str,
        target_group_arn: &str,
        port: u16,
    ) -> Result<ListenerInfo> {
        let port_str = port.to_string();
        let action = format!("Type=forward,TargetGroupArn={}", target_group_arn);
        let created: DescribeListeners = self
            .run_json(&[
                "elbv2",
                "create-listener",
                "--load-balancer-arn",
                load_balancer_arn,
                "--protocol",
                "HTTP",
                "--port",
                &port_str,
                "--default-actions",
                &action,
            ])
            .await?;
        created
            .listeners
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::UnexpectedResponse("create-listener returned no listener".into()))
    }

    pub async fn delete_listener(&self, arn: &str) -> Result<()> {
        self.run_command(&["elbv2", "delete-listener", "--listener-arn", arn])
            .await?;
        Ok(())
    }

    // --- ECS ---

    pub async fn find_cluster(&self, name: &str) -> Result<Option<ClusterInfo>> {
        let described: DescribeClusters = self
            .run_json(&["ecs", "describe-clusters", "--clusters", name])
            .await?;
        Ok(described.clusters.into_iter().find(|c| c.is_active()))
    }

    pub async fn create_cluster(&self, name: &str) -> Result<ClusterInfo> {
        let created: CreateCluster = self
            .run_json(&["ecs", "create-cluster", "--cluster-name", name])
            .await?;
        Ok(created.cluster)
    }

    pub async fn delete_cluster(&self, name: &str) -> Result<()> {
        self.run_command(&["ecs", "delete-cluster", "--cluster", name])
            .await?;
        Ok(())
    }

    pub async fn find_task_definition(&self, family: &str) -> Result<Option<TaskDefinitionInfo>> {
        let result: Result<TaskDefinitionEnvelope> = self
            .run_json(&["ecs", "describe-task-definition", "--task-definition", family])
            .await;
        Ok(Self::optional(result)?
            .map(|e| e.task_definition)
            .filter(|t| t.status == "ACTIVE"))
    }

    pub async fn register_task_definition(&self, input_json: &str) -> Result<TaskDefinitionInfo> {
        let registered: TaskDefinitionEnvelope = self
            .run_json(&[
                "ecs",
                "register-task-definition",
                "--cli-input-json",
                input_json,
            ])
            .await?;
        Ok(registered.task_definition)
    }

    pub async fn deregister_task_definition(&self, arn: &str) -> Result<()> {
        self.run_command(&["ecs", "deregister-task-definition", "--task-definition", arn])
            .await?;
        Ok(())
    }

    pub async fn find_service(&self, cluster: &str, name: &str) -> Result<Option<ServiceInfo>> {
        let result: Result<DescribeServices> = self
            .run_json(&[
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--services",
                name,
            ])
            .await;
        Ok(Self::optional(result)?
            .and_then(|d| d.services.into_iter().find(|s| s.is_active())))
    }

    /// Describe a service regardless of lifecycle status. Deleted services
    /// stay describable as DRAINING/INACTIVE, so drain polling cannot use
    /// the active-only lookup above.
    pub async fn describe_service(&self, cluster: &str, name: &str) -> Result<Option<ServiceInfo>> {
        let result: Result<DescribeServices> = self
            .run_json(&[
                "ecs",
                "describe-services",
                "--cluster",
                cluster,
                "--services",
                name,
            ])
            .await;
        Ok(Self::optional(result)?.and_then(|d| d.services.into_iter().next()))
    }

    pub async fn create_service(&self, input_json: &str) -> Result<ServiceInfo> {
        let created: CreateService = self
            .run_json(&["ecs", "create-service", "--cli-input-json", input_json])
            .await?;
        Ok(created.service)
    }

    pub async fn scale_service(&self, cluster: &str, name: &str, desired: u32) -> Result<()> {
        let desired_str = desired.to_string();
        self.run_command(&[
            "ecs",
            "update-service",
            "--cluster",
            cluster,
            "--service",
            name,
            "--desired-count",
            &desired_str,
        ])
        .await?;
        Ok(())
    }

    pub async fn delete_service(&self, cluster: &str, name: &str) -> Result<()> {
        self.run_command(&[
            "ecs",
            "delete-service",
            "--cluster",
            cluster,
            "--service",
            name,
            "--force",
        ])
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = AwsCli::classify(
            "An error occurred (RepositoryNotFoundException) when calling the \
             DescribeRepositories operation: ..."
                .to_string(),
        );
        assert!(matches!(err, AwsError::NotFound(_)));
    }

    #[test]
    fn test_classify_already_exists() {
        let err = AwsCli::classify(
            "An error occurred (InvalidPermission.Duplicate) when calling the \
             AuthorizeSecurityGroupIngress operation: ..."
                .to_string(),
        );
        assert!(matches!(err, AwsError::AlreadyExists(_)));
    }

    #[test]
    fn test_classify_other_failure() {
        let err = AwsCli::classify("AccessDeniedException: not allowed".to_string());
        assert!(matches!(err, AwsError::CommandFailed(_)));
    }

    #[test]
    fn test_optional_maps_not_found_to_none() {
        let missing: Result<u32> = Err(AwsError::NotFound("gone".into()));
        assert_eq!(AwsCli::optional(missing).unwrap(), None);

        let present: Result<u32> = Ok(7);
        assert_eq!(AwsCli::optional(present).unwrap(), Some(7));

        let failed: Result<u32> = Err(AwsError::CommandFailed("denied".into()));
        assert!(AwsCli::optional(failed).is_err());
    }
}
