//! The fixed application stack
//!
//! Declares every resource the hosted application needs and the dependency
//! edges between them. Cross-resource references use the logical names
//! (`*_ref` config keys); the provider resolves them against recorded state
//! at create time.

use caravel_config::DeployConfig;
use caravel_cloud::{ResourceKind, ResourceRecord, ResourceStack};
use serde_json::json;

/// Logical and cloud-side names for one environment, all derived from the
/// project prefix
pub struct StackNames {
    pub repository: String,
    pub log_group: String,
    pub secret: String,
    pub execution_role: String,
    pub task_role: String,
    pub file_system: String,
    pub mount_targets: String,
    pub alb_security_group: String,
    pub service_security_group: String,
    pub load_balancer: String,
    pub target_group: String,
    pub listener: String,
    pub cluster: String,
    pub task_definition: String,
    pub task_family: String,
    pub service: String,
}

impl StackNames {
    pub fn new(project: &str) -> Self {
        Self {
            repository: format!("{}-app", project),
            log_group: format!("/ecs/{}-app", project),
            secret: format!("{}/app", project),
            execution_role: format!("{}-task-execution-role", project),
            task_role: format!("{}-task-role", project),
            file_system: format!("{}-data", project),
            mount_targets: format!("{}-data-mounts", project),
            alb_security_group: format!("{}-alb-sg", project),
            service_security_group: format!("{}-service-sg", project),
            load_balancer: format!("{}-alb", project),
            target_group: format!("{}-tg", project),
            listener: format!("{}-http", project),
            cluster: format!("{}-cluster", project),
            task_definition: format!("{}-task", project),
            task_family: format!("{}-app", project),
            service: format!("{}-service", project),
        }
    }
}

/// Managed policy attached to the task execution role
const EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// Managed policy attached to the task role for EFS access
const EFS_CLIENT_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/AmazonElasticFileSystemClientReadWriteAccess";

/// NFS port for EFS mount targets
const NFS_PORT: u16 = 2049;

/// Build the full resource stack for one environment
pub fn build_stack(config: &DeployConfig) -> ResourceStack {
    let names = StackNames::new(&config.project);
    let image = format!(
        "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
        config.account_id, config.region, names.repository, config.image_tag
    );

    let mut stack = ResourceStack::new();

    stack.add(ResourceRecord::new(
        ResourceKind::EcrRepository,
        &names.repository,
    ));

    stack.add(ResourceRecord::new(ResourceKind::LogGroup, &names.log_group));

    stack.add(
        ResourceRecord::new(ResourceKind::Secret, &names.secret).with_config(json!({
            "value_env": config.secret_value_env,
        })),
    );

    // The execution role carries an inline policy scoped to the secret, so
    // the secret must exist first.
    stack.add(
        ResourceRecord::new(ResourceKind::IamRole, &names.execution_role)
            .depends_on(&[&names.secret])
            .with_config(json!({
                "managed_policies": [EXECUTION_POLICY_ARN],
                "secret_ref": names.secret,
            })),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::IamRole, &names.task_role).with_config(json!({
            "managed_policies": [EFS_CLIENT_POLICY_ARN],
        })),
    );

    stack.add(ResourceRecord::new(
        ResourceKind::EfsFileSystem,
        &names.file_system,
    ));

    stack.add(
        ResourceRecord::new(ResourceKind::SecurityGroup, &names.alb_security_group).with_config(
            json!({
                "description": "Public HTTP ingress for the load balancer",
                "vpc_id": config.vpc_id,
                "ingress_cidr": [{"port": 80, "cidr": "0.0.0.0/0"}],
            }),
        ),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::SecurityGroup, &names.service_security_group)
            .depends_on(&[&names.alb_security_group])
            .with_config(json!({
                "description": "Service tasks: traffic from the ALB, NFS to EFS",
                "vpc_id": config.vpc_id,
                "ingress_from": [{
                    "port": config.container_port,
                    "source_ref": names.alb_security_group,
                }],
                "ingress_self": [NFS_PORT],
            })),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::EfsMountTargets, &names.mount_targets)
            .depends_on(&[&names.file_system, &names.service_security_group])
            .with_config(json!({
                "file_system_ref": names.file_system,
                "security_group_ref": names.service_security_group,
                "subnet_ids": config.subnet_ids,
            })),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::TargetGroup, &names.target_group).with_config(json!({
            "port": config.container_port,
            "vpc_id": config.vpc_id,
            "health_check_path": config.health_check_path,
        })),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::LoadBalancer, &names.load_balancer)
            .depends_on(&[&names.alb_security_group])
            .with_config(json!({
                "subnet_ids": config.subnet_ids,
                "security_group_ref": names.alb_security_group,
            })),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::Listener, &names.listener)
            .depends_on(&[&names.load_balancer, &names.target_group])
            .with_config(json!({
                "load_balancer_ref": names.load_balancer,
                "target_group_ref": names.target_group,
                "port": 80,
            })),
    );

    stack.add(ResourceRecord::new(ResourceKind::EcsCluster, &names.cluster));

    stack.add(
        ResourceRecord::new(ResourceKind::TaskDefinition, &names.task_definition)
            .depends_on(&[
                &names.repository,
                &names.log_group,
                &names.secret,
                &names.execution_role,
                &names.task_role,
                &names.file_system,
            ])
            .with_config(json!({
                "family": names.task_family,
                "image": image,
                "cpu": config.cpu,
                "memory": config.memory,
                "container_name": "app",
                "container_port": config.container_port,
                "region": config.region,
                "log_group_ref": names.log_group,
                "execution_role_ref": names.execution_role,
                "task_role_ref": names.task_role,
                "secret_ref": names.secret,
                "file_system_ref": names.file_system,
            })),
    );

    stack.add(
        ResourceRecord::new(ResourceKind::EcsService, &names.service)
            .depends_on(&[
                &names.cluster,
                &names.task_definition,
                &names.mount_targets,
                &names.listener,
                &names.target_group,
                &names.service_security_group,
            ])
            .with_config(json!({
                "cluster_ref": names.cluster,
                "task_definition_ref": names.task_definition,
                "target_group_ref": names.target_group,
                "security_group_ref": names.service_security_group,
                "subnet_ids": config.subnet_ids,
                "desired_count": config.desired_count,
                "container_name": "app",
                "container_port": config.container_port,
            })),
    );

    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> DeployConfig {
        serde_yaml::from_str(
            r#"
project: demo
region: ap-northeast-1
account_id: "123456789012"
vpc_id: vpc-0abc
subnet_ids: [subnet-a, subnet-b]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_stack_orders_service_last() {
        let stack = build_stack(&sample_config());
        let order = stack.creation_order().unwrap();
        assert_eq!(order.last().unwrap().name, "demo-service");
    }

    #[test]
    fn test_stack_has_no_cycles_or_dangling_refs() {
        let stack = build_stack(&sample_config());
        let order = stack.creation_order().unwrap();
        assert_eq!(order.len(), stack.len());

        // every *_ref in config points at a declared record
        for record in stack.iter() {
            if let Some(map) = record.config.as_object() {
                for (key, value) in map {
                    if key.ends_with("_ref") {
                        let target = value.as_str().unwrap();
                        assert!(
                            stack.get(target).is_some(),
                            "{} references unknown {}",
                            record.name,
                            target
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_mount_targets_follow_file_system_and_sg() {
        let stack = build_stack(&sample_config());
        let order = stack.creation_order().unwrap();
        let names: Vec<&str> = order.iter().map(|r| r.name.as_str()).collect();

        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("demo-data") < pos("demo-data-mounts"));
        assert!(pos("demo-service-sg") < pos("demo-data-mounts"));
        assert!(pos("demo-alb-sg") < pos("demo-alb"));
        assert!(pos("demo-alb") < pos("demo-http"));
        assert!(pos("demo-tg") < pos("demo-http"));
    }

    #[test]
    fn test_task_definition_image_uri() {
        let stack = build_stack(&sample_config());
        let task = stack.get("demo-task").unwrap();
        let image: String = task.get_config("image").unwrap();
        assert_eq!(
            image,
            "123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/demo-app:latest"
        );
    }
}
