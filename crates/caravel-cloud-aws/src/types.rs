//! JSON response shapes consumed from the aws CLI
//!
//! Only the fields the orchestrator actually reads are modeled. AWS is
//! inconsistent about casing across services (EC2/ELB/EFS/IAM/STS use
//! PascalCase, ECS/ECR/Logs use camelCase), so renames are per field.

use serde::{Deserialize, Serialize};

// --- STS ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "Account")]
    pub account: String,

    #[serde(rename = "Arn")]
    pub arn: String,

    #[serde(rename = "UserId")]
    pub user_id: String,
}

// --- ECR ---

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeRepositories {
    pub repositories: Vec<EcrRepositoryInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRepository {
    pub repository: EcrRepositoryInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EcrRepositoryInfo {
    #[serde(rename = "repositoryName")]
    pub name: String,

    #[serde(rename = "repositoryArn")]
    pub arn: String,

    #[serde(rename = "repositoryUri")]
    pub uri: String,
}

// --- CloudWatch Logs ---

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeLogGroups {
    #[serde(rename = "logGroups")]
    pub log_groups: Vec<LogGroupInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogGroupInfo {
    #[serde(rename = "logGroupName")]
    pub name: String,

    pub arn: Option<String>,
}

// --- IAM ---

#[derive(Debug, Clone, Deserialize)]
pub struct RoleEnvelope {
    #[serde(rename = "Role")]
    pub role: RoleInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleInfo {
    #[serde(rename = "RoleName")]
    pub name: String,

    #[serde(rename = "Arn")]
    pub arn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachedPolicies {
    #[serde(rename = "AttachedPolicies")]
    pub attached_policies: Vec<AttachedPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachedPolicy {
    #[serde(rename = "PolicyArn")]
    pub policy_arn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolePolicyNames {
    #[serde(rename = "PolicyNames")]
    pub policy_names: Vec<String>,
}

// --- Secrets Manager ---

#[derive(Debug, Clone, Deserialize)]
pub struct SecretInfo {
    #[serde(rename = "ARN")]
    pub arn: String,

    #[serde(rename = "Name")]
    pub name: String,
}

// --- EFS ---

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeFileSystems {
    #[serde(rename = "FileSystems")]
    pub file_systems: Vec<FileSystemInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileSystemInfo {
    #[serde(rename = "FileSystemId")]
    pub id: String,

    #[serde(rename = "LifeCycleState")]
    pub life_cycle_state: String,
}

impl FileSystemInfo {
    pub fn is_available(&self) -> bool {
        self.life_cycle_state == "available"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeMountTargets {
    #[serde(rename = "MountTargets")]
    pub mount_targets: Vec<MountTargetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MountTargetInfo {
    #[serde(rename = "MountTargetId")]
    pub id: String,

    #[serde(rename = "SubnetId")]
    pub subnet_id: String,

    #[serde(rename = "LifeCycleState")]
    pub life_cycle_state: String,
}

impl MountTargetInfo {
    pub fn is_available(&self) -> bool {
        self.life_cycle_state == "available"
    }
}

// --- EC2 (security groups) ---

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeSecurityGroups {
    #[serde(rename = "SecurityGroups")]
    pub security_groups: Vec<SecurityGroupInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityGroupInfo {
    #[serde(rename = "GroupId")]
    pub id: String,

    #[serde(rename = "GroupName")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSecurityGroup {
    #[serde(rename = "GroupId")]
    pub group_id: String,
}

// --- ELBv2 ---

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeLoadBalancers {
    #[serde(rename = "LoadBalancers")]
    pub load_balancers: Vec<LoadBalancerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancerInfo {
    #[serde(rename = "LoadBalancerArn")]
    pub arn: String,

    #[serde(rename = "DNSName")]
    pub dns_name: String,

    #[serde(rename = "State")]
    pub state: Option<LoadBalancerState>,
}

impl LoadBalancerInfo {
    pub fn is_active(&self) -> bool {
        self.state
            .as_ref()
            .map(|s| s.code == "active")
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancerState {
    #[serde(rename = "Code")]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeTargetGroups {
    #[serde(rename = "TargetGroups")]
    pub target_groups: Vec<TargetGroupInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetGroupInfo {
    #[serde(rename = "TargetGroupArn")]
    pub arn: String,

    #[serde(rename = "TargetGroupName")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeListeners {
    #[serde(rename = "Listeners")]
    pub listeners: Vec<ListenerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerInfo {
    #[serde(rename = "ListenerArn")]
    pub arn: String,

    #[serde(rename = "Port")]
    pub port: Option<u16>,
}

// --- ECS ---

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeClusters {
    pub clusters: Vec<ClusterInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCluster {
    pub cluster: ClusterInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    #[serde(rename = "clusterName")]
    pub name: String,

    #[serde(rename = "clusterArn")]
    pub arn: String,

    pub status: String,
}

impl ClusterInfo {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDefinitionEnvelope {
    #[serde(rename = "taskDefinition")]
    pub task_definition: TaskDefinitionInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDefinitionInfo {
    #[serde(rename = "taskDefinitionArn")]
    pub arn: String,

    pub family: String,

    pub revision: u32,

    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeServices {
    pub services: Vec<ServiceInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateService {
    pub service: ServiceInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "serviceName")]
    pub name: String,

    #[serde(rename = "serviceArn")]
    pub arn: String,

    pub status: String,

    #[serde(rename = "runningCount")]
    pub running_count: i64,

    #[serde(rename = "desiredCount")]
    pub desired_count: i64,
}

impl ServiceInfo {
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }

    pub fn is_drained(&self) -> bool {
        self.running_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_describe_repositories() {
        let json = r#"{"repositories":[{"repositoryName":"demo-app",
            "repositoryArn":"arn:aws:ecr:ap-northeast-1:123456789012:repository/demo-app",
            "repositoryUri":"123456789012.dkr.ecr.ap-northeast-1.amazonaws.com/demo-app"}]}"#;
        let parsed: DescribeRepositories = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.repositories.len(), 1);
        assert_eq!(parsed.repositories[0].name, "demo-app");
    }

    #[test]
    fn test_parse_load_balancer_state() {
        let json = r#"{"LoadBalancers":[{"LoadBalancerArn":"arn:aws:elasticloadbalancing:x",
            "DNSName":"demo-alb-123.ap-northeast-1.elb.amazonaws.com",
            "State":{"Code":"provisioning"}}]}"#;
        let parsed: DescribeLoadBalancers = serde_json::from_str(json).unwrap();
        assert!(!parsed.load_balancers[0].is_active());
    }

    #[test]
    fn test_parse_service_counts() {
        let json = r#"{"services":[{"serviceName":"demo-service",
            "serviceArn":"arn:aws:ecs:x","status":"ACTIVE",
            "runningCount":0,"desiredCount":1}]}"#;
        let parsed: DescribeServices = serde_json::from_str(json).unwrap();
        assert!(parsed.services[0].is_active());
        assert!(parsed.services[0].is_drained());
    }

    #[test]
    fn test_deleted_service_counts_as_drained() {
        let json = r#"{"services":[{"serviceName":"demo-service",
            "serviceArn":"arn:aws:ecs:x","status":"INACTIVE",
            "runningCount":0,"desiredCount":0}]}"#;
        let parsed: DescribeServices = serde_json::from_str(json).unwrap();
        let service = &parsed.services[0];
        assert!(!service.is_active() && service.is_drained());
    }

    #[test]
    fn test_parse_caller_identity() {
        let json = r#"{"UserId":"AIDAX","Account":"123456789012",
            "Arn":"arn:aws:iam::123456789012:user/deploy"}"#;
        let parsed: CallerIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.account, "123456789012");
    }
}
