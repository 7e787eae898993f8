//! AWS provider for Caravel
//!
//! Implements the CloudProvider trait on top of the `aws` CLI, provisioning
//! the fixed ECS/Fargate application stack: ECR repository, CloudWatch log
//! group, IAM roles, Secrets Manager secret, EFS file system with mount
//! targets, security groups, an Application Load Balancer with target group
//! and listener, and the ECS cluster/task definition/service.
//!
//! # Requirements
//!
//! - the `aws` CLI must be installed and configured
//! - credentials are whatever the CLI resolves (profile, env, SSO, ...)
//!
//! # Example
//!
//! ```ignore
//! use caravel_cloud_aws::{build_stack, AwsProvider};
//! use caravel_cloud::{CloudProvider, Orchestrator};
//!
//! let config = caravel_config::DeployConfig::load("caravel.yaml")?;
//! let provider = AwsProvider::new(&config.region);
//! let stack = build_stack(&config);
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     anyhow::bail!("not authenticated: {:?}", auth.error);
//! }
//!
//! let orchestrator = Orchestrator::new(&provider, &stack, ".");
//! let (result, state) = orchestrator.up().await?;
//! ```

pub mod awscli;
pub mod error;
pub mod provider;
pub mod stack;
pub mod types;

pub use awscli::AwsCli;
pub use error::{AwsError, Result};
pub use provider::AwsProvider;
pub use stack::{build_stack, StackNames};
