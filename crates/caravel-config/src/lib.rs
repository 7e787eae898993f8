//! Deployment configuration for Caravel
//!
//! Environment parameters (region, account, naming prefix, network and
//! container settings) come from a `caravel.yaml` file, discovered through
//! the same candidate search in every project, with a few environment
//! variable overrides for CI use.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deployment parameters for one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Project name, used as the prefix for every resource name
    pub project: String,

    /// AWS region (overridable via AWS_REGION)
    pub region: String,

    /// Twelve-digit AWS account ID
    pub account_id: String,

    /// VPC the stack lives in
    pub vpc_id: String,

    /// Subnets for the load balancer, mount targets, and service
    pub subnet_ids: Vec<String>,

    /// Image tag deployed by the task definition
    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    /// Port the container listens on
    #[serde(default = "default_container_port")]
    pub container_port: u16,

    /// Health check path for the target group
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,

    /// Fargate task CPU units
    #[serde(default = "default_cpu")]
    pub cpu: String,

    /// Fargate task memory (MiB)
    #[serde(default = "default_memory")]
    pub memory: String,

    /// Desired number of running tasks
    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    /// Environment variable holding the initial secret value.
    /// The value itself never appears in the config file.
    #[serde(default)]
    pub secret_value_env: Option<String>,
}

fn default_image_tag() -> String {
    "latest".to_string()
}

fn default_container_port() -> u16 {
    8000
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_cpu() -> String {
    "256".to_string()
}

fn default_memory() -> String {
    "512".to_string()
}

fn default_desired_count() -> u32 {
    1
}

impl DeployConfig {
    /// Load and validate a config file, applying environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: DeployConfig = serde_yaml::from_str(&content)?;

        if let Ok(region) = std::env::var("AWS_REGION") {
            if !region.is_empty() {
                config.region = region;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.is_empty()
            || !self
                .project
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            || !self.project.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::Invalid(format!(
                "project must start with a letter and contain only letters, digits, and hyphens: {:?}",
                self.project
            )));
        }

        if self.account_id.len() != 12 || !self.account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid(format!(
                "account_id must be a 12-digit AWS account ID: {:?}",
                self.account_id
            )));
        }

        if self.subnet_ids.len() < 2 {
            return Err(ConfigError::Invalid(
                "at least two subnet_ids are required (the load balancer spans two AZs)".into(),
            ));
        }

        if !self.health_check_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "health_check_path must start with '/': {:?}",
                self.health_check_path
            )));
        }

        Ok(())
    }
}

/// Get the Caravel config directory (~/.config/caravel)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("caravel");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the project's caravel.yaml
///
/// Search order:
/// 1. CARAVEL_CONFIG_PATH environment variable (direct path)
/// 2. current directory: caravel.local.yaml, .caravel.local.yaml,
///    caravel.yaml, .caravel.yaml
/// 3. ./.caravel/ directory, same candidates
/// 4. ~/.config/caravel/caravel.yaml (global config)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("CARAVEL_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = [
        "caravel.local.yaml",
        ".caravel.local.yaml",
        "caravel.yaml",
        ".caravel.yaml",
    ];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let caravel_dir = current_dir.join(".caravel");
    if caravel_dir.is_dir() {
        for filename in &candidates {
            let path = caravel_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("caravel").join("caravel.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const MINIMAL: &str = r#"
project: demo
region: ap-northeast-1
account_id: "123456789012"
vpc_id: vpc-0abc
subnet_ids: [subnet-a, subnet-b]
"#;

    #[test]
    #[serial]
    fn test_load_minimal_config_with_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("caravel.yaml");
        fs::write(&path, MINIMAL).unwrap();

        std::env::remove_var("AWS_REGION");
        let config = DeployConfig::load(&path).unwrap();

        assert_eq!(config.project, "demo");
        assert_eq!(config.region, "ap-northeast-1");
        assert_eq!(config.container_port, 8000);
        assert_eq!(config.health_check_path, "/health");
        assert_eq!(config.image_tag, "latest");
        assert_eq!(config.desired_count, 1);
    }

    #[test]
    #[serial]
    fn test_aws_region_env_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("caravel.yaml");
        fs::write(&path, MINIMAL).unwrap();

        std::env::set_var("AWS_REGION", "us-west-2");
        let config = DeployConfig::load(&path).unwrap();
        std::env::remove_var("AWS_REGION");

        assert_eq!(config.region, "us-west-2");
    }

    #[test]
    fn test_validate_rejects_bad_project_name() {
        let mut config: DeployConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.project = "2bad_name".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_account_id() {
        let mut config: DeployConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.account_id = "1234".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_two_subnets() {
        let mut config: DeployConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.subnet_ids = vec!["subnet-a".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_get_config_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        let result = get_config_dir();
        std::env::remove_var("XDG_CONFIG_HOME");

        let config_dir = result.unwrap();
        assert!(config_dir.ends_with("caravel"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("caravel.yaml"), "# test").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_config_file();
        assert!(result.is_ok());
        assert!(result.unwrap().ends_with("caravel.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("caravel.yaml"), "# global").unwrap();
        fs::write(temp_dir.path().join("caravel.local.yaml"), "# local").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_config_file().unwrap();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.ends_with("caravel.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_caravel_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let caravel_dir = temp_dir.path().join(".caravel");
        fs::create_dir(&caravel_dir).unwrap();
        fs::write(caravel_dir.join("caravel.yaml"), "# in dir").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_config_file().unwrap();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.ends_with(".caravel/caravel.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "# custom").unwrap();

        std::env::set_var("CARAVEL_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file().unwrap();
        std::env::remove_var("CARAVEL_CONFIG_PATH");

        assert_eq!(result, config_path);
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_config_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
    }
}
