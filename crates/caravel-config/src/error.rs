use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "No configuration file found. Checked:\n\
        - current directory: caravel.yaml, caravel.local.yaml, .caravel.yaml, .caravel.local.yaml\n\
        - ./.caravel/ directory\n\
        - ~/.config/caravel/caravel.yaml\n\
        A path can also be given directly via the CARAVEL_CONFIG_PATH environment variable"
    )]
    ConfigFileNotFound,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
