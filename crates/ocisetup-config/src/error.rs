use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("home directory not found. Pass --config and --key-dir explicitly")]
    HomeDirNotFound,

    #[error("cannot expand '{0}': home directory not found")]
    TildeExpansion(String),

    #[error("cannot determine the current directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("key size must be at least {min} bits, got {got}")]
    KeyTooSmall { min: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
