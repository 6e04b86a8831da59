//! Configuration loaded from `.propflow.toml`.
//!
//! ```toml
//! [dataset]
//! source = "data/opa_properties.csv"
//! format = "csv"
//! identity_key = "opa_id"
//!
//! [diff]
//! numeric_tolerance = 1e-6
//!
//! [output]
//! dir = "output"
//! table = "all_properties_end"
//! write_mode = "replace"
//! ```

mod core;
pub mod loader;
pub mod validation;

pub use self::core::{DatasetConfig, DiffConfig, OutputConfig, PipelineConfig, SourceFormat};
pub use loader::{
    directory_ancestors, find_config_file, load_config, load_config_from_path, parse_and_validate_config,
    CONFIG_FILE_NAME,
};
pub use validation::{validate_config, validate_config_result, ConfigValidation};

use std::path::PathBuf;
use stillwater::NonEmptyVec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", join_messages(errors))]
    Invalid { errors: NonEmptyVec<String> },

    #[error("invalid stage '{stage}': {reason}")]
    InvalidStage { stage: String, reason: String },

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to write config file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn join_messages(errors: &NonEmptyVec<String>) -> String {
    errors
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ")
}
