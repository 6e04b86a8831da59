use std::fs;
use std::path::{Path, PathBuf};

use super::core::PipelineConfig;
use super::validation::validate_config_result;
use super::ConfigError;

pub const CONFIG_FILE_NAME: &str = ".propflow.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse TOML and validate the result.
pub fn parse_and_validate_config(contents: &str, path: &Path) -> Result<PipelineConfig, ConfigError> {
    let config = toml::from_str::<PipelineConfig>(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config_result(&config)?;
    Ok(config)
}

/// Load and validate a config file at an explicit path.
pub fn load_config_from_path(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_and_validate_config(&contents, path)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Generate `start` and its ancestors, at most `max_depth` directories.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find the nearest `.propflow.toml` at or above `start`.
pub fn find_config_file(start: PathBuf) -> Option<PathBuf> {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Resolve the configuration for a run.
///
/// An explicit path must load. Otherwise the nearest `.propflow.toml` above
/// the current directory is used, and it must load too. With no file
/// anywhere the defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<(PipelineConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        return load_config_from_path(path).map(|c| (c, Some(path.to_path_buf())));
    }

    let current = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            return Ok((PipelineConfig::default(), None));
        }
    };

    match find_config_file(current) {
        Some(path) => load_config_from_path(&path).map(|c| (c, Some(path))),
        None => {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            Ok((PipelineConfig::default(), None))
        }
    }
}
