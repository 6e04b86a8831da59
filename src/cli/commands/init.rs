use crate::config::{ConfigError, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"# propflow configuration

[dataset]
source = "data/properties.json"
format = "json"          # json | csv
identity_key = "opa_id"

[finalize]
numeric_columns = [
    "market_value",
    "sale_price",
    "total_assessment",
    "total_due",
    "num_years_owed",
    "permit_count",
]
text_columns = ["most_recent_year_owed"]

[diff]
numeric_tolerance = 1e-6
parallel = true

[output]
dir = "output"
table = "all_properties_end"
write_mode = "replace"   # replace | append
geometry_sink = "vacant_properties"
designation_column = "vacant"
geometry_column = "geometry"
metadata_file = "metadata.csv"
reports_dir = "reports"

# Declarative stages run in dependency order after loading.
#
# [[stages]]
# name = "vacant"
# op = "flag"
# column = "vacant"
# when = { column = "land_use", op = "eq", value = "vacant" }
"#;

/// Write a starter config into `dir`. Returns the path written.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        return Err(ConfigError::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|source| ConfigError::Write {
        path: config_path.clone(),
        source,
    })?;
    println!("Created {} configuration file", config_path.display());

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_from_path, PipelineConfig};

    #[test]
    fn test_starter_config_matches_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path(), false).unwrap();
        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_existing_config_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), false).unwrap();
        assert!(matches!(
            init_config(dir.path(), false),
            Err(ConfigError::AlreadyExists(_))
        ));
        assert!(init_config(dir.path(), true).is_ok());
    }
}
