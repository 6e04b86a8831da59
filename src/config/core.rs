use crate::dataset::Schema;
use crate::pipeline::FinalizationConfig;
use crate::publish::WriteMode;
use crate::stages::StageSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for propflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Finalization rules (dedup + column coercion)
    #[serde(default)]
    pub finalize: FinalizationConfig,

    #[serde(default)]
    pub diff: DiffConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Declarative stages, registered in file order
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

/// Format of the base dataset file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Json,
    Csv,
}

/// Base dataset configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path to the base dataset file
    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default)]
    pub format: SourceFormat,

    /// Identity column used for dedup, diffing, and append merges
    #[serde(default = "default_identity_key")]
    pub identity_key: String,

    /// Field delimiter for CSV sources
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Declared column types for CSV sources
    #[serde(default)]
    pub schema: Schema,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            format: SourceFormat::default(),
            identity_key: default_identity_key(),
            delimiter: default_delimiter(),
            schema: Schema::default(),
        }
    }
}

/// Diff engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Absolute tolerance for numeric comparisons
    #[serde(default = "default_tolerance")]
    pub numeric_tolerance: f64,

    /// Scan shared keys in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: default_tolerance(),
            parallel: true,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving published tables and the geometry subset
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Sink name of the full table
    #[serde(default = "default_table_sink")]
    pub table: String,

    #[serde(default)]
    pub write_mode: WriteMode,

    /// Sink name of the designated geometry subset
    #[serde(default = "default_geometry_sink")]
    pub geometry_sink: String,

    /// Boolean column selecting the geometry subset
    #[serde(default = "default_designation_column")]
    pub designation_column: String,

    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,

    /// Metadata CSV export path, relative paths resolve against `dir`
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,

    /// Directory for profile, diff, and failure reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            table: default_table_sink(),
            write_mode: WriteMode::default(),
            geometry_sink: default_geometry_sink(),
            designation_column: default_designation_column(),
            geometry_column: default_geometry_column(),
            metadata_file: default_metadata_file(),
            reports_dir: default_reports_dir(),
        }
    }
}

impl OutputConfig {
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(&self.metadata_file)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.dir.join(&self.reports_dir)
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("data/properties.json")
}

fn default_identity_key() -> String {
    "opa_id".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_tolerance() -> f64 {
    crate::diff::DEFAULT_NUMERIC_TOLERANCE
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_table_sink() -> String {
    "all_properties_end".to_string()
}

fn default_geometry_sink() -> String {
    "vacant_properties".to_string()
}

fn default_designation_column() -> String {
    "vacant".to_string()
}

fn default_geometry_column() -> String {
    "geometry".to_string()
}

fn default_metadata_file() -> PathBuf {
    PathBuf::from("metadata.csv")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}
