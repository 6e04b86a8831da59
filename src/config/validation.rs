//! Validation with error accumulation for configuration.
//!
//! Each section is checked by a pure function returning a stillwater
//! [`Validation`]; the results are combined so one run reports every
//! problem instead of stopping at the first.

use super::core::{PipelineConfig, SourceFormat};
use super::ConfigError;
use std::collections::HashSet;
use stillwater::{NonEmptyVec, Validation};

/// Validation result carrying every message found.
pub type ConfigValidation = Validation<(), NonEmptyVec<String>>;

/// Validate the whole config, accumulating ALL errors.
pub fn validate_config(config: &PipelineConfig) -> ConfigValidation {
    combine_validations(vec![
        validate_dataset(config),
        validate_diff(config),
        validate_output(config),
        validate_stages(config),
    ])
}

/// [`validate_config`] as a `Result` for the loader.
pub fn validate_config_result(config: &PipelineConfig) -> Result<(), ConfigError> {
    match validate_config(config) {
        Validation::Success(()) => Ok(()),
        Validation::Failure(errors) => Err(ConfigError::Invalid { errors }),
    }
}

/// Combine section validations, keeping every failure in order.
pub fn combine_validations(validations: Vec<ConfigValidation>) -> ConfigValidation {
    let mut failures = Vec::new();
    for validation in validations {
        if let Validation::Failure(errors) = validation {
            failures.extend(errors);
        }
    }
    from_messages(failures)
}

fn from_messages(messages: Vec<String>) -> ConfigValidation {
    match NonEmptyVec::from_vec(messages) {
        Some(errors) => Validation::Failure(errors),
        None => Validation::Success(()),
    }
}

fn failure(message: String) -> ConfigValidation {
    Validation::Failure(NonEmptyVec::new(message, Vec::new()))
}

fn validate_dataset(config: &PipelineConfig) -> ConfigValidation {
    let mut errors = Vec::new();
    if config.dataset.identity_key.trim().is_empty() {
        errors.push("dataset.identity_key must not be empty".to_string());
    }
    if config.dataset.format == SourceFormat::Csv && !config.dataset.delimiter.is_ascii() {
        errors.push(format!(
            "dataset.delimiter must be a single ASCII character, got '{}'",
            config.dataset.delimiter
        ));
    }
    from_messages(errors)
}

fn validate_diff(config: &PipelineConfig) -> ConfigValidation {
    let tolerance = config.diff.numeric_tolerance;
    if tolerance.is_finite() && tolerance >= 0.0 {
        Validation::Success(())
    } else {
        failure(format!(
            "diff.numeric_tolerance must be a non-negative number, got {}",
            tolerance
        ))
    }
}

fn validate_output(config: &PipelineConfig) -> ConfigValidation {
    let output = &config.output;
    let mut errors = Vec::new();
    if output.table.trim().is_empty() {
        errors.push("output.table must not be empty".to_string());
    }
    if output.geometry_sink.trim().is_empty() {
        errors.push("output.geometry_sink must not be empty".to_string());
    }
    if output.table == output.geometry_sink {
        errors.push(format!(
            "output.table and output.geometry_sink are both '{}'",
            output.table
        ));
    }
    from_messages(errors)
}

fn validate_stages(config: &PipelineConfig) -> ConfigValidation {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for (i, spec) in config.stages.iter().enumerate() {
        if spec.name.trim().is_empty() {
            errors.push(format!("stages[{}].name must not be empty", i));
            continue;
        }
        if !seen.insert(spec.name.as_str()) {
            errors.push(format!("stage '{}' is defined more than once", spec.name));
        }
        if let Err(reason) = spec.op.validate() {
            errors.push(format!("stage '{}': {}", spec.name, reason));
        }
    }
    from_messages(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{StageOp, StageSpec};

    fn drop_stage(name: &str) -> StageSpec {
        StageSpec {
            name: name.to_string(),
            after: vec![],
            description: None,
            op: StageOp::DropColumns {
                columns: vec!["x".to_string()],
            },
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PipelineConfig::default()).is_success());
    }

    #[test]
    fn test_all_errors_are_accumulated() {
        let mut config = PipelineConfig::default();
        config.dataset.identity_key = " ".to_string();
        config.diff.numeric_tolerance = -1.0;
        config.stages = vec![drop_stage(""), drop_stage("a"), drop_stage("a")];

        let Err(ConfigError::Invalid { errors }) = validate_config_result(&config) else {
            panic!("expected invalid config");
        };
        assert_eq!(
            errors.into_vec(),
            vec![
                "dataset.identity_key must not be empty".to_string(),
                "diff.numeric_tolerance must be a non-negative number, got -1".to_string(),
                "stages[0].name must not be empty".to_string(),
                "stage 'a' is defined more than once".to_string(),
            ]
        );
    }

    #[test]
    fn test_nan_tolerance_is_rejected() {
        let mut config = PipelineConfig::default();
        config.diff.numeric_tolerance = f64::NAN;
        assert!(validate_config(&config).is_failure());
    }

    #[test]
    fn test_combine_keeps_failures_in_order() {
        let combined = combine_validations(vec![
            failure("first".to_string()),
            Validation::Success(()),
            from_messages(vec!["second".to_string(), "third".to_string()]),
        ]);
        match combined {
            Validation::Failure(errors) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors.head(), "first");
                assert_eq!(errors.into_vec(), vec!["first", "second", "third"]);
            }
            Validation::Success(()) => panic!("expected failures"),
        }
    }

    #[test]
    fn test_invalid_error_lists_every_message() {
        let mut config = PipelineConfig::default();
        config.output.table = "same".to_string();
        config.output.geometry_sink = "same".to_string();
        config.diff.numeric_tolerance = -0.5;

        let message = validate_config_result(&config).unwrap_err().to_string();
        assert!(message.contains("numeric_tolerance"));
        assert!(message.contains("both 'same'"));
    }
}
