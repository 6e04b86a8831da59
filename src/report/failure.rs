use crate::errors::{error_chain, PipelineError};
use crate::observability::{RunContext, RunPhase};
use serde::Serialize;

/// Structured record of a fatal run error, handed to the failure sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub kind: String,
    pub code: String,
    pub message: String,
    /// Messages of the error and each of its causes, outermost first.
    pub chain: Vec<String>,
    pub phase: Option<RunPhase>,
    pub stage: Option<String>,
    pub timestamp: String,
}

impl FailureReport {
    /// Build a report from the error and the run context at the point of
    /// failure. The failing stage comes from the error when it names one,
    /// otherwise from the context.
    pub fn from_error(error: &PipelineError, context: &RunContext) -> Self {
        let stage = error
            .stage_name()
            .map(str::to_string)
            .or_else(|| context.stage.clone());
        Self {
            kind: error.kind().to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
            chain: error_chain(error),
            phase: context.phase,
            stage,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Root cause message, the innermost entry of the chain.
    pub fn root_cause(&self) -> &str {
        self.chain.last().map_or(self.message.as_str(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_report() {
        let err = PipelineError::stage_failure("vacant", anyhow::anyhow!("lookup timed out"));
        let context = RunContext {
            phase: Some(RunPhase::Stages),
            stage: Some("vacant".to_string()),
        };

        let report = FailureReport::from_error(&err, &context);
        assert_eq!(report.kind, "StageFailure");
        assert_eq!(report.code, "E010");
        assert_eq!(report.stage.as_deref(), Some("vacant"));
        assert_eq!(report.phase, Some(RunPhase::Stages));
        assert_eq!(report.root_cause(), "lookup timed out");
    }

    #[test]
    fn test_stage_falls_back_to_context() {
        let err = PipelineError::CyclicDependency {
            stages: vec!["a".into(), "b".into(), "a".into()],
        };
        let report = FailureReport::from_error(&err, &RunContext::new());
        assert_eq!(report.stage, None);
        assert_eq!(report.phase, None);
        assert_eq!(report.chain.len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "CyclicDependencyError");
    }
}
