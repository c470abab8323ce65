use crate::decision::parse::{parse_text, parse_typed, ParseFailure};
use crate::decision::prompts::{instructions, ToolSelection};
use crate::decision::{Decider, DecisionFailure, DecisionKind, DecisionPayload};
use crate::llm::LLMClient;
use crate::tools::registry::CapabilityInfo;
use crate::types::{GapEvaluation, ReportPlan, WrittenSection};
use async_trait::async_trait;
use std::sync::Arc;

const MAX_GAPS: usize = 3;

/// Which model answers which decision.
///
/// Planning goes to the reasoning model, long-form writing to the main model
/// and the per-iteration decisions to the fast model.
#[derive(Clone)]
pub struct ModelTiers {
    pub reasoning: Arc<dyn LLMClient>,
    pub main: Arc<dyn LLMClient>,
    pub fast: Arc<dyn LLMClient>,
}

impl ModelTiers {
    /// Use one model for every decision.
    pub fn single(client: Arc<dyn LLMClient>) -> Self {
        Self {
            reasoning: client.clone(),
            main: client.clone(),
            fast: client,
        }
    }

    fn for_kind(&self, kind: DecisionKind) -> &Arc<dyn LLMClient> {
        match kind {
            DecisionKind::Plan => &self.reasoning,
            DecisionKind::Synthesis | DecisionKind::SectionWrite => &self.main,
            DecisionKind::Reflection | DecisionKind::GapEvaluation | DecisionKind::ToolSelection => {
                &self.fast
            }
        }
    }
}

/// Decider that prompts a language model and parses its answer.
pub struct LlmDecider {
    models: ModelTiers,
    capabilities: Vec<CapabilityInfo>,
    max_tasks: usize,
}

impl LlmDecider {
    pub fn new(models: ModelTiers, capabilities: Vec<CapabilityInfo>, max_tasks: usize) -> Self {
        Self {
            models,
            capabilities,
            max_tasks,
        }
    }

    fn parse(kind: DecisionKind, output: &str) -> Result<DecisionPayload, ParseFailure> {
        Ok(match kind {
            DecisionKind::Plan => DecisionPayload::Plan(parse_typed::<ReportPlan>(output)?),
            DecisionKind::Reflection => DecisionPayload::Reflection(parse_text(output)?),
            DecisionKind::GapEvaluation => {
                let mut evaluation = parse_typed::<GapEvaluation>(output)?;
                evaluation.outstanding_gaps.retain(|gap| !gap.trim().is_empty());
                evaluation.outstanding_gaps.truncate(MAX_GAPS);
                DecisionPayload::Gaps(evaluation)
            }
            DecisionKind::ToolSelection => {
                DecisionPayload::Tasks(parse_typed::<ToolSelection>(output)?.tasks)
            }
            DecisionKind::Synthesis => DecisionPayload::Synthesis(parse_text(output)?),
            DecisionKind::SectionWrite => {
                DecisionPayload::Section(parse_typed::<WrittenSection>(output)?)
            }
        })
    }
}

#[async_trait]
impl Decider for LlmDecider {
    async fn decide(
        &self,
        context: &str,
        kind: DecisionKind,
    ) -> Result<DecisionPayload, DecisionFailure> {
        let system = instructions(kind, &self.capabilities, self.max_tasks);
        tracing::debug!(decision = %kind, "Requesting decision:\n{}", context);

        let output = self
            .models
            .for_kind(kind)
            .generate_with_system(&system, context)
            .await
            .map_err(|e| DecisionFailure::Unavailable {
                kind,
                message: e.to_string(),
            })?;

        Self::parse(kind, &output).map_err(|source| {
            tracing::warn!(decision = %kind, "Failed to parse decision: {}", source);
            DecisionFailure::Parse { kind, source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLLMClient;
    use crate::types::AppError;

    fn decider_returning(output: &'static str) -> LlmDecider {
        let mut mock = MockLLMClient::new();
        mock.expect_generate_with_system()
            .returning(move |_, _| Ok(output.to_string()));
        LlmDecider::new(ModelTiers::single(Arc::new(mock)), vec![], 3)
    }

    #[tokio::test]
    async fn test_gap_evaluation_truncates_to_three() {
        let decider = decider_returning(
            r#"{"research_complete": false, "outstanding_gaps": ["a", "", "b", "c", "d"]}"#,
        );
        let payload = decider
            .decide("ctx", DecisionKind::GapEvaluation)
            .await
            .unwrap();
        match payload {
            DecisionPayload::Gaps(evaluation) => {
                assert!(!evaluation.research_complete);
                assert_eq!(evaluation.outstanding_gaps, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_selection_parses_tasks() {
        let decider = decider_returning(
            "```json\n{\"tasks\": [{\"capability\": \"web_search\", \"query\": \"tokio runtime\"}]}\n```",
        );
        let payload = decider
            .decide("ctx", DecisionKind::ToolSelection)
            .await
            .unwrap();
        assert_eq!(
            payload,
            DecisionPayload::Tasks(vec![crate::types::CapabilityTask::new(
                "web_search",
                "tokio runtime"
            )])
        );
    }

    #[tokio::test]
    async fn test_unparseable_output_is_parse_failure() {
        let decider = decider_returning("I think the research is done.");
        let err = decider
            .decide("ctx", DecisionKind::GapEvaluation)
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[tokio::test]
    async fn test_llm_error_is_unavailable() {
        let mut mock = MockLLMClient::new();
        mock.expect_generate_with_system()
            .returning(|_, _| Err(AppError::LLM("connection refused".to_string())));
        let decider = LlmDecider::new(ModelTiers::single(Arc::new(mock)), vec![], 3);

        let err = decider.decide("ctx", DecisionKind::Plan).await.unwrap_err();
        assert!(matches!(
            err,
            DecisionFailure::Unavailable {
                kind: DecisionKind::Plan,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_plan_goes_to_reasoning_model() {
        let mut reasoning = MockLLMClient::new();
        reasoning.expect_generate_with_system().times(1).returning(|_, _| {
            Ok(r#"{"background_context": "", "report_outline": [{"title": "Intro", "key_question": "What?"}], "report_title": "T"}"#.to_string())
        });
        let mut other = MockLLMClient::new();
        other.expect_generate_with_system().never();
        let other: Arc<dyn LLMClient> = Arc::new(other);

        let models = ModelTiers {
            reasoning: Arc::new(reasoning),
            main: other.clone(),
            fast: other,
        };
        let decider = LlmDecider::new(models, vec![], 3);
        let payload = decider.decide("QUERY: x", DecisionKind::Plan).await.unwrap();
        match payload {
            DecisionPayload::Plan(plan) => {
                assert_eq!(plan.report_title, "T");
                assert_eq!(plan.report_outline.len(), 1);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_reflection_is_parse_failure() {
        let decider = decider_returning("   ");
        let err = decider
            .decide("ctx", DecisionKind::Reflection)
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }
}
