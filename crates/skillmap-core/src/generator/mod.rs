//! Plan generation through a language model.
//!
//! The [`SkillGenerator`] trait is the seam between the service layer and
//! whatever produces raw plans. [`LlmGenerator`] is the production
//! implementation: it prompts an OpenAI-compatible chat endpoint, pulls the
//! JSON out of the answer and, when configured to, substitutes a minimal
//! fallback plan if the model fails.

pub mod extract;
pub mod fallback;
pub mod llm;
pub mod prompt;
pub mod request;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub use llm::{ChatClient, LlmConfig, LlmError};
pub use prompt::PlanKind;
pub use request::{
    GenerationRequest, LearnerProfile, LearningPreferences, LearningStyle, SkillLevel,
    TimeAvailability,
};

/// Loosely-typed tree output: node id -> attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSkillTree {
    pub skills: Map<String, Value>,
}

/// Loosely-typed program output: entry id -> attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProgram {
    #[serde(default)]
    pub description: Option<String>,
    pub days: Map<String, Value>,
}

/// Produces raw plans for a request.
///
/// Object-safe so the service can hold an `Arc<dyn SkillGenerator>`.
#[async_trait]
pub trait SkillGenerator: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    async fn generate_hierarchy(&self, request: &GenerationRequest)
    -> Result<RawSkillTree, LlmError>;

    async fn generate_program(&self, request: &GenerationRequest) -> Result<RawProgram, LlmError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn SkillGenerator) {}
};

/// Generator backed by a chat-completion model.
pub struct LlmGenerator {
    client: ChatClient,
    /// Substitute a minimal plan instead of failing when the model errors
    /// or answers with something that is not the expected JSON.
    fallback: bool,
}

impl LlmGenerator {
    pub fn new(config: LlmConfig, fallback: bool) -> Result<Self, LlmError> {
        Ok(Self {
            client: ChatClient::new(config)?,
            fallback,
        })
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        request: &GenerationRequest,
        kind: PlanKind,
    ) -> Result<T, LlmError> {
        let system = prompt::build_system_prompt(kind);
        let user = prompt::build_user_prompt(request, kind);
        let answer = self.client.complete(&system, &user).await?;
        debug!(chars = answer.len(), ?kind, "model answered");
        parse_answer(&answer)
    }

    fn recover<T>(
        &self,
        result: Result<T, LlmError>,
        skill_name: &str,
        fallback: impl FnOnce(&str) -> T,
    ) -> Result<T, LlmError> {
        match result {
            Ok(plan) => Ok(plan),
            Err(e) if self.fallback => {
                warn!(error = %e, skill = skill_name, "generation failed, using fallback plan");
                Ok(fallback(skill_name))
            }
            Err(e) => Err(e),
        }
    }
}

/// Extract and deserialize the JSON payload of a model answer.
pub fn parse_answer<T: DeserializeOwned>(answer: &str) -> Result<T, LlmError> {
    let json = extract::extract_json(answer);
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl SkillGenerator for LlmGenerator {
    fn name(&self) -> &str {
        self.client.model()
    }

    async fn generate_hierarchy(
        &self,
        request: &GenerationRequest,
    ) -> Result<RawSkillTree, LlmError> {
        info!(skill = %request.skill_name, model = self.name(), "generating skill hierarchy");
        let result = self.ask(request, PlanKind::Hierarchy).await;
        self.recover(result, &request.skill_name, fallback::fallback_hierarchy)
    }

    async fn generate_program(&self, request: &GenerationRequest) -> Result<RawProgram, LlmError> {
        info!(skill = %request.skill_name, model = self.name(), "generating 30-day program");
        let result = self.ask(request, PlanKind::Program).await;
        self.recover(result, &request.skill_name, fallback::fallback_program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(fallback: bool) -> LlmGenerator {
        LlmGenerator::new(LlmConfig::default(), fallback).unwrap()
    }

    #[test]
    fn parse_answer_reads_fenced_tree() {
        let answer = "Final Answer:\n```json\n{\"skills\": {\"root\": {\"name\": \"Go\"}}}\n```";
        let tree: RawSkillTree = parse_answer(answer).unwrap();
        assert_eq!(tree.skills["root"]["name"], "Go");
    }

    #[test]
    fn parse_answer_rejects_wrong_shape() {
        let result: Result<RawSkillTree, _> = parse_answer("{\"nodes\": {}}");
        assert!(matches!(result, Err(LlmError::Json(_))));
    }

    #[test]
    fn program_description_is_optional() {
        let program: RawProgram = parse_answer("{\"days\": {}}").unwrap();
        assert!(program.description.is_none());
    }

    #[test]
    fn recover_uses_fallback_when_enabled() {
        let failed: Result<RawSkillTree, LlmError> =
            Err(LlmError::InvalidResponse("nope".to_string()));
        let tree = generator(true)
            .recover(failed, "Go", fallback::fallback_hierarchy)
            .unwrap();
        assert_eq!(tree.skills.len(), 2);
    }

    #[test]
    fn recover_propagates_when_disabled() {
        let failed: Result<RawProgram, LlmError> = Err(LlmError::ApiError {
            status: 401,
            message: "bad key".to_string(),
        });
        let result = generator(false).recover(failed, "Go", fallback::fallback_program);
        assert!(matches!(result, Err(LlmError::ApiError { status: 401, .. })));
    }

    #[test]
    fn generator_name_is_model() {
        assert_eq!(generator(true).name(), LlmConfig::DEFAULT_MODEL);
    }
}
