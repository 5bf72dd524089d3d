use std::sync::Arc;

use serde::Deserialize;

use super::gateway::{GenerateContentRequest, ModelClient};
use super::{prompts, Difficulty, ProblemSet, QuizContext};

#[derive(Debug, Deserialize)]
struct Verdict {
    is_reasonable: bool,
}

/// Second opinion from the model on whether a generated set is fit to show.
pub struct ProblemValidator {
    client: Arc<ModelClient>,
}

impl ProblemValidator {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    /// Fails closed: anything other than an explicit approval is a rejection.
    pub async fn verify(
        &self,
        problems: &ProblemSet,
        context: &QuizContext,
        difficulty: Difficulty,
    ) -> bool {
        let request = GenerateContentRequest::structured(
            prompts::validation_prompt(problems, context, difficulty),
            prompts::validation_schema(),
        );

        let text = match self.client.generate_text(&request).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                log::warn!("Problem validation returned no content");
                return false;
            }
            Err(e) => {
                log::warn!("Problem validation failed: {}", e);
                return false;
            }
        };

        match serde_json::from_str::<Verdict>(&text) {
            Ok(verdict) => verdict.is_reasonable,
            Err(e) => {
                log::warn!("Unreadable validation verdict {:?}: {}", text, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::*;
    use crate::quiz::gateway::testing::{client, envelope, ScriptedGateway};
    use crate::quiz::gateway::GatewayError;

    async fn verdict_for(reply: Result<String, GatewayError>) -> bool {
        // A single scripted reply; further attempts hit the exhausted script.
        let gateway = ScriptedGateway::new(vec![reply]);
        ProblemValidator::new(client(gateway))
            .verify(&math_set(), &math_context(), Difficulty::INITIAL)
            .await
    }

    #[tokio::test]
    async fn accepts_explicit_approval() {
        assert!(verdict_for(Ok(envelope(r#"{"is_reasonable": true}"#))).await);
    }

    #[tokio::test]
    async fn rejects_explicit_rejection() {
        assert!(!verdict_for(Ok(envelope(r#"{"is_reasonable": false}"#))).await);
    }

    #[tokio::test]
    async fn unreadable_replies_fail_closed() {
        assert!(!verdict_for(Ok(envelope("looks fine to me"))).await);
        assert!(!verdict_for(Ok(envelope("{}"))).await);
        assert!(!verdict_for(Ok("{}".to_string())).await);
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_errors_fail_closed() {
        assert!(!verdict_for(Err(GatewayError::Network("down".to_string()))).await);
    }

    #[tokio::test]
    async fn sends_problem_set_with_boolean_schema() {
        let gateway = ScriptedGateway::new(vec![Ok(envelope(r#"{"is_reasonable": true}"#))]);
        ProblemValidator::new(client(gateway.clone()))
            .verify(&math_set(), &math_context(), Difficulty::new(4))
            .await;

        let requests = gateway.requests.lock();
        let request = &requests[0];
        assert!(request.instructions().contains("What is 81 / 9?"));
        let schema = &request.generation_config.as_ref().unwrap().response_schema;
        assert_eq!(schema["properties"]["is_reasonable"]["type"], "BOOLEAN");
    }
}
