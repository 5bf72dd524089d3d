use std::sync::Arc;

use super::gateway::{GatewayError, GenerateContentRequest, ModelClient};
use super::{prompts, Answer};

const AFFIRMATIVE: &str = "yes";

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("the model gave no judgment")]
    EmptyResponse,
}

/// True when the reply contains the affirmative token as a whole word.
pub fn is_affirmative(reply: &str) -> bool {
    reply
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(AFFIRMATIVE))
}

/// Asks the model whether a typed answer matches the canonical one.
pub struct AnswerJudge {
    client: Arc<ModelClient>,
}

impl AnswerJudge {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub async fn judge(
        &self,
        question: &str,
        expected: &Answer,
        given: &[String],
    ) -> Result<bool, JudgeError> {
        let request =
            GenerateContentRequest::text(prompts::judgment_prompt(question, expected, given));
        let reply = self
            .client
            .generate_text(&request)
            .await?
            .ok_or(JudgeError::EmptyResponse)?;

        log::debug!("Judgment for {:?}: {:?}", given, reply.trim());
        Ok(is_affirmative(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::gateway::testing::{client, envelope, ScriptedGateway};

    fn answers(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn affirmative_token_detection() {
        assert!(is_affirmative("Yes."));
        assert!(is_affirmative("  yes, the answer is right"));
        assert!(!is_affirmative("No, the answer should be 42."));
        assert!(!is_affirmative("The eyes have it"));
        assert!(!is_affirmative(""));
    }

    #[tokio::test]
    async fn unconstrained_request_with_both_answers() {
        let gateway = ScriptedGateway::new(vec![Ok(envelope("Yes"))]);
        let judge = AnswerJudge::new(client(gateway.clone()));

        let correct = judge
            .judge(
                "Split 7 apples",
                &Answer::Multiple(answers(&["3", "4"])),
                &answers(&["3", "4"]),
            )
            .await
            .unwrap();
        assert!(correct);

        let requests = gateway.requests.lock();
        assert!(requests[0].generation_config.is_none());
        assert!(requests[0].instructions().contains("Correct answer: 3, 4"));
    }

    #[tokio::test]
    async fn negative_reply_is_incorrect() {
        let gateway = ScriptedGateway::new(vec![Ok(envelope("No."))]);
        let judge = AnswerJudge::new(client(gateway));
        let correct = judge
            .judge("6 x 7?", &Answer::Single("42".into()), &answers(&["41"]))
            .await
            .unwrap();
        assert!(!correct);
    }

    #[tokio::test]
    async fn empty_reply_is_an_error_not_a_wrong_answer() {
        let gateway = ScriptedGateway::new(vec![Ok("{}".to_string())]);
        let judge = AnswerJudge::new(client(gateway));
        let result = judge
            .judge("6 x 7?", &Answer::Single("42".into()), &answers(&["42"]))
            .await;
        assert!(matches!(result, Err(JudgeError::EmptyResponse)));
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_failure_is_surfaced() {
        let gateway = ScriptedGateway::new(vec![]);
        let judge = AnswerJudge::new(client(gateway.clone()));
        let result = judge
            .judge("6 x 7?", &Answer::Single("42".into()), &answers(&["42"]))
            .await;
        assert!(matches!(result, Err(JudgeError::Gateway(_))));
        assert_eq!(gateway.request_count(), 3);
    }
}
