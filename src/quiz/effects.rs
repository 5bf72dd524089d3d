//! Runs the commands produced by the session reducer and reports their results as events.

use std::sync::Arc;
use std::time::Duration;

use super::gateway::ModelClient;
use super::generator::{GenerationError, ProblemGenerator};
use super::judge::AnswerJudge;
use super::session::{Command, Event, GenerationRequest, JudgeRequest};
use super::validator::ProblemValidator;
use super::{Difficulty, ProblemSet, QuizContext};

/// What to do when the validator turns a generated set down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerationPolicy {
    pub delay: Duration,
    pub max_regenerations: u32,
}

impl Default for RegenerationPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            max_regenerations: 5,
        }
    }
}

pub struct QuizServices {
    generator: ProblemGenerator,
    validator: ProblemValidator,
    judge: AnswerJudge,
    regeneration: RegenerationPolicy,
}

impl QuizServices {
    pub fn new(client: Arc<ModelClient>, regeneration: RegenerationPolicy) -> Self {
        Self {
            generator: ProblemGenerator::new(client.clone()),
            validator: ProblemValidator::new(client.clone()),
            judge: AnswerJudge::new(client),
            regeneration,
        }
    }

    /// Generates a set and has it validated, regenerating with the same
    /// parameters after each rejection until the policy's bound is reached.
    pub async fn generate_verified(
        &self,
        context: &QuizContext,
        difficulty: Difficulty,
    ) -> Result<ProblemSet, GenerationError> {
        let mut rejections = 0;
        loop {
            let problems = self.generator.generate(context, difficulty).await?;
            if self.validator.verify(&problems, context, difficulty).await {
                return Ok(problems);
            }

            rejections += 1;
            if rejections > self.regeneration.max_regenerations {
                log::warn!(
                    "Giving up on {} / {} / {} at level {} after {} rejected sets",
                    context.subject,
                    context.grade,
                    context.genre,
                    difficulty,
                    rejections
                );
                return Err(GenerationError::Rejected {
                    attempts: rejections,
                });
            }

            log::warn!(
                "Generated problems were rejected, regenerating in {}ms...",
                self.regeneration.delay.as_millis()
            );
            tokio::time::sleep(self.regeneration.delay).await;
        }
    }

    async fn run_generation(&self, request: GenerationRequest) -> Event {
        log::info!(
            "Generating problems {}: {} / {} / {} at level {}",
            request.id,
            request.context.subject,
            request.context.grade,
            request.context.genre,
            request.difficulty
        );
        let outcome = self
            .generate_verified(&request.context, request.difficulty)
            .await;
        if let Err(e) = &outcome {
            log::error!("Problem generation {} failed: {}", request.id, e);
        }
        Event::GenerationFinished {
            request: request.id,
            outcome,
        }
    }

    async fn run_judgment(&self, request: JudgeRequest) -> Event {
        let outcome = self
            .judge
            .judge(&request.question, &request.expected, &request.given)
            .await;
        if let Err(e) = &outcome {
            log::error!("Answer judgment {} failed: {}", request.id, e);
        }
        Event::AnswerJudged {
            request: request.id,
            outcome,
        }
    }

    /// Runs a command to completion. The returned event goes back into the reducer.
    pub async fn execute(&self, command: Command) -> Event {
        match command {
            Command::Generate(request) => self.run_generation(request).await,
            Command::Judge(request) => self.run_judgment(request).await,
        }
    }
}
