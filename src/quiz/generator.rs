use std::sync::Arc;

use serde::Deserialize;

use super::gateway::{GatewayError, GenerateContentRequest, ModelClient};
use super::{
    prompts, Answer, AnswerFormat, Difficulty, Problem, ProblemSet, QuizContext,
    CHOICES_PER_PROBLEM, PROBLEMS_PER_SET,
};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("the model returned no content")]
    EmptyResponse,

    #[error("the model returned malformed problems: {0}")]
    MalformedResponse(String),

    #[error("generated problems were rejected {attempts} times in a row")]
    Rejected { attempts: u32 },
}

/// Problem as the model emits it, before the shape is checked.
#[derive(Debug, Deserialize)]
struct RawProblem {
    question: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    answer: RawAnswer,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Single(String),
    Multiple(Vec<String>),
}

fn malformed(message: impl Into<String>) -> GenerationError {
    GenerationError::MalformedResponse(message.into())
}

impl RawProblem {
    fn into_problem(self, format: AnswerFormat, index: usize) -> Result<Problem, GenerationError> {
        if self.question.trim().is_empty() {
            return Err(malformed(format!("problem {} has no question", index + 1)));
        }

        match format {
            AnswerFormat::Choice => {
                let options = self
                    .options
                    .ok_or_else(|| malformed(format!("problem {} has no options", index + 1)))?;
                if options.len() != CHOICES_PER_PROBLEM {
                    return Err(malformed(format!(
                        "problem {} has {} options, expected {}",
                        index + 1,
                        options.len(),
                        CHOICES_PER_PROBLEM
                    )));
                }
                let answer = match self.answer {
                    RawAnswer::Single(answer) => answer,
                    RawAnswer::Multiple(_) => {
                        return Err(malformed(format!(
                            "problem {} has several answers for a choice question",
                            index + 1
                        )))
                    }
                };
                if !options.iter().any(|o| o.trim() == answer.trim()) {
                    return Err(malformed(format!(
                        "answer of problem {} is not one of its options",
                        index + 1
                    )));
                }
                Ok(Problem::Choice {
                    question: self.question,
                    options,
                    answer,
                })
            }
            AnswerFormat::FreeText => {
                if self.options.is_some() {
                    return Err(malformed(format!(
                        "problem {} has options for a free-text question",
                        index + 1
                    )));
                }
                let answer = match self.answer {
                    RawAnswer::Single(answer) if !answer.trim().is_empty() => Answer::Single(answer),
                    RawAnswer::Multiple(parts)
                        if !parts.is_empty() && parts.iter().all(|p| !p.trim().is_empty()) =>
                    {
                        Answer::Multiple(parts)
                    }
                    _ => {
                        return Err(malformed(format!(
                            "problem {} has an empty answer",
                            index + 1
                        )))
                    }
                };
                Ok(Problem::FreeText {
                    question: self.question,
                    answer,
                })
            }
        }
    }
}

/// Turns the model's JSON text into a problem set for a subject with `format` answers.
pub fn parse_problem_set(text: &str, format: AnswerFormat) -> Result<ProblemSet, GenerationError> {
    let raw: Vec<RawProblem> =
        serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    if raw.len() != PROBLEMS_PER_SET {
        return Err(malformed(format!(
            "expected {} problems, got {}",
            PROBLEMS_PER_SET,
            raw.len()
        )));
    }

    let problems = raw
        .into_iter()
        .enumerate()
        .map(|(index, problem)| problem.into_problem(format, index))
        .collect::<Result<Vec<_>, _>>()?;

    ProblemSet::new(problems).ok_or_else(|| malformed("wrong number of problems"))
}

pub struct ProblemGenerator {
    client: Arc<ModelClient>,
}

impl ProblemGenerator {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        context: &QuizContext,
        difficulty: Difficulty,
    ) -> Result<ProblemSet, GenerationError> {
        let format = context.subject.answer_format();
        let request = GenerateContentRequest::structured(
            prompts::generation_prompt(context, difficulty),
            prompts::generation_schema(format),
        );

        let text = self
            .client
            .generate_text(&request)
            .await?
            .ok_or(GenerationError::EmptyResponse)?;

        parse_problem_set(&text, format)
    }
}
