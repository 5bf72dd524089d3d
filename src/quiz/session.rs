//! Quiz session controller.
//!
//! All state changes go through [`reduce`], a pure function from the current
//! [`SessionState`] and an [`Event`] to the next state plus the [`Command`]s
//! (network work) the caller has to run. Command results come back as events
//! tagged with the [`RequestId`] they were issued under; results whose id no
//! longer matches the pending request are dropped.

use std::fmt;

use super::generator::GenerationError;
use super::judge::JudgeError;
use super::{Answer, Difficulty, Genre, Grade, Problem, ProblemSet, QuizContext, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out request ids. Never reset, so ids stay unique across back-outs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RequestCounter(u64);

impl RequestCounter {
    fn next(&mut self) -> RequestId {
        self.0 += 1;
        RequestId(self.0)
    }
}

/// Message for the user about the last transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    GenerationFailed,
    IncompleteInput { expected: usize },
    Correct,
    Incorrect { answer: String },
    JudgeFailed,
    SetComplete { correct: usize, difficulty: Difficulty },
}

/// Progress through the active problem set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    problems: ProblemSet,
    index: usize,
    correct: usize,
    draft: Vec<String>,
}

impl Round {
    fn start(problems: ProblemSet) -> Self {
        let draft = vec![String::new(); problems[0].arity()];
        Self {
            problems,
            index: 0,
            correct: 0,
            draft,
        }
    }

    pub fn problems(&self) -> &ProblemSet {
        &self.problems
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn draft(&self) -> &[String] {
        &self.draft
    }

    pub fn problem(&self) -> &Problem {
        &self.problems[self.index]
    }

    fn next_problem(mut self) -> Self {
        self.index += 1;
        self.draft = vec![String::new(); self.problem().arity()];
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a generated and validated set.
    Generating { request: RequestId },
    /// The last generation failed; nothing to answer until a retry.
    Failed,
    /// `checking` is set while a free-text answer is being judged.
    InProblem {
        round: Round,
        checking: Option<RequestId>,
    },
    Answered { round: Round, correct: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub context: QuizContext,
    pub difficulty: Difficulty,
    pub phase: Phase,
    pub notice: Option<Notice>,
}

impl Quiz {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Generating { .. })
    }

    pub fn is_checking_answer(&self) -> bool {
        matches!(
            self.phase,
            Phase::InProblem {
                checking: Some(_),
                ..
            }
        )
    }

    pub fn round(&self) -> Option<&Round> {
        match &self.phase {
            Phase::InProblem { round, .. } | Phase::Answered { round, .. } => Some(round),
            Phase::Generating { .. } | Phase::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Unselected,
    SubjectChosen {
        subject: Subject,
    },
    GradeChosen {
        subject: Subject,
        grade: Grade,
    },
    Quiz(Quiz),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    stage: Stage,
    requests: RequestCounter,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.stage {
            Stage::Quiz(quiz) => Some(quiz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub context: QuizContext,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeRequest {
    pub id: RequestId,
    pub question: String,
    pub expected: Answer,
    pub given: Vec<String>,
}

/// Network work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate(GenerationRequest),
    Judge(JudgeRequest),
}

#[derive(Debug)]
pub enum Event {
    SelectSubject(Subject),
    SelectGrade(Grade),
    SelectGenre(Genre),
    GenerationFinished {
        request: RequestId,
        outcome: Result<ProblemSet, GenerationError>,
    },
    EditDraft {
        slot: usize,
        text: String,
    },
    SubmitChoice(String),
    SubmitDraft,
    AnswerJudged {
        request: RequestId,
        outcome: Result<bool, JudgeError>,
    },
    Advance,
    BumpUp,
    BumpDown,
    Retry,
    Back,
}

#[derive(Debug)]
pub struct Transition {
    pub state: SessionState,
    pub commands: Vec<Command>,
}

pub fn reduce(mut state: SessionState, event: Event) -> Transition {
    let mut commands = Vec::new();
    let stage = std::mem::take(&mut state.stage);

    state.stage = match (stage, event) {
        (_, Event::Back) => Stage::Unselected,
        (Stage::Unselected, Event::SelectSubject(subject)) => Stage::SubjectChosen { subject },
        (Stage::SubjectChosen { subject }, Event::SelectGrade(grade)) => {
            Stage::GradeChosen { subject, grade }
        }
        (Stage::GradeChosen { subject, grade }, Event::SelectGenre(genre)) => {
            let context = QuizContext {
                subject,
                grade,
                genre,
            };
            let (phase, command) = generate(&mut state.requests, &context, Difficulty::INITIAL);
            commands.push(command);
            Stage::Quiz(Quiz {
                context,
                difficulty: Difficulty::INITIAL,
                phase,
                notice: None,
            })
        }
        (Stage::Quiz(quiz), event) => {
            Stage::Quiz(reduce_quiz(&mut state.requests, quiz, event, &mut commands))
        }
        (stage, _) => stage,
    };

    Transition { state, commands }
}

fn generate(
    requests: &mut RequestCounter,
    context: &QuizContext,
    difficulty: Difficulty,
) -> (Phase, Command) {
    let id = requests.next();
    let command = Command::Generate(GenerationRequest {
        id,
        context: context.clone(),
        difficulty,
    });
    (Phase::Generating { request: id }, command)
}

fn regenerate(
    requests: &mut RequestCounter,
    mut quiz: Quiz,
    difficulty: Difficulty,
    notice: Option<Notice>,
    commands: &mut Vec<Command>,
) -> Quiz {
    let (phase, command) = generate(requests, &quiz.context, difficulty);
    commands.push(command);
    quiz.difficulty = difficulty;
    quiz.phase = phase;
    quiz.notice = notice;
    quiz
}

fn answered(mut round: Round, correct: bool) -> (Phase, Notice) {
    let notice = if correct {
        round.correct += 1;
        Notice::Correct
    } else {
        Notice::Incorrect {
            answer: round.problem().expected_answer(),
        }
    };
    (Phase::Answered { round, correct }, notice)
}

fn reduce_quiz(
    requests: &mut RequestCounter,
    mut quiz: Quiz,
    event: Event,
    commands: &mut Vec<Command>,
) -> Quiz {
    let phase = std::mem::replace(&mut quiz.phase, Phase::Failed);

    match (phase, event) {
        (Phase::Generating { request }, Event::GenerationFinished { request: id, outcome })
            if request == id =>
        {
            match outcome {
                Ok(problems) => {
                    quiz.phase = Phase::InProblem {
                        round: Round::start(problems),
                        checking: None,
                    };
                    quiz.notice = None;
                }
                Err(_) => {
                    quiz.phase = Phase::Failed;
                    quiz.notice = Some(Notice::GenerationFailed);
                }
            }
            quiz
        }

        (Phase::InProblem { mut round, checking: None }, Event::EditDraft { slot, text }) => {
            if let Some(entry) = round.draft.get_mut(slot) {
                *entry = text;
            }
            quiz.phase = Phase::InProblem {
                round,
                checking: None,
            };
            quiz
        }

        (Phase::InProblem { round, checking: None }, Event::SubmitChoice(selected)) => {
            let checked = round.problem().check_choice(&selected);
            match checked {
                Some(correct) => {
                    let (phase, notice) = answered(round, correct);
                    quiz.phase = phase;
                    quiz.notice = Some(notice);
                }
                None => {
                    quiz.phase = Phase::InProblem {
                        round,
                        checking: None,
                    }
                }
            }
            quiz
        }

        (Phase::InProblem { round, checking: None }, Event::SubmitDraft) => {
            let expected = match round.problem() {
                Problem::FreeText { answer, .. } => Some(answer.clone()),
                Problem::Choice { .. } => None,
            };
            let Some(expected) = expected else {
                quiz.phase = Phase::InProblem {
                    round,
                    checking: None,
                };
                return quiz;
            };

            let given: Vec<String> = round.draft.iter().map(|a| a.trim().to_string()).collect();
            if given.iter().any(String::is_empty) {
                quiz.notice = Some(Notice::IncompleteInput {
                    expected: given.len(),
                });
                quiz.phase = Phase::InProblem {
                    round,
                    checking: None,
                };
                return quiz;
            }

            let id = requests.next();
            commands.push(Command::Judge(JudgeRequest {
                id,
                question: round.problem().question().to_string(),
                expected,
                given,
            }));
            quiz.notice = None;
            quiz.phase = Phase::InProblem {
                round,
                checking: Some(id),
            };
            quiz
        }

        (
            Phase::InProblem {
                round,
                checking: Some(pending),
            },
            Event::AnswerJudged { request, outcome },
        ) if pending == request => {
            match outcome {
                Ok(correct) => {
                    let (phase, notice) = answered(round, correct);
                    quiz.phase = phase;
                    quiz.notice = Some(notice);
                }
                Err(_) => {
                    quiz.phase = Phase::InProblem {
                        round,
                        checking: None,
                    };
                    quiz.notice = Some(Notice::JudgeFailed);
                }
            }
            quiz
        }

        (Phase::Answered { round, .. }, Event::Advance) => {
            if round.problems.is_last(round.index) {
                let correct = round.correct;
                let difficulty = quiz.difficulty.after_set(correct, round.problems.len());
                regenerate(
                    requests,
                    quiz,
                    difficulty,
                    Some(Notice::SetComplete {
                        correct,
                        difficulty,
                    }),
                    commands,
                )
            } else {
                quiz.phase = Phase::InProblem {
                    round: round.next_problem(),
                    checking: None,
                };
                quiz.notice = None;
                quiz
            }
        }

        (_, Event::BumpUp) => {
            let difficulty = quiz.difficulty.raised();
            regenerate(requests, quiz, difficulty, None, commands)
        }

        (_, Event::BumpDown) => {
            let difficulty = quiz.difficulty.lowered();
            regenerate(requests, quiz, difficulty, None, commands)
        }

        (Phase::Failed, Event::Retry) => {
            let difficulty = quiz.difficulty;
            regenerate(requests, quiz, difficulty, None, commands)
        }

        // Stale results and events that do not apply here.
        (phase, _) => {
            quiz.phase = phase;
            quiz
        }
    }
}
