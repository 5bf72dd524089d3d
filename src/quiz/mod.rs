pub mod effects;
pub mod gateway;
pub mod generator;
pub mod judge;
pub mod prompts;
pub mod retry;
pub mod session;
pub mod validator;

use std::fmt;

/// Problems are generated, answered and scored in batches of this size.
pub const PROBLEMS_PER_SET: usize = 3;
pub const CHOICES_PER_PROBLEM: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    LanguageArts,
    Math,
    Science,
    SocialStudies,
    English,
}

/// How answers to a subject's problems are given and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    /// Four options, checked locally.
    Choice,
    /// Typed answer (possibly several parts), judged by the model.
    FreeText,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::LanguageArts,
        Subject::Math,
        Subject::Science,
        Subject::SocialStudies,
        Subject::English,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Subject::LanguageArts => "Language Arts",
            Subject::Math => "Math",
            Subject::Science => "Science",
            Subject::SocialStudies => "Social Studies",
            Subject::English => "English",
        }
    }

    pub fn answer_format(&self) -> AnswerFormat {
        match self {
            Subject::LanguageArts | Subject::SocialStudies => AnswerFormat::Choice,
            Subject::Math | Subject::Science | Subject::English => AnswerFormat::FreeText,
        }
    }

    pub fn genres(&self) -> &'static [&'static str] {
        match self {
            Subject::LanguageArts => &[
                "Stories",
                "Explanatory texts",
                "Poetry",
                "Grammar & vocabulary",
                "Kanji & phrases",
            ],
            Subject::Math => &[
                "Calculation",
                "Word problems",
                "Geometry",
                "Functions",
                "Probability & statistics",
            ],
            Subject::Science => &["Biology", "Chemistry", "Physics", "Earth science"],
            Subject::SocialStudies => &["Geography", "History", "Politics", "Economics", "Culture"],
            Subject::English => &["Vocabulary & grammar", "Conversation", "Listening", "Reading"],
        }
    }

    pub fn from_label(label: &str) -> Option<Subject> {
        Subject::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    /// Years 1 to 6.
    Elementary(u8),
    /// Years 1 to 3.
    JuniorHigh(u8),
}

impl Grade {
    pub const ALL: [Grade; 9] = [
        Grade::Elementary(1),
        Grade::Elementary(2),
        Grade::Elementary(3),
        Grade::Elementary(4),
        Grade::Elementary(5),
        Grade::Elementary(6),
        Grade::JuniorHigh(1),
        Grade::JuniorHigh(2),
        Grade::JuniorHigh(3),
    ];

    pub fn label(&self) -> String {
        match self {
            Grade::Elementary(year) => format!("Grade {}", year),
            Grade::JuniorHigh(year) => format!("JHS {}", year),
        }
    }

    /// Wording used inside model instructions, e.g. "3rd-grade elementary school".
    pub fn describe(&self) -> String {
        match self {
            Grade::Elementary(year) => format!("{}-grade elementary school", ordinal(*year)),
            Grade::JuniorHigh(year) => format!("{}-year junior high school", ordinal(*year)),
        }
    }

    pub fn is_junior_high(&self) -> bool {
        matches!(self, Grade::JuniorHigh(_))
    }

    pub fn from_label(label: &str) -> Option<Grade> {
        Grade::ALL.into_iter().find(|g| g.label() == label)
    }
}

fn ordinal(n: u8) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genre(String);

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Looks the label up among the genres offered for `subject`.
    pub fn for_subject(subject: Subject, label: &str) -> Option<Genre> {
        subject
            .genres()
            .iter()
            .find(|g| **g == label)
            .map(|g| Genre::new(*g))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The selection a quiz run is generated for. Fixed for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizContext {
    pub subject: Subject,
    pub grade: Grade,
    pub genre: Genre,
}

/// Content complexity level, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const INITIAL: Difficulty = Difficulty(3);

    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn raised(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    pub fn lowered(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }

    /// Level for the next set: up one after a perfect set, down one otherwise.
    pub fn after_set(self, correct: usize, total: usize) -> Self {
        if correct == total {
            self.raised()
        } else {
            self.lowered()
        }
    }

    pub fn stars(self) -> String {
        let filled = "★".repeat(self.0 as usize);
        let empty = "☆".repeat((Self::MAX - self.0) as usize);
        format!("{}{}", filled, empty)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical answer of a free-text problem.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multiple(Vec<String>),
}

impl Answer {
    /// Number of separate inputs the user has to fill in.
    pub fn arity(&self) -> usize {
        match self {
            Answer::Single(_) => 1,
            Answer::Multiple(parts) => parts.len(),
        }
    }

    pub fn parts(&self) -> Vec<&str> {
        match self {
            Answer::Single(answer) => vec![answer.as_str()],
            Answer::Multiple(parts) => parts.iter().map(String::as_str).collect(),
        }
    }

    pub fn joined(&self) -> String {
        self.parts().join(", ")
    }
}

/// A generated problem. Serializes back to the same JSON shape the model produced.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Problem {
    Choice {
        question: String,
        options: Vec<String>,
        answer: String,
    },
    FreeText {
        question: String,
        answer: Answer,
    },
}

impl Problem {
    pub fn question(&self) -> &str {
        match self {
            Problem::Choice { question, .. } | Problem::FreeText { question, .. } => question,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Problem::Choice { .. } => 1,
            Problem::FreeText { answer, .. } => answer.arity(),
        }
    }

    pub fn expected_answer(&self) -> String {
        match self {
            Problem::Choice { answer, .. } => answer.clone(),
            Problem::FreeText { answer, .. } => answer.joined(),
        }
    }

    /// Trimmed, case-sensitive comparison against the correct option.
    /// `None` for free-text problems, which cannot be checked locally.
    pub fn check_choice(&self, selected: &str) -> Option<bool> {
        match self {
            Problem::Choice { answer, .. } => Some(selected.trim() == answer.trim()),
            Problem::FreeText { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ProblemSet(Vec<Problem>);

impl ProblemSet {
    /// Accepts exactly `PROBLEMS_PER_SET` problems.
    pub fn new(problems: Vec<Problem>) -> Option<Self> {
        (problems.len() == PROBLEMS_PER_SET).then_some(Self(problems))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.0.len()
    }
}

impl std::ops::Index<usize> for ProblemSet {
    type Output = Problem;

    fn index(&self, index: usize) -> &Problem {
        &self.0[index]
    }
}
