//! Instructions and response schemas sent to the model.

use serde_json::{json, Value};

use super::{
    Answer, AnswerFormat, Difficulty, Grade, ProblemSet, QuizContext, Subject, CHOICES_PER_PROBLEM,
    PROBLEMS_PER_SET,
};

/// Content guidance for each level 1..=5 of a subject.
fn rubric(subject: Subject, grade: Grade) -> [&'static str; 5] {
    match subject {
        Subject::LanguageArts | Subject::SocialStudies => [
            "simple terms and words, basic reading of short words",
            "slightly harder terms, compound words, simple grammar, the local area",
            "proverbs, idioms, transportation, national industries",
            "reading comprehension of stories, national history, how government works",
            "reading poems and essays, complex current events, international issues",
        ],
        Subject::Math if grade.is_junior_high() => [
            "positive and negative numbers, algebraic expressions, linear equations",
            "simultaneous equations, linear functions, parallel lines and angles",
            "expanding polynomials, factorization, quadratic equations, geometric proofs",
            "quadratic functions, the inscribed angle theorem, the Pythagorean theorem",
            "complex applied problems at entrance-exam level",
        ],
        Subject::Math => [
            "simple addition and subtraction",
            "harder addition and subtraction, simple multiplication",
            "two-digit multiplication, simple division",
            "harder division, fractions",
            "complex word problems, geometry problems",
        ],
        Subject::Science => [
            "naming everyday plants, animals and objects",
            "simple observations and properties of materials",
            "cause and effect in familiar phenomena",
            "experiments with several variables, explaining results",
            "multi-step reasoning combining several topics",
        ],
        Subject::English => [
            "single words and greetings",
            "short phrases and basic sentence patterns",
            "simple sentences about daily life",
            "short dialogues and paragraphs",
            "longer passages and free composition",
        ],
    }
}

fn rubric_lines(subject: Subject, grade: Grade) -> String {
    rubric(subject, grade)
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Level {}: {}.", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn subject_rules(subject: Subject) -> String {
    match subject {
        Subject::LanguageArts | Subject::SocialStudies => format!(
            "Give each problem exactly {} options and an answer whose text is identical to one of the options.",
            CHOICES_PER_PROBLEM
        ),
        Subject::Math => "Make them word problems. At least one problem must need several answers. \
            Each answer is either a string or an array of strings."
            .to_string(),
        Subject::Science => "Mix several sub-genres. At least one problem must need several answers. \
            Each answer is either a string or an array of strings."
            .to_string(),
        Subject::English => "Mix several sub-genres. At least one problem must need several answers. \
            Each answer is either a string or an array of strings. \
            State the required answer format inside every question, for example \
            \"Answer in 3 words starting with I.\" or \"Answer in 5 words.\""
            .to_string(),
    }
}

pub fn generation_prompt(context: &QuizContext, difficulty: Difficulty) -> String {
    format!(
        "Create {count} {subject} problems for a {grade} student.\n\
         The genre is \"{genre}\".\n\
         {rules}\n\
         The difficulty level is {level}.\n\
         {rubric}\n\
         Return the problems and their answers as JSON.",
        count = PROBLEMS_PER_SET,
        subject = context.subject,
        grade = context.grade.describe(),
        genre = context.genre,
        rules = subject_rules(context.subject),
        level = difficulty.level(),
        rubric = rubric_lines(context.subject, context.grade),
    )
}

pub fn generation_schema(format: AnswerFormat) -> Value {
    let item = match format {
        AnswerFormat::Choice => json!({
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                "answer": { "type": "STRING" }
            },
            "required": ["question", "options", "answer"],
            "propertyOrdering": ["question", "options", "answer"]
        }),
        AnswerFormat::FreeText => json!({
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "answer": {
                    "anyOf": [
                        { "type": "STRING" },
                        { "type": "ARRAY", "items": { "type": "STRING" } }
                    ]
                }
            },
            "required": ["question", "answer"],
            "propertyOrdering": ["question", "answer"]
        }),
    };
    json!({ "type": "ARRAY", "items": item })
}

pub fn validation_prompt(
    problems: &ProblemSet,
    context: &QuizContext,
    difficulty: Difficulty,
) -> String {
    let rendered = serde_json::to_string_pretty(problems).unwrap_or_default();
    format!(
        "Evaluate whether the following problems and answers suit a {grade} student studying {subject}, \
         match difficulty level {level}, and have correct answers.\n\n\
         Problems:\n{rendered}\n\n\
         Reply as JSON: {{ \"is_reasonable\": true }} if they are appropriate, \
         {{ \"is_reasonable\": false }} otherwise.",
        grade = context.grade.describe(),
        subject = context.subject,
        level = difficulty.level(),
        rendered = rendered,
    )
}

pub fn validation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": { "is_reasonable": { "type": "BOOLEAN" } },
        "propertyOrdering": ["is_reasonable"]
    })
}

pub fn judgment_prompt(question: &str, expected: &Answer, given: &[String]) -> String {
    format!(
        "Problem: {}\nCorrect answer: {}\nStudent's answer: {}\n\n\
         Is the student's answer correct? Reply with yes or no.",
        question,
        expected.joined(),
        given.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::*;
    use crate::quiz::Genre;

    #[test]
    fn generation_prompt_carries_context_and_level() {
        let prompt = generation_prompt(&math_context(), Difficulty::new(3));
        assert!(prompt.contains("3rd-grade elementary school"));
        assert!(prompt.contains("\"Word problems\""));
        assert!(prompt.contains("difficulty level is 3"));
        assert!(prompt.contains("Level 3: two-digit multiplication"));
        assert!(prompt.contains("several answers"));
    }

    #[test]
    fn junior_high_math_uses_its_own_rubric() {
        let context = QuizContext {
            grade: Grade::JuniorHigh(2),
            ..math_context()
        };
        let prompt = generation_prompt(&context, Difficulty::new(4));
        assert!(prompt.contains("Pythagorean"));
        assert!(!prompt.contains("simple addition"));
    }

    #[test]
    fn english_requires_format_instruction() {
        let context = QuizContext {
            subject: Subject::English,
            grade: Grade::Elementary(6),
            genre: Genre::new("Conversation"),
        };
        assert!(generation_prompt(&context, Difficulty::INITIAL).contains("required answer format"));
        assert!(!generation_prompt(&math_context(), Difficulty::INITIAL).contains("required answer format"));
    }

    #[test]
    fn choice_prompt_demands_four_options() {
        let prompt = generation_prompt(&social_context(), Difficulty::new(1));
        assert!(prompt.contains("exactly 4 options"));
    }

    #[test]
    fn schemas_declare_expected_fields() {
        let choice = generation_schema(AnswerFormat::Choice);
        assert_eq!(choice["type"], "ARRAY");
        assert!(choice["items"]["properties"].get("options").is_some());

        let free = generation_schema(AnswerFormat::FreeText);
        assert!(free["items"]["properties"].get("options").is_none());
        assert_eq!(free["items"]["properties"]["answer"]["anyOf"][1]["type"], "ARRAY");

        assert_eq!(validation_schema()["properties"]["is_reasonable"]["type"], "BOOLEAN");
    }

    #[test]
    fn judgment_prompt_joins_parts() {
        let prompt = judgment_prompt(
            "Split 7 apples",
            &Answer::Multiple(vec!["3".into(), "4".into()]),
            &["3".to_string(), "4".to_string()],
        );
        assert!(prompt.contains("Correct answer: 3, 4"));
        assert!(prompt.contains("Student's answer: 3, 4"));
        assert!(prompt.contains("yes or no"));
    }

    #[test]
    fn validation_prompt_embeds_problems() {
        let prompt = validation_prompt(&math_set(), &math_context(), Difficulty::new(2));
        assert!(prompt.contains("What is 6 x 7?"));
        assert!(prompt.contains("difficulty level 2"));
        assert!(prompt.contains("is_reasonable"));
    }
}
