//! Chat rendering of the session and interpretation of the user's replies.

use crate::quiz::session::{Event, Notice, Phase, Quiz, SessionState, Stage};
use crate::quiz::{Difficulty, Genre, Grade, Problem, Subject, PROBLEMS_PER_SET};

pub const BACK: &str = "⬅️ Back";
pub const NEXT: &str = "➡️ Next problem";
pub const HARDER: &str = "🔼 Harder";
pub const EASIER: &str = "🔽 Easier";
pub const RETRY: &str = "🔁 Try again";

pub const GREETING: &str = "Hi! I'm a study drill bot. I make practice problems that get harder as you improve. Pick a subject to begin!";
pub const UNRECOGNIZED: &str = "Please use the buttons below.";

/// A message to send: text plus reply keyboard rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub buttons: Vec<Vec<String>>,
}

fn rows<I, S>(labels: I, per_row: usize) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
    labels.chunks(per_row).map(|chunk| chunk.to_vec()).collect()
}

/// Extra buttons, then the difficulty row and Back. Easier and Harder are
/// left out at the bottom and top level.
fn controls(extra: &[&str], difficulty: Difficulty) -> Vec<Vec<String>> {
    let mut buttons: Vec<Vec<String>> = extra.iter().map(|label| vec![label.to_string()]).collect();
    let bumps: Vec<String> = [
        (difficulty.level() > Difficulty::MIN).then_some(EASIER),
        (difficulty.level() < Difficulty::MAX).then_some(HARDER),
    ]
    .into_iter()
    .flatten()
    .map(str::to_string)
    .collect();
    buttons.push(bumps);
    buttons.push(vec![BACK.to_string()]);
    buttons
}

pub fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::GenerationFailed => {
            "Something went wrong while creating problems. Please try again.".to_string()
        }
        Notice::IncompleteInput { expected: 1 } => "Please type your answer.".to_string(),
        Notice::IncompleteInput { expected } => {
            format!("Please fill in all {} answers, one per line.", expected)
        }
        Notice::Correct => "Correct!".to_string(),
        Notice::Incorrect { answer } => format!("Not quite! The answer was \"{}\".", answer),
        Notice::JudgeFailed => {
            "Something went wrong while checking your answer. Please send it again.".to_string()
        }
        Notice::SetComplete {
            correct,
            difficulty,
        } => format!(
            "That's all {} problems: {} correct. Next difficulty: {}",
            PROBLEMS_PER_SET,
            correct,
            difficulty.stars()
        ),
    }
}

fn answer_hint(problem: &Problem) -> String {
    match problem.arity() {
        1 => "Type your answer.".to_string(),
        n => format!("Type your {} answers, one per line.", n),
    }
}

fn render_quiz(quiz: &Quiz) -> Screen {
    let mut lines = vec![
        format!(
            "{} {} drill: {}",
            quiz.context.grade, quiz.context.subject, quiz.context.genre
        ),
        format!("Difficulty: {}", quiz.difficulty.stars()),
        String::new(),
    ];
    if let Some(notice) = &quiz.notice {
        lines.push(notice_text(notice));
        lines.push(String::new());
    }

    let buttons = match &quiz.phase {
        Phase::Generating { .. } => {
            lines.push("Creating new problems...".to_string());
            controls(&[], quiz.difficulty)
        }
        Phase::Failed => {
            lines.push("Could not get problems.".to_string());
            controls(&[RETRY], quiz.difficulty)
        }
        Phase::InProblem { round, .. } => {
            let problem = round.problem();
            lines.push(format!(
                "Problem {} / {}:",
                round.index() + 1,
                round.problems().len()
            ));
            lines.push(problem.question().to_string());
            match problem {
                _ if quiz.is_checking_answer() => {
                    lines.push(String::new());
                    lines.push("Checking your answer...".to_string());
                    controls(&[], quiz.difficulty)
                }
                Problem::Choice { options, .. } => {
                    let mut buttons = rows(options.iter().cloned(), 1);
                    buttons.extend(controls(&[], quiz.difficulty));
                    buttons
                }
                Problem::FreeText { .. } => {
                    lines.push(String::new());
                    lines.push(answer_hint(problem));
                    controls(&[], quiz.difficulty)
                }
            }
        }
        Phase::Answered { round, .. } => {
            lines.push(format!(
                "Problem {} / {} answered ({} correct so far).",
                round.index() + 1,
                round.problems().len(),
                round.correct()
            ));
            controls(&[NEXT], quiz.difficulty)
        }
    };

    Screen {
        text: lines.join("\n").trim_end().to_string(),
        buttons,
    }
}

pub fn render(state: &SessionState) -> Screen {
    match state.stage() {
        Stage::Unselected => Screen {
            text: GREETING.to_string(),
            buttons: rows(Subject::ALL.iter().map(|s| s.label()), 2),
        },
        Stage::SubjectChosen { subject } => {
            let mut buttons = rows(Grade::ALL.iter().map(|g| g.label()), 3);
            buttons.push(vec![BACK.to_string()]);
            Screen {
                text: format!("{}: choose your grade.", subject),
                buttons,
            }
        }
        Stage::GradeChosen { subject, grade } => {
            let mut buttons = rows(subject.genres().iter().copied(), 2);
            buttons.push(vec![BACK.to_string()]);
            Screen {
                text: format!("{}, {}: choose a genre.", subject, grade),
                buttons,
            }
        }
        Stage::Quiz(quiz) => render_quiz(quiz),
    }
}

/// Maps a reply to the events it stands for in the current state.
/// An empty result means the reply was not understood.
pub fn interpret(state: &SessionState, text: &str) -> Vec<Event> {
    let text = text.trim();
    if text == BACK {
        return vec![Event::Back];
    }

    match state.stage() {
        Stage::Unselected => Subject::from_label(text)
            .map(Event::SelectSubject)
            .into_iter()
            .collect(),
        Stage::SubjectChosen { .. } => Grade::from_label(text)
            .map(Event::SelectGrade)
            .into_iter()
            .collect(),
        Stage::GradeChosen { subject, .. } => Genre::for_subject(*subject, text)
            .map(Event::SelectGenre)
            .into_iter()
            .collect(),
        Stage::Quiz(quiz) => interpret_quiz(quiz, text),
    }
}

fn interpret_quiz(quiz: &Quiz, text: &str) -> Vec<Event> {
    let level = quiz.difficulty.level();
    match text {
        HARDER if level < Difficulty::MAX => return vec![Event::BumpUp],
        EASIER if level > Difficulty::MIN => return vec![Event::BumpDown],
        HARDER | EASIER => return Vec::new(),
        RETRY => return vec![Event::Retry],
        NEXT => return vec![Event::Advance],
        _ => {}
    }

    let round = match &quiz.phase {
        Phase::InProblem {
            round,
            checking: None,
        } => round,
        _ => return Vec::new(),
    };

    match round.problem() {
        Problem::Choice { options, .. } => {
            if options.iter().any(|o| o.trim() == text) {
                vec![Event::SubmitChoice(text.to_string())]
            } else {
                Vec::new()
            }
        }
        Problem::FreeText { .. } => {
            let slots = round.draft().len();
            let mut events: Vec<Event> = if slots == 1 {
                vec![Event::EditDraft {
                    slot: 0,
                    text: text.to_string(),
                }]
            } else {
                let mut lines: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
                // Surplus lines stay with the last answer.
                if lines.len() > slots {
                    let rest = lines.split_off(slots - 1);
                    lines.push(rest.join(" "));
                }
                lines.resize(slots, String::new());
                lines
                    .into_iter()
                    .enumerate()
                    .map(|(slot, text)| Event::EditDraft { slot, text })
                    .collect()
            };
            events.push(Event::SubmitDraft);
            events
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fixtures::*;
    use crate::quiz::session::{reduce, Command};

    fn apply(state: SessionState, events: Vec<Event>) -> (SessionState, Vec<Command>) {
        let mut state = state;
        let mut commands = Vec::new();
        for event in events {
            let transition = reduce(state, event);
            state = transition.state;
            commands.extend(transition.commands);
        }
        (state, commands)
    }

    fn loaded_math() -> SessionState {
        let state = SessionState::new();
        let (state, _) = apply(state.clone(), interpret(&state, "Math"));
        let (state, _) = apply(state.clone(), interpret(&state, "Grade 3"));
        let (state, commands) = apply(state.clone(), interpret(&state, "Word problems"));
        let request = match &commands[0] {
            Command::Generate(request) => request.id,
            other => panic!("unexpected {:?}", other),
        };
        apply(
            state,
            vec![Event::GenerationFinished {
                request,
                outcome: Ok(math_set()),
            }],
        )
        .0
    }

    /// Bumps the loaded quiz `times` times and loads a fresh set at the new level.
    fn bumped(state: SessionState, up: bool, times: usize) -> SessionState {
        let event = || if up { Event::BumpUp } else { Event::BumpDown };
        let (state, commands) = apply(state, (0..times).map(|_| event()).collect());
        let request = match commands.last() {
            Some(Command::Generate(request)) => request.id,
            other => panic!("unexpected {:?}", other),
        };
        apply(
            state,
            vec![Event::GenerationFinished {
                request,
                outcome: Ok(math_set()),
            }],
        )
        .0
    }

    #[test]
    fn wizard_screens_offer_the_right_buttons() {
        let state = SessionState::new();
        let screen = render(&state);
        assert!(screen.buttons.concat().contains(&"Social Studies".to_string()));

        let (state, _) = apply(state.clone(), interpret(&state, "Science"));
        let screen = render(&state);
        assert!(screen.buttons.concat().contains(&"JHS 2".to_string()));
        assert!(screen.buttons.concat().contains(&BACK.to_string()));

        let (state, _) = apply(state.clone(), interpret(&state, "JHS 2"));
        let screen = render(&state);
        assert!(screen.buttons.concat().contains(&"Earth science".to_string()));
        assert!(!screen.buttons.concat().contains(&"Poetry".to_string()));
    }

    #[test]
    fn unknown_replies_are_not_understood() {
        let state = SessionState::new();
        assert!(interpret(&state, "Music").is_empty());
        let (state, _) = apply(state.clone(), interpret(&state, "Math"));
        assert!(interpret(&state, "Grade 12").is_empty());
    }

    #[test]
    fn multi_part_answer_is_split_by_line() {
        let state = loaded_math();
        let events = interpret(&state, "3\n 4 ");
        assert!(matches!(
            events.as_slice(),
            [
                Event::EditDraft { slot: 0, .. },
                Event::EditDraft { slot: 1, .. },
                Event::SubmitDraft
            ]
        ));
        let (_, commands) = apply(state, events);
        match commands.as_slice() {
            [Command::Judge(request)] => assert_eq!(request.given, vec!["3", "4"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_line_is_reported_as_incomplete() {
        let state = loaded_math();
        let (state, commands) = apply(state.clone(), interpret(&state, "3"));
        assert!(commands.is_empty());
        let screen = render(&state);
        assert!(screen.text.contains("Please fill in all 2 answers"));
    }

    #[test]
    fn quiz_screen_shows_problem_and_difficulty() {
        let screen = render(&loaded_math());
        assert!(screen.text.contains("Grade 3 Math drill: Word problems"));
        assert!(screen.text.contains("Difficulty: ★★★☆☆"));
        assert!(screen.text.contains("Problem 1 / 3:"));
        assert!(screen.text.contains("one per line"));
        assert!(screen.buttons.concat().contains(&HARDER.to_string()));
    }

    #[test]
    fn choice_problem_buttons_submit_choices() {
        let state = SessionState::new();
        let (state, _) = apply(state.clone(), interpret(&state, "Social Studies"));
        let (state, _) = apply(state.clone(), interpret(&state, "Grade 5"));
        let (state, commands) = apply(state.clone(), interpret(&state, "Geography"));
        let request = match &commands[0] {
            Command::Generate(request) => request.id,
            other => panic!("unexpected {:?}", other),
        };
        let (state, _) = apply(
            state,
            vec![Event::GenerationFinished {
                request,
                outcome: Ok(choice_set()),
            }],
        );

        let screen = render(&state);
        assert!(screen.buttons.concat().contains(&"Kyoto".to_string()));
        assert!(interpret(&state, "Sapporo").is_empty());

        let (state, _) = apply(state.clone(), interpret(&state, "Tokyo"));
        let screen = render(&state);
        assert!(screen.text.contains("Correct!"));
        assert!(screen.buttons.concat().contains(&NEXT.to_string()));
    }

    #[test]
    fn controls_map_to_events() {
        let state = loaded_math();
        assert!(matches!(interpret(&state, HARDER).as_slice(), [Event::BumpUp]));
        assert!(matches!(interpret(&state, EASIER).as_slice(), [Event::BumpDown]));
        assert!(matches!(interpret(&state, BACK).as_slice(), [Event::Back]));
    }

    #[test]
    fn set_complete_notice_shows_next_level() {
        let text = notice_text(&Notice::SetComplete {
            correct: 3,
            difficulty: crate::quiz::Difficulty::new(4),
        });
        assert!(text.contains("3 correct"));
        assert!(text.contains("★★★★☆"));
    }

    #[test]
    fn difficulty_buttons_hide_at_the_bounds() {
        let lowest = bumped(loaded_math(), false, 2);
        assert_eq!(lowest.quiz().unwrap().difficulty.level(), 1);
        let buttons = render(&lowest).buttons.concat();
        assert!(!buttons.contains(&EASIER.to_string()));
        assert!(buttons.contains(&HARDER.to_string()));
        assert!(interpret(&lowest, EASIER).is_empty());

        let highest = bumped(loaded_math(), true, 2);
        assert_eq!(highest.quiz().unwrap().difficulty.level(), 5);
        let buttons = render(&highest).buttons.concat();
        assert!(buttons.contains(&EASIER.to_string()));
        assert!(!buttons.contains(&HARDER.to_string()));
        assert!(interpret(&highest, HARDER).is_empty());
    }

    #[test]
    fn pressing_easier_at_the_bottom_keeps_the_round() {
        let lowest = bumped(loaded_math(), false, 2);
        let (state, commands) = apply(lowest.clone(), interpret(&lowest, EASIER));
        assert!(commands.is_empty());
        assert!(state.quiz().unwrap().round().is_some());
    }

    #[test]
    fn surplus_lines_join_the_last_answer() {
        let state = loaded_math();
        let (_, commands) = apply(state.clone(), interpret(&state, "3\n4\n5"));
        match commands.as_slice() {
            [Command::Judge(request)] => assert_eq!(request.given, vec!["3", "4 5"]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
