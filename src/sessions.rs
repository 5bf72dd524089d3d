use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use teloxide::types::ChatId;
use tokio::time::Instant;

use crate::quiz::session::{reduce, Command, Event, SessionState};

/// Result of applying events to one chat's session.
#[derive(Debug)]
pub struct Applied {
    pub state: SessionState,
    pub commands: Vec<Command>,
    /// False when the events left the session untouched (stale or inapplicable).
    pub changed: bool,
}

struct Entry {
    state: SessionState,
    touched: Instant,
}

/// One session per chat. Every read-reduce-write happens under the lock, so
/// handler input and background results never interleave within a chat.
///
/// Sessions idle for longer than `idle_limit` are dropped on the next write.
/// The limit has to stay far above the longest request, or a late result
/// could meet a fresh request counter.
pub struct SessionStore {
    sessions: Mutex<HashMap<ChatId, Entry>>,
    idle_limit: Duration,
}

impl SessionStore {
    pub fn new(idle_limit: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_limit,
        }
    }

    pub fn snapshot(&self, chat: ChatId) -> SessionState {
        self.sessions
            .lock()
            .get(&chat)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    pub fn apply(&self, chat: ChatId, event: Event) -> Applied {
        self.apply_with(chat, |_| vec![event])
    }

    /// Builds events from the current state and applies them in one step.
    pub fn apply_with<F>(&self, chat: ChatId, events: F) -> Applied
    where
        F: FnOnce(&SessionState) -> Vec<Event>,
    {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let before = sessions
            .remove(&chat)
            .map(|entry| entry.state)
            .unwrap_or_default();

        let idle_limit = self.idle_limit;
        let count = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.touched) <= idle_limit);
        if sessions.len() < count {
            log::debug!("Dropped {} idle sessions", count - sessions.len());
        }

        let events = events(&before);
        let mut state = before.clone();
        let mut commands = Vec::new();
        for event in events {
            let transition = reduce(state, event);
            state = transition.state;
            commands.extend(transition.commands);
        }

        let changed = state != before || !commands.is_empty();
        sessions.insert(
            chat,
            Entry {
                state: state.clone(),
                touched: now,
            },
        );
        Applied {
            state,
            commands,
            changed,
        }
    }
}
