use std::fmt;

use crate::content::Authored;

/// The states of the per-operator admin workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminState {
    #[default]
    Idle,
    AwaitingGenreChoice,
    AwaitingStyleChoice,
    AwaitingScheduleInput,
    AwaitingCustomQuery,
    ReviewReady,
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminState::Idle => write!(f, "idle"),
            AdminState::AwaitingGenreChoice => write!(f, "awaiting_genre_choice"),
            AdminState::AwaitingStyleChoice => write!(f, "awaiting_style_choice"),
            AdminState::AwaitingScheduleInput => write!(f, "awaiting_schedule_input"),
            AdminState::AwaitingCustomQuery => write!(f, "awaiting_custom_query"),
            AdminState::ReviewReady => write!(f, "review_ready"),
        }
    }
}

/// Per-operator workflow context. Created on entering a multi-step flow,
/// cleared on completion, cancellation or error.
#[derive(Debug, Default)]
pub struct Session {
    pub state: AdminState,
    /// Partially built work: a drafted review awaiting publish or discard.
    pub pending: Option<Authored>,
}

impl Session {
    /// Resets the session to idle, dropping any draft.
    pub fn clear(&mut self) {
        self.state = AdminState::Idle;
        self.pending = None;
    }
}
