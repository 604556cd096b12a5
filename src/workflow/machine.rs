//! The admin workflow state machine.
//!
//! [`Workflow`] maps operator commands, inline-keyboard choices and free
//! text onto state transitions and returns an [`Outcome`] describing what
//! the caller should do next (reply, launch generation, re-register the
//! scheduler, publish). Transitions are synchronous and effect-free;
//! asynchronous work is reported back via [`Workflow::authoring_succeeded`]
//! and [`Workflow::authoring_failed`].
//!
//! Every entry point checks the operator against the fixed administrator
//! set; non-members get [`Outcome::Refused`] and no state changes.

use std::collections::{HashMap, HashSet};

use crate::content::Authored;
use crate::settings::{BotSettings, GENRES, STYLES};

use super::session::{AdminState, Session};

/// Admin commands, as parsed from messages and callback buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the admin menu and current settings.
    Menu,
    ChangeGenre,
    ChangeStyle,
    ChangeSchedule,
    AuthorReview,
    PublishNow,
    /// Drop the drafted review without publishing.
    Discard,
    Cancel,
}

/// What the dispatcher should do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Operator is not an administrator; send the fixed refusal.
    Refused,
    /// Display the menu with the current settings snapshot.
    ShowMenu {
        genre: String,
        style: String,
        schedule: String,
        has_pending: bool,
    },
    /// Offer the fixed genre enumeration.
    ChooseGenre(Vec<&'static str>),
    /// Offer the style table keys.
    ChooseStyle(Vec<&'static str>),
    /// Ask for an `HH:MM` publish time.
    PromptSchedule,
    /// Ask for a free-text movie description.
    PromptQuery,
    GenreSet(String),
    StyleSet(String),
    /// Schedule updated; the publish job must be re-registered with the
    /// returned cron expression.
    ScheduleSet { cron: String },
    /// Schedule input rejected; session back to idle, settings untouched.
    ScheduleRejected(String),
    /// Run free-text generation, then report back via
    /// `authoring_succeeded` / `authoring_failed`.
    GenerateFromQuery(String),
    /// A draft is ready for publish-or-discard.
    Drafted(Authored),
    /// Generation output was unusable; operator should try another query.
    RetryQuery,
    /// Publish the drafted review verbatim.
    PublishPending(Authored),
    /// Publish using the current genre and style.
    PublishNow,
    Discarded,
    Cancelled,
}

/// Per-operator admin workflow over a fixed administrator set.
pub struct Workflow {
    admins: HashSet<i64>,
    sessions: HashMap<i64, Session>,
}

impl Workflow {
    pub fn new(admins: impl IntoIterator<Item = i64>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            sessions: HashMap::new(),
        }
    }

    pub fn is_admin(&self, operator: i64) -> bool {
        self.admins.contains(&operator)
    }

    /// Current state of an operator's session (idle when none exists).
    pub fn state(&self, operator: i64) -> AdminState {
        self.sessions
            .get(&operator)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    fn session(&mut self, operator: i64) -> &mut Session {
        self.sessions.entry(operator).or_default()
    }

    fn menu(settings: &BotSettings, has_pending: bool) -> Outcome {
        Outcome::ShowMenu {
            genre: settings.current_genre().to_string(),
            style: settings.current_style().to_string(),
            schedule: settings.schedule().to_string(),
            has_pending,
        }
    }

    /// Handles an admin command. Entering a multi-step flow from any state
    /// replaces the existing session so an operator is never stuck.
    pub fn handle_command(
        &mut self,
        settings: &BotSettings,
        operator: i64,
        command: Command,
    ) -> Outcome {
        if !self.is_admin(operator) {
            return Outcome::Refused;
        }

        match command {
            Command::Menu => {
                let has_pending = self
                    .sessions
                    .get(&operator)
                    .is_some_and(|s| s.pending.is_some());
                Self::menu(settings, has_pending)
            }
            Command::ChangeGenre => {
                let session = self.session(operator);
                session.clear();
                session.state = AdminState::AwaitingGenreChoice;
                Outcome::ChooseGenre(GENRES.to_vec())
            }
            Command::ChangeStyle => {
                let session = self.session(operator);
                session.clear();
                session.state = AdminState::AwaitingStyleChoice;
                Outcome::ChooseStyle(STYLES.iter().map(|(key, _)| *key).collect())
            }
            Command::ChangeSchedule => {
                let session = self.session(operator);
                session.clear();
                session.state = AdminState::AwaitingScheduleInput;
                Outcome::PromptSchedule
            }
            Command::AuthorReview => {
                let session = self.session(operator);
                session.clear();
                session.state = AdminState::AwaitingCustomQuery;
                Outcome::PromptQuery
            }
            Command::PublishNow => {
                let session = self.session(operator);
                if session.state == AdminState::ReviewReady {
                    if let Some(authored) = session.pending.take() {
                        session.clear();
                        return Outcome::PublishPending(authored);
                    }
                }
                session.clear();
                Outcome::PublishNow
            }
            Command::Discard => {
                let session = self.session(operator);
                let had_draft = session.pending.is_some();
                session.clear();
                if had_draft {
                    Outcome::Discarded
                } else {
                    Outcome::Cancelled
                }
            }
            Command::Cancel => {
                self.session(operator).clear();
                Outcome::Cancelled
            }
        }
    }

    /// Handles an inline-keyboard selection.
    pub fn handle_choice(
        &mut self,
        settings: &mut BotSettings,
        operator: i64,
        choice: &str,
    ) -> Outcome {
        if !self.is_admin(operator) {
            return Outcome::Refused;
        }

        let session = self.session(operator);
        match session.state {
            AdminState::AwaitingGenreChoice => match settings.set_genre(choice) {
                Ok(()) => {
                    session.clear();
                    Outcome::GenreSet(choice.to_string())
                }
                Err(_) => Outcome::ChooseGenre(GENRES.to_vec()),
            },
            AdminState::AwaitingStyleChoice => match settings.set_style(choice) {
                Ok(()) => {
                    session.clear();
                    Outcome::StyleSet(choice.to_string())
                }
                Err(_) => Outcome::ChooseStyle(STYLES.iter().map(|(key, _)| *key).collect()),
            },
            _ => {
                let has_pending = session.pending.is_some();
                Self::menu(settings, has_pending)
            }
        }
    }

    /// Handles free text from an operator.
    pub fn handle_text(
        &mut self,
        settings: &mut BotSettings,
        operator: i64,
        text: &str,
    ) -> Outcome {
        if !self.is_admin(operator) {
            return Outcome::Refused;
        }

        let session = self.session(operator);
        match session.state {
            AdminState::AwaitingScheduleInput => match settings.set_schedule(text) {
                Ok(cron) => {
                    session.clear();
                    Outcome::ScheduleSet { cron }
                }
                Err(e) => {
                    // Exit the input state so the operator is never locked
                    // in; a corrective follow-up re-invokes the command.
                    session.clear();
                    Outcome::ScheduleRejected(e.to_string())
                }
            },
            AdminState::AwaitingCustomQuery => Outcome::GenerateFromQuery(text.to_string()),
            _ => {
                // Unrecognized input with no multi-step context: re-display
                // the menu rather than erroring.
                let has_pending = session.pending.is_some();
                Self::menu(settings, has_pending)
            }
        }
    }

    /// Records a successful free-text generation: the session moves to
    /// `review_ready` holding the draft.
    pub fn authoring_succeeded(&mut self, operator: i64, authored: Authored) -> Outcome {
        if !self.is_admin(operator) {
            return Outcome::Refused;
        }
        let session = self.session(operator);
        session.state = AdminState::ReviewReady;
        session.pending = Some(authored.clone());
        Outcome::Drafted(authored)
    }

    /// Records a failed free-text generation parse: the session stays in
    /// `awaiting_custom_query` and the operator is re-prompted.
    pub fn authoring_failed(&mut self, operator: i64) -> Outcome {
        if !self.is_admin(operator) {
            return Outcome::Refused;
        }
        Outcome::RetryQuery
    }
}
