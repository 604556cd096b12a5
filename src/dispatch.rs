//! Routing of inbound Telegram updates.
//!
//! [`Dispatcher`] parses messages and callback presses into workflow
//! commands, runs the state machine, and turns each [`Outcome`] into
//! replies, scheduler re-registration, or a spawned publish. Non-admin
//! commands get a fixed refusal; other non-admin traffic is ignored.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::content::{Authored, ContentProvider};
use crate::openai::ProviderError;
use crate::poster::PosterFinder;
use crate::publish::Publisher;
use crate::scheduler::{PUBLISH_JOB_KEY, PublishScheduler};
use crate::settings::BotSettings;
use crate::telegram::{
    CallbackQuery, IncomingMessage, InlineKeyboardMarkup, TelegramClient, Update,
    escape_markdown_v2,
};
use crate::workflow::{Command, Outcome, Workflow};

const REFUSAL: &str = "This bot only takes instructions from its administrators\\.";

/// What a callback button press asks for.
#[derive(Debug, PartialEq, Eq)]
enum CallbackAction {
    Command(Command),
    /// A genre or style selection, e.g. `genre:comedy`.
    Choice(String),
}

pub struct Dispatcher<P, F> {
    telegram: Arc<TelegramClient>,
    provider: Arc<P>,
    publisher: Arc<Publisher<Arc<P>, F, Arc<TelegramClient>>>,
    settings: Arc<Mutex<BotSettings>>,
    scheduler: PublishScheduler,
    workflow: Workflow,
}

impl<P, F> Dispatcher<P, F>
where
    P: ContentProvider + Send + Sync + 'static,
    F: PosterFinder + Send + Sync + 'static,
{
    pub fn new(
        telegram: Arc<TelegramClient>,
        provider: Arc<P>,
        publisher: Arc<Publisher<Arc<P>, F, Arc<TelegramClient>>>,
        settings: Arc<Mutex<BotSettings>>,
        scheduler: PublishScheduler,
        admins: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            telegram,
            provider,
            publisher,
            settings,
            scheduler,
            workflow: Workflow::new(admins),
        }
    }

    pub async fn handle_update(&mut self, update: Update) {
        if let Some(callback) = update.callback_query {
            self.handle_callback(callback).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        }
    }

    async fn handle_callback(&mut self, callback: CallbackQuery) {
        if let Err(e) = self.telegram.answer_callback(&callback.id).await {
            tracing::warn!(error = %e, "failed to answer callback query");
        }
        let operator = callback.from.id;
        let Some(data) = callback.data else { return };

        let outcome = match parse_callback(&data) {
            Some(CallbackAction::Command(command)) => {
                let settings = self.settings.lock().await;
                self.workflow.handle_command(&settings, operator, command)
            }
            Some(CallbackAction::Choice(choice)) => {
                let mut settings = self.settings.lock().await;
                self.workflow.handle_choice(&mut settings, operator, &choice)
            }
            None => {
                tracing::warn!(data, "unrecognized callback data");
                return;
            }
        };
        // Callback replies go to the operator's own chat.
        self.execute(operator, &operator.to_string(), outcome).await;
    }

    async fn handle_message(&mut self, message: IncomingMessage) {
        let (Some(user), Some(text)) = (message.from, message.text) else {
            return;
        };
        let operator = user.id;
        let chat = message.chat.id.to_string();
        let text = text.trim();

        let outcome = if text.starts_with('/') {
            // Unknown slash commands fall through to the menu, which also
            // yields the refusal for non-admins.
            let command = parse_command(text).unwrap_or(Command::Menu);
            let settings = self.settings.lock().await;
            self.workflow.handle_command(&settings, operator, command)
        } else {
            if !self.workflow.is_admin(operator) {
                return;
            }
            let mut settings = self.settings.lock().await;
            self.workflow.handle_text(&mut settings, operator, text)
        };
        self.execute(operator, &chat, outcome).await;
    }

    async fn execute(&mut self, operator: i64, chat: &str, outcome: Outcome) {
        match outcome {
            Outcome::Refused => self.reply(chat, REFUSAL, None).await,
            Outcome::ShowMenu {
                genre,
                style,
                schedule,
                has_pending,
            } => {
                let text = menu_text(&genre, &style, &schedule, has_pending);
                self.reply(chat, &text, Some(&menu_keyboard(has_pending)))
                    .await;
            }
            Outcome::ChooseGenre(options) => {
                self.reply(
                    chat,
                    "Pick a genre:",
                    Some(&choice_keyboard("genre", &options)),
                )
                .await;
            }
            Outcome::ChooseStyle(options) => {
                self.reply(
                    chat,
                    "Pick a review style:",
                    Some(&choice_keyboard("style", &options)),
                )
                .await;
            }
            Outcome::PromptSchedule => {
                self.reply(
                    chat,
                    "Send the daily publish time as HH:MM \\(24\\-hour clock\\)\\.",
                    None,
                )
                .await;
            }
            Outcome::PromptQuery => {
                self.reply(chat, "Describe the movie you want reviewed\\.", None)
                    .await;
            }
            Outcome::GenreSet(genre) => {
                let text = format!("Genre set to {}\\.", escape_markdown_v2(&genre));
                self.reply(chat, &text, None).await;
            }
            Outcome::StyleSet(style) => {
                let text = format!("Review style set to {}\\.", escape_markdown_v2(&style));
                self.reply(chat, &text, None).await;
            }
            Outcome::ScheduleSet { cron } => {
                self.reschedule().await;
                let text = format!("Publish schedule updated to `{cron}`\\.");
                self.reply(chat, &text, None).await;
            }
            Outcome::ScheduleRejected(reason) => {
                let text = format!(
                    "{}\\. Use the schedule button to try again\\.",
                    escape_markdown_v2(&reason)
                );
                self.reply(chat, &text, None).await;
            }
            Outcome::GenerateFromQuery(query) => {
                self.author(operator, chat, &query).await;
            }
            Outcome::Drafted(authored) => self.send_draft(chat, &authored).await,
            Outcome::RetryQuery => {
                self.reply(
                    chat,
                    "I could not turn that into a review\\. Try describing the movie differently\\.",
                    None,
                )
                .await;
            }
            Outcome::PublishPending(authored) => {
                self.reply(chat, "Publishing your draft\\.", None).await;
                let publisher = self.publisher.clone();
                tokio::spawn(async move {
                    publisher.publish_pending(authored).await;
                });
            }
            Outcome::PublishNow => {
                self.reply(chat, "Publishing with the current settings\\.", None)
                    .await;
                let publisher = self.publisher.clone();
                tokio::spawn(async move {
                    publisher.publish_from_settings().await;
                });
            }
            Outcome::Discarded => self.reply(chat, "Draft discarded\\.", None).await,
            Outcome::Cancelled => self.reply(chat, "Cancelled\\.", None).await,
        }
    }

    /// Runs free-text authoring inline and reports the result back into
    /// the workflow.
    async fn author(&mut self, operator: i64, chat: &str, query: &str) {
        self.reply(chat, "Working on it\\.\\.\\.", None).await;
        match self.provider.review_from_query(query).await {
            Ok(authored) => {
                if let Outcome::Drafted(authored) =
                    self.workflow.authoring_succeeded(operator, authored)
                {
                    self.send_draft(chat, &authored).await;
                }
            }
            Err(ProviderError::Parse(e)) => {
                tracing::warn!(error = %e, "authoring output unusable");
                self.workflow.authoring_failed(operator);
                self.reply(
                    chat,
                    "I could not turn that into a review\\. Try describing the movie differently\\.",
                    None,
                )
                .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "authoring request failed");
                self.reply(
                    chat,
                    "Review generation is temporarily unavailable\\. Try again later\\.",
                    None,
                )
                .await;
            }
        }
    }

    async fn send_draft(&self, chat: &str, authored: &Authored) {
        let text = format!(
            "*Draft ready*\n\n🎬 *{}* \\({}\\)\n\n{}",
            escape_markdown_v2(&authored.movie.title),
            authored.movie.year,
            escape_markdown_v2(&authored.review),
        );
        let keyboard = InlineKeyboardMarkup::rows(vec![
            ("Publish".into(), "publish_now".into()),
            ("Discard".into(), "discard".into()),
        ]);
        self.reply(chat, &text, Some(&keyboard)).await;
    }

    /// Re-registers the publish job from the stored schedule. The stored
    /// form is parseable by construction.
    async fn reschedule(&mut self) {
        let schedule = match self.settings.lock().await.cron_schedule() {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::error!(error = %e, "stored schedule failed to parse");
                return;
            }
        };
        let publisher = self.publisher.clone();
        self.scheduler
            .register(PUBLISH_JOB_KEY, schedule, move || {
                let publisher = publisher.clone();
                async move {
                    publisher.publish_from_settings().await;
                }
            });
    }

    async fn reply(&self, chat: &str, text: &str, keyboard: Option<&InlineKeyboardMarkup>) {
        if let Err(e) = self.telegram.send_message(chat, text, keyboard).await {
            tracing::error!(chat, error = %e, "failed to send reply");
        }
    }
}

fn parse_command(text: &str) -> Option<Command> {
    match text.split_whitespace().next()? {
        "/start" | "/admin" | "/menu" => Some(Command::Menu),
        "/cancel" => Some(Command::Cancel),
        _ => None,
    }
}

fn parse_callback(data: &str) -> Option<CallbackAction> {
    if data.strip_prefix("genre:").is_some() || data.strip_prefix("style:").is_some() {
        let choice = data.split_once(':').map(|(_, v)| v)?;
        return Some(CallbackAction::Choice(choice.to_string()));
    }
    let command = match data {
        "menu" => Command::Menu,
        "set_genre" => Command::ChangeGenre,
        "set_style" => Command::ChangeStyle,
        "set_schedule" => Command::ChangeSchedule,
        "author" => Command::AuthorReview,
        "publish_now" => Command::PublishNow,
        "discard" => Command::Discard,
        "cancel" => Command::Cancel,
        _ => return None,
    };
    Some(CallbackAction::Command(command))
}

fn menu_text(genre: &str, style: &str, schedule: &str, has_pending: bool) -> String {
    format!(
        "*Admin menu*\n\nGenre: {}\nStyle: {}\nSchedule: `{}`\nDraft pending: {}",
        escape_markdown_v2(genre),
        escape_markdown_v2(style),
        schedule,
        if has_pending { "yes" } else { "no" },
    )
}

fn menu_keyboard(has_pending: bool) -> InlineKeyboardMarkup {
    let mut buttons = vec![
        ("Change genre".to_string(), "set_genre".to_string()),
        ("Change style".to_string(), "set_style".to_string()),
        ("Change schedule".to_string(), "set_schedule".to_string()),
        ("Author a review".to_string(), "author".to_string()),
        ("Publish now".to_string(), "publish_now".to_string()),
    ];
    if has_pending {
        buttons.push(("Discard draft".to_string(), "discard".to_string()));
    }
    InlineKeyboardMarkup::rows(buttons)
}

fn choice_keyboard(kind: &str, options: &[&'static str]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::rows(
        options
            .iter()
            .map(|option| (option.to_string(), format!("{kind}:{option}")))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_command("/start"), Some(Command::Menu));
        assert_eq!(parse_command("/admin"), Some(Command::Menu));
        assert_eq!(parse_command("/menu extra words"), Some(Command::Menu));
        assert_eq!(parse_command("/cancel"), Some(Command::Cancel));
        assert_eq!(parse_command("/unknown"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn callback_commands_parse() {
        assert_eq!(
            parse_callback("set_genre"),
            Some(CallbackAction::Command(Command::ChangeGenre))
        );
        assert_eq!(
            parse_callback("publish_now"),
            Some(CallbackAction::Command(Command::PublishNow))
        );
        assert_eq!(
            parse_callback("discard"),
            Some(CallbackAction::Command(Command::Discard))
        );
        assert_eq!(parse_callback("something_else"), None);
    }

    #[test]
    fn callback_choices_parse_with_their_value() {
        assert_eq!(
            parse_callback("genre:sci-fi"),
            Some(CallbackAction::Choice("sci-fi".into()))
        );
        assert_eq!(
            parse_callback("style:humorous"),
            Some(CallbackAction::Choice("humorous".into()))
        );
    }

    #[test]
    fn menu_text_escapes_dynamic_values() {
        let text = menu_text("sci-fi", "casual", "0 9 * * *", true);
        assert!(text.contains("sci\\-fi"));
        assert!(text.contains("`0 9 * * *`"));
        assert!(text.contains("Draft pending: yes"));
    }

    #[test]
    fn menu_keyboard_offers_discard_only_with_a_draft() {
        assert_eq!(menu_keyboard(false).inline_keyboard.len(), 5);
        let with_draft = menu_keyboard(true);
        assert_eq!(with_draft.inline_keyboard.len(), 6);
        assert_eq!(
            with_draft.inline_keyboard[5][0].callback_data,
            "discard"
        );
    }

    #[test]
    fn choice_keyboard_prefixes_callback_data() {
        let kb = choice_keyboard("genre", &["action", "comedy"]);
        assert_eq!(kb.inline_keyboard.len(), 2);
        assert_eq!(kb.inline_keyboard[0][0].callback_data, "genre:action");
        assert_eq!(kb.inline_keyboard[1][0].text, "comedy");
    }
}
