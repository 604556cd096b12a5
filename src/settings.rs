//! Process-wide bot settings.
//!
//! [`BotSettings`] is the single mutable configuration record: current
//! genre, review style, publish schedule, and the recency window used for
//! duplicate detection. All mutation goes through named operations so the
//! invariants (schedule always parseable, window always bounded) are
//! enforced at one boundary.

use std::collections::VecDeque;
use std::str::FromStr;

use crate::error::BotError;

/// Fixed genre enumeration offered by the admin keyboard.
pub const GENRES: &[&str] = &["action", "comedy", "drama", "sci-fi"];

/// Review styles: key → generation guidance passed to the content provider.
pub const STYLES: &[(&str, &str)] = &[
    (
        "analytical",
        "Write in an analytical tone: dissect direction, pacing and themes.",
    ),
    (
        "humorous",
        "Write in a humorous tone: light, witty, a little irreverent.",
    ),
    (
        "dramatic",
        "Write in a dramatic tone: vivid, emotional, sweeping statements.",
    ),
    (
        "casual",
        "Write in a casual tone: conversational, like recommending to a friend.",
    ),
];

/// Identifiers consulted for duplicate checks and prompt exclusion lists.
pub const DUPLICATE_WINDOW: usize = 100;

/// Identifiers retained in memory, bounding the startup seed.
pub const SEED_WINDOW: usize = 500;

/// Returns the guidance text for a style key, if the key is known.
pub fn style_guidance(key: &str) -> Option<&'static str> {
    STYLES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, guidance)| *guidance)
}

/// Bounded list of recently published identifiers, newest last.
#[derive(Debug, Default)]
pub struct RecencyWindow {
    ids: VecDeque<String>,
}

impl RecencyWindow {
    /// Replaces the window contents with the most recent [`SEED_WINDOW`]
    /// identifiers of `ids` (which arrive oldest first).
    pub fn seed(&mut self, ids: Vec<String>) {
        self.ids = ids
            .into_iter()
            .rev()
            .take(SEED_WINDOW)
            .rev()
            .collect::<VecDeque<_>>();
    }

    /// Appends an identifier, truncating from the front at [`SEED_WINDOW`].
    pub fn push(&mut self, id: String) {
        self.ids.push_back(id);
        while self.ids.len() > SEED_WINDOW {
            self.ids.pop_front();
        }
    }

    /// Whether `id` is among the most recent [`DUPLICATE_WINDOW`] entries.
    pub fn is_recent(&self, id: &str) -> bool {
        self.ids.iter().rev().take(DUPLICATE_WINDOW).any(|x| x == id)
    }

    /// The most recent [`DUPLICATE_WINDOW`] identifiers, oldest first, for
    /// embedding in generation prompts.
    pub fn exclusions(&self) -> Vec<String> {
        let skip = self.ids.len().saturating_sub(DUPLICATE_WINDOW);
        self.ids.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[cfg(test)]
    fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }
}

/// The mutable configuration record shared by the workflow, the scheduler
/// and the publish operation.
#[derive(Debug)]
pub struct BotSettings {
    current_genre: String,
    current_style: String,
    /// 5-field cron expression; invariant: always parseable.
    schedule: String,
    recency: RecencyWindow,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            current_genre: "action".to_string(),
            current_style: "analytical".to_string(),
            schedule: "0 9 * * *".to_string(),
            recency: RecencyWindow::default(),
        }
    }
}

impl BotSettings {
    pub fn current_genre(&self) -> &str {
        &self.current_genre
    }

    pub fn current_style(&self) -> &str {
        &self.current_style
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    pub fn recency(&self) -> &RecencyWindow {
        &self.recency
    }

    /// Sets the current genre; must be one of [`GENRES`].
    pub fn set_genre(&mut self, genre: &str) -> Result<(), BotError> {
        if !GENRES.contains(&genre) {
            return Err(BotError::Config(format!("unknown genre: {genre}")));
        }
        self.current_genre = genre.to_string();
        Ok(())
    }

    /// Sets the current review style; must be a key of [`STYLES`].
    pub fn set_style(&mut self, style: &str) -> Result<(), BotError> {
        if style_guidance(style).is_none() {
            return Err(BotError::Config(format!("unknown style: {style}")));
        }
        self.current_style = style.to_string();
        Ok(())
    }

    /// Validates an `HH:MM` publish time and stores the derived 5-field
    /// cron expression. Returns the stored expression. On validation
    /// failure the schedule is left untouched.
    pub fn set_schedule(&mut self, hhmm: &str) -> Result<String, BotError> {
        let (hour, minute) = parse_hhmm(hhmm)
            .ok_or_else(|| BotError::Schedule(format!("expected HH:MM (00:00-23:59), got {hhmm:?}")))?;
        self.schedule = format!("{minute} {hour} * * *");
        Ok(self.schedule.clone())
    }

    /// Parses the stored schedule for the scheduler. The `cron` crate wants
    /// a seconds field, so `0` is prepended to the stored 5-field form.
    pub fn cron_schedule(&self) -> Result<cron::Schedule, BotError> {
        cron::Schedule::from_str(&format!("0 {}", self.schedule))
            .map_err(|e| BotError::Schedule(e.to_string()))
    }

    /// Seeds the recency window from history, oldest first.
    pub fn seed_recent(&mut self, ids: Vec<String>) {
        self.recency.seed(ids);
    }

    /// Records a published identifier in the recency window.
    pub fn record_published(&mut self, id: String) {
        self.recency.push(id);
    }
}

/// Strict `HH:MM` parse: 1-2 digit fields, hour 0-23, minute 0-59.
fn parse_hhmm(input: &str) -> Option<(u32, u32)> {
    let (h, m) = input.trim().split_once(':')?;
    let digits = |s: &str| {
        (!s.is_empty() && s.len() <= 2 && s.bytes().all(|b| b.is_ascii_digit()))
            .then(|| s.parse::<u32>().ok())
            .flatten()
    };
    let hour = digits(h)?;
    let minute = digits(m)?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = BotSettings::default();
        assert_eq!(settings.current_genre(), "action");
        assert_eq!(settings.current_style(), "analytical");
        assert_eq!(settings.schedule(), "0 9 * * *");
        assert!(settings.recency().is_empty());
    }

    #[test]
    fn every_valid_hhmm_converts_to_five_fields() {
        let mut settings = BotSettings::default();
        for hour in 0..24 {
            for minute in 0..60 {
                let cron = settings
                    .set_schedule(&format!("{hour:02}:{minute:02}"))
                    .unwrap();
                let fields: Vec<&str> = cron.split_whitespace().collect();
                assert_eq!(fields.len(), 5);
                assert_eq!(fields[0], minute.to_string());
                assert_eq!(fields[1], hour.to_string());
                assert_eq!(&fields[2..], &["*", "*", "*"]);
                // Invariant: the stored form is always parseable.
                settings.cron_schedule().unwrap();
            }
        }
    }

    #[test]
    fn invalid_times_are_rejected_and_schedule_unchanged() {
        let mut settings = BotSettings::default();
        for input in [
            "", ":", "9", "24:00", "12:60", "99:99", "12:5x", "ab:cd", "12:345", "-1:30",
            "+9:30", "12:30:45", "12 30",
        ] {
            assert!(settings.set_schedule(input).is_err(), "accepted {input:?}");
            assert_eq!(settings.schedule(), "0 9 * * *");
        }
    }

    #[test]
    fn single_digit_fields_parse() {
        let mut settings = BotSettings::default();
        assert_eq!(settings.set_schedule("9:5").unwrap(), "5 9 * * *");
    }

    #[test]
    fn set_genre_validates_membership() {
        let mut settings = BotSettings::default();
        settings.set_genre("comedy").unwrap();
        assert_eq!(settings.current_genre(), "comedy");
        assert!(settings.set_genre("western").is_err());
        assert_eq!(settings.current_genre(), "comedy");
    }

    #[test]
    fn set_style_validates_key() {
        let mut settings = BotSettings::default();
        settings.set_style("humorous").unwrap();
        assert_eq!(settings.current_style(), "humorous");
        assert!(settings.set_style("sarcastic").is_err());
    }

    #[test]
    fn style_guidance_lookup() {
        assert!(style_guidance("analytical").unwrap().contains("analytical"));
        assert!(style_guidance("nope").is_none());
    }

    #[test]
    fn seed_keeps_most_recent_500() {
        let mut window = RecencyWindow::default();
        let ids: Vec<String> = (0..600).map(|i| format!("tt{i:07}")).collect();
        window.seed(ids);
        assert_eq!(window.len(), SEED_WINDOW);
        // Oldest 100 discarded, newest 500 retained.
        assert!(!window.contains("tt0000099"));
        assert!(window.contains("tt0000100"));
        assert!(window.contains("tt0000599"));
        assert_eq!(window.exclusions().len(), DUPLICATE_WINDOW);
    }

    #[test]
    fn duplicate_check_consults_most_recent_100() {
        let mut window = RecencyWindow::default();
        for i in 0..150 {
            window.push(format!("tt{i:07}"));
        }
        // Entry 49 is 101 entries back: outside the duplicate window.
        assert!(!window.is_recent("tt0000049"));
        // Entry 50 is exactly 100 back: inside.
        assert!(window.is_recent("tt0000050"));
        assert!(window.is_recent("tt0000149"));
    }

    #[test]
    fn push_truncates_from_the_front() {
        let mut window = RecencyWindow::default();
        for i in 0..(SEED_WINDOW + 10) {
            window.push(format!("id{i}"));
        }
        assert_eq!(window.len(), SEED_WINDOW);
        assert!(window.exclusions().contains(&format!("id{}", SEED_WINDOW + 9)));
    }

    #[test]
    fn exclusions_are_oldest_first() {
        let mut window = RecencyWindow::default();
        window.push("a".into());
        window.push("b".into());
        assert_eq!(window.exclusions(), vec!["a".to_string(), "b".to_string()]);
    }
}
