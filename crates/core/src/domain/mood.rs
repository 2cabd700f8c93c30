use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoodId(pub i64);

impl fmt::Display for MoodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MoodId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<i64>()
            .map(MoodId)
            .map_err(|_| DomainError::InvariantViolation(format!("invalid mood id `{value}`")))
    }
}

/// Correlation key of the daily prompt message a mood answers (its Slack `ts`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadKey(pub String);

impl ThreadKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    GoodMood,
    AverageMood,
    BadMood,
}

impl Mood {
    pub const ALL: [Mood; 3] = [Mood::GoodMood, Mood::AverageMood, Mood::BadMood];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GoodMood => "good_mood",
            Self::AverageMood => "average_mood",
            Self::BadMood => "bad_mood",
        }
    }

    /// Human label, e.g. `good mood`.
    pub fn label(self) -> &'static str {
        match self {
            Self::GoodMood => "good mood",
            Self::AverageMood => "average mood",
            Self::BadMood => "bad mood",
        }
    }

    pub fn smiley(self) -> &'static str {
        match self {
            Self::GoodMood => ":smile:",
            Self::AverageMood => ":neutral_face:",
            Self::BadMood => ":rage:",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Self::GoodMood => "Good Mood :heart:",
            Self::AverageMood => "Meow :yellow_heart:",
            Self::BadMood => "Grr ! :black_heart:",
        }
    }

    /// Finer-grained labels offered in the mood modal.
    pub fn feelings(self) -> &'static [&'static str] {
        match self {
            Self::GoodMood => &["Happy", "Grateful", "Excited", "Proud", "Relaxed"],
            Self::AverageMood => &["Calm", "Tired", "Bored", "Distracted", "Meh"],
            Self::BadMood => &["Sad", "Stressed", "Angry", "Anxious", "Lonely"],
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "good_mood" => Ok(Self::GoodMood),
            "average_mood" => Ok(Self::AverageMood),
            "bad_mood" => Ok(Self::BadMood),
            other => Err(DomainError::UnknownMood(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMood {
    pub id: MoodId,
    pub user_id: UserId,
    pub mood: Mood,
    pub feeling: Option<String>,
    pub context: Option<String>,
    pub thread_ts: ThreadKey,
    pub created_at: DateTime<Utc>,
}

/// Normalizes a free-form field submitted by a user. Blank input carries no
/// information and is rejected so it never overwrites a stored value.
pub fn require_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyField { field });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{require_text, Mood, MoodId};
    use crate::errors::DomainError;

    #[test]
    fn mood_round_trips_through_wire_names() {
        for mood in Mood::ALL {
            assert_eq!(mood.as_str().parse::<Mood>(), Ok(mood));
        }
    }

    #[test]
    fn unknown_mood_is_a_validation_error() {
        assert_eq!(
            "happy_mood".parse::<Mood>(),
            Err(DomainError::UnknownMood("happy_mood".into()))
        );
    }

    #[test]
    fn every_mood_offers_feelings() {
        assert!(Mood::ALL.iter().all(|mood| !mood.feelings().is_empty()));
        assert!(Mood::BadMood.feelings().contains(&"Sad"));
    }

    #[test]
    fn blank_text_is_rejected_and_content_is_trimmed() {
        assert_eq!(
            require_text("context", "   "),
            Err(DomainError::EmptyField { field: "context" })
        );
        assert_eq!(require_text("feeling", " Sad "), Ok("Sad".to_string()));
    }

    #[test]
    fn mood_id_parses_from_metadata_fragment() {
        assert_eq!("42".parse::<MoodId>(), Ok(MoodId(42)));
        assert!("abc".parse::<MoodId>().is_err());
    }
}
