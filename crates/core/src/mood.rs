//! Raw wellness events: mood samples, journal entries and goals.
//!
//! All of these are immutable once recorded; corrections are new entries.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked mood. Declaration order is significant: it breaks ties when
/// picking a dominant mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Sad,
    Anxious,
    Calm,
    Energetic,
    Tired,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Anxious,
        Mood::Calm,
        Mood::Energetic,
        Mood::Tired,
        Mood::Neutral,
    ];

    /// Valence weight used to turn a mood sample into a signed value.
    pub fn weight(&self) -> f64 {
        match self {
            Mood::Happy => 1.0,
            Mood::Calm => 0.8,
            Mood::Energetic => 0.6,
            Mood::Neutral => 0.0,
            Mood::Tired => -0.4,
            Mood::Anxious => -0.6,
            Mood::Sad => -0.8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Calm => "calm",
            Mood::Energetic => "energetic",
            Mood::Tired => "tired",
            Mood::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mood intensity on a 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub fn new(value: u8) -> Result<Self> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Validation(format!("intensity must be 1..=5, got {value}")))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }
}

impl TryFrom<u8> for Intensity {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Intensity::new(value)
    }
}

impl From<Intensity> for u8 {
    fn from(i: Intensity) -> u8 {
        i.0
    }
}

/// A single mood sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub timestamp: DateTime<Utc>,
    pub mood: Mood,
    pub intensity: Intensity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MoodEntry {
    pub fn new(timestamp: DateTime<Utc>, mood: Mood, intensity: u8) -> Result<Self> {
        Ok(Self {
            timestamp,
            mood,
            intensity: Intensity::new(intensity)?,
            note: None,
        })
    }

    /// `weight(mood) * intensity`
    pub fn weighted_value(&self) -> f64 {
        self.mood.weight() * self.intensity.as_f64()
    }
}

/// Tone a journal entry was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalTone {
    Professional,
    Friendly,
    Empathetic,
    Casual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<JournalTone>,
    /// -1.0 ..= 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: GoalStatus,
}
