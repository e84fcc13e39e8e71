//! Article domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// News category covered by one video segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    International,
    National,
    Karnataka,
    TamilNadu,
    Andhra,
    Kerala,
}

impl Category {
    /// All categories, in the order segments appear in the video
    pub const ALL: [Category; 6] = [
        Category::International,
        Category::National,
        Category::Karnataka,
        Category::TamilNadu,
        Category::Andhra,
        Category::Kerala,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::International => "international",
            Category::National => "national",
            Category::Karnataka => "karnataka",
            Category::TamilNadu => "tamilnadu",
            Category::Andhra => "andhra",
            Category::Kerala => "kerala",
        }
    }

    /// Human readable name used in titles and descriptions
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::International => "International News",
            Category::National => "National News",
            Category::Karnataka => "Karnataka News",
            Category::TamilNadu => "Tamil Nadu News",
            Category::Andhra => "Andhra Pradesh News",
            Category::Kerala => "Kerala News",
        }
    }

    /// Nominal segment length in seconds.
    ///
    /// Weights are rescaled so that the selected segments fill the target
    /// video duration exactly. Karnataka is the priority segment.
    pub fn segment_weight(&self) -> f64 {
        match self {
            Category::Karnataka => 10.0,
            _ => 8.0,
        }
    }

    pub fn is_regional(&self) -> bool {
        matches!(
            self,
            Category::Karnataka | Category::TamilNadu | Category::Andhra | Category::Kerala
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// A candidate news article
///
/// Produced by a news source, read by the processing stage, dropped when the
/// run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Identifier of the feed or API the article came from
    pub source_id: String,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    pub url: Option<String>,
    pub engagement_score: f32,
}

const HIGH_ENGAGEMENT: [&str; 6] = ["breaking", "urgent", "exclusive", "scandal", "victory", "defeat"];
const MEDIUM_ENGAGEMENT: [&str; 6] = ["announces", "launches", "opens", "closes", "wins", "loses"];
const LOW_ENGAGEMENT: [&str; 5] = ["meeting", "discussion", "routine", "regular", "annual"];

/// Scores how likely a headline is to hold attention, in `0.1..=1.0`
pub fn engagement_score(title: &str) -> f32 {
    let title = title.to_lowercase();
    let hits = |words: &[&str]| words.iter().filter(|w| title.contains(*w)).count() as f32;

    let score =
        0.5 + 0.3 * hits(&HIGH_ENGAGEMENT) + 0.2 * hits(&MEDIUM_ENGAGEMENT) - 0.1 * hits(&LOW_ENGAGEMENT);

    score.clamp(0.1, 1.0)
}

impl Article {
    /// Text handed to the summarizer: title followed by body
    pub fn content(&self) -> String {
        if self.body.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.body)
        }
    }
}
