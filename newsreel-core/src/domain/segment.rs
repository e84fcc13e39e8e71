//! Processed segment domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::article::Category;

/// One news item as it moves through a run
///
/// Created by the processing stage and filled in by each following stage.
/// Owned by a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedSegment {
    pub category: Category,
    /// Title of the source article
    pub headline: String,
    /// Spoken-length summary in the source language
    pub summary: String,
    /// Summary in the target language
    pub translation: Option<String>,
    pub audio: Option<AudioRef>,
    /// Images shown during the segment, in display order
    pub images: Vec<ImageRef>,
    /// Seconds of the final video allotted to this segment
    pub duration_seconds: f64,
}

impl ProcessedSegment {
    pub fn new(
        category: Category,
        headline: impl Into<String>,
        summary: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            category,
            headline: headline.into(),
            summary: summary.into(),
            translation: None,
            audio: None,
            images: Vec::new(),
            duration_seconds,
        }
    }

    /// Text to narrate: the translation when present, otherwise the summary
    pub fn narration(&self) -> &str {
        self.translation.as_deref().unwrap_or(&self.summary)
    }
}

/// Narration audio rendered for a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRef {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// A stock image selected for a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Provider specific photo id
    pub id: String,
    /// Provider name (e.g. `unsplash`, `pexels`)
    pub provider: String,
    pub url: String,
    pub description: Option<String>,
    /// Downloaded copy in the media cache
    pub local_path: Option<PathBuf>,
}

/// Splits `target_seconds` between categories proportionally to their weights
///
/// The returned durations are in the same order as `categories` and sum to
/// `target_seconds` (up to floating point error).
pub fn allocate_durations(categories: &[Category], target_seconds: f64) -> Vec<f64> {
    let total: f64 = categories.iter().map(|c| c.segment_weight()).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    categories
        .iter()
        .map(|c| c.segment_weight() / total * target_seconds)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_durations_fills_target() {
        let durations = allocate_durations(&Category::ALL, 60.0);
        let sum: f64 = durations.iter().sum();
        assert_eq!(durations.len(), 6);
        assert!((sum - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocate_durations_priority_segment_is_longer() {
        let durations = allocate_durations(&[Category::National, Category::Karnataka], 36.0);
        assert!((durations[0] - 16.0).abs() < 1e-9);
        assert!((durations[1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocate_durations_empty() {
        assert!(allocate_durations(&[], 60.0).is_empty());
    }

    #[test]
    fn test_narration_prefers_translation() {
        let mut segment = ProcessedSegment::new(Category::Kerala, "Title", "summary", 8.0);
        assert_eq!(segment.narration(), "summary");

        segment.translation = Some("ಸುದ್ದಿ".to_string());
        assert_eq!(segment.narration(), "ಸುದ್ದಿ");
    }
}
