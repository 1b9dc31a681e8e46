//! Vision Layer
//!
//! Perceptual similarity between a reference product image and a
//! user-captured label image. Two interchangeable strategies share one
//! report contract:
//! - Average-hash comparison (local, always available)
//! - Label/color heuristic (needs the external annotation service)

pub mod ahash;
pub mod palette;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ahash::decode_image;
pub use palette::{DominantColor, ImageAnnotation};

/// Similarity at or above this score is a likely match.
pub const MATCH_THRESHOLD: f64 = 0.85;
/// Similarity at or above this score (but below [`MATCH_THRESHOLD`])
/// is a likely match with warnings.
pub const WARN_THRESHOLD: f64 = 0.70;

/// Errors raised while turning image bytes into pixel data.
///
/// These are terminal for a comparison: an undecodable image cannot be
/// recovered by switching strategies.
#[derive(Debug, Error)]
pub enum ImageProcessingError {
    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Coarse similarity bucket derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    LikelyMatch,
    LikelyMatchWithWarnings,
    Mismatch,
}

/// Which strategy produced a report. The flag set differs per strategy,
/// so callers must not assume a fixed set across strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Local 8x8 average-hash comparison
    AverageHash,
    /// Label-set and dominant-color heuristic
    LabelColor,
}

/// Named boolean difference indicator attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKey {
    PackagingLayoutDiff,
    LogoMismatch,
}

/// One difference flag in a similarity report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityFlag {
    pub key: FlagKey,
    pub present: bool,
}

/// Outcome of comparing two images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Normalized similarity in [0, 1], rounded to 2 decimals
    pub similarity: f64,
    /// Difference flags; which keys appear depends on the strategy
    pub flags: Vec<SimilarityFlag>,
    /// Bucket derived from `similarity` via fixed thresholds
    pub verdict: Verdict,
}

/// Map a similarity score to its verdict bucket. Both thresholds are
/// inclusive lower bounds.
pub fn verdict_for(similarity: f64) -> Verdict {
    if similarity >= MATCH_THRESHOLD {
        Verdict::LikelyMatch
    } else if similarity >= WARN_THRESHOLD {
        Verdict::LikelyMatchWithWarnings
    } else {
        Verdict::Mismatch
    }
}

/// Round a score to two decimal places for reporting.
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
