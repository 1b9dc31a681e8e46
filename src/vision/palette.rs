//! Label/color similarity heuristic
//!
//! Compares the annotation service's view of two images: Jaccard overlap
//! of the detected label sets blended with nearest-neighbour distance
//! between the dominant-color palettes. Higher fidelity than the local
//! average hash, but only available when the annotation service is.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::{round_score, verdict_for, FlagKey, SimilarityFlag, SimilarityReport};

/// Weight of the label-set similarity in the blended score.
const LABEL_WEIGHT: f64 = 0.7;
/// Weight of the palette similarity in the blended score.
const COLOR_WEIGHT: f64 = 0.3;
/// Maximum Euclidean distance between two RGB colors (√(3·255²) ≈ 441.7,
/// capped at 442 for normalization).
const MAX_RGB_DISTANCE: f64 = 442.0;
/// Number of dominant colors considered per palette.
const PALETTE_DEPTH: usize = 5;

/// One dominant color reported by the annotation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominantColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Annotation-service output for one image: text labels plus dominant
/// colors ordered by prominence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAnnotation {
    pub labels: Vec<String>,
    pub colors: Vec<DominantColor>,
}

fn logo_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)logo|brand|trademark").expect("logo token pattern"))
}

/// Compare two annotated images.
///
/// The blended score is `0.7 * label similarity + 0.3 * color similarity`.
/// Any deviation from a perfect score raises the packaging-layout flag;
/// the logo flag is raised unless both label sets carry a logo-ish token.
pub fn compare(reference: &ImageAnnotation, candidate: &ImageAnnotation) -> SimilarityReport {
    let label_similarity = jaccard(&reference.labels, &candidate.labels);
    let color_similarity = palette_similarity(&reference.colors, &candidate.colors);
    let similarity = round_score(LABEL_WEIGHT * label_similarity + COLOR_WEIGHT * color_similarity);

    let both_have_logo =
        has_logo_token(&reference.labels) && has_logo_token(&candidate.labels);

    SimilarityReport {
        similarity,
        flags: vec![
            SimilarityFlag {
                key: FlagKey::PackagingLayoutDiff,
                present: similarity < 1.0,
            },
            SimilarityFlag {
                key: FlagKey::LogoMismatch,
                present: !both_have_logo,
            },
        ],
        verdict: verdict_for(similarity),
    }
}

/// Jaccard index of the lower-cased label sets. Defined as 0 when both
/// sets are empty.
fn jaccard(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<String> = a.iter().map(|l| l.to_lowercase()).collect();
    let set_b: HashSet<String> = b.iter().map(|l| l.to_lowercase()).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Average nearest-neighbour similarity of the reference palette against
/// the candidate palette, both truncated to their top 5 colors. Defined
/// as 0 when either palette is empty.
fn palette_similarity(reference: &[DominantColor], candidate: &[DominantColor]) -> f64 {
    let reference: Vec<DominantColor> = reference.iter().copied().take(PALETTE_DEPTH).collect();
    let candidate: Vec<DominantColor> = candidate.iter().copied().take(PALETTE_DEPTH).collect();

    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let total: f64 = reference
        .iter()
        .map(|ref_color| {
            let nearest = candidate
                .iter()
                .map(|cand_color| rgb_distance(*ref_color, *cand_color))
                .fold(f64::INFINITY, f64::min);
            1.0 - nearest.min(MAX_RGB_DISTANCE) / MAX_RGB_DISTANCE
        })
        .sum();

    total / reference.len() as f64
}

fn rgb_distance(a: DominantColor, b: DominantColor) -> f64 {
    let dr = a.red as f64 - b.red as f64;
    let dg = a.green as f64 - b.green as f64;
    let db = a.blue as f64 - b.blue as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

fn has_logo_token(labels: &[String]) -> bool {
    labels.iter().any(|label| logo_token_re().is_match(label))
}
