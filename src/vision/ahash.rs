//! Average-hash image similarity
//!
//! Renders each image to an 8x8 grayscale grid, thresholds every cell
//! against the grid mean to build a 64-bit fingerprint, and scores the
//! pair by hamming distance. Coarse by construction, but it needs no
//! external service and tolerates resizing and recompression.

use image::{imageops::FilterType, DynamicImage};
use tracing::debug;

use super::{
    round_score, verdict_for, FlagKey, ImageProcessingError, SimilarityFlag, SimilarityReport,
};

/// Side length of the hash grid; the fingerprint has HASH_SIZE^2 bits.
const HASH_SIZE: u32 = 8;
/// Number of bits in a fingerprint.
const HASH_BITS: u32 = HASH_SIZE * HASH_SIZE;

/// Decode an in-memory image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImageProcessingError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Compute the 64-bit average-hash fingerprint of an image.
///
/// Bits are assigned in raster order (left-to-right, top-to-bottom):
/// bit i is set when cell i's luminance is at or above the grid mean.
pub fn fingerprint(img: &DynamicImage) -> u64 {
    let grid = img
        .resize_exact(HASH_SIZE, HASH_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mut luma = [0.0f64; (HASH_BITS) as usize];
    for (i, pixel) in grid.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        luma[i] = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    }

    let mean = luma.iter().sum::<f64>() / HASH_BITS as f64;

    let mut hash = 0u64;
    for (i, value) in luma.iter().enumerate() {
        if *value >= mean {
            hash |= 1u64 << i;
        }
    }
    hash
}

/// Exact hamming distance between two fingerprints (popcount of XOR).
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Compare two decoded images by average hash.
pub fn compare(reference: &DynamicImage, candidate: &DynamicImage) -> SimilarityReport {
    let distance = hamming(fingerprint(reference), fingerprint(candidate));
    let similarity = round_score(1.0 - distance as f64 / HASH_BITS as f64);

    debug!(distance, similarity, "average-hash comparison");

    SimilarityReport {
        similarity,
        flags: vec![SimilarityFlag {
            key: FlagKey::PackagingLayoutDiff,
            present: distance > 0,
        }],
        verdict: verdict_for(similarity),
    }
}
