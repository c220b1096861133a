//! Choosing which image represents a hole.
//!
//! Candidates are the hole's ready still images, narrowed to stylized ones
//! whenever at least one exists. One candidate is drawn at random with
//! probability proportional to `max(score, MIN_WEIGHT)`, so a heavily
//! downvoted image still shows up occasionally.

use fairway_db::models::HoleImage;
use rand::Rng;

/// Floor applied to every candidate's score.
pub const MIN_WEIGHT: f64 = 0.05;

/// Narrow ready still images to the display candidates.
///
/// Input order is preserved, so newest-first input gives a newest-first listing.
pub fn display_candidates(ready_images: Vec<HoleImage>) -> Vec<HoleImage> {
    let images: Vec<HoleImage> = ready_images.into_iter().filter(HoleImage::is_image).collect();
    if images.iter().any(HoleImage::is_stylized) {
        images.into_iter().filter(HoleImage::is_stylized).collect()
    } else {
        images
    }
}

pub fn weight(image: &HoleImage) -> f64 {
    image.score().max(MIN_WEIGHT)
}

/// Draw one candidate, weighted by score.
///
/// Returns `None` only for an empty slice.
pub fn pick_weighted<'a, R: Rng + ?Sized>(
    candidates: &'a [HoleImage],
    rng: &mut R,
) -> Option<&'a HoleImage> {
    let first = candidates.first()?;
    let total: f64 = candidates.iter().map(weight).sum();
    if !(total > 0.0) {
        return Some(first);
    }

    let mut remaining = rng.gen_range(0.0..total);
    for candidate in candidates {
        remaining -= weight(candidate);
        if remaining <= 0.0 {
            return Some(candidate);
        }
    }
    // Float rounding can leave a sliver after the last subtraction.
    Some(first)
}
