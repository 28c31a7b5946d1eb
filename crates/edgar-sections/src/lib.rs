//! Adaptive three-tier section segmentation (C4): store lookup, regex
//! sweep, optional pluggable Tier-3 finder.

pub mod patterns;
pub mod segmenter;

pub use segmenter::{NullSectionFinder, SectionFinder, SectionMatch, Segmenter, Tier, TierStats};
