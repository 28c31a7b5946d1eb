//! Concept-to-metric normalization (C9): priority/fallback mapping from
//! XBRL concepts to standardized metrics.

pub mod mapper;

pub use mapper::ConceptMapper;
