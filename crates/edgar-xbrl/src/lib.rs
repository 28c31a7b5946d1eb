//! Native XBRL instance parsing into typed facts (C5) — no external
//! process dependency.

pub mod extractor;
pub mod instance;
pub mod presentation;

pub use extractor::extract_facts;
