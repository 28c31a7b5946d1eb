//! HTML to Markdown conversion with page segmentation (C3).

pub mod converter;

pub use converter::{convert_filing_document, ConversionReport};
