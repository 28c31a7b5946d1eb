//! Domain identifier normalization: CIK, accession number, ticker.
//!
//! Ported from the date/CIK/accession utilities in the teacher's
//! `econ-graph-sec-crawler::utils` module, generalized into fallible
//! constructors around newtypes instead of freestanding string functions.

use crate::error::{EdgarError, EdgarResult};
use std::fmt;

/// A ten-digit, left-zero-padded SEC Central Index Key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cik(String);

impl Cik {
    /// Parses an arbitrary-digit CIK, left-padding to 10 digits.
    pub fn parse(raw: &str) -> EdgarResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(EdgarError::validation(format!(
                "invalid CIK (non-digit input): {raw}"
            )));
        }
        if trimmed.len() > 10 {
            return Err(EdgarError::validation(format!(
                "invalid CIK (too many digits): {raw}"
            )));
        }
        Ok(Cik(format!("{trimmed:0>10}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The CIK with leading zeros stripped, as used in EDGAR archive URLs.
    pub fn unpadded(&self) -> &str {
        self.0.trim_start_matches('0')
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Components of a canonical accession number `DDDDDDDDDD-YY-NNNNNN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessionNumber {
    cik: String,
    year: String,
    sequence: String,
}

impl AccessionNumber {
    /// Accepts either the canonical dashed form or the 18-digit undashed
    /// form EDGAR also produces, and normalizes to the canonical form.
    pub fn parse(raw: &str) -> EdgarResult<Self> {
        let raw = raw.trim();
        if raw.contains('-') {
            let parts: Vec<&str> = raw.split('-').collect();
            if parts.len() != 3 || parts[0].len() != 10 || parts[1].len() != 2 || parts[2].len() != 6
            {
                return Err(EdgarError::validation(format!(
                    "invalid accession number: {raw}"
                )));
            }
            if !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
                return Err(EdgarError::validation(format!(
                    "invalid accession number: {raw}"
                )));
            }
            return Ok(AccessionNumber {
                cik: parts[0].to_string(),
                year: parts[1].to_string(),
                sequence: parts[2].to_string(),
            });
        }

        if raw.len() == 18 && raw.chars().all(|c| c.is_ascii_digit()) {
            return Ok(AccessionNumber {
                cik: raw[0..10].to_string(),
                year: raw[10..12].to_string(),
                sequence: raw[12..18].to_string(),
            });
        }

        Err(EdgarError::validation(format!(
            "invalid accession number shape: {raw}"
        )))
    }

    pub fn canonical(&self) -> String {
        format!("{}-{}-{}", self.cik, self.year, self.sequence)
    }

    pub fn undashed(&self) -> String {
        format!("{}{}{}", self.cik, self.year, self.sequence)
    }

    pub fn cik(&self) -> EdgarResult<Cik> {
        Cik::parse(&self.cik)
    }
}

impl fmt::Display for AccessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// An upper-cased stock ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> EdgarResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EdgarError::validation("empty ticker"));
        }
        Ok(Ticker(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cik_pads_to_ten_digits() {
        assert_eq!(Cik::parse("320193").unwrap().as_str(), "0000320193");
        assert_eq!(Cik::parse("0000320193").unwrap().as_str(), "0000320193");
    }

    #[test]
    fn cik_rejects_non_digits() {
        assert!(Cik::parse("abc123").is_err());
        assert!(Cik::parse("12345678901").is_err());
    }

    #[test]
    fn cik_unpads() {
        assert_eq!(Cik::parse("320193").unwrap().unpadded(), "320193");
    }

    #[test]
    fn accession_round_trips_from_undashed() {
        let acc = AccessionNumber::parse("000032019324000001").unwrap();
        assert_eq!(acc.canonical(), "0000320193-24-000001");
    }

    #[test]
    fn accession_round_trips_from_canonical() {
        let acc = AccessionNumber::parse("0000320193-24-000001").unwrap();
        assert_eq!(acc.canonical(), "0000320193-24-000001");
        assert_eq!(acc.undashed(), "000032019324000001");
    }

    #[test]
    fn accession_rejects_other_shapes() {
        assert!(AccessionNumber::parse("not-an-accession").is_err());
        assert!(AccessionNumber::parse("12345").is_err());
    }

    #[test]
    fn ticker_upper_cases() {
        assert_eq!(Ticker::parse("aapl").unwrap().as_str(), "AAPL");
    }
}
