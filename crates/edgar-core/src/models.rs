//! Domain entities from the data model: Company, Filing, Fact, Section,
//! StandardizedMetric, ConceptMapping, NormalizedMetric, Chunk and the
//! processing log. These are plain structs (no ORM derive macros) mapped
//! to and from SQLite rows by `edgar-store`.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Enumerated SEC form types the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormType {
    #[serde(rename = "10-K")]
    TenK,
    #[serde(rename = "10-K/A")]
    TenKA,
    #[serde(rename = "10-Q")]
    TenQ,
    #[serde(rename = "10-Q/A")]
    TenQA,
    #[serde(rename = "8-K")]
    EightK,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::TenK => "10-K",
            FormType::TenKA => "10-K/A",
            FormType::TenQ => "10-Q",
            FormType::TenQA => "10-Q/A",
            FormType::EightK => "8-K",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "10-K" => Some(FormType::TenK),
            "10-K/A" => Some(FormType::TenKA),
            "10-Q" => Some(FormType::TenQ),
            "10-Q/A" => Some(FormType::TenQA),
            "8-K" => Some(FormType::EightK),
            _ => None,
        }
    }

    /// Amendments rank ahead of originals when selecting the latest filing
    /// for a fiscal period (spec scenario S6).
    pub fn is_amendment(&self) -> bool {
        matches!(self, FormType::TenKA | FormType::TenQA)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(DownloadStatus::Pending),
            "completed" => Some(DownloadStatus::Completed),
            "failed" => Some(DownloadStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub cik: String,
    pub company_name: String,
    pub ticker: Option<String>,
    pub industry_code: Option<String>,
    pub fiscal_year_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filing {
    pub accession_number: String,
    pub cik: String,
    pub form_type: String,
    pub filing_date: NaiveDate,
    pub period_of_report: Option<NaiveDate>,
    pub acceptance_datetime: Option<NaiveDateTime>,
    pub has_xbrl: bool,
    pub local_storage_path: Option<String>,
    pub download_status: String,
    pub xbrl_processed: bool,
    pub sections_processed: bool,
    pub full_markdown: Option<String>,
    pub word_count: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Filing {
    /// Validates the cross-field invariant from the data model:
    /// `period_of_report <= filing_date` when both are present.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(period) = self.period_of_report {
            if period > self.filing_date {
                return Err(format!(
                    "period_of_report {period} is after filing_date {}",
                    self.filing_date
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodType {
    Instant,
    Duration,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Instant => "instant",
            PeriodType::Duration => "duration",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "instant" => Some(PeriodType::Instant),
            "duration" => Some(PeriodType::Duration),
            _ => None,
        }
    }
}

/// One XBRL fact: a concept tagged with a value, a period, and (optionally)
/// a dimensional slice.
#[derive(Debug, Clone)]
pub struct Fact {
    pub accession_number: String,
    pub concept_name: String,
    pub value: Option<BigDecimal>,
    pub value_text: Option<String>,
    pub unit: Option<String>,
    pub decimals: Option<i32>,
    pub period_type: PeriodType,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    /// Ordered key->value dimensional slice, canonicalized to a stable
    /// string for the uniqueness tuple; `None` means consolidated.
    pub dimensions: Option<Vec<(String, String)>>,
    pub is_custom: bool,
    pub is_negated: bool,
    pub parent_concept: Option<String>,
    pub depth: Option<i32>,
    pub label: Option<String>,
}

const US_GAAP_NAMESPACES: [&str; 3] = ["us-gaap", "dei", "ifrs"];

impl Fact {
    pub fn is_custom_namespace(concept_name: &str) -> bool {
        match concept_name.split_once(':') {
            Some((ns, _)) => !US_GAAP_NAMESPACES.contains(&ns),
            None => true,
        }
    }

    /// Canonical string form of the dimensions, used in the fact uniqueness
    /// tuple `(accession, concept, period_end, canonical(dimensions))`.
    pub fn canonical_dimensions(&self) -> String {
        match &self.dimensions {
            None => String::new(),
            Some(dims) if dims.is_empty() => String::new(),
            Some(dims) => {
                let mut sorted = dims.clone();
                sorted.sort();
                sorted
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("&")
            }
        }
    }

    pub fn is_consolidated(&self) -> bool {
        self.canonical_dimensions().is_empty()
    }

    /// Rejection rule: a fact with neither a numeric nor text value is
    /// dropped rather than persisted empty. Sanity invariant: |value| <= 1e15.
    pub fn validate(&self) -> Result<(), String> {
        if self.value.is_none() && self.value_text.is_none() {
            return Err(format!(
                "fact {} has neither numeric nor text value",
                self.concept_name
            ));
        }
        if let Some(v) = &self.value {
            let limit = BigDecimal::from(1_000_000_000_000_000i64);
            if v.abs() > limit {
                return Err(format!(
                    "fact {} value {v} exceeds sanity limit of 1e15",
                    self.concept_name
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub accession_number: String,
    pub section_type: String,
    pub section_title: Option<String>,
    pub content_markdown: String,
    pub word_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricCategory {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    PerShare,
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::IncomeStatement => "income-statement",
            MetricCategory::BalanceSheet => "balance-sheet",
            MetricCategory::CashFlow => "cash-flow",
            MetricCategory::PerShare => "per-share",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricDataType {
    Monetary,
    Shares,
    PerShare,
    Ratio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedMetric {
    pub metric_id: String,
    pub display_label: String,
    pub category: MetricCategory,
    pub data_type: MetricDataType,
}

/// An ordered rule linking a raw XBRL concept to a canonical metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptMapping {
    pub metric_id: String,
    pub concept_name: String,
    pub priority: i32,
    pub confidence_score: f64,
    pub applies_to_industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetric {
    pub ticker: String,
    pub fiscal_year: i32,
    pub fiscal_quarter: Option<i32>,
    pub metric_id: String,
    pub value: BigDecimal,
    pub source_concept: String,
    pub source_accession: String,
    pub confidence_score: f64,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub accession_number: String,
    pub section_type: String,
    pub chunk_index: i32,
    pub context_prefix: String,
    pub text: String,
    pub token_count: i64,
    pub contains_table: bool,
}

impl Chunk {
    pub fn make_chunk_id(accession: &str, item_key: &str, index: u32) -> String {
        let normalized_key: String = item_key
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        format!("{accession}_{normalized_key}_{index:04}")
    }
}

/// Pipeline stage a processing-log entry or data-quality issue is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStage {
    Fetch,
    Index,
    Markdown,
    Section,
    Xbrl,
    Merge,
    Normalize,
    Chunk,
    Reconcile,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Fetch => "fetch",
            ProcessingStage::Index => "index",
            ProcessingStage::Markdown => "markdown",
            ProcessingStage::Section => "section",
            ProcessingStage::Xbrl => "xbrl",
            ProcessingStage::Merge => "merge",
            ProcessingStage::Normalize => "normalize",
            ProcessingStage::Chunk => "chunk",
            ProcessingStage::Reconcile => "reconcile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Append-only audit record: either a pipeline-stage error/warning or a
/// data-quality issue surfaced by reconciliation.
#[derive(Debug, Clone)]
pub struct ProcessingLogEntry {
    pub accession_number: String,
    pub stage: ProcessingStage,
    pub severity: Severity,
    pub issue_type: String,
    pub description: String,
    pub affected_records: i64,
    pub created_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_canonical_dimensions_is_stable_under_ordering() {
        let a = Fact {
            accession_number: "x".into(),
            concept_name: "us-gaap:Assets".into(),
            value: None,
            value_text: Some("t".into()),
            unit: None,
            decimals: None,
            period_type: PeriodType::Instant,
            period_start: None,
            period_end: None,
            dimensions: Some(vec![("b".into(), "2".into()), ("a".into(), "1".into())]),
            is_custom: false,
            is_negated: false,
            parent_concept: None,
            depth: None,
            label: None,
        };
        assert_eq!(a.canonical_dimensions(), "a=1&b=2");
        assert!(!a.is_consolidated());
    }

    #[test]
    fn fact_with_no_value_fails_validation() {
        let f = Fact {
            accession_number: "x".into(),
            concept_name: "us-gaap:Assets".into(),
            value: None,
            value_text: None,
            unit: None,
            decimals: None,
            period_type: PeriodType::Instant,
            period_start: None,
            period_end: None,
            dimensions: None,
            is_custom: false,
            is_negated: false,
            parent_concept: None,
            depth: None,
            label: None,
        };
        assert!(f.validate().is_err());
    }

    #[test]
    fn is_custom_namespace_detects_non_gaap() {
        assert!(!Fact::is_custom_namespace("us-gaap:Assets"));
        assert!(!Fact::is_custom_namespace("dei:EntityRegistrantName"));
        assert!(Fact::is_custom_namespace("aapl:CustomConcept"));
    }

    #[test]
    fn chunk_id_normalizes_item_key() {
        assert_eq!(
            Chunk::make_chunk_id("0000320193-24-000001", "ITEM 1A", 3),
            "0000320193-24-000001_ITEM1A_0003"
        );
    }

    #[test]
    fn amendment_outranks_original() {
        assert!(FormType::TenKA.is_amendment());
        assert!(!FormType::TenK.is_amendment());
    }
}
