//! Ties the instance parser and the optional presentation tree together
//! into `edgar_core::models::Fact` rows, applying spec.md section 4.5's
//! rejection and derivation rules.

use crate::instance::{parse_instance, ParsedInstance, RawFact, XbrlPeriod};
use crate::presentation::{parse_presentation_linkbase, PresentationTree};
use bigdecimal::BigDecimal;
use edgar_core::models::{Fact, PeriodType};
use edgar_core::EdgarResult;
use std::str::FromStr;
use tracing::debug;

/// Parses an XBRL instance document (and, if present, its presentation
/// linkbase) into the filing's facts. Facts with neither a numeric nor a
/// text value are dropped per the rejection rule, never persisted empty.
pub fn extract_facts(
    accession_number: &str,
    instance_xml: &str,
    presentation_xml: Option<&str>,
) -> EdgarResult<Vec<Fact>> {
    let (instance, raw_facts) = parse_instance(instance_xml)?;
    let presentation = presentation_xml.and_then(parse_presentation_linkbase);

    let raw_count = raw_facts.len();
    let facts: Vec<Fact> = raw_facts
        .into_iter()
        .filter_map(|raw| build_fact(accession_number, &raw, &instance, presentation.as_ref()))
        .collect();
    debug!(
        accession_number,
        raw_count,
        kept = facts.len(),
        has_presentation = presentation.is_some(),
        "extracted xbrl facts"
    );

    Ok(facts)
}

fn build_fact(
    accession_number: &str,
    raw: &RawFact,
    instance: &ParsedInstance,
    presentation: Option<&PresentationTree>,
) -> Option<Fact> {
    let context = instance.contexts.get(&raw.context_ref)?;
    let unit = raw
        .unit_ref
        .as_ref()
        .and_then(|id| instance.units.get(id))
        .map(|u| u.measure.clone());

    let trimmed = raw.text.trim();
    let (value, value_text) = match BigDecimal::from_str(trimmed) {
        Ok(parsed) => (Some(parsed), None),
        Err(_) if !trimmed.is_empty() => (None, Some(trimmed.to_string())),
        Err(_) => (None, None),
    };

    if value.is_none() && value_text.is_none() {
        return None;
    }

    let (period_type, period_start, period_end) = match &context.period {
        XbrlPeriod::Instant(date) => (PeriodType::Instant, None, Some(*date)),
        XbrlPeriod::Duration { start, end } => (PeriodType::Duration, Some(*start), Some(*end)),
    };

    let dimensions = if context.dimensions.is_empty() {
        None
    } else {
        Some(context.dimensions.clone())
    };

    let is_custom = Fact::is_custom_namespace(&raw.concept_name);
    let is_negated = raw.sign.as_deref() == Some("-");

    let presentation_node = presentation.and_then(|tree| tree.get(&raw.concept_name));

    Some(Fact {
        accession_number: accession_number.to_string(),
        concept_name: raw.concept_name.clone(),
        value,
        value_text,
        unit,
        decimals: raw.decimals,
        period_type,
        period_start,
        period_end,
        dimensions,
        is_custom,
        is_negated,
        parent_concept: presentation_node.and_then(|n| n.parent_concept.clone()),
        depth: presentation_node.map(|n| n.depth),
        label: presentation_node.and_then(|n| n.label.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<xbrl xmlns:us-gaap="http://fasb.org/us-gaap" xmlns:xbrli="http://www.xbrl.org/2003/instance">
  <xbrli:context id="AsOf2024">
    <xbrli:period>
      <xbrli:instant>2024-12-31</xbrli:instant>
    </xbrli:period>
  </xbrli:context>
  <xbrli:unit id="usd">
    <xbrli:measure>iso4217:USD</xbrli:measure>
  </xbrli:unit>
  <us-gaap:Assets contextRef="AsOf2024" unitRef="usd" decimals="-6">1000000</us-gaap:Assets>
  <us-gaap:CommitmentsAndContingencies contextRef="AsOf2024" unitRef="usd" decimals="-6"></us-gaap:CommitmentsAndContingencies>
  <custom:FooBarMetric contextRef="AsOf2024" unitRef="usd">42</custom:FooBarMetric>
</xbrl>"#;

    #[test]
    fn extracts_numeric_fact_with_unit_and_period() {
        let facts = extract_facts("0000320193-24-000001", SAMPLE, None).unwrap();
        let assets = facts.iter().find(|f| f.concept_name.ends_with("Assets")).unwrap();
        assert_eq!(assets.value, Some(BigDecimal::from(1_000_000)));
        assert_eq!(assets.unit.as_deref(), Some("USD"));
        assert_eq!(assets.period_type, PeriodType::Instant);
        assert!(!assets.is_custom);
    }

    #[test]
    fn drops_facts_with_neither_numeric_nor_text_value() {
        let facts = extract_facts("0000320193-24-000001", SAMPLE, None).unwrap();
        assert!(!facts.iter().any(|f| f.concept_name.contains("CommitmentsAndContingencies")));
    }

    #[test]
    fn custom_namespace_concept_is_flagged() {
        let facts = extract_facts("0000320193-24-000001", SAMPLE, None).unwrap();
        let custom = facts.iter().find(|f| f.concept_name.contains("FooBarMetric")).unwrap();
        assert!(custom.is_custom);
    }
}
