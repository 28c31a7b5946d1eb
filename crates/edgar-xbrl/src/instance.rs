//! Event-driven XBRL instance document parsing, in the teacher's
//! `quick-xml` idiom (a `Reader` driven by a `loop { match reader.read_event() }`
//! rather than a DOM), since instance documents can run tens of megabytes
//! and the teacher's own large-file parsing favors streaming.

use chrono::NaiveDate;
use edgar_core::{EdgarError, EdgarResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XbrlPeriod {
    Instant(NaiveDate),
    Duration { start: NaiveDate, end: NaiveDate },
}

impl XbrlPeriod {
    pub fn end(&self) -> NaiveDate {
        match self {
            XbrlPeriod::Instant(d) => *d,
            XbrlPeriod::Duration { end, .. } => *end,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            XbrlPeriod::Instant(_) => None,
            XbrlPeriod::Duration { start, .. } => Some(*start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XbrlContext {
    pub id: String,
    pub period: XbrlPeriod,
    /// Ordered `(dimension, member)` pairs, local names only.
    pub dimensions: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XbrlUnit {
    pub id: String,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFact {
    /// `prefix:local`, e.g. `us-gaap:Assets`.
    pub concept_name: String,
    pub context_ref: String,
    pub unit_ref: Option<String>,
    pub decimals: Option<i32>,
    pub sign: Option<String>,
    pub text: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedInstance {
    pub contexts: HashMap<String, XbrlContext>,
    pub units: HashMap<String, XbrlUnit>,
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

fn element_name(e: &quick_xml::events::BytesStart) -> EdgarResult<String> {
    std::str::from_utf8(e.name().as_ref())
        .map(|s| s.to_string())
        .map_err(|e| EdgarError::parse(format!("non-utf8 element name: {e}")))
}

fn attr_value(e: &quick_xml::events::BytesStart, name: &str) -> EdgarResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| EdgarError::parse(format!("malformed attribute: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| EdgarError::parse(format!("non-utf8 attribute name: {e}")))?;
        if key == name || local_name(key) == name {
            let value = attr
                .unescape_value()
                .map_err(|e| EdgarError::parse(format!("malformed attribute value: {e}")))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn parse_date(raw: &str) -> EdgarResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| EdgarError::parse(format!("invalid XBRL date {raw:?}: {e}")))
}

/// Parses one XBRL instance document into contexts, units, and raw facts.
/// Facts are returned in document order; callers resolve them against the
/// context/unit maps and a presentation tree downstream.
pub fn parse_instance(xml: &str) -> EdgarResult<(ParsedInstance, Vec<RawFact>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut instance = ParsedInstance::default();
    let mut facts = Vec::new();

    let mut current_context: Option<String> = None;
    let mut current_context_dims: Vec<(String, String)> = Vec::new();
    let mut period_instant: Option<NaiveDate> = None;
    let mut period_start: Option<NaiveDate> = None;
    let mut period_end: Option<NaiveDate> = None;
    let mut in_segment = false;
    let mut pending_dimension: Option<String> = None;
    let mut pending_period_tag: Option<String> = None;

    let mut current_unit: Option<String> = None;
    let mut unit_measure: Option<String> = None;

    let mut current_fact: Option<(String, Option<String>, Option<String>, Option<i32>, Option<String>)> =
        None;
    let mut fact_text = String::new();

    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| EdgarError::parse(format!("xml error: {e}")))?;

        match event {
            Event::Eof => break,
            Event::Start(e) => {
                let name = element_name(&e)?;
                let local = local_name(&name).to_string();

                match local.as_str() {
                    "context" => {
                        current_context = attr_value(&e, "id")?;
                        current_context_dims.clear();
                        period_instant = None;
                        period_start = None;
                        period_end = None;
                    }
                    "segment" | "scenario" => in_segment = true,
                    "explicitMember" if in_segment => {
                        pending_dimension = attr_value(&e, "dimension")?
                            .map(|d| local_name(&d).to_string());
                    }
                    "instant" | "startDate" | "endDate" if current_context.is_some() => {
                        pending_period_tag = Some(local.clone());
                    }
                    "unit" => {
                        current_unit = attr_value(&e, "id")?;
                        unit_measure = None;
                    }
                    _ => {
                        if current_context.is_none() && current_unit.is_none() {
                            // A fact element: anything not a context/unit child,
                            // outside xbrli namespace bookkeeping.
                            if !matches!(
                                local.as_str(),
                                "xbrl" | "schemaRef" | "measure" | "instant" | "startDate"
                                    | "endDate" | "entity" | "identifier" | "period"
                            ) {
                                let decimals = attr_value(&e, "decimals")?
                                    .and_then(|d| d.parse::<i32>().ok());
                                let sign = attr_value(&e, "sign")?;
                                current_fact = Some((
                                    name.clone(),
                                    attr_value(&e, "contextRef")?,
                                    attr_value(&e, "unitRef")?,
                                    decimals,
                                    sign,
                                ));
                                fact_text.clear();
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e)?;
                let local = local_name(&name).to_string();
                if local == "explicitMember" && in_segment {
                    // A self-closing explicitMember carries no member text;
                    // nothing to record.
                } else if current_context.is_none() && current_unit.is_none() {
                    let decimals = attr_value(&e, "decimals")?.and_then(|d| d.parse::<i32>().ok());
                    let sign = attr_value(&e, "sign")?;
                    facts.push(RawFact {
                        concept_name: name,
                        context_ref: attr_value(&e, "contextRef")?.unwrap_or_default(),
                        unit_ref: attr_value(&e, "unitRef")?,
                        decimals,
                        sign,
                        text: String::new(),
                    });
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| EdgarError::parse(format!("malformed text: {e}")))?;
                let text = text.trim();
                if current_fact.is_some() {
                    fact_text.push_str(text);
                } else if current_unit.is_some() {
                    if !text.is_empty() {
                        unit_measure = Some(local_name(text).to_string());
                    }
                } else if pending_dimension.is_some() {
                    if let Some(dim) = pending_dimension.take() {
                        current_context_dims.push((dim, local_name(text).to_string()));
                    }
                } else if let Some(tag) = pending_period_tag.take() {
                    if let Ok(date) = parse_date(text) {
                        match tag.as_str() {
                            "instant" => period_instant = Some(date),
                            "startDate" => period_start = Some(date),
                            "endDate" => period_end = Some(date),
                            _ => {}
                        }
                    }
                }
            }
            Event::End(e) => {
                let name = element_name(&e)?;
                let local = local_name(&name).to_string();

                match local.as_str() {
                    "context" => {
                        if let Some(id) = current_context.take() {
                            let period = if let Some(end) = period_end {
                                XbrlPeriod::Duration {
                                    start: period_start.unwrap_or(end),
                                    end,
                                }
                            } else if let Some(instant) = period_instant {
                                XbrlPeriod::Instant(instant)
                            } else {
                                continue;
                            };
                            current_context_dims.sort();
                            instance.contexts.insert(
                                id.clone(),
                                XbrlContext {
                                    id,
                                    period,
                                    dimensions: std::mem::take(&mut current_context_dims),
                                },
                            );
                        }
                    }
                    "segment" | "scenario" => in_segment = false,
                    "unit" => {
                        if let Some(id) = current_unit.take() {
                            if let Some(measure) = unit_measure.take() {
                                instance
                                    .units
                                    .insert(id.clone(), XbrlUnit { id, measure });
                            }
                        }
                    }
                    _ => {
                        if let Some((concept_name, context_ref, unit_ref, decimals, sign)) =
                            current_fact.take()
                        {
                            if local_name(&concept_name) == local {
                                facts.push(RawFact {
                                    concept_name,
                                    context_ref: context_ref.unwrap_or_default(),
                                    unit_ref,
                                    decimals,
                                    sign,
                                    text: fact_text.clone(),
                                });
                            } else {
                                // Mismatched end tag inside a fact's own text
                                // (shouldn't happen in well-formed XML); put it
                                // back so the real End event closes it.
                                current_fact =
                                    Some((concept_name, context_ref, unit_ref, decimals, sign));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((instance, facts))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<xbrl xmlns:us-gaap="http://fasb.org/us-gaap" xmlns:xbrli="http://www.xbrl.org/2003/instance">
  <xbrli:context id="FY2024">
    <xbrli:period>
      <xbrli:startDate>2024-01-01</xbrli:startDate>
      <xbrli:endDate>2024-12-31</xbrli:endDate>
    </xbrli:period>
  </xbrli:context>
  <xbrli:context id="AsOf2024">
    <xbrli:period>
      <xbrli:instant>2024-12-31</xbrli:instant>
    </xbrli:period>
  </xbrli:context>
  <xbrli:unit id="usd">
    <xbrli:measure>iso4217:USD</xbrli:measure>
  </xbrli:unit>
  <us-gaap:Assets contextRef="AsOf2024" unitRef="usd" decimals="-6">1000000</us-gaap:Assets>
  <us-gaap:Revenues contextRef="FY2024" unitRef="usd" decimals="-3">500000</us-gaap:Revenues>
</xbrl>"#;

    #[test]
    fn parses_contexts_units_and_facts() {
        let (instance, facts) = parse_instance(SAMPLE).unwrap();
        assert_eq!(instance.contexts.len(), 2);
        assert_eq!(instance.units.len(), 1);
        assert_eq!(facts.len(), 2);

        let assets = facts.iter().find(|f| f.concept_name.ends_with("Assets")).unwrap();
        assert_eq!(assets.context_ref, "AsOf2024");
        assert_eq!(assets.text, "1000000");

        let ctx = &instance.contexts["AsOf2024"];
        assert_eq!(ctx.period, XbrlPeriod::Instant(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
    }

    #[test]
    fn duration_context_captures_start_and_end() {
        let (instance, _facts) = parse_instance(SAMPLE).unwrap();
        let ctx = &instance.contexts["FY2024"];
        match ctx.period {
            XbrlPeriod::Duration { start, end } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert_eq!(end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
            }
            _ => panic!("expected duration period"),
        }
    }
}
