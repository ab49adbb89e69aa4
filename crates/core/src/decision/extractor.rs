//! Decision detail extractor
//!
//! Decision payloads arrive as JSON whose `Content` field is an HTML
//! fragment. Structured fields are read directly; the decision maker's
//! name is scraped from the fragment via a marker class on the carrying
//! element.

use casebridge_domain::constants::{
    DECISION_DATE_FORMAT, DECISION_MAKER_MARKER_CLASS, SECTION_SYMBOL,
};
use casebridge_domain::DecisionDetails;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Matches the text content of the element carrying the decision-maker
/// marker class.
static DECISION_MAKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"class="[^"]*{DECISION_MAKER_MARKER_CLASS}[^"]*"[^>]*>\s*([^<]+?)\s*<"#
    ))
    .expect("decision maker pattern compiles")
});

/// Extraction failures for one decision payload.
#[derive(Debug, Error)]
pub enum DecisionDetailsError {
    /// A structured field the extractor depends on is absent.
    #[error("decision payload missing field `{0}`")]
    MissingField(&'static str),

    /// `DateDecision` did not match the registry's fixed timestamp format.
    #[error("could not parse decision date `{value}`")]
    InvalidDate { value: String },

    /// The marker class was not found in the HTML content. Carries the
    /// offending fragment for diagnosis.
    #[error("decision maker marker not found in content")]
    MakerNotFound { html: String },
}

/// Extract structured decision fields from one decision payload.
///
/// # Errors
/// - [`DecisionDetailsError::MissingField`] when a structured field is
///   absent
/// - [`DecisionDetailsError::InvalidDate`] when the decision date fails to
///   parse
/// - [`DecisionDetailsError::MakerNotFound`] when the name pattern does
///   not match the HTML content
pub fn extract_decision_details(payload: &Value) -> Result<DecisionDetails, DecisionDetailsError> {
    let title = str_field(payload, "DecisionMakerTitle")?;
    let section = str_field(payload, "Section")?;
    let raw_date = str_field(payload, "DateDecision")?;
    let content = str_field(payload, "Content")?;

    let name = DECISION_MAKER_PATTERN
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| DecisionDetailsError::MakerNotFound { html: content.to_string() })?;

    let decision_date = NaiveDateTime::parse_from_str(raw_date, DECISION_DATE_FORMAT)
        .map_err(|_| DecisionDetailsError::InvalidDate { value: raw_date.to_string() })?
        .and_utc();

    Ok(DecisionDetails {
        decision_maker_name: name,
        decision_maker_title: title.to_string(),
        section_of_law: format!("{section} {SECTION_SYMBOL}"),
        decision_date,
    })
}

fn str_field<'a>(
    payload: &'a Value,
    field: &'static str,
) -> Result<&'a str, DecisionDetailsError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or(DecisionDetailsError::MissingField(field))
}

#[cfg(test)]
mod tests {
    //! Unit tests for the decision detail extractor.
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    use super::*;

    fn decision_payload(content: &str, date: &str) -> Value {
        json!({
            "DecisionMakerTitle": "Head of Unit",
            "Section": "12",
            "DateDecision": date,
            "Content": content,
        })
    }

    const CONTENT_WITH_MARKER: &str = concat!(
        "<html><body><div class=\"decision\">",
        "<p class=\"decisionmaker-name\"> Maija Meikäläinen </p>",
        "</div></body></html>",
    );

    #[test]
    fn extracts_all_structured_fields() {
        let payload = decision_payload(CONTENT_WITH_MARKER, "2024-03-18T10:31:21.493");

        let details = extract_decision_details(&payload).expect("extraction succeeds");

        assert_eq!(details.decision_maker_name, "Maija Meikäläinen");
        assert_eq!(details.decision_maker_title, "Head of Unit");
        assert_eq!(details.section_of_law, "12 §");
        assert_eq!(details.decision_date.year(), 2024);
        assert_eq!(details.decision_date.hour(), 10);
    }

    /// HTML without the marker class must fail with the error carrying the
    /// offending fragment.
    #[test]
    fn missing_marker_class_reports_the_html() {
        let html = "<html><body><p class=\"summary\">no maker here</p></body></html>";
        let payload = decision_payload(html, "2024-03-18T10:31:21.493");

        let err = extract_decision_details(&payload).expect_err("extraction fails");

        match err {
            DecisionDetailsError::MakerNotFound { html: carried } => {
                assert!(carried.contains("no maker here"));
            }
            other => panic!("expected MakerNotFound, got {other:?}"),
        }
    }

    /// An unparseable `DateDecision` must fail as a parsing error, not a
    /// maker error.
    #[test]
    fn unparseable_date_is_a_parsing_error() {
        let payload = decision_payload(CONTENT_WITH_MARKER, "18.03.2024 10:31");

        let err = extract_decision_details(&payload).expect_err("extraction fails");

        assert!(matches!(err, DecisionDetailsError::InvalidDate { value } if value == "18.03.2024 10:31"));
    }

    #[test]
    fn absent_structured_field_is_reported_by_name() {
        let mut payload = decision_payload(CONTENT_WITH_MARKER, "2024-03-18T10:31:21.493");
        payload.as_object_mut().expect("object payload").remove("Section");

        let err = extract_decision_details(&payload).expect_err("extraction fails");

        assert!(matches!(err, DecisionDetailsError::MissingField("Section")));
    }
}
