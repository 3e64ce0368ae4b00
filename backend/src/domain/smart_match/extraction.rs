//! Pull the match array out of free-form model output.
//!
//! Models wrap the requested JSON in prose or code fences, so extraction
//! starts at the first `[` and parses exactly one JSON value from there.
//! The parse is string-aware: brackets inside rationales do not end the
//! array early, and prose after the closing bracket is ignored.

use std::fmt;

use serde::{Deserialize, Deserializer};

/// One match entry exactly as the model produced it.
///
/// Nothing here has been checked against the candidate set yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMatch {
    /// Identifier text as echoed by the model. Bare numbers are accepted and
    /// kept in their decimal form.
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    /// Relevance on a 0 to 100 scale. Numeric strings are accepted.
    #[serde(deserialize_with = "finite_score")]
    pub score: f64,
}

/// Outcome of scanning model output for a match array.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// A well-formed array, possibly empty.
    Entries(Vec<RawMatch>),
    /// The output carried no usable array.
    NoMatch(NoMatchReason),
}

/// Why extraction produced no entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatchReason {
    /// The output contains no `[` at all.
    NoArray,
    /// An array started but did not parse as match entries.
    InvalidArray { message: String },
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoArray => f.write_str("model output contains no JSON array"),
            Self::InvalidArray { message } => {
                write!(f, "model output array is not a list of matches: {message}")
            }
        }
    }
}

/// Locate and parse the first top-level JSON array in `raw`.
///
/// # Examples
///
/// ```
/// use lendboard::domain::smart_match::{Extracted, extract_matches};
///
/// let raw = r#"Sure! [{"id": "0", "rationale": "fits", "score": 90}] Hope that helps."#;
/// let Extracted::Entries(entries) = extract_matches(raw) else {
///     panic!("expected entries");
/// };
/// assert_eq!(entries[0].id, "0");
/// ```
pub fn extract_matches(raw: &str) -> Extracted {
    let Some(tail) = raw.find('[').and_then(|start| raw.get(start..)) else {
        return Extracted::NoMatch(NoMatchReason::NoArray);
    };

    let mut stream = serde_json::Deserializer::from_str(tail).into_iter::<Vec<RawMatch>>();
    match stream.next() {
        Some(Ok(entries)) => Extracted::Entries(entries),
        Some(Err(error)) => Extracted::NoMatch(NoMatchReason::InvalidArray {
            message: error.to_string(),
        }),
        None => Extracted::NoMatch(NoMatchReason::NoArray),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdText {
    Text(String),
    Number(serde_json::Number),
}

fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match IdText::deserialize(deserializer)? {
        IdText::Text(text) => text,
        IdText::Number(number) => number.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreValue {
    Number(f64),
    Text(String),
}

fn finite_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let score = match ScoreValue::deserialize(deserializer)? {
        ScoreValue::Number(value) => value,
        ScoreValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(format!("score {text:?} is not a number"))
        })?,
    };
    if score.is_finite() {
        Ok(score)
    } else {
        Err(serde::de::Error::custom("score must be a finite number"))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for match extraction.

    use rstest::rstest;

    use super::*;

    fn entries(raw: &str) -> Vec<RawMatch> {
        match extract_matches(raw) {
            Extracted::Entries(entries) => entries,
            Extracted::NoMatch(reason) => panic!("expected entries, got {reason}"),
        }
    }

    #[rstest]
    fn prose_around_the_array_is_ignored() {
        let raw = "Here you go:\n```json\n[{\"id\": \"2\", \"owner\": \"Bob\", \
                   \"rationale\": \"Basic calculator\", \"score\": 72}]\n```\nLet me know!";

        let parsed = entries(raw);

        assert_eq!(
            parsed,
            vec![RawMatch {
                id: "2".to_owned(),
                owner: Some("Bob".to_owned()),
                rationale: Some("Basic calculator".to_owned()),
                score: 72.0,
            }]
        );
    }

    #[rstest]
    fn brackets_inside_strings_do_not_end_the_array() {
        let raw = r#"[{"id": "0", "rationale": "fits [exactly] what you asked", "score": 95}] (ranked [best first])"#;

        let parsed = entries(raw);

        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].rationale.as_deref(),
            Some("fits [exactly] what you asked")
        );
    }

    #[rstest]
    fn numeric_ids_and_string_scores_are_accepted() {
        let parsed = entries(r#"[{"id": 3, "score": "64.5"}]"#);

        assert_eq!(parsed[0].id, "3");
        assert_eq!(parsed[0].score, 64.5);
        assert_eq!(parsed[0].owner, None);
        assert_eq!(parsed[0].rationale, None);
    }

    #[rstest]
    fn empty_array_is_a_valid_no_match_answer() {
        assert_eq!(extract_matches("No matches. []"), Extracted::Entries(vec![]));
    }

    #[rstest]
    fn output_without_an_array_reports_no_array() {
        assert_eq!(
            extract_matches("I could not find anything suitable."),
            Extracted::NoMatch(NoMatchReason::NoArray)
        );
    }

    #[rstest]
    #[case::truncated(r#"[{"id": "0", "score": 90"#)]
    #[case::missing_id(r#"[{"rationale": "fits", "score": 90}]"#)]
    #[case::missing_score(r#"[{"id": "0", "rationale": "fits"}]"#)]
    #[case::non_numeric_score(r#"[{"id": "0", "score": "high"}]"#)]
    #[case::not_objects(r#"["0", "1"]"#)]
    fn malformed_arrays_report_invalid_array(#[case] raw: &str) {
        assert!(matches!(
            extract_matches(raw),
            Extracted::NoMatch(NoMatchReason::InvalidArray { .. })
        ));
    }
}
