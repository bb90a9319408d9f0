//! Input records: one line of JSON per publication
//!
//! Every nested field is optional. Producers emit `null` freely and a
//! missing sub-structure only removes what it would have contributed.

use serde::Deserialize;
use serde_json::Value;

/// One publication and its candidate matches from the bibliographic API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicationRecord {
    #[serde(default, alias = "oalex_data", deserialize_with = "lenient::list")]
    pub matches: Option<Vec<WorkMatch>>,
}

impl PublicationRecord {
    pub fn matches(&self) -> &[WorkMatch] {
        self.matches.as_deref().unwrap_or_default()
    }
}

/// A matched work with its nested authorship, concept and venue data
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkMatch {
    #[serde(default, deserialize_with = "lenient::opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub publication_date: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient::opt")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub open_access: Option<Value>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub cited_by_count: Option<i64>,
    #[serde(default)]
    pub biblio: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub is_retracted: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub is_paratext: Option<bool>,
    #[serde(default)]
    pub locations: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub ngrams_url: Option<String>,
    #[serde(default)]
    pub abstract_inverted_index: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub cited_by_api_url: Option<String>,
    #[serde(default)]
    pub counts_by_year: Option<Value>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub authorships: Option<Vec<AuthorshipRecord>>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub concepts: Option<Vec<ConceptRecord>>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub host_venue: Option<VenueRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorshipRecord {
    #[serde(default, deserialize_with = "lenient::opt")]
    pub author: Option<AuthorRecord>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub author_position: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub institutions: Option<Vec<InstitutionRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthorRecord {
    #[serde(default, deserialize_with = "lenient::opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstitutionRecord {
    #[serde(default, deserialize_with = "lenient::opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub ror: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub country_code: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient::opt")]
    pub institution_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConceptRecord {
    #[serde(default, deserialize_with = "lenient::opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub level: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub wikidata: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VenueRecord {
    #[serde(default, deserialize_with = "lenient::opt")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub issn_l: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub publisher: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient::opt")]
    pub venue_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub is_oa: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub license: Option<String>,
}

/// Field deserializers that drop a malformed value instead of failing the
/// whole record.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Any value of the expected shape; anything else becomes `None`.
    pub fn opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).ok())
    }

    /// A list keeping only the elements that parse; `null` entries are skipped.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => Ok(Some(
                items
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .filter_map(|v| serde_json::from_value(v).ok())
                    .collect(),
            )),
            _ => Ok(None),
        }
    }

    /// Integers, integral floats (`12.0`) and numeric strings.
    pub fn int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        };
        Ok(parsed)
    }

    /// Numbers and numeric strings.
    pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(parsed.filter(|f| f.is_finite()))
    }

    fn integral(f: f64) -> Option<i64> {
        (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
    }
}
