use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Requested summary size. Unknown or missing values fall back to `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    #[must_use]
    /// Exact, case-sensitive key lookup. Anything else is `Medium`.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

// Accept any JSON value so a bogus `summaryLength` never rejects the request.
fn lenient_length<'de, D>(deserializer: D) -> Result<SummaryLength, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .map(SummaryLength::parse_or_default)
        .unwrap_or_default())
}

// `null` content is treated like a missing field so it fails the blank check
// rather than the body parse.
fn nullable_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire body of `POST /api/summarize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(default, deserialize_with = "nullable_content")]
    pub content: String,
    #[serde(
        rename = "summaryLength",
        default,
        deserialize_with = "lenient_length"
    )]
    pub length: SummaryLength,
}

impl SummaryRequest {
    #[must_use]
    pub fn new(content: impl Into<String>, length: SummaryLength) -> Self {
        Self {
            content: content.into(),
            length,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// JSON error envelope returned before any streaming body is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
