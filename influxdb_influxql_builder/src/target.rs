//! The persisted form of a query, as saved by the editor.

use crate::Result;
use crate::tag::TagCondition;
use serde::{Deserialize, Deserializer, Serialize};

/// A query target as persisted in JSON.
///
/// Every field is optional; [`QueryModel::from_target`] fills in the
/// defaults.
///
/// [`QueryModel::from_target`]: crate::QueryModel::from_target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTarget {
    /// The measurement, a name, `/regex/` or `merge(...)` call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<String>,
    /// The retention policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// One list of parts per SELECT column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<Vec<PartSpec>>>,
    /// The GROUP BY parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<PartSpec>>,
    /// The WHERE clause tag conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagCondition>>,
    /// `LIMIT n`; the editor stores it as a string or a number.
    #[serde(
        default,
        deserialize_with = "optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<u64>,
    /// `SLIMIT n`; the editor stores it as a string or a number.
    #[serde(
        default,
        deserialize_with = "optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub slimit: Option<u64>,
    /// The ordering of the result by time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by_time: Option<OrderByTime>,
    /// The `tz('...')` clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    /// Render [`Self::query`] instead of the parts.
    #[serde(default)]
    pub raw_query: bool,
    /// The hand-written query text used in raw mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl QueryTarget {
    /// Decodes a target from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encodes the target as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A persisted query part: its type and, optionally, its params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpec {
    /// The catalog type of the part.
    #[serde(rename = "type")]
    pub part_type: String,
    /// The params; the definition's defaults when absent.
    #[serde(
        default,
        deserialize_with = "optional_params",
        skip_serializing_if = "Option::is_none"
    )]
    pub params: Option<Vec<String>>,
}

impl PartSpec {
    /// A part with the definition's default params.
    pub fn new(part_type: impl Into<String>) -> Self {
        Self {
            part_type: part_type.into(),
            params: None,
        }
    }

    /// A part with explicit params.
    pub fn with_params<I, S>(part_type: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            part_type: part_type.into(),
            params: Some(params.into_iter().map(Into::into).collect()),
        }
    }
}

/// The `orderByTime` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderByTime {
    /// Oldest first, the server's default.
    #[default]
    Asc,
    /// Newest first, rendered as `ORDER BY time DESC`.
    Desc,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

fn optional_params<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let params = Option::<Vec<StringOrNumber>>::deserialize(deserializer)?;
    Ok(params.map(|params| {
        params
            .into_iter()
            .map(StringOrNumber::into_string)
            .collect()
    }))
}

/// An empty string means no count.
fn optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<StringOrNumber>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let value = value.into_string();
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("invalid count: {value}")))
}
