//! Tag conditions of the WHERE clause.

use crate::string::{SingleQuoted, double_quoted, is_regex_literal};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A comparison operator of a [`TagCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    #[serde(rename = "=")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    NotEq,
    /// `<>`
    #[serde(rename = "<>")]
    LtGt,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `=~`
    #[serde(rename = "=~")]
    EqRegex,
    /// `!~`
    #[serde(rename = "!~")]
    NotEqRegex,
}

impl Operator {
    /// The InfluxQL text of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::LtGt => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::EqRegex => "=~",
            Self::NotEqRegex => "!~",
        }
    }

    /// Returns true for `=~` and `!~`, whose value is a `/regex/` literal.
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::EqRegex | Self::NotEqRegex)
    }

    /// Returns true for `<` and `>`, which compare values rather than match
    /// them.
    pub fn is_value_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::Gt)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" => Self::Eq,
            "!=" => Self::NotEq,
            "<>" => Self::LtGt,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "=~" => Self::EqRegex,
            "!~" => Self::NotEqRegex,
            _ => return Err(format!("invalid tag operator: {s}")),
        })
    }
}

/// The boolean connector joining a condition to the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    /// `AND`
    #[default]
    And,
    /// `OR`
    Or,
}

impl Display for Connector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

/// A single WHERE clause filter on a tag (or field) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCondition {
    /// The key, optionally suffixed with `::tag` or `::field`.
    pub key: String,
    /// The operator; inferred from the value when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// The value, a `/regex/` literal for the regex operators.
    #[serde(default)]
    pub value: String,
    /// The connector to the previous condition, ignored for the first one.
    #[serde(
        default,
        rename = "condition",
        skip_serializing_if = "Option::is_none"
    )]
    pub connector: Option<Connector>,
}

impl TagCondition {
    /// Creates a condition with an inferred operator and the default
    /// connector.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: None,
            value: value.into(),
            connector: None,
        }
    }

    /// Sets an explicit operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Sets the connector to the previous condition.
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = Some(connector);
        self
    }

    /// The explicit operator, or `=~` for values that look like a `/regex/`
    /// and `=` otherwise.
    pub fn effective_operator(&self) -> Operator {
        self.operator.unwrap_or_else(|| {
            if is_regex_literal(&self.value) {
                Operator::EqRegex
            } else {
                Operator::Eq
            }
        })
    }
}

/// Renders the key double quoted, keeping a `::tag` or `::field` type
/// suffix outside the quotes.
pub(crate) fn quoted_key(key: &str) -> String {
    for suffix in ["::tag", "::field"] {
        if let Some(name) = key.strip_suffix(suffix) {
            return format!("{}{suffix}", double_quoted(name));
        }
    }
    double_quoted(key)
}

/// Renders the condition at `index` of a WHERE clause, prefixed with its
/// connector unless it is the first one.
///
/// Values are single quoted and escaped, except for regex operators, whose
/// value is a `/regex/` literal, and for non-empty `<` and `>` comparisons,
/// whose value is numeric.
pub fn render_tag_condition(tag: &TagCondition, index: usize) -> String {
    let operator = tag.effective_operator();
    let value = if operator.is_regex() || (operator.is_value_comparison() && !tag.value.is_empty())
    {
        tag.value.clone()
    } else {
        SingleQuoted(&tag.value).to_string()
    };

    let condition = format!("{} {operator} {value}", quoted_key(&tag.key));
    match index {
        0 => condition,
        _ => format!("{} {condition}", tag.connector.unwrap_or_default()),
    }
}

/// Renders all conditions joined by their connectors, or `None` when there
/// are none.
pub(crate) fn render_tag_conditions(tags: &[TagCondition]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }

    Some(
        tags.iter()
            .enumerate()
            .map(|(index, tag)| render_tag_condition(tag, index))
            .collect::<Vec<_>>()
            .join(" "),
    )
}
