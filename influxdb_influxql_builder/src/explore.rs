//! Metadata discovery statements used to populate editor pickers.
//!
//! See the [InfluxQL schema exploration] documentation.
//!
//! [InfluxQL schema exploration]: https://docs.influxdata.com/influxdb/v1.8/query_language/explore-schema/

use crate::config::RenderConfig;
use crate::string::{RegexEscaped, SingleQuoted, double_quoted, qualified_measurement};
use crate::tag::{TagCondition, quoted_key};
use crate::{Error, Result};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::trace;

/// The kind of metadata statement to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExploreKind {
    /// `SHOW TAG KEYS`
    TagKeys,
    /// `SHOW TAG VALUES`
    TagValues,
    /// `SHOW MEASUREMENTS`
    Measurements,
    /// `SHOW FIELD KEYS`
    Fields,
    /// `SHOW RETENTION POLICIES`
    RetentionPolicies,
}

impl ExploreKind {
    /// The name used by the editor for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TagKeys => "TAG_KEYS",
            Self::TagValues => "TAG_VALUES",
            Self::Measurements => "MEASUREMENTS",
            Self::Fields => "FIELDS",
            Self::RetentionPolicies => "RETENTION POLICIES",
        }
    }
}

impl Display for ExploreKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExploreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "TAG_KEYS" => Self::TagKeys,
            "TAG_VALUES" => Self::TagValues,
            "MEASUREMENTS" => Self::Measurements,
            "FIELDS" => Self::Fields,
            "RETENTION POLICIES" => Self::RetentionPolicies,
            _ => return Err(Error::InvalidExploreKind(s.to_string())),
        })
    }
}

/// Builds `SHOW ...` statements from a measurement, retention policy and
/// tag conditions.
#[derive(Debug, Clone, Copy)]
pub struct ExploreQueryBuilder<'a> {
    measurement: &'a str,
    policy: Option<&'a str>,
    tags: &'a [TagCondition],
    database: Option<&'a str>,
    measurements_limit: u64,
}

impl<'a> ExploreQueryBuilder<'a> {
    /// Creates a builder over the given measurement, policy and tags. An
    /// empty measurement means none was selected.
    pub fn new(measurement: &'a str, policy: Option<&'a str>, tags: &'a [TagCondition]) -> Self {
        Self {
            measurement,
            policy,
            tags,
            database: None,
            measurements_limit: RenderConfig::default().measurements_limit,
        }
    }

    /// Sets the database whose retention policies are listed.
    pub fn with_database(mut self, database: &'a str) -> Self {
        self.database = Some(database);
        self
    }

    /// Applies the explore settings of `config`.
    pub fn with_config(mut self, config: &RenderConfig) -> Self {
        self.measurements_limit = config.measurements_limit;
        self
    }

    /// Builds the statement of `kind`.
    ///
    /// `with_key` selects the tag whose values are listed and is excluded
    /// from the WHERE clause. `measurement_filter` restricts `SHOW
    /// MEASUREMENTS` to names containing it, case insensitively.
    pub fn build(
        &self,
        kind: ExploreKind,
        with_key: Option<&str>,
        measurement_filter: Option<&str>,
    ) -> Result<String> {
        let mut query = match kind {
            ExploreKind::TagKeys => "SHOW TAG KEYS".to_string(),
            ExploreKind::TagValues => "SHOW TAG VALUES".to_string(),
            ExploreKind::Measurements => {
                let mut query = "SHOW MEASUREMENTS".to_string();
                if let Some(filter) = measurement_filter.filter(|f| !f.is_empty()) {
                    query.push_str(&format!(
                        " WITH MEASUREMENT =~ /(?i){}/",
                        RegexEscaped(filter)
                    ));
                }
                query
            }
            ExploreKind::Fields => {
                if self.measurement.is_empty() {
                    return Err(Error::MissingMeasurement);
                }
                return Ok(format!(
                    "SHOW FIELD KEYS FROM {}",
                    qualified_measurement(self.measurement, self.policy)
                ));
            }
            ExploreKind::RetentionPolicies => {
                let database = self.database.ok_or(Error::MissingDatabase)?;
                return Ok(format!(
                    "SHOW RETENTION POLICIES on {}",
                    double_quoted(database)
                ));
            }
        };

        if matches!(kind, ExploreKind::TagKeys | ExploreKind::TagValues)
            && !self.measurement.is_empty()
        {
            query.push_str(" FROM ");
            query.push_str(&qualified_measurement(self.measurement, self.policy));
        }

        if let Some(key) = with_key {
            let key = key.strip_suffix("::tag").unwrap_or(key);
            query.push_str(" WITH KEY = ");
            query.push_str(&double_quoted(key));
        }

        let conditions = self.where_conditions(with_key);
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" "));
        }

        if kind == ExploreKind::Measurements {
            query.push_str(&format!(" LIMIT {}", self.measurements_limit));
        }

        trace!(%kind, %query, "built explore query");
        Ok(query)
    }

    /// Renders the tag conditions valid in a metadata statement: the tag
    /// being explored and `<`/`>` comparisons are left out.
    fn where_conditions(&self, with_key: Option<&str>) -> Vec<String> {
        let mut conditions = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            if with_key.is_some_and(|key| key == tag.key) {
                continue;
            }
            if tag.operator.is_some_and(|op| op.is_value_comparison()) {
                continue;
            }
            conditions.push(render_explore_condition(tag, conditions.len()));
        }
        conditions
    }
}

/// Like the query tag conditions, but numeric values are left unquoted for
/// every operator.
fn render_explore_condition(tag: &TagCondition, index: usize) -> String {
    let operator = tag.effective_operator();
    let value = if !tag.value.is_empty() && (operator.is_regex() || is_number(&tag.value)) {
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

fn is_number(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .is_ok_and(|number| number.is_finite())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::{Connector, Operator};
    use assert_matches::assert_matches;

    #[test]
    fn test_measurements() {
        let builder = ExploreQueryBuilder::new("", None, &[]);
        assert_eq!(
            builder
                .build(ExploreKind::Measurements, None, None)
                .unwrap(),
            "SHOW MEASUREMENTS LIMIT 100"
        );

        let query = builder
            .build(ExploreKind::Measurements, None, Some("abc/def/"))
            .unwrap();
        assert!(query.contains(r"=~ /(?i)abc\/def\// "), "{query}");
        insta::assert_snapshot!(query, @r"SHOW MEASUREMENTS WITH MEASUREMENT =~ /(?i)abc\/def\// LIMIT 100");

        // an empty filter is no filter
        assert_eq!(
            builder
                .build(ExploreKind::Measurements, None, Some(""))
                .unwrap(),
            "SHOW MEASUREMENTS LIMIT 100"
        );
    }

    #[test]
    fn test_measurements_with_tags() {
        let tags = [
            TagCondition::new("app", "email"),
            TagCondition::new("value", "5").with_operator(Operator::Gt),
            TagCondition::new("host", "/^web/").with_connector(Connector::Or),
        ];
        let builder = ExploreQueryBuilder::new("cpu", None, &tags).with_config(&RenderConfig {
            measurements_limit: 10,
            ..Default::default()
        });
        insta::assert_snapshot!(
            builder.build(ExploreKind::Measurements, None, Some("cp")).unwrap(),
            @r#"SHOW MEASUREMENTS WITH MEASUREMENT =~ /(?i)cp/ WHERE "app" = 'email' OR "host" =~ /^web/ LIMIT 10"#
        );
    }

    #[test]
    fn test_tag_keys() {
        let builder = ExploreQueryBuilder::new("cpu", None, &[]);
        assert_eq!(
            builder.build(ExploreKind::TagKeys, None, None).unwrap(),
            r#"SHOW TAG KEYS FROM "cpu""#
        );

        let builder = ExploreQueryBuilder::new("cpu", Some("one_week"), &[]);
        assert_eq!(
            builder.build(ExploreKind::TagKeys, None, None).unwrap(),
            r#"SHOW TAG KEYS FROM "one_week"."cpu""#
        );

        let builder = ExploreQueryBuilder::new("", None, &[]);
        assert_eq!(
            builder.build(ExploreKind::TagKeys, None, None).unwrap(),
            "SHOW TAG KEYS"
        );

        let tags = [TagCondition::new("host", "se1")];
        let builder = ExploreQueryBuilder::new("/cpu.*/", Some("default"), &tags);
        assert_eq!(
            builder.build(ExploreKind::TagKeys, None, None).unwrap(),
            r#"SHOW TAG KEYS FROM /cpu.*/ WHERE "host" = 'se1'"#
        );
    }

    #[test]
    fn test_tag_values() {
        let tags = [
            TagCondition::new("app", "email"),
            TagCondition::new("host", "server1"),
        ];
        let builder = ExploreQueryBuilder::new("cpu", None, &tags);

        // the explored key is excluded and the next condition is first
        assert_eq!(
            builder
                .build(ExploreKind::TagValues, Some("app"), None)
                .unwrap(),
            r#"SHOW TAG VALUES FROM "cpu" WITH KEY = "app" WHERE "host" = 'server1'"#
        );

        assert_eq!(
            builder
                .build(ExploreKind::TagValues, Some("dc::tag"), None)
                .unwrap(),
            r#"SHOW TAG VALUES FROM "cpu" WITH KEY = "dc" WHERE "app" = 'email' AND "host" = 'server1'"#
        );

        let builder = ExploreQueryBuilder::new("merge(/cpu/)", None, &[]);
        assert_eq!(
            builder
                .build(ExploreKind::TagValues, Some("host"), None)
                .unwrap(),
            r#"SHOW TAG VALUES FROM merge(/cpu/) WITH KEY = "host""#
        );
    }

    #[test]
    fn test_condition_values() {
        let tags = [
            TagCondition::new("a", "10"),
            TagCondition::new("b", "1.5").with_operator(Operator::NotEq),
            TagCondition::new("c", ""),
            TagCondition::new("d", "NaN"),
            TagCondition::new("e", r"it's"),
        ];
        let builder = ExploreQueryBuilder::new("cpu", None, &tags);
        insta::assert_snapshot!(
            builder.build(ExploreKind::TagKeys, None, None).unwrap(),
            @r#"SHOW TAG KEYS FROM "cpu" WHERE "a" = 10 AND "b" != 1.5 AND "c" = '' AND "d" = 'NaN' AND "e" = 'it\'s'"#
        );
    }

    #[test]
    fn test_fields() {
        let tags = [TagCondition::new("host", "a")];
        let builder = ExploreQueryBuilder::new("cpu", Some("autogen"), &tags);
        assert_eq!(
            builder.build(ExploreKind::Fields, None, None).unwrap(),
            r#"SHOW FIELD KEYS FROM "autogen"."cpu""#
        );

        let builder = ExploreQueryBuilder::new("", None, &[]);
        assert_matches!(
            builder.build(ExploreKind::Fields, None, None),
            Err(Error::MissingMeasurement)
        );
    }

    #[test]
    fn test_retention_policies() {
        let builder = ExploreQueryBuilder::new("cpu", None, &[]);
        assert_matches!(
            builder.build(ExploreKind::RetentionPolicies, None, None),
            Err(Error::MissingDatabase)
        );

        let builder = builder.with_database("telegraf");
        assert_eq!(
            builder
                .build(ExploreKind::RetentionPolicies, None, None)
                .unwrap(),
            r#"SHOW RETENTION POLICIES on "telegraf""#
        );

        let builder = builder.with_database(r#"tele"graf"#);
        assert_eq!(
            builder
                .build(ExploreKind::RetentionPolicies, None, None)
                .unwrap(),
            r#"SHOW RETENTION POLICIES on "tele\"graf""#
        );
        assert_eq!(
            builder
                .build(ExploreKind::TagValues, Some(r#"a"b::tag"#), None)
                .unwrap(),
            r#"SHOW TAG VALUES FROM "cpu" WITH KEY = "a\"b""#
        );
    }

    #[test]
    fn test_kind_from_str() {
        for kind in [
            ExploreKind::TagKeys,
            ExploreKind::TagValues,
            ExploreKind::Measurements,
            ExploreKind::Fields,
            ExploreKind::RetentionPolicies,
        ] {
            assert_eq!(kind.as_str().parse::<ExploreKind>().unwrap(), kind);
        }
        assert_matches!(
            "SERIES".parse::<ExploreKind>(),
            Err(Error::InvalidExploreKind(kind)) if kind == "SERIES"
        );
    }
}
