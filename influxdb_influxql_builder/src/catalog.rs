//! The catalog of query part definitions.
//!
//! Every function or operator that can appear in a select pipeline or a
//! GROUP BY clause is described by a [`PartDefinition`]: its category, its
//! parameters, how it renders and where it is placed when added. The
//! [`PartCatalog`] is built once and shared read-only afterwards.
//!
//! See the [InfluxQL functions] documentation for the semantics of each
//! function.
//!
//! [InfluxQL functions]: https://docs.influxdata.com/influxdb/v1.8/query_language/functions/

use crate::config::RenderConfig;
use crate::string::double_quoted;
use crate::{Error, Result};
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// The category a part belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartCategory {
    /// The field a select pipeline reads.
    Fields,
    /// Aggregate functions, such as `mean` or `count`.
    Aggregations,
    /// Selector functions, such as `max` or `top`.
    Selectors,
    /// Transformations applied after an aggregate, such as `derivative`.
    Transformations,
    /// Prediction functions, such as `holt_winters`.
    Predictors,
    /// An arithmetic suffix, such as `/ 100`.
    Math,
    /// An `AS "name"` alias.
    Aliasing,
    /// `time`, `fill` and `tag`, used only in GROUP BY clauses.
    GroupByTime,
}

impl PartCategory {
    /// Returns the display name of the category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fields => "Fields",
            Self::Aggregations => "Aggregations",
            Self::Selectors => "Selectors",
            Self::Transformations => "Transformations",
            Self::Predictors => "Predictors",
            Self::Math => "Math",
            Self::Aliasing => "Aliasing",
            Self::GroupByTime => "GroupByTime",
        }
    }
}

impl Display for PartCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A field key, looked up from the server.
    Field,
    /// A tag key, looked up from the server.
    Tag,
    /// A duration such as `10s`.
    Interval,
    /// A GROUP BY time interval; `auto` is replaced by the interval placeholder.
    Time,
    /// An integer.
    Int,
    /// Free text.
    String,
}

/// The schema of a single part parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// The parameter name shown in the editor.
    pub name: &'static str,
    /// The accepted kind of value.
    pub kind: ParamKind,
    /// Suggested values.
    pub options: &'static [&'static str],
    /// Whether the parameter may be omitted.
    pub optional: bool,
}

impl ParamSpec {
    fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            options: &[],
            optional: false,
        }
    }

    fn with_options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Where a part is placed when it is added to a select pipeline or GROUP BY
/// clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyId {
    /// Replaces the aggregation or selector of the pipeline, pairing
    /// `distinct` with `count`.
    ReplaceAggregation,
    /// Inserted before any math or alias part.
    Transformation,
    /// Replaces an existing math part, otherwise placed before the alias.
    Math,
    /// Replaces the trailing alias, otherwise appended.
    Alias,
    /// Duplicates the whole pipeline into a new one.
    Field,
    /// Placed in the GROUP BY clause, before any `fill`.
    GroupBy,
}

/// How a part turns its parameters and inner expression into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// `type(inner, param1, param2)`
    Function,
    /// `inner param0`
    Suffix,
    /// `inner AS "param0"`
    Alias,
    /// `"param0"`, or `*` verbatim
    Field,
}

/// An immutable description of a query part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDefinition {
    /// The function or operator name, e.g. `mean`.
    pub part_type: &'static str,
    /// The category the part belongs to.
    pub category: PartCategory,
    /// The parameter schema.
    pub params: Vec<ParamSpec>,
    /// Parameter values used when a part is created without any.
    pub default_params: Vec<String>,
    /// The placement strategy applied when the part is added.
    pub strategy: StrategyId,
    /// The rendering rule.
    pub renderer: Renderer,
}

impl PartDefinition {
    fn new(
        part_type: &'static str,
        category: PartCategory,
        strategy: StrategyId,
        renderer: Renderer,
    ) -> Self {
        Self {
            part_type,
            category,
            params: vec![],
            default_params: vec![],
            strategy,
            renderer,
        }
    }

    fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    fn with_default_params(mut self, params: &[&str]) -> Self {
        self.default_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Renders `params` around `inner` according to the definition's
    /// [`Renderer`].
    pub fn render(&self, params: &[String], inner: &str, config: &RenderConfig) -> String {
        let first = params.first().map(String::as_str).unwrap_or_default();
        match self.renderer {
            Renderer::Function => self.render_function(params, inner, config),
            Renderer::Suffix => format!("{inner} {first}"),
            Renderer::Alias => format!("{inner} AS {}", double_quoted(first)),
            Renderer::Field if first == "*" => first.to_string(),
            Renderer::Field => double_quoted(first),
        }
    }

    fn render_function(&self, params: &[String], inner: &str, config: &RenderConfig) -> String {
        let mut args = Vec::with_capacity(params.len() + 1);
        if !inner.is_empty() {
            args.push(inner.to_string());
        }

        for (index, value) in params.iter().enumerate() {
            args.push(match self.params.get(index) {
                Some(spec) if spec.kind == ParamKind::Time && value == "auto" => {
                    config.interval_placeholder.clone()
                }
                _ => value.clone(),
            });
        }

        format!("{}({})", self.part_type, args.join(", "))
    }
}

const INTERVAL_OPTIONS: &[&str] = &["1s", "10s", "1m", "5m", "10m", "15m", "1h"];
const WINDOW_OPTIONS: &[&str] = &["5", "10", "20", "30", "40"];

/// The fixed registry of [`PartDefinition`]s, keyed by part type.
#[derive(Debug, Clone)]
pub struct PartCatalog {
    definitions: IndexMap<&'static str, Arc<PartDefinition>>,
}

impl Default for PartCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PartCatalog {
    /// Builds the catalog of every supported part.
    pub fn new() -> Self {
        use PartCategory::*;

        let mut catalog = Self {
            definitions: IndexMap::new(),
        };

        catalog.register(
            PartDefinition::new("field", Fields, StrategyId::Field, Renderer::Field)
                .with_param(ParamSpec::new("field", ParamKind::Field))
                .with_default_params(&["value"]),
        );

        // Aggregations
        for part_type in ["count", "distinct"] {
            catalog.register(aggregate(part_type, Aggregations));
        }
        catalog.register(
            aggregate("integral", Aggregations).with_param(
                ParamSpec::new("unit", ParamKind::Interval)
                    .with_options(&["1s", "1m", "1h", "1d", "1w"])
                    .optional(),
            ),
        );
        for part_type in ["mean", "median", "mode", "sum"] {
            catalog.register(aggregate(part_type, Aggregations));
        }

        // Selectors
        catalog.register(
            aggregate("bottom", Selectors)
                .with_param(ParamSpec::new("count", ParamKind::Int))
                .with_default_params(&["3"]),
        );
        for part_type in ["first", "last", "max", "min"] {
            catalog.register(aggregate(part_type, Selectors));
        }
        catalog.register(
            aggregate("percentile", Selectors)
                .with_param(ParamSpec::new("nth", ParamKind::Int))
                .with_default_params(&["95"]),
        );
        catalog.register(
            aggregate("top", Selectors)
                .with_param(ParamSpec::new("count", ParamKind::Int))
                .with_default_params(&["3"]),
        );

        // Transformations
        catalog.register(derivative_like("derivative"));
        catalog.register(transformation("spread", Transformations));
        catalog.register(derivative_like("non_negative_derivative"));
        catalog.register(transformation("difference", Transformations));
        catalog.register(transformation("non_negative_difference", Transformations));
        catalog.register(
            transformation("moving_average", Transformations)
                .with_param(ParamSpec::new("window", ParamKind::Int).with_options(WINDOW_OPTIONS))
                .with_default_params(&["10"]),
        );
        catalog.register(transformation("cumulative_sum", Transformations));
        catalog.register(transformation("stddev", Transformations));
        catalog.register(derivative_like("elapsed"));

        // Predictors
        for part_type in ["holt_winters", "holt_winters_with_fit"] {
            catalog.register(
                transformation(part_type, Predictors)
                    .with_param(
                        ParamSpec::new("number", ParamKind::Int).with_options(WINDOW_OPTIONS),
                    )
                    .with_param(
                        ParamSpec::new("season", ParamKind::Int)
                            .with_options(&["0", "1", "2", "5", "10"]),
                    )
                    .with_default_params(&["10", "2"]),
            );
        }

        catalog.register(
            PartDefinition::new("math", Math, StrategyId::Math, Renderer::Suffix)
                .with_param(ParamSpec::new("expr", ParamKind::String))
                .with_default_params(&[" / 100"]),
        );
        catalog.register(
            PartDefinition::new("alias", Aliasing, StrategyId::Alias, Renderer::Alias)
                .with_param(ParamSpec::new("name", ParamKind::String))
                .with_default_params(&["alias"]),
        );

        // GROUP BY
        catalog.register(
            PartDefinition::new("time", GroupByTime, StrategyId::GroupBy, Renderer::Function)
                .with_param(ParamSpec::new("interval", ParamKind::Time).with_options(&[
                    "$__interval",
                    "1s",
                    "10s",
                    "1m",
                    "5m",
                    "10m",
                    "15m",
                    "1h",
                ]))
                .with_default_params(&["$__interval"]),
        );
        catalog.register(
            PartDefinition::new("fill", GroupByTime, StrategyId::GroupBy, Renderer::Function)
                .with_param(ParamSpec::new("fill", ParamKind::String).with_options(&[
                    "none", "null", "0", "previous", "linear",
                ]))
                .with_default_params(&["null"]),
        );
        catalog.register(
            PartDefinition::new("tag", GroupByTime, StrategyId::GroupBy, Renderer::Field)
                .with_param(ParamSpec::new("tag", ParamKind::Tag))
                .with_default_params(&["tag"]),
        );

        catalog
    }

    fn register(&mut self, definition: PartDefinition) {
        self.definitions
            .insert(definition.part_type, Arc::new(definition));
    }

    /// Returns the definition registered for `part_type`.
    pub fn lookup(&self, part_type: &str) -> Result<Arc<PartDefinition>> {
        self.definitions
            .get(part_type)
            .map(Arc::clone)
            .ok_or_else(|| Error::UnknownPartType {
                part_type: part_type.to_string(),
            })
    }

    /// Returns the definitions grouped by category, in registration order.
    pub fn categories(&self) -> Vec<(PartCategory, Vec<Arc<PartDefinition>>)> {
        let mut categories: IndexMap<PartCategory, Vec<Arc<PartDefinition>>> = IndexMap::new();
        for definition in self.definitions.values() {
            categories
                .entry(definition.category)
                .or_default()
                .push(Arc::clone(definition));
        }
        categories.into_iter().collect()
    }

    /// Returns an iterator over every registered definition.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<PartDefinition>> {
        self.definitions.values()
    }
}

fn aggregate(part_type: &'static str, category: PartCategory) -> PartDefinition {
    PartDefinition::new(
        part_type,
        category,
        StrategyId::ReplaceAggregation,
        Renderer::Function,
    )
}

fn transformation(part_type: &'static str, category: PartCategory) -> PartDefinition {
    PartDefinition::new(
        part_type,
        category,
        StrategyId::Transformation,
        Renderer::Function,
    )
}

fn derivative_like(part_type: &'static str) -> PartDefinition {
    transformation(part_type, PartCategory::Transformations)
        .with_param(ParamSpec::new("duration", ParamKind::Interval).with_options(INTERVAL_OPTIONS))
        .with_default_params(&["10s"])
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_lookup() {
        let catalog = PartCatalog::new();

        let def = catalog.lookup("mean").unwrap();
        assert_eq!(def.category, PartCategory::Aggregations);
        assert_eq!(def.strategy, StrategyId::ReplaceAggregation);

        let def = catalog.lookup("holt_winters_with_fit").unwrap();
        assert_eq!(def.category, PartCategory::Predictors);
        assert_eq!(def.default_params, vec!["10", "2"]);

        assert_matches!(
            catalog.lookup("sample"),
            Err(Error::UnknownPartType { part_type }) if part_type == "sample"
        );
    }

    #[test]
    fn test_inventory() {
        let catalog = PartCatalog::new();
        let names = |category: PartCategory| -> Vec<&'static str> {
            catalog
                .categories()
                .into_iter()
                .find(|(c, _)| *c == category)
                .map(|(_, defs)| defs.iter().map(|d| d.part_type).collect())
                .unwrap_or_default()
        };

        assert_eq!(names(PartCategory::Fields), ["field"]);
        assert_eq!(
            names(PartCategory::Aggregations),
            ["count", "distinct", "integral", "mean", "median", "mode", "sum"]
        );
        assert_eq!(
            names(PartCategory::Selectors),
            ["bottom", "first", "last", "max", "min", "percentile", "top"]
        );
        assert_eq!(
            names(PartCategory::Transformations),
            [
                "derivative",
                "spread",
                "non_negative_derivative",
                "difference",
                "non_negative_difference",
                "moving_average",
                "cumulative_sum",
                "stddev",
                "elapsed"
            ]
        );
        assert_eq!(
            names(PartCategory::Predictors),
            ["holt_winters", "holt_winters_with_fit"]
        );
        assert_eq!(names(PartCategory::Math), ["math"]);
        assert_eq!(names(PartCategory::Aliasing), ["alias"]);
        assert_eq!(names(PartCategory::GroupByTime), ["time", "fill", "tag"]);
    }

    #[test]
    fn test_categories_order() {
        let got: Vec<_> = PartCatalog::new()
            .categories()
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(
            got,
            [
                PartCategory::Fields,
                PartCategory::Aggregations,
                PartCategory::Selectors,
                PartCategory::Transformations,
                PartCategory::Predictors,
                PartCategory::Math,
                PartCategory::Aliasing,
                PartCategory::GroupByTime,
            ]
        );
    }

    #[test]
    fn test_render() {
        let catalog = PartCatalog::new();
        let config = RenderConfig::default();
        let render = |part_type: &str, params: &[&str], inner: &str| {
            let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            catalog
                .lookup(part_type)
                .unwrap()
                .render(&params, inner, &config)
        };

        assert_eq!(render("field", &["value"], ""), r#""value""#);
        assert_eq!(render("field", &["*"], ""), "*");
        assert_eq!(render("mean", &[], r#""value""#), r#"mean("value")"#);
        assert_eq!(
            render("derivative", &["10s"], r#"mean("value")"#),
            r#"derivative(mean("value"), 10s)"#
        );
        assert_eq!(
            render("holt_winters", &["10", "2"], "x"),
            "holt_winters(x, 10, 2)"
        );
        assert_eq!(render("math", &["/ 100"], "x"), "x / 100");
        assert_eq!(render("alias", &["load"], "x"), r#"x AS "load""#);
        assert_eq!(render("alias", &[r#"a"b"#], "x"), r#"x AS "a\"b""#);
        assert_eq!(render("field", &[r"c:\temp"], ""), r#""c:\\temp""#);
        assert_eq!(render("tag", &["host"], ""), r#""host""#);
        assert_eq!(render("fill", &["null"], ""), "fill(null)");

        // an empty inner expression leaves no leading comma
        assert_eq!(render("time", &["1m"], ""), "time(1m)");
        // `auto` resolves to the interval placeholder
        assert_eq!(render("time", &["auto"], ""), "time($__interval)");
        assert_eq!(
            catalog.lookup("time").unwrap().render(
                &["auto".to_string()],
                "",
                &RenderConfig {
                    interval_placeholder: "$interval".to_string(),
                    ..Default::default()
                }
            ),
            "time($interval)"
        );
    }
}
