//! The editable query model and its rendering to InfluxQL.

use crate::catalog::{PartCatalog, PartCategory};
use crate::config::RenderConfig;
use crate::explore::ExploreQueryBuilder;
use crate::group_by::{GroupByClause, parse_group_by_spec};
use crate::part::QueryPart;
use crate::pipeline::{AddOutcome, SelectPipeline};
use crate::string::{DEFAULT_POLICY, SingleQuoted, qualified_measurement};
use crate::tag::{TagCondition, render_tag_conditions};
use crate::target::{OrderByTime, PartSpec, QueryTarget};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A query under edit: what to select, from where, filtered and grouped how.
///
/// Mutations address pipelines and parts by index, the way the editor
/// displays them. A mutation that fails leaves the model untouched.
#[derive(Debug, Clone)]
pub struct QueryModel {
    catalog: Arc<PartCatalog>,
    config: RenderConfig,
    measurement: String,
    policy: Option<String>,
    select: Vec<SelectPipeline>,
    group_by: GroupByClause,
    tags: Vec<TagCondition>,
    limit: Option<u64>,
    slimit: Option<u64>,
    order_by_time_desc: bool,
    tz: Option<String>,
    raw_query: bool,
    query: Option<String>,
}

impl QueryModel {
    /// Creates a model over `measurement` with the default select, group by
    /// and retention policy.
    pub fn new(catalog: Arc<PartCatalog>, measurement: impl Into<String>) -> Result<Self> {
        let target = QueryTarget {
            measurement: Some(measurement.into()),
            ..Default::default()
        };
        Self::from_target(catalog, &target)
    }

    /// Builds a model from a persisted target, filling in the defaults for
    /// anything the target leaves out.
    pub fn from_target(catalog: Arc<PartCatalog>, target: &QueryTarget) -> Result<Self> {
        let select = match target.select.as_deref() {
            Some(select) if !select.is_empty() => select
                .iter()
                .enumerate()
                .map(|(index, parts)| select_pipeline(&catalog, index, parts))
                .collect::<Result<Vec<_>>>()?,
            _ => vec![SelectPipeline::from_parts(vec![
                part(&catalog, &PartSpec::with_params("field", ["value"]))?,
                part(&catalog, &PartSpec::new("mean"))?,
            ])],
        };

        let group_by = match &target.group_by {
            Some(parts) => parts
                .iter()
                .map(|spec| group_by_part(&catalog, spec))
                .collect::<Result<Vec<_>>>()?,
            None => vec![
                part(&catalog, &PartSpec::with_params("time", ["$__interval"]))?,
                part(&catalog, &PartSpec::with_params("fill", ["null"]))?,
            ],
        };

        Ok(Self {
            catalog,
            config: RenderConfig::default(),
            measurement: target.measurement.clone().unwrap_or_default(),
            policy: Some(
                target
                    .policy
                    .clone()
                    .unwrap_or_else(|| DEFAULT_POLICY.to_string()),
            ),
            select,
            group_by: GroupByClause::from_parts(group_by),
            tags: target.tags.clone().unwrap_or_default(),
            limit: target.limit,
            slimit: target.slimit,
            order_by_time_desc: target.order_by_time == Some(OrderByTime::Desc),
            tz: target.tz.clone(),
            raw_query: target.raw_query,
            query: target.query.clone(),
        })
    }

    /// Replaces the render settings.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Writes the current state back to its persisted form.
    pub fn to_target(&self) -> QueryTarget {
        let spec = |part: &QueryPart| PartSpec::with_params(part.part_type(), part.params());

        QueryTarget {
            measurement: (!self.measurement.is_empty()).then(|| self.measurement.clone()),
            policy: self.policy.clone(),
            select: Some(
                self.select
                    .iter()
                    .map(|pipeline| pipeline.parts().iter().map(spec).collect())
                    .collect(),
            ),
            group_by: Some(self.group_by.parts().iter().map(spec).collect()),
            tags: Some(self.tags.clone()),
            limit: self.limit,
            slimit: self.slimit,
            order_by_time: Some(if self.order_by_time_desc {
                OrderByTime::Desc
            } else {
                OrderByTime::Asc
            }),
            tz: self.tz.clone(),
            raw_query: self.raw_query,
            query: self.query.clone(),
        }
    }

    /// The catalog parts are looked up in.
    pub fn catalog(&self) -> &Arc<PartCatalog> {
        &self.catalog
    }

    /// The render settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The measurement; empty until one is chosen.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Sets the measurement.
    pub fn set_measurement(&mut self, measurement: impl Into<String>) {
        self.measurement = measurement.into();
    }

    /// The retention policy.
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    /// Sets the retention policy. `None` and `default` both select the
    /// database's default policy.
    pub fn set_policy(&mut self, policy: Option<String>) {
        self.policy = policy;
    }

    /// The SELECT pipelines, one per output column.
    pub fn select(&self) -> &[SelectPipeline] {
        &self.select
    }

    /// The GROUP BY clause.
    pub fn group_by(&self) -> &GroupByClause {
        &self.group_by
    }

    /// The WHERE clause tag conditions.
    pub fn tags(&self) -> &[TagCondition] {
        &self.tags
    }

    /// Replaces the WHERE clause tag conditions.
    pub fn set_tags(&mut self, tags: Vec<TagCondition>) {
        self.tags = tags;
    }

    /// Sets the `LIMIT` clause.
    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit;
    }

    /// Sets the `SLIMIT` clause.
    pub fn set_slimit(&mut self, slimit: Option<u64>) {
        self.slimit = slimit;
    }

    /// Orders the result newest first.
    pub fn set_order_by_time_desc(&mut self, desc: bool) {
        self.order_by_time_desc = desc;
    }

    /// Sets the `tz(...)` clause.
    pub fn set_tz(&mut self, tz: Option<String>) {
        self.tz = tz;
    }

    /// Switches raw mode on or off, keeping the query text either way.
    pub fn set_raw_query(&mut self, raw_query: bool) {
        self.raw_query = raw_query;
    }

    /// Sets the query text used in raw mode.
    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query;
    }

    /// Returns true if the query groups by a time interval.
    pub fn has_group_by_time(&self) -> bool {
        self.group_by.has_time()
    }

    /// Returns true if the query has a fill policy.
    pub fn has_fill(&self) -> bool {
        self.group_by.has_fill()
    }

    /// Adds a part of `part_type` to the pipeline at `pipeline`, placed by
    /// its strategy. Adding a `field` appends a copy of the pipeline as a new
    /// SELECT column.
    pub fn add_select_part(&mut self, pipeline: usize, part_type: &str) -> Result<AddOutcome> {
        let definition = self.catalog.lookup(part_type)?;
        let target = self
            .select
            .get_mut(pipeline)
            .ok_or(Error::PipelineNotFound { index: pipeline })?;

        let outcome = target.add_part(QueryPart::new(definition))?;
        if let AddOutcome::Duplicated(copy) = &outcome {
            self.select.push(copy.clone());
        }

        debug!(pipeline, part_type, ?outcome, "added select part");
        Ok(outcome)
    }

    /// Removes the part at `index` of the pipeline at `pipeline`.
    ///
    /// Removing the field of a pipeline removes the whole pipeline, unless
    /// it is the only one, in which case nothing is removed.
    pub fn remove_select_part(&mut self, pipeline: usize, index: usize) -> Result<()> {
        let target = self
            .select
            .get_mut(pipeline)
            .ok_or(Error::PipelineNotFound { index: pipeline })?;
        let category = target
            .parts()
            .get(index)
            .map(QueryPart::category)
            .ok_or(Error::PartNotFound { pipeline, index })?;

        if category == PartCategory::Fields {
            return self.remove_select(pipeline);
        }

        if let Some(removed) = target.remove_part(index) {
            debug!(pipeline, index, part_type = removed.part_type(), "removed select part");
        }
        Ok(())
    }

    /// Removes the pipeline at `index`, unless it is the only one.
    pub fn remove_select(&mut self, index: usize) -> Result<()> {
        if index >= self.select.len() {
            return Err(Error::PipelineNotFound { index });
        }
        if self.select.len() == 1 {
            warn!(pipeline = index, "ignoring removal of the only select pipeline");
            return Ok(());
        }

        self.select.remove(index);
        debug!(pipeline = index, "removed select pipeline");
        Ok(())
    }

    /// Mutable access to a select part, to edit its params.
    pub fn select_part_mut(&mut self, pipeline: usize, index: usize) -> Result<&mut QueryPart> {
        self.select
            .get_mut(pipeline)
            .ok_or(Error::PipelineNotFound { index: pipeline })?
            .part_mut(index)
            .ok_or(Error::PartNotFound { pipeline, index })
    }

    /// Adds a GROUP BY part from editor input such as `tag(host)`,
    /// `fill(null)` or `time($__interval)`. An empty argument, `fill()`,
    /// takes the part's default params.
    pub fn add_group_by(&mut self, spec: &str) -> Result<()> {
        let (part_type, argument) = parse_group_by_spec(spec)?;
        let definition = self.catalog.lookup(part_type)?;
        if definition.category != PartCategory::GroupByTime {
            return Err(Error::InvalidGroupBySpec {
                spec: spec.to_string(),
                reason: "not a GROUP BY part",
            });
        }

        let part = match argument {
            "" => QueryPart::new(definition),
            argument => QueryPart::with_params(definition, vec![argument.to_string()]),
        };
        let index = self.group_by.add(part);

        debug!(spec, part_type, index, "added group by part");
        Ok(())
    }

    /// Removes the GROUP BY part at `index`.
    ///
    /// Without a time interval a fill policy and the aggregations and
    /// selectors no longer apply, so removing `time` removes those as well.
    pub fn remove_group_by_part(&mut self, index: usize) -> Result<()> {
        let removed = self
            .group_by
            .remove(index)
            .ok_or(Error::GroupByPartNotFound { index })?;

        if removed.part_type() == "time" {
            self.group_by.remove_fill();
            for pipeline in &mut self.select {
                pipeline.remove_parts_where(|part| {
                    matches!(
                        part.category(),
                        PartCategory::Aggregations | PartCategory::Selectors
                    )
                });
            }
        }

        debug!(index, part_type = removed.part_type(), "removed group by part");
        Ok(())
    }

    /// Mutable access to a GROUP BY part, to edit its params.
    pub fn group_by_part_mut(&mut self, index: usize) -> Result<&mut QueryPart> {
        self.group_by
            .part_mut(index)
            .ok_or(Error::GroupByPartNotFound { index })
    }

    /// Renders the query to InfluxQL.
    ///
    /// In raw mode the query text is returned as is. Otherwise the clauses
    /// are assembled in a fixed order:
    ///
    /// ```text
    /// SELECT <pipelines> FROM <measurement> WHERE [(<tags>) AND ]<time filter>
    ///   [GROUP BY <time>, <tags> [fill(..)]] [ORDER BY time DESC]
    ///   [LIMIT n] [SLIMIT n] [tz('..')]
    /// ```
    pub fn render(&self) -> Result<String> {
        if let Some(query) = self.query.as_ref().filter(|_| self.raw_query) {
            return Ok(query.clone());
        }

        if self.measurement.is_empty() {
            return Err(Error::MissingMeasurement);
        }

        let columns: Vec<String> = self
            .select
            .iter()
            .map(|pipeline| pipeline.render(&self.config))
            .collect();

        let mut query = format!(
            "SELECT {} FROM {} WHERE ",
            columns.join(", "),
            qualified_measurement(&self.measurement, self.policy.as_deref())
        );

        if let Some(conditions) = render_tag_conditions(&self.tags) {
            query.push_str(&format!("({conditions}) AND "));
        }
        query.push_str(&self.config.time_filter);

        if let Some(group_by) = self.group_by.render(&self.config) {
            query.push_str(" GROUP BY ");
            query.push_str(&group_by);
        }
        if self.order_by_time_desc {
            query.push_str(" ORDER BY time DESC");
        }
        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(slimit) = self.slimit {
            query.push_str(&format!(" SLIMIT {slimit}"));
        }
        if let Some(tz) = &self.tz {
            query.push_str(&format!(" tz({})", SingleQuoted(tz)));
        }

        trace!(%query, "rendered query");
        Ok(query)
    }

    /// Renders ad hoc filters with the same rules as the WHERE clause
    /// conditions, without the time filter.
    pub fn render_adhoc_filters(&self, filters: &[TagCondition]) -> String {
        render_tag_conditions(filters).unwrap_or_default()
    }

    /// A builder for metadata statements over this model's measurement,
    /// policy and tags.
    pub fn explore_builder(&self) -> ExploreQueryBuilder<'_> {
        ExploreQueryBuilder::new(&self.measurement, self.policy.as_deref(), &self.tags)
            .with_config(&self.config)
    }
}

fn part(catalog: &PartCatalog, spec: &PartSpec) -> Result<QueryPart> {
    let definition = catalog.lookup(&spec.part_type)?;
    Ok(match &spec.params {
        Some(params) => QueryPart::with_params(definition, params.clone()),
        None => QueryPart::new(definition),
    })
}

/// Position 0 of a pipeline is always its field.
fn select_pipeline(
    catalog: &PartCatalog,
    index: usize,
    specs: &[PartSpec],
) -> Result<SelectPipeline> {
    let parts = specs
        .iter()
        .map(|spec| select_part(catalog, spec))
        .collect::<Result<Vec<_>>>()?;

    match parts.first() {
        Some(field) if field.category() == PartCategory::Fields => {
            Ok(SelectPipeline::from_parts(parts))
        }
        _ => Err(Error::MissingField { pipeline: index }),
    }
}

fn select_part(catalog: &PartCatalog, spec: &PartSpec) -> Result<QueryPart> {
    let part = part(catalog, spec)?;
    if part.category() == PartCategory::GroupByTime {
        return Err(Error::NotASelectPart {
            part_type: spec.part_type.clone(),
        });
    }
    Ok(part)
}

fn group_by_part(catalog: &PartCatalog, spec: &PartSpec) -> Result<QueryPart> {
    let part = part(catalog, spec)?;
    if part.category() != PartCategory::GroupByTime {
        return Err(Error::InvalidGroupBySpec {
            spec: spec.part_type.clone(),
            reason: "not a GROUP BY part",
        });
    }
    Ok(part)
}
