//! Select pipelines and the placement strategies applied when parts are
//! added to them.
//!
//! A pipeline produces one column of the SELECT clause. Its parts are kept
//! in the order
//!
//! ```text
//! field → aggregation | selector → transformation* → math? → alias?
//! ```
//!
//! and rendered by folding each part over the text of the previous ones.

use crate::catalog::{PartCategory, StrategyId};
use crate::config::RenderConfig;
use crate::part::QueryPart;
use crate::{Error, Result};

/// What adding a part did to a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The part was inserted.
    Inserted,
    /// The part replaced an existing one.
    Replaced,
    /// The pipeline already had the part and was left as is.
    Unchanged,
    /// Adding a field duplicated the pipeline; the copy is returned for the
    /// caller to append to the query.
    Duplicated(SelectPipeline),
}

/// An ordered chain of parts rendering one SELECT column.
///
/// The first part is always a [`PartCategory::Fields`] part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectPipeline {
    parts: Vec<QueryPart>,
}

impl SelectPipeline {
    /// Creates a pipeline reading `field`.
    pub fn new(field: QueryPart) -> Self {
        Self { parts: vec![field] }
    }

    /// Creates a pipeline from already ordered parts.
    pub(crate) fn from_parts(parts: Vec<QueryPart>) -> Self {
        Self { parts }
    }

    /// The parts of the pipeline, in order.
    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    /// The number of parts in the pipeline.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the pipeline has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn part_mut(&mut self, index: usize) -> Option<&mut QueryPart> {
        self.parts.get_mut(index)
    }

    /// Adds `part` according to its [`StrategyId`].
    pub fn add_part(&mut self, part: QueryPart) -> Result<AddOutcome> {
        let outcome = match part.definition().strategy {
            StrategyId::ReplaceAggregation => self.add_aggregation(part),
            StrategyId::Transformation => self.add_transformation(part),
            StrategyId::Math => self.add_math(part),
            StrategyId::Alias => self.add_alias(part),
            StrategyId::Field => AddOutcome::Duplicated(self.clone()),
            StrategyId::GroupBy => {
                return Err(Error::NotASelectPart {
                    part_type: part.part_type().to_string(),
                });
            }
        };
        Ok(outcome)
    }

    /// Removes and returns the part at `index`. Paired parts are left alone,
    /// so removing `distinct` keeps a following `count`.
    pub fn remove_part(&mut self, index: usize) -> Option<QueryPart> {
        (index < self.parts.len()).then(|| self.parts.remove(index))
    }

    /// Removes every part matching `f`.
    pub(crate) fn remove_parts_where(&mut self, f: impl Fn(&QueryPart) -> bool) {
        self.parts.retain(|part| !f(part));
    }

    fn add_aggregation(&mut self, part: QueryPart) -> AddOutcome {
        let new_type = part.part_type();

        for i in 0..self.parts.len() {
            let existing = &self.parts[i];
            let existing_type = existing.part_type();

            match existing.category() {
                PartCategory::Aggregations | PartCategory::Selectors
                    if existing_type == new_type =>
                {
                    return AddOutcome::Unchanged;
                }
                PartCategory::Aggregations => {
                    // count(distinct(..)) is allowed
                    if existing_type == "count" && new_type == "distinct" {
                        self.parts.insert(i, part);
                        return AddOutcome::Inserted;
                    }

                    if existing_type == "distinct" {
                        let next_is_count = self
                            .parts
                            .get(i + 1)
                            .is_some_and(|next| next.part_type() == "count");

                        if new_type == "count" {
                            if next_is_count {
                                return AddOutcome::Unchanged;
                            }
                            self.parts.insert(i + 1, part);
                            return AddOutcome::Inserted;
                        }

                        // the paired count goes away with the distinct
                        if next_is_count {
                            self.parts.remove(i + 1);
                        }
                    }

                    self.parts[i] = part;
                    return AddOutcome::Replaced;
                }
                PartCategory::Selectors => {
                    self.parts[i] = part;
                    return AddOutcome::Replaced;
                }
                _ => {}
            }
        }

        self.parts.insert(self.parts.len().min(1), part);
        AddOutcome::Inserted
    }

    fn add_transformation(&mut self, part: QueryPart) -> AddOutcome {
        let index = self
            .parts
            .iter()
            .position(|p| matches!(p.category(), PartCategory::Math | PartCategory::Aliasing))
            .unwrap_or(self.parts.len());
        self.parts.insert(index, part);
        AddOutcome::Inserted
    }

    fn add_math(&mut self, part: QueryPart) -> AddOutcome {
        let count = self.parts.len();
        let category_at = |index: Option<usize>| {
            index
                .and_then(|i| self.parts.get(i))
                .map(QueryPart::category)
        };
        let last = count.checked_sub(1);
        let second_to_last = count.checked_sub(2);

        match (category_at(last), category_at(second_to_last)) {
            (Some(PartCategory::Math), _) => {
                self.parts[count - 1] = part;
                AddOutcome::Replaced
            }
            (_, Some(PartCategory::Math)) => {
                self.parts[count - 2] = part;
                AddOutcome::Replaced
            }
            (Some(PartCategory::Aliasing), _) => {
                self.parts.insert(count - 1, part);
                AddOutcome::Inserted
            }
            _ => {
                self.parts.push(part);
                AddOutcome::Inserted
            }
        }
    }

    fn add_alias(&mut self, part: QueryPart) -> AddOutcome {
        match self.parts.last_mut() {
            Some(last) if last.category() == PartCategory::Aliasing => {
                *last = part;
                AddOutcome::Replaced
            }
            _ => {
                self.parts.push(part);
                AddOutcome::Inserted
            }
        }
    }

    /// Renders the pipeline by folding every part over the text of the parts
    /// before it.
    pub fn render(&self, config: &RenderConfig) -> String {
        self.parts
            .iter()
            .fold(String::new(), |inner, part| part.render(&inner, config))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::PartCatalog;
    use assert_matches::assert_matches;

    fn part(catalog: &PartCatalog, part_type: &str) -> QueryPart {
        QueryPart::new(catalog.lookup(part_type).unwrap())
    }

    fn pipeline(catalog: &PartCatalog, types: &[&str]) -> SelectPipeline {
        SelectPipeline::from_parts(types.iter().map(|t| part(catalog, t)).collect())
    }

    fn types(pipeline: &SelectPipeline) -> Vec<&'static str> {
        pipeline.parts().iter().map(QueryPart::part_type).collect()
    }

    fn add(catalog: &PartCatalog, pipeline: &mut SelectPipeline, part_type: &str) -> AddOutcome {
        pipeline.add_part(part(catalog, part_type)).unwrap()
    }

    #[test]
    fn test_aggregation_inserted_after_field() {
        let catalog = PartCatalog::new();
        let mut p = pipeline(&catalog, &["field", "derivative"]);
        assert_eq!(add(&catalog, &mut p, "mean"), AddOutcome::Inserted);
        assert_eq!(types(&p), ["field", "mean", "derivative"]);
    }

    #[test]
    fn test_aggregation_replaced() {
        let catalog = PartCatalog::new();
        let mut p = pipeline(&catalog, &["field", "mean", "math"]);
        assert_eq!(add(&catalog, &mut p, "sum"), AddOutcome::Replaced);
        assert_eq!(types(&p), ["field", "sum", "math"]);

        // selectors replace aggregations and the other way around
        add(&catalog, &mut p, "max");
        assert_eq!(types(&p), ["field", "max", "math"]);
        add(&catalog, &mut p, "median");
        assert_eq!(types(&p), ["field", "median", "math"]);
    }

    #[test]
    fn test_aggregation_idempotent() {
        let catalog = PartCatalog::new();
        let mut p = pipeline(&catalog, &["field", "top"]);
        p.part_mut(1).unwrap().update_param("10", 0);

        assert_eq!(add(&catalog, &mut p, "top"), AddOutcome::Unchanged);
        // the existing part keeps its params
        assert_eq!(p.parts()[1].params(), ["10"]);
    }

    #[test]
    fn test_distinct_count_pairing() {
        let catalog = PartCatalog::new();

        // distinct joins an existing count
        let mut p = pipeline(&catalog, &["field", "count"]);
        assert_eq!(add(&catalog, &mut p, "distinct"), AddOutcome::Inserted);
        assert_eq!(types(&p), ["field", "distinct", "count"]);
        assert_eq!(
            p.render(&RenderConfig::default()),
            r#"count(distinct("value"))"#
        );

        // adding either again changes nothing
        assert_eq!(add(&catalog, &mut p, "count"), AddOutcome::Unchanged);
        assert_eq!(add(&catalog, &mut p, "distinct"), AddOutcome::Unchanged);
        assert_eq!(types(&p), ["field", "distinct", "count"]);

        // count joins an existing distinct
        let mut p = pipeline(&catalog, &["field", "distinct", "math"]);
        assert_eq!(add(&catalog, &mut p, "count"), AddOutcome::Inserted);
        assert_eq!(types(&p), ["field", "distinct", "count", "math"]);
    }

    #[test]
    fn test_distinct_replaced_with_its_count() {
        let catalog = PartCatalog::new();

        let mut p = pipeline(&catalog, &["field", "distinct", "count", "alias"]);
        assert_eq!(add(&catalog, &mut p, "mean"), AddOutcome::Replaced);
        assert_eq!(types(&p), ["field", "mean", "alias"]);

        let mut p = pipeline(&catalog, &["field", "distinct", "count"]);
        add(&catalog, &mut p, "percentile");
        assert_eq!(types(&p), ["field", "percentile"]);

        // without a paired count only the distinct is replaced
        let mut p = pipeline(&catalog, &["field", "distinct", "derivative"]);
        add(&catalog, &mut p, "sum");
        assert_eq!(types(&p), ["field", "sum", "derivative"]);
    }

    #[test]
    fn test_transformation_placement() {
        let catalog = PartCatalog::new();

        let mut p = pipeline(&catalog, &["field", "mean"]);
        add(&catalog, &mut p, "derivative");
        assert_eq!(types(&p), ["field", "mean", "derivative"]);

        let mut p = pipeline(&catalog, &["field", "mean", "math", "alias"]);
        add(&catalog, &mut p, "holt_winters");
        assert_eq!(types(&p), ["field", "mean", "holt_winters", "math", "alias"]);

        let mut p = pipeline(&catalog, &["field", "mean", "alias"]);
        add(&catalog, &mut p, "cumulative_sum");
        assert_eq!(types(&p), ["field", "mean", "cumulative_sum", "alias"]);
    }

    #[test]
    fn test_math_placement() {
        let catalog = PartCatalog::new();

        let mut p = pipeline(&catalog, &["field", "mean"]);
        assert_eq!(add(&catalog, &mut p, "math"), AddOutcome::Inserted);
        assert_eq!(types(&p), ["field", "mean", "math"]);

        // last is math
        assert_eq!(add(&catalog, &mut p, "math"), AddOutcome::Replaced);
        assert_eq!(types(&p), ["field", "mean", "math"]);

        // alias goes last, a new math still replaces the existing one
        add(&catalog, &mut p, "alias");
        assert_eq!(add(&catalog, &mut p, "math"), AddOutcome::Replaced);
        assert_eq!(types(&p), ["field", "mean", "math", "alias"]);

        // no math yet, but an alias
        let mut p = pipeline(&catalog, &["field", "mean", "alias"]);
        assert_eq!(add(&catalog, &mut p, "math"), AddOutcome::Inserted);
        assert_eq!(types(&p), ["field", "mean", "math", "alias"]);
    }

    #[test]
    fn test_alias_placement() {
        let catalog = PartCatalog::new();

        let mut p = pipeline(&catalog, &["field", "mean"]);
        assert_eq!(add(&catalog, &mut p, "alias"), AddOutcome::Inserted);
        assert_eq!(add(&catalog, &mut p, "alias"), AddOutcome::Replaced);
        assert_eq!(types(&p), ["field", "mean", "alias"]);
    }

    #[test]
    fn test_field_duplicates_pipeline() {
        let catalog = PartCatalog::new();

        let mut p = pipeline(&catalog, &["field", "mean", "alias"]);
        p.part_mut(2).unwrap().update_param("load", 0);

        let outcome = add(&catalog, &mut p, "field");
        assert_matches!(outcome, AddOutcome::Duplicated(copy) => {
            assert_eq!(copy, p);
        });
        // the source pipeline is untouched
        assert_eq!(types(&p), ["field", "mean", "alias"]);
    }

    #[test]
    fn test_group_by_part_rejected() {
        let catalog = PartCatalog::new();
        let mut p = pipeline(&catalog, &["field", "mean"]);

        assert_matches!(
            p.add_part(part(&catalog, "fill")),
            Err(Error::NotASelectPart { part_type }) if part_type == "fill"
        );
        assert_eq!(types(&p), ["field", "mean"]);
    }

    #[test]
    fn test_remove_part_keeps_orphans() {
        let catalog = PartCatalog::new();
        let mut p = pipeline(&catalog, &["field", "distinct", "count"]);

        let removed = p.remove_part(1).unwrap();
        assert_eq!(removed.part_type(), "distinct");
        assert_eq!(types(&p), ["field", "count"]);

        assert!(p.remove_part(5).is_none());
    }

    #[test]
    fn test_render_fold() {
        let catalog = PartCatalog::new();
        let mut p = pipeline(&catalog, &["field", "mean", "math", "alias"]);
        p.part_mut(2).unwrap().update_param("/ 100", 0);
        p.part_mut(3).unwrap().update_param("x", 0);

        insta::assert_snapshot!(p.render(&RenderConfig::default()), @r#"mean("value") / 100 AS "x""#);
    }
}
