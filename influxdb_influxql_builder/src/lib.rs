//! # Compose and render [InfluxQL] queries from editable query parts
//!
//! A query is held as a [`QueryModel`]: a measurement, an optional retention
//! policy, a list of [`SelectPipeline`]s (one per output column), a
//! [`GroupByClause`] and a list of [`TagCondition`]s. The model is edited
//! incrementally by adding and removing parts, each placed according to the
//! [`StrategyId`] of its [`PartDefinition`], and rendered to InfluxQL text
//! with [`QueryModel::render`].
//!
//! Metadata discovery statements (`SHOW TAG KEYS`, `SHOW MEASUREMENTS`, ...)
//! are produced by the [`ExploreQueryBuilder`].
//!
//! [InfluxQL]: https://docs.influxdata.com/influxdb/v1.8/query_language

#![deny(rustdoc::broken_intra_doc_links, rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::dbg_macro
)]

pub use crate::catalog::*;
pub use crate::config::*;
pub use crate::explore::*;
pub use crate::group_by::*;
pub use crate::model::*;
pub use crate::part::*;
pub use crate::pipeline::*;
pub use crate::string::regex_escape;
pub use crate::tag::*;
pub use crate::target::*;

use thiserror::Error;

mod catalog;
mod config;
mod explore;
mod group_by;
mod model;
mod part;
mod pipeline;
mod string;
mod tag;
mod target;

/// Errors returned when editing or rendering a query.
#[derive(Debug, Error)]
pub enum Error {
    /// A query was rendered without a measurement.
    #[error("a measurement is required to render the query")]
    MissingMeasurement,

    /// The part type is not registered in the [`PartCatalog`].
    #[error("unknown query part type: {part_type}")]
    UnknownPartType {
        /// The type that was looked up.
        part_type: String,
    },

    /// The part type exists but only belongs in a GROUP BY clause.
    #[error("query part {part_type} cannot be added to a select pipeline")]
    NotASelectPart {
        /// The offending part type.
        part_type: String,
    },

    /// The input to [`QueryModel::add_group_by`] is not a `name(arg)` call.
    #[error("invalid GROUP BY part {spec:?}: {reason}")]
    InvalidGroupBySpec {
        /// The rejected input.
        spec: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// No select pipeline exists at the index.
    #[error("select pipeline {index} does not exist")]
    PipelineNotFound {
        /// The requested pipeline index.
        index: usize,
    },

    /// A persisted select pipeline does not start with a field.
    #[error("select pipeline {pipeline} does not start with a field")]
    MissingField {
        /// The pipeline index.
        pipeline: usize,
    },

    /// No part exists at the index of the select pipeline.
    #[error("part {index} does not exist in select pipeline {pipeline}")]
    PartNotFound {
        /// The pipeline index.
        pipeline: usize,
        /// The requested part index.
        index: usize,
    },

    /// No GROUP BY part exists at the index.
    #[error("GROUP BY part {index} does not exist")]
    GroupByPartNotFound {
        /// The requested part index.
        index: usize,
    },

    /// `SHOW RETENTION POLICIES` was requested without a database.
    #[error("a database is required to show retention policies")]
    MissingDatabase,

    /// The explore query kind is not recognised.
    #[error("unknown explore query kind: {0}")]
    InvalidExploreKind(String),

    /// A persisted query target could not be encoded or decoded.
    #[error("invalid query target: {0}")]
    InvalidTarget(#[from] serde_json::Error),
}

/// A specialized `Result` for query building errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;
