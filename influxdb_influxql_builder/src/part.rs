//! Query parts: catalog definitions bound to parameter values.

use crate::catalog::{PartCategory, PartDefinition};
use crate::config::RenderConfig;
use std::sync::Arc;
use tracing::warn;

/// An instance of a [`PartDefinition`] with concrete parameters.
///
/// The rendered text of a part depends only on its definition and params.
#[derive(Debug, Clone)]
pub struct QueryPart {
    definition: Arc<PartDefinition>,
    params: Vec<String>,
}

impl PartialEq for QueryPart {
    fn eq(&self, other: &Self) -> bool {
        self.part_type() == other.part_type() && self.params == other.params
    }
}

impl Eq for QueryPart {}

impl QueryPart {
    /// Creates a part with the definition's default parameters.
    pub fn new(definition: Arc<PartDefinition>) -> Self {
        let params = definition.default_params.clone();
        Self { definition, params }
    }

    /// Creates a part with explicit parameters.
    pub fn with_params(definition: Arc<PartDefinition>, params: Vec<String>) -> Self {
        Self { definition, params }
    }

    /// The shared definition of this part.
    pub fn definition(&self) -> &Arc<PartDefinition> {
        &self.definition
    }

    /// The part type, e.g. `mean`.
    pub fn part_type(&self) -> &'static str {
        self.definition.part_type
    }

    /// The category of the part.
    pub fn category(&self) -> PartCategory {
        self.definition.category
    }

    /// The current parameter values.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Sets the parameter at `index` from editor input.
    ///
    /// An empty value removes an optional parameter. A comma separated value
    /// whose following parameter is optional sets both parameters at once.
    /// An index outside the definition's parameters is ignored.
    pub fn update_param(&mut self, value: &str, index: usize) {
        if index >= self.definition.params.len() {
            warn!(
                part_type = self.part_type(),
                index, "ignoring update of an undefined parameter"
            );
            return;
        }

        if self.has_multiple_params_in(value, index) {
            for (offset, value) in value.split(',').enumerate() {
                self.update_param(value.trim(), index + offset);
            }
            return;
        }

        let optional = self
            .definition
            .params
            .get(index)
            .is_some_and(|spec| spec.optional);

        if value.is_empty() && optional {
            if index < self.params.len() {
                self.params.remove(index);
            }
            return;
        }

        while self.params.len() <= index {
            let fill = self
                .definition
                .default_params
                .get(self.params.len())
                .cloned()
                .unwrap_or_default();
            self.params.push(fill);
        }
        self.params[index] = value.to_string();
    }

    fn has_multiple_params_in(&self, value: &str, index: usize) -> bool {
        value.contains(',')
            && self
                .definition
                .params
                .get(index + 1)
                .is_some_and(|spec| spec.optional)
    }

    /// Renders the part, wrapping `inner`, the text accumulated by the
    /// preceding parts of a pipeline.
    pub fn render(&self, inner: &str, config: &RenderConfig) -> String {
        self.definition.render(&self.params, inner, config)
    }
}
