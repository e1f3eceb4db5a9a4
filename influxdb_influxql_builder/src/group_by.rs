//! The GROUP BY clause.
//!
//! Parts are added from editor input of the form `name(arg)`:
//!
//! ```text
//! group_by_spec ::= name "(" argument ")"
//! name          ::= [_a..zA..Z0..9]+
//! argument      ::= '"' [^"]+ '"' | "'" [^']+ "'" | [^\n]*
//! ```
//!
//! The argument extends to the last closing parenthesis, so `tag(a(b))` has
//! the argument `a(b)`.

use crate::config::RenderConfig;
use crate::part::QueryPart;
use crate::{Error, Result};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while1};
use nom::character::complete::char;
use nom::combinator::all_consuming;
use nom::sequence::{delimited, terminated};

const TIME: &str = "time";
const FILL: &str = "fill";
const TAG: &str = "tag";

fn function_name(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(i)
}

fn quoted_argument(i: &str) -> IResult<&str, &str> {
    all_consuming(alt((
        delimited(char('"'), is_not("\""), char('"')),
        delimited(char('\''), is_not("'"), char('\'')),
    )))(i)
}

/// Splits a `name(arg)` spec into the part type and its single argument.
/// A quoted argument is unquoted.
pub(crate) fn parse_group_by_spec(spec: &str) -> Result<(&str, &str)> {
    let invalid = |reason: &'static str| Error::InvalidGroupBySpec {
        spec: spec.to_string(),
        reason,
    };

    let (rest, name) = terminated(function_name, char('('))(spec.trim())
        .map_err(|_| invalid("expected a call such as tag(host)"))?;
    let argument = rest
        .strip_suffix(')')
        .ok_or_else(|| invalid("missing closing parenthesis"))?
        .trim();

    Ok(match quoted_argument(argument) {
        Ok((_, unquoted)) => (name, unquoted),
        Err(_) => (name, argument),
    })
}

/// The parts of a GROUP BY clause: `time`, `tag` and `fill`.
///
/// A `fill` part, when present, is always the last part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupByClause {
    parts: Vec<QueryPart>,
}

impl GroupByClause {
    pub(crate) fn from_parts(parts: Vec<QueryPart>) -> Self {
        Self { parts }
    }

    /// The parts of the clause, in order.
    pub fn parts(&self) -> &[QueryPart] {
        &self.parts
    }

    /// The number of parts in the clause.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the clause has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns true if the clause groups by a time interval.
    pub fn has_time(&self) -> bool {
        self.parts.iter().any(|p| p.part_type() == TIME)
    }

    /// Returns true if the clause has a fill policy.
    pub fn has_fill(&self) -> bool {
        self.parts.iter().any(|p| p.part_type() == FILL)
    }

    pub(crate) fn part_mut(&mut self, index: usize) -> Option<&mut QueryPart> {
        self.parts.get_mut(index)
    }

    /// Appends a `fill` part, and inserts any other part before an existing
    /// `fill`. Returns the index of the new part.
    pub(crate) fn add(&mut self, part: QueryPart) -> usize {
        let index = match part.part_type() {
            FILL => self.parts.len(),
            _ => self
                .parts
                .iter()
                .position(|p| p.part_type() == FILL)
                .unwrap_or(self.parts.len()),
        };
        self.parts.insert(index, part);
        index
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<QueryPart> {
        (index < self.parts.len()).then(|| self.parts.remove(index))
    }

    pub(crate) fn remove_fill(&mut self) {
        self.parts.retain(|p| p.part_type() != FILL);
    }

    /// Renders the clause body, without the `GROUP BY` keywords: the time
    /// interval first, then the tag keys, then the fill policy as a suffix.
    ///
    /// Returns `None` when there is nothing to group by.
    pub fn render(&self, config: &RenderConfig) -> Option<String> {
        let keys: Vec<String> = self
            .render_all(TIME, config)
            .chain(self.render_all(TAG, config))
            .collect();
        if keys.is_empty() {
            return None;
        }

        let mut clause = keys.join(", ");
        if let Some(fill) = self.render_all(FILL, config).last() {
            clause.push(' ');
            clause.push_str(&fill);
        }
        Some(clause)
    }

    fn render_all<'a>(
        &'a self,
        part_type: &'static str,
        config: &'a RenderConfig,
    ) -> impl Iterator<Item = String> + 'a {
        self.parts
            .iter()
            .filter(move |p| p.part_type() == part_type)
            .map(move |p| p.render("", config))
    }
}
