//! Quoting and escaping of identifiers, literals and regular expressions.

use std::fmt::{Display, Formatter, Write};

/// Writes `s` to `f`, mapping any characters from => to their escaped equivalents.
macro_rules! write_escaped {
    ($f: expr, $s: expr $(, $from:pat => $to:expr)+) => {
        for c in $s.chars() {
            match c {
                $(
                $from => $f.write_str($to)?,
                )+
                _ => $f.write_char(c)?,
            }
        }
    };
}

/// A string rendered as a single-quoted InfluxQL string literal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SingleQuoted<'a>(pub(crate) &'a str);

impl Display for SingleQuoted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('\'')?;
        write_escaped!(f, self.0, '\\' => "\\\\", '\'' => "\\'");
        f.write_char('\'')
    }
}

/// A string with every regular expression metacharacter and the `/`
/// delimiter escaped, so it matches itself literally inside `/.../`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegexEscaped<'a>(pub(crate) &'a str);

impl Display for RegexEscaped<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_escaped!(
            f,
            self.0,
            '\\' => "\\\\",
            '^' => "\\^",
            '$' => "\\$",
            '*' => "\\*",
            '+' => "\\+",
            '?' => "\\?",
            '.' => "\\.",
            '(' => "\\(",
            ')' => "\\)",
            '|' => "\\|",
            '[' => "\\[",
            ']' => "\\]",
            '{' => "\\{",
            '}' => "\\}",
            '/' => "\\/"
        );
        Ok(())
    }
}

/// Escapes `s` so it can be embedded in an InfluxQL regular expression
/// literal and match itself literally.
pub fn regex_escape(s: &str) -> String {
    RegexEscaped(s).to_string()
}

/// A string rendered as a double-quoted InfluxQL identifier.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DoubleQuoted<'a>(pub(crate) &'a str);

impl Display for DoubleQuoted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('"')?;
        write_escaped!(f, self.0, '\n' => "\\n", '\\' => "\\\\", '"' => "\\\"");
        f.write_char('"')
    }
}

/// Wraps `s` in double quotes, escaping it as an identifier.
pub(crate) fn double_quoted(s: &str) -> String {
    DoubleQuoted(s).to_string()
}

/// Returns true if `s` looks like a complete `/regex/` literal.
pub(crate) fn is_regex_literal(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('/') && s.ends_with('/') && !s.contains('\n')
}

/// Returns true if a measurement is emitted verbatim rather than quoted,
/// which is the case for regular expressions and `merge(...)` calls.
pub(crate) fn is_verbatim_measurement(s: &str) -> bool {
    s.starts_with('/') || s.starts_with("merge(")
}

/// Renders a measurement, prefixed by its retention policy unless the policy
/// is absent or `default`.
pub(crate) fn qualified_measurement(measurement: &str, policy: Option<&str>) -> String {
    let measurement = if is_verbatim_measurement(measurement) {
        measurement.to_string()
    } else {
        double_quoted(measurement)
    };

    match policy {
        Some(policy) if !is_default_policy(policy) => {
            format!("{}.{measurement}", double_quoted(policy))
        }
        _ => measurement,
    }
}

/// The retention policy name that means "no explicit policy".
pub(crate) const DEFAULT_POLICY: &str = "default";

pub(crate) fn is_default_policy(policy: &str) -> bool {
    policy.is_empty() || policy == DEFAULT_POLICY
}
