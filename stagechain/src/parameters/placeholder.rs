//! Placeholder syntax shared by stage data, parameters and requirement patterns.
//!
//! Two whole-string forms are recognized:
//!
//! - `%name%` references a global parameter
//! - `%env(NAME)%` references a process environment variable
//!
//! Identifiers are `[A-Za-z0-9_-]+`. A placeholder embedded inside a larger
//! string is *not* a placeholder for these two forms; only requirement
//! patterns interpolate embedded `%dotted.path%` references, through
//! [`interpolate_paths`].

/// A parsed whole-string placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// `%name%`
    Parameter(&'a str),
    /// `%env(NAME)%`
    Env(&'a str),
}

impl<'a> Placeholder<'a> {
    /// Parses `s` as a placeholder. Returns `None` unless the whole string
    /// is exactly one placeholder.
    #[must_use]
    pub fn parse(s: &'a str) -> Option<Self> {
        let inner = s.strip_prefix('%')?.strip_suffix('%')?;

        if let Some(name) = inner.strip_prefix("env(").and_then(|r| r.strip_suffix(')')) {
            return is_identifier(name).then_some(Self::Env(name));
        }

        is_identifier(inner).then_some(Self::Parameter(inner))
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_path(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// Replaces every embedded `%dotted.path%` in `template` with the result of
/// `resolve(path)`.
///
/// Unresolvable paths are replaced by the empty string. A `%` that does not
/// open a valid reference is kept verbatim.
pub fn interpolate_paths<F>(template: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find('%') {
            Some(end) if is_path(&after[..end]) => {
                let path = &after[..end];
                if let Some(value) = resolve(path) {
                    out.push_str(&value);
                } else {
                    tracing::warn!(path, "placeholder has no value, substituting empty string");
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
