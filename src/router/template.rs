//! Route template parsing.
//!
//! A template is split into [`Segment`]s before insertion so the trie never
//! compares against parameter names:
//!
//! ```text
//! /users/:id/files/*path
//! └────┬──┘└┬┘└──┬──┘└─┬─┘
//!   Static  │  Static  CatchAll("path")
//!        Param("id")
//! ```

use crate::error::RouteError;

/// One parsed piece of a route template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'t> {
    /// Literal bytes, possibly spanning several `/`-separated segments
    Static(&'t str),
    /// `:name`, matches exactly one non-empty path segment
    Param(&'t str),
    /// `*name`, matches the remainder of the path
    CatchAll(&'t str),
}

/// Name given to a catch-all written as a bare `*`
pub(crate) const ANONYMOUS_CATCH_ALL: &str = "*";

fn malformed(path: &str, reason: &'static str) -> RouteError {
    RouteError::MalformedTemplate {
        path: path.to_string(),
        reason,
    }
}

/// Split a template into segments, rejecting anything ambiguous.
pub(crate) fn parse(template: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    if !template.starts_with('/') {
        return Err(malformed(template, "template must start with '/'"));
    }
    if template.len() > 1 && template.ends_with('/') {
        return Err(malformed(template, "template must not end with '/'"));
    }
    if template.contains("//") {
        return Err(malformed(template, "template contains an empty segment"));
    }

    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut static_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b':' if bytes[i - 1] == b'/' => {
                if static_start < i {
                    segments.push(Segment::Static(&template[static_start..i]));
                }
                let end = template[i..].find('/').map_or(template.len(), |n| i + n);
                let name = &template[i + 1..end];
                if name.is_empty() {
                    return Err(malformed(template, "parameter name is empty"));
                }
                if name.contains([':', '*']) {
                    return Err(malformed(
                        template,
                        "parameter name contains ':' or '*'",
                    ));
                }
                segments.push(Segment::Param(name));
                i = end;
                static_start = end;
            }
            b'*' => {
                if static_start < i {
                    segments.push(Segment::Static(&template[static_start..i]));
                }
                let name = &template[i + 1..];
                if name.contains('/') {
                    return Err(RouteError::CatchAllNotLast {
                        path: template.to_string(),
                    });
                }
                if name.contains([':', '*']) {
                    return Err(malformed(
                        template,
                        "catch-all name contains ':' or '*'",
                    ));
                }
                let name = if name.is_empty() {
                    ANONYMOUS_CATCH_ALL
                } else {
                    name
                };
                segments.push(Segment::CatchAll(name));
                return Ok(segments);
            }
            _ => i += 1,
        }
    }

    if static_start < template.len() {
        segments.push(Segment::Static(&template[static_start..]));
    }
    Ok(segments)
}

/// Join a group prefix and a route path the way a path join would: repeated
/// slashes collapse and a trailing slash is dropped. The root stays `/`.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let mut joined = String::with_capacity(prefix.len() + path.len() + 1);
    for part in [prefix, path] {
        for piece in part.split('/').filter(|p| !p.is_empty()) {
            joined.push('/');
            joined.push_str(piece);
        }
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

/// Strip trailing slashes from a request path. The root is never trimmed.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
