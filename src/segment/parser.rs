use std::fmt;
use std::sync::Arc;

use super::SegmentDescriptor;

/// Malformed segment syntax, reported at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentParseError {
    /// The segment text is empty
    Empty,
    /// Brackets or parentheses with nothing inside: `[]`, `[[]]`, `()`
    EmptyBrackets { segment: String },
    /// A catch-all marker with no name: `[...]`, `[[...]]`
    MissingName { segment: String },
    /// An opening bracket or parenthesis that is never closed, or a mismatched closer
    Unbalanced { segment: String },
    /// The parameter name or group label contains characters no segment can carry
    InvalidName { segment: String, name: String },
}

impl SegmentParseError {
    /// The raw segment text that failed to parse
    #[must_use]
    pub fn segment(&self) -> &str {
        match self {
            SegmentParseError::Empty => "",
            SegmentParseError::EmptyBrackets { segment }
            | SegmentParseError::MissingName { segment }
            | SegmentParseError::Unbalanced { segment }
            | SegmentParseError::InvalidName { segment, .. } => segment,
        }
    }
}

impl fmt::Display for SegmentParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentParseError::Empty => write!(f, "empty segment"),
            SegmentParseError::EmptyBrackets { segment } => {
                write!(f, "segment '{segment}' has nothing between its brackets")
            }
            SegmentParseError::MissingName { segment } => {
                write!(f, "catch-all segment '{segment}' has no parameter name")
            }
            SegmentParseError::Unbalanced { segment } => {
                write!(f, "segment '{segment}' has unbalanced brackets or parentheses")
            }
            SegmentParseError::InvalidName { segment, name } => write!(
                f,
                "segment '{segment}' declares invalid name '{name}' \
                (names may not be empty, start with '.', or contain '[', ']', '(', ')' or '/')"
            ),
        }
    }
}

impl std::error::Error for SegmentParseError {}

/// Parse one segment name into a [`SegmentDescriptor`].
///
/// Detection order: optional catch-all (`[[...]]`), catch-all (`[...x]`),
/// dynamic (`[x]`), group (`(x)`), static.
///
/// # Errors
///
/// Returns a [`SegmentParseError`] for empty brackets, a catch-all marker
/// without a name, unbalanced delimiters, or names with reserved characters.
pub fn parse_segment(raw: &str) -> Result<SegmentDescriptor, SegmentParseError> {
    if raw.is_empty() {
        return Err(SegmentParseError::Empty);
    }

    if let Some(rest) = raw.strip_prefix("[[") {
        let inner = rest
            .strip_suffix("]]")
            .ok_or_else(|| unbalanced(raw))?;
        let name = strip_ellipsis(raw, inner)?;
        return Ok(SegmentDescriptor::OptionalCatchAll {
            name: validated_name(raw, name)?,
        });
    }

    if let Some(rest) = raw.strip_prefix('[') {
        let inner = rest.strip_suffix(']').ok_or_else(|| unbalanced(raw))?;
        if inner.is_empty() {
            return Err(SegmentParseError::EmptyBrackets {
                segment: raw.to_string(),
            });
        }
        if inner.starts_with("...") {
            let name = strip_ellipsis(raw, inner)?;
            return Ok(SegmentDescriptor::CatchAll {
                name: validated_name(raw, name)?,
            });
        }
        return Ok(SegmentDescriptor::Dynamic {
            name: validated_name(raw, inner)?,
        });
    }

    if let Some(rest) = raw.strip_prefix('(') {
        let inner = rest.strip_suffix(')').ok_or_else(|| unbalanced(raw))?;
        if inner.is_empty() {
            return Err(SegmentParseError::EmptyBrackets {
                segment: raw.to_string(),
            });
        }
        return Ok(SegmentDescriptor::Group {
            label: validated_name(raw, inner)?,
        });
    }

    if raw.ends_with(']') || raw.ends_with(')') || raw.contains('/') {
        return Err(unbalanced(raw));
    }

    Ok(SegmentDescriptor::Static {
        literal: Arc::from(raw),
    })
}

/// Parse every segment of a chain, collecting all failures rather than stopping
/// at the first one.
///
/// # Errors
///
/// Returns every [`SegmentParseError`] found in the chain, in chain order.
pub fn parse_chain<S: AsRef<str>>(
    segments: &[S],
) -> Result<Vec<SegmentDescriptor>, Vec<SegmentParseError>> {
    let mut parsed = Vec::with_capacity(segments.len());
    let mut errors = Vec::new();
    for seg in segments {
        match parse_segment(seg.as_ref()) {
            Ok(d) => parsed.push(d),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(errors)
    }
}

fn unbalanced(raw: &str) -> SegmentParseError {
    SegmentParseError::Unbalanced {
        segment: raw.to_string(),
    }
}

/// `[[name]]` and `[[...name]]` are both optional catch-alls; `[...name]` needs the marker.
fn strip_ellipsis<'a>(raw: &str, inner: &'a str) -> Result<&'a str, SegmentParseError> {
    if inner.is_empty() {
        return Err(SegmentParseError::EmptyBrackets {
            segment: raw.to_string(),
        });
    }
    let name = inner.strip_prefix("...").unwrap_or(inner);
    if name.is_empty() {
        return Err(SegmentParseError::MissingName {
            segment: raw.to_string(),
        });
    }
    Ok(name)
}

fn validated_name(raw: &str, name: &str) -> Result<Arc<str>, SegmentParseError> {
    let reserved = |c: char| matches!(c, '[' | ']' | '(' | ')' | '/');
    if name.is_empty() || name.starts_with('.') || name.contains(reserved) {
        return Err(SegmentParseError::InvalidName {
            segment: raw.to_string(),
            name: name.to_string(),
        });
    }
    Ok(Arc::from(name))
}
