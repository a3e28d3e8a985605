//! Route pattern parsing.
//!
//! # Responsibilities
//! - Validate registered path patterns before they reach Axum
//! - Translate `:name` / `*name` segments into Axum's `{name}` / `{*name}`
//! - Detect routes that Axum would reject as conflicting, so they are caught
//!   at registration
//!
//! # Design Decisions
//! - Parameters always span a whole segment
//! - A catch-all must be the final segment
//! - Literal segments may not contain `{` or `}` (Axum reserves them)

use thiserror::Error;

/// Why a path pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path must begin with '/'")]
    MissingLeadingSlash,

    #[error("parameter in segment '{0}' has no name")]
    EmptyParamName(String),

    #[error("catch-all segment '{0}' must be last")]
    CatchAllNotLast(String),

    #[error("segment '{0}' contains a reserved character")]
    ReservedCharacter(String),

    #[error("parameter '{0}' appears more than once")]
    DuplicateParam(String),
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    axum: String,
    shape: String,
    params: Vec<String>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        let segments: Vec<&str> = rest.split('/').collect();
        let last = segments.len() - 1;

        let mut axum = String::with_capacity(raw.len() + 4);
        let mut shape = String::with_capacity(raw.len());
        let mut params: Vec<String> = Vec::new();

        for (i, segment) in segments.iter().enumerate() {
            axum.push('/');
            shape.push('/');

            if let Some(name) = segment.strip_prefix(':') {
                let name = param_name(segment, name, &params)?;
                axum.push_str(&format!("{{{name}}}"));
                shape.push_str("{}");
                params.push(name.to_string());
            } else if let Some(name) = segment.strip_prefix('*') {
                if i != last {
                    return Err(PatternError::CatchAllNotLast(segment.to_string()));
                }
                let name = param_name(segment, name, &params)?;
                axum.push_str(&format!("{{*{name}}}"));
                shape.push_str("{*}");
                params.push(name.to_string());
            } else {
                if segment.contains(['{', '}']) {
                    return Err(PatternError::ReservedCharacter(segment.to_string()));
                }
                axum.push_str(segment);
                shape.push_str(segment);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            axum,
            shape,
            params,
        })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The pattern in Axum route syntax.
    pub fn axum_path(&self) -> &str {
        &self.axum
    }

    /// The pattern with parameter names erased.
    ///
    /// Two patterns with the same shape but different parameter names cannot
    /// coexist in one Axum router.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// Whether both patterns could not be registered in one Axum router.
    ///
    /// Two cases conflict: the same shape under different parameter names,
    /// and a named parameter opposite a catch-all after an identical prefix.
    pub fn conflicts_with(&self, other: &PathPattern) -> bool {
        if self.shape == other.shape {
            return self.axum != other.axum;
        }
        self.shape
            .split('/')
            .zip(other.shape.split('/'))
            .find(|(a, b)| a != b)
            .is_some_and(|pair| matches!(pair, ("{}", "{*}") | ("{*}", "{}")))
    }
}

fn param_name<'a>(segment: &str, name: &'a str, seen: &[String]) -> Result<&'a str, PatternError> {
    if name.is_empty() {
        return Err(PatternError::EmptyParamName(segment.to_string()));
    }
    if name.contains(['{', '}', ':', '*']) {
        return Err(PatternError::ReservedCharacter(segment.to_string()));
    }
    if seen.iter().any(|s| s == name) {
        return Err(PatternError::DuplicateParam(name.to_string()));
    }
    Ok(name)
}
