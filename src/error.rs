// error.rs - Error types for the CAAS engine

use std::error;
use std::fmt;

/// A trait-file line that could not be split into species + group.
///
/// Malformed lines are tolerated (trait files commonly contain blank or
/// comment lines): callers log the record and skip the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedTraitRecord {
    /// 1-based line number inside the offending file
    pub line: usize,
    /// Raw line content
    pub content: String,
}

impl fmt::Display for MalformedTraitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed trait record at line {}: '{}'",
            self.line, self.content
        )
    }
}

impl error::Error for MalformedTraitRecord {}

/// Tree file could not be parsed in the declared schema. Fatal for the run.
#[derive(Debug, Clone)]
pub struct TreeParseError {
    pub message: String,
}

impl TreeParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TreeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree parse error: {}", self.message)
    }
}

impl error::Error for TreeParseError {}

/// A required input for the selected mode was not supplied. Fatal,
/// reported immediately and never retried.
#[derive(Debug, Clone)]
pub struct MissingConfigurationInput {
    pub message: String,
}

impl MissingConfigurationInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for MissingConfigurationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing configuration input: {}", self.message)
    }
}

impl error::Error for MissingConfigurationInput {}

/// A position p-value fell outside `[-EPS, 1 + EPS]` before clamping.
///
/// The inclusion-exclusion correction can exceed the base sum for some
/// symbol-frequency distributions. The value is clamped into `[0, 1]` but
/// the anomaly is reported, never silently masked.
#[derive(Debug, Clone, Copy)]
pub struct NumericAnomaly {
    /// Alignment column the anomaly occurred at
    pub position: usize,
    /// The raw, unclamped value
    pub value: f64,
}

impl fmt::Display for NumericAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p-value {} at position {} outside [0, 1]",
            self.value, self.position
        )
    }
}

impl error::Error for NumericAnomaly {}
