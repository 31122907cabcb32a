//! Error types for the track hub builder.
//!
//! Every fallible operation in the core returns [`HubError`]. Structural edits,
//! parameter problems and validation failures are kept apart so callers can
//! report the node and the rule that was broken instead of a generic message.

use crate::node::{NodeId, NodeKind};
use std::fmt;
use thiserror::Error;

/// Main error type for the track hub core.
///
/// - Structure errors (illegal tree edits: cycles, disallowed children)
/// - Parameter errors (bad keys, bad values, bad names)
/// - Validation errors (one or more semantic violations across the tree)
/// - Configuration and IO errors (hub definition files)
#[derive(Error, Debug)]
pub enum HubError {
    /// Illegal tree edit
    ///
    /// # Example
    /// ```
    /// use trackhub_libs::HubError;
    /// let error = HubError::Structure("cannot attach 'hub' below itself".to_string());
    /// ```
    #[error("Structure error: {0}")]
    Structure(String),

    /// Invalid parameter key or value, or an invalid node name
    ///
    /// # Example
    /// ```
    /// use trackhub_libs::HubError;
    /// let error = HubError::Parameter("color: '300,0,0' is not an RGB triple".to_string());
    /// ```
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// One or more violations found by the validator
    #[error("Validation error: {0}")]
    Validation(ValidationError),

    /// Configuration error - invalid or missing hub definition fields
    ///
    /// # Example
    /// ```
    /// use trackhub_libs::HubError;
    /// let error = HubError::ConfigError("Missing required field 'hub.email'".to_string());
    /// ```
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    ///
    /// Wraps serde_yaml errors for hub definition parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl HubError {
    /// The violations carried by a validation error, empty for other variants.
    pub fn violations(&self) -> &[Violation] {
        match self {
            HubError::Validation(err) => &err.violations,
            _ => &[],
        }
    }
}

impl From<ValidationError> for HubError {
    fn from(err: ValidationError) -> Self {
        HubError::Validation(err)
    }
}

/// The rule a node broke, with the details needed to fix it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A parameter the node kind requires is absent
    MissingParameter(String),

    /// A parameter the node kind does not allow is present
    ForbiddenParameter(String),

    /// A parameter not recognized for this node kind or track type
    UnknownParameter(String),

    /// A recognized parameter with a malformed value
    InvalidValue { key: String, reason: String },

    /// A child whose kind the parent does not accept
    ChildKind(NodeKind),

    /// A required single child is absent
    MissingChild(NodeKind),

    /// More than one child in a single-child slot
    TooManyChildren(NodeKind),

    /// A container with nothing inside it
    EmptyContainer,

    /// A leaf track without a local source or a remote url
    MissingDataFile,

    /// Two track-family nodes share a name within one trackDb
    DuplicateName(String),

    /// Two genomes share an identifier within the genome collection
    DuplicateGenome(String),

    /// A child of a view or aggregate whose type differs from its container
    TypeMismatch { expected: String, found: String },

    /// Subgroup tags that do not fit the composite's subgroup schema
    SubgroupMismatch(String),

    /// A `group` parameter naming a group the genome does not define
    UnknownGroup(String),

    /// Parent/child links that disagree with each other
    BrokenLink(String),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::MissingParameter(key) => write!(f, "missing required parameter '{}'", key),
            Rule::ForbiddenParameter(key) => write!(f, "parameter '{}' is not allowed here", key),
            Rule::UnknownParameter(key) => write!(f, "unknown parameter '{}'", key),
            Rule::InvalidValue { key, reason } => write!(f, "invalid value for '{}': {}", key, reason),
            Rule::ChildKind(kind) => write!(f, "child of kind {} is not allowed", kind),
            Rule::MissingChild(kind) => write!(f, "requires exactly one {} child", kind),
            Rule::TooManyChildren(kind) => write!(f, "more than one {} child", kind),
            Rule::EmptyContainer => write!(f, "container has no children"),
            Rule::MissingDataFile => write!(f, "leaf track has neither a source file nor a url"),
            Rule::DuplicateName(name) => write!(f, "track name '{}' is used more than once", name),
            Rule::DuplicateGenome(id) => write!(f, "genome '{}' is defined more than once", id),
            Rule::TypeMismatch { expected, found } => {
                write!(f, "type '{}' does not match container type '{}'", found, expected)
            }
            Rule::SubgroupMismatch(detail) => write!(f, "subgroup mismatch: {}", detail),
            Rule::UnknownGroup(group) => write!(f, "group '{}' is not defined", group),
            Rule::BrokenLink(detail) => write!(f, "broken link: {}", detail),
        }
    }
}

/// A single violation, tagged with the offending node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub node: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub rule: Rule,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': {}", self.kind, self.name, self.rule)
    }
}

/// Every violation found by one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "; {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_error() {
        let error = HubError::Structure("test error".to_string());
        assert_eq!(error.to_string(), "Structure error: test error");
    }

    #[test]
    fn test_parameter_error() {
        let error = HubError::Parameter("test error".to_string());
        assert_eq!(error.to_string(), "Parameter error: test error");
    }

    #[test]
    fn test_config_error() {
        let error = HubError::ConfigError("test error".to_string());
        assert_eq!(error.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_lists_every_violation() {
        let error: HubError = ValidationError {
            violations: vec![
                Violation {
                    node: NodeId(3),
                    name: "reads".to_string(),
                    kind: NodeKind::Track,
                    rule: Rule::MissingParameter("type".to_string()),
                },
                Violation {
                    node: NodeId(4),
                    name: "peaks".to_string(),
                    kind: NodeKind::Track,
                    rule: Rule::MissingDataFile,
                },
            ],
        }
        .into();

        let message = error.to_string();
        assert!(message.starts_with("Validation error: 2 violation(s)"));
        assert!(message.contains("Track 'reads': missing required parameter 'type'"));
        assert!(message.contains("Track 'peaks'"));
        assert_eq!(error.violations().len(), 2);
    }
}
