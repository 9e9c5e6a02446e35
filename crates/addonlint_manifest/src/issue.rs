//! Raw findings produced by schema validation.

use std::fmt;

use serde_json::Value;

/// One step of an instance path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    Key(String),
    Index(usize),
}

impl PathToken {
    /// Splits a JSON pointer into tokens. Numeric segments become indices.
    pub fn parse_pointer(pointer: &str) -> Vec<PathToken> {
        pointer
            .split('/')
            .skip(1)
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathToken::Index(index),
                Err(_) => PathToken::Key(segment.replace("~1", "/").replace("~0", "~")),
            })
            .collect()
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathToken::Key(key) => write!(f, "{}", key.replace('~', "~0").replace('/', "~1")),
            PathToken::Index(index) => write!(f, "{}", index),
        }
    }
}

/// What kind of schema rule produced an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// A required property is missing.
    Required,
    /// A deprecated property is declared.
    Deprecated,
    /// The property needs a newer manifest version.
    MinManifestVersion,
    /// The property is no longer allowed in this manifest version.
    MaxManifestVersion,
    /// A privileged-only property is declared.
    Privileged { privileged_permissions: Vec<String> },
    /// The permission list fails the privileged-permissions rule.
    ///
    /// Carries the privileged permissions found in the list.
    PrivilegedPermissions { privileged_permissions: Vec<String> },
    /// The value has the wrong JSON type.
    Type,
    /// Any other schema keyword.
    Other { keyword: String },
}

/// One finding of the schema validator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSchemaIssue {
    pub kind: IssueKind,
    pub path: Vec<PathToken>,
    /// The offending value, when one exists at `path`.
    pub value: Option<Value>,
    pub message: String,
}

impl RawSchemaIssue {
    pub fn new(
        kind: IssueKind,
        path: Vec<PathToken>,
        value: Option<Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path,
            value,
            message: message.into(),
        }
    }

    /// Builds an issue from a JSON pointer string.
    pub fn at(kind: IssueKind, pointer: &str, value: Option<Value>, message: impl Into<String>) -> Self {
        Self::new(kind, PathToken::parse_pointer(pointer), value, message)
    }

    /// The instance path as a JSON pointer (`/permissions/0`).
    pub fn pointer(&self) -> String {
        self.path.iter().map(|token| format!("/{}", token)).collect()
    }

    /// The first path segment, when it is a key.
    pub fn top_level(&self) -> Option<&str> {
        match self.path.first() {
            Some(PathToken::Key(key)) => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_pointer() {
        assert_eq!(
            PathToken::parse_pointer("/permissions/3"),
            vec![PathToken::Key("permissions".into()), PathToken::Index(3)]
        );
        assert_eq!(PathToken::parse_pointer(""), Vec::<PathToken>::new());
        assert_eq!(
            PathToken::parse_pointer("/a~1b"),
            vec![PathToken::Key("a/b".into())]
        );
    }

    #[test]
    fn test_pointer_round_trip() {
        let issue = RawSchemaIssue::at(IssueKind::Type, "/icons/a~1b/0", None, "bad");
        assert_eq!(issue.pointer(), "/icons/a~1b/0");
        assert_eq!(issue.top_level(), Some("icons"));
    }

    #[test]
    fn test_root_issue_has_empty_pointer() {
        let issue = RawSchemaIssue::at(IssueKind::Required, "", None, "missing");
        assert_eq!(issue.pointer(), "");
        assert_eq!(issue.top_level(), None);
    }
}
