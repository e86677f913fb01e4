//! Scoped type labels and instance identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scoped name identifying a type.
///
/// Thing types carry an unscoped name (`person`); role types are scoped by
/// the relation type that declares them (`employment:employee`). Labels are
/// plain values: two labels are equal when scope and name are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Label {
    scope: Option<String>,
    name: String,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label {
            scope: None,
            name: name.into(),
        }
    }

    pub fn scoped(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Label {
            scope: Some(scope.into()),
            name: name.into(),
        }
    }

    /// Parse the `scope:name` form; a string without a colon is unscoped.
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((scope, name)) => Label::scoped(scope, name),
            None => Label::new(text),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The same label with a different scope, name unchanged.
    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Label::scoped(scope, self.name.clone())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}", scope, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::parse(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::parse(&s)
    }
}

/// Immutable instance identifier of a thing, assigned once by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Iid(String);

impl Iid {
    pub fn new(iid: impl Into<String>) -> Self {
        Iid(iid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Iid {
    fn from(s: &str) -> Self {
        Iid(s.to_string())
    }
}
