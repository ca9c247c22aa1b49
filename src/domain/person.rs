use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a person, used to stamp event authorship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Person(pub String);

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Person {
    fn from(s: String) -> Self {
        Person(s)
    }
}

impl From<&str> for Person {
    fn from(s: &str) -> Self {
        Person(s.to_string())
    }
}
