use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DomainError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// Maps a logical collection name to the collection used in `environment`.
/// Production reads the bare name; other environments get a prefixed copy.
pub fn resolve_collection_id(name: &str, environment: Environment) -> String {
    match environment {
        Environment::Production => name.to_string(),
        Environment::Development | Environment::Test => format!("{environment}_{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_collection_id() {
        assert_eq!(
            resolve_collection_id("manut-projects", Environment::Production),
            "manut-projects"
        );
        assert_eq!(
            resolve_collection_id("manut-projects", Environment::Development),
            "development_manut-projects"
        );
        assert_eq!(resolve_collection_id("docs-std", Environment::Test), "test_docs-std");
    }

    #[test]
    fn test_parse_environment() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("Test".parse::<Environment>(), Ok(Environment::Test));
        assert!("staging".parse::<Environment>().is_err());
    }
}
