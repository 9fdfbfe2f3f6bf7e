use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity recorded in a commit signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Developer {
    /// Display name for the individual.
    pub name: String,
    /// Email address; empty when the signature carries none.
    #[serde(default)]
    pub email: String,
}

impl Developer {
    /// Construct a developer identity.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Developer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}
