// src/models/category.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subject area a question belongs to. The snake_case string form is the
/// key used on the wire, in snapshots and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Fundamentals,
    Networking,
    Databases,
    Coding,
    Algorithms,
    DataStructures,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fundamentals => "fundamentals",
            Category::Networking => "networking",
            Category::Databases => "databases",
            Category::Coding => "coding",
            Category::Algorithms => "algorithms",
            Category::DataStructures => "data_structures",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored category key no longer matches the enum.
#[derive(Debug)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category key '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fundamentals" => Ok(Category::Fundamentals),
            "networking" => Ok(Category::Networking),
            "databases" => Ok(Category::Databases),
            "coding" => Ok(Category::Coding),
            "algorithms" => Ok(Category::Algorithms),
            "data_structures" => Ok(Category::DataStructures),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}
