//! Priority - Scheduling class inherited from the ticket

use serde::{Deserialize, Serialize};

/// Ticket priority.
///
/// Variants are declared lowest first so the derived `Ord` is the
/// scheduling order: `Emergency > Priority > Senior > Child > Normal`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    Child,
    Senior,
    Priority,
    Emergency,
}

impl Priority {
    /// Numeric rank, higher is served first
    pub fn rank(self) -> i16 {
        match self {
            Priority::Normal => 0,
            Priority::Child => 1,
            Priority::Senior => 2,
            Priority::Priority => 3,
            Priority::Emergency => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Child => "child",
            Priority::Senior => "senior",
            Priority::Priority => "priority",
            Priority::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Priority::Normal),
            "child" => Ok(Priority::Child),
            "senior" => Ok(Priority::Senior),
            "priority" => Ok(Priority::Priority),
            "emergency" => Ok(Priority::Emergency),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}
