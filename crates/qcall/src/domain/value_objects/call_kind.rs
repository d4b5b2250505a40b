//! CallKind - First call or recall

use serde::{Deserialize, Serialize};

/// Kind of call request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Call,
    Recall,
}

impl CallKind {
    pub fn is_recall(self) -> bool {
        matches!(self, CallKind::Recall)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallKind::Call => "call",
            CallKind::Recall => "recall",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(CallKind::Call),
            "recall" => Ok(CallKind::Recall),
            _ => Err(format!("Unknown call kind: {}", s)),
        }
    }
}
