//! Partition rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spatial attribute(s) elements are grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionRule {
    /// One lot per building level
    ByLevel,
    /// One lot per zone
    ByZone,
    /// One lot per (level, zone) pair
    ByLevelAndZone,
}

impl PartitionRule {
    /// Every rule
    pub const ALL: [PartitionRule; 3] = [
        PartitionRule::ByLevel,
        PartitionRule::ByZone,
        PartitionRule::ByLevelAndZone,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PartitionRule::ByLevel => "BY_LEVEL",
            PartitionRule::ByZone => "BY_ZONE",
            PartitionRule::ByLevelAndZone => "BY_LEVEL_AND_ZONE",
        }
    }
}

impl fmt::Display for PartitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised rule name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown partition rule '{0}' (expected BY_LEVEL, BY_ZONE or BY_LEVEL_AND_ZONE)")]
pub struct UnknownRule(pub String);

impl FromStr for PartitionRule {
    type Err = UnknownRule;

    /// Accepts wire names case-insensitively, with `-` for `_`, and with or
    /// without the `BY_` prefix (`level`, `by-zone`, `LEVEL_AND_ZONE`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        let bare = normalized.strip_prefix("BY_").unwrap_or(&normalized);
        match bare {
            "LEVEL" => Ok(PartitionRule::ByLevel),
            "ZONE" => Ok(PartitionRule::ByZone),
            "LEVEL_AND_ZONE" => Ok(PartitionRule::ByLevelAndZone),
            _ => Err(UnknownRule(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loosely() {
        assert_eq!("BY_LEVEL".parse::<PartitionRule>().unwrap(), PartitionRule::ByLevel);
        assert_eq!("by-zone".parse::<PartitionRule>().unwrap(), PartitionRule::ByZone);
        assert_eq!(
            "level_and_zone".parse::<PartitionRule>().unwrap(),
            PartitionRule::ByLevelAndZone
        );
        assert!("BY_ROOM".parse::<PartitionRule>().is_err());
    }

    #[test]
    fn display_matches_wire_name() {
        for rule in PartitionRule::ALL {
            assert_eq!(rule.to_string().parse::<PartitionRule>().unwrap(), rule);
        }
    }
}
