//! Group-key derivation
//!
//! Preview and commit both group through [`group_elements`], so the keys,
//! counts and names a preview shows are exactly what a commit creates.

use ilm_model::{Element, ElementId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::rule::PartitionRule;

/// Key used when an element lacks the attribute a rule groups by
pub const UNASSIGNED_KEY: &str = "__unassigned__";

const UNASSIGNED_LABEL: &str = "(unassigned)";

/// Separator of the two parts of a level-and-zone key
pub const KEY_SEPARATOR: char = '|';

/// Elements sharing one group key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGroup {
    /// Group key
    pub key: String,
    /// Lot name derived from the key
    pub name: String,
    /// Members, in input order
    pub element_ids: Vec<ElementId>,
}

fn part(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNASSIGNED_KEY,
    }
}

fn label(part: &str) -> &str {
    if part == UNASSIGNED_KEY {
        UNASSIGNED_LABEL
    } else {
        part
    }
}

/// Group key of one element under `rule`
#[must_use]
pub fn group_key(rule: PartitionRule, element: &Element) -> String {
    let level = part(element.level_id.as_deref());
    let zone = part(element.zone_id.as_deref());
    match rule {
        PartitionRule::ByLevel => level.to_string(),
        PartitionRule::ByZone => zone.to_string(),
        PartitionRule::ByLevelAndZone => format!("{level}{KEY_SEPARATOR}{zone}"),
    }
}

/// Lot name for a group key
#[must_use]
pub fn group_name(rule: PartitionRule, key: &str) -> String {
    match rule {
        PartitionRule::ByLevel => format!("Level {}", label(key)),
        PartitionRule::ByZone => format!("Zone {}", label(key)),
        PartitionRule::ByLevelAndZone => {
            let (level, zone) = key.split_once(KEY_SEPARATOR).unwrap_or((key, UNASSIGNED_KEY));
            format!("Level {} / Zone {}", label(level), label(zone))
        }
    }
}

/// Spatial-scope descriptor stored on created lots
#[must_use]
pub fn spatial_scope(rule: PartitionRule, key: &str) -> String {
    format!("{rule}: {key}")
}

/// Group elements by key, groups ordered by key
#[must_use]
pub fn group_elements(rule: PartitionRule, elements: &[Element]) -> Vec<ElementGroup> {
    let mut groups: BTreeMap<String, Vec<ElementId>> = BTreeMap::new();
    for element in elements {
        groups
            .entry(group_key(rule, element))
            .or_default()
            .push(element.id.clone());
    }

    groups
        .into_iter()
        .map(|(key, element_ids)| ElementGroup {
            name: group_name(rule, &key),
            key,
            element_ids,
        })
        .collect()
}
