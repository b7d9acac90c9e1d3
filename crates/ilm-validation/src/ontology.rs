//! Relationship ontology
//!
//! The semantic gate asks an [`Ontology`] whether a typed relationship
//! between two element kinds is permitted. [`RuleSet`] is the shipped
//! implementation: a table of allowed relationships per (source, target)
//! kind pair, loaded once from YAML and immutable afterwards.
//!
//! # Rule file format
//!
//! ```yaml
//! rules:
//!   - sources: [Pipe, Fitting]
//!     targets: [Pipe, Fitting]
//!     allowed: [connects_to]
//! ```

use ilm_model::ElementKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::RuleSetError;

const DEFAULT_RULES: &str = include_str!("../ontology/default.yaml");

/// Typed relationship between two elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Network continuity (pipe to fitting, duct to equipment)
    ConnectsTo,
    /// Source is mounted in or on the target
    HostedBy,
    /// Source carries the target's load
    Supports,
    /// Source encloses the target
    Contains,
    /// Source passes through the target
    Penetrates,
}

impl Relationship {
    /// Every relationship
    pub const ALL: [Relationship; 5] = [
        Relationship::ConnectsTo,
        Relationship::HostedBy,
        Relationship::Supports,
        Relationship::Contains,
        Relationship::Penetrates,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Relationship::ConnectsTo => "connects_to",
            Relationship::HostedBy => "hosted_by",
            Relationship::Supports => "supports",
            Relationship::Contains => "contains",
            Relationship::Penetrates => "penetrates",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        Relationship::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| format!("unknown relationship: '{s}'"))
    }
}

/// Answer of an [`Ontology`] lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyVerdict {
    /// Relationship is permitted
    pub valid: bool,
    /// Reason when not permitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Alternative relationship worth trying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Relationships permitted for the kind pair
    #[serde(default)]
    pub allowed_relationships: Vec<Relationship>,
}

/// Source of relationship rules
pub trait Ontology: Send + Sync {
    /// Check `source --relationship--> target`
    fn lookup(
        &self,
        source: ElementKind,
        target: ElementKind,
        relationship: Relationship,
    ) -> OntologyVerdict;
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    sources: Vec<ElementKind>,
    targets: Vec<ElementKind>,
    allowed: Vec<Relationship>,
}

/// Table-driven [`Ontology`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pairs: BTreeMap<(ElementKind, ElementKind), Vec<Relationship>>,
}

impl RuleSet {
    /// Parse rules from YAML
    ///
    /// # Errors
    /// Returns error if the YAML is malformed, names an unknown kind or
    /// relationship, or contains a rule with no kinds or no relationships
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RuleSetError> {
        let file: RuleFile = serde_yaml::from_str(yaml)?;
        let mut set = RuleSet::default();

        for (index, rule) in file.rules.into_iter().enumerate() {
            let (Some(&first_source), Some(&first_target)) =
                (rule.sources.first(), rule.targets.first())
            else {
                return Err(RuleSetError::NoKinds(index));
            };
            if rule.allowed.is_empty() {
                return Err(RuleSetError::EmptyRule {
                    index,
                    source_kind: first_source,
                    target_kind: first_target,
                });
            }

            for &source in &rule.sources {
                for &target in &rule.targets {
                    set.allow(source, target, &rule.allowed);
                }
            }
        }

        tracing::debug!(pairs = set.pairs.len(), "loaded relationship rules");
        Ok(set)
    }

    /// Read rules from a YAML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, RuleSetError> {
        let yaml =
            std::fs::read_to_string(path).map_err(|e| RuleSetError::io_error(path, e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Rules shipped with the crate
    ///
    /// # Errors
    /// Returns error only if the bundled file is corrupt
    pub fn bundled() -> Result<Self, RuleSetError> {
        Self::from_yaml_str(DEFAULT_RULES)
    }

    /// Add relationships for a kind pair
    pub fn allow(&mut self, source: ElementKind, target: ElementKind, allowed: &[Relationship]) {
        let entry = self.pairs.entry((source, target)).or_default();
        for &relationship in allowed {
            if !entry.contains(&relationship) {
                entry.push(relationship);
            }
        }
    }

    /// Relationships permitted for a kind pair
    #[must_use]
    pub fn allowed(&self, source: ElementKind, target: ElementKind) -> &[Relationship] {
        self.pairs
            .get(&(source, target))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of kind pairs with at least one rule
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if no rule is defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Ontology for RuleSet {
    fn lookup(
        &self,
        source: ElementKind,
        target: ElementKind,
        relationship: Relationship,
    ) -> OntologyVerdict {
        let allowed = self.allowed(source, target).to_vec();

        if allowed.contains(&relationship) {
            return OntologyVerdict {
                valid: true,
                error: None,
                suggestion: None,
                allowed_relationships: allowed,
            };
        }

        if allowed.is_empty() {
            return OntologyVerdict {
                valid: false,
                error: Some(format!("no relationship is defined from {source} to {target}")),
                suggestion: None,
                allowed_relationships: allowed,
            };
        }

        OntologyVerdict {
            valid: false,
            error: Some(format!("{relationship} is not allowed from {source} to {target}")),
            suggestion: Some(format!(
                "use {} between {source} and {target}",
                allowed[0]
            )),
            allowed_relationships: allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bundled_rules_load() {
        let rules = RuleSet::bundled().unwrap();
        assert!(!rules.is_empty());
        assert_eq!(
            rules.allowed(ElementKind::Pipe, ElementKind::Fitting),
            &[Relationship::ConnectsTo]
        );
        assert_eq!(
            rules.allowed(ElementKind::Door, ElementKind::Wall),
            &[Relationship::HostedBy]
        );
    }

    #[test]
    fn permitted_relationship() {
        let rules = RuleSet::bundled().unwrap();
        let verdict = rules.lookup(ElementKind::Pipe, ElementKind::Pipe, Relationship::ConnectsTo);
        assert!(verdict.valid);
        assert!(verdict.error.is_none());
    }

    #[test]
    fn wrong_relationship_suggests_alternative() {
        let rules = RuleSet::bundled().unwrap();
        let verdict = rules.lookup(ElementKind::Pipe, ElementKind::Wall, Relationship::ConnectsTo);
        assert!(!verdict.valid);
        assert_eq!(verdict.allowed_relationships, vec![Relationship::Penetrates]);
        assert_eq!(
            verdict.suggestion.as_deref(),
            Some("use penetrates between Pipe and Wall")
        );
    }

    #[test]
    fn unknown_pair_is_invalid() {
        let rules = RuleSet::bundled().unwrap();
        let verdict = rules.lookup(ElementKind::Pipe, ElementKind::Duct, Relationship::ConnectsTo);
        assert!(!verdict.valid);
        assert_eq!(
            verdict.error.as_deref(),
            Some("no relationship is defined from Pipe to Duct")
        );
        assert!(verdict.suggestion.is_none());
    }

    #[test]
    fn overlapping_rules_union() {
        let yaml = r"
rules:
  - sources: [Wall]
    targets: [Slab]
    allowed: [supports]
  - sources: [Wall]
    targets: [Slab]
    allowed: [contains, supports]
";
        let rules = RuleSet::from_yaml_str(yaml).unwrap();
        assert_eq!(
            rules.allowed(ElementKind::Wall, ElementKind::Slab),
            &[Relationship::Supports, Relationship::Contains]
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        let yaml = "rules:\n  - sources: [Escalator]\n    targets: [Slab]\n    allowed: [supports]\n";
        assert!(matches!(RuleSet::from_yaml_str(yaml), Err(RuleSetError::Parse(_))));
    }

    #[test]
    fn rejects_empty_rule() {
        let yaml = "rules:\n  - sources: [Wall]\n    targets: [Slab]\n    allowed: []\n";
        assert!(matches!(
            RuleSet::from_yaml_str(yaml),
            Err(RuleSetError::EmptyRule { index: 0, .. })
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(
            &path,
            "rules:\n  - sources: [Beam]\n    targets: [Slab]\n    allowed: [supports]\n",
        )
        .unwrap();
        let rules = RuleSet::load(&path).unwrap();
        assert_eq!(rules.len(), 1);

        let missing = RuleSet::load(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(RuleSetError::Io { .. })));
    }

    #[test]
    fn relationship_parses_loosely() {
        assert_eq!("hosted-by".parse::<Relationship>().unwrap(), Relationship::HostedBy);
        assert!("touches".parse::<Relationship>().is_err());
    }
}
