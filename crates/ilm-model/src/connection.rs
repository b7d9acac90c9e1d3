//! Connection endpoint records

use serde::{Deserialize, Serialize};

use crate::ids::ElementId;

/// One endpoint (port) of an element and what it is attached to
///
/// A connection from `a` to `b` is matched when `b` also holds a connection
/// whose target is `a`. A record with no target, or one that is not
/// reciprocated, is a dangling end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Element owning the port
    pub element_id: ElementId,
    /// Port index on the owning element
    #[serde(default)]
    pub port: u32,
    /// Attached element, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementId>,
}

impl Connection {
    /// Port attached to another element
    #[inline]
    #[must_use]
    pub fn linked(element_id: impl Into<ElementId>, port: u32, target: impl Into<ElementId>) -> Self {
        Self {
            element_id: element_id.into(),
            port,
            target: Some(target.into()),
        }
    }

    /// Port attached to nothing
    #[inline]
    #[must_use]
    pub fn open(element_id: impl Into<ElementId>, port: u32) -> Self {
        Self {
            element_id: element_id.into(),
            port,
            target: None,
        }
    }

    /// Whether the record touches `id` on either side
    #[inline]
    #[must_use]
    pub fn touches(&self, id: &ElementId) -> bool {
        &self.element_id == id || self.target.as_ref() == Some(id)
    }
}

/// Both directions of a link `a <-> b`
#[must_use]
pub fn link_pair(a: &str, a_port: u32, b: &str, b_port: u32) -> [Connection; 2] {
    [Connection::linked(a, a_port, b), Connection::linked(b, b_port, a)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_either_side() {
        let c = Connection::linked("a", 0, "b");
        assert!(c.touches(&ElementId::new("a")));
        assert!(c.touches(&ElementId::new("b")));
        assert!(!c.touches(&ElementId::new("c")));
    }

    #[test]
    fn link_pair_is_reciprocal() {
        let [ab, ba] = link_pair("a", 0, "b", 1);
        assert_eq!(ab.target, Some(ElementId::new("b")));
        assert_eq!(ba.target, Some(ElementId::new("a")));
        assert_eq!(ba.port, 1);
    }
}
