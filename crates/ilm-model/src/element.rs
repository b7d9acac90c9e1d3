//! Building elements and their validated decoding
//!
//! Ingestion payloads arrive as loosely typed JSON tagged by `"type"`.
//! [`Element::decode`] is the single entry point that turns such a payload
//! into an [`Element`]: the tag is resolved against the closed
//! [`ElementKind`] enumeration first, and unknown tags are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::ids::{ElementId, LotId};

/// Closed set of element types understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Vertical partition
    Wall,
    /// Vertical structural member
    Column,
    /// Horizontal structural member
    Beam,
    /// Floor or roof plate
    Slab,
    /// Door opening
    Door,
    /// Window opening
    Window,
    /// Piping run
    Pipe,
    /// Ductwork run
    Duct,
    /// Cable tray run
    CableTray,
    /// Electrical conduit run
    Conduit,
    /// Elbow, tee or reducer joining runs
    Fitting,
    /// Support hanging a run from structure
    Hanger,
    /// Terminal equipment (pumps, AHUs, panels)
    Equipment,
}

impl ElementKind {
    /// Every kind, in declaration order
    pub const ALL: [ElementKind; 13] = [
        ElementKind::Wall,
        ElementKind::Column,
        ElementKind::Beam,
        ElementKind::Slab,
        ElementKind::Door,
        ElementKind::Window,
        ElementKind::Pipe,
        ElementKind::Duct,
        ElementKind::CableTray,
        ElementKind::Conduit,
        ElementKind::Fitting,
        ElementKind::Hanger,
        ElementKind::Equipment,
    ];

    /// Canonical name as used in payloads and messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Wall => "Wall",
            ElementKind::Column => "Column",
            ElementKind::Beam => "Beam",
            ElementKind::Slab => "Slab",
            ElementKind::Door => "Door",
            ElementKind::Window => "Window",
            ElementKind::Pipe => "Pipe",
            ElementKind::Duct => "Duct",
            ElementKind::CableTray => "CableTray",
            ElementKind::Conduit => "Conduit",
            ElementKind::Fitting => "Fitting",
            ElementKind::Hanger => "Hanger",
            ElementKind::Equipment => "Equipment",
        }
    }

    /// Kinds drawn as 2-D outlines that need `height` and `base_offset`
    #[inline]
    #[must_use]
    pub const fn requires_z_axis(&self) -> bool {
        matches!(self, ElementKind::Wall | ElementKind::Column | ElementKind::Beam)
    }

    /// Linear runs whose polyline bends must use standard angles
    #[inline]
    #[must_use]
    pub const fn is_routed(&self) -> bool {
        matches!(
            self,
            ElementKind::Pipe | ElementKind::Duct | ElementKind::CableTray | ElementKind::Conduit
        )
    }

    /// Kinds that participate in the connection network
    #[inline]
    #[must_use]
    pub const fn is_connectable(&self) -> bool {
        self.is_routed() || matches!(self, ElementKind::Fitting | ElementKind::Equipment)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DecodeError::UnknownType(s.to_string()))
    }
}

/// 2-D point, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point2 {
    /// Create point
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// A physical building component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Stable id
    pub id: ElementId,
    /// Element type
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Building level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_id: Option<String>,
    /// Spatial zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// Owning lot, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection_lot_id: Option<LotId>,
    /// Extrusion height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Offset of the base above the level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_offset: Option<f64>,
    /// Plan polyline / point set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry: Vec<Point2>,
}

impl Element {
    /// Create bare element of a kind
    #[must_use]
    pub fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            level_id: None,
            zone_id: None,
            inspection_lot_id: None,
            height: None,
            base_offset: None,
            geometry: Vec::new(),
        }
    }

    /// With level
    #[inline]
    #[must_use]
    pub fn with_level(mut self, level_id: impl Into<String>) -> Self {
        self.level_id = Some(level_id.into());
        self
    }

    /// With zone
    #[inline]
    #[must_use]
    pub fn with_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    /// With height
    #[inline]
    #[must_use]
    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// With base offset
    #[inline]
    #[must_use]
    pub fn with_base_offset(mut self, base_offset: f64) -> Self {
        self.base_offset = Some(base_offset);
        self
    }

    /// With plan geometry
    #[inline]
    #[must_use]
    pub fn with_geometry(mut self, points: impl IntoIterator<Item = [f64; 2]>) -> Self {
        self.geometry = points.into_iter().map(Point2::from).collect();
        self
    }

    /// With owning lot
    #[inline]
    #[must_use]
    pub fn in_lot(mut self, lot_id: LotId) -> Self {
        self.inspection_lot_id = Some(lot_id);
        self
    }

    /// True when the element is not placed in any lot
    ///
    /// An empty lot id counts as unassigned.
    #[inline]
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.inspection_lot_id
            .as_ref()
            .map_or(true, |lot| lot.as_str().is_empty())
    }

    /// Decode an ingestion payload
    ///
    /// # Errors
    /// - [`DecodeError::MissingType`] when `"type"` is absent or not a string
    /// - [`DecodeError::UnknownType`] when the tag is not an [`ElementKind`]
    /// - [`DecodeError::Malformed`] when fields have the wrong shape
    /// - [`DecodeError::Invalid`] when values break element invariants
    pub fn decode(payload: Value) -> Result<Self, DecodeError> {
        let tag = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?;
        let kind = ElementKind::from_str(tag)?;

        let mut payload = payload;
        if let Some(object) = payload.as_object_mut() {
            object.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        }

        let mut element: Element =
            serde_json::from_value(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        if element.is_unassigned() {
            element.inspection_lot_id = None;
        }
        element.check_invariants()?;
        Ok(element)
    }

    fn check_invariants(&self) -> Result<(), DecodeError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DecodeError::Invalid("element id is empty".to_string()));
        }
        for (field, value) in [("height", self.height), ("base_offset", self.base_offset)] {
            if matches!(value, Some(v) if !v.is_finite()) {
                return Err(DecodeError::Invalid(format!(
                    "{field} of element {} is not finite",
                    self.id
                )));
            }
        }
        if let Some(index) = self.geometry.iter().position(|p| !p.is_finite()) {
            return Err(DecodeError::Invalid(format!(
                "geometry point {index} of element {} is not finite",
                self.id
            )));
        }
        Ok(())
    }
}

/// Errors while decoding an ingestion payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Payload carries no `"type"` tag
    #[error("element payload has no \"type\" tag")]
    MissingType,

    /// Tag does not name a known element kind
    #[error("unknown element type: '{0}'")]
    UnknownType(String),

    /// Fields have the wrong shape
    #[error("malformed element payload: {0}")]
    Malformed(String),

    /// Values violate element invariants
    #[error("invalid element: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_known_type() {
        let element = Element::decode(json!({
            "id": "w1",
            "type": "Wall",
            "level_id": "L1",
            "height": 3.0,
            "base_offset": 0.0,
            "geometry": [[0.0, 0.0], [5.0, 0.0]]
        }))
        .unwrap();

        assert_eq!(element.kind, ElementKind::Wall);
        assert_eq!(element.level_id.as_deref(), Some("L1"));
        assert_eq!(element.geometry, vec![Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)]);
    }

    #[test]
    fn decode_tag_is_case_insensitive() {
        let element = Element::decode(json!({"id": "t1", "type": "cabletray"})).unwrap();
        assert_eq!(element.kind, ElementKind::CableTray);
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let err = Element::decode(json!({"id": "x", "type": "Escalator"})).unwrap_err();
        assert_eq!(err, DecodeError::UnknownType("Escalator".to_string()));
    }

    #[test]
    fn decode_rejects_missing_type() {
        let err = Element::decode(json!({"id": "x"})).unwrap_err();
        assert_eq!(err, DecodeError::MissingType);
    }

    #[test]
    fn decode_rejects_bad_shape() {
        let err = Element::decode(json!({"id": "x", "type": "Pipe", "height": "tall"})).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_empty_id() {
        let err = Element::decode(json!({"id": "  ", "type": "Pipe"})).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid(_)));
    }

    #[test]
    fn empty_lot_id_means_unassigned() {
        let element =
            Element::decode(json!({"id": "p1", "type": "Pipe", "inspection_lot_id": ""})).unwrap();
        assert!(element.is_unassigned());
        assert!(element.inspection_lot_id.is_none());
    }

    #[test]
    fn kind_classification() {
        assert!(ElementKind::Wall.requires_z_axis());
        assert!(!ElementKind::Pipe.requires_z_axis());
        assert!(ElementKind::Duct.is_routed());
        assert!(ElementKind::Fitting.is_connectable());
        assert!(!ElementKind::Wall.is_connectable());
    }

    #[test]
    fn serialized_element_uses_type_tag() {
        let value = serde_json::to_value(Element::new("p1", ElementKind::Pipe)).unwrap();
        assert_eq!(value, json!({"id": "p1", "type": "Pipe"}));
    }
}
