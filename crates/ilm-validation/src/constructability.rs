//! Constructability gate
//!
//! Checks that an element could actually be built from its model data:
//! routed runs may only bend at angles for which standard fittings exist,
//! and members drawn as plan outlines must carry enough data to extrude
//! them into 3-D.
//!
//! # Angle snapping
//!
//! Standard angles are 45°, 90°, 180° and the full turn 360° (equivalently
//! 0°, a straight run). Angles are compared on the circle, so 358° and 2°
//! both snap to 360°. The tolerance window is inclusive on both sides.

use ilm_model::{Element, Point2};
use serde::{Deserialize, Serialize};

use crate::error::ConstructabilityError;
use crate::result::ValidationResult;

/// Angles with a standard fitting, in degrees
pub const STANDARD_ANGLES: [f64; 4] = [45.0, 90.0, 180.0, 360.0];

/// Inclusive snapping window around each standard angle, in degrees
pub const ANGLE_TOLERANCE_DEG: f64 = 5.0;

/// Outcome of [`validate_angle`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleCheck {
    /// True when the angle snaps
    pub valid: bool,
    /// Angle as supplied
    pub angle: f64,
    /// Standard angle it snaps to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapped_angle: Option<f64>,
    /// Reason when invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Snap `angle` (degrees) to a standard angle
///
/// Returns `None` when no standard angle lies within
/// [`ANGLE_TOLERANCE_DEG`], or when `angle` is not finite.
#[must_use]
pub fn snap_angle(angle: f64) -> Option<f64> {
    if !angle.is_finite() {
        return None;
    }
    let normalized = angle.rem_euclid(360.0);
    STANDARD_ANGLES
        .into_iter()
        .find(|&standard| circular_distance(normalized, standard) <= ANGLE_TOLERANCE_DEG)
}

/// Standard angle closest to `angle`, regardless of tolerance
#[must_use]
pub fn nearest_standard_angle(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    STANDARD_ANGLES
        .into_iter()
        .min_by(|a, b| {
            circular_distance(normalized, *a).total_cmp(&circular_distance(normalized, *b))
        })
        .unwrap_or(360.0)
}

/// Check one angle against the standard set
#[must_use]
pub fn validate_angle(angle: f64) -> AngleCheck {
    match snap_angle(angle) {
        Some(snapped) => AngleCheck {
            valid: true,
            angle,
            snapped_angle: Some(snapped),
            error: None,
        },
        None => AngleCheck {
            valid: false,
            angle,
            snapped_angle: None,
            error: Some(format!(
                "angle {angle}° is not within {ANGLE_TOLERANCE_DEG}° of a standard angle (45°, 90°, 180°, 360°)"
            )),
        },
    }
}

/// Check that plan-outline members carry `height` and `base_offset`
///
/// Only kinds that need a vertical extent are checked; every other kind is
/// valid. Each missing field produces one error naming it.
#[must_use]
pub fn validate_z_axis_completeness(element: &Element) -> ValidationResult {
    if !element.kind.requires_z_axis() {
        return ValidationResult::ok();
    }

    let errors: Vec<String> = [
        ("height", element.height.is_none()),
        ("base_offset", element.base_offset.is_none()),
    ]
    .into_iter()
    .filter(|(_, missing)| *missing)
    .map(|(field, _)| format!("{} {} is missing {field}", element.kind, element.id))
    .collect();

    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::from_errors(errors)
            .with_suggestion("set height and base_offset so the member can be extruded")
    }
}

fn heading(from: Point2, to: Point2) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees()
}

/// Overall direction of a path, first point to last, in `[0, 360)`
///
/// # Errors
/// Returns [`ConstructabilityError::PathTooShort`] for fewer than 2 points
pub fn calculate_path_angle(path: &[Point2]) -> Result<f64, ConstructabilityError> {
    match (path.first(), path.last()) {
        (Some(&first), Some(&last)) if path.len() >= 2 => {
            Ok(heading(first, last).rem_euclid(360.0))
        }
        _ => Err(ConstructabilityError::PathTooShort { points: path.len() }),
    }
}

/// Turn angle at each interior vertex of a polyline, folded into `[0, 180]`
///
/// Repeated points are ignored. A straight continuation is 0°.
#[must_use]
pub fn bend_angles(path: &[Point2]) -> Vec<f64> {
    let mut points: Vec<Point2> = Vec::with_capacity(path.len());
    for &p in path {
        if points.last() != Some(&p) {
            points.push(p);
        }
    }

    points
        .windows(3)
        .map(|w| {
            let turn = (heading(w[1], w[2]) - heading(w[0], w[1])).rem_euclid(360.0);
            if turn > 180.0 {
                360.0 - turn
            } else {
                turn
            }
        })
        .collect()
}

/// Full constructability check of one element
///
/// Combines z-axis completeness with, for routed kinds, an angle check of
/// every bend of the element's polyline.
#[must_use]
pub fn validate_element(element: &Element) -> ValidationResult {
    let mut result = validate_z_axis_completeness(element);

    if element.kind.is_routed() {
        for (index, bend) in bend_angles(&element.geometry).into_iter().enumerate() {
            let check = validate_angle(bend);
            if check.valid {
                continue;
            }
            let nearest = nearest_standard_angle(bend);
            result.merge(
                ValidationResult::from_errors(vec![format!(
                    "{} {}: bend {index} of {bend:.1}° has no standard fitting",
                    element.kind, element.id
                )])
                .with_suggestion(format!("reroute bend {index} to {nearest}°")),
            );
        }
    }

    result
}
