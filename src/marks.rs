use image::GrayImage;
use imageproc::{
    contours::{find_contours, BorderType, Contour},
    point::Point,
    rect::Rect,
};
use log::{debug, warn};
use logging_timer::time;
use thiserror::Error;

use crate::geometry::{bounding_rect, polygon_moments};

/// A candidate bubble traced from the cleaned mask.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkShape {
    pub area: f64,
    pub bounds: Rect,
    pub centroid: Point<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contour {contour_index} encloses no area")]
pub struct DegenerateMarkError {
    pub contour_index: usize,
}

impl MarkShape {
    pub fn from_contour(
        contour_index: usize,
        contour: &Contour<i32>,
    ) -> Result<Self, DegenerateMarkError> {
        let degenerate = DegenerateMarkError { contour_index };
        let moments = polygon_moments(&contour.points);
        let centroid = moments.centroid().ok_or_else(|| degenerate.clone())?;
        let bounds = bounding_rect(&contour.points).ok_or(degenerate)?;
        Ok(Self {
            area: moments.m00,
            bounds,
            centroid,
        })
    }
}

/// Whether a contour is an outermost boundary rather than a hole or
/// something nested inside a hole.
fn is_external(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// Traces the external boundaries in `mask`, drops any enclosing
/// `min_area` or less, and returns the rest ordered by the left edge of
/// their bounds. Marks sharing a left edge keep their tracing order.
#[time]
pub fn find_marks(mask: &GrayImage, min_area: f64) -> Vec<MarkShape> {
    let contours = find_contours::<i32>(mask);
    let mut marks = contours
        .iter()
        .enumerate()
        .filter(|(_, contour)| is_external(contour))
        .filter_map(|(i, contour)| match MarkShape::from_contour(i, contour) {
            Ok(mark) => Some(mark),
            Err(err) => {
                warn!("skipping mark: {}", err);
                None
            }
        })
        .filter(|mark| mark.area > min_area)
        .collect::<Vec<MarkShape>>();

    marks.sort_by_key(|mark| mark.bounds.left());

    if marks.is_empty() {
        warn!("no marks larger than {} found", min_area);
    } else {
        debug!("found {} marks out of {} contours", marks.len(), contours.len());
    }

    marks
}
