//! The per-frame detection record.

use serde::{Deserialize, Serialize};

use crate::classes::{AttributeTable, ClassTable};
use crate::{BoundingBox, Keypoints};

/// One object instance predicted for a frame (or annotated as ground truth).
///
/// A confidence of 0 marks the record as deleted; components that tombstone
/// records call [`retain_live`] before returning, so deleted records never
/// leave a component.
///
/// # Example
///
/// ```
/// use det_types::{BoundingBox, Detection};
///
/// let mut det = Detection::new(BoundingBox::new(0.1, 0.2, 0.3, 0.4), 0, 0.9);
/// assert!(!det.is_tombstoned());
/// det.tombstone();
/// assert!(det.is_tombstoned());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Normalized box.
    #[serde(rename = "box")]
    pub bbox: BoundingBox,

    /// Class ID (index into the output class table).
    #[serde(rename = "class")]
    pub class_id: u32,

    /// Confidence in `[0, 1]`; 0 means deleted.
    pub confidence: f32,

    /// Tracker-assigned identity, if any.
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,

    /// Landmarks in one of the supported layouts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Keypoints>,

    /// Max folded confidence per attribute slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<f32>>,

    /// Per-channel confidences from the detector's extra keypoint channels.
    #[serde(default, rename = "poseattr", skip_serializing_if = "Option::is_none")]
    pub pose_attrs: Option<Vec<f32>>,
}

impl Detection {
    /// Creates a detection with no keypoints or attributes.
    #[must_use]
    pub const fn new(bbox: BoundingBox, class_id: u32, confidence: f32) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
            track_id: None,
            keypoints: None,
            attrs: None,
            pose_attrs: None,
        }
    }

    /// Sets the tracker ID.
    #[must_use]
    pub const fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }

    /// Sets the keypoints.
    #[must_use]
    pub fn with_keypoints(mut self, keypoints: Keypoints) -> Self {
        self.keypoints = Some(keypoints);
        self
    }

    /// Marks the record as deleted.
    pub const fn tombstone(&mut self) {
        self.confidence = 0.0;
    }

    /// Returns `true` if the record has been marked as deleted.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_tombstoned(&self) -> bool {
        self.confidence == 0.0
    }

    /// Raises attribute slot `index` to at least `confidence`.
    ///
    /// The vector is created with `len` zeroed slots on first use.
    pub fn raise_attr(&mut self, index: usize, len: usize, confidence: f32) {
        let attrs = self.attrs.get_or_insert_with(|| vec![0.0; len]);
        if attrs.len() < len {
            attrs.resize(len, 0.0);
        }
        if let Some(slot) = attrs.get_mut(index) {
            *slot = slot.max(confidence);
        }
    }

    /// Overlay label: class name and confidence.
    ///
    /// Classes outside the table are shown as `Class_<id>`.
    #[must_use]
    pub fn label(&self, classes: &ClassTable) -> String {
        let name = classes
            .name_of(self.class_id)
            .map_or_else(|| format!("Class_{}", self.class_id), str::to_owned);
        format!("{name} {:4.2}", self.confidence)
    }

    /// Attributes above `min_confidence`, highest first.
    #[must_use]
    pub fn attribute_summary<'a>(
        &self,
        attributes: &'a AttributeTable,
        min_confidence: f32,
    ) -> Vec<(&'a str, f32)> {
        let Some(attrs) = &self.attrs else {
            return Vec::new();
        };
        let mut summary: Vec<_> = attrs
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value > min_confidence)
            .filter_map(|(i, &value)| attributes.name_of(i).map(|name| (name, value)))
            .collect();
        summary.sort_by(|a, b| b.1.total_cmp(&a.1));
        summary
    }
}

/// Drops every tombstoned record, preserving order.
pub fn retain_live(detections: &mut Vec<Detection>) {
    detections.retain(|d| !d.is_tombstoned());
}

/// Finds the detection under a point.
///
/// Among detections whose box contains `(x, y)`, returns the index of the
/// one whose center is nearest, with the squared center distance.
#[must_use]
pub fn find_detection_at_point(detections: &[Detection], x: f32, y: f32) -> Option<(usize, f32)> {
    detections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.bbox.contains_point(x, y))
        .map(|(i, d)| {
            let (cx, cy) = d.bbox.center();
            let (dx, dy) = (x - cx, y - cy);
            (i, dx.mul_add(dx, dy * dy))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
