//! Detection types for detector post-processing.
//!
//! This crate provides the records and primitives shared by the decoding
//! and evaluation crates:
//!
//! # Geometry
//!
//! - [`BoundingBox`] - Normalized box with `IoU`, `IoMA`, clamping, blending
//!
//! # Keypoints
//!
//! - [`Keypoint`] - Landmark with visibility
//! - [`Keypoints`] - Face, pose, face-and-pose or combined facepose layout
//! - [`KeypointMode`] - Requested output layout
//! - [`translate_keypoints`] - Layout translation
//!
//! # Records and Tables
//!
//! - [`Detection`] - Per-frame detection or ground-truth record
//! - [`ClassTable`], [`AttributeTable`] - Ordered name tables
//! - [`AttributeMap`] - Validated attribute-class associations
//! - [`ClassRemap`] - Raw detector class to output class mapping
//!
//! # Layer 0 Crate
//!
//! No I/O, no logging, no inference. Everything here is a plain value type
//! that can be shared across threads.
//!
//! # Example
//!
//! ```
//! use det_types::{BoundingBox, Detection, Keypoints, KeypointMode, translate_keypoints};
//!
//! let mut det = Detection::new(BoundingBox::new(0.1, 0.1, 0.4, 0.9), 0, 0.8);
//! det.keypoints = translate_keypoints(det.keypoints.take(), KeypointMode::FacePose);
//!
//! assert!(det.keypoints.as_ref().and_then(Keypoints::facepose).is_some());
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod bbox;
mod classes;
mod detection;
mod error;
mod keypoints;

pub use bbox::BoundingBox;
pub use classes::{AttributeAssociation, AttributeMap, AttributeTable, ClassRemap, ClassTable};
pub use detection::{Detection, find_detection_at_point, retain_live};
pub use keypoints::{
    Bone, FACE_POINTS, FACE_TO_FACEPOSE, FACEPOSE_EXTRA_BONE, FACEPOSE_POINTS, FacePoints,
    FacePosePoints, Keypoint, KeypointMode, Keypoints, POSE_POINTS, PosePoints, SKELETON_BONES,
    count_visible, merge_facepose, split_facepose, translate_keypoints, visible_bounds,
};

pub use error::{DetTypesError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        AttributeMap, AttributeTable, BoundingBox, ClassRemap, ClassTable, DetTypesError,
        Detection, Keypoint, KeypointMode, Keypoints, retain_live, translate_keypoints,
    };
}
