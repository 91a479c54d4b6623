//! Detector output post-processing.
//!
//! Turns one frame of raw detector output into clean [`det_types::Detection`] records:
//!
//! # Decoding
//!
//! - [`RawDetections`] - Parallel per-box detector output
//! - [`unpack_keypoints`] - Keypoint layout detection by point count
//! - [`Decoder`] - The full per-frame pipeline
//!
//! # Stages
//!
//! - [`fold_attributes`] - Attribute detections into base-detection `attrs`
//! - [`synthesize_faces`] - Face boxes from person facepose skeletons
//! - [`PoseDeduplicator`] - Plausibility, expansion, keypoint and box NMS
//! - [`KeypointSimilarity`] - Pluggable pose similarity ([`ObjectKeypointSimilarity`] by default)
//!
//! # Configuration
//!
//! - [`DecodeConfig`] - Threshold, keypoint layout and optional stages
//! - [`PoseDedupConfig`] - Deduplicator parameters
//!
//! # Example
//!
//! ```
//! use det_postprocess::prelude::*;
//! use det_types::{ClassTable, KeypointMode};
//!
//! let config = DecodeConfig::new()
//!     .with_keypoint_mode(KeypointMode::Pose)
//!     .with_pose(PoseDedupConfig::new().with_pose_nms(0.5).with_nms_iou(0.7));
//! let decoder = Decoder::new(DecoderTables::new(ClassTable::new(["person"])), config)?;
//!
//! let skeleton: Vec<[f32; 2]> = (0..17).map(|k| [0.3, 0.1 + 0.05 * k as f32]).collect();
//! let raw = RawDetections::new(
//!     vec![[0.2, 0.05, 0.45, 0.95], [0.21, 0.05, 0.45, 0.95]],
//!     vec![0, 0],
//!     vec![0.85, 0.4],
//! )
//! .with_keypoints(vec![skeleton.clone(), skeleton], None);
//!
//! let dets = decoder.decode(&raw)?;
//! assert_eq!(dets.len(), 1);
//! # Ok::<(), det_postprocess::PostprocessError>(())
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

mod attributes;
mod config;
mod decoder;
mod error;
mod faces;
mod pose_nms;
mod raw;

pub use attributes::{ATTRIBUTE_FOLD_IOU, fold_attributes};
pub use config::{DecodeConfig, PoseDedupConfig};
pub use decoder::{
    Decoder, DecoderTables, PERSON_ATTRIBUTE_MARKER, POSE_ATTRIBUTE_THRESHOLD,
};
pub use error::{PostprocessError, Result};
pub use faces::{FACE_DUPLICATE_IOU, face_box_from_facepose, synthesize_faces};
pub use pose_nms::{
    COCO_SIGMAS, EXPAND_VISIBILITY, KeypointSimilarity, MIN_POSE_POINTS,
    ObjectKeypointSimilarity, POSE_VISIBILITY, PoseDeduplicator,
};
pub use raw::{RawDetections, UnpackedKeypoints, unpack_keypoints};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        DecodeConfig, Decoder, DecoderTables, KeypointSimilarity, ObjectKeypointSimilarity,
        PoseDedupConfig, PoseDeduplicator, PostprocessError, RawDetections, fold_attributes,
    };
}
