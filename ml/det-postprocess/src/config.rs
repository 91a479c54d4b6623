//! Post-processing configuration.

use std::path::Path;

use det_types::KeypointMode;
use serde::{Deserialize, Serialize};

use crate::error::{PostprocessError, Result};

/// Parameters of the pose deduplicator.
///
/// Every parameter is optional; an absent parameter skips its step.
///
/// # Example
///
/// ```
/// use det_postprocess::PoseDedupConfig;
///
/// let config = PoseDedupConfig::new().with_pose_nms(0.5).with_nms_iou(0.7);
/// assert!(config.is_active());
/// assert!(!PoseDedupConfig::default().is_active());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseDedupConfig {
    /// Keypoint similarity above which two poses are merged.
    pub pose_nms: Option<f32>,

    /// Person boxes without a usable pose and larger than this area are dropped.
    pub pose_area_limit: Option<f32>,

    /// Blend factor toward the visible-keypoint box (0 = keep, 1 = replace).
    pub pose_expand: Option<f32>,

    /// Box `IoU` above which later person detections are suppressed.
    pub nms_iou: Option<f32>,
}

impl PoseDedupConfig {
    /// Creates a config with every step disabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pose_nms: None,
            pose_area_limit: None,
            pose_expand: None,
            nms_iou: None,
        }
    }

    /// Sets the keypoint-similarity threshold.
    #[must_use]
    pub const fn with_pose_nms(mut self, threshold: f32) -> Self {
        self.pose_nms = Some(threshold);
        self
    }

    /// Sets the area limit for poseless person boxes.
    #[must_use]
    pub const fn with_pose_area_limit(mut self, limit: f32) -> Self {
        self.pose_area_limit = Some(limit);
        self
    }

    /// Sets the box expansion factor.
    #[must_use]
    pub const fn with_pose_expand(mut self, factor: f32) -> Self {
        self.pose_expand = Some(factor);
        self
    }

    /// Sets the person box-NMS `IoU` threshold.
    #[must_use]
    pub const fn with_nms_iou(mut self, threshold: f32) -> Self {
        self.nms_iou = Some(threshold);
        self
    }

    /// Returns `true` if the decoder should run the deduplicator at all.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.pose_nms.is_some() || self.pose_area_limit.is_some()
    }

    /// Validates parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PostprocessError::InvalidConfig`] if a threshold is not
    /// finite and non-negative, or the expand factor is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("pose_nms", self.pose_nms),
            ("pose_area_limit", self.pose_area_limit),
            ("nms_iou", self.nms_iou),
        ];
        for (name, value) in named {
            if let Some(v) = value
                && !(v.is_finite() && v >= 0.0)
            {
                return Err(PostprocessError::invalid_config(format!(
                    "{name} must be finite and non-negative, got {v}"
                )));
            }
        }
        if let Some(expand) = self.pose_expand
            && !(0.0..=1.0).contains(&expand)
        {
            return Err(PostprocessError::invalid_config(format!(
                "pose_expand must be in [0, 1], got {expand}"
            )));
        }
        Ok(())
    }
}

/// Configuration of the raw-detection decoder.
///
/// # Example
///
/// ```
/// use det_postprocess::DecodeConfig;
/// use det_types::KeypointMode;
///
/// let config = DecodeConfig::from_json_str(
///     r#"{"keypoint_mode": "face_pose", "pose": {"pose_nms": 0.5}}"#,
/// ).unwrap();
///
/// assert_eq!(config.keypoint_mode, KeypointMode::FacePose);
/// assert!((config.confidence_threshold - 0.01).abs() < 1e-6);
/// assert_eq!(config.pose.pose_nms, Some(0.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Detections at or below this confidence are discarded.
    pub confidence_threshold: f32,

    /// Output keypoint layout.
    pub keypoint_mode: KeypointMode,

    /// Synthesize face detections from person facepose skeletons.
    pub add_faces: bool,

    /// Fold attribute-class detections into their base detections.
    pub fold_attributes: bool,

    /// Pose deduplication parameters.
    pub pose: PoseDedupConfig,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeConfig {
    /// Creates the default config: threshold 0.01, no keypoints, no extras.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            confidence_threshold: 0.01,
            keypoint_mode: KeypointMode::None,
            add_faces: false,
            fold_attributes: false,
            pose: PoseDedupConfig::new(),
        }
    }

    /// Sets the confidence threshold.
    #[must_use]
    pub const fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Sets the output keypoint layout.
    #[must_use]
    pub const fn with_keypoint_mode(mut self, mode: KeypointMode) -> Self {
        self.keypoint_mode = mode;
        self
    }

    /// Enables face synthesis.
    #[must_use]
    pub const fn with_faces(mut self) -> Self {
        self.add_faces = true;
        self
    }

    /// Enables attribute folding.
    #[must_use]
    pub const fn with_attribute_folding(mut self) -> Self {
        self.fold_attributes = true;
        self
    }

    /// Sets the pose deduplication parameters.
    #[must_use]
    pub const fn with_pose(mut self, pose: PoseDedupConfig) -> Self {
        self.pose = pose;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PostprocessError::InvalidConfig`] for an out-of-range
    /// threshold or invalid pose parameters.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PostprocessError::invalid_config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        self.pose.validate()
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PostprocessError::Deserialization`] on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PostprocessError::Io`] if the file cannot be read, or
    /// [`PostprocessError::Deserialization`] on malformed JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
