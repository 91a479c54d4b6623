//! Pose deduplication for person detections.
//!
//! Pose detectors tend to emit several overlapping skeletons for the same
//! person, and occasionally large boxes with almost no landmarks. The
//! [`PoseDeduplicator`] runs, in order:
//!
//! 1. Plausibility: person boxes with fewer than two visible body points
//!    and an area above `pose_area_limit` are removed.
//! 2. Expansion: boxes of plausible poses are grown toward their visible
//!    landmarks by `pose_expand`.
//! 3. Keypoint suppression: overlapping plausible poses whose keypoint
//!    similarity exceeds `pose_nms` are merged into the more confident one.
//! 4. Box NMS: later person boxes overlapping an earlier one by more than
//!    `nms_iou` are removed.
//!
//! Each step is skipped when its parameter is absent.

use det_types::{Detection, Keypoint, Keypoints, POSE_POINTS, count_visible, retain_live, visible_bounds};
use tracing::debug;

use crate::config::PoseDedupConfig;

/// COCO per-keypoint standard deviations for the 17 body points.
pub const COCO_SIGMAS: [f32; POSE_POINTS] = [
    0.026, 0.025, 0.025, 0.035, 0.035, 0.079, 0.079, 0.072, 0.072, 0.062, 0.062, 0.107, 0.107,
    0.087, 0.087, 0.089, 0.089,
];

/// Visibility above which a body point counts toward a plausible pose.
pub const POSE_VISIBILITY: f32 = 0.01;

/// Visibility above which a body point contributes to box expansion.
pub const EXPAND_VISIBILITY: f32 = 0.1;

/// Visible body points needed for a plausible pose.
pub const MIN_POSE_POINTS: usize = 2;

/// Similarity between two keypoint sets of the same layout.
///
/// Scores are in `[0, 1]`, higher meaning more alike.
pub trait KeypointSimilarity {
    /// Scores `a` against `b`, with `area` as the object scale.
    fn similarity(&self, a: &[Keypoint], b: &[Keypoint], area: f32) -> f32;
}

/// COCO Object Keypoint Similarity.
///
/// Averages `exp(-d² / (2 · area · (2σ)²))` over the points visible in both
/// sets. Returns 0 when no point is jointly visible or `area <= 0`.
///
/// # Example
///
/// ```
/// use det_postprocess::{KeypointSimilarity, ObjectKeypointSimilarity};
/// use det_types::Keypoint;
///
/// let a = [Keypoint::new(0.5, 0.5, 1.0); 17];
/// let oks = ObjectKeypointSimilarity::default();
/// assert!((oks.similarity(&a, &a, 0.1) - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectKeypointSimilarity {
    sigmas: Vec<f32>,
}

impl Default for ObjectKeypointSimilarity {
    fn default() -> Self {
        Self::new(COCO_SIGMAS.to_vec())
    }
}

impl ObjectKeypointSimilarity {
    /// Creates the metric with custom per-keypoint sigmas.
    ///
    /// Points beyond the sigma list are ignored.
    #[must_use]
    pub const fn new(sigmas: Vec<f32>) -> Self {
        Self { sigmas }
    }

    /// Returns the per-keypoint sigmas.
    #[must_use]
    pub fn sigmas(&self) -> &[f32] {
        &self.sigmas
    }
}

impl KeypointSimilarity for ObjectKeypointSimilarity {
    #[allow(clippy::cast_precision_loss)]
    fn similarity(&self, a: &[Keypoint], b: &[Keypoint], area: f32) -> f32 {
        if area <= 0.0 {
            return 0.0;
        }

        let mut sum = 0.0;
        let mut count = 0;

        for ((pa, pb), sigma) in a.iter().zip(b).zip(&self.sigmas) {
            if !(pa.is_visible(POSE_VISIBILITY) && pb.is_visible(POSE_VISIBILITY)) {
                continue;
            }

            let dx = pa.x - pb.x;
            let dy = pa.y - pb.y;
            let d_squared = dx.mul_add(dx, dy * dy);
            let k_squared = 4.0 * sigma * sigma;

            sum += (-d_squared / (2.0 * area * k_squared)).exp();
            count += 1;
        }

        if count == 0 { 0.0 } else { sum / count as f32 }
    }
}

/// Removes implausible and duplicate person poses.
///
/// # Example
///
/// ```
/// use det_postprocess::{PoseDedupConfig, PoseDeduplicator};
/// use det_types::{BoundingBox, Detection, Keypoint, Keypoints};
///
/// let pose = Keypoints::Pose([Keypoint::new(0.3, 0.5, 0.9); 17]);
/// let bbox = BoundingBox::new(0.2, 0.1, 0.4, 0.9);
/// let mut dets = vec![
///     Detection::new(bbox, 0, 0.9).with_keypoints(pose.clone()),
///     Detection::new(bbox, 0, 0.1).with_keypoints(pose),
/// ];
///
/// let dedup = PoseDeduplicator::new(PoseDedupConfig::new().with_pose_nms(0.5));
/// dedup.dedup(&mut dets, 0);
///
/// assert_eq!(dets.len(), 1);
/// assert!((dets[0].confidence - 0.9).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoseDeduplicator<S = ObjectKeypointSimilarity> {
    config: PoseDedupConfig,
    similarity: S,
}

impl PoseDeduplicator {
    /// Creates a deduplicator scoring poses with COCO OKS.
    #[must_use]
    pub fn new(config: PoseDedupConfig) -> Self {
        Self::with_similarity(config, ObjectKeypointSimilarity::default())
    }
}

impl<S: KeypointSimilarity> PoseDeduplicator<S> {
    /// Creates a deduplicator with a custom similarity metric.
    #[must_use]
    pub const fn with_similarity(config: PoseDedupConfig, similarity: S) -> Self {
        Self { config, similarity }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PoseDedupConfig {
        &self.config
    }

    /// Deduplicates `detections` in place, preserving the order of survivors.
    ///
    /// Only detections of `person_class` are affected.
    pub fn dedup(&self, detections: &mut Vec<Detection>, person_class: u32) {
        let before = detections.len();
        let posed = self.plausible_poses(detections, person_class);

        if let Some(factor) = self.config.pose_expand {
            for &i in &posed {
                expand_to_keypoints(&mut detections[i], factor);
            }
        }

        if let Some(threshold) = self.config.pose_nms {
            self.suppress_similar(detections, &posed, threshold);
        }
        retain_live(detections);

        if let Some(threshold) = self.config.nms_iou {
            suppress_overlapping(detections, person_class, threshold);
            retain_live(detections);
        }

        debug!(
            before,
            after = detections.len(),
            posed = posed.len(),
            "deduplicated poses"
        );
    }

    /// Indices of person detections with a plausible pose. Tombstones large
    /// poseless boxes when an area limit is set.
    fn plausible_poses(&self, detections: &mut [Detection], person_class: u32) -> Vec<usize> {
        let mut posed = Vec::new();
        for (i, det) in detections.iter_mut().enumerate() {
            if det.class_id != person_class {
                continue;
            }
            let visible = det
                .keypoints
                .as_ref()
                .and_then(Keypoints::body_points)
                .map_or(0, |points| count_visible(points, POSE_VISIBILITY));

            if visible >= MIN_POSE_POINTS {
                posed.push(i);
            } else if let Some(limit) = self.config.pose_area_limit
                && det.bbox.area() > limit
            {
                det.tombstone();
            }
        }
        posed
    }

    fn suppress_similar(&self, detections: &mut [Detection], posed: &[usize], threshold: f32) {
        for (n, &i) in posed.iter().enumerate() {
            for &j in &posed[n + 1..] {
                if detections[i].is_tombstoned() {
                    break;
                }
                if detections[j].is_tombstoned() {
                    continue;
                }

                let (a, b) = (&detections[i], &detections[j]);
                if a.bbox.ioma(&b.bbox) <= 0.0 {
                    continue;
                }
                let (Some(pa), Some(pb)) = (body_points(a), body_points(b)) else {
                    continue;
                };
                let area = a.bbox.area().max(b.bbox.area());
                if self.similarity.similarity(pa, pb, area) <= threshold {
                    continue;
                }

                let (survivor, loser) = if b.confidence > a.confidence { (j, i) } else { (i, j) };
                merge_into(detections, survivor, loser);
            }
        }
    }
}

fn body_points(det: &Detection) -> Option<&[Keypoint]> {
    det.keypoints.as_ref().and_then(Keypoints::body_points)
}

/// Blends the box toward the union of itself and its visible landmarks.
fn expand_to_keypoints(det: &mut Detection, factor: f32) {
    let Some(bounds) = body_points(det).and_then(|points| visible_bounds(points, EXPAND_VISIBILITY))
    else {
        return;
    };
    let pose_box = det.bbox.union(&bounds);
    det.bbox = pose_box.lerp(&det.bbox, factor);
}

/// Moves the survivor's box toward the loser's by relative confidence and
/// tombstones the loser.
fn merge_into(detections: &mut [Detection], survivor: usize, loser: usize) {
    let (cs, cl) = (detections[survivor].confidence, detections[loser].confidence);
    let weight = cs / (cs + cl);
    let loser_box = detections[loser].bbox;
    let merged = detections[survivor].bbox.lerp(&loser_box, weight);
    detections[survivor].bbox = merged;
    detections[loser].tombstone();
}

/// Tombstones later person boxes overlapping a live earlier one.
fn suppress_overlapping(detections: &mut [Detection], person_class: u32, threshold: f32) {
    for i in 0..detections.len() {
        if detections[i].class_id != person_class || detections[i].is_tombstoned() {
            continue;
        }
        let kept = detections[i].bbox;
        for later in &mut detections[i + 1..] {
            if later.class_id == person_class && kept.iou(&later.bbox) > threshold {
                later.tombstone();
            }
        }
    }
}
