//! Pairwise score matrices.

use det_types::Detection;

use crate::error::{EvalError, Result};

/// Dense ground-truth by detection score matrix.
///
/// Row `i` holds the scores of ground truth `i` against every detection.
/// Higher is better; a missing score is 0.
///
/// # Example
///
/// ```
/// use det_eval::ScoreMatrix;
///
/// let dets = [0.2_f32, 0.9];
/// let gts = [1.0_f32];
/// let scores = ScoreMatrix::from_fn(&dets, &gts, |d, g| (d * g > 0.5).then_some(d * g));
///
/// assert_eq!(scores.num_ground_truth(), 1);
/// assert_eq!(scores.num_detections(), 2);
/// assert_eq!(scores.get(0, 0), 0.0);
/// assert!((scores.get(0, 1) - 0.9).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    scores: Vec<f32>,
}

impl ScoreMatrix {
    /// Creates an all-zero matrix.
    #[must_use]
    pub fn zeros(num_ground_truth: usize, num_detections: usize) -> Self {
        Self {
            rows: num_ground_truth,
            cols: num_detections,
            scores: vec![0.0; num_ground_truth * num_detections],
        }
    }

    /// Wraps a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ShapeMismatch`] if `scores` does not hold
    /// exactly `num_ground_truth * num_detections` values.
    pub fn from_vec(num_ground_truth: usize, num_detections: usize, scores: Vec<f32>) -> Result<Self> {
        if scores.len() != num_ground_truth * num_detections {
            return Err(EvalError::shape_mismatch(
                num_ground_truth,
                num_detections,
                scores.len(),
            ));
        }
        Ok(Self {
            rows: num_ground_truth,
            cols: num_detections,
            scores,
        })
    }

    /// Scores every detection against every ground truth.
    ///
    /// Any context the score needs is captured by the closure. `None` and
    /// non-finite scores are stored as 0.
    #[must_use]
    pub fn from_fn<D, G, F>(detections: &[D], ground_truth: &[G], score: F) -> Self
    where
        F: Fn(&D, &G) -> Option<f32>,
    {
        let scores = ground_truth
            .iter()
            .flat_map(|gt| {
                detections
                    .iter()
                    .map(|det| score(det, gt).filter(|s| s.is_finite()).unwrap_or(0.0))
                    .collect::<Vec<_>>()
            })
            .collect();
        Self {
            rows: ground_truth.len(),
            cols: detections.len(),
            scores,
        }
    }

    /// Number of ground-truth rows.
    #[must_use]
    pub const fn num_ground_truth(&self) -> usize {
        self.rows
    }

    /// Number of detection columns.
    #[must_use]
    pub const fn num_detections(&self) -> usize {
        self.cols
    }

    /// Returns `true` if either side is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Score of ground truth `gt` against detection `det`; 0 out of range.
    #[must_use]
    pub fn get(&self, gt: usize, det: usize) -> f32 {
        if gt >= self.rows || det >= self.cols {
            return 0.0;
        }
        self.scores[gt * self.cols + det]
    }

    /// Sets a score. Out-of-range indices are ignored.
    pub fn set(&mut self, gt: usize, det: usize, score: f32) {
        if gt < self.rows && det < self.cols {
            self.scores[gt * self.cols + det] = score;
        }
    }

    /// The scores of one ground truth against every detection.
    #[must_use]
    pub fn row(&self, gt: usize) -> &[f32] {
        let start = (gt * self.cols).min(self.scores.len());
        let end = (start + self.cols).min(self.scores.len());
        &self.scores[start..end]
    }
}

/// Box `IoU` when the classes agree, `None` otherwise.
#[must_use]
pub fn box_iou_score(detection: &Detection, ground_truth: &Detection) -> Option<f32> {
    (detection.class_id == ground_truth.class_id).then(|| detection.bbox.iou(&ground_truth.bbox))
}
