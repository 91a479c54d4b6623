//! One-to-one assignment of detections to ground truth.

use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::scores::ScoreMatrix;

/// Fixed-point scale applied to scores before the exact solver.
pub const SCORE_SCALE: f32 = 1_000_000.0;

/// Scores are clamped to this magnitude before scaling.
const SCORE_LIMIT: f32 = 1_000_000.0;

/// Matched pairs as three parallel sequences.
///
/// # Example
///
/// ```
/// use det_eval::{HungarianMatcher, Matcher, ScoreMatrix};
///
/// let scores = ScoreMatrix::from_vec(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
/// let assignment = HungarianMatcher.solve(&scores).unwrap();
///
/// assert_eq!(assignment.ground_truth_indices, vec![0, 1]);
/// assert_eq!(assignment.detection_indices, vec![1, 0]);
/// assert!((assignment.total_score() - 2.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Matched detection index per pair.
    pub detection_indices: Vec<usize>,
    /// Matched ground-truth index per pair.
    pub ground_truth_indices: Vec<usize>,
    /// Score per pair.
    pub scores: Vec<f32>,
}

impl Assignment {
    /// Creates an assignment with no pairs.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            detection_indices: Vec::new(),
            ground_truth_indices: Vec::new(),
            scores: Vec::new(),
        }
    }

    fn push(&mut self, detection: usize, ground_truth: usize, score: f32) {
        self.detection_indices.push(detection);
        self.ground_truth_indices.push(ground_truth);
        self.scores.push(score);
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if nothing was matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sum of pair scores.
    #[must_use]
    pub fn total_score(&self) -> f32 {
        self.scores.iter().sum()
    }

    /// Iterates `(detection, ground_truth, score)` triples.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.detection_indices
            .iter()
            .zip(&self.ground_truth_indices)
            .zip(&self.scores)
            .map(|((&d, &g), &s)| (d, g, s))
    }

    /// Detection paired with a ground truth, if any.
    #[must_use]
    pub fn detection_for(&self, ground_truth: usize) -> Option<usize> {
        self.pairs()
            .find(|&(_, g, _)| g == ground_truth)
            .map(|(d, _, _)| d)
    }

    /// Ground truth paired with a detection, if any.
    #[must_use]
    pub fn ground_truth_for(&self, detection: usize) -> Option<usize> {
        self.pairs()
            .find(|&(d, _, _)| d == detection)
            .map(|(_, g, _)| g)
    }

    /// Precision, recall and F1 counting pairs scoring at least `min_score`
    /// as true positives.
    ///
    /// Two empty sets score perfectly.
    #[must_use]
    pub fn metrics(
        &self,
        num_detections: usize,
        num_ground_truth: usize,
        min_score: f32,
    ) -> MatchMetrics {
        if num_detections == 0 && num_ground_truth == 0 {
            return MatchMetrics {
                precision: 1.0,
                recall: 1.0,
                f1: 1.0,
                true_positives: 0,
            };
        }

        let true_positives = self.scores.iter().filter(|&&s| s >= min_score).count();

        #[allow(clippy::cast_precision_loss)]
        let ratio = |n: usize| {
            if n == 0 {
                0.0
            } else {
                true_positives as f32 / n as f32
            }
        };
        let precision = ratio(num_detections);
        let recall = ratio(num_ground_truth);

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        MatchMetrics {
            precision,
            recall,
            f1,
            true_positives,
        }
    }
}

/// Detection quality against ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// True positives over detections.
    pub precision: f32,
    /// True positives over ground truth.
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Pairs at or above the score floor.
    pub true_positives: usize,
}

/// A strategy for pairing detections with ground truth.
pub trait Matcher {
    /// Solves the assignment for a score matrix.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Solver`] if the solver rejects the matrix.
    fn solve(&self, scores: &ScoreMatrix) -> Result<Assignment>;

    /// Scores every pair with `score` and solves the assignment.
    ///
    /// # Errors
    ///
    /// See [`Matcher::solve`].
    fn match_sets<D, G, F>(&self, detections: &[D], ground_truth: &[G], score: F) -> Result<Assignment>
    where
        Self: Sized,
        F: Fn(&D, &G) -> Option<f32>,
    {
        self.solve(&ScoreMatrix::from_fn(detections, ground_truth, score))
    }
}

/// Maximum-weight matching via Kuhn-Munkres.
///
/// Pairs `min(detections, ground_truth)` entries, including zero-score
/// pairs, ordered by ground-truth index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HungarianMatcher;

impl Matcher for HungarianMatcher {
    fn solve(&self, scores: &ScoreMatrix) -> Result<Assignment> {
        if scores.is_empty() {
            return Ok(Assignment::empty());
        }

        let num_gt = scores.num_ground_truth();
        let num_det = scores.num_detections();

        // The solver needs rows <= columns.
        let transposed = num_gt > num_det;
        let (rows, cols) = if transposed {
            (num_det, num_gt)
        } else {
            (num_gt, num_det)
        };
        let score_at = |r: usize, c: usize| {
            if transposed {
                scores.get(c, r)
            } else {
                scores.get(r, c)
            }
        };

        let mut weights = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                weights.push(to_fixed(score_at(r, c)));
            }
        }
        let matrix =
            Matrix::from_vec(rows, cols, weights).map_err(|e| EvalError::solver(e.to_string()))?;
        let (_, columns) = kuhn_munkres(&matrix);

        let mut pairs: Vec<(usize, usize)> = columns
            .into_iter()
            .enumerate()
            .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
            .collect();
        pairs.sort_unstable();

        let mut assignment = Assignment::empty();
        for (gt, det) in pairs {
            assignment.push(det, gt, scores.get(gt, det));
        }

        debug!(
            ground_truth = num_gt,
            detections = num_det,
            total = assignment.total_score(),
            "solved exact assignment"
        );
        Ok(assignment)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_fixed(score: f32) -> i64 {
    let clamped = if score.is_finite() {
        score.clamp(-SCORE_LIMIT, SCORE_LIMIT)
    } else {
        0.0
    };
    (f64::from(clamped) * f64::from(SCORE_SCALE)).round() as i64
}

/// Greedy fallback matching.
///
/// Detections are visited in order; each takes the unmatched ground truth
/// with the highest score above `floor`. Not optimal, and results can
/// differ from [`HungarianMatcher`]. Pairs are ordered by detection index.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GreedyMatcher {
    /// Pairs must score strictly above this.
    pub floor: f32,
}

impl GreedyMatcher {
    /// Creates a greedy matcher with the given score floor.
    #[must_use]
    pub const fn new(floor: f32) -> Self {
        Self { floor }
    }
}

impl Matcher for GreedyMatcher {
    fn solve(&self, scores: &ScoreMatrix) -> Result<Assignment> {
        let mut assignment = Assignment::empty();
        if scores.is_empty() {
            return Ok(assignment);
        }

        let mut taken = vec![false; scores.num_ground_truth()];
        for det in 0..scores.num_detections() {
            let mut best: Option<(usize, f32)> = None;
            for (gt, used) in taken.iter().enumerate() {
                let s = scores.get(gt, det);
                let bar = best.map_or(self.floor, |(_, b)| b);
                if !used && s > bar {
                    best = Some((gt, s));
                }
            }
            if let Some((gt, s)) = best {
                taken[gt] = true;
                assignment.push(det, gt, s);
            }
        }

        debug!(
            ground_truth = scores.num_ground_truth(),
            detections = scores.num_detections(),
            matched = assignment.len(),
            "solved greedy assignment"
        );
        Ok(assignment)
    }
}

/// Matcher selection by configuration.
///
/// # Example
///
/// ```
/// use det_eval::MatchStrategy;
///
/// let strategy: MatchStrategy = serde_json::from_str(r#"{"greedy":{"floor":0.1}}"#).unwrap();
/// assert_eq!(strategy, MatchStrategy::greedy(0.1));
/// assert_eq!(MatchStrategy::default(), MatchStrategy::Hungarian);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Exact maximum-weight matching.
    #[default]
    Hungarian,

    /// Greedy matching in detection order.
    Greedy {
        /// Pairs must score strictly above this.
        floor: f32,
    },
}

impl MatchStrategy {
    /// Creates a greedy strategy.
    #[must_use]
    pub const fn greedy(floor: f32) -> Self {
        Self::Greedy { floor }
    }

    /// Returns `true` if the strategy finds the optimum.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        matches!(self, Self::Hungarian)
    }
}

impl Matcher for MatchStrategy {
    fn solve(&self, scores: &ScoreMatrix) -> Result<Assignment> {
        match *self {
            Self::Hungarian => HungarianMatcher.solve(scores),
            Self::Greedy { floor } => GreedyMatcher::new(floor).solve(scores),
        }
    }
}
