//! Detection-to-ground-truth assignment.
//!
//! Pairs live detections with reference annotations one-to-one, maximizing
//! the total pairwise score.
//!
//! # Scoring
//!
//! - [`ScoreMatrix`] - Ground truth by detection scores from any closure
//! - [`box_iou_score`] - Same-class box `IoU`
//!
//! # Matching
//!
//! - [`HungarianMatcher`] - Exact maximum-weight matching
//! - [`GreedyMatcher`] - Order-dependent fallback
//! - [`MatchStrategy`] - Either one, selected by configuration
//! - [`Assignment`] - Matched pairs and [`MatchMetrics`]
//!
//! # Example
//!
//! ```
//! use det_eval::{HungarianMatcher, Matcher, box_iou_score};
//! use det_types::{BoundingBox, Detection};
//!
//! let gts = vec![Detection::new(BoundingBox::new(0.1, 0.1, 0.3, 0.3), 0, 1.0)];
//! let dets = vec![
//!     Detection::new(BoundingBox::new(0.6, 0.6, 0.8, 0.8), 0, 0.7),
//!     Detection::new(BoundingBox::new(0.1, 0.1, 0.3, 0.32), 0, 0.9),
//! ];
//!
//! let assignment = HungarianMatcher.match_sets(&dets, &gts, box_iou_score)?;
//! assert_eq!(assignment.detection_for(0), Some(1));
//! # Ok::<(), det_eval::EvalError>(())
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

mod error;
mod matching;
mod scores;

pub use error::{EvalError, Result};
pub use matching::{
    Assignment, GreedyMatcher, HungarianMatcher, MatchMetrics, MatchStrategy, Matcher, SCORE_SCALE,
};
pub use scores::{ScoreMatrix, box_iou_score};
