//! Raw detector output and keypoint unpacking.

use det_types::{FACE_POINTS, FACEPOSE_POINTS, Keypoint, Keypoints, POSE_POINTS};
use tracing::warn;

use crate::error::{PostprocessError, Result};

/// Points in the face-then-pose layout.
const FACE_AND_POSE_POINTS: usize = FACE_POINTS + POSE_POINTS;

/// One frame of detector output as parallel per-box sequences.
///
/// # Example
///
/// ```
/// use det_postprocess::RawDetections;
///
/// let raw = RawDetections::new(
///     vec![[0.1, 0.1, 0.4, 0.9], [0.5, 0.5, 0.6, 0.6]],
///     vec![0, 2],
///     vec![0.9, 0.3],
/// )
/// .with_track_ids(vec![7, 8]);
///
/// assert_eq!(raw.len(), 2);
/// assert!(raw.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    /// Normalized `[x0, y0, x1, y1]` boxes.
    pub boxes: Vec<[f32; 4]>,
    /// Raw detector class per box.
    pub classes: Vec<u32>,
    /// Confidence per box.
    pub confidences: Vec<f32>,
    /// Tracker identity per box.
    pub track_ids: Option<Vec<u64>>,
    /// Normalized `(x, y)` keypoints per box.
    pub keypoints: Option<Vec<Vec<[f32; 2]>>>,
    /// Visibility per keypoint; 1.0 is assumed when absent.
    pub keypoint_confidences: Option<Vec<Vec<f32>>>,
}

impl RawDetections {
    /// Creates output with boxes, classes and confidences only.
    #[must_use]
    pub const fn new(boxes: Vec<[f32; 4]>, classes: Vec<u32>, confidences: Vec<f32>) -> Self {
        Self {
            boxes,
            classes,
            confidences,
            track_ids: None,
            keypoints: None,
            keypoint_confidences: None,
        }
    }

    /// Attaches tracker identities.
    #[must_use]
    pub fn with_track_ids(mut self, track_ids: Vec<u64>) -> Self {
        self.track_ids = Some(track_ids);
        self
    }

    /// Attaches keypoints and optional per-keypoint visibility.
    #[must_use]
    pub fn with_keypoints(
        mut self,
        keypoints: Vec<Vec<[f32; 2]>>,
        confidences: Option<Vec<Vec<f32>>>,
    ) -> Self {
        self.keypoints = Some(keypoints);
        self.keypoint_confidences = confidences;
        self
    }

    /// Returns the number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Returns `true` if there are no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Checks that every per-box sequence has one entry per box.
    ///
    /// # Errors
    ///
    /// Returns [`PostprocessError::DataSizeMismatch`] naming the first
    /// sequence whose length differs.
    pub fn validate(&self) -> Result<()> {
        let n = self.boxes.len();
        let check = |field: &'static str, actual: usize| {
            if actual == n {
                Ok(())
            } else {
                Err(PostprocessError::data_size_mismatch(field, n, actual))
            }
        };

        check("classes", self.classes.len())?;
        check("confidences", self.confidences.len())?;
        if let Some(ids) = &self.track_ids {
            check("track_ids", ids.len())?;
        }
        if let Some(points) = &self.keypoints {
            check("keypoints", points.len())?;
            if let Some(confs) = &self.keypoint_confidences {
                check("keypoint_confidences", confs.len())?;
                for (p, c) in points.iter().zip(confs) {
                    if p.len() != c.len() {
                        return Err(PostprocessError::data_size_mismatch(
                            "keypoint_confidences",
                            p.len(),
                            c.len(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Unpacks the keypoints of box `index`.
    #[must_use]
    pub fn unpack(&self, index: usize) -> UnpackedKeypoints {
        let Some(points) = self.keypoints.as_ref().and_then(|kps| kps.get(index)) else {
            return UnpackedKeypoints::default();
        };
        let confidences = self
            .keypoint_confidences
            .as_ref()
            .and_then(|confs| confs.get(index))
            .map(Vec::as_slice);
        unpack_keypoints(points, confidences)
    }
}

/// Keypoints of one box after layout detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnpackedKeypoints {
    /// Landmarks in the layout implied by the point count.
    pub keypoints: Option<Keypoints>,
    /// Visibility of each channel beyond the face and pose points.
    pub pose_attrs: Option<Vec<f32>>,
}

/// Interprets one box's keypoints by count.
///
/// | Points | Layout |
/// |--------|--------|
/// | 5 | face |
/// | 17 | pose |
/// | 19 | facepose |
/// | 22 | face then pose |
/// | more than 22 | face, pose, then one attribute channel per extra point |
///
/// A point with both coordinates `<= 0` is marked invisible whatever its
/// reported confidence. Other counts are logged and yield no keypoints.
#[must_use]
pub fn unpack_keypoints(points: &[[f32; 2]], confidences: Option<&[f32]>) -> UnpackedKeypoints {
    let keypoints: Vec<Keypoint> = points
        .iter()
        .enumerate()
        .map(|(j, &[x, y])| {
            let reported = confidences.and_then(|c| c.get(j)).copied().unwrap_or(1.0);
            let visibility = if x <= 0.0 && y <= 0.0 { 0.0 } else { reported };
            Keypoint::new(x, y, visibility)
        })
        .collect();

    let (layout, pose_attrs) = match keypoints.len() {
        POSE_POINTS => (Keypoints::Pose(fixed(&keypoints)), None),
        FACE_POINTS => (Keypoints::Face(fixed(&keypoints)), None),
        FACEPOSE_POINTS => (Keypoints::FacePose(fixed(&keypoints)), None),
        n if n >= FACE_AND_POSE_POINTS => {
            let (face, rest) = keypoints.split_at(FACE_POINTS);
            let (pose, extra) = rest.split_at(POSE_POINTS);
            let attrs = (!extra.is_empty()).then(|| extra.iter().map(|kp| kp.visibility).collect());
            (
                Keypoints::FaceAndPose {
                    face: fixed(face),
                    pose: fixed(pose),
                },
                attrs,
            )
        }
        n => {
            warn!(count = n, "unrecognized keypoint count, dropping keypoints");
            return UnpackedKeypoints::default();
        }
    };

    UnpackedKeypoints {
        keypoints: Some(layout),
        pose_attrs,
    }
}

fn fixed<const N: usize>(points: &[Keypoint]) -> [Keypoint; N] {
    std::array::from_fn(|i| points.get(i).copied().unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn points(n: usize) -> Vec<[f32; 2]> {
        (0..n).map(|i| [0.1 + i as f32 * 0.01, 0.5]).collect()
    }

    #[test]
    fn unpack_pose() {
        let unpacked = unpack_keypoints(&points(17), None);
        let kp = unpacked.keypoints.unwrap();
        assert!(kp.pose().is_some());
        assert_eq!(kp.pose().unwrap()[0].visibility, 1.0);
        assert!(unpacked.pose_attrs.is_none());
    }

    #[test]
    fn unpack_face_and_facepose() {
        assert!(
            unpack_keypoints(&points(5), None)
                .keypoints
                .unwrap()
                .face()
                .is_some()
        );
        assert!(
            unpack_keypoints(&points(19), None)
                .keypoints
                .unwrap()
                .facepose()
                .is_some()
        );
    }

    #[test]
    fn unpack_face_then_pose() {
        let pts = points(22);
        let kp = unpack_keypoints(&pts, None).keypoints.unwrap();
        assert_eq!(kp.face().unwrap()[4].x, pts[4][0]);
        assert_eq!(kp.pose().unwrap()[0].x, pts[5][0]);
    }

    #[test]
    fn unpack_extra_channels_become_pose_attrs() {
        let pts = points(25);
        let mut confs = vec![0.9; 25];
        confs[22] = 0.7;
        confs[23] = 0.0;
        confs[24] = 0.3;

        let unpacked = unpack_keypoints(&pts, Some(confs.as_slice()));
        assert!(matches!(
            unpacked.keypoints,
            Some(Keypoints::FaceAndPose { .. })
        ));
        assert_eq!(unpacked.pose_attrs, Some(vec![0.7, 0.0, 0.3]));
    }

    #[test]
    fn unpack_origin_point_is_invisible() {
        let mut pts = points(17);
        pts[3] = [0.0, -0.1];
        pts[4] = [0.0, 0.4];
        let kp = unpack_keypoints(&pts, Some(&[0.8; 17][..])).keypoints.unwrap();
        let pose = kp.pose().unwrap();
        assert_eq!(pose[3].visibility, 0.0);
        assert_eq!(pose[4].visibility, 0.8);
    }

    #[test]
    fn unpack_bad_count() {
        let unpacked = unpack_keypoints(&points(12), None);
        assert_eq!(unpacked, UnpackedKeypoints::default());
    }

    #[test]
    fn raw_validate_mismatch() {
        let raw = RawDetections::new(vec![[0.0; 4]; 2], vec![0], vec![0.5, 0.5]);
        let err = raw.validate().unwrap_err();
        assert!(matches!(
            err,
            PostprocessError::DataSizeMismatch {
                field: "classes",
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn raw_validate_keypoint_confidences() {
        let raw = RawDetections::new(vec![[0.0; 4]], vec![0], vec![0.5])
            .with_keypoints(vec![points(17)], Some(vec![vec![1.0; 16]]));
        assert!(raw.validate().is_err());
    }

    #[test]
    fn raw_unpack_without_keypoints() {
        let raw = RawDetections::new(vec![[0.0; 4]], vec![0], vec![0.5]);
        assert_eq!(raw.unpack(0), UnpackedKeypoints::default());
        assert!(!raw.is_empty());
    }
}
