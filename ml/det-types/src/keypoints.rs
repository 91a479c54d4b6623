//! Keypoint layouts and translation between them.
//!
//! Three layouts are in use:
//!
//! | Layout | Points | Order |
//! |--------|--------|-------|
//! | face | 5 | right eye, left eye, nose, right mouth, left mouth |
//! | pose | 17 | COCO body order |
//! | facepose | 19 | COCO body order, then left mouth (17), right mouth (18) |
//!
//! A detection carries at most one [`Keypoints`] value, and the facepose
//! layout can never coexist with the face or pose layouts.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;
use crate::error::{DetTypesError, Result};

/// Number of points in the face layout.
pub const FACE_POINTS: usize = 5;
/// Number of points in the COCO pose layout.
pub const POSE_POINTS: usize = 17;
/// Number of points in the combined facepose layout.
pub const FACEPOSE_POINTS: usize = 19;

/// Facepose slot for each face landmark.
///
/// Right eye, left eye and nose land on their COCO counterparts; the mouth
/// corners use the two extra slots.
pub const FACE_TO_FACEPOSE: [usize; FACE_POINTS] = [2, 1, 0, 18, 17];

/// Face landmarks in face-layout order.
pub type FacePoints = [Keypoint; FACE_POINTS];
/// Body landmarks in COCO order.
pub type PosePoints = [Keypoint; POSE_POINTS];
/// COCO body landmarks followed by the two mouth corners.
pub type FacePosePoints = [Keypoint; FACEPOSE_POINTS];

/// A single landmark.
///
/// Coordinates are normalized to `[0, 1]`. A visibility of 0 means the
/// point is not present.
///
/// # Example
///
/// ```
/// use det_types::Keypoint;
///
/// let nose = Keypoint::new(0.5, 0.3, 0.95);
/// assert!(nose.is_visible(0.5));
/// assert!(!Keypoint::invisible().is_visible(0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// X coordinate (normalized `[0, 1]`).
    pub x: f32,
    /// Y coordinate (normalized `[0, 1]`).
    pub y: f32,
    /// Visibility confidence `[0, 1]`.
    pub visibility: f32,
}

impl Keypoint {
    /// Creates a new keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    /// Creates an invisible/undetected keypoint.
    #[must_use]
    pub const fn invisible() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            visibility: 0.0,
        }
    }

    /// Returns `true` if visibility is strictly above the threshold.
    #[must_use]
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self::invisible()
    }
}

/// Counts points with visibility strictly above `threshold`.
#[must_use]
pub fn count_visible(points: &[Keypoint], threshold: f32) -> usize {
    points.iter().filter(|kp| kp.is_visible(threshold)).count()
}

/// Bounding box of the points visible above `threshold`.
///
/// Returns `None` if no point qualifies.
#[must_use]
pub fn visible_bounds(points: &[Keypoint], threshold: f32) -> Option<BoundingBox> {
    let mut visible = points.iter().filter(|kp| kp.is_visible(threshold));
    let first = visible.next()?;
    let start = BoundingBox::new(first.x, first.y, first.x, first.y);
    Some(visible.fold(start, |bbox, kp| bbox.include_point(kp.x, kp.y)))
}

/// Keypoint layout requested for output.
///
/// # Example
///
/// ```
/// use det_types::KeypointMode;
///
/// let mode = KeypointMode::from_flags(true, true, false).unwrap();
/// assert_eq!(mode, KeypointMode::FaceAndPose);
/// assert!(KeypointMode::from_flags(true, false, true).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointMode {
    /// Strip all keypoints.
    #[default]
    None,
    /// Face landmarks only.
    Face,
    /// Body pose only.
    Pose,
    /// Separate face and pose landmark sets.
    FaceAndPose,
    /// Single 19-point skeleton.
    FacePose,
}

impl KeypointMode {
    /// Builds a mode from the three independent layout requests.
    ///
    /// # Errors
    ///
    /// Returns [`DetTypesError::InvalidKeypointMode`] if `facepose` is
    /// requested together with `face` or `pose`.
    pub const fn from_flags(face: bool, pose: bool, facepose: bool) -> Result<Self> {
        match (face, pose, facepose) {
            (false, false, false) => Ok(Self::None),
            (true, false, false) => Ok(Self::Face),
            (false, true, false) => Ok(Self::Pose),
            (true, true, false) => Ok(Self::FaceAndPose),
            (false, false, true) => Ok(Self::FacePose),
            _ => Err(DetTypesError::invalid_keypoint_mode(face, pose, facepose)),
        }
    }

    /// Returns `true` if the separate face layout is kept.
    #[must_use]
    pub const fn wants_face(self) -> bool {
        matches!(self, Self::Face | Self::FaceAndPose)
    }

    /// Returns `true` if the separate pose layout is kept.
    #[must_use]
    pub const fn wants_pose(self) -> bool {
        matches!(self, Self::Pose | Self::FaceAndPose)
    }

    /// Returns `true` if the combined facepose layout is produced.
    #[must_use]
    pub const fn wants_facepose(self) -> bool {
        matches!(self, Self::FacePose)
    }
}

/// Keypoints attached to a detection, in one of the supported layouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keypoints {
    /// Face landmarks only.
    Face(FacePoints),
    /// Body pose only.
    Pose(PosePoints),
    /// Separate face and body landmark sets.
    FaceAndPose {
        /// Face landmarks.
        face: FacePoints,
        /// Body landmarks.
        pose: PosePoints,
    },
    /// Combined 19-point skeleton.
    FacePose(FacePosePoints),
}

impl Keypoints {
    /// Returns the face landmarks, if this layout carries them separately.
    #[must_use]
    pub const fn face(&self) -> Option<&FacePoints> {
        match self {
            Self::Face(face) | Self::FaceAndPose { face, .. } => Some(face),
            Self::Pose(_) | Self::FacePose(_) => None,
        }
    }

    /// Returns the body landmarks, if this layout carries them separately.
    #[must_use]
    pub const fn pose(&self) -> Option<&PosePoints> {
        match self {
            Self::Pose(pose) | Self::FaceAndPose { pose, .. } => Some(pose),
            Self::Face(_) | Self::FacePose(_) => None,
        }
    }

    /// Returns the combined skeleton, if present.
    #[must_use]
    pub const fn facepose(&self) -> Option<&FacePosePoints> {
        match self {
            Self::FacePose(points) => Some(points),
            _ => None,
        }
    }

    /// Returns the 17 COCO body slots of either body-carrying layout.
    #[must_use]
    pub fn body_points(&self) -> Option<&[Keypoint]> {
        match self {
            Self::Pose(pose) | Self::FaceAndPose { pose, .. } => Some(pose.as_slice()),
            Self::FacePose(points) => Some(&points[..POSE_POINTS]),
            Self::Face(_) => None,
        }
    }

    /// Returns the mode this value already satisfies.
    #[must_use]
    pub const fn mode(&self) -> KeypointMode {
        match self {
            Self::Face(_) => KeypointMode::Face,
            Self::Pose(_) => KeypointMode::Pose,
            Self::FaceAndPose { .. } => KeypointMode::FaceAndPose,
            Self::FacePose(_) => KeypointMode::FacePose,
        }
    }

    /// Flattens to `[x, y, visibility, ...]`.
    ///
    /// Face-and-pose emits the face block first, matching the 66-value
    /// detector layout.
    #[must_use]
    pub fn to_flat(&self) -> Vec<f32> {
        let chunks: [&[Keypoint]; 2] = match self {
            Self::Face(face) => [face.as_slice(), &[]],
            Self::Pose(pose) => [pose.as_slice(), &[]],
            Self::FaceAndPose { face, pose } => [face.as_slice(), pose.as_slice()],
            Self::FacePose(points) => [points.as_slice(), &[]],
        };
        chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .flat_map(|kp| [kp.x, kp.y, kp.visibility])
            .collect()
    }

    /// Converts to the requested layout.
    ///
    /// Requested layouts with no source data are filled with invisible
    /// points; unrequested layouts are dropped. Returns `None` for
    /// [`KeypointMode::None`]. Converting a value that already matches the
    /// mode returns it unchanged.
    ///
    /// Building a facepose skeleton overwrites the nose and eye slots with
    /// the face landmarks when any face landmark is visible. Splitting a
    /// facepose skeleton reads those slots back for both layouts, so the
    /// original body nose/eyes are not recoverable after a round trip.
    #[must_use]
    pub fn into_mode(self, mode: KeypointMode) -> Option<Self> {
        if self.mode() == mode {
            return Some(self);
        }

        let (face, pose) = match self {
            Self::Face(face) => (Some(face), None),
            Self::Pose(pose) => (None, Some(pose)),
            Self::FaceAndPose { face, pose } => (Some(face), Some(pose)),
            Self::FacePose(points) => {
                let (face, pose) = split_facepose(&points);
                (Some(face), Some(pose))
            }
        };

        build_layout(face, pose, mode)
    }

    /// Keeps only the face landmarks.
    #[must_use]
    pub fn retain_face(self) -> Option<Self> {
        self.face().copied().map(Self::Face)
    }

    /// Keeps only the body landmarks.
    #[must_use]
    pub fn retain_pose(self) -> Option<Self> {
        self.pose().copied().map(Self::Pose)
    }
}

/// Applies [`Keypoints::into_mode`] to an optional keypoint value.
///
/// A missing value becomes all-invisible buffers of the requested layout.
#[must_use]
pub fn translate_keypoints(keypoints: Option<Keypoints>, mode: KeypointMode) -> Option<Keypoints> {
    match keypoints {
        Some(kp) => kp.into_mode(mode),
        None => build_layout(None, None, mode),
    }
}

fn build_layout(
    face: Option<FacePoints>,
    pose: Option<PosePoints>,
    mode: KeypointMode,
) -> Option<Keypoints> {
    match mode {
        KeypointMode::None => None,
        KeypointMode::Face => Some(Keypoints::Face(face.unwrap_or_default())),
        KeypointMode::Pose => Some(Keypoints::Pose(pose.unwrap_or_default())),
        KeypointMode::FaceAndPose => Some(Keypoints::FaceAndPose {
            face: face.unwrap_or_default(),
            pose: pose.unwrap_or_default(),
        }),
        KeypointMode::FacePose => Some(Keypoints::FacePose(merge_facepose(
            face.as_ref(),
            pose.as_ref(),
        ))),
    }
}

/// Builds the 19-point skeleton from separate face and pose landmarks.
#[must_use]
pub fn merge_facepose(face: Option<&FacePoints>, pose: Option<&PosePoints>) -> FacePosePoints {
    let mut points = [Keypoint::invisible(); FACEPOSE_POINTS];
    if let Some(pose) = pose {
        points[..POSE_POINTS].copy_from_slice(pose);
    }
    if let Some(face) = face.filter(|face| count_visible(face.as_slice(), 0.0) > 0) {
        for (kp, &slot) in face.iter().zip(FACE_TO_FACEPOSE.iter()) {
            points[slot] = *kp;
        }
    }
    points
}

/// Splits the 19-point skeleton back into face and pose landmarks.
#[must_use]
pub fn split_facepose(points: &FacePosePoints) -> (FacePoints, PosePoints) {
    let mut pose = [Keypoint::invisible(); POSE_POINTS];
    pose.copy_from_slice(&points[..POSE_POINTS]);
    let face = FACE_TO_FACEPOSE.map(|slot| points[slot]);
    (face, pose)
}

/// A skeleton line between two landmarks.
///
/// When `to_partner` is set the line ends at the midpoint of `to` and
/// `to_partner` (nose to mid-shoulders).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bone {
    /// Start landmark index.
    pub from: usize,
    /// End landmark index.
    pub to: usize,
    /// Optional second end landmark.
    pub to_partner: Option<usize>,
}

impl Bone {
    const fn pair(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            to_partner: None,
        }
    }

    /// Returns the line endpoints, or `None` if any landmark involved is
    /// missing or has zero visibility.
    #[must_use]
    pub fn endpoints(&self, points: &[Keypoint]) -> Option<((f32, f32), (f32, f32))> {
        let present = |index: usize| points.get(index).filter(|kp| kp.visibility != 0.0);
        let start = present(self.from)?;
        let end = present(self.to)?;
        let (ex, ey) = match self.to_partner {
            Some(partner) => {
                let partner = present(partner)?;
                (
                    f32::midpoint(end.x, partner.x),
                    f32::midpoint(end.y, partner.y),
                )
            }
            None => (end.x, end.y),
        };
        Some(((start.x, start.y), (ex, ey)))
    }
}

/// COCO body skeleton lines.
pub const SKELETON_BONES: [Bone; 17] = [
    Bone::pair(0, 1),
    Bone::pair(0, 2),
    Bone {
        from: 0,
        to: 5,
        to_partner: Some(6),
    },
    Bone::pair(1, 3),
    Bone::pair(2, 4),
    Bone::pair(5, 6),
    Bone::pair(5, 11),
    Bone::pair(6, 12),
    Bone::pair(11, 12),
    Bone::pair(5, 7),
    Bone::pair(7, 9),
    Bone::pair(6, 8),
    Bone::pair(8, 10),
    Bone::pair(11, 13),
    Bone::pair(13, 15),
    Bone::pair(12, 14),
    Bone::pair(14, 16),
];

/// Mouth line of the facepose skeleton.
pub const FACEPOSE_EXTRA_BONE: Bone = Bone::pair(17, 18);
