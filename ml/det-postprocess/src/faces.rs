//! Face detections derived from person skeletons.

use det_types::{BoundingBox, Detection, FacePosePoints, Keypoint, Keypoints, visible_bounds};

/// Facepose slots holding face landmarks: nose, eyes, mouth corners.
const FACE_SLOTS: [usize; 5] = [0, 1, 2, 17, 18];

/// Face box side relative to the landmark spread.
const FACE_BOX_SCALE: f32 = 2.0;

/// Synthesized faces overlapping an earlier one above this `IoU` are dropped.
pub const FACE_DUPLICATE_IOU: f32 = 0.5;

/// Derives a square face box from the face landmarks of a facepose skeleton.
///
/// The box is centred on the visible landmarks with a side of twice their
/// larger extent, clamped to `[0, 1]`. Returns `None` with fewer than two
/// visible landmarks or a degenerate result.
#[must_use]
pub fn face_box_from_facepose(points: &FacePosePoints) -> Option<BoundingBox> {
    let face: Vec<Keypoint> = FACE_SLOTS.iter().map(|&slot| points[slot]).collect();
    if face.iter().filter(|kp| kp.is_visible(0.0)).count() < 2 {
        return None;
    }

    let bounds = visible_bounds(&face, 0.0)?;
    let half = bounds.width().max(bounds.height()) * FACE_BOX_SCALE * 0.5;
    let (cx, cy) = bounds.center();
    let bbox = BoundingBox::new(cx - half, cy - half, cx + half, cy + half).clamped();

    (bbox.area() > 0.0).then_some(bbox)
}

/// Builds face detections from person detections carrying facepose points.
///
/// Each face copies the person's confidence and skeleton. A
/// face whose box overlaps an already synthesized face by more than
/// [`FACE_DUPLICATE_IOU`] is skipped.
#[must_use]
pub fn synthesize_faces(detections: &[Detection], person_class: u32, face_class: u32) -> Vec<Detection> {
    let mut faces: Vec<Detection> = Vec::new();

    for person in detections.iter().filter(|d| d.class_id == person_class) {
        let Some(points) = person.keypoints.as_ref().and_then(Keypoints::facepose) else {
            continue;
        };
        let Some(face_box) = face_box_from_facepose(points) else {
            continue;
        };
        if faces
            .iter()
            .any(|f| f.bbox.iou(&face_box) >= FACE_DUPLICATE_IOU)
        {
            continue;
        }

        faces.push(
            Detection::new(face_box, face_class, person.confidence)
                .with_keypoints(Keypoints::FacePose(*points)),
        );
    }

    faces
}
