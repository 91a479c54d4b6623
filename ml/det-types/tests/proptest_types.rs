//! Property-based tests for box geometry and keypoint translation.
//!
//! Run with: cargo test -p det-types -- proptest

use det_types::{
    BoundingBox, FACE_POINTS, FacePoints, Keypoint, KeypointMode, Keypoints, POSE_POINTS,
    PosePoints, translate_keypoints,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_box() -> impl Strategy<Value = BoundingBox> {
    prop::array::uniform4(-0.5f32..1.5).prop_map(BoundingBox::from_array)
}

fn arb_visible_keypoint() -> impl Strategy<Value = Keypoint> {
    (0.01f32..1.0, 0.01f32..1.0, 0.1f32..1.0).prop_map(|(x, y, v)| Keypoint::new(x, y, v))
}

fn arb_face() -> impl Strategy<Value = FacePoints> {
    prop::collection::vec(arb_visible_keypoint(), FACE_POINTS).prop_map(|points| {
        let mut face = [Keypoint::invisible(); FACE_POINTS];
        face.copy_from_slice(&points);
        face
    })
}

fn arb_pose() -> impl Strategy<Value = PosePoints> {
    prop::collection::vec(arb_visible_keypoint(), POSE_POINTS).prop_map(|points| {
        let mut pose = [Keypoint::invisible(); POSE_POINTS];
        pose.copy_from_slice(&points);
        pose
    })
}

fn arb_mode() -> impl Strategy<Value = KeypointMode> {
    prop_oneof![
        Just(KeypointMode::None),
        Just(KeypointMode::Face),
        Just(KeypointMode::Pose),
        Just(KeypointMode::FaceAndPose),
        Just(KeypointMode::FacePose),
    ]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn proptest_clamp_is_idempotent(bbox in arb_box()) {
        let once = bbox.clamped();
        prop_assert_eq!(once.clamped(), once);
        prop_assert!(once.x0 >= 0.0 && once.x1 <= 1.0);
    }

    #[test]
    fn proptest_iou_is_symmetric_and_bounded(a in arb_box(), b in arb_box()) {
        let ab = a.iou(&b);
        prop_assert!((ab - b.iou(&a)).abs() < 1e-6);
        prop_assert!((0.0..=1.0 + 1e-6).contains(&ab));
        prop_assert!(a.ioma(&b) + 1e-6 >= ab);
    }

    #[test]
    fn proptest_facepose_round_trip_keeps_face_and_body(face in arb_face(), pose in arb_pose()) {
        let original = Keypoints::FaceAndPose { face, pose };
        let back = original
            .into_mode(KeypointMode::FacePose)
            .and_then(|kp| kp.into_mode(KeypointMode::FaceAndPose));

        let Some(back) = back else {
            return Err(TestCaseError::fail("round trip lost keypoints"));
        };
        prop_assert_eq!(back.face(), Some(&face));
        let back_pose = back.pose().map(|p| p[3..].to_vec());
        prop_assert_eq!(back_pose, Some(pose[3..].to_vec()));
    }

    #[test]
    fn proptest_translation_is_idempotent(pose in arb_pose(), mode in arb_mode()) {
        let once = translate_keypoints(Some(Keypoints::Pose(pose)), mode);
        let twice = translate_keypoints(once.clone(), mode);
        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(once.map(|kp| kp.mode()), match mode {
            KeypointMode::None => None,
            other => Some(other),
        });
    }
}
