//! Raw detector output to detection records.

use det_types::{
    AttributeMap, AttributeTable, BoundingBox, ClassRemap, ClassTable, Detection, Keypoints,
    translate_keypoints,
};
use tracing::{debug, warn};

use crate::attributes::fold_attributes;
use crate::config::DecodeConfig;
use crate::error::Result;
use crate::faces::synthesize_faces;
use crate::pose_nms::PoseDeduplicator;
use crate::raw::RawDetections;

/// Substring marking detector classes that encode person attributes.
pub const PERSON_ATTRIBUTE_MARKER: &str = "person_";

/// Pose-attribute channels at or below this value emit no pseudo-detection.
pub const POSE_ATTRIBUTE_THRESHOLD: f32 = 0.01;

const PERSON: &str = "person";
const FACE: &str = "face";

/// Class tables the decoder works against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderTables {
    /// Class names as the detector reports them.
    pub detector_classes: ClassTable,
    /// Output class names.
    pub classes: ClassTable,
    /// Output attribute names, `base:attr` each.
    pub attributes: Option<AttributeTable>,
    /// Detector class to output class mapping. Identity over the detector
    /// classes (or the observed class range, if larger) when absent.
    pub remap: Option<ClassRemap>,
}

impl DecoderTables {
    /// Creates tables where the detector and output classes coincide.
    #[must_use]
    pub fn new(classes: ClassTable) -> Self {
        Self {
            detector_classes: classes.clone(),
            classes,
            attributes: None,
            remap: None,
        }
    }

    /// Sets the detector class names.
    #[must_use]
    pub fn with_detector_classes(mut self, detector_classes: ClassTable) -> Self {
        self.detector_classes = detector_classes;
        self
    }

    /// Sets the attribute names.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeTable) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Sets the class remap.
    #[must_use]
    pub fn with_remap(mut self, remap: ClassRemap) -> Self {
        self.remap = Some(remap);
        self
    }
}

/// Turns one frame of raw detector output into detection records.
///
/// Stages, in order:
///
/// 1. Remap classes and drop dropped classes and low-confidence boxes.
/// 2. Unpack keypoints and pose-attribute channels.
/// 3. Emit a pseudo-detection per pose-attribute channel above 0.01.
/// 4. Optionally synthesize faces from person facepose skeletons.
/// 5. Translate keypoints to the configured layout.
/// 6. Optionally fold attribute detections.
/// 7. Optionally deduplicate person poses.
///
/// Tables and config are validated once in [`Decoder::new`].
///
/// # Example
///
/// ```
/// use det_postprocess::{DecodeConfig, Decoder, DecoderTables, RawDetections};
/// use det_types::ClassTable;
///
/// let tables = DecoderTables::new(ClassTable::new(["person", "car"]));
/// let decoder = Decoder::new(tables, DecodeConfig::default()).unwrap();
///
/// let raw = RawDetections::new(
///     vec![[0.1, 0.1, 0.4, 0.9], [0.5, 0.5, 0.9, 0.8]],
///     vec![0, 1],
///     vec![0.9, 0.005],
/// );
/// let dets = decoder.decode(&raw).unwrap();
///
/// assert_eq!(dets.len(), 1);
/// assert_eq!(dets[0].class_id, 0);
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    tables: DecoderTables,
    config: DecodeConfig,
    attribute_map: Option<AttributeMap>,
    attribute_classes: Vec<u32>,
    person_class: Option<u32>,
    face_class: Option<u32>,
    synthesize_faces: bool,
    dedup: PoseDeduplicator,
}

impl Decoder {
    /// Validates the config and builds the attribute associations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PostprocessError::InvalidConfig`] for an invalid
    /// config, or [`crate::PostprocessError::Types`] if the attribute table
    /// does not resolve against the output classes.
    pub fn new(tables: DecoderTables, config: DecodeConfig) -> Result<Self> {
        config.validate()?;

        let attribute_map = tables
            .attributes
            .as_ref()
            .map(|attributes| AttributeMap::new(&tables.classes, attributes))
            .transpose()?;
        let attribute_classes = tables
            .detector_classes
            .indices_containing(PERSON_ATTRIBUTE_MARKER);
        let person_class = tables.classes.index_of(PERSON);
        let face_class = tables.classes.index_of(FACE);
        let synthesize_faces = config.add_faces
            && !tables.detector_classes.contains(FACE)
            && person_class.is_some()
            && face_class.is_some();
        let dedup = PoseDeduplicator::new(config.pose);

        debug!(
            attribute_classes = attribute_classes.len(),
            synthesize_faces,
            mode = ?config.keypoint_mode,
            "created decoder"
        );

        Ok(Self {
            tables,
            config,
            attribute_map,
            attribute_classes,
            person_class,
            face_class,
            synthesize_faces,
            dedup,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Returns the class tables.
    #[must_use]
    pub const fn tables(&self) -> &DecoderTables {
        &self.tables
    }

    /// Returns the validated attribute associations, if attributes are set.
    #[must_use]
    pub const fn attribute_map(&self) -> Option<&AttributeMap> {
        self.attribute_map.as_ref()
    }

    /// Decodes one frame.
    ///
    /// Direct detections come first in input order, followed by attribute
    /// pseudo-detections and synthesized faces. An empty frame yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PostprocessError::DataSizeMismatch`] if the raw
    /// sequences disagree in length.
    pub fn decode(&self, raw: &RawDetections) -> Result<Vec<Detection>> {
        raw.validate()?;

        let identity;
        let remap = match &self.tables.remap {
            Some(remap) => remap,
            None => {
                let known = self.tables.detector_classes.len();
                let observed = ClassRemap::identity_for(&raw.classes, known);
                identity = if observed.len() < known {
                    ClassRemap::identity(known)
                } else {
                    observed
                };
                &identity
            }
        };

        let mut detections = self.direct_detections(raw, remap);
        let direct = detections.len();

        let pseudo = self.attribute_detections(&detections, remap);
        let num_pseudo = pseudo.len();
        detections.extend(pseudo);

        let mut num_faces = 0;
        if self.synthesize_faces
            && let (Some(person), Some(face)) = (self.person_class, self.face_class)
        {
            let faces = synthesize_faces(&detections, person, face);
            num_faces = faces.len();
            detections.extend(faces);
        }

        for det in &mut detections {
            self.normalize_keypoints(det);
        }

        if self.config.fold_attributes {
            fold_attributes(&mut detections, self.attribute_map.as_ref());
        }

        if self.config.pose.is_active() {
            match self.person_class {
                Some(person) => self.dedup.dedup(&mut detections, person),
                None => warn!("pose deduplication requested without a person class"),
            }
        }

        debug!(
            raw = raw.len(),
            direct,
            pseudo = num_pseudo,
            faces = num_faces,
            output = detections.len(),
            "decoded frame"
        );
        Ok(detections)
    }

    fn direct_detections(&self, raw: &RawDetections, remap: &ClassRemap) -> Vec<Detection> {
        let mut detections = Vec::with_capacity(raw.len());

        for (i, ((&bbox, &raw_class), &confidence)) in raw
            .boxes
            .iter()
            .zip(&raw.classes)
            .zip(&raw.confidences)
            .enumerate()
        {
            let Some(class_id) = remap.remap(raw_class) else {
                continue;
            };
            let Some(confidence) = unit_confidence(confidence) else {
                warn!(index = i, "skipping detection with non-finite confidence");
                continue;
            };
            if confidence <= self.config.confidence_threshold {
                continue;
            }

            let unpacked = raw.unpack(i);
            let mut det = Detection::new(BoundingBox::from_array(bbox), class_id, confidence);
            det.track_id = raw.track_ids.as_ref().and_then(|ids| ids.get(i)).copied();
            det.keypoints = unpacked.keypoints;
            det.pose_attrs = unpacked.pose_attrs;
            detections.push(det);
        }

        detections
    }

    /// One copy of the parent per pose-attribute channel above the threshold,
    /// classed as the channel's attribute class.
    fn attribute_detections(&self, detections: &[Detection], remap: &ClassRemap) -> Vec<Detection> {
        if self.attribute_classes.is_empty() {
            return Vec::new();
        }

        let mut pseudo = Vec::new();
        for det in detections {
            let Some(channels) = &det.pose_attrs else {
                continue;
            };
            for (j, &value) in channels.iter().enumerate() {
                let Some(value) = unit_confidence(value) else {
                    continue;
                };
                if value <= POSE_ATTRIBUTE_THRESHOLD {
                    continue;
                }
                let Some(&raw_class) = self.attribute_classes.get(j) else {
                    warn!(channel = j, "pose attribute channel has no attribute class");
                    continue;
                };
                let Some(class_id) = remap.remap(raw_class) else {
                    continue;
                };

                let mut copy = det.clone();
                copy.class_id = class_id;
                copy.confidence = value;
                pseudo.push(copy);
            }
        }
        pseudo
    }

    fn normalize_keypoints(&self, det: &mut Detection) {
        let mode = self.config.keypoint_mode;
        let mut keypoints = translate_keypoints(det.keypoints.take(), mode);

        if mode.wants_face() && Some(det.class_id) == self.face_class {
            keypoints = keypoints.and_then(Keypoints::retain_face);
        }
        if mode.wants_pose() && Some(det.class_id) == self.person_class {
            keypoints = keypoints.and_then(Keypoints::retain_pose);
        }
        det.keypoints = keypoints;
    }
}

/// Clamps a raw score into `[0, 1]`; `None` for NaN or infinities.
fn unit_confidence(value: f32) -> Option<f32> {
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::PoseDedupConfig;
    use crate::PostprocessError;
    use approx::assert_relative_eq;
    use det_types::{DetTypesError, KeypointMode};

    #[allow(clippy::cast_precision_loss)]
    fn body(dx: f32) -> Vec<[f32; 2]> {
        (0..17)
            .map(|k| [0.3 + dx + 0.005 * k as f32, 0.2 + 0.035 * k as f32])
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn face_then_body(extra: usize) -> Vec<[f32; 2]> {
        let mut points: Vec<[f32; 2]> = (0..5).map(|k| [0.32 + 0.01 * k as f32, 0.15]).collect();
        points.extend(body(0.0));
        points.extend(std::iter::repeat_n([0.5, 0.5], extra));
        points
    }

    fn facepose() -> Vec<[f32; 2]> {
        let mut points = body(0.0);
        points.extend([[0.3, 0.3], [0.31, 0.3]]);
        points
    }

    fn decoder(tables: DecoderTables, config: DecodeConfig) -> Decoder {
        Decoder::new(tables, config).unwrap()
    }

    #[test]
    fn decode_filters_threshold_and_dropped_classes() {
        let tables = DecoderTables::new(ClassTable::new(["person", "car", "dog"]))
            .with_remap(ClassRemap::from_signed(&[0, 1, -1]).unwrap());
        let raw = RawDetections::new(
            vec![[0.1, 0.1, 0.2, 0.2]; 4],
            vec![0, 1, 2, 0],
            vec![0.9, 0.5, 0.9, 0.01],
        )
        .with_track_ids(vec![10, 11, 12, 13]);

        let dets = decoder(tables, DecodeConfig::default()).decode(&raw).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].track_id, Some(10));
        assert_eq!(dets[1].class_id, 1);
    }

    #[test]
    fn decode_sanitizes_confidences() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let raw = RawDetections::new(
            vec![[0.1, 0.1, 0.2, 0.2]; 4],
            vec![0; 4],
            vec![f32::NAN, 1.7, f32::INFINITY, -0.4],
        );

        let dets = decoder(tables, DecodeConfig::default()).decode(&raw).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 1.0);
    }

    #[test]
    fn decode_clamps_attribute_channels() {
        let classes = ClassTable::new(["person", "person_male", "person_hat"]);
        let tables = DecoderTables::new(classes);
        let mut confs = vec![0.9; 24];
        confs[22] = 1.5;
        confs[23] = f32::NAN;
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]], vec![0], vec![0.8])
            .with_keypoints(vec![face_then_body(2)], Some(vec![confs]));

        let dets = decoder(tables, DecodeConfig::default()).decode(&raw).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[1].class_id, 1);
        assert_eq!(dets[1].confidence, 1.0);
    }

    #[test]
    fn decode_drops_classes_outside_detector_table() {
        let tables = DecoderTables::new(ClassTable::new(["person", "car"]));
        let raw = RawDetections::new(
            vec![[0.1, 0.1, 0.2, 0.2]; 3],
            vec![1, u32::MAX, 2],
            vec![0.9; 3],
        );

        let dets = decoder(tables, DecodeConfig::default()).decode(&raw).unwrap();
        assert_eq!(dets.iter().map(|d| d.class_id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn decode_keeps_detection_with_malformed_keypoints() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let config = DecodeConfig::new().with_keypoint_mode(KeypointMode::Pose);
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]], vec![0], vec![0.8])
            .with_keypoints(vec![vec![[0.3, 0.3]; 12]], None);

        let dets = decoder(tables, config).decode(&raw).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.8);
        assert!(dets[0].keypoints.is_none());
        assert!(dets[0].pose_attrs.is_none());
    }

    #[test]
    fn decode_identity_remap_covers_observed_classes() {
        let tables = DecoderTables::new(ClassTable::new(["a", "b", "c", "d"]));
        let raw = RawDetections::new(vec![[0.0, 0.0, 0.5, 0.5]; 2], vec![3, 0], vec![0.5, 0.6]);
        let dets = decoder(tables, DecodeConfig::default()).decode(&raw).unwrap();
        assert_eq!(dets.iter().map(|d| d.class_id).collect::<Vec<_>>(), vec![3, 0]);
    }

    #[test]
    fn decode_empty_frame() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let dets = decoder(tables, DecodeConfig::default())
            .decode(&RawDetections::default())
            .unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn decode_rejects_mismatched_lengths() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let raw = RawDetections::new(vec![[0.0; 4]; 2], vec![0, 0], vec![0.5]);
        let err = decoder(tables, DecodeConfig::default()).decode(&raw).unwrap_err();
        assert!(matches!(err, PostprocessError::DataSizeMismatch { .. }));
    }

    #[test]
    fn decode_translates_keypoints() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let config = DecodeConfig::new().with_keypoint_mode(KeypointMode::FacePose);
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]], vec![0], vec![0.8])
            .with_keypoints(vec![face_then_body(0)], None);

        let dets = decoder(tables, config).decode(&raw).unwrap();
        let points = dets[0].keypoints.as_ref().and_then(Keypoints::facepose).unwrap();
        // Left mouth (face 4) lands in slot 17.
        assert_relative_eq!(points[17].x, 0.36, epsilon = 1e-6);
    }

    #[test]
    fn decode_emits_attribute_pseudo_detections_and_folds_them() {
        let classes = ClassTable::new(["person", "person_male", "person_hat"]);
        let tables = DecoderTables::new(classes)
            .with_attributes(AttributeTable::new(["person:male", "person:hat"]));
        let mut confs = vec![0.9; 24];
        confs[22] = 0.7;
        confs[23] = 0.005;
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]], vec![0], vec![0.8])
            .with_keypoints(vec![face_then_body(2)], Some(vec![confs]));

        let unfolded = decoder(tables.clone(), DecodeConfig::default()).decode(&raw).unwrap();
        assert_eq!(unfolded.len(), 2);
        assert_eq!(unfolded[1].class_id, 1);
        assert_eq!(unfolded[1].confidence, 0.7);
        assert_eq!(unfolded[1].bbox, unfolded[0].bbox);

        let config = DecodeConfig::new().with_attribute_folding();
        let folded = decoder(tables, config).decode(&raw).unwrap();
        assert_eq!(folded.len(), 1);
        assert_eq!(folded[0].attrs, Some(vec![0.7, 0.0]));
        assert_eq!(folded[0].pose_attrs, Some(vec![0.7, 0.005]));
    }

    #[test]
    fn decode_synthesizes_faces() {
        let tables = DecoderTables::new(ClassTable::new(["person", "face"]))
            .with_detector_classes(ClassTable::new(["person"]));
        let config = DecodeConfig::new()
            .with_keypoint_mode(KeypointMode::FacePose)
            .with_faces();
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]], vec![0], vec![0.8])
            .with_keypoints(vec![facepose()], None);

        let dets = decoder(tables, config).decode(&raw).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[1].class_id, 1);
        assert_eq!(dets[1].confidence, 0.8);
        assert!(dets[1].bbox.area() > 0.0);
    }

    #[test]
    fn decode_skips_faces_when_detector_has_face_class() {
        let tables = DecoderTables::new(ClassTable::new(["person", "face"]));
        let config = DecodeConfig::new()
            .with_keypoint_mode(KeypointMode::FacePose)
            .with_faces();
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]], vec![0], vec![0.8])
            .with_keypoints(vec![facepose()], None);

        assert_eq!(decoder(tables, config).decode(&raw).unwrap().len(), 1);
    }

    #[test]
    fn decode_strips_cross_layout_for_face_and_person() {
        let tables = DecoderTables::new(ClassTable::new(["person", "face"]));
        let config = DecodeConfig::new().with_keypoint_mode(KeypointMode::FaceAndPose);
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]; 2], vec![0, 1], vec![0.8, 0.7])
            .with_keypoints(vec![face_then_body(0), face_then_body(0)], None);

        let dets = decoder(tables, config).decode(&raw).unwrap();
        assert_eq!(dets[0].keypoints.as_ref().map(Keypoints::mode), Some(KeypointMode::Pose));
        assert_eq!(dets[1].keypoints.as_ref().map(Keypoints::mode), Some(KeypointMode::Face));
    }

    #[test]
    fn decode_runs_pose_dedup() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let config = DecodeConfig::new()
            .with_keypoint_mode(KeypointMode::Pose)
            .with_pose(PoseDedupConfig::new().with_pose_nms(0.5));
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]; 2], vec![0, 0], vec![0.9, 0.1])
            .with_keypoints(vec![body(0.0), body(0.0)], None);

        let dets = decoder(tables, config).decode(&raw).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.9);
    }

    #[test]
    fn decode_folded_attribute_survives_pose_dedup() {
        let tables = DecoderTables::new(ClassTable::new(["person", "person_male"]))
            .with_attributes(AttributeTable::new(["person:male"]));
        let config = DecodeConfig::new()
            .with_keypoint_mode(KeypointMode::Pose)
            .with_attribute_folding()
            .with_pose(PoseDedupConfig::new().with_pose_nms(0.5));
        let mut strong = vec![0.9; 23];
        strong[22] = 0.8;
        let mut weak = vec![0.9; 23];
        weak[22] = 0.0;
        let raw = RawDetections::new(vec![[0.2, 0.1, 0.5, 0.9]; 2], vec![0, 0], vec![0.9, 0.1])
            .with_keypoints(
                vec![face_then_body(1), face_then_body(1)],
                Some(vec![strong, weak]),
            );

        let dets = decoder(tables, config).decode(&raw).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[0].attrs, Some(vec![0.8]));
    }

    #[test]
    fn decoder_rejects_unresolvable_attributes() {
        let tables = DecoderTables::new(ClassTable::new(["person"]))
            .with_attributes(AttributeTable::new(["person:male"]));
        let err = Decoder::new(tables, DecodeConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PostprocessError::Types(DetTypesError::UnknownClass(_))
        ));
    }

    #[test]
    fn decoder_rejects_invalid_config() {
        let tables = DecoderTables::new(ClassTable::new(["person"]));
        let config = DecodeConfig::new().with_confidence_threshold(-0.5);
        assert!(Decoder::new(tables, config).is_err());
    }
}
