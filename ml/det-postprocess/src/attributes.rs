//! Folding attribute-class detections into their base detections.

use det_types::{AttributeMap, Detection, retain_live};
use tracing::debug;

/// Minimum box `IoU` for an attribute detection to fold into a base detection.
pub const ATTRIBUTE_FOLD_IOU: f32 = 0.3;

/// Folds attribute detections into the `attrs` of matching base detections.
///
/// Each attribute detection is matched to the live base-class detection with
/// the highest box `IoU`. Above [`ATTRIBUTE_FOLD_IOU`], its confidence raises
/// the base detection's attribute slot. Every attribute detection is then
/// removed, folded or not, so a second pass is a no-op.
///
/// With no map this does nothing.
///
/// # Example
///
/// ```
/// use det_postprocess::fold_attributes;
/// use det_types::{AttributeMap, AttributeTable, BoundingBox, ClassTable, Detection};
///
/// let classes = ClassTable::new(["person", "person_male"]);
/// let map = AttributeMap::new(&classes, &AttributeTable::new(["person:male"])).unwrap();
///
/// let bbox = BoundingBox::new(0.1, 0.1, 0.5, 0.9);
/// let mut dets = vec![Detection::new(bbox, 0, 0.9), Detection::new(bbox, 1, 0.6)];
/// fold_attributes(&mut dets, Some(&map));
///
/// assert_eq!(dets.len(), 1);
/// assert_eq!(dets[0].attrs, Some(vec![0.6]));
/// ```
pub fn fold_attributes(detections: &mut Vec<Detection>, map: Option<&AttributeMap>) {
    let Some(map) = map else {
        return;
    };
    let num_attrs = map.attributes().len();
    let mut folded = 0usize;
    let mut dropped = 0usize;

    for i in 0..detections.len() {
        let Some(assoc) = map.association(detections[i].class_id) else {
            continue;
        };
        if detections[i].is_tombstoned() {
            continue;
        }

        let attr_box = detections[i].bbox;
        let best = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.class_id == assoc.base_class && !d.is_tombstoned())
            .map(|(j, d)| (j, d.bbox.iou(&attr_box)))
            .fold(None, |best: Option<(usize, f32)>, (j, iou)| match best {
                // Ties keep the earliest base detection.
                Some((_, best_iou)) if iou > best_iou => Some((j, iou)),
                None => Some((j, iou)),
                _ => best,
            });

        let confidence = detections[i].confidence;
        match best {
            Some((j, iou)) if iou > ATTRIBUTE_FOLD_IOU => {
                detections[j].raise_attr(assoc.attr_index, num_attrs, confidence);
                folded += 1;
            }
            _ => dropped += 1,
        }
        detections[i].tombstone();
    }

    retain_live(detections);
    debug!(folded, dropped, "folded attribute detections");
}
