//! Class-name tables, attribute associations and class remapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DetTypesError, Result};

/// Ordered class names; a class ID is an index into this table.
///
/// # Example
///
/// ```
/// use det_types::ClassTable;
///
/// let classes = ClassTable::new(["person", "face", "person_male"]);
/// assert_eq!(classes.index_of("face"), Some(1));
/// assert_eq!(classes.indices_containing("person_"), vec![2]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassTable {
    names: Vec<String>,
}

impl ClassTable {
    /// Creates a table from class names in index order.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table has no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the class names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Gets the class ID of a name.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    /// Gets the name of a class ID.
    #[must_use]
    pub fn name_of(&self, class_id: u32) -> Option<&str> {
        self.names.get(class_id as usize).map(String::as_str)
    }

    /// Returns `true` if the table contains the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Class IDs whose name contains `marker`, in table order.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn indices_containing(&self, marker: &str) -> Vec<u32> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.contains(marker))
            .map(|(i, _)| i as u32)
            .collect()
    }
}

/// Ordered attribute names of the form `base:attr` (e.g. `person:male`).
///
/// Attribute vectors on detections are indexed by position in this table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeTable {
    names: Vec<String>,
}

impl AttributeTable {
    /// Creates a table from attribute names in index order.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the attribute names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Gets the name of an attribute slot.
    #[must_use]
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }
}

/// Links a detector class to the attribute it encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeAssociation {
    /// Class ID of the object the attribute belongs to.
    pub base_class: u32,
    /// Slot in the attribute vector.
    pub attr_index: usize,
}

/// Validated mapping from attribute classes to their base classes.
///
/// An attribute `person:male` is detected by a class named `person_male`;
/// its confidence is folded into slot `attr_index` of the best-overlapping
/// `person` detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMap {
    attributes: AttributeTable,
    by_class: HashMap<u32, AttributeAssociation>,
}

impl AttributeMap {
    /// Builds the map from the class table and attribute table.
    ///
    /// # Errors
    ///
    /// - [`DetTypesError::MalformedAttribute`] if an attribute has no `:`.
    /// - [`DetTypesError::UnknownClass`] if the base class or the
    ///   `base_attr` class is missing from `classes`.
    /// - [`DetTypesError::AmbiguousAttribute`] if two attributes resolve to
    ///   the same class.
    pub fn new(classes: &ClassTable, attributes: &AttributeTable) -> Result<Self> {
        let mut by_class = HashMap::with_capacity(attributes.len());

        for (attr_index, name) in attributes.names().iter().enumerate() {
            let Some((base, _)) = name.split_once(':') else {
                return Err(DetTypesError::malformed_attribute(name));
            };
            let base_class = classes
                .index_of(base)
                .ok_or_else(|| DetTypesError::unknown_class(base))?;
            let class_name = name.replace(':', "_");
            let class_id = classes
                .index_of(&class_name)
                .ok_or_else(|| DetTypesError::unknown_class(&class_name))?;

            let association = AttributeAssociation {
                base_class,
                attr_index,
            };
            if by_class.insert(class_id, association).is_some() {
                return Err(DetTypesError::ambiguous_attribute(class_name));
            }
        }

        Ok(Self {
            attributes: attributes.clone(),
            by_class,
        })
    }

    /// Returns the attribute association of a class, if it encodes one.
    #[must_use]
    pub fn association(&self, class_id: u32) -> Option<AttributeAssociation> {
        self.by_class.get(&class_id).copied()
    }

    /// Returns `true` if the class encodes an attribute.
    #[must_use]
    pub fn is_attribute_class(&self, class_id: u32) -> bool {
        self.by_class.contains_key(&class_id)
    }

    /// Returns the attribute table this map was built from.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }
}

/// Maps raw detector class indices to output class IDs.
///
/// `None` entries drop the class.
///
/// # Example
///
/// ```
/// use det_types::ClassRemap;
///
/// let remap = ClassRemap::from_signed(&[0, -1, 1]).unwrap();
/// assert_eq!(remap.remap(0), Some(0));
/// assert_eq!(remap.remap(1), None);
/// assert_eq!(remap.remap(2), Some(1));
/// assert_eq!(remap.remap(7), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassRemap {
    table: Vec<Option<u32>>,
}

impl ClassRemap {
    /// Creates a remap table from explicit entries.
    #[must_use]
    pub const fn new(table: Vec<Option<u32>>) -> Self {
        Self { table }
    }

    /// Identity over `num_classes` classes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn identity(num_classes: usize) -> Self {
        Self {
            table: (0..num_classes).map(|i| Some(i as u32)).collect(),
        }
    }

    /// Identity over the observed raw class range (`max + 1`, at least 1),
    /// capped at `limit` classes. Raw classes at or past the cap are dropped.
    #[must_use]
    pub fn identity_for(raw_classes: &[u32], limit: usize) -> Self {
        let observed = raw_classes
            .iter()
            .max()
            .map_or(1, |&max| (max as usize).saturating_add(1));
        Self::identity(observed.min(limit))
    }

    /// Builds a table from signed entries where `-1` drops the class.
    ///
    /// # Errors
    ///
    /// Returns [`DetTypesError::InvalidRemap`] for negative values other
    /// than `-1` or values above `u32::MAX`.
    pub fn from_signed(entries: &[i64]) -> Result<Self> {
        let table = entries
            .iter()
            .enumerate()
            .map(|(index, &value)| match value {
                -1 => Ok(None),
                v => u32::try_from(v)
                    .map(Some)
                    .map_err(|_| DetTypesError::InvalidRemap { index, value }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { table })
    }

    /// Returns the output class for a raw class, or `None` if dropped or
    /// outside the table.
    #[must_use]
    pub fn remap(&self, raw_class: u32) -> Option<u32> {
        self.table.get(raw_class as usize).copied().flatten()
    }

    /// Returns the number of raw classes covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn classes() -> ClassTable {
        ClassTable::new(["person", "face", "person_male", "person_hat", "car"])
    }

    #[test]
    fn class_table_lookup() {
        let table = classes();
        assert_eq!(table.len(), 5);
        assert_eq!(table.index_of("car"), Some(4));
        assert_eq!(table.index_of("bus"), None);
        assert_eq!(table.name_of(1), Some("face"));
        assert_eq!(table.name_of(99), None);
        assert!(table.contains("person_hat"));
    }

    #[test]
    fn class_table_marker() {
        assert_eq!(classes().indices_containing("person_"), vec![2, 3]);
    }

    #[test]
    fn attribute_map_builds() {
        let attrs = AttributeTable::new(["person:male", "person:hat"]);
        let map = AttributeMap::new(&classes(), &attrs).unwrap();

        assert_eq!(
            map.association(2),
            Some(AttributeAssociation {
                base_class: 0,
                attr_index: 0
            })
        );
        assert_eq!(map.association(3).map(|a| a.attr_index), Some(1));
        assert!(!map.is_attribute_class(0));
        assert_eq!(map.attributes().len(), 2);
    }

    #[test]
    fn attribute_map_rejects_missing_class() {
        let attrs = AttributeTable::new(["person:female"]);
        let err = AttributeMap::new(&classes(), &attrs).unwrap_err();
        assert_eq!(err, DetTypesError::unknown_class("person_female"));
    }

    #[test]
    fn attribute_map_rejects_missing_base() {
        let attrs = AttributeTable::new(["dog:hat"]);
        let err = AttributeMap::new(&classes(), &attrs).unwrap_err();
        assert_eq!(err, DetTypesError::unknown_class("dog"));
    }

    #[test]
    fn attribute_map_rejects_malformed() {
        let attrs = AttributeTable::new(["male"]);
        assert!(matches!(
            AttributeMap::new(&classes(), &attrs),
            Err(DetTypesError::MalformedAttribute(_))
        ));
    }

    #[test]
    fn attribute_map_rejects_duplicates() {
        let attrs = AttributeTable::new(["person:male", "person:male"]);
        assert!(matches!(
            AttributeMap::new(&classes(), &attrs),
            Err(DetTypesError::AmbiguousAttribute(_))
        ));
    }

    #[test]
    fn remap_identity_for_observed() {
        let remap = ClassRemap::identity_for(&[0, 3, 1], 80);
        assert_eq!(remap.len(), 4);
        assert_eq!(remap.remap(3), Some(3));
        assert_eq!(remap.remap(4), None);

        assert_eq!(ClassRemap::identity_for(&[], 80).len(), 1);
    }

    #[test]
    fn remap_identity_for_is_capped() {
        let remap = ClassRemap::identity_for(&[0, u32::MAX], 3);
        assert_eq!(remap.len(), 3);
        assert_eq!(remap.remap(2), Some(2));
        assert_eq!(remap.remap(u32::MAX), None);
    }

    #[test]
    fn remap_from_signed_rejects_negative() {
        let err = ClassRemap::from_signed(&[0, -2]).unwrap_err();
        assert_eq!(err, DetTypesError::InvalidRemap { index: 1, value: -2 });
    }

    #[test]
    fn tables_serialize_transparently() {
        let table = ClassTable::new(["a", "b"]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        let remap: ClassRemap = serde_json::from_str("[0,null,1]").unwrap();
        assert_eq!(remap.remap(1), None);
        assert_eq!(remap.remap(2), Some(1));
    }
}
