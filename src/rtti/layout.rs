//! Precomputed per-class serialization tables.

use std::collections::HashMap;

use super::{ClassAttrInfo, TypeId};

/// One attribute of a class's wire schema.
///
/// Offsets are absolute within the most-derived class (base offsets applied),
/// and `slot` is the index of the value inside a [`TypedObject`](super::TypedObject).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerialAttr {
    pub info: ClassAttrInfo,
    /// Class that declared the attribute.
    pub owner: String,
    pub type_id: TypeId,
    pub slot: usize,
}

impl SerialAttr {
    #[inline]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.info.offset
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.info.type_name
    }
}

/// Wire schema of a class: attributes in decode order.
#[derive(Debug)]
pub struct ClassLayout {
    name: String,
    type_id: TypeId,
    attrs: Vec<SerialAttr>,
    by_name: HashMap<String, usize>,
    extra_binary_data: bool,
}

impl ClassLayout {
    pub(crate) fn new(
        name: String,
        type_id: TypeId,
        mut attrs: Vec<SerialAttr>,
        extra_binary_data: bool,
    ) -> Self {
        let mut by_name = HashMap::with_capacity(attrs.len());
        for (slot, attr) in attrs.iter_mut().enumerate() {
            attr.slot = slot;
            // derived attributes shadow same-named base attributes
            by_name.insert(attr.info.name.clone(), slot);
        }
        Self { name, type_id, attrs, by_name, extra_binary_data }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Attributes in wire order.
    #[inline]
    pub fn attrs(&self) -> &[SerialAttr] {
        &self.attrs
    }

    /// Attribute descriptor by name.
    pub fn attr(&self, name: &str) -> Option<&SerialAttr> {
        self.by_name.get(name).map(|&slot| &self.attrs[slot])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Whether the class or one of its bases handles trailing binary data.
    #[inline]
    pub fn has_extra_binary_data(&self) -> bool {
        self.extra_binary_data
    }
}
