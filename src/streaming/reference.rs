//! Deferred object references.

use std::fmt;

use super::StreamingObjectReader;
use crate::rtti::TypedObject;
use crate::util::Result;

/// Address of an object in the streaming graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectLocator {
    pub group_id: u32,
    pub object_index: u32,
}

/// Unresolved pointer read from a `Ref<T>` (or sibling template) attribute.
///
/// Holds only the target's address. [`Ref::resolve`] reads the target anew on
/// every call, so no object graph or cache is kept alive by a reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ref {
    /// Full pointer type name, e.g. `Ref<Texture>`.
    pub pointer_type: String,
    /// Class the target must be an instance of.
    pub target_type: String,
    /// `None` for a null pointer.
    pub target: Option<ObjectLocator>,
}

impl Ref {
    pub fn null(pointer_type: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self { pointer_type: pointer_type.into(), target_type: target_type.into(), target: None }
    }

    pub fn to(
        pointer_type: impl Into<String>,
        target_type: impl Into<String>,
        group_id: u32,
        object_index: u32,
    ) -> Self {
        Self {
            pointer_type: pointer_type.into(),
            target_type: target_type.into(),
            target: Some(ObjectLocator { group_id, object_index }),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    /// Read the referenced object. Null references resolve to `None`.
    pub fn resolve(&self, reader: &StreamingObjectReader) -> Result<Option<TypedObject>> {
        if self.is_null() {
            return Ok(None);
        }
        reader.resolve_ref(self).map(Some)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            None => write!(f, "{}(null)", self.pointer_type),
            Some(t) => write!(f, "{}({}:{})", self.pointer_type, t.group_id, t.object_index),
        }
    }
}
