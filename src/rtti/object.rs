//! Instances of class types.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{ClassLayout, SerialAttr, TypeId, Value};
use crate::util::{Error, Result};

/// An instance of a class type.
///
/// Values live in slots of the class's [`ClassLayout`] and are addressed by
/// attribute descriptor. Bytes decoded by an extra-binary-data callback go
/// into a separate keyed map.
#[derive(Clone, Debug)]
pub struct TypedObject {
    layout: Arc<ClassLayout>,
    values: Vec<Option<Value>>,
    extra: BTreeMap<String, Value>,
}

impl TypedObject {
    /// Create an instance with every slot unset.
    pub fn new(layout: Arc<ClassLayout>) -> Self {
        let values = vec![None; layout.len()];
        Self { layout, values, extra: BTreeMap::new() }
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.layout.name()
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.layout.type_id()
    }

    #[inline]
    pub fn layout(&self) -> &Arc<ClassLayout> {
        &self.layout
    }

    /// Does `attr` describe a slot of this object's layout?
    fn owns(&self, attr: &SerialAttr) -> bool {
        self.layout
            .attrs()
            .get(attr.slot)
            .is_some_and(|a| a.info.name == attr.info.name && a.owner == attr.owner)
    }

    /// Value of an attribute, `None` if unset or not part of this layout.
    pub fn get(&self, attr: &SerialAttr) -> Option<&Value> {
        if !self.owns(attr) {
            return None;
        }
        self.values[attr.slot].as_ref()
    }

    /// Store a value under an attribute descriptor of this layout.
    pub fn set(&mut self, attr: &SerialAttr, value: Value) -> Result<()> {
        if !self.owns(attr) {
            return Err(Error::invalid(format!(
                "attribute {}::{} does not belong to {}",
                attr.owner,
                attr.name(),
                self.type_name()
            )));
        }
        self.values[attr.slot] = Some(value);
        Ok(())
    }

    pub(crate) fn set_slot(&mut self, slot: usize, value: Value) {
        self.values[slot] = Some(value);
    }

    /// Value by attribute name (resolved through the layout).
    pub fn field(&self, name: &str) -> Option<&Value> {
        let attr = self.layout.attr(name)?;
        self.values[attr.slot].as_ref()
    }

    /// Attributes with their values, in wire order.
    pub fn fields(&self) -> impl Iterator<Item = (&SerialAttr, Option<&Value>)> {
        self.layout.attrs().iter().zip(self.values.iter().map(|v| v.as_ref()))
    }

    /// True once every slot has a value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    pub fn extras(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extra.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for TypedObject {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id() && self.values == other.values && self.extra == other.extra
    }
}

impl fmt::Display for TypedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name())?;
        for (i, (attr, value)) in self.fields().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match value {
                Some(v) => write!(f, " {}: {:?}", attr.name(), v)?,
                None => write!(f, " {}: <unset>", attr.name())?,
            }
        }
        write!(f, " }}")
    }
}
