//! Schema-driven recursive decoder.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use super::{AtomRegistry, CallbackRegistry};
use crate::rtti::{
    ClassLayout, ContainerInfo, EnumFlags, EnumInfo, EnumValue, PointerInfo, TypeFactory, TypeId,
    TypeInfo, TypedObject, Value,
};
use crate::streaming::{ObjectLocator, Ref};
use crate::util::{ByteCursor, Error, Result};

/// Size of the `[typeHash:u64][byteSize:u32]` object frame header.
pub const OBJECT_HEADER_SIZE: usize = 12;

/// Deepest class/container nesting a single object may use.
pub const MAX_NESTING_DEPTH: u32 = 256;

const PTR_NULL: u8 = 0;
const PTR_LOCAL: u8 = 1;
const PTR_EXTERNAL: u8 = 2;

/// Where a value sits while it is decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadContext {
    /// Group being decoded; local pointers resolve into it.
    pub group_id: u32,
    /// True below a class attribute, the only place pointers may appear.
    pub in_attribute: bool,
    /// Class and container levels entered so far.
    pub depth: u32,
}

impl ReadContext {
    pub fn new(group_id: u32) -> Self {
        Self { group_id, in_attribute: false, depth: 0 }
    }

    fn attribute(self) -> Self {
        Self { in_attribute: true, ..self }
    }

    fn nested(self, type_name: &str) -> Result<Self> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::invalid(format!(
                "{} nested deeper than {} levels",
                type_name, MAX_NESTING_DEPTH
            )));
        }
        Ok(Self { depth: self.depth + 1, ..self })
    }
}

/// Decodes bytes into [`TypedObject`]s using a [`TypeFactory`].
///
/// Holds only shared, immutable state and can be cloned freely across
/// threads. Each call works on a caller-owned cursor.
#[derive(Clone, Debug)]
pub struct TypeReader {
    factory: Arc<TypeFactory>,
    atoms: Arc<AtomRegistry>,
    callbacks: Arc<CallbackRegistry>,
}

impl TypeReader {
    pub fn new(
        factory: Arc<TypeFactory>,
        atoms: Arc<AtomRegistry>,
        callbacks: Arc<CallbackRegistry>,
    ) -> Self {
        Self { factory, atoms, callbacks }
    }

    /// Reader with the default atom decoders and no callbacks.
    pub fn with_defaults(factory: Arc<TypeFactory>) -> Self {
        Self::new(
            factory,
            Arc::new(AtomRegistry::with_defaults()),
            Arc::new(CallbackRegistry::new()),
        )
    }

    #[inline]
    pub fn factory(&self) -> &Arc<TypeFactory> {
        &self.factory
    }

    #[inline]
    pub fn atoms(&self) -> &AtomRegistry {
        &self.atoms
    }

    #[inline]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Read one framed object: `[typeHash:u64][byteSize:u32][payload]`.
    ///
    /// The payload must be consumed exactly; short or long decodes fail with
    /// [`Error::SizeMismatch`] and a payload extending past the cursor fails
    /// with [`Error::UnexpectedEof`].
    pub fn read_object(&self, cursor: &mut ByteCursor<'_>, group_id: u32) -> Result<TypedObject> {
        let type_id = TypeId(cursor.read_u64()?);
        let declared = cursor.read_u32()?;
        let layout = self.factory.layout_by_id(type_id)?;
        let mut payload = cursor.sub_cursor(declared as usize)?;

        trace!(type_name = layout.name(), size = declared, "read object");

        let object = self
            .read_compound(layout, &mut payload, ReadContext::new(group_id))
            .map_err(|e| match e {
                Error::UnexpectedEof { pos, needed } => Error::SizeMismatch {
                    type_name: layout.name().to_string(),
                    declared: declared as u64,
                    consumed: pos + needed,
                },
                other => other,
            })?;

        if !payload.is_at_end() {
            return Err(Error::SizeMismatch {
                type_name: layout.name().to_string(),
                declared: declared as u64,
                consumed: payload.position() as u64,
            });
        }
        Ok(object)
    }

    /// Read the attributes (and extra binary data) of a class, unframed.
    pub fn read_compound(
        &self,
        layout: &Arc<ClassLayout>,
        cursor: &mut ByteCursor<'_>,
        ctx: ReadContext,
    ) -> Result<TypedObject> {
        let attr_ctx = ctx.nested(layout.name())?.attribute();
        let mut object = TypedObject::new(Arc::clone(layout));
        for attr in layout.attrs() {
            let value = self.read_value(attr.type_name(), cursor, attr_ctx)?;
            object.set_slot(attr.slot, value);
        }

        if layout.has_extra_binary_data() {
            let callback = self
                .callbacks
                .find(&self.factory, layout.name())
                .ok_or_else(|| Error::MissingCallback(layout.name().to_string()))?;
            callback.read(self, &mut object, cursor)?;
        }
        Ok(object)
    }

    /// Read one value of the named type.
    pub fn read_value(
        &self,
        type_name: &str,
        cursor: &mut ByteCursor<'_>,
        ctx: ReadContext,
    ) -> Result<Value> {
        match self.factory.get(type_name)? {
            TypeInfo::Atom(atom) => self.atoms.decode(atom, cursor),
            TypeInfo::Enum(info) => read_enum(info, cursor),
            TypeInfo::Class(_) => {
                let layout = self.factory.layout(type_name)?;
                let object = self.read_compound(layout, cursor, ctx)?;
                Ok(Value::Object(Box::new(object)))
            }
            TypeInfo::Container(info) => self.read_container(info, cursor, ctx),
            TypeInfo::Pointer(info) => read_pointer(info, cursor, ctx),
        }
    }

    fn read_container(
        &self,
        info: &ContainerInfo,
        cursor: &mut ByteCursor<'_>,
        ctx: ReadContext,
    ) -> Result<Value> {
        let ctx = ctx.nested(&info.name)?;
        let count = cursor.read_u32()? as usize;

        if !info.kind.is_hashed() {
            if let TypeInfo::Atom(atom) = self.factory.get(&info.item)? {
                if let Some(packed) = self.atoms.packed_kind(atom) {
                    return packed.read(cursor, count);
                }
            }
        }

        // count comes from the wire; never reserve more than the bytes left
        let mut items = Vec::with_capacity(count.min(cursor.remaining()));
        for _ in 0..count {
            if info.kind.is_hashed() {
                cursor.read_u32()?;
            }
            items.push(self.read_value(&info.item, cursor, ctx)?);
        }
        Ok(Value::Array(items))
    }
}

fn read_enum(info: &EnumInfo, cursor: &mut ByteCursor<'_>) -> Result<Value> {
    let raw = match info.size {
        1 => cursor.read_u8()? as u32,
        2 => cursor.read_u16()? as u32,
        4 => cursor.read_u32()?,
        other => {
            return Err(Error::schema(format!(
                "enum {} has unsupported size {}",
                info.name, other
            )))
        }
    };

    if !info.flags {
        return Ok(Value::Enum(EnumValue {
            type_name: info.name.clone(),
            raw,
            name: info.name_of(raw).map(str::to_string),
        }));
    }

    let mut names = SmallVec::new();
    let mut known_mask = 0;
    for v in &info.values {
        known_mask |= v.value;
        if v.value != 0 && raw & v.value == v.value {
            names.push(v.name.clone());
        }
    }
    Ok(Value::Flags(EnumFlags { type_name: info.name.clone(), raw, names, known_mask }))
}

fn read_pointer(info: &PointerInfo, cursor: &mut ByteCursor<'_>, ctx: ReadContext) -> Result<Value> {
    if !ctx.in_attribute {
        return Err(Error::BarePointer(info.name.clone()));
    }
    let target = match cursor.read_u8()? {
        PTR_NULL => None,
        PTR_LOCAL => Some(ObjectLocator { group_id: ctx.group_id, object_index: cursor.read_u32()? }),
        PTR_EXTERNAL => {
            let group_id = cursor.read_u32()?;
            let object_index = cursor.read_u32()?;
            Some(ObjectLocator { group_id, object_index })
        }
        kind => {
            return Err(Error::invalid(format!(
                "unknown pointer kind {} for {}",
                kind, info.name
            )))
        }
    };
    Ok(Value::Ref(Ref {
        pointer_type: info.name.clone(),
        target_type: info.target.clone(),
        target,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtti::{ClassAttrInfo, ClassInfo};

    fn factory() -> Arc<TypeFactory> {
        Arc::new(
            TypeFactory::builder()
                .with_builtin_atoms()
                .add(
                    EnumInfo::new("EFlags", 2, true)
                        .value("None", 0)
                        .value("A", 1)
                        .value("B", 2)
                        .value("C", 4),
                )
                .add(
                    ClassInfo::new("Pair")
                        .attr(ClassAttrInfo::new("lo", "uint8", 0))
                        .attr(ClassAttrInfo::new("hi", "uint8", 1)),
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_flags_enum() {
        let reader = TypeReader::with_defaults(factory());
        let data = 0b1_0101u16.to_le_bytes();
        let mut c = ByteCursor::new(&data);
        let v = reader.read_value("EFlags", &mut c, ReadContext::default()).unwrap();
        let flags = v.as_flags().unwrap();
        assert_eq!(flags.raw, 0b1_0101);
        assert_eq!(flags.names.as_slice(), ["A", "C"]);
        assert_eq!(flags.unknown_bits(), 0b1_0000);
    }

    #[test]
    fn test_embedded_class() {
        let reader = TypeReader::with_defaults(factory());
        let data = [7u8, 9];
        let mut c = ByteCursor::new(&data);
        let v = reader.read_value("Pair", &mut c, ReadContext::default()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.field("lo"), Some(&Value::U8(7)));
        assert_eq!(obj.field("hi"), Some(&Value::U8(9)));
    }

    #[test]
    fn test_unknown_type() {
        let reader = TypeReader::with_defaults(factory());
        let mut c = ByteCursor::new(&[]);
        let result = reader.read_value("Nope", &mut c, ReadContext::default());
        assert!(matches!(result, Err(Error::UnknownTypeName(_))));
    }
}
