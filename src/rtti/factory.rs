//! Type registry: name/id resolution, instantiation and wire layouts.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::sort::{filter_serializable_attrs, sort_serializable_attrs};
use super::{
    canonicalize, split_template, AtomInfo, ClassInfo, ClassLayout, ContainerInfo, ContainerKind,
    PointerInfo, SerialAttr, TypeId, TypeInfo, TypedObject, MSG_READ_BINARY, POINTER_TEMPLATES,
};
use crate::util::hash::hash_type_name;
use crate::util::{Error, Result};

/// Atoms every schema can use without declaring them: `(name, base)`.
pub const BUILTIN_ATOMS: &[(&str, &str)] = &[
    ("bool", "bool"),
    ("int8", "int8"),
    ("uint8", "uint8"),
    ("int16", "int16"),
    ("uint16", "uint16"),
    ("int32", "int32"),
    ("uint32", "uint32"),
    ("int", "int32"),
    ("uint", "uint32"),
    ("int64", "int64"),
    ("uint64", "uint64"),
    ("float", "float"),
    ("double", "double"),
    ("HalfFloat", "HalfFloat"),
    ("String", "String"),
    ("WString", "WString"),
    ("GGUUID", "GGUUID"),
    ("StreamingDataSource", "StreamingDataSource"),
];

/// Guards against inheritance cycles in malformed schemas.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Compute the wire id of a type from its canonical name.
#[inline]
pub fn compute_type_id(info: &TypeInfo) -> TypeId {
    TypeId::of(info.name())
}

/// Immutable registry of every type in a schema.
///
/// Built once through [`TypeFactoryBuilder`]; all lookups afterwards are
/// read-only, so a factory can be shared across threads behind an `Arc`.
#[derive(Debug)]
pub struct TypeFactory {
    types: Vec<TypeInfo>,
    ids: Vec<TypeId>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<TypeId, usize>,
    layouts: HashMap<usize, Arc<ClassLayout>>,
}

impl TypeFactory {
    pub fn builder() -> TypeFactoryBuilder {
        TypeFactoryBuilder::new()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        if let Some(&index) = self.by_name.get(name) {
            return Ok(index);
        }
        let canonical = canonicalize(name);
        self.by_name
            .get(&canonical)
            .copied()
            .ok_or(Error::UnknownTypeName(canonical))
    }

    fn index_of_id(&self, id: TypeId) -> Result<usize> {
        self.by_id.get(&id).copied().ok_or(Error::UnknownTypeId(id.raw()))
    }

    /// Type by name (canonicalized).
    pub fn get(&self, name: &str) -> Result<&TypeInfo> {
        Ok(&self.types[self.index_of(name)?])
    }

    /// Type by wire id.
    pub fn get_by_id(&self, id: TypeId) -> Result<&TypeInfo> {
        Ok(&self.types[self.index_of_id(id)?])
    }

    /// Wire id of a registered type.
    pub fn type_id(&self, name: &str) -> Result<TypeId> {
        Ok(self.ids[self.index_of(name)?])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_ok()
    }

    /// Class descriptor by name; fails for other variants.
    pub fn class(&self, name: &str) -> Result<&ClassInfo> {
        let info = self.get(name)?;
        info.as_class().ok_or_else(|| Error::UnexpectedTypeKind {
            name: info.name().to_string(),
            expected: "class",
        })
    }

    /// Precomputed wire layout of a class.
    pub fn layout(&self, name: &str) -> Result<&Arc<ClassLayout>> {
        let index = self.index_of(name)?;
        self.layout_at(index)
    }

    pub fn layout_by_id(&self, id: TypeId) -> Result<&Arc<ClassLayout>> {
        let index = self.index_of_id(id)?;
        self.layout_at(index)
    }

    fn layout_at(&self, index: usize) -> Result<&Arc<ClassLayout>> {
        self.layouts.get(&index).ok_or_else(|| Error::UnexpectedTypeKind {
            name: self.types[index].name().to_string(),
            expected: "class",
        })
    }

    /// Create an empty instance of a class.
    pub fn instantiate(&self, name: &str) -> Result<TypedObject> {
        Ok(TypedObject::new(Arc::clone(self.layout(name)?)))
    }

    /// Whether `class` is `base` or derives from it. Unknown names are never related.
    pub fn is_subclass_of(&self, class: &str, base: &str) -> bool {
        let (Ok(class), Ok(base)) = (self.index_of(class), self.index_of(base)) else {
            return false;
        };
        self.derives(class, base)
    }

    fn derives(&self, class: usize, base: usize) -> bool {
        if class == base {
            return true;
        }
        let Some(info) = self.types[class].as_class() else {
            return false;
        };
        info.bases
            .iter()
            .filter_map(|b| self.by_name.get(&b.name))
            .any(|&b| self.derives(b, base))
    }

    /// Ids of `base` and every class deriving from it.
    pub fn subclasses_of(&self, base: &str) -> Result<Vec<TypeId>> {
        let base = self.index_of(base)?;
        if !self.types[base].is_class() {
            return Err(Error::UnexpectedTypeKind {
                name: self.types[base].name().to_string(),
                expected: "class",
            });
        }
        Ok(self
            .layouts
            .keys()
            .filter(|&&index| self.derives(index, base))
            .map(|&index| self.ids[index])
            .collect())
    }

    /// All types with their ids, in registration order.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.ids.iter().copied().zip(self.types.iter())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects type descriptors and validates them into a [`TypeFactory`].
#[derive(Debug, Default)]
pub struct TypeFactoryBuilder {
    types: Vec<TypeInfo>,
}

impl TypeFactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register [`BUILTIN_ATOMS`].
    pub fn with_builtin_atoms(mut self) -> Self {
        for (name, base) in BUILTIN_ATOMS {
            self.types.push(AtomInfo::new(*name, *base).into());
        }
        self
    }

    pub fn add(mut self, info: impl Into<TypeInfo>) -> Self {
        self.types.push(info.into());
        self
    }

    pub fn register(&mut self, info: impl Into<TypeInfo>) -> &mut Self {
        self.types.push(info.into());
        self
    }

    /// Validate the schema and precompute ids and class layouts.
    ///
    /// A later registration under an existing name replaces the earlier one.
    /// Template types (`Array<T>`, `Ref<T>`, ...) referenced by attributes are
    /// created on demand. Every reference must resolve.
    pub fn build(self) -> Result<TypeFactory> {
        let mut types: Vec<TypeInfo> = Vec::with_capacity(self.types.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for mut info in self.types {
            canonicalize_type(&mut info);
            match by_name.get(info.name()) {
                Some(&index) => types[index] = info,
                None => {
                    by_name.insert(info.name().to_string(), types.len());
                    types.push(info);
                }
            }
        }

        // Resolve references; template instances are appended and visited too.
        let mut index = 0;
        while index < types.len() {
            for name in referenced_names(&types[index]) {
                ensure_type(&name, &mut types, &mut by_name)?;
            }
            index += 1;
        }

        validate(&types, &by_name)?;

        let mut ids = Vec::with_capacity(types.len());
        let mut by_id: HashMap<TypeId, usize> = HashMap::with_capacity(types.len());
        for (index, info) in types.iter().enumerate() {
            let id = TypeId(hash_type_name(info.name()));
            if let Some(&other) = by_id.get(&id) {
                return Err(Error::TypeIdCollision {
                    first: types[other].name().to_string(),
                    second: info.name().to_string(),
                    id: id.raw(),
                });
            }
            by_id.insert(id, index);
            ids.push(id);
        }

        let mut layouts = HashMap::new();
        for (index, info) in types.iter().enumerate() {
            let Some(class) = info.as_class() else { continue };
            let mut attrs = Vec::new();
            collect_attrs(&types, &by_name, class, 0, 0, &mut attrs)?;
            let mut attrs = filter_serializable_attrs(attrs);
            sort_serializable_attrs(&mut attrs);
            let extra = declares_in_hierarchy(&types, &by_name, class, MSG_READ_BINARY);
            layouts.insert(
                index,
                Arc::new(ClassLayout::new(class.name.clone(), ids[index], attrs, extra)),
            );
        }

        debug!(types = types.len(), classes = layouts.len(), "type factory built");

        Ok(TypeFactory { types, ids, by_name, by_id, layouts })
    }
}

fn canonicalize_type(info: &mut TypeInfo) {
    match info {
        TypeInfo::Class(class) => {
            for base in &mut class.bases {
                base.name = canonicalize(&base.name);
            }
            for attr in &mut class.attrs {
                attr.type_name = canonicalize(&attr.type_name);
            }
        }
        TypeInfo::Container(c) => {
            c.item = canonicalize(&c.item);
            c.name = format!("{}<{}>", c.template, c.item);
            return;
        }
        TypeInfo::Pointer(p) => {
            p.target = canonicalize(&p.target);
            p.name = format!("{}<{}>", p.template, p.target);
            return;
        }
        TypeInfo::Atom(_) | TypeInfo::Enum(_) => {}
    }
    let name = canonicalize(info.name());
    *info.name_mut() = name;
}

fn referenced_names(info: &TypeInfo) -> Vec<String> {
    match info {
        TypeInfo::Class(class) => class
            .bases
            .iter()
            .map(|b| b.name.clone())
            .chain(class.attrs.iter().map(|a| a.type_name.clone()))
            .collect(),
        TypeInfo::Container(c) => vec![c.item.clone()],
        TypeInfo::Pointer(p) => vec![p.target.clone()],
        TypeInfo::Atom(_) | TypeInfo::Enum(_) => Vec::new(),
    }
}

/// Make sure `name` is registered, instantiating known templates.
fn ensure_type(
    name: &str,
    types: &mut Vec<TypeInfo>,
    by_name: &mut HashMap<String, usize>,
) -> Result<()> {
    if by_name.contains_key(name) {
        return Ok(());
    }
    let (template, arg) =
        split_template(name).ok_or_else(|| Error::UnknownTypeName(name.to_string()))?;

    let info: TypeInfo = if let Some(kind) = ContainerKind::from_template(template) {
        ContainerInfo::new(template, arg, kind).into()
    } else if POINTER_TEMPLATES.contains(&template) {
        PointerInfo::new(template, arg).into()
    } else {
        return Err(Error::UnknownTypeName(name.to_string()));
    };

    by_name.insert(info.name().to_string(), types.len());
    types.push(info);
    Ok(())
}

fn validate(types: &[TypeInfo], by_name: &HashMap<String, usize>) -> Result<()> {
    let class_named = |name: &str| -> Result<()> {
        let info = &types[by_name[name]];
        if info.is_class() {
            Ok(())
        } else {
            Err(Error::UnexpectedTypeKind { name: name.to_string(), expected: "class" })
        }
    };

    for info in types {
        match info {
            TypeInfo::Enum(e) if !matches!(e.size, 1 | 2 | 4) => {
                return Err(Error::schema(format!(
                    "enum {} has unsupported size {}",
                    e.name, e.size
                )));
            }
            TypeInfo::Class(class) => {
                for base in &class.bases {
                    class_named(&base.name)?;
                }
            }
            TypeInfo::Pointer(p) => class_named(&p.target)?,
            _ => {}
        }
    }
    Ok(())
}

/// Append the attributes of `class` and its bases (depth-first, bases first),
/// with offsets shifted into the most-derived layout.
fn collect_attrs(
    types: &[TypeInfo],
    by_name: &HashMap<String, usize>,
    class: &ClassInfo,
    base_offset: u32,
    depth: usize,
    out: &mut Vec<SerialAttr>,
) -> Result<()> {
    if depth > MAX_INHERITANCE_DEPTH {
        return Err(Error::schema(format!("inheritance cycle through {}", class.name)));
    }
    for base in &class.bases {
        let base_class = types[by_name[&base.name]]
            .as_class()
            .ok_or_else(|| Error::UnexpectedTypeKind { name: base.name.clone(), expected: "class" })?;
        let offset = base_offset.checked_add(base.offset).ok_or_else(|| {
            Error::schema(format!("base offset overflow in {}", class.name))
        })?;
        collect_attrs(types, by_name, base_class, offset, depth + 1, out)?;
    }
    for attr in &class.attrs {
        let mut info = attr.clone();
        info.offset = base_offset.checked_add(attr.offset).ok_or_else(|| {
            Error::schema(format!("attribute offset overflow in {}::{}", class.name, attr.name))
        })?;
        out.push(SerialAttr {
            type_id: TypeId(hash_type_name(&info.type_name)),
            info,
            owner: class.name.clone(),
            slot: 0,
        });
    }
    Ok(())
}

fn declares_in_hierarchy(
    types: &[TypeInfo],
    by_name: &HashMap<String, usize>,
    class: &ClassInfo,
    msg: &str,
) -> bool {
    class.declares_message(msg)
        || class.bases.iter().any(|base| {
            types[by_name[&base.name]]
                .as_class()
                .is_some_and(|b| declares_in_hierarchy(types, by_name, b, msg))
        })
}
