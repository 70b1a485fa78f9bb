//! Type model: the five schema variants and their descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::hash::hash_type_name;

/// Attribute flag: value only exists in save states, never streamed.
pub const ATTR_FLAG_SAVE_STATE_ONLY: u32 = 1 << 1;

/// Class message announcing trailing bytes after the typed attributes.
pub const MSG_READ_BINARY: &str = "MsgReadBinary";

/// Container templates and the container kind they produce.
pub const CONTAINER_TEMPLATES: &[(&str, ContainerKind)] = &[
    ("Array", ContainerKind::Array),
    ("HashMap", ContainerKind::HashMap),
    ("HashSet", ContainerKind::HashSet),
];

/// Pointer templates. All share one wire encoding.
pub const POINTER_TEMPLATES: &[&str] = &["Ref", "cptr", "StreamingRef", "UUIDRef", "WeakPtr"];

/// Stable 64-bit identifier of a type on the wire.
///
/// Murmur3 of the canonical type name; identical across processes and machines.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u64);

impl TypeId {
    /// Id of a type name, canonicalizing it first.
    pub fn of(name: &str) -> Self {
        Self(hash_type_name(&canonicalize(name)))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({:#018x})", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Canonical spelling of a type name: all whitespace removed.
///
/// `Array< Ref<Foo> >` and `Array<Ref<Foo>>` name the same type.
pub fn canonicalize(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Split `Template<Arg>` into `("Template", "Arg")`.
///
/// Only the outermost angle brackets are split; the argument may itself be
/// parameterized. Returns `None` for plain names or unbalanced brackets.
pub fn split_template(name: &str) -> Option<(&str, &str)> {
    let open = name.find('<')?;
    if !name.ends_with('>') || open == 0 {
        return None;
    }
    let inner = &name[open + 1..name.len() - 1];
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    if depth != 0 || inner.is_empty() {
        return None;
    }
    Some((&name[..open], inner))
}

/// Primitive leaf type, decoded by a registered atom decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomInfo {
    pub name: String,
    /// Runtime representation, selects the decoder (`uint32`, `String`, ...).
    pub base: String,
}

impl AtomInfo {
    pub fn new(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self { name: name.into(), base: base.into() }
    }
}

/// Base class reference with the byte offset of the base inside the derived layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassBaseInfo {
    pub name: String,
    pub offset: u32,
}

/// One declared attribute of a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassAttrInfo {
    pub name: String,
    pub type_name: String,
    /// Declared offset, relative to the declaring class.
    pub offset: u32,
    pub flags: u32,
    /// False for property-only attributes, which have no wire presence.
    pub serializable: bool,
}

impl ClassAttrInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, offset: u32) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            offset,
            flags: 0,
            serializable: true,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn property_only(mut self) -> Self {
        self.serializable = false;
        self
    }

    #[inline]
    pub fn is_save_state_only(&self) -> bool {
        self.flags & ATTR_FLAG_SAVE_STATE_ONLY != 0
    }
}

/// Compound type with bases, attributes and message handlers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub version: u32,
    pub flags: u32,
    pub bases: Vec<ClassBaseInfo>,
    pub attrs: Vec<ClassAttrInfo>,
    pub messages: Vec<String>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn base(mut self, name: impl Into<String>, offset: u32) -> Self {
        self.bases.push(ClassBaseInfo { name: name.into(), offset });
        self
    }

    pub fn attr(mut self, attr: ClassAttrInfo) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.messages.push(msg.into());
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Whether this class itself (not its bases) handles `msg`.
    pub fn declares_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m == msg)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValueInfo {
    pub name: String,
    pub value: u32,
}

/// Enumeration, either single-valued or a flag set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumInfo {
    pub name: String,
    /// Wire width in bytes: 1, 2 or 4.
    pub size: u8,
    pub flags: bool,
    pub values: Vec<EnumValueInfo>,
}

impl EnumInfo {
    pub fn new(name: impl Into<String>, size: u8, flags: bool) -> Self {
        Self { name: name.into(), size, flags, values: Vec::new() }
    }

    pub fn value(mut self, name: impl Into<String>, value: u32) -> Self {
        self.values.push(EnumValueInfo { name: name.into(), value });
        self
    }

    /// Name of the first declared value equal to `raw`.
    pub fn name_of(&self, raw: u32) -> Option<&str> {
        self.values.iter().find(|v| v.value == raw).map(|v| v.name.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    HashMap,
    HashSet,
}

impl ContainerKind {
    /// Hash-keyed containers carry a per-element hash on the wire.
    #[inline]
    pub fn is_hashed(self) -> bool {
        matches!(self, Self::HashMap | Self::HashSet)
    }

    pub fn from_template(template: &str) -> Option<Self> {
        CONTAINER_TEMPLATES
            .iter()
            .find(|(t, _)| *t == template)
            .map(|(_, k)| *k)
    }
}

/// Parameterized collection, e.g. `Array<uint8>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Canonical full name, `Template<Item>`.
    pub name: String,
    pub template: String,
    pub item: String,
    pub kind: ContainerKind,
}

impl ContainerInfo {
    pub fn new(template: &str, item: &str, kind: ContainerKind) -> Self {
        let item = canonicalize(item);
        Self {
            name: format!("{}<{}>", template, item),
            template: template.to_string(),
            item,
            kind,
        }
    }
}

/// Parameterized reference, e.g. `Ref<Texture>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointerInfo {
    pub name: String,
    pub template: String,
    pub target: String,
}

impl PointerInfo {
    pub fn new(template: &str, target: &str) -> Self {
        let target = canonicalize(target);
        Self {
            name: format!("{}<{}>", template, target),
            template: template.to_string(),
            target,
        }
    }
}

/// A schema type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeInfo {
    Atom(AtomInfo),
    Class(ClassInfo),
    Enum(EnumInfo),
    Container(ContainerInfo),
    Pointer(PointerInfo),
}

impl TypeInfo {
    pub fn name(&self) -> &str {
        match self {
            Self::Atom(t) => &t.name,
            Self::Class(t) => &t.name,
            Self::Enum(t) => &t.name,
            Self::Container(t) => &t.name,
            Self::Pointer(t) => &t.name,
        }
    }

    /// Variant name, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Atom(_) => "atom",
            Self::Class(_) => "class",
            Self::Enum(_) => "enum",
            Self::Container(_) => "container",
            Self::Pointer(_) => "pointer",
        }
    }

    pub fn as_class(&self) -> Option<&ClassInfo> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Self::Class(_))
    }

    pub(crate) fn name_mut(&mut self) -> &mut String {
        match self {
            Self::Atom(t) => &mut t.name,
            Self::Class(t) => &mut t.name,
            Self::Enum(t) => &mut t.name,
            Self::Container(t) => &mut t.name,
            Self::Pointer(t) => &mut t.name,
        }
    }
}

impl From<AtomInfo> for TypeInfo {
    fn from(t: AtomInfo) -> Self {
        Self::Atom(t)
    }
}

impl From<ClassInfo> for TypeInfo {
    fn from(t: ClassInfo) -> Self {
        Self::Class(t)
    }
}

impl From<EnumInfo> for TypeInfo {
    fn from(t: EnumInfo) -> Self {
        Self::Enum(t)
    }
}

impl From<ContainerInfo> for TypeInfo {
    fn from(t: ContainerInfo) -> Self {
        Self::Container(t)
    }
}

impl From<PointerInfo> for TypeInfo {
    fn from(t: PointerInfo) -> Self {
        Self::Pointer(t)
    }
}
