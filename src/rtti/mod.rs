//! Type model and type factory.
//!
//! Every streamed value is described by a [`TypeInfo`]:
//!
//! ```text
//! TypeInfo ─┬─ Atom       primitive leaf (int, float, String, ...)
//!           ├─ Class      bases + attributes + messages
//!           ├─ Enum       1/2/4-byte value or flag set
//!           ├─ Container  Array<T>, HashMap<T>, HashSet<T>
//!           └─ Pointer    Ref<T>, cptr<T>, ...
//! ```
//!
//! A [`TypeFactory`] owns the schema, maps names and [`TypeId`]s to types and
//! precomputes the wire order of each class's attributes.

mod info;
mod layout;
mod sort;
mod factory;
mod schema;
mod value;
mod object;

pub use info::*;
pub use layout::*;
pub use sort::{filter_serializable_attrs, seeded_quicksort_by, sort_serializable_attrs};
pub use factory::*;
pub use schema::*;
pub use value::*;
pub use object::*;
