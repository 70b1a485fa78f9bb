//! Handlers for trailing bytes that class attributes do not describe.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::TypeReader;
use crate::rtti::{canonicalize, TypeFactory, TypedObject};
use crate::util::{ByteCursor, Result};

/// Decodes a class's extra binary data into the object being built.
///
/// Called after all typed attributes were read. The cursor is positioned at
/// the first trailing byte; the handler must consume exactly the bytes that
/// belong to the object or the framing check fails.
pub trait ExtraBinaryDataCallback: Send + Sync {
    fn read(
        &self,
        reader: &TypeReader,
        object: &mut TypedObject,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<()>;
}

impl<F> ExtraBinaryDataCallback for F
where
    F: Fn(&TypeReader, &mut TypedObject, &mut ByteCursor<'_>) -> Result<()> + Send + Sync,
{
    fn read(
        &self,
        reader: &TypeReader,
        object: &mut TypedObject,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<()> {
        self(reader, object, cursor)
    }
}

/// Extra binary data handlers keyed by class name, populated at startup.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Arc<dyn ExtraBinaryDataCallback>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.callbacks.keys().collect();
        keys.sort();
        f.debug_struct("CallbackRegistry").field("classes", &keys).finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for a class.
    pub fn register(
        &mut self,
        class: &str,
        callback: impl ExtraBinaryDataCallback + 'static,
    ) -> &mut Self {
        self.callbacks.insert(canonicalize(class), Arc::new(callback));
        self
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Handler registered for exactly this class.
    pub fn get(&self, class: &str) -> Option<&Arc<dyn ExtraBinaryDataCallback>> {
        self.callbacks.get(class)
    }

    /// Handler of `class` or, failing that, of its nearest base
    /// (breadth-first over the declared bases).
    pub fn find(
        &self,
        factory: &TypeFactory,
        class: &str,
    ) -> Option<&Arc<dyn ExtraBinaryDataCallback>> {
        let mut queue = std::collections::VecDeque::from([class.to_string()]);
        let mut seen = std::collections::HashSet::new();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(cb) = self.callbacks.get(&name) {
                return Some(cb);
            }
            if let Ok(info) = factory.class(&name) {
                queue.extend(info.bases.iter().map(|b| b.name.clone()));
            }
        }
        None
    }
}
