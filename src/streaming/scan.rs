//! Lazy type-targeted walks over the graph.

use std::collections::HashSet;

use tracing::warn;

use super::StreamingObjectReader;
use crate::rtti::{TypeId, TypedObject};
use crate::util::Result;

/// Forward-only iterator over the objects of a set of types.
///
/// Only groups whose directory entry lists a target type are decoded, one at
/// a time as the consumer pulls. Dropping the iterator stops the walk. A group
/// that fails to decode yields one `Err`; the next pull moves on to the
/// following group. Restarting means creating a new scan.
pub struct TypeScan<'a> {
    reader: &'a StreamingObjectReader,
    targets: HashSet<TypeId>,
    groups: std::vec::IntoIter<u32>,
    pending: std::vec::IntoIter<TypedObject>,
    visited: usize,
}

impl<'a> TypeScan<'a> {
    pub(crate) fn new(
        reader: &'a StreamingObjectReader,
        targets: HashSet<TypeId>,
        groups: Vec<u32>,
    ) -> Self {
        Self {
            reader,
            targets,
            groups: groups.into_iter(),
            pending: Vec::new().into_iter(),
            visited: 0,
        }
    }

    /// Groups decoded (or attempted) so far.
    #[inline]
    pub fn groups_visited(&self) -> usize {
        self.visited
    }

    /// Candidate groups not yet visited.
    #[inline]
    pub fn groups_remaining(&self) -> usize {
        self.groups.len()
    }
}

impl Iterator for TypeScan<'_> {
    type Item = Result<TypedObject>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.pending.next() {
                return Some(Ok(object));
            }
            let group_id = self.groups.next()?;
            self.visited += 1;
            match self.reader.read_group(group_id, false) {
                Ok(group) => {
                    let matches: Vec<_> = group
                        .into_objects()
                        .into_iter()
                        .filter(|o| self.targets.contains(&o.type_id()))
                        .collect();
                    self.pending = matches.into_iter();
                }
                Err(e) => {
                    warn!(group = group_id, error = %e, "scan skipped group");
                    return Some(Err(e));
                }
            }
        }
    }
}
