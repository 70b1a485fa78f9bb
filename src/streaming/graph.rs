//! Directory of groups: where each group lives and what it contains.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::rtti::TypeId;
use crate::util::{Error, Result};

/// Location and contents of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub group_id: u32,
    /// Index into [`StreamingGraph::files`].
    pub file_index: u32,
    /// Logical offset of the group inside the archive.
    pub offset: u64,
    /// Byte length of the group's framed objects.
    pub length: u64,
    pub object_count: u32,
    /// Types of the objects in the group.
    #[serde(default)]
    pub types: Vec<TypeId>,
    /// Groups this group's pointers may reach into.
    #[serde(default)]
    pub subgroups: Vec<u32>,
}

impl GroupEntry {
    pub fn contains_any(&self, targets: &HashSet<TypeId>) -> bool {
        self.types.iter().any(|t| targets.contains(t))
    }
}

/// Serialized form of a [`StreamingGraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Device-prefixed archive paths.
    pub files: Vec<String>,
    pub groups: Vec<GroupEntry>,
}

/// Group directory with an id index. Immutable once built.
#[derive(Debug, Clone)]
pub struct StreamingGraph {
    files: Vec<String>,
    groups: Vec<GroupEntry>,
    index: HashMap<u32, usize>,
}

impl StreamingGraph {
    /// Build and index a directory.
    ///
    /// Fails on duplicate group ids, on groups naming a missing file and on
    /// ranges past `u64::MAX`.
    pub fn new(files: Vec<String>, groups: Vec<GroupEntry>) -> Result<Self> {
        let mut index = HashMap::with_capacity(groups.len());
        for (i, group) in groups.iter().enumerate() {
            if group.file_index as usize >= files.len() {
                return Err(Error::FileOutOfBounds {
                    index: group.file_index as usize,
                    count: files.len(),
                });
            }
            if group.offset.checked_add(group.length).is_none() {
                return Err(Error::invalid(format!(
                    "group {} range {}+{} overflows",
                    group.group_id, group.offset, group.length
                )));
            }
            if index.insert(group.group_id, i).is_some() {
                return Err(Error::invalid(format!("duplicate group id {}", group.group_id)));
            }
        }
        Ok(Self { files, groups, index })
    }

    pub fn from_document(doc: GraphDocument) -> Result<Self> {
        Self::new(doc.files, doc.groups)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        let doc = GraphDocument { files: self.files.clone(), groups: self.groups.clone() };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    #[inline]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Result<&str> {
        self.files
            .get(index)
            .map(String::as_str)
            .ok_or(Error::FileOutOfBounds { index, count: self.files.len() })
    }

    #[inline]
    pub fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    pub fn group(&self, group_id: u32) -> Result<&GroupEntry> {
        self.index
            .get(&group_id)
            .map(|&i| &self.groups[i])
            .ok_or(Error::GroupNotFound(group_id))
    }

    pub fn contains(&self, group_id: u32) -> bool {
        self.index.contains_key(&group_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups that hold at least one object of a target type, in directory order.
    pub fn groups_for_types<'a>(
        &'a self,
        targets: &'a HashSet<TypeId>,
    ) -> impl Iterator<Item = &'a GroupEntry> + 'a {
        self.groups.iter().filter(move |g| g.contains_any(targets))
    }
}
