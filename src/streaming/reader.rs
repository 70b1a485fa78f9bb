//! Group and object reads over the archives named by a graph.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{
    DeviceResolver, GroupEntry, Ref, StreamingConfig, StreamingDataSource, StreamingGraph,
    SubgroupPolicy, TypeScan,
};
use crate::archive::ChunkedArchive;
use crate::reader::{TypeReader, OBJECT_HEADER_SIZE};
use crate::rtti::{TypeId, TypedObject};
use crate::util::{ByteCursor, Error, Result};

/// A decoded group and, if requested, its dependency groups.
#[derive(Debug, Clone)]
pub struct Group {
    group_id: u32,
    objects: Vec<TypedObject>,
    dependencies: Vec<Group>,
}

impl Group {
    #[inline]
    pub fn id(&self) -> u32 {
        self.group_id
    }

    #[inline]
    pub fn objects(&self) -> &[TypedObject] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> Result<&TypedObject> {
        self.objects.get(index).ok_or(Error::ObjectOutOfBounds {
            group: self.group_id,
            index,
            count: self.objects.len(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Dependency groups in visit order (flat, each group once).
    #[inline]
    pub fn dependencies(&self) -> &[Group] {
        &self.dependencies
    }

    pub fn dependency(&self, group_id: u32) -> Option<&Group> {
        self.dependencies.iter().find(|g| g.group_id == group_id)
    }

    pub fn into_objects(self) -> Vec<TypedObject> {
        self.objects
    }
}

/// Reads typed objects and raw payloads addressed through a [`StreamingGraph`].
///
/// Archives are opened on first use. Every archive file has its own lock,
/// held only while compressed bytes are fetched and inflated; decoding runs
/// outside of it. Nothing decoded is cached, so each call returns fresh
/// objects.
pub struct StreamingObjectReader {
    graph: Arc<StreamingGraph>,
    types: TypeReader,
    config: StreamingConfig,
    devices: DeviceResolver,
    archives: Vec<Mutex<Option<ChunkedArchive>>>,
}

impl StreamingObjectReader {
    pub fn new(graph: Arc<StreamingGraph>, types: TypeReader, config: StreamingConfig) -> Self {
        let archives = graph.files().iter().map(|_| Mutex::new(None)).collect();
        let devices = DeviceResolver::new(config.mounts.clone());
        Self { graph, types, config, devices, archives }
    }

    #[inline]
    pub fn graph(&self) -> &StreamingGraph {
        &self.graph
    }

    #[inline]
    pub fn type_reader(&self) -> &TypeReader {
        &self.types
    }

    #[inline]
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Filesystem path for a device-prefixed name.
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        self.devices.resolve_path(name)
    }

    /// Use an already open archive for a file slot instead of opening its path.
    pub fn insert_archive(&self, file_index: usize, archive: ChunkedArchive) -> Result<()> {
        let slot = self.slot(file_index)?;
        *slot.lock() = Some(archive);
        Ok(())
    }

    fn slot(&self, file_index: usize) -> Result<&Mutex<Option<ChunkedArchive>>> {
        self.archives
            .get(file_index)
            .ok_or(Error::FileOutOfBounds { index: file_index, count: self.archives.len() })
    }

    /// Read `len` logical bytes from a file's archive, opening it if needed.
    fn read_bytes(&self, file_index: usize, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut slot = self.slot(file_index)?.lock();
        if slot.is_none() {
            let path = self.resolve_path(self.graph.file(file_index)?)?;
            // a failed open leaves the slot empty for the next call
            *slot = Some(ChunkedArchive::open_opts(&path, self.config.archive_options())?);
        }
        match slot.as_ref() {
            Some(archive) => archive.read(offset, len),
            None => Err(Error::corrupt("archive slot empty after open")),
        }
    }

    fn decode_group(&self, entry: &GroupEntry) -> Result<Vec<TypedObject>> {
        let len = usize::try_from(entry.length)
            .map_err(|_| Error::invalid(format!("group {} is too large", entry.group_id)))?;
        let bytes = self.read_bytes(entry.file_index as usize, entry.offset, len)?;

        debug!(group = entry.group_id, bytes = len, objects = entry.object_count, "read group");

        let mut cursor = ByteCursor::new(&bytes);
        // every object needs at least a frame header
        let capacity = (entry.object_count as usize).min(bytes.len() / OBJECT_HEADER_SIZE);
        let mut objects = Vec::with_capacity(capacity);
        for _ in 0..entry.object_count {
            objects.push(self.types.read_object(&mut cursor, entry.group_id)?);
        }
        if !cursor.is_at_end() {
            return Err(Error::invalid(format!(
                "group {} has {} bytes after its last object",
                entry.group_id,
                cursor.remaining()
            )));
        }
        Ok(objects)
    }

    /// Decode every object of a group.
    ///
    /// With `read_subgroups`, dependency groups are decoded as well, following
    /// the configured [`SubgroupPolicy`].
    pub fn read_group(&self, group_id: u32, read_subgroups: bool) -> Result<Group> {
        let entry = self.graph.group(group_id)?;
        let objects = self.decode_group(entry)?;
        let dependencies = if read_subgroups {
            self.read_dependencies(entry)?
        } else {
            Vec::new()
        };
        Ok(Group { group_id, objects, dependencies })
    }

    fn read_dependencies(&self, root: &GroupEntry) -> Result<Vec<Group>> {
        let mut seen = HashSet::from([root.group_id]);
        let mut queue: VecDeque<u32> = root.subgroups.iter().copied().collect();
        let mut out = Vec::new();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let entry = self.graph.group(id)?;
            out.push(Group { group_id: id, objects: self.decode_group(entry)?, dependencies: Vec::new() });
            if self.config.subgroups == SubgroupPolicy::Transitive {
                queue.extend(entry.subgroups.iter().copied());
            }
        }
        Ok(out)
    }

    /// Decode one object of a group.
    pub fn read_object(&self, group_id: u32, object_index: usize) -> Result<TypedObject> {
        let entry = self.graph.group(group_id)?;
        let count = entry.object_count as usize;
        if object_index >= count {
            return Err(Error::ObjectOutOfBounds { group: group_id, index: object_index, count });
        }
        let mut objects = self.decode_group(entry)?;
        Ok(objects.swap_remove(object_index))
    }

    /// Fresh read of a reference's target, checked against the pointer type.
    pub fn resolve_ref(&self, reference: &Ref) -> Result<TypedObject> {
        let target = reference
            .target
            .ok_or_else(|| Error::invalid(format!("{} is null", reference.pointer_type)))?;
        let object = self.read_object(target.group_id, target.object_index as usize)?;
        let factory = self.types.factory();
        if !factory.is_subclass_of(object.type_name(), &reference.target_type) {
            return Err(Error::RefTypeMismatch {
                expected: reference.target_type.clone(),
                actual: object.type_name().to_string(),
            });
        }
        Ok(object)
    }

    /// Raw payload bytes of a data source.
    pub fn resolve_data_source(&self, source: &StreamingDataSource) -> Result<Vec<u8>> {
        if !source.is_present() {
            return Err(Error::DataSourceAbsent);
        }
        self.read_bytes(source.file_index(), source.offset(), source.length as usize)
    }

    /// Lazily walk every object of `class` (or a subclass) in the graph.
    pub fn scan_type(&self, class: &str) -> Result<TypeScan<'_>> {
        let targets: HashSet<TypeId> = self.types.factory().subclasses_of(class)?.into_iter().collect();
        let groups = self.graph.groups_for_types(&targets).map(|g| g.group_id).collect();
        Ok(TypeScan::new(self, targets, groups))
    }
}

impl std::fmt::Debug for StreamingObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingObjectReader")
            .field("files", &self.graph.files().len())
            .field("groups", &self.graph.len())
            .field("config", &self.config)
            .finish()
    }
}
