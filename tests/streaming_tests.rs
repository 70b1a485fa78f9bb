//! End-to-end streaming: graph + chunked archive on disk + schema decoding.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{mesh, texture, Ptr};
use rtti_stream::archive::{ArchiveWriter, ChunkedArchive};
use rtti_stream::rtti::{TypeId, Value};
use rtti_stream::streaming::{
    GroupEntry, StreamingConfig, StreamingDataSource, StreamingGraph, StreamingObjectReader,
    SubgroupPolicy,
};
use rtti_stream::Error;
use tempfile::TempDir;

const CHUNK: usize = 8192;
const PAYLOAD_OFFSET: u64 = 14_000;
const PAYLOAD: &[u8] = b"0123456789";

/// Logical layout (two 8 KB chunks):
///
/// - 100: group 200, one texture
/// - 8100: group 100, texture + two meshes, crosses the chunk boundary
/// - 12000: group 300, two meshes
/// - 14000: raw payload bytes
/// - 16000: group 400, zeros that do not decode
struct Fixture {
    _dir: TempDir,
    root: std::path::PathBuf,
    graph: Arc<StreamingGraph>,
}

fn place(space: &mut [u8], offset: usize, objects: &[Vec<u8>]) -> u64 {
    let bytes = objects.concat();
    space[offset..offset + bytes.len()].copy_from_slice(&bytes);
    bytes.len() as u64
}

fn entry(group_id: u32, offset: u64, length: u64, count: u32, types: &[&str], subgroups: &[u32]) -> GroupEntry {
    GroupEntry {
        group_id,
        file_index: 0,
        offset,
        length,
        object_count: count,
        types: types.iter().map(|t| TypeId::of(t)).collect(),
        subgroups: subgroups.to_vec(),
    }
}

fn fixture() -> Fixture {
    let mut space = vec![0u8; 2 * CHUNK];
    let data_locator = StreamingDataSource::locator_for(0, PAYLOAD_OFFSET);

    let len_200 = place(&mut space, 100, &[texture("cliff", 64, 64, 0, &[5], (0, 0, 0))]);
    let len_100 = place(
        &mut space,
        8100,
        &[
            texture("rock_albedo", 512, 256, 2, &[1, 2, 3], (1, data_locator, PAYLOAD.len() as u32)),
            mesh("rock", 1234, Ptr::Local(0), &[0, 1, 2, 2, 3, 0]),
            mesh("pebble", 3, Ptr::External(200, 0), &[]),
        ],
    );
    assert!(8100 + len_100 > CHUNK as u64, "group 100 must straddle the chunk boundary");
    let len_300 = place(
        &mut space,
        12_000,
        &[mesh("boulder", 8, Ptr::Null, &[]), mesh("odd", 1, Ptr::Local(0), &[])],
    );
    let at = PAYLOAD_OFFSET as usize;
    space[at..at + PAYLOAD.len()].copy_from_slice(PAYLOAD);

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path().to_path_buf();
    std::fs::create_dir_all(root.join("package")).expect("Failed to create package dir");
    let bytes = ArchiveWriter::new(CHUNK).write(&space).expect("Failed to encode archive");
    std::fs::write(root.join("package").join("fixture.core"), bytes).expect("Failed to write archive");

    let graph = StreamingGraph::new(
        vec!["cache:package/fixture.core".to_string()],
        vec![
            entry(200, 100, len_200, 1, &["Texture"], &[300]),
            entry(400, 16_000, 20, 1, &["Texture"], &[]),
            entry(100, 8100, len_100, 3, &["Texture", "Mesh"], &[200]),
            entry(300, 12_000, len_300, 2, &["Mesh"], &[100]),
        ],
    )
    .expect("Failed to build graph");

    Fixture { _dir: dir, root, graph: Arc::new(graph) }
}

fn reader_with(fx: &Fixture, config: StreamingConfig) -> StreamingObjectReader {
    StreamingObjectReader::new(
        Arc::clone(&fx.graph),
        common::reader(),
        config.with_mount("cache", &fx.root),
    )
}

fn reader(fx: &Fixture) -> StreamingObjectReader {
    reader_with(fx, StreamingConfig::default())
}

fn name_of(object: &rtti_stream::rtti::TypedObject) -> &str {
    object.field("name").and_then(Value::as_str).unwrap_or("")
}

#[test]
fn test_read_object_across_chunk_boundary() {
    let fx = fixture();
    let reader = reader(&fx);

    let rock = reader.read_object(100, 1).expect("Failed to read object");
    assert_eq!(rock.type_name(), "Mesh");
    assert_eq!(name_of(&rock), "rock");
    assert_eq!(rock.field("vertex_count"), Some(&Value::U32(1234)));
    assert_eq!(rock.field("indices"), Some(&Value::Ints(vec![0, 1, 2, 2, 3, 0])));
}

#[test]
fn test_read_object_file_mode() {
    let fx = fixture();
    let config = StreamingConfig { use_mmap: false, cache_last_chunk: false, ..Default::default() };
    let reader = reader_with(&fx, config);

    let texture = reader.read_object(100, 0).expect("Failed to read object");
    assert_eq!(name_of(&texture), "rock_albedo");
    assert_eq!(texture.field("mips"), Some(&Value::Bytes(vec![1, 2, 3])));
}

#[test]
fn test_object_index_out_of_bounds() {
    let fx = fixture();
    let err = reader(&fx).read_object(100, 5).unwrap_err();
    assert!(
        matches!(err, Error::ObjectOutOfBounds { group: 100, index: 5, count: 3 }),
        "{:?}",
        err
    );
}

#[test]
fn test_missing_group() {
    let fx = fixture();
    let reader = reader(&fx);
    assert!(matches!(reader.read_object(999, 0), Err(Error::GroupNotFound(999))));
    assert!(matches!(reader.read_group(999, true), Err(Error::GroupNotFound(999))));
}

#[test]
fn test_read_group_without_subgroups() {
    let fx = fixture();
    let group = reader(&fx).read_group(100, false).expect("Failed to read group");
    assert_eq!(group.id(), 100);
    let names: Vec<_> = group.objects().iter().map(name_of).collect();
    assert_eq!(names, ["rock_albedo", "rock", "pebble"]);
    assert!(group.dependencies().is_empty());
    assert!(group.object(3).is_err());
}

#[test]
fn test_subgroups_transitive() {
    let fx = fixture();
    let group = reader(&fx).read_group(100, true).expect("Failed to read group");
    let deps: Vec<_> = group.dependencies().iter().map(|g| g.id()).collect();
    // 300 lists 100 again; the cycle stops there
    assert_eq!(deps, [200, 300]);
    assert_eq!(group.dependency(300).map(|g| g.len()), Some(2));
}

#[test]
fn test_subgroups_direct() {
    let fx = fixture();
    let reader = reader_with(&fx, StreamingConfig::default().with_subgroups(SubgroupPolicy::Direct));
    let group = reader.read_group(100, true).expect("Failed to read group");
    let deps: Vec<_> = group.dependencies().iter().map(|g| g.id()).collect();
    assert_eq!(deps, [200]);
    assert_eq!(name_of(&group.dependencies()[0].objects()[0]), "cliff");
}

#[test]
fn test_undecodable_group_fails() {
    let fx = fixture();
    let err = reader(&fx).read_group(400, false).unwrap_err();
    assert!(matches!(err, Error::UnknownTypeId(0)), "{:?}", err);
}

#[test]
fn test_resolve_refs() {
    let fx = fixture();
    let reader = reader(&fx);

    let rock = reader.read_object(100, 1).expect("Failed to read rock");
    let material = rock.field("material").and_then(Value::as_ref).expect("material ref");
    let texture = material.resolve(&reader).expect("resolve").expect("not null");
    assert_eq!(name_of(&texture), "rock_albedo");

    let pebble = reader.read_object(100, 2).expect("Failed to read pebble");
    let material = pebble.field("material").and_then(Value::as_ref).expect("material ref");
    let texture = reader.resolve_ref(material).expect("resolve external");
    assert_eq!(name_of(&texture), "cliff");

    let boulder = reader.read_object(300, 0).expect("Failed to read boulder");
    let material = boulder.field("material").and_then(Value::as_ref).expect("material ref");
    assert!(material.resolve(&reader).expect("null resolves").is_none());
    assert!(matches!(reader.resolve_ref(material), Err(Error::InvalidData(_))));
}

#[test]
fn test_ref_type_mismatch() {
    let fx = fixture();
    let reader = reader(&fx);
    let odd = reader.read_object(300, 1).expect("Failed to read odd");
    let material = odd.field("material").and_then(Value::as_ref).expect("material ref");
    let err = reader.resolve_ref(material).unwrap_err();
    match err {
        Error::RefTypeMismatch { expected, actual } => {
            assert_eq!(expected, "Texture");
            assert_eq!(actual, "Mesh");
        }
        other => panic!("expected RefTypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_data_sources() {
    let fx = fixture();
    let reader = reader(&fx);

    let texture = reader.read_object(100, 0).expect("Failed to read texture");
    let source = texture.field("data").and_then(Value::as_data_source).expect("data source");
    assert!(source.is_present());
    assert!(source.is_valid());
    assert_eq!(source.file_index(), 0);
    assert_eq!(source.offset(), PAYLOAD_OFFSET);
    assert_eq!(reader.resolve_data_source(source).expect("payload"), PAYLOAD);

    let absent = StreamingDataSource::new(1, 0, 64);
    assert!(!absent.is_present());
    assert!(matches!(reader.resolve_data_source(&absent), Err(Error::DataSourceAbsent)));

    // present but not bound to a channel
    let unbound = StreamingDataSource::new(-1, StreamingDataSource::locator_for(0, 10), 10);
    assert!(unbound.is_present());
    assert!(!unbound.is_valid());

    let cliff = reader.read_object(200, 0).expect("Failed to read cliff");
    let empty = cliff.field("data").and_then(Value::as_data_source).expect("data source");
    assert!(!empty.is_present());
}

#[test]
fn test_scan_by_exact_type() {
    let fx = fixture();
    let reader = reader(&fx);

    let mut scan = reader.scan_type("Texture").expect("Failed to start scan");
    assert_eq!(scan.groups_remaining(), 3);

    let first = scan.next().expect("first item").expect("cliff decodes");
    assert_eq!(name_of(&first), "cliff");
    // group 400 fails, the walk goes on
    assert!(scan.next().expect("second item").is_err());
    let third = scan.next().expect("third item").expect("rock_albedo decodes");
    assert_eq!(name_of(&third), "rock_albedo");
    assert!(scan.next().is_none());
    assert_eq!(scan.groups_visited(), 3);
}

#[test]
fn test_scan_includes_subclasses() {
    let fx = fixture();
    let reader = reader(&fx);

    let (ok, failed): (Vec<_>, Vec<_>) = reader
        .scan_type("Resource")
        .expect("Failed to start scan")
        .partition(|r| r.is_ok());
    let names: Vec<String> = ok
        .into_iter()
        .map(|r| name_of(&r.expect("partitioned ok")).to_string())
        .collect();
    assert_eq!(names, ["cliff", "rock_albedo", "rock", "pebble", "boulder", "odd"]);
    assert_eq!(failed.len(), 1);

    let meshes = reader.scan_type("Mesh").expect("Failed to start scan");
    let meshes: Vec<_> = meshes.filter_map(|r| r.ok()).map(|o| name_of(&o).to_string()).collect();
    assert_eq!(meshes, ["rock", "pebble", "boulder", "odd"]);
}

#[test]
fn test_scan_rejects_non_class() {
    let fx = fixture();
    let reader = reader(&fx);
    assert!(matches!(reader.scan_type("Nope"), Err(Error::UnknownTypeName(_))));
    assert!(matches!(reader.scan_type("EFormat"), Err(Error::UnexpectedTypeKind { .. })));
}

#[test]
fn test_unknown_device_leaves_reader_usable() {
    let fx = fixture();
    // no "cache" mount
    let reader = StreamingObjectReader::new(
        Arc::clone(&fx.graph),
        common::reader(),
        StreamingConfig::default(),
    );
    for _ in 0..2 {
        let err = reader.read_object(100, 0).unwrap_err();
        assert!(matches!(err, Error::UnknownDevice(ref d) if d == "cache"), "{:?}", err);
    }

    // an archive handed in directly takes over the slot
    let path = fx.root.join("package").join("fixture.core");
    reader
        .insert_archive(0, ChunkedArchive::open(&path).expect("Failed to open archive"))
        .expect("slot 0 exists");
    assert_eq!(name_of(&reader.read_object(200, 0).expect("read after insert")), "cliff");
}

#[test]
fn test_missing_archive_file() {
    let fx = fixture();
    let graph = StreamingGraph::new(
        vec!["cache:package/absent.core".to_string()],
        fx.graph.groups().to_vec(),
    )
    .expect("Failed to build graph");
    let reader = StreamingObjectReader::new(
        Arc::new(graph),
        common::reader(),
        StreamingConfig::default().with_mount("cache", &fx.root),
    );
    let err = reader.read_object(100, 0).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(ref p) if p.ends_with(Path::new("package/absent.core"))));
}

#[test]
fn test_oversized_group_entries_fail_the_call() {
    let fx = fixture();
    let cliff = fx.graph.group(200).expect("group 200").clone();
    let graph = StreamingGraph::new(
        fx.graph.files().to_vec(),
        vec![
            entry(7, 0, u64::MAX, 1, &["Texture"], &[]),
            entry(8, 100, 0, u32::MAX, &["Texture"], &[]),
            entry(9, 100, cliff.length, u32::MAX, &["Texture"], &[]),
            cliff,
        ],
    )
    .expect("Failed to build graph");
    let reader = StreamingObjectReader::new(
        Arc::new(graph),
        common::reader(),
        StreamingConfig::default().with_mount("cache", &fx.root),
    );

    let err = reader.read_group(7, false).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof { pos: 0, .. }), "{:?}", err);
    for group in [8, 9] {
        let err = reader.read_group(group, false).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }), "group {}: {:?}", group, err);
    }

    assert_eq!(name_of(&reader.read_object(200, 0).expect("read after failures")), "cliff");
}

#[test]
fn test_concurrent_reads() {
    let fx = fixture();
    let reader = reader(&fx);

    std::thread::scope(|s| {
        let handles: Vec<_> = [(100, 1), (200, 0), (300, 0), (100, 0)]
            .into_iter()
            .map(|(group, index)| {
                let reader = &reader;
                s.spawn(move || reader.read_object(group, index).map(|o| name_of(&o).to_string()))
            })
            .collect();
        let names: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked").expect("read"))
            .collect();
        assert_eq!(names, ["rock", "cliff", "boulder", "rock_albedo"]);
    });
}

#[test]
fn test_graph_json_round_trip() {
    let fx = fixture();
    let json = fx.graph.to_json().expect("Failed to serialize graph");
    let graph = StreamingGraph::from_json_str(&json).expect("Failed to parse graph");
    assert_eq!(graph.files(), fx.graph.files());
    assert_eq!(graph.groups(), fx.graph.groups());

    let reader = StreamingObjectReader::new(
        Arc::new(graph),
        common::reader(),
        StreamingConfig::default().with_mount("cache", &fx.root),
    );
    assert_eq!(name_of(&reader.read_object(300, 0).expect("read")), "boulder");
}
