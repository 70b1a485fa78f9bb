//! rtti-stream CLI - Inspect chunked archives and decode streamed objects.

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rtti_stream::archive::{ArchiveWriter, ChunkedArchive, DEFAULT_CHUNK_SIZE};
use rtti_stream::reader::TypeReader;
use rtti_stream::rtti::{TypeFactory, TypeId};
use rtti_stream::streaming::{StreamingConfig, StreamingGraph, StreamingObjectReader};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => with_args(&filtered_args, 2, "info <archive>", |a| cmd_info(a[1])),
        "chunks" | "c" => with_args(&filtered_args, 2, "chunks <archive>", |a| cmd_chunks(a[1])),
        "verify" => with_args(&filtered_args, 2, "verify <archive>", |a| cmd_verify(a[1])),
        "extract" | "x" => with_args(
            &filtered_args,
            5,
            "extract <archive> <offset> <len> <out>",
            |a| cmd_extract(a[1], a[2], a[3], a[4]),
        ),
        "pack" | "p" => with_args(&filtered_args, 3, "pack <input> <output> [chunk-size]", |a| {
            cmd_pack(a[1], a[2], a.get(3).copied())
        }),
        "hash" => with_args(&filtered_args, 2, "hash <name>...", |a| {
            cmd_hash(&a[1..]);
            Ok(())
        }),
        "read" | "r" => with_args(
            &filtered_args,
            4,
            "read <schema.json> <graph.json> <group> [index] [--config file]",
            cmd_read,
        ),
        "scan" | "s" => with_args(
            &filtered_args,
            4,
            "scan <schema.json> <graph.json> <type> [--config file]",
            cmd_scan,
        ),
        "version" | "--version" | "-V" => {
            println!("{}", rtti_stream::version_string());
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Install the fmt subscriber; `RUST_LOG` overrides the flag-selected level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn with_args<'a>(
    args: &[&'a str],
    min: usize,
    usage: &str,
    run: impl FnOnce(&[&'a str]) -> Result<()>,
) -> Result<()> {
    if args.len() < min {
        eprintln!("Usage: rtti-stream {}", usage);
        bail!("missing arguments");
    }
    run(args)
}

fn print_help() {
    println!("{}", rtti_stream::version_string());
    println!();
    println!("USAGE:");
    println!("    rtti-stream [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <archive>                          Show header and sizes");
    println!("    c, chunks  <archive>                          List the chunk table");
    println!("    verify     <archive>                          Decompress and check every chunk");
    println!("    x, extract <archive> <offset> <len> <out>     Write a logical byte range to a file");
    println!("    p, pack    <input> <output> [chunk-size]      Build an archive from a file");
    println!("    hash       <name>...                          Print type ids");
    println!("    r, read    <schema> <graph> <group> [index]   Decode a group or one object");
    println!("    s, scan    <schema> <graph> <type>            Decode every object of a type");
    println!("    version                                       Show version");
    println!("    h, help                                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!("    --config <file>  Streaming config for read/scan (mounts, mmap, subgroups)");
    println!();
    println!("EXAMPLES:");
    println!("    rtti-stream info package.00.core");
    println!("    rtti-stream extract package.00.core 0x4000 256 out.bin");
    println!("    rtti-stream read schema.json graph.json 0x1a2b 3 --config stream.json");
    println!("    rtti-stream scan schema.json graph.json Texture");
    println!();
    println!("NOTES:");
    println!("    - RUST_LOG overrides the verbosity flags");
    println!("    - Numbers accept decimal or 0x-prefixed hex");
}

fn parse_u64(s: &str) -> Result<u64> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("invalid number: {}", s))
}

/// Split `--config <file>` out of positional arguments.
fn split_config<'a>(args: &[&'a str]) -> Result<(Vec<&'a str>, StreamingConfig)> {
    let mut positional = Vec::new();
    let mut config = StreamingConfig::default();
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config needs a file")?;
            config = StreamingConfig::load(path)
                .with_context(|| format!("loading config {}", path))?;
        } else {
            positional.push(arg);
        }
    }
    Ok((positional, config))
}

fn open_reader(schema: &str, graph: &str, config: StreamingConfig) -> Result<StreamingObjectReader> {
    let factory = TypeFactory::from_json_file(schema)
        .with_context(|| format!("loading schema {}", schema))?;
    let graph = StreamingGraph::from_json_file(graph)
        .with_context(|| format!("loading graph {}", graph))?;
    debug!(types = factory.len(), groups = graph.len(), "schema and graph loaded");
    Ok(StreamingObjectReader::new(
        Arc::new(graph),
        TypeReader::with_defaults(Arc::new(factory)),
        config,
    ))
}

fn cmd_info(path: &str) -> Result<()> {
    info!("Opening archive: {}", path);
    let archive = ChunkedArchive::open(path).with_context(|| format!("opening {}", path))?;
    let header = archive.header();

    println!("Archive: {}", path);
    println!("Version: {}.{}", header.major, header.minor);
    println!("Chunks:  {}", archive.chunk_count());
    println!("Logical size: {} bytes", archive.total_size());
    println!("File size:    {} bytes", archive.file_size());
    Ok(())
}

fn cmd_chunks(path: &str) -> Result<()> {
    let archive = ChunkedArchive::open(path).with_context(|| format!("opening {}", path))?;

    println!("{:>6}  {:>12}  {:>12}  {:>10}  {:>10}  method", "chunk", "logical", "file", "size", "packed");
    for (i, chunk) in archive.chunks().iter().enumerate() {
        println!(
            "{:>6}  {:>#12x}  {:>#12x}  {:>10}  {:>10}  {}",
            i,
            chunk.logical_offset,
            chunk.compressed_offset,
            chunk.uncompressed_size,
            chunk.compressed_size,
            chunk.method
        );
    }
    Ok(())
}

fn cmd_verify(path: &str) -> Result<()> {
    let archive = ChunkedArchive::open(path).with_context(|| format!("opening {}", path))?;
    let start = std::time::Instant::now();
    let stats = archive.verify().with_context(|| format!("verifying {}", path))?;

    println!("Archive: {}", path);
    println!("Chunks:  {} OK", stats.chunk_count);
    println!(
        "Size:    {} -> {} bytes ({:.1}%)",
        stats.uncompressed_bytes,
        stats.compressed_bytes,
        stats.ratio() * 100.0
    );
    println!("Time:    {:.2?}", start.elapsed());
    Ok(())
}

fn cmd_extract(path: &str, offset: &str, len: &str, out: &str) -> Result<()> {
    let offset = parse_u64(offset)?;
    let len = usize::try_from(parse_u64(len)?)?;
    let archive = ChunkedArchive::open(path).with_context(|| format!("opening {}", path))?;
    let bytes = archive.read(offset, len)?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out))?;
    info!("Wrote {} bytes to {}", bytes.len(), out);
    Ok(())
}

fn cmd_pack(input: &str, output: &str, chunk_size: Option<&str>) -> Result<()> {
    let chunk_size = match chunk_size {
        Some(s) => usize::try_from(parse_u64(s)?)?,
        None => DEFAULT_CHUNK_SIZE,
    };
    if chunk_size == 0 {
        bail!("chunk size must be positive");
    }
    let data = std::fs::read(input).with_context(|| format!("reading {}", input))?;
    let bytes = ArchiveWriter::new(chunk_size).write(&data)?;
    std::fs::write(output, &bytes).with_context(|| format!("writing {}", output))?;
    info!(
        "Packed {} bytes into {} ({} bytes, chunk size {})",
        data.len(),
        output,
        bytes.len(),
        chunk_size
    );
    Ok(())
}

fn cmd_hash(names: &[&str]) {
    for name in names {
        println!("{}  {}", TypeId::of(name), name);
    }
}

fn cmd_read(args: &[&str]) -> Result<()> {
    let (args, config) = split_config(args)?;
    if args.len() < 4 {
        bail!("missing arguments");
    }
    let reader = open_reader(args[1], args[2], config)?;
    let group_id = u32::try_from(parse_u64(args[3])?)?;

    if let Some(index) = args.get(4) {
        let index = usize::try_from(parse_u64(index)?)?;
        let object = reader.read_object(group_id, index)?;
        println!("{}", object);
        return Ok(());
    }

    let group = reader.read_group(group_id, true)?;
    println!("Group {:#x}: {} objects", group.id(), group.len());
    for (i, object) in group.objects().iter().enumerate() {
        println!("  [{}] {}", i, object);
    }
    for dep in group.dependencies() {
        println!("Dependency {:#x}: {} objects", dep.id(), dep.len());
    }
    Ok(())
}

fn cmd_scan(args: &[&str]) -> Result<()> {
    let (args, config) = split_config(args)?;
    if args.len() < 4 {
        bail!("missing arguments");
    }
    let reader = open_reader(args[1], args[2], config)?;
    let class = args[3];

    let mut found = 0usize;
    let mut failed = 0usize;
    let mut scan = reader.scan_type(class)?;
    for result in scan.by_ref() {
        match result {
            Ok(object) => {
                found += 1;
                println!("{}", object);
            }
            // already logged by the scan
            Err(_) => failed += 1,
        }
    }
    println!();
    println!(
        "{} objects of {} in {} groups ({} failed)",
        found,
        class,
        scan.groups_visited(),
        failed
    );
    if found == 0 && failed > 0 {
        bail!("every candidate group failed to decode");
    }
    Ok(())
}
