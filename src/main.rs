use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing::warn;

use iffmesh::error::{Error, Warning};
use iffmesh::iff::read::{FormCursor, Node, read_root};
use iffmesh::mesh::decode::decode_model;
use iffmesh::mesh::encode::encode_model;
use iffmesh::mesh::{Lod, Model};
use iffmesh::registry::TextureRegistry;
use iffmesh::source::write_source;

/// Inspect and convert WCP/SO engine IFF mesh files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[clap(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a mesh file's contents
    Info {
        /// Mesh file to inspect
        file: PathBuf,

        /// Dump the full decoded model as JSON instead of a summary
        #[clap(long)]
        json: bool,

        /// Print the raw container tree with declared lengths
        #[clap(long)]
        tree: bool,
    },
    /// Convert a mesh file to WCPPascal compiler source
    ToSource {
        /// Mesh file to convert
        input: PathBuf,

        /// Output path; stdout when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Decode a mesh file, re-encode it, and compare the bytes
    Roundtrip {
        /// Mesh file to check
        file: PathBuf,
    },
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("mesh")
        .to_owned()
}

fn print_summary(model: &Model) {
    println!("detail levels: {}", model.lods.len());
    for (level, lod) in model.lods.iter().enumerate() {
        match lod {
            Lod::Mesh { mesh, topology } => {
                println!(
                    "  LOD {level}: \"{}\" v{}, {} vertices, {} faces, {} edges, {} materials, radius {:.3}",
                    mesh.name,
                    mesh.version,
                    mesh.vertices.len(),
                    mesh.faces.len(),
                    topology.edges.len(),
                    topology.materials.len(),
                    mesh.radius,
                );
                for key in &topology.materials {
                    println!(
                        "    material texnum={} light_flags={}",
                        key.texnum, key.light_flags
                    );
                }
            }
            Lod::Empty => println!("  LOD {level}: empty"),
        }
    }
    if !model.ranges.is_empty() {
        println!("ranges: {}", model.ranges.iter().join(", "));
    }
    for hardpoint in &model.hardpoints {
        let [x, y, z] = hardpoint.position;
        println!("hardpoint \"{}\" at ({x:.3}, {y:.3}, {z:.3})", hardpoint.name);
    }
    if let Some(sphere) = &model.collision {
        let [x, y, z] = sphere.center;
        println!(
            "collision sphere at ({x:.3}, {y:.3}, {z:.3}), radius {:.3}",
            sphere.radius
        );
    }
    if let Some([near, far]) = model.far_range {
        println!("far range: {near} .. {far}");
    }
}

fn print_tree(data: &[u8]) -> Result<(), Error> {
    fn walk(mut form: FormCursor<'_>, depth: usize) -> Result<(), Error> {
        let pad = "  ".repeat(depth);
        println!(
            "{pad}{} \"{}\" ({} content bytes)",
            form.kind.tag().as_str().trim_end(),
            form.id,
            form.content_len(),
        );
        while form.has_more() {
            match form.read_node()? {
                Node::Form(inner) => walk(inner, depth + 1)?,
                Node::Chunk(chunk) => {
                    println!(
                        "{}CHUNK \"{}\" ({} content bytes)",
                        "  ".repeat(depth + 1),
                        chunk.id,
                        chunk.data.len(),
                    );
                }
            }
        }
        Ok(())
    }
    walk(read_root(data)?, 0)
}

fn run(args: Args) -> Result<bool, Error> {
    match args.command {
        Command::Info { file, json, tree } => {
            let data = fs::read(&file)?;
            if tree {
                print_tree(&data)?;
                return Ok(true);
            }
            let (model, warnings) = decode_model(&data)?;
            report_warnings(&warnings);
            if json {
                #[cfg(feature = "json")]
                {
                    println!("{}", serde_json::to_string_pretty(&model)?);
                    return Ok(true);
                }
                #[cfg(not(feature = "json"))]
                warn!("this build does not include JSON support");
            }
            print_summary(&model);
            Ok(true)
        }
        Command::ToSource { input, output } => {
            let data = fs::read(&input)?;
            let (model, warnings) = decode_model(&data)?;
            report_warnings(&warnings);
            let root = encode_model(&model)?;
            // Decoded files carry resolved numbers already, so the
            // registry contributes no assignment comment.
            let registry = TextureRegistry::new(0);
            let text = write_source(&model_name(&input), &root, &registry);
            match output {
                Some(path) => fs::write(path, text)?,
                None => print!("{text}"),
            }
            Ok(true)
        }
        Command::Roundtrip { file } => {
            let data = fs::read(&file)?;
            let (model, warnings) = decode_model(&data)?;
            report_warnings(&warnings);
            let reencoded = encode_model(&model)?.to_bytes();
            if reencoded == data {
                println!("round trip OK ({} bytes)", data.len());
                Ok(true)
            } else {
                let diverges = data
                    .iter()
                    .zip(&reencoded)
                    .position(|(a, b)| a != b)
                    .unwrap_or_else(|| data.len().min(reencoded.len()));
                println!(
                    "round trip differs: {} bytes in, {} bytes out, first divergence at offset {diverges}",
                    data.len(),
                    reencoded.len(),
                );
                Ok(false)
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
