//! Chunkgraph CLI - structural chunking and code graphs for Python sources
//!
//! Usage: chunkgraph <command> [arguments]

mod chunk_cmd;
mod graph_cmd;

use anyhow::Result;
use chunkgraph::config::{DEFAULT_EMBEDDING_MODEL, DEFAULT_GRAPH_DEPTH};
use chunkgraph::{collection_name, ChunkFactory, ChunkingStrategy, IndexConfig};
use graph_cmd::GraphQuery;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Chunkgraph - Structural chunking and code knowledge graphs for Python");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  chunkgraph <command> [arguments]");
    eprintln!("  chunkgraph --help");
    eprintln!();
    eprintln!("  chunkgraph chunk [--strategy <NAME>] [--config <FILE>] <PATH>...");
    eprintln!("  chunkgraph graph index --db <FILE> <PATH>...");
    eprintln!("  chunkgraph graph calls --db <FILE> --name <NAME> [--depth <N>]");
    eprintln!("  chunkgraph graph callers --db <FILE> --name <NAME>");
    eprintln!("  chunkgraph graph class --db <FILE> --name <NAME>");
    eprintln!("  chunkgraph graph clear --db <FILE>");
    eprintln!("  chunkgraph collection --strategy <NAME> [--model <ID>] [--source <LABEL>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  chunk       Split Python files and print chunks as JSON lines");
    eprintln!("  graph       Build or query a code knowledge graph");
    eprintln!("  collection  Print the vector collection name for a configuration");
    eprintln!();
    eprintln!("Chunk arguments:");
    eprintln!("  --strategy <NAME>   One of: {}", ChunkFactory::available().join(", "));
    eprintln!("  --config <FILE>     TOML config; --strategy overrides its strategy");
    eprintln!();
    eprintln!("Graph arguments:");
    eprintln!("  --db <FILE>         Path to the graph database");
    eprintln!("  --name <NAME>       Entity name to start from");
    eprintln!("  --depth <N>         CALLS hops to follow (default: {})", DEFAULT_GRAPH_DEPTH);
    eprintln!();
    eprintln!("Collection arguments:");
    eprintln!("  --model <ID>        Embedding model id (default: {})", DEFAULT_EMBEDDING_MODEL);
    eprintln!("  --source <LABEL>    Source identifier prefix");
    eprintln!();
    eprintln!("Logging is controlled by RUST_LOG (e.g. RUST_LOG=chunkgraph=debug).");
}

enum Command {
    Chunk {
        strategy: String,
        paths: Vec<PathBuf>,
    },
    GraphIndex {
        db_path: PathBuf,
        paths: Vec<PathBuf>,
    },
    GraphQuery {
        db_path: PathBuf,
        query: GraphQuery,
        name: String,
        depth: usize,
    },
    GraphClear {
        db_path: PathBuf,
    },
    Collection {
        strategy: String,
        model: String,
        source: Option<String>,
    },
    Version,
}

/// Value following a flag at `args[i]`.
fn flag_value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} requires an argument", args[i]))
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Err(anyhow::anyhow!("Missing command"));
    }

    let command = &args[1];

    if command == "--help" || command == "-h" {
        print_usage();
        std::process::exit(0);
    }

    match command.as_str() {
        "--version" | "-V" => Ok(Command::Version),
        "chunk" => {
            let mut strategy: Option<String> = None;
            let mut config_path: Option<PathBuf> = None;
            let mut paths = Vec::new();

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--strategy" => {
                        strategy = Some(flag_value(&args, i)?.to_string());
                        i += 2;
                    }
                    "--config" => {
                        config_path = Some(PathBuf::from(flag_value(&args, i)?));
                        i += 2;
                    }
                    arg if arg.starts_with("--") => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", arg));
                    }
                    arg => {
                        paths.push(PathBuf::from(arg));
                        i += 1;
                    }
                }
            }

            let config = match config_path {
                Some(path) => IndexConfig::load(&path)?,
                None => IndexConfig::default(),
            };
            if paths.is_empty() {
                return Err(anyhow::anyhow!("chunk requires at least one path"));
            }
            Ok(Command::Chunk {
                strategy: strategy.unwrap_or(config.strategy),
                paths,
            })
        }
        "graph" => {
            let sub = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("graph requires a subcommand"))?
                .clone();

            let mut db_path: Option<PathBuf> = None;
            let mut name: Option<String> = None;
            let mut depth = DEFAULT_GRAPH_DEPTH;
            let mut paths = Vec::new();

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--db" => {
                        db_path = Some(PathBuf::from(flag_value(&args, i)?));
                        i += 2;
                    }
                    "--name" => {
                        name = Some(flag_value(&args, i)?.to_string());
                        i += 2;
                    }
                    "--depth" => {
                        depth = flag_value(&args, i)?.parse()?;
                        i += 2;
                    }
                    arg if arg.starts_with("--") => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", arg));
                    }
                    arg => {
                        paths.push(PathBuf::from(arg));
                        i += 1;
                    }
                }
            }

            let db_path = db_path.ok_or_else(|| anyhow::anyhow!("--db is required"))?;
            let query = match sub.as_str() {
                "index" => {
                    if paths.is_empty() {
                        return Err(anyhow::anyhow!("graph index requires at least one path"));
                    }
                    return Ok(Command::GraphIndex { db_path, paths });
                }
                "clear" => return Ok(Command::GraphClear { db_path }),
                "calls" => GraphQuery::Calls,
                "callers" => GraphQuery::Callers,
                "class" => GraphQuery::Class,
                other => return Err(anyhow::anyhow!("Unknown graph subcommand: {}", other)),
            };
            let name = name.ok_or_else(|| anyhow::anyhow!("--name is required"))?;
            Ok(Command::GraphQuery {
                db_path,
                query,
                name,
                depth,
            })
        }
        "collection" => {
            let mut strategy: Option<String> = None;
            let mut model = DEFAULT_EMBEDDING_MODEL.to_string();
            let mut source: Option<String> = None;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--strategy" => {
                        strategy = Some(flag_value(&args, i)?.to_string());
                        i += 2;
                    }
                    "--model" => {
                        model = flag_value(&args, i)?.to_string();
                        i += 2;
                    }
                    "--source" => {
                        source = Some(flag_value(&args, i)?.to_string());
                        i += 2;
                    }
                    _ => {
                        return Err(anyhow::anyhow!("Unknown argument: {}", args[i]));
                    }
                }
            }

            let strategy = strategy.ok_or_else(|| anyhow::anyhow!("--strategy is required"))?;
            Ok(Command::Collection {
                strategy,
                model,
                source,
            })
        }
        _ => Err(anyhow::anyhow!("Unknown command: {}", command)),
    }
}

fn run_collection(strategy: &str, model: &str, source: Option<&str>) -> Result<()> {
    let chunker = ChunkFactory::create(strategy)?;
    println!("{}", collection_name(source, chunker.name(), model));
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Chunk { strategy, paths } => chunk_cmd::run_chunk(&strategy, &paths),
        Command::GraphIndex { db_path, paths } => graph_cmd::run_index(&db_path, &paths),
        Command::GraphQuery {
            db_path,
            query,
            name,
            depth,
        } => graph_cmd::run_query(&db_path, query, &name, depth),
        Command::GraphClear { db_path } => graph_cmd::run_clear(&db_path),
        Command::Collection {
            strategy,
            model,
            source,
        } => run_collection(&strategy, &model, source.as_deref()),
        Command::Version => {
            println!("chunkgraph {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match parse_args().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
