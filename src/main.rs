use std::{env, fs, io, process, rc::Rc, time::Duration};

use piecescript::{
    compiler::{CompileOptions, compile},
    config::SessionConfig,
    graph::{BlockGraph, FlatGraph, SerializedGraph, to_hex},
    scene::{MemoryScene, SceneObject},
    session::Session,
};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "piecescript=info";

fn main() {
    let mut args: Vec<String> = env::args().collect();
    let trace = args.iter().any(|arg| arg == "--trace");
    if trace {
        args.retain(|arg| arg != "--trace");
    }
    init_tracing(trace);

    let Some(config_path) = extract_value(&mut args, "--config") else {
        return;
    };
    let Some(seconds) = extract_value(&mut args, "--for") else {
        return;
    };
    let broadcasts = extract_all(&mut args, "--broadcast");
    let selection = extract_all(&mut args, "--select");

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => print_help(),
        "compile" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: piecescript compile <graph.json>");
                return;
            };
            compile_file(path);
        }
        "flatten" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: piecescript flatten <graph.json>");
                return;
            };
            let graph = load_graph(path);
            print_json(&FlatGraph::from_graph(&graph));
        }
        "inflate" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: piecescript inflate <graph.json>");
                return;
            };
            print_json(&load_graph(path));
        }
        "hash" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: piecescript hash <graph.json>");
                return;
            };
            let graph = load_graph(path);
            println!("{}", to_hex(&CompileOptions::default().hash_graph(&graph)));
        }
        "run" => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: piecescript run <scene.json> [--broadcast <name>]... [--for <secs>]");
                return;
            };
            let config = load_config(config_path.as_deref());
            let duration = match parse_duration(seconds.as_deref()) {
                Some(duration) => duration,
                None => return,
            };
            run_scene(path, config, duration, broadcasts, selection);
        }
        other => {
            eprintln!("Error: unknown command `{}`", other);
            print_help();
            process::exit(2);
        }
    }
}

fn print_help() {
    println!(
        "\
piecescript CLI

Usage:
  piecescript compile <graph.json>
  piecescript flatten <graph.json>
  piecescript inflate <graph.json>
  piecescript hash <graph.json>
  piecescript run <scene.json> [--broadcast <name>]... [--select <id>]... [--for <secs>]

Flags:
  --config <file>    Session configuration (JSON)
  --broadcast <name> Broadcast a message once behaviors are installed (repeatable)
  --select <id>      Select an object once behaviors are installed (repeatable)
  --for <secs>       Simulated run time (default: 1)
  --trace            Log at trace level
  -h, --help         Show this help message

Environment:
  RUST_LOG                 Log filter (default: {DEFAULT_FILTER})
  PIECESCRIPT_LOOP_GUARD   Loop guard seed override
"
    );
}

fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("piecescript=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Removes `flag <value>` from `args`. Outer `None` means a usage error was
/// already reported.
fn extract_value(args: &mut Vec<String>, flag: &str) -> Option<Option<String>> {
    let Some(index) = args.iter().position(|arg| arg == flag) else {
        return Some(None);
    };
    if index + 1 >= args.len() {
        eprintln!("Usage: piecescript ... {} <value>", flag);
        return None;
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Some(Some(value))
}

fn extract_all(args: &mut Vec<String>, flag: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            values.push(args.remove(i + 1));
            args.remove(i);
            continue;
        }
        i += 1;
    }
    values
}

fn parse_duration(raw: Option<&str>) -> Option<Duration> {
    let Some(raw) = raw else {
        return Some(Duration::from_secs(1));
    };
    match raw.parse::<f64>().ok().and_then(|secs| Duration::try_from_secs_f64(secs).ok()) {
        Some(duration) => Some(duration),
        None => {
            eprintln!("Error: --for expects a non-negative number of seconds.");
            None
        }
    }
}

fn read_file(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!("Error reading {}: {}", path, err);
            process::exit(1);
        }
    }
}

fn load_config(path: Option<&str>) -> SessionConfig {
    let config = match path {
        Some(path) => match SessionConfig::from_json(&read_file(path)) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: invalid config {}: {}", path, err);
                process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };
    config.with_env_overrides()
}

/// Accepts either the nested or the flat graph form.
fn load_graph(path: &str) -> BlockGraph {
    let source = read_file(path);
    let graph = serde_json::from_str::<SerializedGraph>(&source)
        .map_err(|err| err.to_string())
        .and_then(|serialized| serialized.to_graph().map_err(|err| err.to_string()));
    match graph {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("Error: {}: {}", path, err);
            process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}

fn compile_file(path: &str) {
    let graph = load_graph(path);
    match compile(&graph, &CompileOptions::default()) {
        Ok(procedure) => {
            info!(handlers = procedure.handlers.len(), hash = %procedure.hash_hex(), "compiled");
            print_json(&procedure.descriptors());
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

#[derive(Deserialize)]
struct SceneFile {
    #[serde(default)]
    objects: Vec<SceneObject>,
    #[serde(default)]
    metadata: Map<String, Json>,
}

fn run_scene(
    path: &str,
    config: SessionConfig,
    duration: Duration,
    broadcasts: Vec<String>,
    selection: Vec<String>,
) {
    let file: SceneFile = match serde_json::from_str(&read_file(path)) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Error: invalid scene {}: {}", path, err);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    };

    let scene = Rc::new(MemoryScene::with_objects(file.objects));
    for (key, value) in file.metadata {
        scene.set_metadata(&key, value);
    }

    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&runtime, simulate(Rc::clone(&scene), config, duration, broadcasts, selection));
    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
    for message in scene.notifications() {
        warn!(message = %message, "host notification");
    }
    print_json(&scene.snapshot());
}

async fn simulate(
    scene: Rc<MemoryScene>,
    config: SessionConfig,
    duration: Duration,
    broadcasts: Vec<String>,
    selection: Vec<String>,
) -> Result<(), piecescript::session::SessionError> {
    let mut changes = scene.subscribe();
    let mut session = Session::new(config, scene.clone(), scene);
    session.load_resources().await?;

    let report = session.sync().await?;
    info!(
        objects = report.created,
        installed = report.installed.len(),
        failed = report.failed.len(),
        "scene loaded"
    );
    if !selection.is_empty() {
        session.set_selection(selection);
    }
    for name in &broadcasts {
        let started = session.broadcast(name, None);
        info!(broadcast = %name, started, "broadcast sent");
    }

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(snapshot) = changes.recv() => {
                session.handle_change(&snapshot);
            }
        }
    }
    session.shutdown().await
}
