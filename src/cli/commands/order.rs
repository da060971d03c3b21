//! Order command - topologically order a dependency file

use crate::cli::args::{OrderArgs, OutputFormat};
use crate::error::{PolybuildError, PolybuildResult};
use crate::graph::{Cycle, DependencyGraph, Resolution};
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Node -> nodes it depends on
type EdgeMap = BTreeMap<String, Vec<String>>;

#[derive(Serialize)]
struct OrderJson<'a> {
    order: &'a [String],
    cycles: &'a [Cycle],
    waves: Vec<Vec<String>>,
}

/// Execute the order command
pub async fn execute(args: OrderArgs) -> PolybuildResult<()> {
    let edges = load_edges(&args.file).await?;
    let graph = DependencyGraph::from_edges(edges);
    let resolution = graph.resolve();

    match args.format {
        OutputFormat::Table => print_table(&graph, &resolution),
        OutputFormat::Json => print_json(&graph, &resolution)?,
        OutputFormat::Plain => print_plain(&resolution),
    }

    if args.strict && !resolution.is_acyclic() {
        let described: Vec<String> = resolution.cycles.iter().map(|c| c.to_string()).collect();
        return Err(PolybuildError::CycleDetected(described.join("; ")));
    }

    Ok(())
}

/// Read a JSON or TOML edge map; `.toml` files are TOML, anything else JSON
async fn load_edges(path: &Path) -> PolybuildResult<EdgeMap> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| PolybuildError::io(format!("reading {}", path.display()), e))?;
    parse_edges(path, &content)
}

fn parse_edges(path: &Path, content: &str) -> PolybuildResult<EdgeMap> {
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let parsed = if is_toml {
        toml::from_str::<EdgeMap>(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<EdgeMap>(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| PolybuildError::GraphFileInvalid {
        path: path.to_path_buf(),
        reason,
    })
}

fn print_table(graph: &DependencyGraph, resolution: &Resolution) {
    println!("{:<6} {:<30} {}", "STEP", "NODE", "DEPENDS ON");
    println!("{}", "-".repeat(60));
    for (i, node) in resolution.order.iter().enumerate() {
        let deps = graph.dependencies(node);
        let deps = if deps.is_empty() {
            style("-").dim().to_string()
        } else {
            deps.join(", ")
        };
        println!("{:<6} {:<30} {}", i + 1, node, deps);
    }

    println!();
    println!("Total: {} node(s)", resolution.order.len());
    for cycle in &resolution.cycles {
        println!("{} cycle: {}", style("[WARN]").yellow(), cycle);
    }
}

fn print_json(graph: &DependencyGraph, resolution: &Resolution) -> PolybuildResult<()> {
    let json = OrderJson {
        order: &resolution.order,
        cycles: &resolution.cycles,
        waves: graph.build_waves(),
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// One node per line on stdout; cycles on stderr
fn print_plain(resolution: &Resolution) {
    for node in &resolution.order {
        println!("{}", node);
    }
    for cycle in &resolution.cycles {
        eprintln!("cycle: {}", cycle);
    }
}
