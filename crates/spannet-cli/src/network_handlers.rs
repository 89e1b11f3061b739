//! Handler functions for network CLI commands.
//!
//! These functions implement the logic behind `info`, `validate`,
//! `convert` and `crawl`.

use rand::SeedableRng;
use rand::rngs::StdRng;
use spannet_core::{Error, Result};
use spannet_graph::{Network, compute_stats, load_network, save_network, validate_network};
use spannet_legacy::{BranchData, LegacyNetwork, NodeKind, load_legacy, save_legacy};
use tracing::info;

use crate::config::SpannetConfig;

// ============================================================================
// Option types
// ============================================================================

/// Options for `convert`.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: String,
    pub output: String,
    /// Input is a legacy topology document.
    pub legacy: bool,
    pub create_dir: bool,
}

/// Options for `crawl`; unset values fall back to the `[crawl]` config.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub file: String,
    pub angle_limit: Option<f64>,
    pub seed: Option<u64>,
    pub min_overlap: Option<usize>,
    pub branching: bool,
    pub output: Option<String>,
}

/// What a crawl found.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub chains: Vec<Vec<usize>>,
    /// First discontinuity per chain, if any.
    pub breaks: Vec<Option<usize>>,
    pub overlaps: Vec<(usize, usize)>,
}

// ============================================================================
// Helper: load input
// ============================================================================

/// Load a network, converting legacy documents on the way in.
pub fn load_input(path: &str, legacy: bool, config: &SpannetConfig) -> Result<Network> {
    if legacy {
        let topology = load_legacy(path, config.topology.clone())?;
        topology.to_network(config.network.default_name.clone())
    } else {
        load_network(path)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Show network statistics.
pub fn handle_info(config: &SpannetConfig, file: &str, legacy: bool, json: bool) -> Result<()> {
    let network = load_input(file, legacy, config)?;
    let stats = compute_stats(&network);

    if json {
        let text = serde_json::to_string_pretty(&stats)
            .map_err(|e| Error::serialization(format!("Failed to serialize statistics: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!("Network Statistics");
    println!("==================");
    println!("Name:           {}", stats.name);
    println!("Nodes:          {}", stats.node_count);
    println!("  Spatial:      {}", stats.spatial_node_count);
    println!("  Feet:         {}", stats.foot_node_count);
    println!("  Branching:    {}", stats.branching_node_count);
    println!("  Orphans:      {}", stats.orphan_count);
    println!("Edges:          {}", stats.edge_count);
    println!("  Weighted:     {}", stats.weighted_edge_count);
    println!("Avg valence:    {:.2}", stats.avg_valence);
    println!("Max valence:    {}", stats.max_valence);
    println!("Components:     {}", stats.connected_components);
    println!("Edge length:    {:.3}", stats.total_edge_length);
    println!("Groups:         {}", stats.group_count);

    if !stats.valence_distribution.is_empty() {
        println!("\nValence:");
        for (valence, count) in &stats.valence_distribution {
            println!("  {valence}: {count}");
        }
    }

    Ok(())
}

/// Validate network integrity.
pub fn handle_validate(config: &SpannetConfig, file: &str, legacy: bool) -> Result<()> {
    let network = load_input(file, legacy, config)?;
    let result = validate_network(&network);

    if result.valid {
        println!("Network is valid.");
    } else {
        println!("Network has validation issues:");
    }

    for error in &result.errors {
        println!("  ERROR [{}]: {}", error.code, error.message);
        for id in error.nodes.iter().chain(&error.edges) {
            println!("    - {id}");
        }
    }
    for warning in &result.warnings {
        println!("  WARN  [{}]: {}", warning.code, warning.message);
        for id in warning.nodes.iter().chain(&warning.edges) {
            println!("    - {id}");
        }
    }
    for note in &result.info {
        println!("  INFO  [{}]: {}", note.code, note.message);
    }

    println!(
        "\nSummary: {} error(s), {} warning(s)",
        result.errors.len(),
        result.warnings.len()
    );

    if result.valid {
        Ok(())
    } else {
        Err(Error::operation(format!(
            "Network validation failed with {} error(s)",
            result.errors.len()
        )))
    }
}

/// Convert a network between formats.
pub fn handle_convert(config: &SpannetConfig, options: ConvertOptions) -> Result<()> {
    let network = load_input(&options.input, options.legacy, config)?;
    let create_dir = options.create_dir || config.network.create_dirs;
    save_network(&network, &options.output, create_dir)?;

    info!(
        input = %options.input,
        output = %options.output,
        nodes = network.node_count(),
        edges = network.edge_count(),
        "converted network"
    );
    println!("Network saved to: {}", options.output);
    Ok(())
}

/// Crawl a legacy topology and report chains and overlaps.
pub fn handle_crawl(config: &SpannetConfig, options: CrawlOptions) -> Result<()> {
    let mut topology = load_legacy(&options.file, config.topology.clone())?;
    let summary = crawl_topology(&mut topology, config, &options)?;

    println!("Chains: {}", summary.chains.len());
    for (i, (chain, brk)) in summary.chains.iter().zip(&summary.breaks).enumerate() {
        let edges: Vec<String> = chain.iter().map(|e| e.to_string()).collect();
        match brk {
            Some(at) => println!("  [{i}] {} (break after position {at})", edges.join(" ")),
            None => println!("  [{i}] {}", edges.join(" ")),
        }
    }

    if summary.overlaps.is_empty() {
        println!("\nNo overlapping chains.");
    } else {
        println!("\nOverlapping chains:");
        for (a, b) in &summary.overlaps {
            println!("  {a} <-> {b}");
        }
    }

    if let Some(output) = &options.output {
        save_legacy(&topology, output, config.network.create_dirs)?;
        println!("\nTopology saved to: {output}");
    }
    Ok(())
}

/// Rebuild node data, optionally classify branching nodes, then crawl
/// every edge and relax interfaces along the chains found.
pub fn crawl_topology(
    topology: &mut LegacyNetwork,
    config: &SpannetConfig,
    options: &CrawlOptions,
) -> Result<CrawlSummary> {
    let angle_limit = options.angle_limit.unwrap_or(config.crawl.angle_limit);
    let min_overlap = options.min_overlap.unwrap_or(config.crawl.min_overlap);
    let seed = options.seed.or(config.crawl.seed);

    topology.build_node_data(false, true)?;
    if options.branching {
        for node in topology.nodes.iter_mut().filter(|n| n.valence() == 3) {
            if !matches!(node.kind, NodeKind::Branching(_)) {
                node.kind = NodeKind::Branching(BranchData::default());
            }
        }
    }
    topology.build_branching_data();

    topology.chains.clear();
    for node in &mut topology.nodes {
        node.chains.clear();
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let added = topology.crawl_all_chains(angle_limit, &mut rng)?;
    topology.relax_nodes_along_chains();
    info!(chains = added, angle_limit, seed = ?seed, "crawled topology");

    let breaks = (0..topology.chains.len())
        .map(|i| topology.check_continuity(i))
        .collect::<Result<Vec<_>>>()?;
    Ok(CrawlSummary {
        chains: topology.chains.iter().map(|c| c.edges.clone()).collect(),
        breaks,
        overlaps: topology.find_overlapping_chains(min_overlap),
    })
}

// ============================================================================
// Tests
// ============================================================================
