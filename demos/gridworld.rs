//! Plans a tour through a grid world.
//!
//! Run with:
//! ```bash
//! cargo run --release --example gridworld -- --size 5 --algorithm astar --visit 4,4 --visit 0,4
//! ```

use clap::Parser;
use color_eyre::eyre::eyre;
use symplan::automaton::Automaton;
use symplan::config::{Algorithm, Config, Construction, Semantics};
use symplan::cost::Unadjusted;
use symplan::domain::FactDomain;
use symplan::planner::Planner;
use symplan::predicate::PredicateTable;
use symplan::search::SearchOutcome;
use symplan::worlds::GridWorld;

#[derive(Debug, Parser)]
#[command(author, version, about = "Symbolic planning in a grid world")]
struct Cli {
    /// Number of rows and columns
    #[arg(long, default_value = "5")]
    size: usize,

    /// Search algorithm: bfs, dijkstra or astar
    #[arg(long, default_value = "bfs")]
    algorithm: Algorithm,

    /// How several visits combine: conjunctive or prioritized
    #[arg(long, default_value = "conjunctive")]
    semantics: Semantics,

    /// Discover reachable states instead of using every fact as a state
    #[arg(long)]
    incremental: bool,

    /// Cells to visit, as `row,col`; one automaton each
    #[arg(long, value_parser = parse_cell)]
    visit: Vec<(usize, usize)>,

    /// Blocked cells, as `row,col`
    #[arg(long, value_parser = parse_cell)]
    obstacle: Vec<(usize, usize)>,

    /// Initial arena size, as a power of two
    #[arg(long, default_value = "16")]
    storage_bits: usize,
}

fn parse_cell(s: &str) -> Result<(usize, usize), String> {
    let (row, col) = s.split_once(',').ok_or_else(|| format!("expected `row,col`, got '{}'", s))?;
    let parse = |x: &str| x.trim().parse::<usize>().map_err(|e| e.to_string());
    Ok((parse(row)?, parse(col)?))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();
    let grid = GridWorld::new(cli.size, cli.size).with_obstacles(cli.obstacle.iter().copied());
    let visits = if cli.visit.is_empty() {
        vec![(cli.size - 1, cli.size - 1)]
    } else {
        cli.visit.clone()
    };

    let task = grid.task();
    let domain = FactDomain::new(&PredicateTable::new(&task.facts)?);
    let config = Config {
        storage_bits: cli.storage_bits,
        algorithm: cli.algorithm,
        semantics: cli.semantics,
        construction: if cli.incremental {
            Construction::Incremental
        } else {
            Construction::Direct
        },
        capacity: cli.size * cli.size,
        ..Default::default()
    };
    let weights = GridWorld::weights();
    let planner = Planner::builder(config, &task, &domain)
        .weights(&weights, &Unadjusted)
        .build()?;

    let d = planner.diagnostics();
    println!(
        "transition system: {} states, {} edges, {} variables, built in {:?}",
        d.states,
        d.edges,
        d.variables,
        d.total_time()
    );

    let automata = visits
        .iter()
        .map(|&(row, col)| Automaton::eventually(grid.location(row, col), grid.at(row, col)));
    let time_search = std::time::Instant::now();
    match planner.plan(automata)? {
        SearchOutcome::Found(plan) => {
            println!("{}", plan.display(planner.ts().context().predicates()));
            println!(
                "{} step(s) in {} iteration(s), {:?}",
                plan.len(),
                plan.stats.iterations,
                time_search.elapsed()
            );
        }
        SearchOutcome::Unreachable(stats) => {
            return Err(eyre!("no plan after {} iteration(s)", stats.iterations));
        }
    }

    Ok(())
}
