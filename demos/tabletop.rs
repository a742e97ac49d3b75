//! Rearranges objects on a table with a robot arm, optionally against a human
//! who moves objects around.
//!
//! Run with:
//! ```bash
//! cargo run --release --example tabletop -- --objects 2 --locations 4 --place b0,l3 --place b1,l2
//! cargo run --release --example tabletop -- --objects 1 --locations 3 --human --interventions 1 --place b0,l2
//! ```

use clap::Parser;
use color_eyre::eyre::eyre;
use symplan::automaton::Automaton;
use symplan::config::{Algorithm, Config, Construction, Semantics};
use symplan::cost::{RegionCost, WeightTable};
use symplan::game::{Game, GameOutcome};
use symplan::planner::Planner;
use symplan::product::ProductState;
use symplan::search::SearchOutcome;
use symplan::worlds::TableTop;

#[derive(Debug, Parser)]
#[command(author, version, about = "Symbolic planning and synthesis for tabletop manipulation")]
struct Cli {
    /// Number of objects
    #[arg(long, default_value = "1")]
    objects: usize,

    /// Number of table locations
    #[arg(long, default_value = "3")]
    locations: usize,

    /// Search algorithm: bfs, dijkstra or astar
    #[arg(long, default_value = "dijkstra")]
    algorithm: Algorithm,

    /// How several placements combine: conjunctive or prioritized
    #[arg(long, default_value = "conjunctive")]
    semantics: Semantics,

    /// Placements to achieve, as `object,location`; one automaton each
    #[arg(long, value_parser = parse_placement)]
    place: Vec<(String, String)>,

    /// Let a human move objects and synthesize a strategy instead of a plan
    #[arg(long)]
    human: bool,

    /// How many times the human may move an object during the whole game
    #[arg(long, default_value = "1")]
    interventions: usize,

    /// Let the human intervene whenever possible during the rollout, keeping objects off their targets
    #[arg(long)]
    adversarial: bool,

    /// Locations where robot moves cost twice as much
    #[arg(long)]
    slow: Vec<String>,

    /// Initial arena size, as a power of two
    #[arg(long, default_value = "18")]
    storage_bits: usize,
}

fn parse_placement(s: &str) -> Result<(String, String), String> {
    let (object, location) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `object,location`, got '{}'", s))?;
    Ok((object.trim().to_string(), location.trim().to_string()))
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
    let world = TableTop::new(cli.objects, cli.locations).with_human(cli.human);
    let placements = if cli.place.is_empty() {
        let last = world
            .locations
            .last()
            .ok_or_else(|| eyre!("at least one location is needed"))?;
        vec![("b0".to_string(), last.clone())]
    } else {
        cli.place.clone()
    };

    let task = world.task();
    let domain = world.domain();
    let config = Config {
        storage_bits: cli.storage_bits,
        algorithm: cli.algorithm,
        semantics: cli.semantics,
        construction: Construction::Incremental,
        capacity: world.capacity(),
        max_interventions: Some(cli.interventions),
        ..Default::default()
    };
    let weights = WeightTable::manipulation();
    let region = RegionCost::new(cli.slow.iter().cloned(), 2);
    let planner = Planner::builder(config, &task, &domain)
        .weights(&weights, &region)
        .game(cli.human)
        .build()?;

    let d = planner.diagnostics();
    println!(
        "transition system: {} states, {} edges, {} variables, {} layers in {:?}",
        d.states,
        d.edges,
        d.variables,
        d.layers(),
        d.total_time()
    );

    let automata: Vec<Automaton> = placements
        .iter()
        .map(|(o, l)| Automaton::eventually(format!("{}@{}", o, l), TableTop::on(o, l)))
        .collect();
    let table = planner.ts().context().predicates();

    if !cli.human {
        match planner.plan(automata)? {
            SearchOutcome::Found(plan) => println!("{}", plan.display(table)),
            SearchOutcome::Unreachable(stats) => {
                return Err(eyre!("no plan after {} iteration(s)", stats.iterations));
            }
        }
        return Ok(());
    }

    let product = planner.product(automata)?;
    let game = Game::new(&product)?;
    let synthesis = match game.solve(&planner.cancel_token())? {
        GameOutcome::Winning(synthesis) => synthesis,
        GameOutcome::NoWinningStrategy(synthesis) => {
            return Err(eyre!(
                "the human can prevent the goal (fixed point after {} iteration(s))",
                synthesis.iterations
            ));
        }
    };
    println!(
        "winning strategy: {} layer(s), {} iteration(s)",
        synthesis.layers.len(),
        synthesis.iterations
    );

    let actions = planner.ts().actions();
    let adversarial = cli.adversarial;
    // The adversarial human never moves an object onto one of its targets.
    let helps = |e: usize| {
        actions[e]
            .kind
            .destination()
            .is_some_and(|(o, l)| placements.iter().any(|(po, pl)| po == o && pl == l))
    };
    let mut human = |_: &ProductState, offered: &[Option<usize>]| {
        if adversarial {
            offered.iter().rposition(|e| e.is_some_and(|e| !helps(e))).unwrap_or(0)
        } else {
            0
        }
    };
    let steps = game.rollout(&synthesis, &mut human, &planner.cancel_token())?;
    for (i, step) in steps.iter().enumerate() {
        let response = step.environment.map_or("-".to_string(), |e| actions[e].name.clone());
        println!(
            "{:>3}. [rank {}] {} / human: {}  {}",
            i + 1,
            step.rank,
            actions[step.system].name,
            response,
            step.to.display(table)
        );
    }

    Ok(())
}
