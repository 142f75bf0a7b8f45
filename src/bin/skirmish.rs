//! Headless Skirmish Runner
//!
//! Loads a scenario, plays greedy turns for every side and prints the
//! notification log. Useful for balancing skill catalogs and for replay
//! checks: the same scenario and seed always produce the same log.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use hex_tactics::battle::{
    effective_reach, CombatEvent, CombatEventKind, CombatMatch, CombatRound, HexCoord,
    LegalActions, MatchOutcome, Scenario,
};
use hex_tactics::core::{LoadError, UnitId};

/// Headless Skirmish Runner - greedy AI on both sides
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Play a scenario with greedy AI and print the combat log")]
struct Args {
    /// Scenario JSON file
    #[arg(long, default_value = "data/skirmish.json")]
    scenario: PathBuf,

    /// Maximum rounds before the match is called a draw
    #[arg(long, default_value_t = 30)]
    rounds: u32,

    /// Random seed, overriding the scenario's config
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,

    /// Print every notification, not only the summary
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct SkirmishResult {
    scenario: String,
    seed: u64,
    rounds: u32,
    outcome: MatchOutcome,
    events: Vec<CombatEvent>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = match run(&args) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.format.as_str() {
        "json" => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize result: {}", e);
                std::process::exit(1);
            }
        },
        _ => {
            if args.format != "text" {
                eprintln!("Unknown format '{}', defaulting to text", args.format);
            }
            if args.verbose {
                for event in &result.events {
                    println!("{}", describe(event));
                }
                println!();
            }
            println!("Skirmish Result");
            println!("===============");
            println!("Scenario: {}", result.scenario);
            println!("Outcome: {:?}", result.outcome);
            println!("Rounds: {}", result.rounds);
            println!("Events: {}", result.events.len());
            println!("Seed: {}", result.seed);
        }
    }
}

fn run(args: &Args) -> Result<SkirmishResult, LoadError> {
    let scenario = Scenario::load(&args.scenario)?;
    let mut game = scenario.build(args.seed)?;
    info!(scenario = %scenario.name, seed = game.config().seed, "skirmish loaded");

    let mut events = Vec::new();
    let mut rounds = 0;

    while game.outcome() == MatchOutcome::Ongoing && rounds < args.rounds {
        rounds += 1;
        let order: Vec<UnitId> = game.roster().living().map(|u| u.id).collect();
        game.start_round(CombatRound::new(rounds, order))?;

        while let Some(legal) = game.advance_turn()? {
            play_turn(&mut game, legal)?;
            if game.outcome() != MatchOutcome::Ongoing {
                break;
            }
        }
        events.extend(game.drain_events());
    }
    events.extend(game.drain_events());

    let outcome = game.outcome();
    info!(?outcome, rounds, "skirmish finished");
    Ok(SkirmishResult {
        scenario: scenario.name.clone(),
        seed: game.config().seed,
        rounds,
        outcome,
        events,
    })
}

/// Close in on the nearest enemy, then hit the weakest one in reach
fn play_turn(game: &mut CombatMatch, legal: LegalActions) -> Result<(), LoadError> {
    let unit = legal.unit_id;
    if legal.walkable.is_empty() && legal.attackable.is_empty() {
        debug!(%unit, "nothing to do");
        return Ok(());
    }

    match choose_destination(game, &legal) {
        Some(dest) => {
            game.move_to(unit, dest)?;
        }
        None => {
            game.skip_move(unit)?;
        }
    }

    let legal = game.legal_actions(unit)?;
    let target = legal
        .attackable
        .iter()
        .filter_map(|node| game.unit(node.unit_id).ok())
        .min_by_key(|u| (u.hp.current, u.id))
        .map(|u| u.id);

    if let Some(target) = target {
        if let Err(e) = game.apply_attack(unit, target) {
            warn!(%unit, %target, error = %e, "attack rejected");
        }
    }
    Ok(())
}

/// Best cell to stand on: the one whose distance to an enemy is closest to
/// the selected skill's maximum reach. `None` means stay put.
fn choose_destination(game: &CombatMatch, legal: &LegalActions) -> Option<HexCoord> {
    let me = game.unit(legal.unit_id).ok()?;
    let range = legal
        .selected_skill
        .as_ref()
        .and_then(|id| game.catalog().get(id))
        .map(|skill| &skill.range);
    let reach = effective_reach(me, range);

    let enemies: Vec<HexCoord> = game
        .roster()
        .enemies_of(me.owner)
        .map(|u| u.coord)
        .collect();
    if enemies.is_empty() {
        return None;
    }

    let score = |coord: HexCoord| -> u32 {
        enemies
            .iter()
            .map(|e| {
                let d = coord.distance(e);
                if d < reach.min {
                    (reach.min - d) * 2
                } else {
                    d.saturating_sub(reach.max)
                }
            })
            .min()
            .unwrap_or(u32::MAX)
    };

    let best = legal
        .walkable
        .iter()
        .min_by_key(|node| (score(node.coord), node.distance, node.coord))?;
    if best.coord == me.coord || score(best.coord) >= score(me.coord) {
        None
    } else {
        Some(best.coord)
    }
}

fn describe(event: &CombatEvent) -> String {
    let body = match &event.kind {
        CombatEventKind::RoundStart { order } => format!("round starts, order {:?}", ids(order)),
        CombatEventKind::TurnStart { unit } => format!("{} takes the turn", unit),
        CombatEventKind::Move { unit, path } => match path.last() {
            Some(dest) => format!("{} moves {} step(s) to {}", unit, path.len() - 1, dest),
            None => format!("{} stays", unit),
        },
        CombatEventKind::Attack {
            unit,
            target,
            skill,
            reports,
            defeated,
        } => {
            let hp: i32 = reports.iter().map(|r| r.hp_delta).sum();
            format!(
                "{} attacks {} with {}: hp {:+}{}",
                unit,
                target,
                skill,
                hp,
                fallen(defeated)
            )
        }
        CombatEventKind::Skill {
            unit,
            skill,
            reports,
            defeated,
            ..
        } => format!(
            "{} uses {} ({} effect(s)){}",
            unit,
            skill,
            reports.len(),
            fallen(defeated)
        ),
        CombatEventKind::Passive {
            unit,
            skill,
            trigger,
            defeated,
            ..
        } => format!("{} passive {} on {}{}", unit, skill, trigger, fallen(defeated)),
        CombatEventKind::TurnEnd { unit } => format!("{} ends the turn", unit),
        CombatEventKind::RoundEnd { ticks, defeated } => {
            format!("round ends, {} tick(s){}", ticks.len(), fallen(defeated))
        }
    };
    format!("[r{} #{}] {}", event.round, event.seq, body)
}

fn ids(units: &[UnitId]) -> Vec<u32> {
    units.iter().map(|u| u.0).collect()
}

fn fallen(defeated: &[UnitId]) -> String {
    if defeated.is_empty() {
        String::new()
    } else {
        format!(", defeated {:?}", ids(defeated))
    }
}
