//! Shooter Sim headless runner
//!
//! Loads a mission (or the built-in demo), runs it for a number of ticks with
//! scripted player input and prints the mission results as JSON.
//!
//! Usage: shooter-sim [--mission <path>] [--options <path>] [--seed <n>]
//!                    [--ticks <n>] [--players <1|2>]

use std::env;
use std::error::Error;

use glam::IVec2;
use shooter_sim::audio::{self, SoundId, SoundSink};
use shooter_sim::consts::*;
use shooter_sim::sim::{Command, Direction, SimulationState, TickInput, tick};
use shooter_sim::{GameOptions, MissionConfig};

const DEFAULT_TICKS: u64 = 70 * 60;

/// Sink that traces every sound it hears
struct LogSink;

impl SoundSink for LogSink {
    fn play(&mut self, sound: SoundId, pan: f32, volume: f32) {
        log::trace!("sound {sound:?} pan {pan:.2} volume {volume:.2}");
    }
}

struct Args {
    mission: Option<String>,
    options: Option<String>,
    seed: Option<u64>,
    ticks: u64,
    players: usize,
}

const FLAGS: [&str; 5] = ["--mission", "--options", "--seed", "--ticks", "--players"];

/// Value following `name`; an error when the flag is present without one
fn flag<'a>(args: &'a [String], name: &str) -> Result<Option<&'a str>, Box<dyn Error>> {
    let Some(at) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    match args.get(at + 1) {
        Some(value) if !value.starts_with("--") => Ok(Some(value.as_str())),
        _ => Err(format!("{name} needs a value").into()),
    }
}

fn parse_args(args: &[String]) -> Result<Args, Box<dyn Error>> {
    for arg in args.iter().skip(1).filter(|a| a.starts_with("--")) {
        if !FLAGS.contains(&arg.as_str()) {
            log::warn!("Ignoring unknown flag {arg}");
        }
    }
    Ok(Args {
        mission: flag(args, "--mission")?.map(str::to_owned),
        options: flag(args, "--options")?.map(str::to_owned),
        seed: flag(args, "--seed")?.map(str::parse).transpose()?,
        ticks: flag(args, "--ticks")?.map(str::parse).transpose()?.unwrap_or(DEFAULT_TICKS),
        players: flag(args, "--players")?
            .map(str::parse)
            .transpose()?
            .unwrap_or(1usize)
            .clamp(1, MAX_PLAYERS),
    })
}

/// Wander in a slow circle, firing in bursts
fn scripted_command(tick: u64, slot: usize) -> Command {
    let dir = Direction::from_index((tick / 35) as i32 + 4 * slot as i32);
    Command::toward(dir, tick % 50 < 10)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = parse_args(&env::args().collect::<Vec<_>>())?;

    let config = match &args.mission {
        Some(path) => MissionConfig::load(path)?,
        None => MissionConfig::demo(),
    };
    config.validate()?;
    let options = match &args.options {
        Some(path) => GameOptions::load(path)?,
        None => GameOptions::default(),
    };
    let seed = args.seed.unwrap_or(config.seed);
    log::info!("Shooter Sim starting '{}' with seed {}", config.title, seed);

    let mut state = SimulationState::new(config, options, seed);
    for slot in 0..args.players {
        if state.spawn_player(slot, 0).is_none() {
            log::warn!("Player {} could not be placed", slot + 1);
        }
    }
    state.populate();

    let mut sink = LogSink;
    for t in 0..args.ticks {
        let mut input = TickInput::default();
        for (slot, cmd) in input.commands.iter_mut().enumerate().take(args.players) {
            *cmd = scripted_command(t, slot);
        }
        tick(&mut state, &input);

        let listener = state.player(0).map_or(IVec2::ZERO, |p| p.pixel_pos());
        audio::dispatch_events(&state.drain_events(), &mut sink, listener);

        if state.living_players().next().is_none() {
            log::info!("All players down after {} ticks", t + 1);
            break;
        }
        if !state.mission.objectives.is_empty() && state.results().complete {
            log::info!("Mission complete after {} ticks", t + 1);
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(&state.results())?);
    Ok(())
}
