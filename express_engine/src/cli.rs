use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use express_core::types::MAX_VIEW_SLOT;
use express_core::{Car, Facing};

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that runs the train's character simulation",
    version
)]
pub struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    pub ticks: u32,

    /// Ticks to skip before simulating: walkers advance, scripts stay idle
    #[arg(long, default_value_t = 0)]
    pub skip_ticks: u32,

    /// Chapter to set up when no save is loaded (1-5)
    #[arg(long, default_value_t = 1)]
    pub chapter: u8,

    /// Car the player stands in (green, red, restaurant, ...)
    #[arg(long)]
    pub player_car: Option<String>,

    /// Scene slot the player looks from
    #[arg(long)]
    pub player_slot: Option<u8>,

    /// Direction the player faces along the corridor (up, down, none)
    #[arg(long, default_value = "up")]
    pub facing: String,

    /// Save image to start from instead of a fresh chapter
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Path to write the save image taken after the last tick
    #[arg(long)]
    pub save_out: Option<PathBuf>,

    /// Path to write the per-tick trace (events, timers, save requests) as JSON
    #[arg(long)]
    pub trace_json: Option<PathBuf>,

    /// Path to write every sound and scene call as JSON
    #[arg(long)]
    pub sound_log_json: Option<PathBuf>,

    /// Print a save image instead of simulating
    #[arg(long, value_name = "SAVE")]
    pub inspect: Option<PathBuf>,

    /// JSON file overriding the world configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON sequence table giving frame metadata to the simulation
    #[arg(long)]
    pub sequences: Option<PathBuf>,

    /// Print every event as it happens
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Command {
    Simulate(SimulateArgs),
    Inspect(InspectArgs),
}

/// Where the player's camera is placed before the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub car: Car,
    pub slot: u8,
    pub facing: Facing,
}

#[derive(Debug)]
pub struct SimulateArgs {
    pub ticks: u32,
    pub skip_ticks: u32,
    pub chapter: u8,
    pub player: Option<Placement>,
    pub load: Option<PathBuf>,
    pub save_out: Option<PathBuf>,
    pub trace_json: Option<PathBuf>,
    pub sound_log_json: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub sequences: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct InspectArgs {
    pub save: PathBuf,
    pub verbose: bool,
}

pub fn parse() -> Result<Command> {
    let args = Args::parse();
    args.into_command()
}

fn parse_facing(label: &str) -> Result<Facing> {
    match label.to_ascii_lowercase().as_str() {
        "up" => Ok(Facing::Up),
        "down" => Ok(Facing::Down),
        "none" => Ok(Facing::None),
        other => bail!("unknown facing '{other}' (expected up, down or none)"),
    }
}

impl Args {
    fn into_command(self) -> Result<Command> {
        if let Some(save) = self.inspect {
            if self.load.is_some() || self.save_out.is_some() {
                bail!("--inspect cannot be combined with --load or --save-out");
            }
            return Ok(Command::Inspect(InspectArgs {
                save,
                verbose: self.verbose,
            }));
        }

        if !(1..=5).contains(&self.chapter) {
            bail!("--chapter must be between 1 and 5, got {}", self.chapter);
        }
        let facing = parse_facing(&self.facing)?;
        let player = match (self.player_car.as_deref(), self.player_slot) {
            (None, None) if self.load.is_some() => None,
            (None, None) => Some(Placement {
                car: Car::Restaurant,
                slot: 61,
                facing,
            }),
            (Some(label), slot) => {
                let Some(car) = Car::from_label(label) else {
                    bail!("unknown car '{label}'");
                };
                Some(Placement {
                    car,
                    slot: slot.unwrap_or(1),
                    facing,
                })
            }
            (None, Some(_)) => bail!("--player-slot requires --player-car"),
        };
        if let Some(placement) = player {
            if placement.slot > MAX_VIEW_SLOT {
                bail!("--player-slot must be at most {MAX_VIEW_SLOT}");
            }
        }

        Ok(Command::Simulate(SimulateArgs {
            ticks: self.ticks,
            skip_ticks: self.skip_ticks,
            chapter: self.chapter,
            player,
            load: self.load,
            save_out: self.save_out,
            trace_json: self.trace_json,
            sound_log_json: self.sound_log_json,
            config: self.config,
            sequences: self.sequences,
            verbose: self.verbose,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["express_engine"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_place_the_player_in_the_restaurant() -> Result<()> {
        match args(&[]).into_command()? {
            Command::Simulate(simulate) => {
                assert_eq!(simulate.ticks, 100);
                assert_eq!(simulate.skip_ticks, 0);
                assert_eq!(
                    simulate.player,
                    Some(Placement {
                        car: Car::Restaurant,
                        slot: 61,
                        facing: Facing::Up
                    })
                );
            }
            other => panic!("expected simulate, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn loading_keeps_the_saved_viewpoint() -> Result<()> {
        match args(&["--load", "game.lxsv"]).into_command()? {
            Command::Simulate(simulate) => assert_eq!(simulate.player, None),
            other => panic!("expected simulate, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--chapter", "7"]).into_command().is_err());
        assert!(args(&["--player-car", "caboose"]).into_command().is_err());
        assert!(args(&["--player-slot", "4"]).into_command().is_err());
        assert!(args(&["--facing", "sideways"]).into_command().is_err());
        assert!(args(&["--inspect", "a", "--save-out", "b"])
            .into_command()
            .is_err());
    }
}
