use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
    rc::Rc,
};

use anyhow::{Context, Result};
use express_core::logic::state_label;
use express_core::{
    CharacterId, Compartment, EntityRecord, InMemorySequences, LedgerDecision, RecordingHost,
    SaveImage, SaveKind, SaveLedger, SaveRequest, TickReport, World, WorldConfig,
};
use serde::Serialize;

use crate::cli::{InspectArgs, SimulateArgs};

#[derive(Debug, Serialize)]
struct SaveTrace {
    request: SaveRequest,
    decision: LedgerDecision,
}

#[derive(Debug, Serialize)]
struct RunTrace<'a> {
    chapter: u8,
    final_tick: u32,
    game_time: u32,
    ticks: &'a [TickReport],
    saves: &'a [SaveTrace],
}

pub fn simulate(args: SimulateArgs) -> Result<()> {
    let SimulateArgs {
        ticks,
        skip_ticks,
        chapter,
        player,
        load,
        save_out,
        trace_json,
        sound_log_json,
        config,
        sequences,
        verbose,
    } = args;

    let config = match config.as_deref() {
        Some(path) => WorldConfig::from_json_file(path)?,
        None => WorldConfig::default(),
    };
    let mut world = World::new(config);
    let host = RecordingHost::new();
    world.set_sound_host(Rc::new(host.clone()));
    world.set_scene_host(Rc::new(host.clone()));
    if let Some(path) = sequences.as_deref() {
        let library = InMemorySequences::from_json_file(path)?;
        println!("Loaded {} sequences from {}", library.len(), path.display());
        world.set_sequence_library(Rc::new(library));
    }

    match load.as_deref() {
        Some(path) => {
            if chapter != 1 {
                eprintln!(
                    "[express_engine] warning: --chapter={chapter} ignored when loading {}",
                    path.display()
                );
            }
            let file = File::open(path)
                .with_context(|| format!("opening save image {}", path.display()))?;
            let header = world
                .load_from(BufReader::new(file))
                .with_context(|| format!("loading save image {}", path.display()))?;
            println!(
                "Loaded {} (chapter {}, game time {})",
                path.display(),
                header.chapter,
                header.game_time
            );
        }
        None => world.setup_chapter(chapter),
    }
    if let Some(placement) = player {
        world.set_viewpoint(placement.car, placement.slot, placement.facing);
    }
    if skip_ticks > 0 {
        world.fast_forward(skip_ticks);
        println!(
            "Skipped {skip_ticks} ticks (game time {})",
            world.clock.game_time
        );
    }

    let mut ledger = SaveLedger::new();
    let mut reports = Vec::with_capacity(ticks as usize);
    let mut saves = Vec::new();
    for _ in 0..ticks {
        let report = world.tick();
        for request in world.take_save_requests() {
            let header = world.header_for_request(&request);
            let decision = ledger.commit(header);
            log::debug!("save request {:?} from {}: {decision:?}", request.kind, request.who);
            saves.push(SaveTrace { request, decision });
        }
        if verbose {
            for entry in &report.events {
                println!("[{:>5}] {entry}", report.tick);
            }
        }
        reports.push(report);
    }

    print_summary(&world);
    println!(
        "Save requests: {} ({} kept in the ledger)",
        saves.len(),
        ledger.entries().len()
    );

    if let Some(path) = save_out.as_ref() {
        let header = world.header_for(SaveKind::Index, CharacterId::CATH, 0);
        let file = File::create(path)
            .with_context(|| format!("creating save image {}", path.display()))?;
        world
            .save_to(header, BufWriter::new(file))
            .with_context(|| format!("writing save image {}", path.display()))?;
        println!("Saved game image to {}", path.display());
    }

    if let Some(path) = trace_json.as_ref() {
        let trace = RunTrace {
            chapter: world.clock.chapter,
            final_tick: world.clock.ticks,
            game_time: world.clock.game_time,
            ticks: &reports,
            saves: &saves,
        };
        write_json(path, &trace, "run trace")?;
    }

    if let Some(path) = sound_log_json.as_ref() {
        write_json(path, &host.events(), "sound log")?;
    }

    Ok(())
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let path = args.save.as_path();
    let file =
        File::open(path).with_context(|| format!("opening save image {}", path.display()))?;
    let image = SaveImage::read_from(BufReader::new(file))
        .with_context(|| format!("decoding save image {}", path.display()))?;

    let header = &image.header;
    println!(
        "Save {:?} by {} (value {}) | chapter {} | game time {}",
        header.kind, header.character, header.value, header.chapter, header.game_time
    );
    println!(
        "Player: {} slot {} facing {:?}",
        image.viewpoint.car.label(),
        image.viewpoint.slot,
        image.viewpoint.facing
    );

    println!("\nActive characters:");
    for record in image.records.iter().filter(|record| record.is_active()) {
        println!("  {}", describe(record));
        if args.verbose {
            for (depth, frame) in record.calls().iter().enumerate() {
                println!(
                    "      {depth}: {} resume={} {:?}",
                    state_label(record.id, frame.state),
                    frame.resume,
                    frame.params
                );
            }
        }
    }

    let views: Vec<_> = image.occupancy.occupied_views().collect();
    println!("\nOccupied view slots: {}", views.len());
    for (car, slot, bits) in views {
        println!("  {} {slot}: {bits:#010x}", car.label());
    }
    for compartment in Compartment::all() {
        if let Some(blocker) = image.occupancy.compartment_blocker(compartment) {
            println!("  compartment {} held by {blocker}", compartment.label());
        }
    }

    println!("\nTimers: {}", image.timers.len());
    for timer in &image.timers {
        println!("  #{} in {} ticks", timer.subroutine, timer.delta);
    }
    println!(
        "Pending messages: {} | auto-messages: {}",
        image.pending.len(),
        image.auto_messages.len()
    );
    Ok(())
}

fn describe(record: &EntityRecord) -> String {
    let state = record
        .current_state()
        .map_or("inert", |state| state_label(record.id, state));
    let mut line = format!(
        "{:<9} {:<11} pos={:<5} {:<9} depth={}",
        record.id.name(),
        record.car.label(),
        record.position,
        state,
        record.current_call()
    );
    if !record.sequence_name.is_empty() {
        line.push_str(&format!(" seq={}", record.sequence_name));
    }
    line
}

fn print_summary(world: &World) {
    println!(
        "Chapter {} | tick {} | game time {}",
        world.clock.chapter, world.clock.ticks, world.clock.game_time
    );
    for who in world.active_characters() {
        println!("  {}", describe(world.record(who)));
    }
    let blocked = world.occupancy.occupied_views().count();
    println!("Occupied view slots: {blocked} | pending messages: {}", world.bus.len());
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {what} to JSON"))?;
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}
