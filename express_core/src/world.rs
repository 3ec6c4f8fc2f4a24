//! The world context: every record, the shared occupancy tables, the bus,
//! timers, clocks and host handles.

use std::rc::Rc;

use serde::Serialize;

use crate::config::WorldConfig;
use crate::host::{NullHost, SceneHost, SoundHost};
use crate::occupancy::{OccupancyMap, SlotKey};
use crate::record::EntityRecord;
use crate::savegame::SaveKind;
use crate::savepoint::{MessageParam, SavePointBus};
use crate::sequence::{NoSequences, Point, SequenceLibrary};
use crate::timers::TimerList;
use crate::types::{scene_position, Action, Car, CharacterId, Compartment, Facing, Location};

pub const BUMP_DIALOG: &str = "CAT1127A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Clock {
    pub game_time: u32,
    pub ticks: u32,
    pub chapter: u8,
}

/// Where the player's camera is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Viewpoint {
    pub car: Car,
    pub slot: u8,
    pub facing: Facing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRequest {
    pub who: CharacterId,
    pub kind: SaveKind,
    pub event: u32,
    pub game_time: u32,
    pub tick: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningDialog {
    pub who: CharacterId,
    pub name: String,
    pub remaining: u16,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SweepFlags {
    /// Raised when the callback sweep is re-entered; running passes bail out.
    pub aborted: bool,
    pub running: bool,
}

pub struct World {
    records: Vec<EntityRecord>,
    pub occupancy: OccupancyMap,
    pub bus: SavePointBus,
    pub timers: TimerList,
    pub clock: Clock,
    viewpoint: Viewpoint,
    config: WorldConfig,
    sound: Rc<dyn SoundHost>,
    scene: Rc<dyn SceneHost>,
    sequences: Rc<dyn SequenceLibrary>,
    pub(crate) dialogs: Vec<RunningDialog>,
    save_requests: Vec<SaveRequest>,
    events: Vec<String>,
    pub(crate) sweep: SweepFlags,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let records = CharacterId::all()
            .map(|id| EntityRecord::new(id, config.walk_step(id)))
            .collect();
        Self {
            records,
            occupancy: OccupancyMap::new(),
            bus: SavePointBus::new(),
            timers: TimerList::new(),
            clock: Clock::default(),
            viewpoint: Viewpoint::default(),
            config,
            sound: Rc::new(NullHost),
            scene: Rc::new(NullHost),
            sequences: Rc::new(NoSequences),
            dialogs: Vec::new(),
            save_requests: Vec::new(),
            events: Vec::new(),
            sweep: SweepFlags::default(),
        }
    }

    pub fn set_sound_host(&mut self, host: Rc<dyn SoundHost>) {
        self.sound = host;
    }

    pub fn set_scene_host(&mut self, host: Rc<dyn SceneHost>) {
        self.scene = host;
    }

    pub fn set_sequence_library(&mut self, library: Rc<dyn SequenceLibrary>) {
        self.sequences = library;
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub(crate) fn sound(&self) -> &dyn SoundHost {
        self.sound.as_ref()
    }

    pub(crate) fn sequences(&self) -> Rc<dyn SequenceLibrary> {
        Rc::clone(&self.sequences)
    }

    pub fn record(&self, id: CharacterId) -> &EntityRecord {
        &self.records[id.index()]
    }

    pub fn record_mut(&mut self, id: CharacterId) -> &mut EntityRecord {
        &mut self.records[id.index()]
    }

    /// Read accessor for the rendering side.
    pub fn data(&self, id: CharacterId) -> &EntityRecord {
        self.record(id)
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn active_characters(&self) -> impl Iterator<Item = CharacterId> + '_ {
        CharacterId::npcs().filter(|id| self.record(*id).is_active())
    }

    pub fn viewpoint(&self) -> Viewpoint {
        self.viewpoint
    }

    /// Moves the player's camera and keeps the player record in step.
    pub fn set_viewpoint(&mut self, car: Car, slot: u8, facing: Facing) {
        self.viewpoint = Viewpoint { car, slot, facing };
        let player = self.record_mut(CharacterId::CATH);
        player.car = car;
        player.position = scene_position(slot);
        player.location = Location::OutsideCompartment;
    }

    pub fn player_at(&self, car: Car, slot: u8) -> bool {
        self.viewpoint.car == car && self.viewpoint.slot == slot
    }

    pub fn log_event(&mut self, entry: String) {
        log::debug!("{entry}");
        self.events.push(entry);
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn request_save(&mut self, who: CharacterId, kind: SaveKind, event: u32) {
        let request = SaveRequest {
            who,
            kind,
            event,
            game_time: self.clock.game_time,
            tick: self.clock.ticks,
        };
        self.log_event(format!("{who}.save kind={kind:?} event={event}"));
        self.save_requests.push(request);
    }

    pub fn save_requests(&self) -> &[SaveRequest] {
        &self.save_requests
    }

    pub fn take_save_requests(&mut self) -> Vec<SaveRequest> {
        std::mem::take(&mut self.save_requests)
    }

    pub fn send(&mut self, from: CharacterId, to: CharacterId, action: Action, param: MessageParam) {
        self.bus.push(from, to, action, param);
    }

    pub fn send_all(&mut self, from: CharacterId, action: Action, param: MessageParam) {
        self.bus.push_all(from, action, param);
    }

    /// Immediate delivery.
    pub fn fed_ex(&mut self, from: CharacterId, to: CharacterId, action: Action, param: MessageParam) {
        crate::savepoint::call(self, from, to, action, param);
    }

    pub fn process(&mut self) {
        crate::savepoint::process(self);
    }

    pub(crate) fn auto_message(&mut self, who: CharacterId, action: Action, latch: u8) {
        self.bus.add_auto_message(who, action, latch);
    }

    // Dialogs

    pub fn play_dialog(&mut self, who: CharacterId, name: &str) {
        self.dialogs.retain(|dialog| dialog.who != who);
        self.sound.play_dialog(who, name);
        self.dialogs.push(RunningDialog {
            who,
            name: name.to_string(),
            remaining: self.config.dialog_ticks,
        });
    }

    pub fn dialogs(&self) -> &[RunningDialog] {
        &self.dialogs
    }

    pub fn is_dialog_running(&self, who: CharacterId) -> bool {
        self.dialogs.iter().any(|dialog| dialog.who == who)
    }

    /// Stops `who`'s dialog without notifying the character.
    pub fn stop_dialog(&mut self, who: CharacterId) {
        let before = self.dialogs.len();
        self.dialogs.retain(|dialog| dialog.who != who);
        if self.dialogs.len() != before {
            self.sound.stop(who);
        }
    }

    /// Ends `who`'s dialog now and queues `EndSound` for them.
    pub fn finish_dialog(&mut self, who: CharacterId) {
        let before = self.dialogs.len();
        self.dialogs.retain(|dialog| dialog.who != who);
        if self.dialogs.len() != before {
            self.send(CharacterId::CATH, who, Action::END_SOUND, MessageParam::None);
        }
    }

    pub(crate) fn tick_dialogs(&mut self) {
        let mut finished = Vec::new();
        for dialog in &mut self.dialogs {
            dialog.remaining = dialog.remaining.saturating_sub(1);
            if dialog.remaining == 0 {
                finished.push(dialog.who);
            }
        }
        for who in finished {
            self.finish_dialog(who);
        }
    }

    // Presence

    /// Plays `who`'s excuse-me at the player, bumps the camera and has the
    /// player apologise.
    pub(crate) fn bump_player(&mut self, who: CharacterId) {
        self.sound.excuse_me(who, CharacterId::CATH);
        let Viewpoint { car, slot, .. } = self.viewpoint;
        self.scene.load_scene_from_position(car, slot);
        self.play_dialog(CharacterId::CATH, BUMP_DIALOG);
        self.log_event(format!("{who}.bump_player car={} slot={slot}", car.label()));
        self.announce_scene();
    }

    pub(crate) fn load_scene(&mut self, car: Car, slot: u8) {
        self.scene.load_scene_from_position(car, slot);
        let facing = self.viewpoint.facing;
        self.set_viewpoint(car, slot, facing);
        self.announce_scene();
    }

    /// Every character hears `DrawScene` after a scene load. Called from a
    /// handler, the notices wait for the drain already running.
    fn announce_scene(&mut self) {
        self.send_all(CharacterId::CATH, Action::DRAW_SCENE, MessageParam::None);
        self.process();
    }

    /// Marks `who` as standing in a view slot, bumping the player when the
    /// slot is the one currently in view.
    pub fn block_view(&mut self, who: CharacterId, car: Car, slot: u8) {
        self.occupancy.enter(who, SlotKey::view(car, slot));
        if who.occupancy_bit().is_none() {
            return;
        }
        let in_view = self.player_at(car, slot)
            || (car == Car::Restaurant && slot == 57 && self.player_at(Car::Restaurant, 50));
        if in_view {
            self.bump_player(who);
        }
    }

    pub fn release_view(&mut self, who: CharacterId, car: Car, slot: u8) {
        self.occupancy.exit(who, SlotKey::view(car, slot));
    }

    fn block_doorway(&mut self, who: CharacterId, compartment: Compartment, key: SlotKey) {
        if who.occupancy_bit().is_none() {
            return;
        }
        let car = compartment.car();
        let (view_a, view_b) = compartment.view_slots();
        let (player_a, player_b) = compartment.player_slots();
        self.occupancy.enter(who, SlotKey::view(car, view_a));
        self.occupancy.enter(who, SlotKey::view(car, view_b));
        self.occupancy.enter(who, key);
        if [view_a, view_b, player_a, player_b]
            .into_iter()
            .any(|slot| self.player_at(car, slot))
        {
            self.bump_player(who);
        }
    }

    pub fn block_at_door(&mut self, who: CharacterId, compartment: Compartment) {
        self.block_doorway(who, compartment, SlotKey::Compartment(compartment));
    }

    pub fn soft_block_at_door(&mut self, who: CharacterId, compartment: Compartment) {
        self.block_doorway(who, compartment, SlotKey::SoftCompartment(compartment));
    }

    pub fn release_at_door(&mut self, who: CharacterId, compartment: Compartment) {
        self.release_doorway(who, compartment, SlotKey::Compartment(compartment));
    }

    pub fn release_soft_at_door(&mut self, who: CharacterId, compartment: Compartment) {
        self.release_doorway(who, compartment, SlotKey::SoftCompartment(compartment));
    }

    /// Undoes `block_doorway`. Only the table named by `key` is cleared.
    fn release_doorway(&mut self, who: CharacterId, compartment: Compartment, key: SlotKey) {
        let car = compartment.car();
        let (view_a, view_b) = compartment.view_slots();
        self.occupancy.exit(who, SlotKey::view(car, view_a));
        self.occupancy.exit(who, SlotKey::view(car, view_b));
        self.occupancy.exit(who, key);
    }

    pub fn release_everything(&mut self, who: CharacterId) {
        self.occupancy.clear_character(who);
        self.record_mut(who).entered_view = None;
    }

    fn in_public_restaurant(&self, who: CharacterId) -> bool {
        let record = self.record(who);
        record.location == Location::OutsideCompartment
            && record.car == Car::Restaurant
            && (1540..=5800).contains(&record.position)
    }

    /// True when no tracked character stands in the salon or dining room.
    pub fn rc_clear(&self) -> bool {
        (1..=CharacterId::MASTER.raw())
            .filter_map(CharacterId::new)
            .all(|who| !self.in_public_restaurant(who))
    }

    /// Character under `point`, nearest first, among those drawn with a
    /// hotspot and carrying an inventory item. Falls back to the player.
    pub fn can_interact_with(&self, point: Point) -> CharacterId {
        let player_position = self.record(CharacterId::CATH).position;
        let mut best: Option<(i32, CharacterId)> = None;
        for who in CharacterId::npcs() {
            let record = self.record(who);
            let hit = record
                .drawn_frame
                .and_then(|frame| frame.hotspot)
                .is_some_and(|hotspot| hotspot.contains(point));
            if !hit {
                continue;
            }
            let depth = who.raw() as i32 + (record.position - player_position).abs();
            if best.map_or(true, |(best_depth, _)| depth < best_depth) {
                best = Some((depth, who));
            }
        }
        match best {
            Some((_, who)) if self.record(who).inventory_item != 0 => who,
            _ => CharacterId::CATH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEvent, RecordingHost};
    use crate::sequence::{FrameInfo, Hotspot};

    fn world_with_host() -> (World, RecordingHost) {
        let mut world = World::default();
        let host = RecordingHost::new();
        world.set_sound_host(Rc::new(host.clone()));
        world.set_scene_host(Rc::new(host.clone()));
        (world, host)
    }

    #[test]
    fn blocking_the_viewed_slot_bumps_the_player() {
        let (mut world, host) = world_with_host();
        world.set_viewpoint(Car::Restaurant, 63, Facing::Up);

        world.block_view(CharacterId::ALEXEI, Car::Restaurant, 62);
        assert!(host.events().is_empty());

        world.block_view(CharacterId::ALEXEI, Car::Restaurant, 63);
        assert_eq!(
            host.events()[0],
            HostEvent::ExcuseMe {
                who: CharacterId::ALEXEI,
                to: CharacterId::CATH
            }
        );
        assert_eq!(host.dialogs(), vec![BUMP_DIALOG.to_string()]);
        assert!(world
            .occupancy
            .is_occupied_by(SlotKey::view(Car::Restaurant, 63), CharacterId::ALEXEI));
    }

    #[test]
    fn door_blocks_cover_views_and_compartment() {
        let (mut world, host) = world_with_host();
        world.set_viewpoint(Car::RedSleeping, 28, Facing::Down);
        let red_f = Compartment::from_door(37).expect("door 37");

        world.block_at_door(CharacterId::ANNA, red_f);
        assert_eq!(world.occupancy.compartment_blocker(red_f), Some(CharacterId::ANNA));
        assert!(world
            .occupancy
            .is_occupied_by(SlotKey::view(Car::RedSleeping, 46), CharacterId::ANNA));
        assert_eq!(host.dialogs().len(), 1);

        world.release_at_door(CharacterId::ANNA, red_f);
        assert_eq!(world.occupancy.compartment_blocker(red_f), None);
        assert_eq!(world.occupancy.occupied_views().count(), 0);
        assert_eq!(world.occupancy.redundant_transitions(), 0);
    }

    #[test]
    fn paired_soft_block_and_release_is_not_redundant() {
        let mut world = World::default();
        let green_3 = Compartment::from_door(3).expect("door 3");

        world.soft_block_at_door(CharacterId::COND1, green_3);
        assert!(world
            .occupancy
            .is_occupied_by(SlotKey::SoftCompartment(green_3), CharacterId::COND1));
        assert!(!world.occupancy.is_occupied(SlotKey::Compartment(green_3)));

        world.release_soft_at_door(CharacterId::COND1, green_3);
        assert!(!world.occupancy.is_occupied(SlotKey::SoftCompartment(green_3)));
        assert_eq!(world.occupancy.occupied_views().count(), 0);
        assert_eq!(world.occupancy.redundant_transitions(), 0);

        world.release_soft_at_door(CharacterId::COND1, green_3);
        assert_eq!(world.occupancy.redundant_transitions(), 3);
    }

    #[test]
    fn interaction_needs_an_item_carrier() {
        let mut world = World::default();
        world.set_viewpoint(Car::Restaurant, 63, Facing::Up);
        let frame = FrameInfo {
            hotspot: Some(Hotspot {
                left: 0,
                top: 0,
                right: 100,
                bottom: 100,
            }),
            ..FrameInfo::default()
        };
        world.record_mut(CharacterId::ALEXEI).drawn_frame = Some(frame);

        let point = Point { x: 10, y: 10 };
        assert_eq!(world.can_interact_with(point), CharacterId::CATH);

        world.record_mut(CharacterId::ALEXEI).inventory_item = 0x80;
        assert_eq!(world.can_interact_with(point), CharacterId::ALEXEI);
        assert_eq!(world.can_interact_with(Point { x: 150, y: 10 }), CharacterId::CATH);
    }

    #[test]
    fn restaurant_clear_ignores_compartment_and_kitchen() {
        let mut world = World::default();
        assert!(world.rc_clear());

        let anna = world.record_mut(CharacterId::ANNA);
        anna.car = Car::Restaurant;
        anna.position = 6000;
        assert!(world.rc_clear());

        world.record_mut(CharacterId::ANNA).position = 3969;
        assert!(!world.rc_clear());
    }

    #[test]
    fn dialogs_end_with_end_sound() {
        let (mut world, host) = world_with_host();
        world.play_dialog(CharacterId::TATIANA, "TAT1133A");
        assert!(world.is_dialog_running(CharacterId::TATIANA));

        for _ in 0..world.config().dialog_ticks {
            world.tick_dialogs();
        }
        assert!(!world.is_dialog_running(CharacterId::TATIANA));
        let queued: Vec<_> = world.bus.pending().cloned().collect();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].action, Action::END_SOUND);
        assert_eq!(queued[0].recipient, CharacterId::TATIANA);
        assert_eq!(host.dialogs(), vec!["TAT1133A".to_string()]);
    }
}
