//! Walking along the train, one step per call.
//!
//! `update_entity` moves a character toward a target car and position and
//! reports arrival. Before stepping it gives way to blocked compartment
//! doorways and to characters walking the other way. After stepping it
//! crosses car boundaries and warns the player when the walker is about to
//! reach them.

use crate::logic::cast::in_car_bounds;
use crate::occupancy::SlotKey;
use crate::savepoint::MessageParam;
use crate::types::{Action, Car, CharacterId, Clothes, Compartment, Direction, Facing, Location, Position};
use crate::world::{World, BUMP_DIALOG};

/// Same-car distance under which a walker snaps to the target.
const SNAP_DISTANCE: Position = 100;
/// Wider snap distance allowed away from the car ends.
const CORRIDOR_SNAP_DISTANCE: Position = 300;

/// Leaving past these positions moves the walker into the next car.
const CAR_TOP: Position = 9270;
const CAR_BOTTOM: Position = 850;
const ENTRY_FROM_BELOW: Position = 851;
const ENTRY_FROM_ABOVE: Position = 9269;

/// Range within which doorways, walkers and the conductor seat interact.
const NEAR: Position = 750;
const CONDUCTOR_ZONE: Position = 1500;
const CONDUCTOR_SEAT: Position = 2000;
const PLAYER_MARGIN: Position = 500;

const DOOR_OPEN_SOUND: u8 = 36;
const DOOR_CLOSE_SOUND: u8 = 37;
const DOOR_CLOSE_DELAY: u8 = 30;
const BUMP_START_SOUND: u8 = 14;
const BUMP_END_SOUND: u8 = 15;

/// Entrance platform of the Green car.
const LOW_PLATFORM_END: Position = 850;
/// The Kronos car entrance lies above this position.
const KRONOS_PLATFORM_END: Position = 7900;
const LOW_PLATFORM_SLOT: u8 = 1;
const KRONOS_PLATFORM_SLOT: u8 = 62;

/// Pairs that walk together and never give way to each other.
const WALKING_PAIRS: [(CharacterId, CharacterId); 3] = [
    (CharacterId::REBECCA, CharacterId::SOPHIE),
    (CharacterId::IVO, CharacterId::SALKO),
    (CharacterId::MILOS, CharacterId::VESNA),
];

fn walk_sequence_name(who: CharacterId, clothes: Clothes, direction: Direction) -> String {
    let suffix = if direction == Direction::Up { 'u' } else { 'd' };
    format!("{:02}{}-03{suffix}", who.raw(), clothes as u8)
}

fn sleeping_car_conductor(car: Car) -> Option<CharacterId> {
    match car {
        Car::GreenSleeping => Some(CharacterId::COND1),
        Car::RedSleeping => Some(CharacterId::COND2),
        _ => None,
    }
}

fn walking_pair(a: CharacterId, b: CharacterId) -> bool {
    WALKING_PAIRS
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

impl World {
    /// Advances `who` one step toward `(car, position)`. Returns true once
    /// the character stands exactly on the target.
    pub fn update_entity(&mut self, who: CharacterId, car: Car, position: Position) -> bool {
        assert!(who != CharacterId::CATH, "the player does not walk scripted");
        assert!(car != Car::None, "{who}: walk target car is none");
        assert!(in_car_bounds(position), "{who}: walk target {position} outside the car");

        let position = self.redirect_target(position);

        if !self.record(who).direction.is_walking() {
            self.record_mut(who).walk_wait = 0;
        }
        let mut burst = false;
        if self.record(who).walk_wait > 0 {
            let record = self.record_mut(who);
            record.walk_wait -= 1;
            if record.walk_wait > 0 {
                return false;
            }
            burst = true;
        }

        let record = self.record(who);
        if car == record.car {
            let delta = (record.position - position).abs();
            let in_corridor = position > CAR_BOTTOM && position < CAR_TOP;
            if delta < SNAP_DISTANCE || (in_corridor && delta < CORRIDOR_SNAP_DISTANCE) {
                return self.arrive(who, car, position);
            }
        }

        let direction = if car != record.car {
            if car > record.car {
                Direction::Up
            } else {
                Direction::Down
            }
        } else if position > record.position {
            Direction::Up
        } else {
            Direction::Down
        };

        if direction != record.direction {
            let name = walk_sequence_name(who, record.clothes, direction);
            self.begin_sequence(who, &name, direction);
            self.log_event(format!("{who}.walk car={} pos={position}", car as u8));
        }

        self.track_conductor(who, direction, car, position);

        if let Some(blocker) = self.doorway_blocker(who, direction, car, position) {
            self.record_mut(who).squeeze = true;
            self.send(blocker, who, Action::EXCUSE_ME, MessageParam::None);
            self.log_event(format!("{who}.blocked_by {blocker}"));
            return false;
        }

        if !burst {
            if let Some(other) = self.oncoming_walker(who, direction) {
                let wait = self.config().opposite_wait_ticks;
                self.record_mut(who).walk_wait = wait;
                self.record_mut(other).walk_wait = wait;
                self.send(other, who, Action::EXCUSE_ME, MessageParam::None);
                self.send(who, other, Action::EXCUSE_ME, MessageParam::None);
                self.log_event(format!("{who}.give_way {other}"));
                return false;
            }
        }

        let multiplier = self.config().squeeze_multiplier;
        let record = self.record_mut(who);
        let mut step = record.walk_step;
        if record.squeeze {
            step *= multiplier;
            record.squeeze = false;
        }
        record.position = match direction {
            Direction::Up => (record.position + step).min(10_000),
            _ => (record.position - step).max(0),
        };

        let record = self.record(who);
        if car == record.car {
            let crossed = match direction {
                Direction::Up => record.position >= position,
                _ => record.position <= position,
            };
            if crossed {
                return self.arrive(who, car, position);
            }
        }

        let leaving = car != record.car
            && match direction {
                Direction::Up => record.position > CAR_TOP,
                _ => record.position < CAR_BOTTOM,
            };
        if leaving && self.change_car(who, direction, car, position) {
            return true;
        }

        self.warn_player(who, direction);
        false
    }

    /// The conductor seat target becomes the corridor end when the player is
    /// looking up the corridor away from the first compartments.
    fn redirect_target(&self, position: Position) -> Position {
        let viewpoint = self.viewpoint();
        if position == CONDUCTOR_SEAT
            && viewpoint.facing == Facing::Up
            && !self.player_at(Car::GreenSleeping, 1)
            && !self.player_at(Car::RedSleeping, 2)
        {
            CONDUCTOR_ZONE
        } else {
            position
        }
    }

    fn arrive(&mut self, who: CharacterId, car: Car, position: Position) -> bool {
        if let Some(conductor) = self.record_mut(who).attached_conductor.take() {
            self.send(who, conductor, Action::ACTION16, MessageParam::None);
        }
        let was_walking = self.record(who).direction.is_walking();
        let record = self.record_mut(who);
        record.car = car;
        record.position = position;
        record.walk_wait = 0;
        record.squeeze = false;
        if was_walking {
            self.end_graphics(who);
        }
        self.log_event(format!("{who}.arrive car={} pos={position}", car as u8));
        true
    }

    /// Walkers passing the conductor seat ask the car's conductor to stand
    /// aside, and release them once clear of it.
    fn track_conductor(&mut self, who: CharacterId, direction: Direction, car: Car, target: Position) {
        let record = self.record(who);
        let conductor = sleeping_car_conductor(record.car).filter(|conductor| *conductor != who);
        let near = (record.position - CONDUCTOR_ZONE).abs() <= NEAR && who != CharacterId::FRANCOIS;

        if !near || conductor.is_none() {
            if let Some(attached) = self.record_mut(who).attached_conductor.take() {
                self.send(who, attached, Action::ACTION16, MessageParam::None);
            }
            return;
        }
        if record.attached_conductor.is_some() {
            return;
        }

        let leaves_car = car != record.car;
        let passing = match direction {
            Direction::Up => {
                record.position < CONDUCTOR_ZONE && (leaves_car || target > CONDUCTOR_SEAT)
            }
            _ => record.position > CONDUCTOR_ZONE && (leaves_car || target < CONDUCTOR_ZONE),
        };
        if let (true, Some(conductor)) = (passing, conductor) {
            self.record_mut(who).attached_conductor = Some(conductor);
            self.send(who, conductor, Action::ACTION11, MessageParam::None);
        }
    }

    /// Character standing in a doorway the walker is about to pass.
    fn doorway_blocker(
        &self,
        who: CharacterId,
        direction: Direction,
        car: Car,
        target: Position,
    ) -> Option<CharacterId> {
        let record = self.record(who);
        let leaves_car = car != record.car;
        Compartment::in_car(record.car).find_map(|compartment| {
            let door = compartment.door_position();
            let ahead = match direction {
                Direction::Up => record.position < door && (leaves_car || target > door),
                _ => record.position > door && (leaves_car || target < door),
            };
            if !ahead || (record.position - door).abs() > NEAR {
                return None;
            }
            self.occupancy
                .first_other_occupant(SlotKey::Compartment(compartment), who)
                .or_else(|| {
                    self.occupancy
                        .first_other_occupant(SlotKey::SoftCompartment(compartment), who)
                })
        })
    }

    /// Nearby character in the same car walking toward `who`.
    fn oncoming_walker(&self, who: CharacterId, direction: Direction) -> Option<CharacterId> {
        let record = self.record(who);
        self.active_characters().find(|other| {
            let them = self.record(*other);
            *other != who
                && them.car == record.car
                && them.direction.is_walking()
                && them.direction != direction
                && (them.position - record.position).abs() <= NEAR
                && !walking_pair(who, *other)
                && match direction {
                    Direction::Up => record.position < them.position,
                    _ => record.position > them.position,
                }
        })
    }

    /// Moves `who` into the adjacent car. Returns true when that overshoots
    /// the target, in which case the walker is placed on it.
    fn change_car(&mut self, who: CharacterId, direction: Direction, car: Car, target: Position) -> bool {
        self.door_sounds(who);

        let record = self.record(who);
        let (next, entry) = match direction {
            Direction::Up => (record.car.next(), ENTRY_FROM_BELOW),
            _ => (record.car.prev(), ENTRY_FROM_ABOVE),
        };
        let Some(next) = next else {
            panic!("{who}: no car beyond {:?} going {}", record.car, direction.label());
        };
        let record = self.record_mut(who);
        record.car = next;
        record.position = entry;
        self.log_event(format!("{who}.car {}", next.label()));

        let player = self.record(CharacterId::CATH);
        let on_low_platform = player.car == Car::GreenSleeping && player.position < LOW_PLATFORM_END;
        let on_kronos_platform = player.car == Car::Kronos && player.position > KRONOS_PLATFORM_END;
        let entrance = matches!(
            (direction, next),
            (Direction::Up, Car::GreenSleeping) | (Direction::Down, Car::Kronos)
        );
        if entrance && on_low_platform {
            self.entrance_bump(who, LOW_PLATFORM_SLOT);
        }

        let overshot = match direction {
            Direction::Up => next > car || (next == car && entry >= target),
            _ => next < car || (next == car && entry <= target),
        };
        if overshot {
            return self.arrive(who, car, target);
        }

        if entrance && on_kronos_platform {
            self.entrance_bump(who, KRONOS_PLATFORM_SLOT);
        }
        self.door_sounds(who);
        false
    }

    fn door_sounds(&self, who: CharacterId) {
        if self.record(CharacterId::CATH).car == self.record(who).car {
            self.sound().play_event(who, DOOR_OPEN_SOUND, 0);
            self.sound().play_event(who, DOOR_CLOSE_SOUND, DOOR_CLOSE_DELAY);
        }
    }

    /// A walker coming through the Green car entrance pushes the player
    /// standing on the platform back into the corridor.
    fn entrance_bump(&mut self, who: CharacterId, slot: u8) {
        self.sound().play_event(CharacterId::CATH, BUMP_START_SOUND, 0);
        self.sound().excuse_me(who, CharacterId::CATH);
        self.load_scene(Car::GreenSleeping, slot);
        self.play_dialog(CharacterId::CATH, BUMP_DIALOG);
        self.sound().play_event(CharacterId::CATH, BUMP_END_SOUND, 0);
        self.log_event(format!("{who}.entrance_bump slot={slot}"));
    }

    /// Tells the player a walker is one step away from them.
    fn warn_player(&mut self, who: CharacterId, direction: Direction) {
        let player = self.record(CharacterId::CATH);
        let record = self.record(who);
        if player.car != record.car || player.location != Location::OutsideCompartment {
            return;
        }
        let gap = match direction {
            Direction::Up => player.position - record.position,
            _ => record.position - player.position,
        };
        if gap < PLAYER_MARGIN || gap >= record.walk_step + PLAYER_MARGIN {
            return;
        }
        let action = match (direction, self.viewpoint().facing) {
            (_, Facing::None) => return,
            (Direction::Up, Facing::Up) | (Direction::Down, Facing::Down) => Action::EXCUSE_ME,
            _ => Action::EXCUSE_ME_CATH,
        };
        self.send(CharacterId::CATH, who, action, MessageParam::None);
    }

    /// Fast-forwards every active character by one tick without drawing.
    pub fn update_fields(&mut self) {
        let walkers: Vec<CharacterId> = self.active_characters().collect();
        for who in walkers {
            let record = self.record_mut(who);
            let step = record.walk_step;
            match record.direction {
                Direction::Up if record.position < 10_000 - step => record.position += step,
                Direction::Down if record.position > step => record.position -= step,
                Direction::Right => record.progress += 9,
                Direction::Left => {
                    let frames = record.sequence().map_or(0, |sequence| sequence.len() as i16);
                    if frames > 0 {
                        record.current_frame = (record.current_frame + 1).rem_euclid(frames);
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::host::{HostEvent, RecordingHost};
    use crate::logic::CommonState;
    use crate::params::StateParams;

    fn parked(world: &mut World, who: CharacterId, car: Car, position: Position) {
        world.force_jump(who, CommonState::Parked, StateParams::Empty);
        let record = world.record_mut(who);
        record.car = car;
        record.position = position;
        record.location = Location::OutsideCompartment;
    }

    fn world() -> World {
        let mut world = World::default();
        world.setup_chapter(1);
        world
    }

    #[test]
    fn walks_three_steps_to_a_door() {
        let mut world = world();
        let august = CharacterId::AUGUST;
        parked(&mut world, august, Car::GreenSleeping, 6470);

        assert!(!world.update_entity(august, Car::GreenSleeping, 8200));
        assert_eq!(world.record(august).position, 7220);
        assert_eq!(world.record(august).direction, Direction::Up);
        assert_eq!(world.record(august).sequence_name, "020-03u");
        assert!(!world.update_entity(august, Car::GreenSleeping, 8200));
        assert_eq!(world.record(august).position, 7970);
        assert!(world.update_entity(august, Car::GreenSleeping, 8200));

        let record = world.record(august);
        assert_eq!((record.car, record.position), (Car::GreenSleeping, 8200));
        assert_eq!(record.direction, Direction::None);
    }

    #[test]
    fn crosses_into_the_next_car() {
        let mut world = world();
        let host = RecordingHost::new();
        world.set_sound_host(Rc::new(host.clone()));
        world.set_viewpoint(Car::GreenSleeping, 5, Facing::Down);
        let anna = CharacterId::ANNA;
        parked(&mut world, anna, Car::GreenSleeping, 9000);

        assert!(!world.update_entity(anna, Car::RedSleeping, 4070));
        let record = world.record(anna);
        assert_eq!((record.car, record.position), (Car::RedSleeping, ENTRY_FROM_BELOW));
        let door_sounds = host
            .events()
            .iter()
            .filter(|event| matches!(event, HostEvent::Sound { code: 36 | 37, .. }))
            .count();
        assert_eq!(door_sounds, 2);
    }

    #[test]
    fn overshooting_a_car_boundary_lands_on_the_target() {
        let mut world = world();
        let anna = CharacterId::ANNA;
        parked(&mut world, anna, Car::GreenSleeping, 9000);
        assert!(world.update_entity(anna, Car::RedSleeping, 500));
        assert_eq!(world.record(anna).car, Car::RedSleeping);
        assert_eq!(world.record(anna).position, 500);
    }

    #[test]
    fn entering_the_green_car_bumps_a_player_on_the_platform() {
        let mut world = world();
        let host = RecordingHost::new();
        world.set_sound_host(Rc::new(host.clone()));
        world.set_scene_host(Rc::new(host.clone()));
        world.set_viewpoint(Car::GreenSleeping, 1, Facing::Up);
        world.record_mut(CharacterId::CATH).position = 600;
        let kronos = CharacterId::KRONOS;
        parked(&mut world, kronos, Car::Kronos, 9000);

        world.update_entity(kronos, Car::GreenSleeping, 5000);

        assert_eq!(host.dialogs(), vec![BUMP_DIALOG.to_string()]);
        assert!(host.events().contains(&HostEvent::Sound {
            who: CharacterId::CATH,
            code: BUMP_START_SOUND,
            delay: 0
        }));
        assert!(host.events().contains(&HostEvent::Scene {
            car: Car::GreenSleeping,
            slot: LOW_PLATFORM_SLOT
        }));
    }

    #[test]
    fn entering_the_kronos_car_bumps_only_a_player_at_its_entrance() {
        for (player_position, bumped) in [(8500, true), (2000, false)] {
            let mut world = World::default();
            let host = RecordingHost::new();
            world.set_sound_host(Rc::new(host.clone()));
            world.set_scene_host(Rc::new(host.clone()));
            world.set_viewpoint(Car::Kronos, 1, Facing::Up);
            world.record_mut(CharacterId::CATH).position = player_position;
            let anna = CharacterId::ANNA;
            parked(&mut world, anna, Car::GreenSleeping, 300);

            for _ in 0..3 {
                if world.record(anna).car == Car::Kronos {
                    break;
                }
                world.update_entity(anna, Car::Kronos, 5000);
            }

            assert_eq!(world.record(anna).car, Car::Kronos);
            let scene = HostEvent::Scene {
                car: Car::GreenSleeping,
                slot: KRONOS_PLATFORM_SLOT,
            };
            assert_eq!(host.events().contains(&scene), bumped, "player at {player_position}");
            assert_eq!(host.dialogs().contains(&BUMP_DIALOG.to_string()), bumped);
        }
    }

    #[test]
    fn oncoming_walkers_wait_then_pass() {
        let mut world = world();
        let (anna, august) = (CharacterId::ANNA, CharacterId::AUGUST);
        parked(&mut world, anna, Car::RedSleeping, 3000);
        parked(&mut world, august, Car::RedSleeping, 3600);
        world.record_mut(august).direction = Direction::Down;

        assert!(!world.update_entity(anna, Car::RedSleeping, 8000));
        assert_eq!(world.record(anna).position, 3000);
        let wait = world.config().opposite_wait_ticks;
        assert_eq!(world.record(anna).walk_wait, wait);
        assert_eq!(world.record(august).walk_wait, wait);
        assert_eq!(world.bus.len(), 2);

        for _ in 1..wait {
            assert!(!world.update_entity(anna, Car::RedSleeping, 8000));
            assert_eq!(world.record(anna).position, 3000);
        }
        assert!(!world.update_entity(anna, Car::RedSleeping, 8000));
        assert_eq!(world.record(anna).position, 3750);
    }

    #[test]
    fn walking_pairs_do_not_give_way() {
        assert!(walking_pair(CharacterId::SOPHIE, CharacterId::REBECCA));
        assert!(!walking_pair(CharacterId::SOPHIE, CharacterId::ANNA));
    }

    #[test]
    fn passing_the_seat_calls_the_conductor_aside() {
        let mut world = world();
        let anna = CharacterId::ANNA;
        parked(&mut world, anna, Car::RedSleeping, 2200);

        world.update_entity(anna, Car::RedSleeping, 500);
        assert_eq!(world.record(anna).attached_conductor, Some(CharacterId::COND2));
        let sent: Vec<_> = world.bus.pending().map(|message| message.action).collect();
        assert_eq!(sent, vec![Action::ACTION11]);

        world.update_entity(anna, Car::RedSleeping, 500);
        assert!(world.update_entity(anna, Car::RedSleeping, 500));
        assert_eq!(world.record(anna).attached_conductor, None);
        assert!(world.bus.pending().any(|message| message.action == Action::ACTION16));
    }

    #[test]
    fn player_ahead_is_warned() {
        let mut world = world();
        world.set_viewpoint(Car::RedSleeping, 14, Facing::Up);
        let anna = CharacterId::ANNA;
        parked(&mut world, anna, Car::RedSleeping, 5000);

        world.update_entity(anna, Car::RedSleeping, 9000);
        let sent: Vec<_> = world.bus.pending().cloned().collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender, CharacterId::CATH);
        assert_eq!(sent[0].action, Action::EXCUSE_ME);
    }

    #[test]
    fn fast_forward_moves_walkers_without_drawing() {
        let mut world = world();
        let anna = CharacterId::ANNA;
        parked(&mut world, anna, Car::RedSleeping, 3000);
        world.record_mut(anna).direction = Direction::Up;
        world.update_fields();
        assert_eq!(world.record(anna).position, 3750);
    }

    #[test]
    #[should_panic(expected = "outside the car")]
    fn targets_outside_the_car_are_rejected() {
        let mut world = world();
        world.update_entity(CharacterId::ANNA, Car::RedSleeping, 12_000);
    }
}
