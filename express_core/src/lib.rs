//! Character simulation core for a train-bound adventure game.
//!
//! Forty characters share one world: an occupancy map of who blocks which
//! view slot or compartment, a message bus their state machines talk over,
//! a positional walker along each car, and a save image that captures all
//! of it. Rendering, audio and scene loading sit behind the host traits.

pub mod config;
pub mod frames;
pub mod host;
pub mod logic;
pub mod occupancy;
pub mod params;
pub mod record;
pub mod savegame;
pub mod savepoint;
pub mod sequence;
pub mod tick;
pub mod timers;
pub mod types;
pub mod walk;
pub mod world;

pub use config::WorldConfig;
pub use host::{HostEvent, NullHost, RecordingHost, SceneHost, SoundHost};
pub use logic::{CastRole, CommonState};
pub use occupancy::{OccupancyMap, SlotKey};
pub use params::StateParams;
pub use record::{CallFrame, EntityRecord};
pub use savegame::{
    LedgerDecision, SaveError, SaveHeader, SaveImage, SaveKind, SaveLedger, SAVE_MAGIC,
    SAVE_VERSION,
};
pub use savepoint::{MessageParam, SavePoint, SavePointBus};
pub use sequence::{FrameInfo, InMemorySequences, Sequence, SequenceLibrary};
pub use tick::TickReport;
pub use timers::{TimeEvent, TimerList};
pub use types::{Action, Car, CharacterId, Clothes, Compartment, Direction, Facing, Location, Position};
pub use world::{Clock, SaveRequest, Viewpoint, World};
