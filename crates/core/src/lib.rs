//! Core library for the FrameIt photobooth.
//!
//! Two pieces carry the logic. The [`sequencer`] is a pure state machine that
//! walks a [`ShotPlan`] of countdowns and asks for a capture each time one
//! reaches zero; [`render`] composites the finished frames into a single
//! collage PNG. [`Booth`] wires both to a [`Camera`] and a tick timer, and
//! hands collages to a [`CollageSink`].

pub mod booth;
pub mod camera;
pub mod config;
pub mod error;
pub mod plan;
pub mod record;
pub mod render;
pub mod sequencer;
pub mod timeline;

pub use booth::Booth;
pub use camera::{Camera, Disconnected, FileCamera, Frame, SyntheticCamera};
pub use config::AppConfig;
pub use error::{BoothError, Result};
pub use plan::ShotPlan;
pub use record::{CollageSink, DirectorySink, MemorySink};
pub use render::{
    Anchor, Collage, CollageSpec, Color, Compositor, FontFamily, NullFramePolicy, Placement,
    Slot, Watermark, DEFAULT_FILENAME,
};
pub use sequencer::{
    transition, Effect, Event, Outcome, Phase, Rejection, RunId, SequencerState, TickKind,
    Transition,
};
pub use timeline::{PendingTick, TickPacing, TickTimer};
