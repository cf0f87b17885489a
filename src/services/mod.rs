//! Services - the activity inference engine
//!
//! This module contains the per-tick classification logic:
//! - `engine` - Per-session orchestrator that owns all engine state
//! - `spatial` - Zone overlap and boundary crossing classification
//! - `motion` - Subject position, velocity and movement tracking
//! - `interaction` - Rising-edge subject/actor interaction window
//! - `dwell` - Per-key dwell timers with cooldown
//! - `inactivity` - Sleep/wake state machine
//! - `resolver` - Fixed-priority activity resolution
//! - `emitter` - Change-only event emission

pub mod dwell;
pub mod emitter;
pub mod engine;
pub mod inactivity;
pub mod interaction;
pub mod motion;
pub mod resolver;
pub mod spatial;

// Re-export commonly used types
pub use engine::{ActivityEngine, TickOutcome};
pub use resolver::{Resolution, Rule, PRIORITY};
