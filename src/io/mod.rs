//! IO modules - external collaborators at their interface boundary
//!
//! This module contains all external IO operations:
//! - `source` - JSONL observation frames from the detector/tracker
//! - `sink` - Activity and system event sinks (JSONL file, in-memory)

pub mod sink;
pub mod source;

// Re-export commonly used types
pub use sink::{EventSink, JsonlSink, MemorySink, SinkError};
pub use source::{parse_line, read_observations, ClassMap, FrameRecord};
