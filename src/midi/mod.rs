// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Just enough MIDI to label traffic in the activity log. The router itself
//! never looks inside a message; it forwards bytes unchanged.

/// Recommended imports for easy onboarding.
pub mod prelude {
    pub use super::{describe, DecodedStatus, MessageKind, MidiChannel};
}

pub use status::{describe, DecodedStatus, MessageKind};
pub use types::MidiChannel;

mod status;
mod types;
