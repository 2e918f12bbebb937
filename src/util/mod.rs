// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Useful things that don't have anything to do with MIDI.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{ChannelPair, HasSettings, Paths, RouterSettings};
}

pub use channel_pair::ChannelPair;
pub use paths::Paths;
pub use settings::{HasSettings, RouterSettings};

mod channel_pair;
mod paths;
mod settings;
