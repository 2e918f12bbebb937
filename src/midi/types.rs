// Copyright (c) 2024 Mike Tsao. All rights reserved.

use derive_more::Display as DeriveDisplay;
use serde::{Deserialize, Serialize};

/// Newtype for MIDI channel, numbered the way musicians count them: 1..=16.
#[derive(
    Clone, Copy, Debug, DeriveDisplay, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub struct MidiChannel(pub u8);
#[allow(missing_docs)]
impl MidiChannel {
    pub const MIN_VALUE: u8 = 1;
    pub const MAX_VALUE: u8 = 16; // inclusive

    /// Builds the channel from the low nibble of a status byte.
    pub const fn from_status(status: u8) -> Self {
        Self((status & 0x0F) + 1)
    }
}
impl Default for MidiChannel {
    fn default() -> Self {
        Self(Self::MIN_VALUE)
    }
}
impl From<MidiChannel> for u8 {
    fn from(value: MidiChannel) -> Self {
        value.0
    }
}
