// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::MidiChannel;
use strum_macros::{Display, EnumIter, FromRepr};

/// The channel-voice message types, keyed by the high nibble of the status
/// byte.
#[derive(Clone, Copy, Debug, Display, EnumIter, FromRepr, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// A key was released.
    #[strum(serialize = "Note Off")]
    NoteOff = 0x8,
    /// A key was pressed.
    #[strum(serialize = "Note On")]
    NoteOn = 0x9,
    /// Pressure on one held key.
    #[strum(serialize = "Poly Aftertouch")]
    PolyAftertouch = 0xA,
    /// A controller moved.
    #[strum(serialize = "Control Change")]
    ControlChange = 0xB,
    /// Switch to another patch.
    #[strum(serialize = "Program Change")]
    ProgramChange = 0xC,
    /// Pressure across the whole channel.
    #[strum(serialize = "Channel Aftertouch")]
    ChannelAftertouch = 0xD,
    /// The pitch bender moved.
    #[strum(serialize = "Pitch Wheel")]
    PitchWheel = 0xE,
}

/// What a status byte says about its message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedStatus {
    #[allow(missing_docs)]
    pub kind: MessageKind,
    #[allow(missing_docs)]
    pub channel: MidiChannel,
}
impl DecodedStatus {
    /// Decodes a status byte. Returns `None` for data bytes (high nibble
    /// 0x0-0x7) and system messages (0xF).
    pub fn decode(status: u8) -> Option<Self> {
        MessageKind::from_repr(status >> 4).map(|kind| Self {
            kind,
            channel: MidiChannel::from_status(status),
        })
    }
}

/// Formats one line of traffic for the activity log:
/// `"<source>: <kind> <channel> <data1> <data2>"`.
pub fn describe(source_name: &str, bytes: &[u8]) -> String {
    let Some(status) = bytes.first() else {
        return format!("{source_name}: (empty)");
    };
    let mut line = match DecodedStatus::decode(*status) {
        Some(decoded) => format!("{source_name}: {} {}", decoded.kind, decoded.channel),
        None => format!("{source_name}: Unknown {status:#04X}"),
    };
    for data in bytes.iter().skip(1).take(2) {
        line.push_str(&format!(" {data}"));
    }
    line
}
