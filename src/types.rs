// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Devices, messages, and routes as they flow through the router.

use derive_more::Display as DeriveDisplay;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use strum_macros::{Display, EnumString};

/// Whether a port produces MIDI (an input) or consumes it (an output).
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    #[allow(missing_docs)]
    Input,
    #[allow(missing_docs)]
    Output,
}

#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Describes one endpoint that the host knows about. Names are assumed
/// unique within a [DeviceKind].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceDescriptor {
    #[allow(missing_docs)]
    pub name: String,
    /// Not every backend can tell us this.
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[allow(missing_docs)]
    pub kind: DeviceKind,
    #[allow(missing_docs)]
    pub state: ConnectionState,
}
impl DeviceDescriptor {
    /// A connected input named `name`.
    pub fn input(name: &str) -> Self {
        Self {
            name: name.to_string(),
            manufacturer: None,
            kind: DeviceKind::Input,
            state: ConnectionState::Connected,
        }
    }

    /// A connected output named `name`.
    pub fn output(name: &str) -> Self {
        Self {
            name: name.to_string(),
            manufacturer: None,
            kind: DeviceKind::Output,
            state: ConnectionState::Connected,
        }
    }

    /// Returns a copy with the state changed.
    pub fn with_state(&self, state: ConnectionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    #[allow(missing_docs)]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
impl core::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // "MIDI device connected: Roland UM-ONE input"
        match &self.manufacturer {
            Some(manufacturer) => write!(f, "{manufacturer} {} {}", self.name, self.kind),
            None => write!(f, "{} {}", self.name, self.kind),
        }
    }
}

/// Something that accepts raw MIDI bytes. Connected output ports implement
/// this.
pub trait SendsMidi: core::fmt::Debug + Send {
    /// Transmits `bytes` unchanged.
    fn send(&mut self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// A shared handle to a connected output. It goes stale when the output
/// disconnects, which is why the routing table rebuilds its handles after
/// every device change.
pub type OutputHandle = Arc<Mutex<dyn SendsMidi>>;

/// A connected output together with the handle that writes to it.
#[derive(Clone, Debug)]
pub struct OutputPort {
    #[allow(missing_docs)]
    pub descriptor: DeviceDescriptor,
    #[allow(missing_docs)]
    pub handle: OutputHandle,
}
impl OutputPort {
    #[allow(missing_docs)]
    pub fn new_with(descriptor: DeviceDescriptor, handle: OutputHandle) -> Self {
        Self { descriptor, handle }
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Raw bytes that arrived on the named input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiInputMessage {
    #[allow(missing_docs)]
    pub source_name: String,
    #[allow(missing_docs)]
    pub bytes: Vec<u8>,
}
impl MidiInputMessage {
    #[allow(missing_docs)]
    pub fn new_with(source_name: &str, bytes: &[u8]) -> Self {
        Self {
            source_name: source_name.to_string(),
            bytes: bytes.to_vec(),
        }
    }
}

/// The full set of ports after a change, plus the port that changed.
#[derive(Clone, Debug)]
pub struct DeviceChange {
    /// The port whose state changed. `None` for the initial scan.
    pub port: Option<DeviceDescriptor>,
    #[allow(missing_docs)]
    pub inputs: Vec<DeviceDescriptor>,
    #[allow(missing_docs)]
    pub outputs: Vec<OutputPort>,
}

/// Where an input's messages should go.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum RouteTarget {
    /// Drop everything from this input.
    Disabled,
    /// Send to the output with this name.
    #[strum(disabled)]
    Output(String),
}
impl RouteTarget {
    /// Parses user input. "disabled" (any case) means [RouteTarget::Disabled];
    /// anything else names an output.
    pub fn parse(value: &str) -> Self {
        value
            .parse()
            .unwrap_or_else(|_| Self::Output(value.to_string()))
    }
}
impl core::fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RouteTarget::Disabled => write!(f, "disabled"),
            RouteTarget::Output(name) => write!(f, "{name}"),
        }
    }
}

/// An input→output association, by name.
#[derive(Clone, Debug, DeriveDisplay, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[display(fmt = "{}->{}", input, output)]
pub struct Route {
    #[allow(missing_docs)]
    pub input: String,
    #[allow(missing_docs)]
    pub output: String,
}
impl Route {
    #[allow(missing_docs)]
    pub fn new_with(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
        }
    }
}
