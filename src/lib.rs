// Copyright (c) 2024 Mike Tsao. All rights reserved.

#![warn(missing_docs)]

//! The `midi_router` crate sends MIDI from any connected input to a chosen
//! output, remembers those choices between runs, and keeps a short log of
//! traffic and device comings and goings.
//!
//! The interesting part is [RoutingTable](routing::RoutingTable). A
//! [RouterSession](session::RouterSession) wraps it with the activity log,
//! and a [RouterService](services::RouterService) runs the session on its
//! own thread behind crossbeam channels. With the `hardware` feature,
//! [MidirBackend](hardware::MidirBackend) connects all of this to real ports.

pub mod activity;
pub mod error;
#[cfg(feature = "hardware")]
pub mod hardware;
pub mod midi;
pub mod routing;
pub mod services;
pub mod session;
pub mod storage;
pub mod types;
pub mod util;

/// A collection of imports that are useful to users of this crate. `use
/// midi_router::prelude::*;` for easier onboarding.
pub mod prelude {
    #[cfg(feature = "hardware")]
    pub use super::hardware::MidirBackend;
    pub use super::{
        activity::ActivityLog,
        error::RouterError,
        midi::prelude::*,
        routing::{ResolveReport, RoutingTable},
        services::prelude::*,
        session::RouterSession,
        storage::{FileStore, KeyValueStore, MemoryStore},
        types::{
            ConnectionState, DeviceChange, DeviceDescriptor, DeviceKind, MidiInputMessage,
            OutputHandle, OutputPort, Route, RouteTarget, SendsMidi,
        },
        util::prelude::*,
    };
}
