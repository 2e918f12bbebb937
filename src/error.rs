// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! The router's error type.

use thiserror::Error;

/// Things that can go wrong inside the router.
///
/// Only [RouterError::PlatformUnavailable] stops the program. The rest are
/// logged and the router keeps going.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The host's MIDI subsystem refused access or doesn't exist.
    #[error("couldn't get MIDI access: {0}")]
    PlatformUnavailable(String),

    /// Reading or writing the route store failed.
    #[error("route storage failed: {0}")]
    Storage(String),

    /// The stored routes weren't a list of `[input, output]` pairs.
    #[error("couldn't parse stored routes: {0}")]
    MalformedRoutes(#[from] serde_json::Error),

    /// An output device rejected a message.
    #[error("couldn't send to {output}: {reason}")]
    Send {
        #[allow(missing_docs)]
        output: String,
        #[allow(missing_docs)]
        reason: String,
    },
}
