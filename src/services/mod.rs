// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Long-running services that talk to the rest of the program over
//! crossbeam channels.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{ProvidesService, RouterService, RouterServiceEvent, RouterServiceInput};
}

pub use router::{RouterService, RouterServiceEvent, RouterServiceInput};
pub use traits::ProvidesService;

mod router;
mod traits;
