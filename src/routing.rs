// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! The [RoutingTable] decides where each input's messages go.

use crate::{
    error::RouterError,
    storage::KeyValueStore,
    types::{DeviceDescriptor, OutputPort, Route, RouteTarget},
};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// What happened to the live mapping after the routing table looked at the
/// device list again.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Routes that weren't live before and are now.
    pub applied: Vec<Route>,
    /// Routes that were live before and aren't now, because a device went
    /// away. They come back when it does.
    pub suspended: Vec<Route>,
    /// Wanted routes that still can't be applied.
    pub pending: Vec<Route>,
}

/// Maps each input to at most one output.
///
/// Two maps are kept. `wanted` is what the user (or the stored routes) asked
/// for, by name. `live` holds output handles for the subset of `wanted` whose
/// input and output are both connected right now. `live` is rebuilt from
/// `wanted` after every device change, so it never holds a handle to an
/// output that has gone away.
#[derive(Debug)]
pub struct RoutingTable {
    inputs: Vec<DeviceDescriptor>,
    outputs: Vec<OutputPort>,

    wanted: BTreeMap<String, String>,
    live: FxHashMap<String, OutputPort>,

    store: Box<dyn KeyValueStore>,
}
impl RoutingTable {
    /// The single storage key. Kept identical to what earlier versions wrote
    /// so existing route files keep working.
    pub const STORAGE_KEY: &'static str = "MIDIRouter";

    /// Creates an empty table that persists to `store`.
    pub fn new_with(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            inputs: Default::default(),
            outputs: Default::default(),
            wanted: Default::default(),
            live: Default::default(),
            store,
        }
    }

    /// Replaces the known devices and rebuilds the live mapping against them.
    pub fn update_devices(
        &mut self,
        inputs: Vec<DeviceDescriptor>,
        outputs: Vec<OutputPort>,
    ) -> ResolveReport {
        self.inputs = inputs.into_iter().filter(|d| d.is_connected()).collect();
        self.outputs = outputs
            .into_iter()
            .filter(|o| o.descriptor.is_connected())
            .collect();
        Self::warn_about_duplicates(self.inputs.iter().map(|d| d.name.as_str()), "input");
        Self::warn_about_duplicates(self.outputs.iter().map(|o| o.name()), "output");
        self.resolve()
    }

    /// Points `input` at `target`, replacing whatever it pointed at before,
    /// then writes every resolvable route to storage.
    ///
    /// An output name that doesn't match a connected output leaves the input
    /// unrouted. That isn't an error. Returns the new live route, if any.
    pub fn set_route(
        &mut self,
        input: &str,
        target: &RouteTarget,
    ) -> Result<Option<Route>, RouterError> {
        let route = match target {
            RouteTarget::Disabled => {
                self.wanted.remove(input);
                self.live.remove(input);
                None
            }
            RouteTarget::Output(output) => match self.find_output(output).cloned() {
                Some(port) => {
                    self.wanted.insert(input.to_string(), output.clone());
                    if self.is_input_connected(input) {
                        self.live.insert(input.to_string(), port);
                        Some(Route::new_with(input, output))
                    } else {
                        self.live.remove(input);
                        None
                    }
                }
                None => {
                    self.wanted.remove(input);
                    self.live.remove(input);
                    None
                }
            },
        };
        self.persist()?;
        Ok(route)
    }

    /// Reads the stored routes and applies each one whose devices are
    /// present. The others wait in the pending set until their devices show
    /// up.
    ///
    /// Stored data that can't be parsed restores nothing and leaves the
    /// current routes alone.
    pub fn restore(&mut self) -> Result<ResolveReport, RouterError> {
        let pairs = Self::stored_routes(&*self.store)?;
        for route in pairs.iter() {
            self.wanted.insert(route.input.clone(), route.output.clone());
        }
        let suspended = self.resolve().suspended;

        let mut report = ResolveReport {
            suspended,
            ..Default::default()
        };
        for route in pairs {
            let is_live = self
                .live
                .get(&route.input)
                .is_some_and(|port| port.name() == route.output);
            if is_live {
                report.applied.push(route);
            } else {
                report.pending.push(route);
            }
        }
        report.applied.sort();
        report.pending.sort();
        Ok(report)
    }

    /// Reads the routes in `store` without applying them. An empty store has
    /// no routes.
    pub fn stored_routes(store: &dyn KeyValueStore) -> Result<Vec<Route>, RouterError> {
        let Some(json) = store.get(Self::STORAGE_KEY)? else {
            return Ok(Default::default());
        };
        let pairs: Vec<(String, String)> = serde_json::from_str(&json)?;
        Ok(pairs
            .into_iter()
            .map(|(input, output)| Route { input, output })
            .collect())
    }

    /// Sends `bytes` to the output routed from `input`. Returns the name of
    /// the output that got them, or `None` if the input has no route.
    pub fn forward(&self, input: &str, bytes: &[u8]) -> Result<Option<&str>, RouterError> {
        let Some(port) = self.live.get(input) else {
            return Ok(None);
        };
        let result = match port.handle.lock() {
            Ok(mut handle) => handle.send(bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        result
            .map(|_| Some(port.name()))
            .map_err(|reason| RouterError::Send {
                output: port.name().to_string(),
                reason,
            })
    }

    /// Drops every route, live and pending, and stores an empty list.
    pub fn clear(&mut self) -> Result<(), RouterError> {
        self.wanted.clear();
        self.live.clear();
        self.persist()
    }

    /// The output that `input` currently sends to.
    pub fn route(&self, input: &str) -> Option<&OutputPort> {
        self.live.get(input)
    }

    /// All live routes, sorted by input name.
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .live
            .iter()
            .map(|(input, port)| Route::new_with(input, port.name()))
            .collect();
        routes.sort();
        routes
    }

    /// Wanted routes that aren't live because a device is missing.
    pub fn pending_routes(&self) -> Vec<Route> {
        self.wanted
            .iter()
            .filter(|(input, _)| !self.live.contains_key(input.as_str()))
            .map(|(input, output)| Route::new_with(input, output))
            .collect()
    }

    #[allow(missing_docs)]
    pub fn inputs(&self) -> &[DeviceDescriptor] {
        &self.inputs
    }

    #[allow(missing_docs)]
    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    /// The outputs a user may pick for `input`. An output with the same name
    /// as the input is usually the other half of the same device, and
    /// routing a device into itself loops, so it's left out.
    pub fn selectable_outputs(&self, input: &str) -> Vec<&DeviceDescriptor> {
        self.outputs
            .iter()
            .map(|o| &o.descriptor)
            .filter(|d| d.name != input)
            .collect()
    }

    fn resolve(&mut self) -> ResolveReport {
        let mut report = ResolveReport::default();
        let mut live = FxHashMap::default();
        for (input, output) in self.wanted.iter() {
            let route = Route::new_with(input, output);
            let port = if self.is_input_connected(input) {
                self.find_output(output)
            } else {
                None
            };
            match port {
                Some(port) => {
                    let was_live = self
                        .live
                        .get(input)
                        .is_some_and(|old| old.name() == port.name());
                    if !was_live {
                        report.applied.push(route);
                    }
                    live.insert(input.clone(), port.clone());
                }
                None => {
                    if self.live.contains_key(input) {
                        report.suspended.push(route.clone());
                    }
                    report.pending.push(route);
                }
            }
        }
        self.live = live;
        report
    }

    fn persist(&mut self) -> Result<(), RouterError> {
        let pairs: Vec<(&str, &str)> = self
            .wanted
            .iter()
            .filter(|(_, output)| self.find_output(output).is_some())
            .map(|(input, output)| (input.as_str(), output.as_str()))
            .collect();
        let json = serde_json::to_string(&pairs)?;
        self.store.set(Self::STORAGE_KEY, &json)
    }

    // With duplicate names, the first port the backend listed wins.
    fn find_output(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.iter().find(|o| o.name() == name)
    }

    fn is_input_connected(&self, name: &str) -> bool {
        self.inputs.iter().any(|d| d.name == name)
    }

    fn warn_about_duplicates<'a>(names: impl Iterator<Item = &'a str>, kind: &str) {
        let mut seen = rustc_hash::FxHashSet::default();
        for name in names {
            if !seen.insert(name) {
                log::warn!("More than one {kind} is named {name:?}; routing to it is ambiguous");
            }
        }
    }
}
