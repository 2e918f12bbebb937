// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! The state of one running router.

use crate::{
    activity::ActivityLog,
    error::RouterError,
    midi::describe,
    routing::{ResolveReport, RoutingTable},
    storage::KeyValueStore,
    types::{DeviceChange, MidiInputMessage, Route, RouteTarget},
};

/// Everything one running router knows: the routing table, the current
/// devices (inside the table), and the activity log.
///
/// Handlers take `&mut self` and run to completion, so a caller that owns
/// the session on a single thread never sees two of them interleave.
#[derive(Debug)]
pub struct RouterSession {
    table: RoutingTable,
    log: ActivityLog,

    // Lines logged since the last take_fresh_lines().
    fresh_lines: Vec<String>,
}
impl RouterSession {
    /// Creates a session whose routes persist to `store`.
    pub fn new_with(store: Box<dyn KeyValueStore>, log_capacity: usize) -> Self {
        Self {
            table: RoutingTable::new_with(store),
            log: ActivityLog::new_with(log_capacity),
            fresh_lines: Default::default(),
        }
    }

    /// Applies a new device list. Routes that depended on a vanished device
    /// stop, and pending routes whose devices arrived start.
    pub fn handle_devices(&mut self, change: DeviceChange) -> ResolveReport {
        if let Some(port) = &change.port {
            self.note(&format!("MIDI device {}: {port}", port.state));
        }
        let report = self.table.update_devices(change.inputs, change.outputs);
        for route in report.applied.iter() {
            self.note(&format!("Restoring saved route: {route}"));
        }
        for route in report.suspended.iter() {
            self.note(&format!("Suspending route: {route}"));
        }

        let inputs = Self::join_names(self.table.inputs().iter().map(|d| d.name.as_str()));
        let outputs = Self::join_names(self.table.outputs().iter().map(|o| o.name()));
        self.note(&format!("Inputs: {inputs}"));
        self.note(&format!("Outputs: {outputs}"));
        report
    }

    /// Forwards a message along its route, if it has one, and logs it.
    /// Returns the name of the output it went to.
    pub fn handle_midi(&mut self, message: &MidiInputMessage) -> Option<String> {
        let sent_to = match self.table.forward(&message.source_name, &message.bytes) {
            Ok(sent_to) => sent_to.map(str::to_string),
            Err(e) => {
                log::warn!("{e}");
                None
            }
        };
        self.note(&describe(&message.source_name, &message.bytes));
        sent_to
    }

    /// Points `input` at `target`. Returns the live route, if one resulted.
    pub fn set_route(&mut self, input: &str, target: &RouteTarget) -> Option<Route> {
        self.note(&format!("ROUTING {input} to {target}"));
        match self.table.set_route(input, target) {
            Ok(route) => route,
            Err(e) => {
                // The live route still changed; only saving it failed.
                self.note(&format!("Couldn't save routes: {e}"));
                self.table.route(input).map(|port| Route::new_with(input, port.name()))
            }
        }
    }

    /// Brings back stored routes. Bad stored data restores nothing.
    pub fn restore(&mut self) -> ResolveReport {
        match self.table.restore() {
            Ok(report) => {
                for route in report.applied.iter() {
                    self.note(&format!("Restoring saved route: {route}"));
                }
                for route in report.pending.iter() {
                    self.note(&format!("Waiting for devices: {route}"));
                }
                report
            }
            Err(e @ RouterError::MalformedRoutes(_)) => {
                self.note(&format!("Ignoring saved routes: {e}"));
                ResolveReport::default()
            }
            Err(e) => {
                self.note(&format!("Couldn't load saved routes: {e}"));
                ResolveReport::default()
            }
        }
    }

    /// Forgets every route.
    pub fn clear_routes(&mut self) {
        if let Err(e) = self.table.clear() {
            self.note(&format!("Couldn't save routes: {e}"));
        }
        self.note("Cleared all routes");
    }

    /// Adds a line to the activity log.
    pub fn note(&mut self, message: &str) {
        let line = self.log.push(message).to_string();
        self.fresh_lines.push(line);
    }

    /// Returns the lines logged since the last call.
    pub fn take_fresh_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.fresh_lines)
    }

    #[allow(missing_docs)]
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    #[allow(missing_docs)]
    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
        names.collect::<Vec<_>>().join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        routing::tests::output,
        storage::MemoryStore,
        types::{ConnectionState, DeviceDescriptor},
    };

    fn session() -> RouterSession {
        RouterSession::new_with(Box::<MemoryStore>::default(), 20)
    }

    #[test]
    fn device_change_is_logged() {
        let mut s = session();
        let (x, _) = output("X");
        s.handle_devices(DeviceChange {
            port: Some(DeviceDescriptor::output("X")),
            inputs: vec![DeviceDescriptor::input("A")],
            outputs: vec![x],
        });
        let lines = s.take_fresh_lines();
        assert!(lines[0].ends_with("MIDI device connected: X output"));
        assert!(lines.iter().any(|l| l.ends_with("Inputs: A")));
        assert!(lines.iter().any(|l| l.ends_with("Outputs: X")));
        assert!(s.take_fresh_lines().is_empty());
    }

    #[test]
    fn midi_is_forwarded_and_logged() {
        let mut s = session();
        let (x, x_sent) = output("X");
        s.handle_devices(DeviceChange {
            port: None,
            inputs: vec![DeviceDescriptor::input("A")],
            outputs: vec![x],
        });
        assert_eq!(
            s.set_route("A", &RouteTarget::Output("X".to_string())),
            Some(Route::new_with("A", "X"))
        );
        s.take_fresh_lines();

        let sent_to = s.handle_midi(&MidiInputMessage::new_with("A", &[0x93, 64, 90]));
        assert_eq!(sent_to.as_deref(), Some("X"));
        assert_eq!(*x_sent.lock().unwrap(), vec![vec![0x93, 64, 90]]);
        let lines = s.take_fresh_lines();
        assert!(lines[0].ends_with("A: Note On 4 64 90"));

        // Unrouted inputs still get logged.
        assert!(s
            .handle_midi(&MidiInputMessage::new_with("B", &[0xB0, 1, 2]))
            .is_none());
        assert!(s.take_fresh_lines()[0].ends_with("B: Control Change 1 1 2"));
    }

    #[test]
    fn disconnect_event_stops_forwarding() {
        let mut s = session();
        let (x, x_sent) = output("X");
        let inputs = vec![DeviceDescriptor::input("A")];
        s.handle_devices(DeviceChange {
            port: None,
            inputs: inputs.clone(),
            outputs: vec![x],
        });
        s.set_route("A", &RouteTarget::Output("X".to_string()));

        let report = s.handle_devices(DeviceChange {
            port: Some(DeviceDescriptor::output("X").with_state(ConnectionState::Disconnected)),
            inputs,
            outputs: vec![],
        });
        assert_eq!(report.suspended, vec![Route::new_with("A", "X")]);
        assert!(s.handle_midi(&MidiInputMessage::new_with("A", &[0x90, 1, 1])).is_none());
        assert!(x_sent.lock().unwrap().is_empty());
        assert!(s
            .take_fresh_lines()
            .iter()
            .any(|l| l.ends_with("MIDI device disconnected: X output")));
    }

    #[test]
    fn malformed_restore_is_logged_not_fatal() {
        let mut store = MemoryStore::default();
        store.set(RoutingTable::STORAGE_KEY, "[[1,2]]").unwrap();
        let mut s = RouterSession::new_with(Box::new(store), 20);
        let report = s.restore();
        assert_eq!(report, ResolveReport::default());
        assert!(s.take_fresh_lines()[0].contains("Ignoring saved routes"));
    }

    #[test]
    fn log_respects_capacity() {
        let mut s = RouterSession::new_with(Box::<MemoryStore>::default(), 2);
        for _ in 0..5 {
            s.handle_midi(&MidiInputMessage::new_with("A", &[0xF8]));
        }
        assert_eq!(s.log().len(), 2);
        assert_eq!(s.take_fresh_lines().len(), 5);
    }
}
