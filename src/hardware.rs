// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Real MIDI ports, through `midir`.
//!
//! `midir` has no hot-plug notification, so a watcher thread lists the ports
//! every so often and reports the differences as [DeviceChange]s.

use crate::{
    error::RouterError,
    types::{
        ConnectionState, DeviceChange, DeviceDescriptor, MidiInputMessage, OutputPort, SendsMidi,
    },
    util::ChannelPair,
};
use crossbeam_channel::{RecvTimeoutError, Sender};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::Duration,
};

const CLIENT_NAME: &str = "midi-router";

/// Lists the names of the ports the host knows about, inputs then outputs.
pub fn list_ports() -> Result<(Vec<String>, Vec<String>), RouterError> {
    let midi_in = MidiInput::new(CLIENT_NAME)
        .map_err(|e| RouterError::PlatformUnavailable(e.to_string()))?;
    let midi_out = MidiOutput::new(CLIENT_NAME)
        .map_err(|e| RouterError::PlatformUnavailable(e.to_string()))?;
    Ok((input_names(&midi_in), output_names(&midi_out)))
}

fn input_names(midi_in: &MidiInput) -> Vec<String> {
    midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect()
}

fn output_names(midi_out: &MidiOutput) -> Vec<String> {
    midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect()
}

/// An open `midir` output.
struct MidirOutput {
    name: String,
    connection: MidiOutputConnection,
}
impl core::fmt::Debug for MidirOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MidirOutput")
            .field("name", &self.name)
            .finish()
    }
}
impl SendsMidi for MidirOutput {
    fn send(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.connection
            .send(bytes)
            .map_err(|e| anyhow::format_err!("{}: {e}", self.name))
    }
}

/// Keeps every host input and output open and tells the router when the set
/// changes.
#[derive(Debug)]
pub struct MidirBackend {
    quit: ChannelPair<()>,
    handle: Option<JoinHandle<()>>,
}
impl MidirBackend {
    /// Starts watching ports. Fails if the host won't give us MIDI access,
    /// which is the one error that should stop the program.
    ///
    /// The first scan is reported as a [DeviceChange] with no `port`.
    pub fn start(
        device_sender: Sender<DeviceChange>,
        midi_sender: Sender<MidiInputMessage>,
        poll_interval: Duration,
    ) -> Result<Self, RouterError> {
        let mut watcher = Watcher::new_with(device_sender, midi_sender)?;
        let quit: ChannelPair<()> = Default::default();
        let quit_receiver = quit.receiver.clone();
        let handle = std::thread::spawn(move || {
            watcher.scan(true);
            loop {
                match quit_receiver.recv_timeout(poll_interval) {
                    Err(RecvTimeoutError::Timeout) => watcher.scan(false),
                    _ => break,
                }
            }
            log::debug!("MidirBackend exit");
        });
        Ok(Self {
            quit,
            handle: Some(handle),
        })
    }

    /// Stops the watcher and closes every port.
    pub fn stop(&mut self) {
        let _ = self.quit.sender.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
impl Drop for MidirBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Compares the names we have open against the names the host lists now.
/// Returns `(removed, added)`, each in the order it was listed.
fn diff_names(open: &[String], listed: &[String]) -> (Vec<String>, Vec<String>) {
    let removed = open
        .iter()
        .filter(|name| !listed.contains(*name))
        .cloned()
        .collect();
    let mut added: Vec<String> = Vec::default();
    for name in listed {
        if !open.contains(name) && !added.contains(name) {
            added.push(name.clone());
        }
    }
    (removed, added)
}

struct Watcher {
    lister_in: MidiInput,
    lister_out: MidiOutput,

    inputs: FxHashMap<String, MidiInputConnection<()>>,
    input_order: Vec<String>,
    outputs: Vec<OutputPort>,

    // Listed ports we've already warned about failing to open.
    unopened: FxHashSet<String>,

    device_sender: Sender<DeviceChange>,
    midi_sender: Sender<MidiInputMessage>,
}
impl Watcher {
    fn new_with(
        device_sender: Sender<DeviceChange>,
        midi_sender: Sender<MidiInputMessage>,
    ) -> Result<Self, RouterError> {
        Ok(Self {
            lister_in: MidiInput::new(CLIENT_NAME)
                .map_err(|e| RouterError::PlatformUnavailable(e.to_string()))?,
            lister_out: MidiOutput::new(CLIENT_NAME)
                .map_err(|e| RouterError::PlatformUnavailable(e.to_string()))?,
            inputs: Default::default(),
            input_order: Default::default(),
            outputs: Default::default(),
            unopened: Default::default(),
            device_sender,
            midi_sender,
        })
    }

    fn scan(&mut self, is_initial: bool) {
        let mut changed = Vec::default();

        let listed_inputs = input_names(&self.lister_in);
        let (removed, added) = diff_names(&self.input_order, &listed_inputs);
        for name in removed {
            self.inputs.remove(&name);
            self.input_order.retain(|n| n != &name);
            changed.push(DeviceDescriptor::input(&name).with_state(ConnectionState::Disconnected));
        }
        for name in added {
            // A port we can't open isn't reported; the next scan tries again.
            match self.connect_input(&name) {
                Some(connection) => {
                    self.unopened.remove(&name);
                    self.inputs.insert(name.clone(), connection);
                    self.input_order.push(name.clone());
                    changed.push(DeviceDescriptor::input(&name));
                }
                None => self.note_unopened(&name),
            }
        }

        let open_outputs: Vec<String> = self.outputs.iter().map(|p| p.name().to_string()).collect();
        let listed_outputs = output_names(&self.lister_out);
        let (removed, added) = diff_names(&open_outputs, &listed_outputs);
        for name in removed {
            self.outputs.retain(|port| port.name() != name);
            changed.push(DeviceDescriptor::output(&name).with_state(ConnectionState::Disconnected));
        }
        for name in added {
            match self.connect_output(&name) {
                Some(port) => {
                    self.unopened.remove(&name);
                    self.outputs.push(port);
                    changed.push(DeviceDescriptor::output(&name));
                }
                None => self.note_unopened(&name),
            }
        }
        self.unopened
            .retain(|name| listed_inputs.contains(name) || listed_outputs.contains(name));

        if is_initial {
            let _ = self.device_sender.send(self.snapshot(None));
        } else {
            for port in changed {
                let _ = self.device_sender.send(self.snapshot(Some(port)));
            }
        }
    }

    fn note_unopened(&mut self, name: &str) {
        if self.unopened.insert(name.to_string()) {
            log::warn!("Couldn't open {name}; will keep trying while it's listed");
        }
    }

    fn snapshot(&self, port: Option<DeviceDescriptor>) -> DeviceChange {
        DeviceChange {
            port,
            inputs: self
                .input_order
                .iter()
                .map(|name| DeviceDescriptor::input(name))
                .collect(),
            outputs: self.outputs.clone(),
        }
    }

    // Each connection needs its own client, because connect() consumes it.
    fn connect_input(&self, name: &str) -> Option<MidiInputConnection<()>> {
        let mut midi_in = match MidiInput::new(CLIENT_NAME) {
            Ok(midi_in) => midi_in,
            Err(e) => {
                log::debug!("Couldn't open {name}: {e}");
                return None;
            }
        };
        midi_in.ignore(Ignore::None);
        let port = midi_in
            .ports()
            .into_iter()
            .find(|port| midi_in.port_name(port).ok().as_deref() == Some(name))?;
        let sender = self.midi_sender.clone();
        let source_name = name.to_string();
        match midi_in.connect(
            &port,
            "midi-router-in",
            move |_stamp, bytes, _| {
                let _ = sender.send(MidiInputMessage::new_with(&source_name, bytes));
            },
            (),
        ) {
            Ok(connection) => Some(connection),
            Err(e) => {
                log::debug!("Couldn't connect to {name}: {e}");
                None
            }
        }
    }

    fn connect_output(&self, name: &str) -> Option<OutputPort> {
        let midi_out = match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => midi_out,
            Err(e) => {
                log::debug!("Couldn't open {name}: {e}");
                return None;
            }
        };
        let port = midi_out
            .ports()
            .into_iter()
            .find(|port| midi_out.port_name(port).ok().as_deref() == Some(name))?;
        match midi_out.connect(&port, "midi-router-out") {
            Ok(connection) => Some(OutputPort::new_with(
                DeviceDescriptor::output(name),
                Arc::new(Mutex::new(MidirOutput {
                    name: name.to_string(),
                    connection,
                })),
            )),
            Err(e) => {
                log::debug!("Couldn't connect to {name}: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn diff_reports_arrivals_and_departures() {
        let (removed, added) = diff_names(&names(&["A", "B"]), &names(&["B", "C"]));
        assert_eq!(removed, names(&["A"]));
        assert_eq!(added, names(&["C"]));

        let (removed, added) = diff_names(&names(&["A"]), &names(&["A"]));
        assert!(removed.is_empty());
        assert!(added.is_empty());
    }

    #[test]
    fn port_that_failed_to_open_is_offered_again() {
        // "Busy" was listed last time but never opened, so it isn't in the
        // open set and shows up as added until a connect succeeds.
        let open = names(&["A"]);
        let listed = names(&["A", "Busy"]);
        for _ in 0..2 {
            let (removed, added) = diff_names(&open, &listed);
            assert!(removed.is_empty());
            assert_eq!(added, names(&["Busy"]));
        }
    }

    #[test]
    fn duplicate_listed_names_are_added_once() {
        let (_, added) = diff_names(&[], &names(&["Twin", "Twin"]));
        assert_eq!(added, names(&["Twin"]));
    }
}
