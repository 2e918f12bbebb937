// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::ProvidesService;
use crate::{
    session::RouterSession,
    types::{DeviceChange, DeviceDescriptor, MidiInputMessage, Route, RouteTarget},
    util::ChannelPair,
};
use crossbeam_channel::{Receiver, Select, Sender};
use std::thread::JoinHandle;

/// The app sends [RouterServiceInput] messages to control the service.
#[derive(Debug)]
pub enum RouterServiceInput {
    /// Route the named input to a target.
    SetRoute(String, RouteTarget),
    /// Reload routes from storage.
    Restore,
    /// Forget all routes.
    ClearRoutes,
    #[allow(missing_docs)]
    Quit,
}

/// [RouterServiceEvent] messages tell the app what happens with the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterServiceEvent {
    /// A line was added to the activity log.
    Log(String),

    /// The device list changed.
    DevicesChanged {
        #[allow(missing_docs)]
        inputs: Vec<DeviceDescriptor>,
        #[allow(missing_docs)]
        outputs: Vec<DeviceDescriptor>,
    },

    /// The set of routes changed.
    RoutesChanged {
        #[allow(missing_docs)]
        live: Vec<Route>,
        #[allow(missing_docs)]
        pending: Vec<Route>,
    },

    /// The service thread is exiting.
    Quit,
}

/// [RouterService] owns a [RouterSession] on a dedicated thread and feeds it
/// device changes, MIDI messages, and commands, one at a time.
///
/// There are three inbound channels. Device changes and MIDI messages come
/// from the hardware backend (see [RouterService::device_sender()] and
/// [RouterService::midi_sender()]), and commands come from the app. Before
/// each MIDI message is handled, any device changes already queued are
/// applied, so a message never goes out through a handle to a device that's
/// known to be gone.
#[derive(Debug)]
pub struct RouterService {
    inputs: ChannelPair<RouterServiceInput>,
    devices: ChannelPair<DeviceChange>,
    messages: ChannelPair<MidiInputMessage>,
    events: ChannelPair<RouterServiceEvent>,

    handle: Option<JoinHandle<RouterSession>>,
}
impl ProvidesService<RouterServiceInput, RouterServiceEvent> for RouterService {
    fn sender(&self) -> &Sender<RouterServiceInput> {
        &self.inputs.sender
    }

    fn receiver(&self) -> &Receiver<RouterServiceEvent> {
        &self.events.receiver
    }
}
impl RouterService {
    /// Creates a new [RouterService] and starts its thread.
    pub fn new_with(session: RouterSession) -> Self {
        let mut r = Self {
            inputs: Default::default(),
            devices: Default::default(),
            messages: Default::default(),
            events: Default::default(),
            handle: None,
        };
        r.handle = Some(r.spawn_thread(session));
        r
    }

    /// Where the hardware backend posts device changes.
    pub fn device_sender(&self) -> &Sender<DeviceChange> {
        &self.devices.sender
    }

    /// Where the hardware backend posts incoming MIDI.
    pub fn midi_sender(&self) -> &Sender<MidiInputMessage> {
        &self.messages.sender
    }

    /// Asks the thread to stop, waits for it, and hands back the session.
    pub fn join(&mut self) -> Option<RouterSession> {
        self.send_input(RouterServiceInput::Quit);
        self.handle.take().and_then(|handle| handle.join().ok())
    }

    // Sits in a loop, watching the three inbound channels and handling
    // whatever comes through.
    fn spawn_thread(&self, mut session: RouterSession) -> JoinHandle<RouterSession> {
        let input_receiver = self.inputs.receiver.clone();
        let device_receiver = self.devices.receiver.clone();
        let midi_receiver = self.messages.receiver.clone();
        let app_sender = self.events.sender.clone();

        std::thread::spawn(move || {
            let mut sel = Select::new();
            let input_index = sel.recv(&input_receiver);
            let device_index = sel.recv(&device_receiver);
            let midi_index = sel.recv(&midi_receiver);

            loop {
                let operation = sel.select();
                match operation.index() {
                    index if index == input_index => {
                        let Ok(input) = operation.recv(&input_receiver) else {
                            break;
                        };
                        match input {
                            RouterServiceInput::SetRoute(input, target) => {
                                session.set_route(&input, &target);
                            }
                            RouterServiceInput::Restore => {
                                session.restore();
                            }
                            RouterServiceInput::ClearRoutes => session.clear_routes(),
                            RouterServiceInput::Quit => break,
                        }
                        Self::publish_lines(&mut session, &app_sender);
                        Self::publish_routes(&session, &app_sender);
                    }
                    index if index == device_index => {
                        let Ok(change) = operation.recv(&device_receiver) else {
                            break;
                        };
                        Self::apply_device_change(&mut session, change, &app_sender);
                    }
                    index if index == midi_index => {
                        let Ok(message) = operation.recv(&midi_receiver) else {
                            break;
                        };
                        while let Ok(change) = device_receiver.try_recv() {
                            Self::apply_device_change(&mut session, change, &app_sender);
                        }
                        session.handle_midi(&message);
                        Self::publish_lines(&mut session, &app_sender);
                    }
                    _ => unreachable!(),
                }
            }
            let _ = app_sender.send(RouterServiceEvent::Quit);
            log::debug!("RouterService exit");
            session
        })
    }

    fn apply_device_change(
        session: &mut RouterSession,
        change: DeviceChange,
        app_sender: &Sender<RouterServiceEvent>,
    ) {
        session.handle_devices(change);
        Self::publish_lines(session, app_sender);
        let table = session.table();
        let _ = app_sender.send(RouterServiceEvent::DevicesChanged {
            inputs: table.inputs().to_vec(),
            outputs: table.outputs().iter().map(|o| o.descriptor.clone()).collect(),
        });
        Self::publish_routes(session, app_sender);
    }

    fn publish_lines(session: &mut RouterSession, app_sender: &Sender<RouterServiceEvent>) {
        for line in session.take_fresh_lines() {
            let _ = app_sender.send(RouterServiceEvent::Log(line));
        }
    }

    fn publish_routes(session: &RouterSession, app_sender: &Sender<RouterServiceEvent>) {
        let _ = app_sender.send(RouterServiceEvent::RoutesChanged {
            live: session.table().routes(),
            pending: session.table().pending_routes(),
        });
    }
}
impl Drop for RouterService {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.join();
        }
    }
}
