// Copyright (c) 2024 Mike Tsao. All rights reserved.

use crossbeam_channel::Receiver;
use midi_router::prelude::*;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Default)]
struct RecordingOutput {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}
impl SendsMidi for RecordingOutput {
    fn send(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

fn recording_output(name: &str) -> (OutputPort, Arc<Mutex<Vec<Vec<u8>>>>) {
    let output = RecordingOutput::default();
    let sent = Arc::clone(&output.sent);
    (
        OutputPort::new_with(DeviceDescriptor::output(name), Arc::new(Mutex::new(output))),
        sent,
    )
}

// Waits for the first event that matches, skipping the rest.
fn wait_for(
    receiver: &Receiver<RouterServiceEvent>,
    matches: impl Fn(&RouterServiceEvent) -> bool,
) -> RouterServiceEvent {
    loop {
        let event = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("service went quiet");
        if matches(&event) {
            return event;
        }
    }
}

fn log_ending_with(suffix: &'static str) -> impl Fn(&RouterServiceEvent) -> bool {
    move |event| matches!(event, RouterServiceEvent::Log(line) if line.ends_with(suffix))
}

#[test]
fn routes_messages_between_devices() {
    let session = RouterSession::new_with(Box::<MemoryStore>::default(), 20);
    let mut service = RouterService::new_with(session);
    let (synth, synth_sent) = recording_output("Synth");

    service
        .device_sender()
        .send(DeviceChange {
            port: None,
            inputs: vec![DeviceDescriptor::input("Keys")],
            outputs: vec![synth],
        })
        .unwrap();
    let event = wait_for(service.receiver(), |e| {
        matches!(e, RouterServiceEvent::DevicesChanged { .. })
    });
    assert_eq!(
        event,
        RouterServiceEvent::DevicesChanged {
            inputs: vec![DeviceDescriptor::input("Keys")],
            outputs: vec![DeviceDescriptor::output("Synth")],
        }
    );

    service.send_input(RouterServiceInput::SetRoute(
        "Keys".to_string(),
        RouteTarget::Output("Synth".to_string()),
    ));
    let event = wait_for(service.receiver(), |e| {
        matches!(e, RouterServiceEvent::RoutesChanged { live, .. } if !live.is_empty())
    });
    assert_eq!(
        event,
        RouterServiceEvent::RoutesChanged {
            live: vec![Route::new_with("Keys", "Synth")],
            pending: vec![],
        }
    );

    service
        .midi_sender()
        .send(MidiInputMessage::new_with("Keys", &[0x90, 60, 100]))
        .unwrap();
    wait_for(service.receiver(), log_ending_with("Keys: Note On 1 60 100"));
    assert_eq!(*synth_sent.lock().unwrap(), vec![vec![0x90, 60, 100]]);

    let session = service.join().unwrap();
    assert_eq!(session.table().routes(), vec![Route::new_with("Keys", "Synth")]);
}

#[test]
fn device_changes_apply_before_later_messages() {
    let session = RouterSession::new_with(Box::<MemoryStore>::default(), 20);
    let mut service = RouterService::new_with(session);
    let (synth, synth_sent) = recording_output("Synth");
    let inputs = vec![DeviceDescriptor::input("Keys")];

    service
        .device_sender()
        .send(DeviceChange {
            port: None,
            inputs: inputs.clone(),
            outputs: vec![synth],
        })
        .unwrap();
    wait_for(service.receiver(), |e| {
        matches!(e, RouterServiceEvent::DevicesChanged { .. })
    });
    service.send_input(RouterServiceInput::SetRoute(
        "Keys".to_string(),
        RouteTarget::Output("Synth".to_string()),
    ));
    wait_for(service.receiver(), |e| {
        matches!(e, RouterServiceEvent::RoutesChanged { live, .. } if !live.is_empty())
    });

    // The synth goes away, and a message arrives right behind the news.
    service
        .device_sender()
        .send(DeviceChange {
            port: Some(DeviceDescriptor::output("Synth").with_state(ConnectionState::Disconnected)),
            inputs,
            outputs: vec![],
        })
        .unwrap();
    service
        .midi_sender()
        .send(MidiInputMessage::new_with("Keys", &[0x80, 60, 0]))
        .unwrap();
    wait_for(service.receiver(), log_ending_with("Keys: Note Off 1 60 0"));
    assert!(synth_sent.lock().unwrap().is_empty());

    let session = service.join().unwrap();
    assert!(session.table().routes().is_empty());
    assert_eq!(
        session.table().pending_routes(),
        vec![Route::new_with("Keys", "Synth")]
    );
}

#[test]
fn quit_is_acknowledged() {
    let session = RouterSession::new_with(Box::<MemoryStore>::default(), 20);
    let mut service = RouterService::new_with(session);
    let receiver = service.receiver().clone();
    assert!(service.join().is_some());
    wait_for(&receiver, |e| *e == RouterServiceEvent::Quit);
    assert!(service.join().is_none());
}
