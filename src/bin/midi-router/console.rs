// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! A line-oriented front end. It prints the activity log as it grows and
//! takes routing commands from stdin.

use crossbeam_channel::{Select, Sender};
use midi_router::prelude::*;
use std::io::BufRead;

const HELP: &str = "\
Commands:
  route <input> = <output>    send <input> to <output>
  route <input> = disabled    stop routing <input>
  routes                      show live and pending routes
  devices                     show inputs and the outputs each may use
  clear                       forget every route
  help                        show this
  quit                        exit";

#[derive(Debug, PartialEq, Eq)]
enum ConsoleCommand {
    Route(String, RouteTarget),
    Routes,
    Devices,
    Clear,
    Help,
    Quit,
}
impl ConsoleCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        match verb {
            "route" => {
                let Some((input, target)) = rest.split_once('=') else {
                    return Err("usage: route <input> = <output|disabled>".to_string());
                };
                let (input, target) = (input.trim(), target.trim());
                if input.is_empty() || target.is_empty() {
                    return Err("usage: route <input> = <output|disabled>".to_string());
                }
                Ok(Self::Route(input.to_string(), RouteTarget::parse(target)))
            }
            "routes" => Ok(Self::Routes),
            "devices" => Ok(Self::Devices),
            "clear" => Ok(Self::Clear),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(format!("unknown command {verb:?}; try \"help\"")),
        }
    }
}

/// What the console last heard from the service.
#[derive(Debug, Default)]
struct ConsoleView {
    inputs: Vec<DeviceDescriptor>,
    outputs: Vec<DeviceDescriptor>,
    live: Vec<Route>,
    pending: Vec<Route>,
}
impl ConsoleView {
    fn print_routes(&self) {
        if self.live.is_empty() && self.pending.is_empty() {
            println!("No routes.");
        }
        for route in self.live.iter() {
            println!("  {} -> {}", route.input, route.output);
        }
        for route in self.pending.iter() {
            println!("  {} -> {} (waiting for devices)", route.input, route.output);
        }
    }

    // One "selector" per input: Disabled plus every other output.
    fn print_devices(&self) {
        for input in self.inputs.iter() {
            let current = self
                .live
                .iter()
                .find(|r| r.input == input.name)
                .map(|r| r.output.as_str());
            println!("{}:", input.name);
            let mark = |selected: bool| if selected { "*" } else { " " };
            println!("  {} Disabled", mark(current.is_none()));
            for output in self.outputs.iter().filter(|o| o.name != input.name) {
                println!(
                    "  {} {}",
                    mark(current == Some(output.name.as_str())),
                    output.name
                );
            }
        }
    }
}

/// Runs the router until the user quits or stdin closes.
pub(crate) fn run(settings: &RouterSettings, store: FileStore) -> anyhow::Result<()> {
    log::info!("Routes are stored in {:?}", store.path());
    let session = RouterSession::new_with(Box::new(store), settings.log_capacity());
    let mut service = RouterService::new_with(session);

    let _backend = match MidirBackend::start(
        service.device_sender().clone(),
        service.midi_sender().clone(),
        settings.poll_interval(),
    ) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("{e}");
            let _ = service.join();
            return Err(e.into());
        }
    };
    service.send_input(RouterServiceInput::Restore);
    println!("{HELP}");

    let (line_sender, line_receiver) = crossbeam_channel::unbounded();
    spawn_stdin_reader(line_sender);

    let mut view = ConsoleView::default();
    let mut sel = Select::new();
    let line_index = sel.recv(&line_receiver);
    let event_index = sel.recv(service.receiver());
    loop {
        let operation = sel.select();
        match operation.index() {
            index if index == line_index => {
                let Ok(line) = operation.recv(&line_receiver) else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ConsoleCommand::parse(&line) {
                    Ok(ConsoleCommand::Route(input, target)) => {
                        service.send_input(RouterServiceInput::SetRoute(input, target))
                    }
                    Ok(ConsoleCommand::Routes) => view.print_routes(),
                    Ok(ConsoleCommand::Devices) => view.print_devices(),
                    Ok(ConsoleCommand::Clear) => {
                        service.send_input(RouterServiceInput::ClearRoutes)
                    }
                    Ok(ConsoleCommand::Help) => println!("{HELP}"),
                    Ok(ConsoleCommand::Quit) => break,
                    Err(message) => println!("{message}"),
                }
            }
            index if index == event_index => {
                let Ok(event) = operation.recv(service.receiver()) else {
                    break;
                };
                match event {
                    RouterServiceEvent::Log(line) => println!("{line}"),
                    RouterServiceEvent::DevicesChanged { inputs, outputs } => {
                        view.inputs = inputs;
                        view.outputs = outputs;
                    }
                    RouterServiceEvent::RoutesChanged { live, pending } => {
                        view.live = live;
                        view.pending = pending;
                    }
                    RouterServiceEvent::Quit => break,
                }
            }
            _ => unreachable!(),
        }
    }
    drop(sel);

    let _ = service.join();
    Ok(())
}

// Blocking reads get their own thread. When stdin closes, the sender drops
// and the select loop sees a disconnected channel.
fn spawn_stdin_reader(sender: Sender<String>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Couldn't read stdin: {e}");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_commands() {
        assert_eq!(
            ConsoleCommand::parse("route Launchkey MIDI = IAC Bus 1"),
            Ok(ConsoleCommand::Route(
                "Launchkey MIDI".to_string(),
                RouteTarget::Output("IAC Bus 1".to_string())
            ))
        );
        assert_eq!(
            ConsoleCommand::parse("  route Keys = Disabled "),
            Ok(ConsoleCommand::Route("Keys".to_string(), RouteTarget::Disabled))
        );
        assert!(ConsoleCommand::parse("route Keys").is_err());
        assert!(ConsoleCommand::parse("route = X").is_err());
    }

    #[test]
    fn parses_other_commands() {
        assert_eq!(ConsoleCommand::parse("routes"), Ok(ConsoleCommand::Routes));
        assert_eq!(ConsoleCommand::parse("devices"), Ok(ConsoleCommand::Devices));
        assert_eq!(ConsoleCommand::parse("quit"), Ok(ConsoleCommand::Quit));
        assert!(ConsoleCommand::parse("frobnicate").is_err());
    }
}
