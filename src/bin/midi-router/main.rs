// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Routes MIDI from any connected input to a chosen output.

use clap::{Parser, Subcommand};
use midi_router::{hardware::list_ports, prelude::*};
use std::path::PathBuf;

mod console;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Keep stored routes in this file instead of the default location
    #[arg(short, long)]
    routes: Option<PathBuf>,

    /// Read settings from this file instead of the default location
    #[arg(short, long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route MIDI and accept commands on stdin (the default)
    Run,
    /// List the MIDI ports the host knows about
    List,
    /// Show the stored routes
    Routes,
    /// Forget every stored route
    Clear,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => RouterSettings::load(path)?,
        None => RouterSettings::load_or_default(),
    };
    if let Some(routes) = args.routes {
        settings.set_routes_path(Some(routes));
    }
    let store = FileStore::new_with(&settings.routes_path());

    match args.command.unwrap_or(Command::Run) {
        Command::Run => console::run(&settings, store),
        Command::List => {
            let (inputs, outputs) = list_ports()?;
            println!("Inputs:");
            for name in inputs {
                println!("  {name}");
            }
            println!("Outputs:");
            for name in outputs {
                println!("  {name}");
            }
            Ok(())
        }
        Command::Routes => {
            let routes = RoutingTable::stored_routes(&store)?;
            if routes.is_empty() {
                println!("No stored routes in {:?}", store.path());
            }
            for route in routes {
                println!("{} -> {}", route.input, route.output);
            }
            Ok(())
        }
        Command::Clear => {
            RoutingTable::new_with(Box::new(store)).clear()?;
            println!("Cleared stored routes.");
            Ok(())
        }
    }
}
