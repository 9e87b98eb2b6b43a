use clap::Parser;
use dialoguer::Select;
use solfa_bridge::{
    cli::{find_output, Args},
    dispatcher::NoteDispatcher,
    handshake::HandshakeProtocol,
    logging,
    midi::{run_midi_output_thread, MidiOutputManager},
    scanner::PortScanner,
    serial::SystemSerial,
    supervisor::ConnectionSupervisor,
    ui::{run_note_display, SpinnerDisplay},
    BridgeConfig, Session, ThreadScheduler,
};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

const DISPLAY_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    initialize_logging();
    let args = Args::parse();

    if args.list_ports {
        list_serial_ports();
        return;
    }
    if args.list_midi {
        list_midi_outputs();
        return;
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => fail(&format!("Configuration error: {}", e)),
    };

    let output_manager = match connect_midi_output(config.midi_output.as_deref()) {
        Ok(manager) => manager,
        Err(e) => fail(&format!("Error connecting to MIDI output: {}", e)),
    };
    if let Some(name) = output_manager.port_name() {
        log::info!("Successfully connected to MIDI output: {}", name);
        println!("Sending notes to MIDI output: {}", name);
    }
    let (sink, _midi_thread) = run_midi_output_thread(output_manager);

    let session = Session::shared();
    let dispatcher = NoteDispatcher::new(
        session.clone(),
        Arc::new(sink),
        ThreadScheduler::new(),
        config.root_note,
        config.timings.note_hold,
    );
    let handshake = HandshakeProtocol::new(
        SystemSerial::new(),
        PortScanner::new(config.preferred_port.clone()),
        session.clone(),
        config.baud_rate,
        config.timings,
    );
    let mut supervisor =
        ConnectionSupervisor::new(session.clone(), handshake, dispatcher, config.timings);

    run_note_display(session, SpinnerDisplay::new(), DISPLAY_INTERVAL);

    log::info!("Bridge running. Press Ctrl+C to exit...");
    if let Err(e) = supervisor.run() {
        fail(&format!("ERROR: {}", e));
    }
}

fn initialize_logging() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Logger initialization failed: {}", e);
    }
    log::info!("Application starting");
}

fn fail(message: &str) -> ! {
    log::error!("{}", message);
    eprintln!("{}", message);
    std::process::exit(1);
}

fn load_config(args: &Args) -> Result<BridgeConfig, solfa_bridge::ConfigError> {
    BridgeConfig::load(args.config.as_deref())?.apply_args(args)
}

fn list_serial_ports() {
    match SystemSerial::describe_ports() {
        Ok(ports) => {
            println!("Available serial ports:");
            for port in ports {
                println!("  - {}", port);
            }
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn list_midi_outputs() {
    match MidiOutputManager::list_available_ports() {
        Ok(outputs) => {
            println!("Available MIDI outputs:");
            for output in outputs {
                println!("  - {}", output);
            }
        }
        Err(e) => fail(&e.to_string()),
    }
}

/// Named output if configured, otherwise ask when there is a choice and a terminal to ask on.
fn connect_midi_output(wanted: Option<&str>) -> Result<MidiOutputManager, String> {
    let outputs = MidiOutputManager::list_available_ports().map_err(|e| e.to_string())?;
    log::info!("Available MIDI outputs: {:?}", outputs);

    let mut manager = MidiOutputManager::new();
    match wanted {
        Some(name) => {
            let name = find_output(name, &outputs)?;
            manager.connect_to_device(name).map_err(|e| e.to_string())?;
        }
        None if outputs.len() > 1 && std::io::stdin().is_terminal() => {
            let choice = Select::new()
                .with_prompt("Select MIDI output")
                .items(&outputs)
                .default(0)
                .interact()
                .map_err(|e| e.to_string())?;
            manager
                .connect_to_device(&outputs[choice])
                .map_err(|e| e.to_string())?;
        }
        None => manager
            .connect_to_first_available()
            .map_err(|e| e.to_string())?,
    }
    Ok(manager)
}
