use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to ./solfa-bridge.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Serial port to try before scanning the rest
    #[arg(long)]
    pub port: Option<String>,

    /// MIDI output port (substring match)
    #[arg(long)]
    pub midi_output: Option<String>,

    /// MIDI note number for "do"
    #[arg(long)]
    pub root: Option<u8>,

    /// List available serial ports
    #[arg(long)]
    pub list_ports: bool,

    /// List available MIDI output ports
    #[arg(long)]
    pub list_midi: bool,
}

/// Picks the MIDI output whose name contains `wanted`.
pub fn find_output<'a>(wanted: &str, outputs: &'a [String]) -> Result<&'a str, String> {
    outputs
        .iter()
        .find(|d| d.contains(wanted))
        .map(String::as_str)
        .ok_or_else(|| {
            let mut error_msg = format!(
                "Error: MIDI output '{}' not found in available outputs:\n",
                wanted
            );
            for output in outputs {
                error_msg.push_str(&format!("  - {}\n", output));
            }
            error_msg
        })
}
