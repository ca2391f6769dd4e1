use std::path::PathBuf;
use std::process::ExitCode;

use a5200::{config, report};
use a5200_core::{
    cartridge::CartError,
    machine::Machine,
    statesav::{self, NoHooks},
};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

#[derive(Parser)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify a cartridge image
    Identify { rom: PathBuf },
    /// Insert a cartridge and print the cartridge-space window map
    Map {
        rom: PathBuf,

        /// CPU write to replay before dumping, as ADDR=VALUE in hex
        #[arg(long = "write", value_parser = parse_write)]
        writes: Vec<(u16, u8)>,
    },
    /// Insert a cartridge and write a save state of the slot
    Save { rom: PathBuf, out: PathBuf },
    /// Validate a save state file and print its header
    State { file: PathBuf },
}

fn parse_write(s: &str) -> Result<(u16, u8), String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got {s}"))?;
    let addr = u16::from_str_radix(addr.trim_start_matches("0x"), 16)
        .map_err(|e| format!("bad address {addr}: {e}"))?;
    let value = u8::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| format!("bad value {value}: {e}"))?;
    Ok((addr, value))
}

fn init_logger(verbose: bool) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn load_machine(cfg: &config::Config, rom: &PathBuf) -> Result<Machine, String> {
    let machine_config = cfg
        .to_machine_config()
        .map_err(|e| format!("Failed to load BASIC ROM: {e}"))?;
    let image = std::fs::read(rom).map_err(|e| format!("Failed to read {}: {e}", rom.display()))?;

    let mut machine = Machine::new(machine_config);
    match machine.insert_cartridge(image) {
        Ok(()) => {}
        Err(e @ CartError::BadChecksum { .. }) => warn!("{}: {e}", rom.display()),
        Err(e) => return Err(format!("{}: {e}", rom.display())),
    }
    Ok(machine)
}

fn run(args: Args) -> Result<(), String> {
    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let cfg = config::load_from_file(&config_path);

    match args.command {
        Command::Identify { rom } => {
            let machine = load_machine(&cfg, &rom)?;
            print!("{}", report::cartridge(&machine.cart));
        }
        Command::Map { rom, writes } => {
            let mut machine = load_machine(&cfg, &rom)?;
            for (addr, value) in writes {
                machine.write_byte(addr, value);
            }
            print!("{}", report::window_map(&machine.memory));
        }
        Command::Save { rom, out } => {
            let machine = load_machine(&cfg, &rom)?;
            let mut data = Vec::new();
            machine
                .save_state(&mut NoHooks, &mut data, cfg.save_verbose)
                .map_err(|e| e.to_string())?;
            std::fs::write(&out, &data)
                .map_err(|e| format!("Failed to write {}: {e}", out.display()))?;
            info!("Wrote {} bytes to {}", data.len(), out.display());
        }
        Command::State { file } => {
            let data = std::fs::read(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            let header = statesav::peek_header(&data).map_err(|e| e.to_string())?;
            println!("{}", report::state_header(&header, data.len()));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
