use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pcfind_core::types::Address;
use pcfind_core::{DebugContainer, PcMatch, PcResolver, PcfindResult, ResolveOptions};
use pcfind_utils::{debug, info, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingGuard};

/// Exit status when at least one address has no enclosing subprogram.
const EXIT_NOT_FOUND: u8 = 2;
/// Exit status for errors (bad input, unreadable file, logging setup).
const EXIT_ERROR: u8 = 1;

/// Find the DWARF compilation unit and subprogram enclosing a program counter.
#[derive(Parser, Debug)]
#[command(name = "pcfind")]
#[command(version)]
#[command(about = "Find the DWARF subprogram and compilation unit enclosing a program counter", long_about = None)]
struct Cli
{
    /// Object file with DWARF debug info (ELF, Mach-O, PE, ...)
    file: PathBuf,

    /// Address to resolve: 0x-prefixed hex, 0-prefixed octal or decimal.
    /// May be repeated.
    #[arg(long = "pc", value_name = "ADDR", required = true)]
    pcs: Vec<Address>,

    /// Also print the source files of the matched compilation unit
    #[arg(long, default_value_t = false)]
    source_files: bool,

    /// Print linkage names as found instead of demangling them
    #[arg(long, default_value_t = false)]
    no_demangle: bool,

    /// Print how many units and DIEs each lookup touched
    #[arg(long, default_value_t = false)]
    stats: bool,

    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Log format (pretty or json). Overrides PCFIND_LOG_FORMAT.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli
{
    fn resolve_options(&self) -> ResolveOptions
    {
        ResolveOptions {
            collect_source_files: self.source_files,
            demangle: !self.no_demangle,
        }
    }
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let outcome = run(&cli);
    if let Err(e) = &outcome {
        eprintln!("Error: {e}");
    }
    let status = exit_status(&outcome);

    // Flushes the non-blocking log file writer.
    drop(guard);
    ExitCode::from(status)
}

/// Process exit status for the outcome of [`run`].
fn exit_status(outcome: &PcfindResult<bool>) -> u8
{
    match outcome {
        Ok(true) => 0,
        Ok(false) => EXIT_NOT_FOUND,
        Err(_) => EXIT_ERROR,
    }
}

fn setup_logging(cli: &Cli) -> Result<LoggingGuard, pcfind_utils::LoggingError>
{
    match (cli.log_level, cli.log_format) {
        (None, None) => init_logging(),
        (level, format) => init_logging_with_level(level.unwrap_or(LogLevel::Warn), format.unwrap_or_default()),
    }
}

/// Resolve every requested address. `Ok(false)` when any of them was not
/// found.
fn run(cli: &Cli) -> PcfindResult<bool>
{
    info!("Opening {}", cli.file.display());
    let container = DebugContainer::open(&cli.file)?;
    if let Some(arch) = container.architecture() {
        debug!(%arch, "container architecture");
    }

    let resolver = PcResolver::new(&container, cli.resolve_options());
    let mut all_found = true;

    for &pc in &cli.pcs {
        let resolution = resolver.resolve(pc)?;
        match &resolution.found {
            Some(found) => print_match(found),
            None => {
                all_found = false;
                println!("{pc}: not found");
            }
        }

        if cli.stats {
            let stats = resolution.stats;
            println!(
                "  stats:      {} units examined, {} skipped, {} DIEs visited",
                stats.units_examined, stats.units_skipped, stats.dies_visited
            );
        }
    }

    Ok(all_found)
}

fn print_match(found: &PcMatch)
{
    let unit = &found.unit;
    let subprogram = &found.subprogram;

    println!("{}:", found.target);

    let offset = unit
        .offset
        .map_or_else(|| "?".to_string(), |offset| format!("{offset:#x}"));
    let unit_name = unit.name.as_deref().unwrap_or("<unnamed>");
    match &unit.comp_dir {
        Some(dir) => println!("  unit:       #{} at {offset} {unit_name} ({dir})", unit.index),
        None => println!("  unit:       #{} at {offset} {unit_name}", unit.index),
    }
    println!("  dwarf:      v{} {}", unit.version, unit.kind);

    match &subprogram.name {
        Some(name) => println!("  subprogram: {name}"),
        None => println!("  subprogram: <unnamed>"),
    }
    println!("  range:      {}", subprogram.range);
    if let Some(die) = subprogram.die_offset {
        println!("  die:        {die:#x}");
    }

    if !found.source_files.is_empty() {
        println!("  source files:");
        for file in &found.source_files {
            println!("    {file}");
        }
    }
}
