use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zipquine::{create_zip_file, create_zip_loop, CrcMode, DosDateTime, InputFile, QuineConfig};

#[derive(Parser, Debug)]
#[command(name = "zipquine")]
#[command(about = "Build ZIP archives that contain themselves")]
#[command(version)]
struct Args {
    /// Files to store next to the quine entry
    inputs: Vec<PathBuf>,

    /// Output archive; in loop mode the second archive gets a "-loop" suffix
    #[arg(short, long, default_value = "quine.zip")]
    output: PathBuf,

    /// Log the token stream of every compressed input
    #[arg(long)]
    debug: bool,

    /// Leave the quine entry's CRC-32 zero instead of solving it
    #[arg(long, conflicts_with = "bruteforce")]
    no_crc: bool,

    /// Search for the CRC-32 on worker threads instead of solving it
    #[arg(long)]
    bruteforce: bool,

    /// Number of brute-force threads (0 = auto)
    #[arg(short = 't', long, default_value = "0")]
    num_threads: usize,

    /// Build two archives that contain each other (needs two inputs)
    #[arg(long = "loop")]
    loop_mode: bool,

    /// Skip inflating the finished archive to check it
    #[arg(long)]
    no_verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = if args.debug { level.max(Level::DEBUG) } else { level };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a global tracing subscriber was already set");
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = QuineConfig {
        crc: if args.no_crc {
            CrcMode::Skip
        } else if args.bruteforce {
            CrcMode::Bruteforce
        } else {
            CrcMode::Solve
        },
        num_threads: args.num_threads,
        timestamp: DosDateTime::now(),
        verify: !args.no_verify,
        print_tokens: args.debug,
        ..Default::default()
    };

    let inputs = args.inputs.iter().map(|path| read_input(path)).collect::<Result<Vec<_>, _>>()?;

    if args.loop_mode {
        let second = loop_partner(&args.output);
        let names = [file_name(&args.output), file_name(&second)];
        let (a, b) = create_zip_loop(&inputs, [names[0].as_str(), names[1].as_str()], &config)?;
        write_output(&args.output, &a)?;
        if let Err(e) = write_output(&second, &b) {
            let _ = fs::remove_file(&args.output);
            return Err(e);
        }
        info!("Wrote {} and {}", args.output.display(), second.display());
    } else {
        let archive = create_zip_file(&inputs, &file_name(&args.output), &config)?;
        write_output(&args.output, &archive)?;
        info!("Wrote {} ({} bytes)", args.output.display(), archive.len());
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<InputFile, Box<dyn std::error::Error>> {
    let data = fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(InputFile::new(file_name(path), data))
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "quine.zip".into())
}

/// `dir/name.zip` becomes `dir/name-loop.zip`
fn loop_partner(output: &Path) -> PathBuf {
    let stem = output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{}-loop.{}", stem, ext.to_string_lossy()),
        None => format!("{}-loop", stem),
    };
    output.with_file_name(name)
}

/// Write `bytes` to `path`, removing a partially written file on failure
fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = fs::write(path, bytes) {
        let _ = fs::remove_file(path);
        return Err(format!("{}: {}", path.display(), e).into());
    }
    Ok(())
}
