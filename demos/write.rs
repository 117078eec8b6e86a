/// write.rs
///
/// Writes a local file, or a line of text, to the USB disk, replacing any
/// existing file
use clap::Parser;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
mod common;
use common::AppError;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Absolute path to write on the disk, e.g. /LOG/DATA.TXT
    path: String,

    /// Local file to copy.  If omitted, --text is written instead
    #[arg(short, long)]
    input: Option<std::path::PathBuf>,

    /// Text to write when no input file is given
    #[arg(short, long, default_value = "Hello from ch376\n")]
    text: String,

    /// Create the parent directory first
    #[arg(short, long)]
    mkdir: bool,

    /// Connect to a ch376-server at HOST:PORT instead of a local CH341
    #[arg(short, long)]
    remote: Option<String>,
}

fn code(args: &Args) -> Result<(), AppError> {
    let data = match &args.input {
        Some(input) => std::fs::read(input)
            .map_err(|e| format!("Failed to read {}: {e}", input.display()))?,
        None => args.text.as_bytes().to_vec(),
    };

    let mut ch376 = common::connect(args.remote.as_deref())?;

    if args.mkdir {
        if let Some((parent, _)) = args.path.rsplit_once('/') {
            if !parent.is_empty() {
                ch376.mkdir_path(parent)?;
            }
        }
    }

    // There is no truncate, so replace the file
    if let Err(e) = ch376.delete_path(&args.path) {
        debug!("Nothing deleted: {e}");
    }
    ch376.create_path(&args.path)?;

    let mut written = 0;
    for chunk in data.chunks(u16::MAX as usize) {
        written += ch376.write_file(chunk)?;
    }
    ch376.close()?;

    println!("Wrote {written} bytes to {}", args.path);
    Ok(())
}

fn main() -> Result<(), AppError> {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = code(&args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}
