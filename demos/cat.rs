/// cat.rs
///
/// Prints a file from the USB disk to stdout
use clap::Parser;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::io::Write;
mod common;
use common::AppError;

const BLOCK_SIZE: usize = 4096;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Absolute path of the file, e.g. /LOG/DATA.TXT
    path: String,

    /// Connect to a ch376-server at HOST:PORT instead of a local CH341
    #[arg(short, long)]
    remote: Option<String>,
}

fn code(args: &Args) -> Result<(), AppError> {
    let mut ch376 = common::connect(args.remote.as_deref())?;

    let opened = ch376.open_path(&args.path)?;
    if opened.is_directory {
        return Err(format!("{} is a directory", args.path).into());
    }

    let size = ch376.file_size()? as usize;
    info!("{} is {size} bytes", args.path);

    let mut stdout = std::io::stdout().lock();
    let mut buf = vec![0u8; BLOCK_SIZE];
    let mut remaining = size;
    while remaining > 0 {
        let len = remaining.min(BLOCK_SIZE);
        let read = ch376.read_file(&mut buf[..len])?;
        stdout
            .write_all(&buf[..read])
            .map_err(|e| format!("Failed to write to stdout: {e}"))?;
        if read < len {
            warn!("File ended early, {} bytes unread", remaining - read);
            break;
        }
        remaining -= read;
    }

    ch376.close()?;
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
