#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use ch376::{Ch376Builder, StatusMode};
use rusb::UsbContext;
mod common;
use common::AppError;

fn code() -> Result<(), AppError> {
    info!("Create rusb context and logging");
    let mut context = rusb::Context::new().map_err(|e| format!("Failed to create context: {e}"))?;
    context.set_log_level(rusb::LogLevel::Info);

    // Creating the driver opens the CH341 too
    info!("Create and open device");
    let mut ch376 = Ch376Builder::new()
        .context(context)
        .status_mode(StatusMode::Poll)
        .build()?;

    // Check we can talk to the chip before waiting for a disk
    ch376.check_exist()?;
    let version = ch376.ic_version()?;
    println!("CH376 IC version: 0x{version:02x}");

    println!("Waiting for a USB disk...");
    ch376.bring_up()?;
    println!("USB disk mounted");

    // The root directory always opens as a directory
    let opened = ch376.open_path("/")?;
    println!("Root directory opened: is_directory={}", opened.is_directory);

    info!("All done - exiting");
    Ok(())
}

fn main() -> Result<(), AppError> {
    env_logger::init();

    // Use our own eprintln to print errors so our Error display is used instead
    // of Rust's default one
    if let Err(e) = code() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}
