use ch376::{Ch376, Ch376Builder, DeviceType, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("ch376 error: {error}")]
    Ch376Error { error: Error },

    #[error("App error: {message}")]
    App { message: String },
}

impl From<Error> for AppError {
    fn from(error: Error) -> Self {
        AppError::Ch376Error { error }
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        AppError::App { message }
    }
}

#[allow(dead_code)]
/// Builds a driver for either a remote server (`HOST:PORT`) or the first
/// local CH341, then brings the disk up
pub fn connect(remote: Option<&str>) -> Result<Ch376<DeviceType>, AppError> {
    let mut builder = Ch376Builder::new();
    if let Some(addr) = remote {
        builder.remote_str(addr)?;
    }
    let mut ch376 = builder.build()?;
    ch376.bring_up()?;
    Ok(ch376)
}
