use thiserror::Error;

/// Failures a session command or tick can surface to the host.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("rom not found: {0}")]
    RomNotFound(String),
    #[error("emulator not initialized")]
    EmulatorNotInitialized,
    #[error("emulator unavailable: {0}")]
    EmulatorUnavailable(String),
    #[error("save not found: {0}")]
    SaveNotFound(String),
    #[error("conversion software failed: {0}")]
    ConversionFailed(String),
    #[error("no save data available")]
    NoSaveDataAvailable,
    #[error("invalid button '{0}'")]
    InvalidButtonName(String),
    #[error("invalid downscale amount '{0}' (expected 2, 4 or 8)")]
    InvalidDownscaleArgument(String),
    #[error("invalid save name")]
    InvalidSaveName,
    #[error("no bricks in clipboard")]
    NoTemplate,
}
