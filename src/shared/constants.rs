pub const APP_NAME: &str = "brickscreen";

pub const CONFIG_FILE: &str = "config.json";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;

pub const ROM_EXTENSION: &str = "gba";
pub const SAVE_EXTENSION: &str = "sav";
pub const AUTOSAVE_NAME: &str = "_autosave";

pub const FRAME_IMAGE_FILE: &str = "temp.png";
pub const TEMP_ARTIFACT_PREFIX: &str = "gba_temp_";
pub const ARTIFACT_EXTENSION: &str = "brs";

pub const FRAME_TIME_MS: u64 = 200;
pub const SLOW_FRAME_TIME_MS: u64 = 500;
pub const INPUT_POLL_MS: u64 = 200;
pub const AUTOSAVE_SECS: u64 = 30;
pub const CONVERSION_TIMEOUT_SECS: u64 = 30;

pub const PIXEL_SIZE: u32 = 1;
pub const DOWNSCALE_BLOCK_SIZES: &[usize] = &[2, 4, 8];
pub const DEFAULT_DOWNSCALE_BLOCK: usize = 4;

/// Vertical slack above a button region's top face that still counts as standing on it.
pub const BUTTON_VERTICAL_TOLERANCE: f64 = 50.0;
/// The physical gamepad stays idle until at least this many buttons are bound.
pub const MIN_BUTTON_REGIONS: usize = 5;

pub const BUTTONS_STORE_KEY: &str = "buttons";

pub const CHAT_PREFIX: &str = "<color=\\\"999999\\\">[<color=\\\"99ff99\\\">gba</>]</>";
