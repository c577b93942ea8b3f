use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convert::ConversionMode;
use crate::placement::PlacementPolicy;
use crate::shared::constants;
use crate::utils::file_utils;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Player allowed to run session commands
    pub host_name: String,
    pub paths: Paths,
    pub converter: ConverterConfig,
    pub timing: Timing,
    pub placement: PlacementPolicy,
    pub toggles: Toggles,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub roms: PathBuf,
    pub saves: PathBuf,
    /// Scratch space for the per-frame PNG
    pub work: PathBuf,
    /// Where the host loads artifacts from
    pub artifacts: PathBuf,
    pub store: PathBuf,
    pub logs: PathBuf,
    /// ServerSettings.ini carrying the saved palettes
    pub palette_source: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: PathBuf,
    pub scale: u32,
    pub verbosity: u32,
    pub mode: ConversionMode,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub frame_ms: u64,
    pub slow_frame_ms: u64,
    pub input_ms: u64,
    pub autosave_secs: u64,
}

/// Session toggles at startup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggles {
    pub downscale: bool,
    pub block: usize,
    pub snap: bool,
    pub slow: bool,
    pub physical: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_name: String::new(),
            paths: Paths::default(),
            converter: ConverterConfig::default(),
            timing: Timing::default(),
            placement: PlacementPolicy::default(),
            toggles: Toggles::default(),
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            roms: PathBuf::from("rom"),
            saves: PathBuf::from("saves"),
            work: PathBuf::from("."),
            artifacts: PathBuf::from("data/Saved/Builds"),
            store: PathBuf::from("store.json"),
            logs: PathBuf::from("logs"),
            palette_source: Some(PathBuf::from(
                "data/Saved/Config/LinuxServer/ServerSettings.ini",
            )),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("./heightmap"),
            scale: constants::PIXEL_SIZE,
            verbosity: 1,
            mode: ConversionMode::Micro,
            timeout_secs: constants::CONVERSION_TIMEOUT_SECS,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            frame_ms: constants::FRAME_TIME_MS,
            slow_frame_ms: constants::SLOW_FRAME_TIME_MS,
            input_ms: constants::INPUT_POLL_MS,
            autosave_secs: constants::AUTOSAVE_SECS,
        }
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            downscale: false,
            block: constants::DEFAULT_DOWNSCALE_BLOCK,
            snap: false,
            slow: false,
            physical: true,
        }
    }
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Timing {
    pub fn render_interval(&self, slow: bool) -> Duration {
        Duration::from_millis(if slow { self.slow_frame_ms } else { self.frame_ms })
    }

    pub fn input_interval(&self) -> Duration {
        Duration::from_millis(self.input_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs)
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::APP_NAME);
        path.push(constants::CONFIG_FILE);
        path
    }

    /// Read `path` (or the default location). A missing file gets the defaults
    /// written out; a malformed one is replaced by defaults in memory.
    ///
    /// Runs before the logger exists, so any problem is handed back to the caller to report.
    pub fn load(path: Option<&Path>) -> (Self, Option<anyhow::Error>) {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            let config = Config::default();
            let problem = config.write(&path).err();
            return (config, problem);
        }

        match Self::read(&path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e.context("using default config"))),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let data = file_utils::read_file(path)?;
        let config: Config = serde_json::from_slice(&data)
            .with_context(|| format!("Error parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = self.to_json()?;
        file_utils::write_file(path, contents.as_bytes())
            .with_context(|| format!("Error writing {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    fn validate(&self) -> Result<()> {
        if !constants::DOWNSCALE_BLOCK_SIZES.contains(&self.toggles.block) {
            anyhow::bail!(
                "toggles.block must be one of {:?}, got {}",
                constants::DOWNSCALE_BLOCK_SIZES,
                self.toggles.block
            );
        }
        if let PlacementPolicy::Windowed { size } = self.placement {
            if size < 2 || size % 2 != 0 {
                anyhow::bail!("placement window must be even and at least 2, got {}", size);
            }
        }
        Ok(())
    }
}
