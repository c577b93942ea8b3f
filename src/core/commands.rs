use anyhow::Result;

use super::error::SessionError;
use super::session::Session;
use crate::gamepad::Button;
use crate::host::{Host, KeyValueStore};
use crate::shared::constants;
use crate::utils::logger;

/// Host chat commands, `!<name> [args...]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Start { rom: Option<String>, save: Option<String> },
    Pause,
    Snap,
    Physical,
    Slow,
    Downscale(Option<String>),
    SetButton(Option<String>),
    Save(Option<String>),
}

impl ChatCommand {
    /// `None` for ordinary chat and unknown commands.
    pub fn parse(message: &str) -> Option<Self> {
        let mut words = message.trim().strip_prefix('!')?.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();
        let mut arg = || words.next().map(str::to_string);

        let command = match name.as_str() {
            "gba" => {
                let rom = arg();
                let save = arg();
                ChatCommand::Start { rom, save }
            }
            "pause" => ChatCommand::Pause,
            "snap" => ChatCommand::Snap,
            "physical" => ChatCommand::Physical,
            "slow" => ChatCommand::Slow,
            "downscale" => ChatCommand::Downscale(arg()),
            "setbutton" => ChatCommand::SetButton(arg()),
            "gbasave" => ChatCommand::Save(arg()),
            _ => return None,
        };
        Some(command)
    }
}

/// `2`, `4` or `8`
pub fn parse_downscale_arg(arg: &str) -> Result<usize, SessionError> {
    arg.parse::<usize>()
        .ok()
        .filter(|block| constants::DOWNSCALE_BLOCK_SIZES.contains(block))
        .ok_or_else(|| SessionError::InvalidDownscaleArgument(arg.to_string()))
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

/// Route one chat line: key taps from anyone, commands from the host only.
pub fn handle_chat(
    session: &mut Session,
    host: &mut dyn Host,
    store: &mut dyn KeyValueStore,
    player: &str,
    message: &str,
) -> Result<()> {
    if session.has_emulator() {
        if let Ok(button) = Button::parse(message) {
            session.tap(button);
            return Ok(());
        }
    }

    let Some(command) = ChatCommand::parse(message) else {
        return Ok(());
    };
    if !session.is_authorized(player) {
        logger::debug(&format!("Ignoring {:?} from {}", command, player));
        return Ok(());
    }
    dispatch(session, host, store, player, command)
}

pub fn dispatch(
    session: &mut Session,
    host: &mut dyn Host,
    store: &mut dyn KeyValueStore,
    player: &str,
    command: ChatCommand,
) -> Result<()> {
    match command {
        ChatCommand::Start { rom, save } => {
            let rom = rom.unwrap_or_default();
            match session.start(&rom, save.as_deref()) {
                Ok(()) => host.broadcast("Created emulator")?,
                Err(e) => {
                    logger::error(&format!("Error creating emulator: {:#}", e));
                    host.broadcast(&format!("Error creating emulator: {}", e))?;
                }
            }
        }
        ChatCommand::Pause => {
            session.rendering = !session.rendering;
            host.broadcast(&format!("Rendering {}", enabled(session.rendering)))?;
        }
        ChatCommand::Snap => {
            session.snap = !session.snap;
            host.broadcast(&format!("Palette snapping {}", enabled(session.snap)))?;
        }
        ChatCommand::Physical => {
            session.physical = !session.physical;
            host.broadcast(&format!("Physical Gamepad {}", enabled(session.physical)))?;
        }
        ChatCommand::Slow => {
            session.slow = !session.slow;
            host.broadcast(&format!("Slow Mode {}", enabled(session.slow)))?;
        }
        ChatCommand::Downscale(arg) => match arg.as_deref().map(parse_downscale_arg) {
            Some(Ok(block)) => {
                session.block = block;
                session.downscale = true;
                host.broadcast(&format!("Downscale set to {}x", block))?;
            }
            other => {
                if let Some(Err(e)) = other {
                    logger::warn(&e.to_string());
                }
                session.downscale = !session.downscale;
                host.broadcast(&format!("Downscale {}", enabled(session.downscale)))?;
            }
        },
        ChatCommand::SetButton(name) => {
            let bounds = host.template_bounds(player)?;
            match session.set_button(name.as_deref(), bounds, store) {
                Ok((button, bounds)) => host.broadcast(&format!(
                    "{}: {}x{}",
                    button,
                    bounds.width(),
                    bounds.depth()
                ))?,
                Err(e) => host.broadcast(&capitalize(&e.to_string()))?,
            }
        }
        ChatCommand::Save(name) => match session.save(name.as_deref()) {
            Ok(path) => {
                logger::info(&format!("Saved data to {}", path.display()));
                host.broadcast(&format!("Saved data to {}", name.unwrap_or_default()))?;
            }
            Err(e) => {
                logger::error(&format!("Error saving: {:#}", e));
                host.broadcast(&format!("Error: {}", e))?;
            }
        },
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
