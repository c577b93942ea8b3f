use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use super::{CrouchState, Host, HostEvent, PlayerPosition};
use crate::gamepad::BoundingBox;
use crate::placement::Owner;
use crate::shared::constants;

/// Host that speaks server console commands, one per line.
///
/// Player state is not queried live; it is the latest snapshot delivered
/// through [`HostEvent`]s.
pub struct ConsoleHost<W: Write> {
    out: W,
    positions: Vec<PlayerPosition>,
    crouches: Vec<CrouchState>,
    templates: HashMap<String, BoundingBox>,
}

impl<W: Write> ConsoleHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            positions: Vec::new(),
            crouches: Vec::new(),
            templates: HashMap::new(),
        }
    }

    /// Absorb state updates; chat is left for the session.
    pub fn apply_event(&mut self, event: &HostEvent) {
        match event {
            HostEvent::Positions { players } => {
                self.positions = players
                    .iter()
                    .map(|p| PlayerPosition { pawn: p.pawn.clone(), pos: p.pos })
                    .collect();
                self.crouches = players
                    .iter()
                    .map(|p| CrouchState { pawn: p.pawn.clone(), crouched: p.crouched })
                    .collect();
            }
            HostEvent::Template { player, min_bound, max_bound } => {
                self.templates.insert(
                    player.clone(),
                    BoundingBox { min_bound: *min_bound, max_bound: *max_bound },
                );
            }
            HostEvent::Chat { .. } => {}
        }
    }

    fn writeln(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).context("Failed to write console command")?;
        self.out.flush().context("Failed to flush console")
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Host for ConsoleHost<W> {
    fn place_artifact(&mut self, artifact: &Path, offset: [i32; 3], quiet: bool, snapped: bool) -> Result<()> {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("artifact path has no file name: {}", artifact.display()))?;
        let mut line = format!("Bricks.Load \"{}\" {} {} {}", name, offset[0], offset[1], offset[2]);
        if quiet {
            line.push_str(" 1");
        }
        if snapped {
            line.push_str(" 1 1");
        }
        self.writeln(&line)
    }

    fn clear_owner(&mut self, owner: &Owner, quiet: bool) -> Result<()> {
        let line = if quiet {
            format!("Bricks.Clear {} 1", owner.id)
        } else {
            format!("Bricks.Clear {}", owner.id)
        };
        self.writeln(&line)
    }

    fn player_positions(&mut self) -> Result<Vec<PlayerPosition>> {
        Ok(self.positions.clone())
    }

    fn crouch_states(&mut self) -> Result<Vec<CrouchState>> {
        Ok(self.crouches.clone())
    }

    fn template_bounds(&mut self, player: &str) -> Result<Option<BoundingBox>> {
        Ok(self.templates.get(player).copied())
    }

    fn broadcast(&mut self, message: &str) -> Result<()> {
        let line = format!("Chat.Broadcast \"{} {}\"", constants::CHAT_PREFIX, message);
        self.writeln(&line)
    }
}
