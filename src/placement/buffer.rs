use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::owner::{other, Owner, OWNERS};

/// How artifacts are spread across the two owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Strict A/B flip; the other owner is cleared right after each placement.
    Alternate,
    /// `size` frames stacked upward; the first half goes to owner A, the second to owner B.
    Windowed { size: u32 },
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        PlacementPolicy::Alternate
    }
}

/// Where the next artifact goes and what to clear once it is down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub slot: usize,
    pub offset: [i32; 3],
    /// Selects one of the two scratch artifact files
    pub artifact_slot: usize,
    pub clear_after: Option<usize>,
}

impl Placement {
    pub fn owner(&self) -> &'static Owner {
        &OWNERS[self.slot]
    }

    pub fn clear_owner(&self) -> Option<&'static Owner> {
        self.clear_after.map(|slot| &OWNERS[slot])
    }
}

/// Double-buffer bookkeeping for placed frames.
///
/// [`plan`](Self::plan) is a pure function of the frame index; counters only
/// move on [`commit`](Self::commit), after the artifact is actually in the world.
pub struct PlacementBuffer {
    policy: PlacementPolicy,
    layer_height: i32,
    total_frames: u64,
    frame_index: u32,
}

impl PlacementBuffer {
    pub fn new(policy: PlacementPolicy, pixel_size: u32) -> Result<Self> {
        if let PlacementPolicy::Windowed { size } = policy {
            if size < 2 || size % 2 != 0 {
                anyhow::bail!("windowed placement needs an even window of at least 2, got {}", size);
            }
        }
        Ok(Self {
            policy,
            layer_height: (pixel_size * 2) as i32,
            total_frames: 0,
            frame_index: 0,
        })
    }

    /// Frames per full buffer
    pub fn window(&self) -> u32 {
        match self.policy {
            PlacementPolicy::Alternate => 2,
            PlacementPolicy::Windowed { size } => size,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    #[cfg(test)]
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn plan(&self) -> Placement {
        let index = self.frame_index;
        let artifact_slot = (self.total_frames % 2) as usize;

        match self.policy {
            PlacementPolicy::Alternate => {
                let slot = (index % 2) as usize;
                Placement {
                    slot,
                    offset: [0, 0, slot as i32 * self.layer_height],
                    artifact_slot,
                    clear_after: Some(other(slot)),
                }
            }
            PlacementPolicy::Windowed { size } => {
                let half = size / 2;
                let slot = if index < half { 0 } else { 1 };
                // last frame of a half: empty the owner that is up next
                let clear_after = if index == half - 1 || index == size - 1 {
                    Some(other(slot))
                } else {
                    None
                };
                Placement {
                    slot,
                    offset: [0, 0, index as i32 * self.layer_height],
                    artifact_slot,
                    clear_after,
                }
            }
        }
    }

    pub fn commit(&mut self) {
        self.total_frames += 1;
        self.frame_index = (self.frame_index + 1) % self.window();
    }
}
