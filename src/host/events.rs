use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::thread::JoinHandle;

/// Pose as reported by the host in one update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPose {
    pub pawn: String,
    pub pos: [f64; 3],
    #[serde(default)]
    pub crouched: bool,
}

/// One JSON line from the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Chat {
        player: String,
        message: String,
    },
    Positions {
        players: Vec<PlayerPose>,
    },
    Template {
        player: String,
        #[serde(rename = "minBound")]
        min_bound: [f64; 3],
        #[serde(rename = "maxBound")]
        max_bound: [f64; 3],
    },
}

/// Blank lines parse to `None`
pub fn parse_line(line: &str) -> serde_json::Result<Option<HostEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Read host events on a background thread until EOF or until the receiver goes away.
///
/// The sender is dropped on exit, which the scheduler takes as the host going away.
pub fn spawn_event_reader<R>(reader: R, sender: Sender<HostEvent>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        crate::utils::logger::debug("Host event reader started");
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    crate::utils::logger::error(&format!("Host input error: {}", e));
                    break;
                }
            };
            match parse_line(&line) {
                Ok(Some(event)) => {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => crate::utils::logger::warn(&format!("Ignoring host line {:?}: {}", line, e)),
            }
        }
        crate::utils::logger::debug("Host event reader exiting");
    })
}
