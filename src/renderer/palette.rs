use anyhow::Result;
use std::path::Path;

use super::frame::RgbColor;

const PALETTE_KEY: &str = "SavedServerPalettes=(Groups=(";
const PALETTE_END: &str = "),Description=";

/// Ordered, non-empty set of reference colors used for snapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<RgbColor>,
}

impl Palette {
    pub fn new(colors: Vec<RgbColor>) -> Result<Self> {
        if colors.is_empty() {
            anyhow::bail!("palette must contain at least one color");
        }
        Ok(Self { colors })
    }

    /// Fallback when the host has no saved palette
    pub fn white() -> Self {
        Self { colors: vec![RgbColor::WHITE] }
    }

    pub fn colors(&self) -> &[RgbColor] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Scan the host's server settings for its saved palette.
    ///
    /// Channels are stored B,G,R by the host; each one is passed through
    /// [`srgb_transfer`] before it is kept.
    pub fn from_server_settings(settings: &str) -> Option<Self> {
        let start = settings.find(PALETTE_KEY)? + PALETTE_KEY.len();
        let line = settings[start..].lines().next()?;
        let body = &line[..line.rfind(PALETTE_END)?];

        let colors: Vec<RgbColor> = scan_bgr_triples(body)
            .into_iter()
            .map(|(b, g, r)| RgbColor(srgb_transfer(r), srgb_transfer(g), srgb_transfer(b)))
            .collect();

        Self::new(colors).ok()
    }

    /// Load from a settings file, falling back to white when the file or palette is missing.
    pub fn load(settings_path: Option<&Path>) -> Self {
        let Some(path) = settings_path else {
            return Self::white();
        };

        match std::fs::read_to_string(path) {
            Ok(settings) => match Self::from_server_settings(&settings) {
                Some(palette) => {
                    crate::utils::logger::info(&format!(
                        "Scanned {} colors from server palette",
                        palette.len()
                    ));
                    palette
                }
                None => {
                    crate::utils::logger::warn(&format!(
                        "No saved palette in {}; snapping to white",
                        path.display()
                    ));
                    Self::white()
                }
            },
            Err(e) => {
                crate::utils::logger::warn(&format!(
                    "Could not read server settings {}: {}",
                    path.display(),
                    e
                ));
                Self::white()
            }
        }
    }
}

/// Per-channel transfer applied to host palette entries.
pub fn srgb_transfer(c: u8) -> u8 {
    let v = c as f64 / 255.0;
    let out = if v > 0.0031308 {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    } else {
        v * 12.92
    };
    (out * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Every `B=<n>,G=<n>,R=<n>` in `body`, in order of appearance.
fn scan_bgr_triples(body: &str) -> Vec<(u8, u8, u8)> {
    let mut triples = Vec::new();
    let mut rest = body;

    while let Some(pos) = rest.find("B=") {
        rest = &rest[pos + 2..];
        if let Some((triple, after)) = take_triple(rest) {
            triples.push(triple);
            rest = after;
        }
    }

    triples
}

fn take_triple(s: &str) -> Option<((u8, u8, u8), &str)> {
    let (b, rest) = take_channel(s)?;
    let (g, rest) = take_channel(rest.strip_prefix(",G=")?)?;
    let (r, rest) = take_channel(rest.strip_prefix(",R=")?)?;
    Some(((b, g, r), rest))
}

fn take_channel(s: &str) -> Option<(u8, &str)> {
    let digits = s.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let value = s[..digits].parse::<u32>().ok()?.min(255) as u8;
    Some((value, &s[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = "[/Script/Brickadia.BRServerSettings]\n\
        ServerName=test\n\
        SavedServerPalettes=(Groups=((Name=\"Default\",Colors=((B=0,G=0,R=255,A=255),(B=128,G=128,R=128,A=255),(B=255,G=255,R=255,A=255)))),Description=\"pal\")\n\
        \n\
        Other=1\n";

    #[test]
    fn test_transfer_endpoints_and_midpoint() {
        assert_eq!(srgb_transfer(0), 0);
        assert_eq!(srgb_transfer(255), 255);
        assert_eq!(srgb_transfer(128), 188);
    }

    #[test]
    fn test_parses_palette_in_order() {
        let palette = Palette::from_server_settings(SETTINGS).unwrap();
        assert_eq!(
            palette.colors(),
            &[
                RgbColor(255, 0, 0),
                RgbColor(188, 188, 188),
                RgbColor(255, 255, 255)
            ]
        );
    }

    #[test]
    fn test_missing_palette_section() {
        assert!(Palette::from_server_settings("ServerName=x\n").is_none());
        assert!(Palette::new(Vec::new()).is_err());
        assert_eq!(Palette::load(None), Palette::white());
    }
}
