use cuppa_core::Theme;
use ratatui::style::Color;
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub border_fg: Color,
    pub help_fg: Color,
    pub error_fg: Color,
}

fn dark() -> Palette {
    Palette {
        fg: Color::Gray,
        bg: Color::Reset,
        accent: Color::Yellow,
        highlight_fg: Color::Black,
        highlight_bg: Color::Cyan,
        border_fg: Color::DarkGray,
        help_fg: Color::Yellow,
        error_fg: Color::LightRed,
    }
}

fn light() -> Palette {
    Palette {
        fg: Color::Black,
        bg: Color::White,
        accent: Color::Rgb(0x8b, 0x45, 0x13),
        highlight_fg: Color::White,
        highlight_bg: Color::Blue,
        border_fg: Color::Gray,
        help_fg: Color::Rgb(0x5a, 0x3a, 0x1a),
        error_fg: Color::Red,
    }
}

#[derive(Deserialize, Default)]
struct RawPalette {
    fg: Option<String>,
    bg: Option<String>,
    accent: Option<String>,
    highlight_fg: Option<String>,
    highlight_bg: Option<String>,
    border_fg: Option<String>,
    help_fg: Option<String>,
    error_fg: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawThemes {
    dark: Option<RawPalette>,
    light: Option<RawPalette>,
}

impl RawPalette {
    fn apply(self, mut p: Palette) -> Palette {
        let pick = |raw: Option<String>, fallback: Color| {
            raw.as_deref().and_then(parse_color).unwrap_or(fallback)
        };
        p.fg = pick(self.fg, p.fg);
        p.bg = pick(self.bg, p.bg);
        p.accent = pick(self.accent, p.accent);
        p.highlight_fg = pick(self.highlight_fg, p.highlight_fg);
        p.highlight_bg = pick(self.highlight_bg, p.highlight_bg);
        p.border_fg = pick(self.border_fg, p.border_fg);
        p.help_fg = pick(self.help_fg, p.help_fg);
        p.error_fg = pick(self.error_fg, p.error_fg);
        p
    }
}

pub fn builtin(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => dark(),
        Theme::Light => light(),
    }
}

/// Built-in palette for `theme`, adjusted by the `[dark]`/`[light]` table of `overrides`.
pub fn load_palette(theme: Theme, overrides: &Path) -> Palette {
    let base = builtin(theme);
    let Ok(s) = std::fs::read_to_string(overrides) else {
        return base;
    };
    match toml::from_str::<RawThemes>(&s) {
        Ok(raw) => {
            let section = match theme {
                Theme::Dark => raw.dark,
                Theme::Light => raw.light,
            };
            section.map(|r| r.apply(base)).unwrap_or(base)
        }
        Err(e) => {
            tracing::warn!(path = %overrides.display(), error = %e, "palette overrides ignored");
            base
        }
    }
}

pub fn parse_color(s: &str) -> Option<Color> {
    let k = s.trim().to_ascii_lowercase();
    match k.as_str() {
        "reset" | "default" => Some(Color::Reset),
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        _ => {
            if let Some(hex) = k.strip_prefix('#') {
                return parse_hex(hex);
            }
            if let Some(rest) = k.strip_prefix("rgb(") {
                return parse_rgb_tuple(rest);
            }
            None
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn parse_rgb_tuple(rest: &str) -> Option<Color> {
    let t = rest.strip_suffix(')')?;
    let parts: Vec<_> = t.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    Some(Color::Rgb(r, g, b))
}
