use crate::*;

/// Parse a CSS-ish color string into a packed `0xRRGGBB` value plus an alpha
/// in `0.0..=1.0`.
///
/// Accepted forms: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
/// `rgba(r, g, b, a)` and a handful of named colors. Anything else is
/// rejected so a typo in a style sheet fails loudly instead of rendering
/// black.
pub fn parse_color(input: &str) -> Result<(u32, f32), SceneError> {
    let value = input.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| SceneError::InvalidColor(input.to_string()));
    }
    if value.starts_with("rgb") {
        return parse_rgb_call(value).ok_or_else(|| SceneError::InvalidColor(input.to_string()));
    }
    named_color(value).ok_or_else(|| SceneError::InvalidColor(input.to_string()))
}

fn parse_hex(hex: &str) -> Option<(u32, f32)> {
    match hex.len() {
        3 => {
            let mut packed = 0u32;
            for ch in hex.chars() {
                let digit = ch.to_digit(16)?;
                packed = packed << 8 | digit << 4 | digit;
            }
            Some((packed, 1.0))
        }
        6 => Some((u32::from_str_radix(hex, 16).ok()?, 1.0)),
        8 => {
            let packed = u32::from_str_radix(hex, 16).ok()?;
            Some((packed >> 8, (packed & 0xff) as f32 / 255.0))
        }
        _ => None,
    }
}

fn parse_rgb_call(value: &str) -> Option<(u32, f32)> {
    let args = value
        .strip_prefix("rgba")
        .or_else(|| value.strip_prefix("rgb"))?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let r: u8 = parts[0].parse().ok()?;
    let g: u8 = parts[1].parse().ok()?;
    let b: u8 = parts[2].parse().ok()?;
    let alpha = match parts.get(3) {
        Some(raw) => {
            let a: f32 = raw.parse().ok()?;
            if !(0.0..=1.0).contains(&a) {
                return None;
            }
            a
        }
        None => 1.0,
    };
    Some(((r as u32) << 16 | (g as u32) << 8 | b as u32, alpha))
}

fn named_color(name: &str) -> Option<(u32, f32)> {
    let packed = match name.to_ascii_lowercase().as_str() {
        "black" => 0x000000,
        "white" => 0xffffff,
        "red" => 0xff0000,
        "green" => 0x008000,
        "blue" => 0x0000ff,
        "yellow" => 0xffff00,
        "cyan" => 0x00ffff,
        "magenta" => 0xff00ff,
        "orange" => 0xffa500,
        "purple" => 0x800080,
        "gray" | "grey" => 0x808080,
        "lightgray" | "lightgrey" => 0xd3d3d3,
        "transparent" => return Some((0x000000, 0.0)),
        _ => return None,
    };
    Some((packed, 1.0))
}
