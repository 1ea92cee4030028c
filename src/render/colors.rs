//! Color rules for pawns and buildings in snapshots

use crate::core::types::Rgb;

/// Background color for empty or out-of-bounds cells
pub const BACKGROUND: Rgb = Rgb(26, 26, 31);

const MISERABLE: Rgb = Rgb(210, 40, 40);
const NEUTRAL: Rgb = Rgb(230, 210, 60);
const CONTENT: Rgb = Rgb(50, 200, 90);

fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Darken color by a factor (0.0 = black, 1.0 = unchanged)
pub fn darken(color: Rgb, factor: f32) -> Rgb {
    lerp(Rgb(0, 0, 0), color, factor)
}

/// Pawn color from mood: red at -100, yellow at 0, green at +100
pub fn mood_color(mood: f32) -> Rgb {
    let mood = mood.clamp(-100.0, 100.0);
    if mood < 0.0 {
        lerp(NEUTRAL, MISERABLE, -mood / 100.0)
    } else {
        lerp(NEUTRAL, CONTENT, mood / 100.0)
    }
}

/// Building color dims while its resource store runs low
pub fn stock_tint(base: Rgb, fill: Option<f32>) -> Rgb {
    match fill {
        Some(fill) => darken(base, 0.6 + 0.4 * fill.clamp(0.0, 1.0)),
        None => base,
    }
}
