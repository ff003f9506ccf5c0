//! Badge geometry inside the logo band.
//!
//! Layout is pure: it only needs each badge's logo size, its text and a
//! function measuring text width at a given pixel size. The band is split
//! into equal slots, one per badge. All badges share one font size (the
//! smallest that lets every text fit its slot) and one left margin (the
//! smallest leftover space of any slot).

/// Logo height as a fraction of the band height.
pub const LOGO_HEIGHT_RATIO: f32 = 0.6;
/// Upper bound on the font size as a fraction of the band height.
pub const MAX_TEXT_RATIO: f32 = 0.5;
/// Space between logo and text as a fraction of the logo height.
pub const GAP_RATIO: f32 = 0.15;
/// Share of a slot badge content may use.
pub const SLOT_FILL: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// What the layout needs to know about one badge.
#[derive(Debug, Clone, Copy)]
pub struct BadgeInput<'a> {
    pub logo_width: u32,
    pub logo_height: u32,
    pub text: &'a str,
}

/// Where one badge is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgePlacement {
    pub logo: Rect,
    /// Left edge of the score text.
    pub text_x: f32,
    /// Vertical centre line the text is centred on.
    pub text_center_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    pub font_size: f32,
    pub margin: u32,
    pub badges: Vec<BadgePlacement>,
}

impl BandLayout {
    fn empty() -> Self {
        Self {
            font_size: 0.0,
            margin: 0,
            badges: Vec::new(),
        }
    }
}

/// Lay out `badges` evenly across `band`.
///
/// `measure(text, px)` returns the advance width of `text` at `px` pixels.
pub fn layout_band<F>(band: Rect, badges: &[BadgeInput<'_>], measure: F) -> BandLayout
where
    F: Fn(&str, f32) -> f32,
{
    if badges.is_empty() || band.width == 0 || band.height == 0 {
        return BandLayout::empty();
    }

    let slot_width = band.width / badges.len() as u32;
    let usable = slot_width as f32 * SLOT_FILL;
    let target_logo_height = ((band.height as f32 * LOGO_HEIGHT_RATIO).round() as u32).max(1);
    let gap = target_logo_height as f32 * GAP_RATIO;
    let max_font = band.height as f32 * MAX_TEXT_RATIO;

    let logo_sizes: Vec<(u32, u32)> = badges
        .iter()
        .map(|b| scale_logo(b, target_logo_height, usable))
        .collect();

    let font_size = badges
        .iter()
        .zip(&logo_sizes)
        .filter(|(b, _)| !b.text.is_empty())
        .map(|(b, (lw, _))| {
            let available = usable - *lw as f32 - gap;
            let width = measure(b.text, max_font);
            if width <= available {
                max_font
            } else if available <= 0.0 {
                0.0
            } else {
                max_font * available / width
            }
        })
        .fold(max_font, f32::min);

    let margin = badges
        .iter()
        .zip(&logo_sizes)
        .map(|(b, (lw, _))| {
            let text = if b.text.is_empty() {
                0.0
            } else {
                gap + measure(b.text, font_size)
            };
            ((slot_width as f32 - *lw as f32 - text) / 2.0).max(0.0)
        })
        .fold(f32::INFINITY, f32::min)
        .floor() as u32;

    let center_y = band.y as f32 + band.height as f32 / 2.0;
    let placements = logo_sizes
        .iter()
        .enumerate()
        .map(|(i, &(lw, lh))| {
            let x = band.x + i as u32 * slot_width + margin;
            let y = band.y + band.height.saturating_sub(lh) / 2;
            BadgePlacement {
                logo: Rect::new(x, y, lw, lh),
                text_x: (x + lw) as f32 + gap,
                text_center_y: center_y,
            }
        })
        .collect();

    BandLayout {
        font_size,
        margin,
        badges: placements,
    }
}

/// Scale a logo to `height`, shrinking further if it would overflow its slot.
fn scale_logo(badge: &BadgeInput<'_>, height: u32, usable: f32) -> (u32, u32) {
    let src_h = badge.logo_height.max(1) as f32;
    let mut w = badge.logo_width as f32 * height as f32 / src_h;
    let mut h = height as f32;
    if w > usable && w > 0.0 {
        h *= usable / w;
        w = usable;
    }
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}
