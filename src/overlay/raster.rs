use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, Rgba, RgbaImage};

use super::{OverlayFrame, OverlayStyle};
use crate::geometry::Rect;

const BADGE_MARGIN: i64 = 20;
const BADGE_PADDING: i64 = 12;
const COUNT_SCALE: u32 = 4;
const LABEL_SCALE: u32 = 1;
const GLYPH: i64 = 8;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>> {
    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("color '{value}' must start with '#'"))?;
    if hex.len() != 6 && hex.len() != 8 {
        bail!("color '{value}' must have 6 or 8 hex digits");
    }

    let channel = |idx: usize| -> Result<u8> {
        let digits = hex
            .get(idx..idx + 2)
            .ok_or_else(|| anyhow!("color '{value}' is not ASCII"))?;
        u8::from_str_radix(digits, 16).with_context(|| format!("invalid color '{value}'"))
    };

    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Draws the frame onto a transparent canvas the size of the screen. Boxes
/// that fall partly or wholly off screen are clipped.
pub fn rasterize(frame: &OverlayFrame, style: &OverlayStyle) -> Result<RgbaImage> {
    let width = frame.screen.width.round().max(1.0) as u32;
    let height = frame.screen.height.round().max(1.0) as u32;
    let stroke = parse_hex_color(&style.stroke_color)?;
    let badge = parse_hex_color(&style.badge_color)?;

    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for overlay_box in &frame.boxes {
        draw_rect_outline(&mut img, &overlay_box.rect, stroke, style.stroke_width);
    }
    draw_counter_badge(&mut img, frame.counter.count, &frame.counter.label, badge);
    Ok(img)
}

pub fn write_png(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    DynamicImage::ImageRgba8(img.clone())
        .save(path)
        .with_context(|| format!("failed to save overlay image: {}", path.display()))
}

/// Fills the inclusive span, clipped to the canvas before iterating.
fn fill_rect(img: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    let x_start = x0.max(0);
    let y_start = y0.max(0);
    let x_end = x1.min(i64::from(img.width()) - 1);
    let y_end = y1.min(i64::from(img.height()) - 1);
    for y in y_start..=y_end {
        for x in x_start..=x_end {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_rect_outline(img: &mut RgbaImage, rect: &Rect, color: Rgba<u8>, thickness: u32) {
    // Float to int casts saturate, so every step below stays saturating.
    let w = rect.width.round() as i64;
    let h = rect.height.round() as i64;
    if w <= 0 || h <= 0 {
        return;
    }

    let x0 = rect.x.round() as i64;
    let y0 = rect.y.round() as i64;
    let x1 = x0.saturating_add(w - 1);
    let y1 = y0.saturating_add(h - 1);

    // Bands grow inwards so the outer edge matches the rectangle.
    let t = i64::from(thickness.max(1)) - 1;
    fill_rect(img, x0, y0, x1, y0.saturating_add(t).min(y1), color);
    fill_rect(img, x0, y1.saturating_sub(t).max(y0), x1, y1, color);
    fill_rect(img, x0, y0, x0.saturating_add(t).min(x1), y1, color);
    fill_rect(img, x1.saturating_sub(t).max(x0), y0, x1, y1, color);
}

fn draw_counter_badge(img: &mut RgbaImage, count: usize, label: &str, color: Rgba<u8>) {
    let count_text = count.to_string();
    let count_w = text_width(&count_text, COUNT_SCALE);
    let label_w = text_width(label, LABEL_SCALE);
    let inner_w = count_w.max(label_w);
    let inner_h = GLYPH * i64::from(COUNT_SCALE) + 4 + GLYPH * i64::from(LABEL_SCALE);

    let x1 = i64::from(img.width()) - 1 - BADGE_MARGIN;
    let x0 = x1 - inner_w - 2 * BADGE_PADDING;
    let y0 = BADGE_MARGIN;
    let y1 = y0 + inner_h + 2 * BADGE_PADDING;
    fill_rect(img, x0, y0, x1, y1, color);

    let center = (x0 + x1) / 2;
    let count_y = y0 + BADGE_PADDING;
    draw_text(img, center - count_w / 2, count_y, &count_text, COUNT_SCALE);
    let label_y = count_y + GLYPH * i64::from(COUNT_SCALE) + 4;
    draw_text(img, center - label_w / 2, label_y, label, LABEL_SCALE);
}

fn text_width(text: &str, scale: u32) -> i64 {
    text.chars().count() as i64 * GLYPH * i64::from(scale)
}

fn draw_text(img: &mut RgbaImage, x: i64, y: i64, text: &str, scale: u32) {
    let scale = i64::from(scale.max(1));
    let mut cursor_x = x;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) {
            for (row_idx, &bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let px = cursor_x + col * scale;
                    let py = y + row_idx as i64 * scale;
                    fill_rect(img, px, py, px + scale - 1, py + scale - 1, TEXT_COLOR);
                }
            }
        }
        cursor_x += GLYPH * scale;
    }
}
