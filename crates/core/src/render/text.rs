//! Watermark rasterisation with cosmic-text.

use std::sync::Mutex;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use image::{Pixel, Rgba, RgbaImage};
use once_cell::sync::Lazy;

use super::{Anchor, FontFamily, Watermark};

// Loading system fonts is slow, so one font system serves every collage.
static FONT_SYSTEM: Lazy<Mutex<FontSystem>> = Lazy::new(|| Mutex::new(FontSystem::new()));
static SWASH_CACHE: Lazy<Mutex<SwashCache>> = Lazy::new(|| Mutex::new(SwashCache::new()));

/// Draws `mark` with its baseline `mark.margin` pixels above the bottom edge.
///
/// Hosts without any installed font simply get no watermark.
pub(super) fn draw_watermark(canvas: &mut RgbaImage, mark: &Watermark) {
    if mark.text.is_empty() {
        return;
    }

    let (Ok(mut font_system), Ok(mut swash_cache)) = (FONT_SYSTEM.lock(), SWASH_CACHE.lock())
    else {
        tracing::warn!("font system poisoned, watermark skipped");
        return;
    };

    let metrics = Metrics::new(mark.font_size, mark.font_size * 1.2);
    let mut buffer = Buffer::new(&mut font_system, metrics);
    // Unbounded width keeps the label on a single line.
    buffer.set_size(&mut font_system, None, None);

    let family = match &mark.family {
        FontFamily::SansSerif => Family::SansSerif,
        FontFamily::Serif => Family::Serif,
        FontFamily::Monospace => Family::Monospace,
        FontFamily::Cursive => Family::Cursive,
        FontFamily::Fantasy => Family::Fantasy,
        FontFamily::Named(name) => Family::Name(name.as_str()),
    };
    let weight = if mark.bold { Weight::BOLD } else { Weight::NORMAL };
    let attrs = Attrs::new().family(family).weight(weight);

    buffer.set_text(&mut font_system, &mark.text, attrs, Shaping::Advanced);
    buffer.shape_until_scroll(&mut font_system, false);

    let Some((text_width, baseline)) = buffer
        .layout_runs()
        .next()
        .map(|run| (run.line_w, run.line_y))
    else {
        return;
    };

    let canvas_width = canvas.width() as f32;
    let margin = mark.margin as f32;
    let origin_x = match mark.anchor {
        Anchor::BottomLeft => margin,
        Anchor::BottomCenter => (canvas_width - text_width) / 2.0,
        Anchor::BottomRight => canvas_width - margin - text_width,
    }
    .round() as i32;
    let origin_y = (canvas.height() as f32 - margin - baseline).round() as i32;

    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    buffer.draw(
        &mut font_system,
        &mut swash_cache,
        mark.color.into(),
        |x, y, w, h, color| {
            let alpha = color.a();
            if alpha == 0 {
                return;
            }
            let src = Rgba([color.r(), color.g(), color.b(), alpha]);
            for dy in 0..h as i32 {
                for dx in 0..w as i32 {
                    let px = origin_x + x + dx;
                    let py = origin_y + y + dy;
                    if px < 0 || py < 0 || px >= width || py >= height {
                        continue;
                    }
                    canvas.get_pixel_mut(px as u32, py as u32).blend(&src);
                }
            }
        },
    );
}
