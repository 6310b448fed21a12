//! Collage compositing.
//!
//! [`Compositor::compose`] turns the finished frame list into one PNG. All
//! frames are decoded and scaled before the first paint call, then slots,
//! placeholders and finally the watermark are drawn onto a fresh canvas.

mod color;
mod text;

use std::io::Cursor;

use image::{imageops, imageops::FilterType, ImageFormat, RgbaImage};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{camera::Frame, BoothError, Result};

pub use color::Color;

/// Default name handed to the persistence collaborator.
pub const DEFAULT_FILENAME: &str = "FrameIt_Collage.png";

/// Where the block of frames sits vertically on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// First row starts `margin` pixels below the top edge.
    TopAnchored { margin: u32 },
    /// The whole block is vertically centred.
    Centered,
}

/// What to paint in the slot of a frame that is missing or undecodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullFramePolicy {
    Placeholder,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    SansSerif,
    Serif,
    Monospace,
    Cursive,
    Fantasy,
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Brand label drawn over everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Watermark {
    pub text: String,
    pub color: Color,
    pub font_size: f32,
    pub family: FontFamily,
    pub bold: bool,
    pub anchor: Anchor,
    /// Distance from the bottom edge to the text baseline, and from the side
    /// edge for left/right anchors.
    pub margin: u32,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            text: "FrameIt".to_string(),
            color: Color::rgb(0xa3, 0x9f, 0xd1),
            font_size: 40.0,
            family: FontFamily::Cursive,
            bold: true,
            anchor: Anchor::BottomCenter,
            margin: 50,
        }
    }
}

/// Static layout parameters for the collage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollageSpec {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Color,
    pub frame_width: u32,
    pub frame_height: u32,
    pub spacing: u32,
    pub columns: u32,
    pub placement: Placement,
    pub placeholder: Color,
    pub null_frames: NullFramePolicy,
    pub watermark: Option<Watermark>,
    pub filename: String,
}

impl Default for CollageSpec {
    fn default() -> Self {
        Self {
            canvas_width: 600,
            canvas_height: 800,
            background: Color::rgb(0xf8, 0xf5, 0xe6),
            frame_width: 300,
            frame_height: 200,
            spacing: 20,
            columns: 1,
            placement: Placement::TopAnchored { margin: 50 },
            placeholder: Color::rgb(0xd9, 0xd4, 0xc3),
            null_frames: NullFramePolicy::Placeholder,
            watermark: Some(Watermark::default()),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl CollageSpec {
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(BoothError::InvalidSpec("canvas must not be empty".into()));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(BoothError::InvalidSpec("frame size must not be zero".into()));
        }
        if self.columns == 0 {
            return Err(BoothError::InvalidSpec("at least one column is required".into()));
        }
        if self.filename.trim().is_empty() {
            return Err(BoothError::InvalidSpec("filename must not be empty".into()));
        }
        if let Some(mark) = &self.watermark {
            if !(mark.font_size.is_finite() && mark.font_size > 0.0) {
                return Err(BoothError::InvalidSpec(format!(
                    "watermark font size must be positive, got {}",
                    mark.font_size
                )));
            }
        }
        Ok(())
    }
}

/// Pixel rectangle a frame is painted into. May extend past the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Encoded collage ready to be handed to a [`crate::record::CollageSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Compositor {
    spec: CollageSpec,
}

impl Compositor {
    pub fn new(spec: CollageSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &CollageSpec {
        &self.spec
    }

    /// Slot rectangles for `count` frames, in frame order. Frames fill rows
    /// left to right; the block is centred horizontally.
    pub fn layout_slots(&self, count: usize) -> Vec<Slot> {
        let spec = &self.spec;
        let columns = spec.columns.max(1) as usize;
        let used_columns = count.clamp(1, columns) as i64;
        let rows = count.div_ceil(columns).max(1) as i64;

        let (fw, fh, gap) = (
            i64::from(spec.frame_width),
            i64::from(spec.frame_height),
            i64::from(spec.spacing),
        );
        let block_width = used_columns * fw + (used_columns - 1) * gap;
        let block_height = rows * fh + (rows - 1) * gap;

        let x0 = (i64::from(spec.canvas_width) - block_width) / 2;
        let y0 = match spec.placement {
            Placement::TopAnchored { margin } => i64::from(margin),
            Placement::Centered => (i64::from(spec.canvas_height) - block_height) / 2,
        };

        (0..count)
            .map(|i| {
                let row = (i / columns) as i64;
                let col = (i % columns) as i64;
                Slot {
                    x: clamp_i32(x0 + col * (fw + gap)),
                    y: clamp_i32(y0 + row * (fh + gap)),
                    width: spec.frame_width,
                    height: spec.frame_height,
                }
            })
            .collect()
    }

    /// Renders `frames` into one PNG.
    ///
    /// `None` frames and frames that fail to decode get a placeholder box or
    /// an empty slot depending on [`NullFramePolicy`]; neither is an error.
    pub fn compose(&self, frames: &[Option<Frame>]) -> Result<Collage> {
        let spec = &self.spec;

        let tiles: Vec<Option<RgbaImage>> = frames
            .par_iter()
            .enumerate()
            .map(|(index, frame)| {
                frame
                    .as_ref()
                    .and_then(|frame| self.decode_tile(index, frame))
            })
            .collect();

        let mut canvas =
            RgbaImage::from_pixel(spec.canvas_width, spec.canvas_height, spec.background.into());

        for (slot, tile) in self.layout_slots(frames.len()).iter().zip(&tiles) {
            match (tile, spec.null_frames) {
                (Some(tile), _) => {
                    imageops::overlay(&mut canvas, tile, i64::from(slot.x), i64::from(slot.y));
                }
                (None, NullFramePolicy::Placeholder) => {
                    let rect = Rect::at(slot.x, slot.y).of_size(slot.width, slot.height);
                    draw_filled_rect_mut(&mut canvas, rect, spec.placeholder.into());
                }
                (None, NullFramePolicy::Skip) => {}
            }
        }

        if let Some(mark) = &spec.watermark {
            text::draw_watermark(&mut canvas, mark);
        }

        let mut bytes = Vec::new();
        canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

        tracing::info!(
            frames = frames.len(),
            decoded = tiles.iter().filter(|t| t.is_some()).count(),
            size = bytes.len(),
            "collage composed"
        );

        Ok(Collage {
            bytes,
            filename: spec.filename.clone(),
            width: spec.canvas_width,
            height: spec.canvas_height,
        })
    }

    fn decode_tile(&self, index: usize, frame: &Frame) -> Option<RgbaImage> {
        match image::load_from_memory(frame.bytes()) {
            Ok(img) => Some(
                img.resize_exact(
                    self.spec.frame_width,
                    self.spec.frame_height,
                    FilterType::Triangle,
                )
                .to_rgba8(),
            ),
            Err(err) => {
                tracing::warn!(index, %err, "DecodeFailure: frame skipped");
                None
            }
        }
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
