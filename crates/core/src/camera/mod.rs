use std::{io::Cursor, path::PathBuf, sync::Arc};

use image::{ImageFormat, Rgba, RgbaImage};

/// Still capture handed over by a [`Camera`]: encoded image bytes.
///
/// Frames are immutable once produced and cheap to clone, so the sequencer
/// state and the compositor can share them without copying pixel data.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Arc<[u8]>,
}

impl Frame {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame").field("len", &self.len()).finish()
    }
}

/// Source of still frames. `snapshot` must not block; it returns `None` when
/// no live feed is attached.
pub trait Camera {
    fn snapshot(&mut self) -> Option<Frame>;
}

impl<C: Camera + ?Sized> Camera for &mut C {
    fn snapshot(&mut self) -> Option<Frame> {
        (**self).snapshot()
    }
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn snapshot(&mut self) -> Option<Frame> {
        (**self).snapshot()
    }
}

/// Camera with no feed attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

impl Camera for Disconnected {
    fn snapshot(&mut self) -> Option<Frame> {
        None
    }
}

const SYNTHETIC_PALETTE: [[u8; 3]; 6] = [
    [0xff, 0xb3, 0xba],
    [0xa8, 0xd8, 0xea],
    [0xa8, 0xe6, 0xcf],
    [0xa3, 0x9f, 0xd1],
    [0xff, 0x8b, 0x94],
    [0x55, 0x6b, 0x6d],
];

/// Deterministic test pattern camera. Every snapshot is a PNG tinted with the
/// next palette colour and carrying a darker marker block on its left edge,
/// so mirroring is visible in the output.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    mirrored: bool,
    taken: usize,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            mirrored: false,
            taken: 0,
        }
    }

    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    /// Number of snapshots produced so far.
    pub fn taken(&self) -> usize {
        self.taken
    }

    fn render(&self, index: usize) -> RgbaImage {
        let [r, g, b] = SYNTHETIC_PALETTE[index % SYNTHETIC_PALETTE.len()];
        let marker = (self.width / 8).max(1);
        let mut img = RgbaImage::from_fn(self.width, self.height, |x, _| {
            if x < marker {
                Rgba([r / 2, g / 2, b / 2, 255])
            } else {
                Rgba([r, g, b, 255])
            }
        });
        if self.mirrored {
            image::imageops::flip_horizontal_in_place(&mut img);
        }
        img
    }
}

impl Camera for SyntheticCamera {
    fn snapshot(&mut self) -> Option<Frame> {
        let img = self.render(self.taken);
        self.taken += 1;

        let mut bytes = Vec::new();
        match img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png) {
            Ok(()) => Some(Frame::from_bytes(bytes)),
            Err(err) => {
                tracing::warn!(%err, "CaptureUnavailable: synthetic frame encode failed");
                None
            }
        }
    }
}

/// Replays image files from disk, one per snapshot. Missing or unreadable
/// files, and snapshots past the end of the list, yield `None`.
#[derive(Debug, Clone, Default)]
pub struct FileCamera {
    paths: Vec<Option<PathBuf>>,
    next: usize,
}

impl FileCamera {
    /// `None` entries stand for a shot where the camera had no feed.
    pub fn new(paths: Vec<Option<PathBuf>>) -> Self {
        Self { paths, next: 0 }
    }
}

impl Camera for FileCamera {
    fn snapshot(&mut self) -> Option<Frame> {
        let slot = self.paths.get(self.next).cloned();
        self.next += 1;

        let path = match slot {
            Some(Some(path)) => path,
            _ => {
                tracing::warn!(shot = self.next - 1, "CaptureUnavailable: no feed attached");
                return None;
            }
        };

        match std::fs::read(&path) {
            Ok(bytes) => Some(Frame::from_bytes(bytes)),
            Err(err) => {
                tracing::warn!(?path, %err, "CaptureUnavailable: could not read frame");
                None
            }
        }
    }
}
