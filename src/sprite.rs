//! Glyph sprite strips for dither-style passes.
//!
//! A sprite strip is a single row of square glyph cells: its width is a whole
//! multiple of its height, and the glyph count is `width / height`. Strips can
//! be decoded from image files, generated procedurally, or decoded on a worker
//! thread with [`PendingSprite`] so the frame loop never waits on I/O.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::{Rgba, RgbaImage};

/// Errors that can occur when loading a sprite strip.
#[derive(Debug)]
pub enum SpriteError {
    /// The image could not be read or decoded.
    Decode(image::ImageError),
    /// The image has no pixels.
    Empty,
    /// The width is not a whole multiple of the glyph height.
    NotAStrip { width: u32, height: u32 },
    /// The loader thread exited without producing a result.
    WorkerLost,
}

impl std::fmt::Display for SpriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpriteError::Decode(e) => write!(f, "Sprite decode error: {}", e),
            SpriteError::Empty => write!(f, "Sprite image is empty"),
            SpriteError::NotAStrip { width, height } => write!(
                f,
                "Sprite width {} is not a multiple of glyph height {}",
                width, height
            ),
            SpriteError::WorkerLost => write!(f, "Sprite loader thread exited unexpectedly"),
        }
    }
}

impl std::error::Error for SpriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpriteError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for SpriteError {
    fn from(e: image::ImageError) -> Self {
        SpriteError::Decode(e)
    }
}

/// A validated horizontal strip of square glyph cells.
#[derive(Clone, Debug)]
pub struct SpriteSheet {
    image: RgbaImage,
}

impl SpriteSheet {
    /// Validates an RGBA image as a glyph strip.
    pub fn from_image(image: RgbaImage) -> Result<Self, SpriteError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SpriteError::Empty);
        }
        if width % height != 0 {
            return Err(SpriteError::NotAStrip { width, height });
        }
        Ok(Self { image })
    }

    /// Decodes a strip from an image file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SpriteError> {
        Self::from_image(image::open(path)?.to_rgba8())
    }

    /// Generates `count` glyphs of `glyph_size` pixels: white squares on black
    /// that shrink with the glyph index, from a full cell down to 40% of it.
    pub fn generated(count: u32, glyph_size: u32) -> Self {
        let count = count.max(1);
        let size = glyph_size.max(1);
        let mut image = RgbaImage::from_pixel(count * size, size, Rgba([0, 0, 0, 255]));

        for i in 0..count {
            let inset = (i as f32 / count as f32) * (size as f32 * 0.6);
            let side = size as f32 - inset;
            let x0 = (i * size) as f32 + (size as f32 - side) / 2.0;
            let y0 = (size as f32 - side) / 2.0;

            for py in 0..size {
                for px in i * size..(i + 1) * size {
                    let cx = px as f32 + 0.5;
                    let cy = py as f32 + 0.5;
                    if cx >= x0 && cx < x0 + side && cy >= y0 && cy < y0 + side {
                        image.put_pixel(px, py, Rgba([255, 255, 255, 255]));
                    }
                }
            }
        }

        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height of one glyph cell, equal to the strip height.
    pub fn glyph_height(&self) -> u32 {
        self.image.height()
    }

    /// Number of glyph variants in the strip.
    pub fn glyph_count(&self) -> u32 {
        self.image.width() / self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA8 bytes, row-major from the top row.
    pub fn rgba(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// A sprite strip being decoded on a background thread.
pub struct PendingSprite {
    rx: Option<Receiver<Result<SpriteSheet, SpriteError>>>,
    ready: Option<Result<SpriteSheet, SpriteError>>,
}

impl PendingSprite {
    /// Starts decoding `path` on a worker thread.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            log::debug!("Decoding sprite strip {:?}", path);
            let _ = tx.send(SpriteSheet::from_file(&path));
        });
        Self {
            rx: Some(rx),
            ready: None,
        }
    }

    /// Wraps an already available result.
    pub fn ready(result: Result<SpriteSheet, SpriteError>) -> Self {
        Self {
            rx: None,
            ready: Some(result),
        }
    }

    /// Returns the result once, as soon as it is available. Never blocks.
    pub fn poll(&mut self) -> Option<Result<SpriteSheet, SpriteError>> {
        if let Some(result) = self.ready.take() {
            return Some(result);
        }
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                Some(Err(SpriteError::WorkerLost))
            }
        }
    }

    /// Whether the result has already been handed out.
    pub fn is_finished(&self) -> bool {
        self.rx.is_none() && self.ready.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_strip_has_requested_glyphs() {
        let sheet = SpriteSheet::generated(8, 32);
        assert_eq!(sheet.width(), 256);
        assert_eq!(sheet.glyph_height(), 32);
        assert_eq!(sheet.glyph_count(), 8);

        // First glyph fills its cell, the last leaves a black margin.
        assert_eq!(sheet.image().get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(sheet.image().get_pixel(7 * 32, 0).0, [0, 0, 0, 255]);
        assert_eq!(sheet.image().get_pixel(7 * 32 + 16, 16).0, [255, 255, 255, 255]);
    }

    #[test]
    fn rejects_non_strip_images() {
        let err = SpriteSheet::from_image(RgbaImage::new(50, 20)).unwrap_err();
        assert!(matches!(
            err,
            SpriteError::NotAStrip {
                width: 50,
                height: 20
            }
        ));
        assert!(matches!(
            SpriteSheet::from_image(RgbaImage::new(0, 0)),
            Err(SpriteError::Empty)
        ));
    }

    #[test]
    fn missing_file_surfaces_decode_error() {
        let mut pending = PendingSprite::load("/definitely/not/here.png");
        let result = loop {
            if let Some(result) = pending.poll() {
                break result;
            }
            thread::yield_now();
        };
        assert!(matches!(result, Err(SpriteError::Decode(_))));
        assert!(pending.is_finished());
        assert!(pending.poll().is_none());
    }

    #[test]
    fn ready_result_is_returned_once() {
        let mut pending = PendingSprite::ready(Ok(SpriteSheet::generated(4, 8)));
        assert!(pending.poll().is_some());
        assert!(pending.poll().is_none());
    }
}
