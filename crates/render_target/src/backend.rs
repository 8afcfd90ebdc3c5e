use std::collections::BTreeMap;

use omaf_model::PixelRect;

use crate::{BlitCommand, RenderError};

pub trait RenderBackend {
    fn clear(&mut self);
    fn blit(&mut self, command: &BlitCommand) -> Result<(), RenderError>;
}

/// Keeps every command of the last frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingBackend {
    clears: usize,
    commands: Vec<BlitCommand>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn commands(&self) -> &[BlitCommand] {
        &self.commands
    }
}

impl RenderBackend for RecordingBackend {
    fn clear(&mut self) {
        self.clears += 1;
        self.commands.clear();
    }

    fn blit(&mut self, command: &BlitCommand) -> Result<(), RenderError> {
        self.commands.push(*command);
        Ok(())
    }
}

/// Tightly packed 8-bit RGB picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32, color: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: color.iter().copied().cycle().take(count * 3).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let offset = self.offset(x, y)?;
        Some([
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset..offset + 3].copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, rect: PixelRect, color: [u8; 3]) {
        let right = rect.right().min(self.width as u64) as u32;
        let bottom = rect.bottom().min(self.height as u64) as u32;
        for y in rect.top..bottom {
            for x in rect.left..right {
                self.set_pixel(x, y, color);
            }
        }
    }

    pub fn fill(&mut self, color: [u8; 3]) {
        for pixel in self.pixels.chunks_exact_mut(3) {
            pixel.copy_from_slice(&color);
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 3)
    }
}

/// CPU compositor: nearest-neighbour copies from each video's decoded frame
/// onto an owned display surface.
#[derive(Debug, Clone)]
pub struct SoftwareCompositor {
    surface: RgbFrame,
    background: [u8; 3],
    frames: BTreeMap<u32, RgbFrame>,
}

impl SoftwareCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        let background = [0, 0, 0];
        Self {
            surface: RgbFrame::new(width, height, background),
            background,
            frames: BTreeMap::new(),
        }
    }

    pub fn set_frame(&mut self, video_id: u32, frame: RgbFrame) {
        self.frames.insert(video_id, frame);
    }

    pub fn surface(&self) -> &RgbFrame {
        &self.surface
    }
}

impl RenderBackend for SoftwareCompositor {
    fn clear(&mut self) {
        self.surface.fill(self.background);
    }

    fn blit(&mut self, command: &BlitCommand) -> Result<(), RenderError> {
        let frame = self
            .frames
            .get(&command.video_id)
            .ok_or(RenderError::MissingFrame {
                video_id: command.video_id,
            })?;
        let src = command.src;
        if src.right() > frame.width() as u64 || src.bottom() > frame.height() as u64 {
            return Err(RenderError::BlitOutOfBounds {
                video_id: command.video_id,
                rect: src,
            });
        }
        let dst = command.dst;
        if src.area() == 0 || dst.area() == 0 {
            return Ok(());
        }
        let right = dst.right().min(self.surface.width() as u64) as u32;
        let bottom = dst.bottom().min(self.surface.height() as u64) as u32;
        for y in dst.top..bottom {
            let src_y = src.top + ((y - dst.top) as u64 * src.height as u64 / dst.height as u64) as u32;
            for x in dst.left..right {
                let src_x =
                    src.left + ((x - dst.left) as u64 * src.width as u64 / dst.width as u64) as u32;
                if let Some(color) = frame.pixel(src_x, src_y) {
                    self.surface.set_pixel(x, y, color);
                }
            }
        }
        Ok(())
    }
}
