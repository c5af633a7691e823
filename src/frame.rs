use bitvec::prelude::*;

#[cfg(feature = "embedded-graphics")]
use embedded_graphics::{image::ImageRaw, pixelcolor::BinaryColor};

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub(crate) const MEM_LENGTH: usize = WIDTH * HEIGHT / 8;

/// The 64x32 monochrome framebuffer.
///
/// One bit per pixel, rows packed left to right, concatenated top to bottom,
/// so pixel (x, y) lives at flat bit index `x + y * 64`. Mutated only by the
/// clear-screen and draw-sprite instructions.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Frame([u8; MEM_LENGTH]);

impl Frame {
    pub(crate) fn new() -> Self {
        Self([0; MEM_LENGTH])
    }

    /// Borrow a read-only view for the host.
    pub fn view(&self) -> FrameView<'_> {
        FrameView(&self.0)
    }

    pub(crate) fn clear(&mut self) {
        self.0.iter_mut().for_each(|byte| *byte = 0);
    }

    /// Toggle pixel (x, y) and report its state prior to the flip.
    /// Coordinates wrap at the display edges.
    pub(crate) fn flip(&mut self, x: usize, y: usize) -> bool {
        let idx = (y % HEIGHT) * WIDTH + x % WIDTH;
        let bits = self.0[..].view_bits_mut::<Msb0>();
        let prev = bits[idx];
        bits.set(idx, !prev);
        prev
    }
}

/// A shared view over a [`Frame`], handed to rendering backends.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FrameView<'a>(&'a [u8; MEM_LENGTH]);

impl<'a> FrameView<'a> {
    /// The packed pixel bytes, 8 per row.
    pub fn as_raw(&self) -> &'a [u8] {
        self.0
    }

    /// State of pixel (x, y), `None` outside the display.
    pub fn get(&self, x: usize, y: usize) -> Option<bool> {
        if x < WIDTH && y < HEIGHT {
            self.0[..]
                .view_bits::<Msb0>()
                .get(y * WIDTH + x)
                .copied()
        } else {
            None
        }
    }

    /// Iterate rows top to bottom as bit slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &'a BitSlice<Msb0, u8>> {
        self.0.chunks(WIDTH / 8).map(|row| row.view_bits::<Msb0>())
    }

    /// The frame as an image for `embedded-graphics` backends.
    #[cfg(feature = "embedded-graphics")]
    pub fn as_raw_image(&self) -> ImageRaw<'a, BinaryColor> {
        ImageRaw::new(self.as_raw(), WIDTH as u32, HEIGHT as u32)
    }
}

#[cfg(test)]
impl Frame {
    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
