use ndarray::ArrayView3;

use crate::shared::constants::RGBA_CHANNELS;

/// One captured camera frame: contiguous RGBA bytes in row-major order.
///
/// Frames live for a single analysis tick. The backing buffer can be
/// reclaimed with [`Frame::into_data`] so the capture loop reuses one
/// allocation across ticks.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    tick: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, tick: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            expected_len(width, height),
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
            tick,
        }
    }

    /// Builds a frame filled with a single RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * RGBA_CHANNELS as usize);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(data, width, height, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Capture-loop tick this frame was read on.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Sets the RGBA value of every pixel inside `[x, x+w) × [y, y+h)`,
    /// clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgba: [u8; 4]) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        let stride = self.width as usize * RGBA_CHANNELS as usize;
        for row in y..y_end {
            for col in x..x_end {
                let i = row as usize * stride + col as usize * RGBA_CHANNELS as usize;
                self.data[i..i + 4].copy_from_slice(&rgba);
            }
        }
    }

    /// `(height, width, 4)` view over the pixel data.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                RGBA_CHANNELS as usize,
            ),
            &self.data,
        )
        .ok()
    }
}

/// Byte length of an RGBA buffer of the given size.
pub fn expected_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * (RGBA_CHANNELS as usize)
}
