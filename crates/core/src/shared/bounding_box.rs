use serde::{Deserialize, Serialize};

/// Padding added around the detected skin region on every side.
pub const BOX_PADDING: u32 = 20;

/// Axis-aligned face region in pixel units.
///
/// Only the min corner is clamped to the frame. `x_min + width` may run past
/// the right edge (and likewise vertically); overlay consumers receive the
/// unclamped extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Pads the sampled extent `[min_x, max_x] × [min_y, max_y]` by
    /// [`BOX_PADDING`] for a `frame_width × frame_height` frame.
    pub fn from_extent(
        min_x: u32,
        max_x: u32,
        min_y: u32,
        max_y: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let pad2 = BOX_PADDING * 2;
        Self {
            x_min: min_x.saturating_sub(BOX_PADDING),
            y_min: min_y.saturating_sub(BOX_PADDING),
            width: (frame_width - min_x + pad2).min(max_x - min_x + pad2),
            height: (frame_height - min_y + pad2).min(max_y - min_y + pad2),
        }
    }

    pub fn x_max(&self) -> u32 {
        self.x_min + self.width
    }

    pub fn y_max(&self) -> u32 {
        self.y_min + self.height
    }
}
