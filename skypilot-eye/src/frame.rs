//! Frame geometry and detection types
//!
//! Every frame leaving the transcoder is scaled to a third of the camera's
//! native 960x720, packed as BGR24.

use image::{ImageBuffer, Rgb};
use serde::{Deserialize, Serialize};

pub const FRAME_WIDTH: u32 = 960 / 3;
pub const FRAME_HEIGHT: u32 = 720 / 3;
pub const FRAME_CENTER_X: i32 = FRAME_WIDTH as i32 / 2;
pub const FRAME_CENTER_Y: i32 = FRAME_HEIGHT as i32 / 2;
pub const FRAME_AREA: u32 = FRAME_WIDTH * FRAME_HEIGHT;
/// Bytes in one raw frame
pub const FRAME_SIZE: usize = (FRAME_AREA * 3) as usize;

/// Pixel buffer whose channels are stored in B, G, R order
pub type BgrImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// One decoded video frame
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: BgrImage,
}

impl Frame {
    /// Wrap raw BGR24 bytes. Returns `None` unless exactly one full frame is given.
    pub fn from_bgr(data: Vec<u8>) -> Option<Self> {
        if data.len() != FRAME_SIZE {
            return None;
        }
        ImageBuffer::from_raw(FRAME_WIDTH, FRAME_HEIGHT, data).map(|pixels| Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_bgr(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn pixels(&self) -> &BgrImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut BgrImage {
        &mut self.pixels
    }

    /// Interleaved RGB copy, as image encoders expect
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(FRAME_SIZE);
        for px in self.as_bgr().chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        rgb
    }
}

/// Axis-aligned box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box of the given size centered on a point
    pub fn centered(cx: i32, cy: i32, width: i32, height: i32) -> Self {
        let min_x = cx - width / 2;
        let min_y = cy - height / 2;
        Self::new(min_x, min_y, min_x + width, min_y + height)
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.min_x + self.width() / 2,
            self.min_y + self.height() / 2,
        )
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }
}

/// Boxes found in one frame, in detector order. Empty is the common case.
pub type DetectionResult = Vec<BoundingBox>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_constants() {
        assert_eq!(FRAME_WIDTH, 320);
        assert_eq!(FRAME_HEIGHT, 240);
        assert_eq!((FRAME_CENTER_X, FRAME_CENTER_Y), (160, 120));
        assert_eq!(FRAME_AREA, 76_800);
        assert_eq!(FRAME_SIZE, 230_400);
    }

    #[test]
    fn test_from_bgr_rejects_wrong_size() {
        assert!(Frame::from_bgr(vec![]).is_none());
        assert!(Frame::from_bgr(vec![0; FRAME_SIZE - 1]).is_none());
        assert!(Frame::from_bgr(vec![0; FRAME_SIZE + 3]).is_none());

        let frame = Frame::from_bgr(vec![0; FRAME_SIZE]).unwrap();
        assert_eq!((frame.width(), frame.height()), (FRAME_WIDTH, FRAME_HEIGHT));
    }

    #[test]
    fn test_to_rgb_swaps_channels() {
        let mut data = vec![0; FRAME_SIZE];
        data[0] = 10; // B
        data[1] = 20; // G
        data[2] = 30; // R
        let frame = Frame::from_bgr(data).unwrap();
        assert_eq!(&frame.to_rgb()[..3], &[30, 20, 10]);
    }

    #[test]
    fn test_bounding_box_measurements() {
        let bbox = BoundingBox::new(10, 20, 50, 80);
        assert_eq!(bbox.width(), 40);
        assert_eq!(bbox.height(), 60);
        assert_eq!(bbox.center(), (30, 50));
        assert_eq!(bbox.area(), 2_400);

        let centered = BoundingBox::centered(160, 120, 40, 40);
        assert_eq!(centered.center(), (160, 120));
    }
}
