//! Frame annotation and JPEG encoding

use crate::error::VisionError;
use crate::frame::{BgrImage, BoundingBox, Frame};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Pure blue, in the frame's B, G, R channel order
pub const FACE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const FACE_THICKNESS: i32 = 3;
pub const FACE_LABEL: &str = "Human";
/// Gap between the label baseline and the top of the box
pub const LABEL_OFFSET: i32 = 5;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_SCALE: i32 = 2;

/// Outline a detected face and label it to the right of its top corner.
/// Anything falling outside the frame is clipped.
pub fn annotate_face(frame: &mut Frame, face: &BoundingBox) {
    let image = frame.pixels_mut();
    draw_box(image, face, FACE_COLOR, FACE_THICKNESS);
    draw_label(
        image,
        face.max_x,
        face.min_y - LABEL_OFFSET,
        FACE_LABEL,
        FACE_COLOR,
    );
}

/// Encode a frame as a baseline JPEG
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, VisionError> {
    let rgb = frame.to_rgb();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode(
        &rgb,
        frame.width(),
        frame.height(),
        ColorType::Rgb8,
    )?;
    Ok(buffer)
}

fn draw_box(image: &mut BgrImage, face: &BoundingBox, color: Rgb<u8>, thickness: i32) {
    // Strokes are centered on the box edge
    let half = thickness / 2;
    for inset in -half..=half {
        let width = face.width() - 2 * inset;
        let height = face.height() - 2 * inset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect = Rect::at(face.min_x + inset, face.min_y + inset)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Draw `text` with its baseline at `y`, starting at `x`
fn draw_label(image: &mut BgrImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let top = y - GLYPH_HEIGHT * GLYPH_SCALE;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        fill_cell(
                            image,
                            x + col * GLYPH_SCALE,
                            top + row as i32 * GLYPH_SCALE,
                            color,
                        );
                    }
                }
            }
        }
        x += (GLYPH_WIDTH + 1) * GLYPH_SCALE;
    }
}

fn fill_cell(image: &mut BgrImage, x: i32, y: i32, color: Rgb<u8>) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    for py in y..y + GLYPH_SCALE {
        for px in x..x + GLYPH_SCALE {
            if px >= 0 && px < width && py >= 0 && py < height {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([
            0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'H' => Some([
            0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'M' => Some([
            0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001,
        ]),
        'N' => Some([
            0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001,
        ]),
        'U' => Some([
            0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        _ => None,
    }
}
