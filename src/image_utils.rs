use image::{GenericImageView, GrayImage, Luma, Rgb};
use imageproc::rect::Rect;

use crate::types::Size;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

/// Mask pixels covered by ink.
pub const FOREGROUND: Luma<u8> = WHITE;
pub const BACKGROUND: Luma<u8> = BLACK;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const PINK: Rgb<u8> = Rgb([255, 0, 255]);
pub const RAINBOW: [Rgb<u8>; 6] = [
    Rgb([255, 0, 0]),
    Rgb([255, 127, 0]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([139, 0, 255]),
];

/// Determines the number of pixels in an image that match the given luma.
pub fn count_pixels(img: &GrayImage, luma: &Luma<u8>) -> u32 {
    img.pixels().filter(|p| *p == luma).count() as u32
}

/// Counts foreground pixels inside `rect`. The part of `rect` that falls
/// outside the image is ignored.
pub fn count_foreground_in_rect(mask: &GrayImage, rect: &Rect) -> u32 {
    let (width, height) = mask.dimensions();
    let left = rect.left().max(0) as u32;
    let top = rect.top().max(0) as u32;
    if left >= width || top >= height || rect.right() < 0 || rect.bottom() < 0 {
        return 0;
    }
    let right = (rect.right() as u32).min(width - 1);
    let bottom = (rect.bottom() as u32).min(height - 1);

    mask.view(left, top, right - left + 1, bottom - top + 1)
        .pixels()
        .filter(|(_, _, pixel)| *pixel == FOREGROUND)
        .count() as u32
}

/// One row of a structuring element: the pixels `left..=right` columns away
/// from the anchor on the row `dy` away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    dy: i64,
    left: i64,
    right: i64,
}

/// A binary structuring element for morphology, anchored at its center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    spans: Vec<Span>,
}

impl StructuringElement {
    /// An ellipse inscribed in a `size` box, rasterized the same way OpenCV
    /// builds `MORPH_ELLIPSE` so that kernel sizes carry over from
    /// OpenCV-tuned settings.
    pub fn ellipse(size: Size<u32>) -> Self {
        let width = size.width.max(1) as i64;
        let height = size.height.max(1) as i64;
        let r = height / 2;
        let c = width / 2;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let spans = (0..height)
            .filter_map(|i| {
                let dy = i - r;
                if dy.abs() > r {
                    return None;
                }
                let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
                let j1 = (c - dx).max(0);
                let j2 = (c + dx + 1).min(width);
                Some(Span {
                    dy,
                    left: j1 - c,
                    right: j2 - 1 - c,
                })
            })
            .collect();

        Self { spans }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MorphOp {
    Dilate,
    Erode,
}

/// Per-row running foreground counts, one leading zero per row.
fn foreground_prefix_sums(mask: &GrayImage) -> Vec<Vec<u32>> {
    mask.rows()
        .map(|row| {
            let mut sums = Vec::with_capacity(mask.width() as usize + 1);
            let mut count = 0;
            sums.push(count);
            for pixel in row {
                if *pixel == FOREGROUND {
                    count += 1;
                }
                sums.push(count);
            }
            sums
        })
        .collect()
}

/// Dilation sees beyond-the-edge pixels as background, erosion as foreground.
fn morph(mask: &GrayImage, element: &StructuringElement, op: MorphOp) -> GrayImage {
    let (width, height) = mask.dimensions();
    let sums = foreground_prefix_sums(mask);
    let (width, height) = (width as i64, height as i64);

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let mut spans = element.spans.iter().filter_map(|span| {
            let row = y + span.dy;
            if row < 0 || row >= height {
                return None;
            }
            let left = (x + span.left).max(0);
            let right = (x + span.right).min(width - 1);
            if left > right {
                return None;
            }
            let row_sums = &sums[row as usize];
            let count = row_sums[right as usize + 1] - row_sums[left as usize];
            Some((count, (right - left + 1) as u32))
        });

        let hit = match op {
            MorphOp::Dilate => spans.any(|(count, _)| count > 0),
            MorphOp::Erode => spans.all(|(count, len)| count == len),
        };
        if hit {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    morph(mask, element, MorphOp::Dilate)
}

pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    morph(mask, element, MorphOp::Erode)
}

/// Dilation followed by erosion: fills gaps narrower than the element.
pub fn close(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(mask, element), element)
}

/// Erosion followed by dilation: strips features narrower than the element.
pub fn open(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(mask, element), element)
}
