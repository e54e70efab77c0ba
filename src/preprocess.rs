use image::{imageops, GrayImage};
use imageproc::contrast::threshold;
use log::debug;
use logging_timer::time;

use crate::image_utils::{close, count_pixels, open, StructuringElement, FOREGROUND};
use crate::types::Size;

/// The two masks derived from a sheet image: the raw inverted threshold,
/// which the fill classifier counts pixels in, and its morphologically
/// cleaned version, which marks are traced from.
#[derive(Debug, Clone)]
pub struct SheetMasks {
    pub thresholded: GrayImage,
    pub cleaned: GrayImage,
}

/// Marks every pixel at or below `cutoff` as foreground. Sheets are assumed
/// to carry dark marks on light paper.
pub fn binarize_inverted(img: &GrayImage, cutoff: u8) -> GrayImage {
    let mut mask = threshold(img, cutoff);
    imageops::invert(&mut mask);
    mask
}

/// Closes then opens `mask` so textured pencil fills become solid blobs and
/// thin artifacts drop out.
pub fn clean_mask(mask: &GrayImage, kernel_size: Size<u32>) -> GrayImage {
    let element = StructuringElement::ellipse(kernel_size);
    open(&close(mask, &element), &element)
}

#[time]
pub fn preprocess(img: &GrayImage, cutoff: u8, kernel_size: Size<u32>) -> SheetMasks {
    let thresholded = binarize_inverted(img, cutoff);
    let cleaned = clean_mask(&thresholded, kernel_size);
    debug!(
        "foreground pixels: {} thresholded, {} cleaned",
        count_pixels(&thresholded, &FOREGROUND),
        count_pixels(&cleaned, &FOREGROUND)
    );
    SheetMasks {
        thresholded,
        cleaned,
    }
}
