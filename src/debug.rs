use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use log::{debug, warn};

use crate::{
    fill::choice_strip,
    grid::MappedMark,
    image_utils::{GREEN, PINK, RAINBOW, RED},
    marks::MarkShape,
    score::BubbleAnswers,
};

/// Creates a path for a debug image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ));
    result
}

/// Writes debug images next to the sheet being graded, or does nothing when
/// disabled.
pub struct ImageDebugWriter {
    input_path: PathBuf,
    input_image: Option<GrayImage>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf, input_image: GrayImage) -> Self {
        Self {
            input_path,
            input_image: Some(input_image),
        }
    }

    pub fn disabled() -> Self {
        Self {
            input_path: PathBuf::new(),
            input_image: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.input_image.is_some()
    }

    /// Saves `mask` as-is under `label`.
    pub fn write_mask(&self, label: &str, mask: &GrayImage) -> Option<PathBuf> {
        if !self.is_enabled() {
            return None;
        }
        self.save(label, &DynamicImage::ImageLuma8(mask.clone()))
    }

    /// Draws on a color copy of the input image and saves it under `label`.
    pub fn write(&self, label: &str, draw: impl FnOnce(&mut RgbImage)) -> Option<PathBuf> {
        let input_image = self.input_image.as_ref()?;
        let mut canvas = DynamicImage::ImageLuma8(input_image.clone()).into_rgb8();
        draw(&mut canvas);
        self.save(label, &DynamicImage::ImageRgb8(canvas))
    }

    fn save(&self, label: &str, image: &DynamicImage) -> Option<PathBuf> {
        let path = debug_image_path(&self.input_path, label);
        match image.save(&path) {
            Ok(()) => {
                debug!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("could not write debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Outlines every mapped mark, dots its centroid, and boxes the strip that
/// was read as the answer.
pub fn draw_mapped_marks_debug_image_mut(
    canvas: &mut RgbImage,
    mapped: &[MappedMark],
    answers: &BubbleAnswers,
    choices: u32,
) {
    for mapped_mark in mapped {
        let color = RAINBOW[mapped_mark.slot.index as usize % RAINBOW.len()];
        draw_hollow_rect_mut(canvas, mapped_mark.mark.bounds, color);
        draw_filled_circle_mut(
            canvas,
            (
                mapped_mark.mark.centroid.x.round() as i32,
                mapped_mark.mark.centroid.y.round() as i32,
            ),
            3,
            GREEN,
        );

        let chosen = answers
            .get(&mapped_mark.slot.question)
            .and_then(|answer| choice_strip(&mapped_mark.mark.bounds, choices, answer.answer.index()));
        if let Some(strip) = chosen {
            draw_hollow_rect_mut(canvas, strip, RED);
        }
    }
}

/// Outlines every detected mark, mapped or not.
pub fn draw_mark_shapes_debug_image_mut(canvas: &mut RgbImage, marks: &[MarkShape]) {
    for mark in marks {
        draw_hollow_rect_mut(canvas, mark.bounds, PINK);
    }
}
