use std::path::{Path, PathBuf};

use image::GrayImage;
use log::{info, warn};
use logging_timer::time;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answer_key::{load_answer_key, AnswerKey, AnswerKeyError};
use crate::debug::{
    draw_mapped_marks_debug_image_mut, draw_mark_shapes_debug_image_mut, ImageDebugWriter,
};
use crate::fill::classify_fill;
use crate::grid::{map_marks, GradingError};
use crate::layout::{GridLayout, LayoutError, MarkOrdering};
use crate::marks::find_marks;
use crate::preprocess::preprocess;
use crate::score::{score_answers, BubbleAnswer, BubbleAnswers, ScoreResult};
use crate::types::Size;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradeOptions {
    /// Pixels at or below this intensity count as ink.
    pub threshold: u8,
    /// Marks must enclose more than this many pixels.
    pub min_mark_area: f64,
    /// Size of the elliptical kernel used to clean the mask.
    pub kernel_size: Size<u32>,
    pub layout: GridLayout,
    pub ordering: MarkOrdering,
    /// Whether the first row of each answer key sheet is a title row.
    pub answer_key_has_header: bool,
    #[serde(skip)]
    pub debug: bool,
}

impl Default for GradeOptions {
    fn default() -> Self {
        Self {
            threshold: 115,
            min_mark_area: 190.0,
            kernel_size: Size {
                width: 15,
                height: 15,
            },
            layout: GridLayout::default(),
            ordering: MarkOrdering::default(),
            answer_key_has_header: true,
            debug: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("could not read image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("could not read answer key: {0}")]
    AnswerKey(#[from] AnswerKeyError),
    #[error("sheet layout does not match the answer key: {0}")]
    Grading(#[from] GradingError),
    #[error("invalid sheet layout: {0}")]
    InvalidLayout(#[from] LayoutError),
}

impl GradeError {
    /// Process exit code for this kind of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            GradeError::ImageLoad { .. } => 2,
            GradeError::AnswerKey(_) => 3,
            GradeError::Grading(_) => 4,
            GradeError::InvalidLayout(_) => 1,
        }
    }
}

/// The answers read from a sheet together with their score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradedSheet {
    pub answers: BubbleAnswers,
    pub score: ScoreResult,
}

pub fn load_sheet_image(image_path: &Path) -> Result<GrayImage, GradeError> {
    image::open(image_path)
        .map(|img| img.into_luma8())
        .map_err(|source| GradeError::ImageLoad {
            path: image_path.to_path_buf(),
            source,
        })
}

/// Reads the chosen answer for each question on the sheet.
#[time]
pub fn read_bubble_answers(
    img: &GrayImage,
    options: &GradeOptions,
    debug: &ImageDebugWriter,
) -> Result<BubbleAnswers, GradingError> {
    let layout = &options.layout;
    let masks = preprocess(img, options.threshold, options.kernel_size);
    debug.write_mask("threshold", &masks.thresholded);
    debug.write_mask("cleaned", &masks.cleaned);

    let marks = find_marks(&masks.cleaned, options.min_mark_area);
    let mapped = map_marks(&marks, layout, options.ordering)?;

    let answers = mapped
        .iter()
        .map(|mapped_mark| {
            let answer = classify_fill(&masks.thresholded, &mapped_mark.mark.bounds, layout.choices);
            (
                mapped_mark.slot.question,
                BubbleAnswer {
                    topic: mapped_mark.slot.topic.clone(),
                    answer,
                },
            )
        })
        .collect::<BubbleAnswers>();

    debug.write("marks", |canvas| {
        draw_mark_shapes_debug_image_mut(canvas, &marks);
        draw_mapped_marks_debug_image_mut(canvas, &mapped, &answers, layout.choices);
    });

    Ok(answers)
}

/// Grades an already-loaded sheet image against an already-parsed key.
pub fn grade_image(
    img: &GrayImage,
    key: &AnswerKey,
    options: &GradeOptions,
    debug: &ImageDebugWriter,
) -> Result<GradedSheet, GradeError> {
    options.layout.validate()?;
    let answers = read_bubble_answers(img, options, debug)?;
    let score = score_answers(&answers, key, &options.layout)?;
    info!("{} answers read, {} correct", answers.len(), score.total);
    Ok(GradedSheet { answers, score })
}

/// Grades the sheet scanned at `image_path` against the answer key workbook
/// at `answer_key_path`.
#[time]
pub fn grade_sheet(
    image_path: &Path,
    answer_key_path: &Path,
    options: &GradeOptions,
) -> Result<GradedSheet, GradeError> {
    options.layout.validate()?;
    let img = load_sheet_image(image_path)?;
    let key = load_answer_key(answer_key_path, options.answer_key_has_header)?;
    if key.is_empty() {
        warn!("answer key {} holds no answers", answer_key_path.display());
    } else {
        info!("loaded answer key with {} answers", key.len());
    }

    let debug = if options.debug {
        ImageDebugWriter::new(image_path.to_path_buf(), img.clone())
    } else {
        ImageDebugWriter::disabled()
    };

    grade_image(&img, &key, options, &debug)
}

pub fn grade(
    image_path: &Path,
    answer_key_path: &Path,
    options: &GradeOptions,
) -> Result<ScoreResult, GradeError> {
    grade_sheet(image_path, answer_key_path, options).map(|graded| graded.score)
}
