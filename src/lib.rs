//! Grades scanned bubble answer sheets against a spreadsheet answer key.

pub mod answer_key;
pub mod debug;
pub mod fill;
pub mod geometry;
pub mod grade;
pub mod grid;
pub mod image_utils;
pub mod layout;
pub mod marks;
pub mod preprocess;
pub mod score;
pub mod types;
