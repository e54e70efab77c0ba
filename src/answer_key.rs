use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use log::debug;
use logging_timer::time;
use thiserror::Error;

/// The correct answers in question order: entry `n - 1` answers question `n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    answers: Vec<String>,
}

impl AnswerKey {
    pub fn new(answers: Vec<String>) -> Self {
        Self { answers }
    }

    pub fn answer_for(&self, question: u32) -> Option<&str> {
        let index = (question as usize).checked_sub(1)?;
        self.answers.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum AnswerKeyError {
    #[error("could not open answer key {path}: {source}")]
    Open {
        path: PathBuf,
        source: calamine::Error,
    },
    #[error("could not read sheet {sheet:?}: {source}")]
    Sheet {
        sheet: String,
        source: calamine::Error,
    },
    #[error("cell {cell} in sheet {sheet:?} holds {value:?}, which is neither \"<n>-<answer>\" nor \"<n>.<answer>\"")]
    MalformedCell {
        sheet: String,
        cell: CellRef,
        value: String,
    },
    #[error("cell {cell} in sheet {sheet:?} holds {value}, not text")]
    UnsupportedCell {
        sheet: String,
        cell: CellRef,
        value: String,
    },
}

/// A zero-based sheet position, displayed the way spreadsheets label cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut letters = vec![];
        let mut column = self.column + 1;
        while column > 0 {
            let rem = (column - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            column = (column - 1) / 26;
        }
        letters.reverse();
        write!(f, "{}{}", letters.into_iter().collect::<String>(), self.row + 1)
    }
}

/// The ways an answer cell may separate its question number from the answer,
/// in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    Dashed,
    Dotted,
}

impl AnswerFormat {
    const FALLBACK_ORDER: [AnswerFormat; 2] = [AnswerFormat::Dashed, AnswerFormat::Dotted];

    fn delimiter(&self) -> char {
        match self {
            AnswerFormat::Dashed => '-',
            AnswerFormat::Dotted => '.',
        }
    }

    /// The trimmed text between the first delimiter and the next one.
    fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.split(self.delimiter())
            .nth(1)
            .map(str::trim)
            .filter(|answer| !answer.is_empty())
    }
}

/// Pulls the answer out of a cell such as `"3-b"` or `"3.c"`.
pub fn parse_answer_cell(text: &str) -> Option<(AnswerFormat, &str)> {
    AnswerFormat::FALLBACK_ORDER
        .iter()
        .find_map(|format| format.extract(text).map(|answer| (*format, answer)))
}

/// Appends the answers of one sheet, column by column, skipping empty cells.
/// When `has_header` is set the first row holds column titles.
pub fn read_sheet_answers(
    sheet: &str,
    range: &Range<Data>,
    has_header: bool,
    answers: &mut Vec<String>,
) -> Result<(), AnswerKeyError> {
    let (height, width) = range.get_size();
    let (start_row, start_column) = range.start().unwrap_or((0, 0));
    let first_row = usize::from(has_header);

    for column in 0..width {
        for row in first_row..height {
            let cell = CellRef {
                row: start_row + row as u32,
                column: start_column + column as u32,
            };
            let text = match range.get((row, column)) {
                None | Some(Data::Empty) => continue,
                Some(Data::String(text)) if text.trim().is_empty() => continue,
                Some(Data::String(text)) => text,
                Some(other) => {
                    return Err(AnswerKeyError::UnsupportedCell {
                        sheet: sheet.to_string(),
                        cell,
                        value: other.to_string(),
                    })
                }
            };

            match parse_answer_cell(text) {
                Some((_, answer)) => answers.push(answer.to_string()),
                None => {
                    return Err(AnswerKeyError::MalformedCell {
                        sheet: sheet.to_string(),
                        cell,
                        value: text.clone(),
                    })
                }
            }
        }
    }

    Ok(())
}

/// Reads every sheet of the workbook at `path`, in sheet order, into one
/// answer key.
#[time]
pub fn load_answer_key(path: &Path, has_header: bool) -> Result<AnswerKey, AnswerKeyError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| AnswerKeyError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut answers = vec![];
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|source| AnswerKeyError::Sheet {
                sheet: sheet.clone(),
                source,
            })?;
        let before = answers.len();
        read_sheet_answers(&sheet, &range, has_header, &mut answers)?;
        debug!("sheet {:?}: {} answers", sheet, answers.len() - before);
    }

    Ok(AnswerKey::new(answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_xlsxwriter::Workbook;

    fn sheet(rows: &[&[&str]]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        range
    }

    #[test]
    fn test_parse_answer_cell() {
        assert_eq!(parse_answer_cell("3-b"), Some((AnswerFormat::Dashed, "b")));
        assert_eq!(parse_answer_cell("3.c"), Some((AnswerFormat::Dotted, "c")));
        assert_eq!(parse_answer_cell(" 12 - d "), Some((AnswerFormat::Dashed, "d")));
        assert_eq!(parse_answer_cell("4-A"), Some((AnswerFormat::Dashed, "A")));
        assert_eq!(parse_answer_cell("xyz"), None);
    }

    #[test]
    fn test_parse_answer_cell_falls_back_to_dot() {
        assert_eq!(parse_answer_cell("2. b"), Some((AnswerFormat::Dotted, "b")));
        assert_eq!(parse_answer_cell("5-"), None);
        assert_eq!(parse_answer_cell("6- .e"), Some((AnswerFormat::Dashed, ".e")));
        assert_eq!(parse_answer_cell("1-a-b"), Some((AnswerFormat::Dashed, "a")));
    }

    #[test]
    fn test_read_sheet_answers_in_column_order() {
        let range = sheet(&[
            &["PYTHON", "MySQL"],
            &["1-a", "3-c"],
            &["2-b", ""],
            &["", "4.d"],
        ]);
        let mut answers = vec![];
        read_sheet_answers("Sheet1", &range, true, &mut answers).unwrap();
        assert_eq!(answers, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_read_sheet_answers_without_header() {
        let range = sheet(&[&["1-a"], &["2-b"]]);
        let mut answers = vec![];
        read_sheet_answers("Sheet1", &range, false, &mut answers).unwrap();
        assert_eq!(answers, vec!["a", "b"]);
    }

    #[test]
    fn test_read_sheet_answers_rejects_malformed_cell() {
        let range = sheet(&[&["Topic"], &["1-a"], &["xyz"]]);
        let mut answers = vec![];
        let err = read_sheet_answers("Key", &range, true, &mut answers).unwrap_err();
        match err {
            AnswerKeyError::MalformedCell { sheet, cell, value } => {
                assert_eq!(sheet, "Key");
                assert_eq!(cell.to_string(), "A3");
                assert_eq!(value, "xyz");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_sheet_answers_rejects_numbers() {
        let mut range = sheet(&[&["Topic"], &["1-a"]]);
        range.set_value((2, 0), Data::Float(2.5));
        let mut answers = vec![];
        assert!(matches!(
            read_sheet_answers("Key", &range, true, &mut answers),
            Err(AnswerKeyError::UnsupportedCell { .. })
        ));
    }

    #[test]
    fn test_cell_ref_display() {
        assert_eq!(CellRef { row: 0, column: 0 }.to_string(), "A1");
        assert_eq!(CellRef { row: 9, column: 25 }.to_string(), "Z10");
        assert_eq!(CellRef { row: 1, column: 26 }.to_string(), "AA2");
    }

    #[test]
    fn test_answer_for_is_one_based() {
        let key = AnswerKey::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(key.answer_for(1), Some("a"));
        assert_eq!(key.answer_for(2), Some("b"));
        assert_eq!(key.answer_for(3), None);
        assert_eq!(key.answer_for(0), None);
    }

    #[test]
    fn test_load_answer_key_across_sheets() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("key.xlsx");

        let mut workbook = Workbook::new();
        {
            let first = workbook.add_worksheet();
            first.set_name("Morning")?;
            first.write_string(0, 0, "PYTHON")?;
            first.write_string(1, 0, "1-a")?;
            first.write_string(2, 0, "2-b")?;
            first.write_string(0, 1, "DATA ANALYSIS")?;
            first.write_string(1, 1, "3.c")?;
        }
        {
            let second = workbook.add_worksheet();
            second.set_name("Afternoon")?;
            second.write_string(0, 0, "MySQL")?;
            second.write_string(1, 0, "4 - d")?;
        }
        workbook.save(&path)?;

        let key = load_answer_key(&path, true)?;
        assert_eq!(key, AnswerKey::new(vec!["a".into(), "b".into(), "c".into(), "d".into()]));
        Ok(())
    }

    #[test]
    fn test_load_answer_key_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_answer_key(&dir.path().join("missing.xlsx"), true);
        assert!(matches!(result, Err(AnswerKeyError::Open { .. })));
    }

    proptest! {
        #[test]
        fn parses_numbered_answers(
            number in 1u32..500,
            answer in "[a-dA-D]",
            dotted in any::<bool>()
        ) {
            let text = if dotted {
                format!("{number}.{answer}")
            } else {
                format!("{number}-{answer}")
            };
            prop_assert_eq!(parse_answer_cell(&text).map(|(_, a)| a), Some(answer.as_str()));
        }

        #[test]
        fn key_length_matches_filled_cells(
            cells in proptest::collection::vec(proptest::option::of(1u32..100), 1..30)
        ) {
            let rows: Vec<String> = cells
                .iter()
                .map(|cell| cell.map(|n| format!("{n}-a")).unwrap_or_default())
                .collect();
            let mut range = Range::new((0, 0), (rows.len() as u32, 0));
            range.set_value((0, 0), Data::String("Topic".to_string()));
            for (i, text) in rows.iter().enumerate() {
                if !text.is_empty() {
                    range.set_value((i as u32 + 1, 0), Data::String(text.clone()));
                }
            }
            let mut answers = vec![];
            read_sheet_answers("Sheet1", &range, true, &mut answers).unwrap();
            prop_assert_eq!(answers.len(), cells.iter().filter(|c| c.is_some()).count());
        }
    }
}
