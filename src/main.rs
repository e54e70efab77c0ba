use std::path::Path;
use std::process::exit;

use clap::{arg, command, Command};

use omr_grader::grade::{grade_sheet, GradeOptions};
use omr_grader::layout::MarkOrdering;

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let debug = matches.get_flag("debug");
    let row_major = matches.get_flag("row-major");
    let image_path = matches
        .get_one::<String>("image_path")
        .expect("image path is required");
    let answer_key_path = matches
        .get_one::<String>("answer_key_path")
        .expect("answer key path is required");

    let mut options = match matches.get_one::<String>("config") {
        Some(config_path) => load_options(Path::new(config_path)),
        None => GradeOptions::default(),
    };
    options.debug = debug;
    if row_major {
        options.ordering = MarkOrdering::RowMajor;
    }

    match grade_sheet(Path::new(image_path), Path::new(answer_key_path), &options) {
        Ok(graded) => match serde_json::to_string_pretty(&graded) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing result: {}", e);
                exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(e.exit_code());
        }
    }
}

fn load_options(config_path: &Path) -> GradeOptions {
    let config_json = match std::fs::read_to_string(config_path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error reading config {}: {}", config_path.display(), e);
            exit(1);
        }
    };

    match serde_json::from_str(&config_json) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error parsing config {}: {}", config_path.display(), e);
            exit(1);
        }
    }
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(arg!(-c --config <PATH> "Path to a JSON grading config"))
        .arg(arg!(-d --debug "Write debug images next to the sheet image"))
        .arg(arg!(--"row-major" "Number marks row by row instead of by left edge"))
        .arg(arg!(image_path: <IMAGE> "Path to the scanned answer sheet").required(true))
        .arg(
            arg!(answer_key_path: <ANSWER_KEY> "Path to the answer key spreadsheet")
                .required(true),
        )
}
