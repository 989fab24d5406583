//! Report persistence and rendering.

pub mod charts;
pub mod generator;

pub use generator::{
    load_report, markdown_path, report_path, write_json_report, write_markdown_report,
};
