//! Result file output: JSON and CSV, bundled into a zip archive.

use crate::error::AppError;
use crate::models::ClassificationResult;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const JSON_FILENAME: &str = "classification_results.json";
pub const CSV_FILENAME: &str = "classification_results.csv";
pub const ZIP_FILENAME: &str = "classification_results.zip";

// Entry names inside the archive.
const ARCHIVE_JSON: &str = "predictions.json";
const ARCHIVE_CSV: &str = "predictions.csv";

const CSV_HEADER: &str = "conversation_id,predicted_intent,rationale";

/// Writes the JSON, CSV, and zip result files into `output_dir`, creating
/// it if needed. Returns the zip path.
pub fn write_outputs(
    results: &[ClassificationResult],
    output_dir: &Path,
) -> Result<PathBuf, AppError> {
    fs::create_dir_all(output_dir)?;

    let json = render_json(results)?;
    let csv = render_csv(results);

    fs::write(output_dir.join(JSON_FILENAME), &json)?;
    fs::write(output_dir.join(CSV_FILENAME), &csv)?;

    let zip_path = output_dir.join(ZIP_FILENAME);
    let file = File::create(&zip_path)?;
    write_archive(file, &json, &csv)?;

    info!(path = %zip_path.display(), results = results.len(), "Result files written");
    Ok(zip_path)
}

/// Builds the zip archive in memory, for the download endpoint.
pub fn archive_bytes(results: &[ClassificationResult]) -> Result<Vec<u8>, AppError> {
    let json = render_json(results)?;
    let csv = render_csv(results);

    let mut cursor = Cursor::new(Vec::new());
    write_archive(&mut cursor, &json, &csv)?;
    Ok(cursor.into_inner())
}

fn write_archive<W: Write + std::io::Seek>(
    writer: W,
    json: &str,
    csv: &str,
) -> Result<(), AppError> {
    let mut archive = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    archive.start_file(ARCHIVE_JSON, options)?;
    archive.write_all(json.as_bytes())?;

    archive.start_file(ARCHIVE_CSV, options)?;
    archive.write_all(csv.as_bytes())?;

    archive.finish()?;
    Ok(())
}

fn render_json(results: &[ClassificationResult]) -> Result<String, AppError> {
    serde_json::to_string_pretty(results)
        .map_err(|e| AppError::Internal(format!("Result serialization failed: {}", e)))
}

/// CSV carries conversation_id, predicted_intent, and rationale only;
/// confidence lives in the JSON output.
fn render_csv(results: &[ClassificationResult]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for result in results {
        csv.push_str(&format!(
            "{},{},{}\n",
            csv_field(&result.conversation_id),
            csv_field(&result.predicted_intent),
            csv_field(&result.rationale)
        ));
    }
    csv
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_quotes_commas_and_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_result() {
        let results = vec![ClassificationResult {
            conversation_id: "c1".to_string(),
            predicted_intent: "Follow-Up".to_string(),
            confidence: 0.7,
            rationale: "Keywords detected: 'update, status' indicating Follow-Up".to_string(),
        }];
        let csv = render_csv(&results);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("c1,Follow-Up,"));
        // Confidence is deliberately absent from the CSV.
        assert!(!lines[1].contains("0.7"));
    }
}
