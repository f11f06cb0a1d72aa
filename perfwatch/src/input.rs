//! Reading measurements from JSON-lines files.

use anyhow::{Context, Result};
use perfwatch_core::PerformanceMeasurement;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read one [`PerformanceMeasurement`] per line from `path`.
///
/// Blank lines and lines starting with `#` are skipped.
///
/// # Errors
///
/// Returns an error naming the line number if the file cannot be read or a
/// line is not a valid measurement.
pub fn read_measurements(path: &Path) -> Result<Vec<PerformanceMeasurement>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    parse_measurements(BufReader::new(file))
        .with_context(|| format!("Failed to read measurements from {}", path.display()))
}

/// Parse JSON-lines measurements from any buffered reader.
pub fn parse_measurements(reader: impl BufRead) -> Result<Vec<PerformanceMeasurement>> {
    let mut measurements = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let measurement: PerformanceMeasurement = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid measurement on line {}", index + 1))?;
        measurements.push(measurement);
    }

    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let input = r#"
# warmup run
{"timestamp":"2024-01-01T00:00:00Z","subject":"kryo","metric":"latency","value":100.0}

{"timestamp":"2024-01-01T00:01:00Z","subject":"kryo","metric":"latency","value":101.5,"confidence":0.9}
"#;

        let measurements = parse_measurements(Cursor::new(input)).unwrap();

        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].confidence, 1.0);
        assert_eq!(measurements[1].value, 101.5);
        assert_eq!(measurements[1].confidence, 0.9);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let input = concat!(
            r#"{"timestamp":"2024-01-01T00:00:00Z","subject":"kryo","metric":"latency","value":1.0}"#,
            "\n",
            "not json\n",
        );

        let err = parse_measurements(Cursor::new(input)).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"timestamp":"2024-01-01T00:00:00Z","subject":"avro","metric":"size","value":512}}"#
        )
        .unwrap();

        let measurements = read_measurements(file.path()).unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].subject, "avro");
        assert_eq!(measurements[0].value, 512.0);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_measurements(Path::new("/nonexistent/measurements.jsonl"));
        assert!(result.is_err());
    }
}
