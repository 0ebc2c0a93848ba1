use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::telemetry::{Session, TelemetryError};

// Shortest round-trip form, keeping a trailing ".0" on integral values.
fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// Write the session as `time,<label_1>,...` followed by one row per
/// appended frame, in arrival order.
pub fn export_csv<W: Write>(session: &Session, writer: W) -> Result<usize, TelemetryError> {
    let mut w = csv::Writer::from_writer(writer);
    let mut header = vec!["time".to_string()];
    header.extend(session.labels().iter().cloned());
    w.write_record(&header)?;
    let history = session.full_history();
    let rows = session.row_count();
    for i in 0..rows {
        let Some(first) = history.first().and_then(|s| s.points().get(i)) else {
            break;
        };
        let mut record = Vec::with_capacity(history.len() + 1);
        record.push(format_value(first.time));
        for series in history {
            record.push(series.points().get(i).map(|p| format_value(p.value)).unwrap_or_default());
        }
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(rows)
}

pub fn export_csv_file(session: &Session, path: &Path) -> Result<usize, TelemetryError> {
    let file = File::create(path)?;
    let rows = export_csv(session, BufWriter::new(file))?;
    log::info!("exported {rows} rows to {}", path.display());
    Ok(rows)
}

/// Operator answer to "Save the data [Y/N]?".
pub fn wants_save(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Append `.csv` unless the name already ends with it.
pub fn csv_path(name: &str) -> PathBuf {
    let name = name.trim();
    if name.to_lowercase().ends_with(".csv") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.csv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{IngestPipeline, ManualSource};

    fn three_row_session() -> Session {
        let source = ManualSource::new(["0\t1.0\t2.0", "1\t1.5\t2.5", "2\t1.2\t2.2"]);
        let mut pipeline = IngestPipeline::new(source, 1);
        let mut session = Session::new(vec!["A".into(), "B".into()]);
        for _ in 0..3 {
            let batch = pipeline.pump_once().unwrap().unwrap();
            assert!(session.ingest(batch).is_empty());
        }
        session
    }

    #[test]
    fn export_writes_header_and_rows_in_order() {
        let session = three_row_session();
        let mut out = Vec::new();
        assert_eq!(export_csv(&session, &mut out).unwrap(), 3);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["time,A,B", "0.0,1.0,2.0", "1.0,1.5,2.5", "2.0,1.2,2.2"]);
    }

    #[test]
    fn export_to_file_after_close() {
        let mut session = three_row_session();
        session.close();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        export_csv_file(&session, &path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<&str> = reader.headers().unwrap().iter().collect();
        assert_eq!(header, ["time", "A", "B"]);
        let rows: Vec<Vec<f64>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows, vec![vec![0.0, 1.0, 2.0], vec![1.0, 1.5, 2.5], vec![2.0, 1.2, 2.2]]);
    }

    #[test]
    fn empty_session_exports_header_only() {
        let session = Session::new(vec!["A".into()]);
        let mut out = Vec::new();
        assert_eq!(export_csv(&session, &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap().trim_end(), "time,A");
    }

    #[test]
    fn save_answer_accepts_y_and_yes_only() {
        for answer in ["y", "Y", "yes", " YES\n", "Yes"] {
            assert!(wants_save(answer), "{answer:?}");
        }
        for answer in ["", "n", "no", "yeah", "ye"] {
            assert!(!wants_save(answer), "{answer:?}");
        }
    }

    #[test]
    fn csv_extension_is_added_once() {
        assert_eq!(csv_path("run1"), PathBuf::from("run1.csv"));
        assert_eq!(csv_path(" run1.CSV \n"), PathBuf::from("run1.CSV"));
    }
}
