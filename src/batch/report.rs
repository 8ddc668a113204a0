//! The three append-only files a robust batch writes as it goes.
//!
//! Measurements go to the data file at the save path. Each resolved key also
//! gets one row in `<base>_successes.csv` or `<base>_failures.csv`, where
//! `<base>` is the save path without its extension. Every record is flushed as
//! soon as it is written, so an interrupted batch leaves complete rows for every
//! key it resolved.

use crate::batch::error::BatchError;
use crate::batch::manifest::{BatchManifest, Resolution};
use crate::query::builder::QueryKey;
use chrono::{NaiveDate, NaiveDateTime};
use csv::{Reader, Writer, WriterBuilder};
use log::{debug, info};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const DATA_HEADER: [&str; 9] = [
    "station_id",
    "parameter_id",
    "date",
    "day",
    "hour",
    "station_name",
    "parameter_name",
    "unit",
    "value",
];
pub const SUCCESS_HEADER: [&str; 6] = [
    "station_id",
    "parameter_id",
    "start_date",
    "end_date",
    "attempts",
    "rows",
];
pub const FAILURE_HEADER: [&str; 6] = [
    "station_id",
    "parameter_id",
    "start_date",
    "end_date",
    "attempts",
    "reason",
];

/// Paths of the files belonging to one save path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFiles {
    pub data: PathBuf,
    pub successes: PathBuf,
    pub failures: PathBuf,
}

impl BatchFiles {
    pub fn for_save_path(save_path: &Path) -> Self {
        let base = save_path.with_extension("");
        let sibling = |suffix: &str| {
            let mut name = base.file_name().unwrap_or_default().to_os_string();
            name.push(suffix);
            base.with_file_name(name)
        };

        BatchFiles {
            data: save_path.to_path_buf(),
            successes: sibling("_successes.csv"),
            failures: sibling("_failures.csv"),
        }
    }

    /// Reads the keys already listed in the report files.
    ///
    /// Missing report files count as empty. A key found in both files is
    /// reported as a success only, so a resumed batch over such files has one
    /// more report row than keys in its manifest.
    pub fn read_recorded(&self) -> Result<BatchManifest, BatchError> {
        let successes = read_keys(&self.successes)?;
        let failures = read_keys(&self.failures)?
            .into_iter()
            .filter(|key| !successes.contains(key))
            .collect();
        Ok(BatchManifest {
            successes,
            failures,
        })
    }
}

fn read_keys(path: &Path) -> Result<Vec<QueryKey>, BatchError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_path(path).map_err(|e| BatchError::Csv(path.to_path_buf(), e))?;
    let mut keys = Vec::new();
    for record in reader.deserialize::<QueryKey>() {
        keys.push(record.map_err(|e| BatchError::Csv(path.to_path_buf(), e))?);
    }
    debug!("Read {} recorded keys from {}", keys.len(), path.display());
    Ok(keys)
}

#[derive(Debug, Serialize)]
struct DataRow<'a> {
    station_id: u32,
    parameter_id: u32,
    date: NaiveDateTime,
    day: &'a str,
    hour: &'a str,
    station_name: &'a str,
    parameter_name: &'a str,
    unit: &'a str,
    value: f64,
}

#[derive(Debug, Serialize)]
struct SuccessRow {
    station_id: u32,
    parameter_id: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    attempts: u32,
    rows: usize,
}

#[derive(Debug, Serialize)]
struct FailureRow<'a> {
    station_id: u32,
    parameter_id: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    attempts: u32,
    reason: &'a str,
}

struct ReportFile {
    path: PathBuf,
    writer: Writer<File>,
}

impl ReportFile {
    /// Opens `path` for appending, writing `header` unless the file is being
    /// resumed and already has content.
    fn open(path: &Path, header: &[&str], resume: bool) -> Result<Self, BatchError> {
        let io_err = |e| BatchError::Io(path.to_path_buf(), e);

        let has_content = resume
            && match std::fs::metadata(path) {
                Ok(metadata) => metadata.len() > 0,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(io_err(e)),
            };

        let mut options = OpenOptions::new();
        options.create(true);
        if resume {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(path).map_err(io_err)?;

        let mut report = ReportFile {
            path: path.to_path_buf(),
            writer: WriterBuilder::new().has_headers(false).from_writer(file),
        };
        if !has_content {
            report.write_record(header)?;
            report.flush()?;
        }
        Ok(report)
    }

    fn write_record(&mut self, record: &[&str]) -> Result<(), BatchError> {
        self.writer
            .write_record(record)
            .map_err(|e| BatchError::Csv(self.path.clone(), e))
    }

    fn serialize<S: Serialize>(&mut self, row: S) -> Result<(), BatchError> {
        self.writer
            .serialize(row)
            .map_err(|e| BatchError::Csv(self.path.clone(), e))
    }

    fn flush(&mut self) -> Result<(), BatchError> {
        self.writer
            .flush()
            .map_err(|e| BatchError::Io(self.path.clone(), e))
    }
}

/// Writer over the data file and both report files of a batch.
pub(crate) struct BatchWriter {
    data: ReportFile,
    successes: ReportFile,
    failures: ReportFile,
}

impl BatchWriter {
    /// Opens the files of a batch. Without `resume` any existing content is
    /// replaced by a fresh header.
    pub(crate) fn open(files: &BatchFiles, resume: bool) -> Result<Self, BatchError> {
        let writer = BatchWriter {
            data: ReportFile::open(&files.data, &DATA_HEADER, resume)?,
            successes: ReportFile::open(&files.successes, &SUCCESS_HEADER, resume)?,
            failures: ReportFile::open(&files.failures, &FAILURE_HEADER, resume)?,
        };
        info!(
            "Writing batch data to {} (resume: {})",
            files.data.display(),
            resume
        );
        Ok(writer)
    }

    /// Appends the rows for a resolved key: its measurements first, then its
    /// report row.
    pub(crate) fn record(&mut self, key: &QueryKey, resolution: &Resolution) -> Result<(), BatchError> {
        match resolution {
            Resolution::Success {
                attempts,
                measurements,
            } => {
                for m in measurements {
                    self.data.serialize(DataRow {
                        station_id: key.station_id,
                        parameter_id: key.parameter_id,
                        date: m.timestamp,
                        day: &m.day,
                        hour: &m.hour,
                        station_name: &m.station_name,
                        parameter_name: &m.parameter_name,
                        unit: &m.unit,
                        value: m.value,
                    })?;
                }
                self.data.flush()?;

                self.successes.serialize(SuccessRow {
                    station_id: key.station_id,
                    parameter_id: key.parameter_id,
                    start_date: key.start_date,
                    end_date: key.end_date,
                    attempts: *attempts,
                    rows: measurements.len(),
                })?;
                self.successes.flush()
            }
            Resolution::Failure { attempts, reason } => {
                self.failures.serialize(FailureRow {
                    station_id: key.station_id,
                    parameter_id: key.parameter_id,
                    start_date: key.start_date,
                    end_date: key.end_date,
                    attempts: *attempts,
                    reason,
                })?;
                self.failures.flush()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::measurement::Measurement;
    use tempfile::TempDir;

    fn key(station_id: u32, parameter_id: u32) -> QueryKey {
        QueryKey::new(
            station_id,
            parameter_id,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 7).unwrap(),
        )
    }

    fn measurement(hour: u32, value: f64) -> Measurement {
        Measurement {
            timestamp: NaiveDate::from_ymd_opt(2021, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            day: "01/01/2021".to_string(),
            hour: format!("{:02}:00", hour),
            station_name: "Pinheiros".to_string(),
            parameter_name: "O3 (Ozônio)".to_string(),
            unit: "µg/m3".to_string(),
            value,
        }
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_report_paths_share_the_base_name() {
        let files = BatchFiles::for_save_path(Path::new("/data/ozone.csv"));
        assert_eq!(files.data, PathBuf::from("/data/ozone.csv"));
        assert_eq!(files.successes, PathBuf::from("/data/ozone_successes.csv"));
        assert_eq!(files.failures, PathBuf::from("/data/ozone_failures.csv"));

        let bare = BatchFiles::for_save_path(Path::new("out"));
        assert_eq!(bare.successes, PathBuf::from("out_successes.csv"));
    }

    #[test]
    fn test_headers_are_written_on_open() -> Result<(), BatchError> {
        let dir = TempDir::new().unwrap();
        let files = BatchFiles::for_save_path(&dir.path().join("batch.csv"));
        BatchWriter::open(&files, false)?;

        assert_eq!(lines(&files.data), [DATA_HEADER.join(",")]);
        assert_eq!(lines(&files.successes), [SUCCESS_HEADER.join(",")]);
        assert_eq!(lines(&files.failures), [FAILURE_HEADER.join(",")]);
        Ok(())
    }

    #[test]
    fn test_resolutions_are_appended() -> Result<(), BatchError> {
        let dir = TempDir::new().unwrap();
        let files = BatchFiles::for_save_path(&dir.path().join("batch.csv"));
        let mut writer = BatchWriter::open(&files, false)?;

        writer.record(
            &key(99, 63),
            &Resolution::Success {
                attempts: 2,
                measurements: vec![measurement(1, 12.5), measurement(2, 30.0)],
            },
        )?;
        writer.record(
            &key(99, 17),
            &Resolution::Failure {
                attempts: 3,
                reason: "no data table returned".to_string(),
            },
        )?;

        let data = lines(&files.data);
        assert_eq!(data.len(), 3);
        assert_eq!(
            data[1],
            "99,63,2021-01-01T01:00:00,01/01/2021,01:00,Pinheiros,O3 (Ozônio),µg/m3,12.5"
        );
        assert_eq!(lines(&files.successes)[1], "99,63,2021-01-01,2021-01-07,2,2");
        assert_eq!(
            lines(&files.failures)[1],
            "99,17,2021-01-01,2021-01-07,3,no data table returned"
        );
        Ok(())
    }

    #[test]
    fn test_resume_keeps_content_and_reads_keys() -> Result<(), BatchError> {
        let dir = TempDir::new().unwrap();
        let files = BatchFiles::for_save_path(&dir.path().join("batch.csv"));

        let mut writer = BatchWriter::open(&files, false)?;
        writer.record(
            &key(99, 63),
            &Resolution::Success {
                attempts: 1,
                measurements: vec![measurement(1, 1.0)],
            },
        )?;
        writer.record(
            &key(72, 63),
            &Resolution::Failure {
                attempts: 3,
                reason: "timeout".to_string(),
            },
        )?;
        drop(writer);

        BatchWriter::open(&files, true)?;
        assert_eq!(lines(&files.successes).len(), 2);
        assert_eq!(lines(&files.data).len(), 2);

        let recorded = files.read_recorded()?;
        assert_eq!(recorded.successes, [key(99, 63)]);
        assert_eq!(recorded.failures, [key(72, 63)]);
        Ok(())
    }

    #[test]
    fn test_key_in_both_reports_is_a_success() -> Result<(), BatchError> {
        let dir = TempDir::new().unwrap();
        let files = BatchFiles::for_save_path(&dir.path().join("batch.csv"));

        let mut writer = BatchWriter::open(&files, false)?;
        writer.record(
            &key(99, 63),
            &Resolution::Failure {
                attempts: 3,
                reason: "timeout".to_string(),
            },
        )?;
        writer.record(
            &key(99, 63),
            &Resolution::Success {
                attempts: 1,
                measurements: vec![measurement(1, 1.0)],
            },
        )?;
        drop(writer);

        let recorded = files.read_recorded()?;
        assert_eq!(recorded.successes, [key(99, 63)]);
        assert!(recorded.failures.is_empty());
        assert_eq!(recorded.len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_reports_read_as_empty() -> Result<(), BatchError> {
        let dir = TempDir::new().unwrap();
        let files = BatchFiles::for_save_path(&dir.path().join("nothing.csv"));
        assert!(files.read_recorded()?.is_empty());
        Ok(())
    }
}
