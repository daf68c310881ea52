//! CSV catalog of received notifications.
//!
//! The queue downloader records one row per decoded notification, whether
//! or not it passes the filter, so the catalog shows everything the topic
//! published.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use csv::{QuoteStyle, Writer, WriterBuilder};
use tracing::info;

use crate::dispatch::NotificationObserver;
use crate::error::{NotifyError, NotifyResult};
use crate::notification::Notification;

/// Column order of the catalog file.
pub const CATALOG_COLUMNS: &[&str] = &[
    "object_url",
    "diagnostic",
    "forecast_reference_time",
    "forecast_period",
    "realization",
    "height",
    "height_units",
    "pressure",
    "pressure_units",
    "received_at",
];

/// Metadata keys written after the URL, in column order.
const METADATA_COLUMNS: &[&str] = &[
    "name",
    "forecast_reference_time",
    "forecast_period",
    "realization",
    "height",
    "height_units",
    "pressure",
    "pressure_units",
];

pub struct DiagnosticCatalog<W: Write> {
    writer: Mutex<Writer<W>>,
}

impl DiagnosticCatalog<File> {
    /// Create `<dir>/<queue_name>-diagnostics.csv`, truncating any previous
    /// catalog for the same queue.
    pub fn create(dir: &Path, queue_name: &str) -> NotifyResult<Self> {
        fs::create_dir_all(dir)?;
        let path = catalog_path(dir, queue_name);
        let file = File::create(&path)?;
        info!(path = %path.display(), "Writing diagnostic catalog");
        Self::from_writer(file)
    }
}

impl<W: Write> DiagnosticCatalog<W> {
    /// Wrap a writer and emit the header row.
    pub fn from_writer(inner: W) -> NotifyResult<Self> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(inner);
        writer.write_record(CATALOG_COLUMNS).map_err(csv_error)?;
        writer.flush()?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    /// Append one row and flush it.
    pub fn record(&self, notification: &Notification) -> NotifyResult<()> {
        let mut row = Vec::with_capacity(CATALOG_COLUMNS.len());
        row.push(notification.url.clone());
        for key in METADATA_COLUMNS {
            row.push(notification.metadata.get(key).unwrap_or_default());
        }
        row.push(Utc::now().to_rfc3339());

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| NotifyError::Io("catalog writer poisoned".to_string()))?;
        writer.write_record(&row).map_err(csv_error)?;
        writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> NotifyResult<W> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| NotifyError::Io("catalog writer poisoned".to_string()))?;
        writer
            .into_inner()
            .map_err(|e| NotifyError::Io(e.error().to_string()))
    }
}

impl<W: Write + Send> NotificationObserver for DiagnosticCatalog<W> {
    fn observe(&self, notification: &Notification) -> NotifyResult<()> {
        self.record(notification)
    }
}

pub fn catalog_path(dir: &Path, queue_name: &str) -> PathBuf {
    dir.join(format!("{}-diagnostics.csv", queue_name))
}

fn csv_error(err: csv::Error) -> NotifyError {
    NotifyError::Io(format!("CSV write failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(payload: &str) -> Notification {
        Notification::parse(payload).unwrap()
    }

    #[test]
    fn test_header_is_quoted() {
        let catalog = DiagnosticCatalog::from_writer(Vec::new()).unwrap();
        let text = String::from_utf8(catalog.into_inner().unwrap()).unwrap();
        assert!(text.starts_with("\"object_url\",\"diagnostic\",\"forecast_reference_time\""));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_row_per_notification() {
        let catalog = DiagnosticCatalog::from_writer(Vec::new()).unwrap();
        catalog
            .record(&notification(
                r#"{"url":"https://x/a.nc","metadata":{"name":"surface_temperature","forecast_reference_time":"2017-01-01T00:00:00Z","forecast_period":3600,"height":1.5,"height_units":"m"}}"#,
            ))
            .unwrap();
        catalog
            .record(&notification(r#"{"url":"https://x/b.nc","metadata":{"name":"relative_humidity"}}"#))
            .unwrap();

        let text = String::from_utf8(catalog.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(
            "\"https://x/a.nc\",\"surface_temperature\",\"2017-01-01T00:00:00Z\",\"3600\",\"\",\"1.5\",\"m\",\"\",\"\","
        ));
        assert!(lines[2].starts_with("\"https://x/b.nc\",\"relative_humidity\",\"\",\"\""));
    }

    #[test]
    fn test_create_names_file_after_queue() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        let catalog = DiagnosticCatalog::create(&output, "my-queue").unwrap();
        catalog
            .record(&notification(r#"{"url":"https://x/a.nc","metadata":{}}"#))
            .unwrap();

        let text = std::fs::read_to_string(output.join("my-queue-diagnostics.csv")).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
