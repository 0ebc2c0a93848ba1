use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::telemetry::TelemetryError;

pub const DEFAULT_PORT: &str = "/dev/tty.usbmodem411";

pub const DEFAULT_BAUD: u32 = 9600;

/// How many timestamp units stay on screen while the chart scrolls.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeWindow {
    pub length: f64,
}

impl TimeWindow {
    pub fn new(length: f64) -> Result<Self, TelemetryError> {
        if !length.is_finite() || length <= 0.0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "window length must be positive and finite, got {length}"
            )));
        }
        Ok(Self { length })
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow { length: 10.0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SourceKind {
    #[default]
    Serial,
    Replay { path: PathBuf },
    Simulate { sample_rate_hz: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub port: String,
    pub baud: u32,
    pub timeout_ms: u64,
    pub labels: Vec<String>,
    /// Expected channel count; learned from the first row when absent.
    pub channels: Option<usize>,
    pub window: TimeWindow,
    /// Records buffered before one append + redraw cycle.
    pub batch_size: usize,
    pub source: SourceKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_owned(),
            baud: DEFAULT_BAUD,
            timeout_ms: 1000,
            labels: Vec::new(),
            channels: None,
            window: TimeWindow::default(),
            batch_size: 1,
            source: SourceKind::Serial,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, TelemetryError> {
        let text = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text).map_err(|e| {
            TelemetryError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        log::debug!("loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        TimeWindow::new(self.window.length)?;
        if self.batch_size == 0 {
            return Err(TelemetryError::InvalidConfig(
                "batch size must be at least 1".into(),
            ));
        }
        if self.baud == 0 {
            return Err(TelemetryError::InvalidConfig("baud rate must be non-zero".into()));
        }
        if let Some(channels) = self.channels {
            if channels == 0 {
                return Err(TelemetryError::InvalidConfig(
                    "channel count must be at least 1".into(),
                ));
            }
            if self.labels.len() > channels {
                return Err(TelemetryError::InvalidConfig(format!(
                    "{} labels given for {channels} channels",
                    self.labels.len()
                )));
            }
        }
        if let SourceKind::Simulate { sample_rate_hz } = self.source {
            if !(sample_rate_hz > 0.0) {
                return Err(TelemetryError::InvalidConfig(format!(
                    "simulated sample rate must be positive, got {sample_rate_hz}"
                )));
            }
        }
        Ok(())
    }

    /// Field count the decoder enforces from the first record, if pinned.
    pub fn field_count(&self) -> Option<usize> {
        self.channels.map(|n| n + 1)
    }

    /// Number of channels a simulated device should emit.
    pub fn simulated_channels(&self) -> usize {
        self.channels.unwrap_or(self.labels.len()).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_validate() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window.length, 10.0);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.field_count(), None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"labels": ["A", "B"], "window": 5.0, "source": {"kind": "simulate", "sample_rate_hz": 50.0}}"#,
        )
        .unwrap();
        assert_eq!(config.labels, vec!["A", "B"]);
        assert_eq!(config.window, TimeWindow { length: 5.0 });
        assert_eq!(config.baud, DEFAULT_BAUD);
        assert_eq!(config.source, SourceKind::Simulate { sample_rate_hz: 50.0 });
        assert_eq!(config.simulated_channels(), 2);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.json");
        std::fs::write(&path, r#"{"port": "/dev/ttyACM0", "baud": 115200, "channels": 3}"#).unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.field_count(), Some(4));
        std::fs::write(&path, "{not json").unwrap();
        assert_matches!(SessionConfig::load(&path), Err(TelemetryError::InvalidConfig(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_window = SessionConfig {
            window: TimeWindow { length: 0.0 },
            ..Default::default()
        };
        assert_matches!(bad_window.validate(), Err(TelemetryError::InvalidConfig(_)));
        let bad_batch = SessionConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(bad_batch.validate().is_err());
        let too_many_labels = SessionConfig {
            labels: vec!["a".into(), "b".into()],
            channels: Some(1),
            ..Default::default()
        };
        assert!(too_many_labels.validate().is_err());
        assert!(TimeWindow::new(f64::NAN).is_err());
        assert!(TimeWindow::new(2.5).is_ok());
    }
}
