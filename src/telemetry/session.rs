use crate::telemetry::{DecodedRow, IngestBatch, TelemetryError};
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    pub time: f64,
    pub value: f64,
}
/// Append-only history of one channel, with running value bounds.
#[derive(Clone, Debug, Default)]
pub struct ChannelSeries {
    points: Vec<SamplePoint>,
    bounds: Option<(f64, f64)>,
}
impl ChannelSeries {
    fn push(&mut self, point: SamplePoint) {
        self.points.push(point);
        let (min, max) = self.bounds.unwrap_or((point.value, point.value));
        self.bounds = Some((min.min(point.value), max.max(point.value)));
    }
    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Schema established; holds the channel count.
    Active(usize),
    Closed,
}
/// Scrolling window model: every channel's full history plus the
/// bookkeeping a display needs to pick its axes.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    labels: Vec<String>,
    expected_channels: Option<usize>,
    series: Vec<ChannelSeries>,
    last_time: Option<f64>,
    // Earliest and latest timestamp seen; arrival order may differ.
    time_bounds: Option<(f64, f64)>,
}
impl Session {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            state: SessionState::Uninitialized,
            labels,
            expected_channels: None,
            series: Vec::new(),
            last_time: None,
            time_bounds: None,
        }
    }
    /// Session whose first row must carry exactly `channels` measurements.
    pub fn with_channel_count(labels: Vec<String>, channels: usize) -> Self {
        Self {
            expected_channels: Some(channels),
            ..Self::new(labels)
        }
    }
    pub fn state(&self) -> SessionState {
        self.state
    }
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }
    /// Channel count once the schema is established.
    pub fn channel_count(&self) -> Option<usize> {
        match self.state {
            SessionState::Active(n) => Some(n),
            SessionState::Closed if !self.series.is_empty() => Some(self.series.len()),
            _ => None,
        }
    }
    /// Field count (timestamp included) the decoder should enforce.
    pub fn field_count(&self) -> Option<usize> {
        self.channel_count()
            .or(self.expected_channels)
            .map(|n| n + 1)
    }
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    pub fn row_count(&self) -> usize {
        self.series.first().map(ChannelSeries::len).unwrap_or(0)
    }
    pub fn append(&mut self, row: &DecodedRow) -> Result<(), TelemetryError> {
        let channels = match self.state {
            SessionState::Closed => return Err(TelemetryError::SessionClosed),
            SessionState::Active(n) => n,
            SessionState::Uninitialized => {
                let expected = self.expected_channels.map(|n| n + 1).unwrap_or(row.len());
                if row.len() < 2 || row.len() != expected {
                    return Err(TelemetryError::SchemaMismatch {
                        expected: expected.max(2),
                        actual: row.len(),
                    });
                }
                self.establish(row.len() - 1);
                row.len() - 1
            }
        };
        if row.len() != channels + 1 {
            return Err(TelemetryError::SchemaMismatch {
                expected: channels + 1,
                actual: row.len(),
            });
        }
        let time = row.timestamp().ok_or(TelemetryError::EmptyRecord)?;
        for (series, &value) in self.series.iter_mut().zip(row.values()) {
            series.push(SamplePoint { time, value });
        }
        self.last_time = Some(time);
        let (first, last) = self.time_bounds.unwrap_or((time, time));
        self.time_bounds = Some((first.min(time), last.max(time)));
        Ok(())
    }
    /// Append every decoded row of a batch. Returns the batch's decode errors
    /// followed by any rows the session refused.
    pub fn ingest(&mut self, batch: IngestBatch) -> Vec<TelemetryError> {
        let IngestBatch { rows, mut errors } = batch;
        for row in &rows {
            if let Err(err) = self.append(row) {
                errors.push(err);
            }
        }
        errors
    }
    /// `(t_last - window_length, t_last)`, where `t_last` is the timestamp of
    /// the most recently appended row.
    pub fn visible_bound(&self, window_length: f64) -> Result<(f64, f64), TelemetryError> {
        let high = self.last_time.ok_or(TelemetryError::NoData)?;
        Ok((high - window_length, high))
    }
    pub fn full_history(&self) -> &[ChannelSeries] {
        &self.series
    }
    /// Min and max over the channel's whole history.
    pub fn value_bounds(&self, channel: usize) -> Result<(f64, f64), TelemetryError> {
        if self.last_time.is_none() {
            return Err(TelemetryError::NoData);
        }
        self.series
            .get(channel)
            .ok_or(TelemetryError::UnknownChannel {
                index: channel,
                channels: self.series.len(),
            })?
            .bounds()
            .ok_or(TelemetryError::NoData)
    }
    /// Bounds spanning every channel.
    pub fn overall_value_bounds(&self) -> Result<(f64, f64), TelemetryError> {
        let mut overall: Option<(f64, f64)> = None;
        for idx in 0..self.series.len() {
            let (lo, hi) = self.value_bounds(idx)?;
            overall = Some(match overall {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        overall.ok_or(TelemetryError::NoData)
    }
    /// Smallest and largest timestamp over the whole history.
    pub fn time_span(&self) -> Result<(f64, f64), TelemetryError> {
        self.time_bounds.ok_or(TelemetryError::NoData)
    }
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            log::info!("session closed after {} rows", self.row_count());
        }
        self.state = SessionState::Closed;
    }
    fn establish(&mut self, channels: usize) {
        self.labels.truncate(channels);
        for idx in self.labels.len()..channels {
            self.labels.push(format!("Ch {}", idx + 1));
        }
        self.series = vec![ChannelSeries::default(); channels];
        self.state = SessionState::Active(channels);
        log::info!("session established with {channels} channels: {:?}", self.labels);
    }
}
