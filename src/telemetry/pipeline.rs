use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::telemetry::decoder::{FrameDecoder, IngestBatch};
use crate::telemetry::source::LineSource;
use crate::telemetry::{Session, TelemetryError};
/// Cooperative stop request, checked between ingest cycles only.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);
impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
/// Reads records from a source and hands them back decoded, `batch_size`
/// records at a time.
pub struct IngestPipeline<S: LineSource> {
    source: S,
    decoder: FrameDecoder,
    pending: Vec<String>,
    batch_size: usize,
}
impl<S: LineSource> IngestPipeline<S> {
    pub fn new(source: S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            source,
            decoder: FrameDecoder::new(),
            pending: Vec::with_capacity(batch_size),
            batch_size,
        }
    }
    /// Enforce a known field count from the first record on.
    pub fn with_field_count(mut self, field_count: Option<usize>) -> Self {
        if let Some(count) = field_count {
            self.decoder = FrameDecoder::with_field_count(count);
        }
        self
    }
    pub fn source(&self) -> &S {
        &self.source
    }
    pub fn reset_source(&mut self) -> Result<(), TelemetryError> {
        self.pending.clear();
        self.source.reset()
    }
    /// Read one record. Once `batch_size` records are pending they are
    /// decoded and returned.
    pub fn pump_once(&mut self) -> Result<Option<IngestBatch>, TelemetryError> {
        let record = self.source.read_line()?;
        self.pending.push(record);
        if self.pending.len() < self.batch_size {
            return Ok(None);
        }
        Ok(Some(self.flush()))
    }
    /// Decode whatever is pending, full batch or not.
    pub fn flush(&mut self) -> IngestBatch {
        let batch = self.decoder.decode_batch(self.pending.drain(..));
        for err in &batch.errors {
            log::warn!("dropped record: {err}");
        }
        batch
    }
}
/// Drive `pipeline` into `session` until `cancel` is set or `keep_going`
/// returns false. Returns the number of records that were reported as bad.
pub fn run_until_cancelled<S: LineSource>(
    pipeline: &mut IngestPipeline<S>,
    session: &mut Session,
    cancel: &CancelFlag,
    mut keep_going: impl FnMut(&IngestPipeline<S>) -> bool,
) -> Result<usize, TelemetryError> {
    let mut rejected = 0;
    while !cancel.is_cancelled() && keep_going(pipeline) {
        if let Some(batch) = pipeline.pump_once()? {
            rejected += append_batch(session, batch)?;
        }
    }
    rejected += append_batch(session, pipeline.flush())?;
    Ok(rejected)
}
fn append_batch(session: &mut Session, batch: IngestBatch) -> Result<usize, TelemetryError> {
    let decode_errors = batch.errors.len();
    let mut refused = 0;
    for row in &batch.rows {
        match session.append(row) {
            Ok(()) => {}
            Err(TelemetryError::SessionClosed) => return Err(TelemetryError::SessionClosed),
            Err(err) => {
                log::warn!("row refused by session: {err}");
                refused += 1;
            }
        }
    }
    Ok(decode_errors + refused)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::source::ManualSource;
    use crate::telemetry::SessionState;
    #[test]
    fn pipeline_decodes_in_batches() {
        let source = ManualSource::new(["0 1 2", "", "1 1.5 2.5", "2 x 2", "3 1 1"]);
        let mut pipeline = IngestPipeline::new(source, 2);
        assert!(pipeline.pump_once().unwrap().is_none());
        let batch = pipeline.pump_once().unwrap().unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert!(pipeline.pump_once().unwrap().is_none());
        let batch = pipeline.pump_once().unwrap().unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.errors.len(), 1);
        assert!(pipeline.pump_once().unwrap().is_none());
        let batch = pipeline.flush();
        assert_eq!(batch.rows[0].fields(), &[3.0, 1.0, 1.0]);
    }
    #[test]
    fn zero_batch_size_means_one_record_at_a_time() {
        let mut pipeline = IngestPipeline::new(ManualSource::new(["0 1"]), 0);
        let batch = pipeline.pump_once().unwrap().unwrap();
        assert_eq!(batch.rows.len(), 1);
    }
    #[test]
    fn run_stops_when_source_drains_and_flushes_partial_batch() {
        let source = ManualSource::new(["0\t1.0\t2.0", "1\t1.5\t2.5", "2\t1.2\t2.2"]);
        let mut pipeline = IngestPipeline::new(source, 5);
        let mut session = Session::new(vec!["A".into(), "B".into()]);
        let cancel = CancelFlag::new();
        let rejected = run_until_cancelled(&mut pipeline, &mut session, &cancel, |p| {
            !p.source().is_exhausted()
        })
        .unwrap();
        assert_eq!(rejected, 0);
        assert_eq!(session.row_count(), 3);
        assert_eq!(session.visible_bound(10.0).unwrap(), (-8.0, 2.0));
    }
    #[test]
    fn cancelled_before_start_reads_nothing() {
        let mut pipeline = IngestPipeline::new(ManualSource::new(["0 1"]), 1);
        let mut session = Session::new(vec![]);
        let cancel = CancelFlag::new();
        cancel.clone().cancel();
        run_until_cancelled(&mut pipeline, &mut session, &cancel, |_| true).unwrap();
        assert_eq!(session.row_count(), 0);
        assert_eq!(pipeline.source().remaining(), 1);
    }
    #[test]
    fn configured_field_count_rejects_first_wide_row() {
        let source = ManualSource::new(["0 1 2 3", "1 5"]);
        let mut pipeline = IngestPipeline::new(source, 2).with_field_count(Some(2));
        let mut session = Session::with_channel_count(vec![], 1);
        let cancel = CancelFlag::new();
        let rejected =
            run_until_cancelled(&mut pipeline, &mut session, &cancel, |p| !p.source().is_exhausted())
                .unwrap();
        assert_eq!(rejected, 1);
        assert_eq!(session.row_count(), 1);
    }
    #[test]
    fn stray_timestamp_line_does_not_stall_the_session() {
        let source = ManualSource::new(["7", "0\t1.0\t2.0", "1\t1.5\t2.5"]);
        let mut pipeline = IngestPipeline::new(source, 1);
        let mut session = Session::new(vec!["A".into(), "B".into()]);
        let cancel = CancelFlag::new();
        let rejected =
            run_until_cancelled(&mut pipeline, &mut session, &cancel, |p| !p.source().is_exhausted())
                .unwrap();
        assert_eq!(rejected, 1);
        assert_eq!(session.row_count(), 2);
        assert_eq!(session.state(), SessionState::Active(2));
        assert_eq!(session.visible_bound(1.0).unwrap(), (0.0, 1.0));
    }
    #[test]
    fn non_finite_values_are_dropped_not_plotted() {
        let source = ManualSource::new(["0 1.0", "1 inf", "2 NaN", "3 2.0"]);
        let mut pipeline = IngestPipeline::new(source, 2);
        let mut session = Session::new(vec![]);
        let cancel = CancelFlag::new();
        let rejected =
            run_until_cancelled(&mut pipeline, &mut session, &cancel, |p| !p.source().is_exhausted())
                .unwrap();
        assert_eq!(rejected, 2);
        assert_eq!(session.value_bounds(0).unwrap(), (1.0, 2.0));
    }
    #[test]
    fn closed_session_stops_the_loop() {
        let mut pipeline = IngestPipeline::new(ManualSource::new(["0 1", "1 2"]), 1);
        let mut session = Session::new(vec![]);
        session.close();
        let cancel = CancelFlag::new();
        let result = run_until_cancelled(&mut pipeline, &mut session, &cancel, |_| true);
        assert!(matches!(result, Err(TelemetryError::SessionClosed)));
    }
}
