// src/engine.rs
use std::fs::File;
use std::io::BufReader;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use crate::config::{SessionConfig, SourceKind};
use crate::telemetry::{
    CancelFlag, IngestPipeline, LineSource, ReplaySource, SerialSource, SimulatedSource,
    TelemetryError,
};
use crate::types::TelemetryMessage;

pub type BoxedSource = Box<dyn LineSource + Send>;

/// Open the configured byte-stream source. This is the only step whose
/// failure ends a session before it starts.
pub fn open_source(config: &SessionConfig) -> Result<BoxedSource, TelemetryError> {
    let source: BoxedSource = match &config.source {
        SourceKind::Serial => Box::new(SerialSource::open(
            &config.port,
            config.baud,
            config.read_timeout(),
        )?),
        SourceKind::Replay { path } => {
            let file = File::open(path)?;
            log::info!("replaying telemetry from {}", path.display());
            Box::new(ReplaySource::new(BufReader::new(file)))
        }
        SourceKind::Simulate { sample_rate_hz } => {
            log::info!("simulating {} channels at {sample_rate_hz} Hz", config.simulated_channels());
            Box::new(SimulatedSource::new(config.simulated_channels(), *sample_rate_hz)?)
        }
    };
    Ok(source)
}

/// Build a pipeline around a freshly opened and reset source.
pub fn prepare_pipeline(config: &SessionConfig) -> Result<IngestPipeline<BoxedSource>, TelemetryError> {
    let source = open_source(config)?;
    let mut pipeline =
        IngestPipeline::new(source, config.batch_size).with_field_count(config.field_count());
    pipeline.reset_source()?;
    Ok(pipeline)
}

/// Ingest loop for the live view. The thread owns the source and decoder;
/// decoded batches go to the GUI, which is the only writer of the session.
pub fn spawn_thread(
    config: SessionConfig,
    cancel: CancelFlag,
    tx: Sender<TelemetryMessage>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let reason = match prepare_pipeline(&config) {
            Ok(mut pipeline) => {
                tx.send(TelemetryMessage::Log("Beginning data collection...".to_owned()))
                    .ok();
                pump_until_done(&mut pipeline, &cancel, &tx)
            }
            Err(err) => Some(format!("could not open source: {err}")),
        };
        if let Some(reason) = &reason {
            log::error!("{reason}");
        }
        tx.send(TelemetryMessage::Finished(reason)).ok();
    })
}

fn pump_until_done<S: LineSource>(
    pipeline: &mut IngestPipeline<S>,
    cancel: &CancelFlag,
    tx: &Sender<TelemetryMessage>,
) -> Option<String> {
    while !cancel.is_cancelled() && !pipeline.source().is_exhausted() {
        match pipeline.pump_once() {
            Ok(Some(batch)) if batch.is_empty() => {}
            Ok(Some(batch)) => {
                if tx.send(TelemetryMessage::Batch(batch)).is_err() {
                    // GUI is gone.
                    return None;
                }
            }
            Ok(None) => {}
            Err(err) => return Some(format!("source failed: {err}")),
        }
    }
    let rest = pipeline.flush();
    if !rest.is_empty() {
        tx.send(TelemetryMessage::Batch(rest)).ok();
    }
    log::info!("ingest thread stopped");
    None
}
