use std::collections::VecDeque;
use std::io::{self, BufRead, Read};
use std::thread;
use std::time::Duration;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serialport::{ClearBuffer, SerialPort};
use crate::telemetry::TelemetryError;
/// Something that yields newline-terminated text records.
pub trait LineSource {
    /// Next record without its line terminator. Returns an empty record when
    /// nothing arrived before the read timeout.
    fn read_line(&mut self) -> Result<String, TelemetryError>;
    /// Drop whatever was buffered before the session started.
    fn reset(&mut self) -> Result<(), TelemetryError>;
    /// True once the source can never produce another record.
    fn is_exhausted(&self) -> bool {
        false
    }
}
impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self) -> Result<String, TelemetryError> {
        (**self).read_line()
    }
    fn reset(&mut self) -> Result<(), TelemetryError> {
        (**self).reset()
    }
    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}
fn strip_terminator(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}
// Longest partial line kept while waiting for its terminator.
const MAX_PENDING: usize = 4096;
/// Splits a byte stream into lines, dropping runs that never terminate.
#[derive(Debug, Default)]
struct LineFramer {
    pending: Vec<u8>,
}
impl LineFramer {
    /// Buffer `bytes`. Returns the number of bytes thrown away when the
    /// unterminated tail grew past `MAX_PENDING`.
    fn push(&mut self, bytes: &[u8]) -> usize {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING && !self.pending.contains(&b'\n') {
            let dropped = self.pending.len();
            self.pending.clear();
            return dropped;
        }
        0
    }
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(strip_terminator(String::from_utf8_lossy(&line).into_owned()))
    }
    fn clear(&mut self) {
        self.pending.clear();
    }
}
/// Serial device speaking the `time \t x1 ... \t xn \n` format.
pub struct SerialSource {
    port_name: String,
    port: Box<dyn SerialPort>,
    framer: LineFramer,
}
impl SerialSource {
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TelemetryError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()?;
        log::info!("opened serial port {port_name} at {baud_rate} baud");
        Ok(Self {
            port_name: port_name.to_string(),
            port,
            framer: LineFramer::default(),
        })
    }
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
impl LineSource for SerialSource {
    fn read_line(&mut self) -> Result<String, TelemetryError> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.framer.take_line() {
                return Ok(line);
            }
            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(String::new()),
                Ok(n) => {
                    let dropped = self.framer.push(&chunk[..n]);
                    if dropped > 0 {
                        // Usually a baud-rate mismatch. Report it as a junk record.
                        log::warn!("{}: discarded {dropped} bytes without a line break", self.port_name);
                        return Ok(format!("<{dropped} bytes discarded>"));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(String::new()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
    fn reset(&mut self) -> Result<(), TelemetryError> {
        // Toggling DTR restarts most USB microcontroller boards.
        self.port.write_data_terminal_ready(false)?;
        thread::sleep(Duration::from_secs(1));
        self.port.clear(ClearBuffer::Input)?;
        self.port.write_data_terminal_ready(true)?;
        self.framer.clear();
        log::debug!("reset {}: DTR toggled, input flushed", self.port_name);
        Ok(())
    }
}
/// Replays previously captured telemetry from any buffered reader.
pub struct ReplaySource<R: BufRead> {
    reader: R,
    exhausted: bool,
}
impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }
}
impl<R: BufRead> LineSource for ReplaySource<R> {
    fn read_line(&mut self) -> Result<String, TelemetryError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            self.exhausted = true;
        }
        Ok(strip_terminator(line))
    }
    fn reset(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
struct SignalGen {
    freq_hz: f64,
    phase: f64,
    amplitude: f64,
}
/// Synthetic device: sine waves plus uniform noise, one line per sample.
pub struct SimulatedSource {
    sample_rate_hz: f64,
    noise: f64,
    paced: bool,
    sample_index: u64,
    gens: Vec<SignalGen>,
    rng: StdRng,
}
impl SimulatedSource {
    pub fn new(channels: usize, sample_rate_hz: f64) -> Result<Self, TelemetryError> {
        if !(sample_rate_hz > 0.0) {
            return Err(TelemetryError::InvalidConfig(format!(
                "simulated sample rate must be positive, got {sample_rate_hz}"
            )));
        }
        let gens = (0..channels.max(1))
            .map(|idx| SignalGen {
                freq_hz: 0.2 + idx as f64 * 0.15,
                phase: idx as f64 * 0.6,
                amplitude: 1.0 + idx as f64,
            })
            .collect();
        Ok(Self {
            sample_rate_hz,
            noise: 0.05,
            paced: true,
            sample_index: 0,
            gens,
            rng: StdRng::from_entropy(),
        })
    }
    /// Deterministic, unpaced generator for tests.
    pub fn seeded(channels: usize, sample_rate_hz: f64, seed: u64) -> Result<Self, TelemetryError> {
        let mut source = Self::new(channels, sample_rate_hz)?;
        source.rng = StdRng::seed_from_u64(seed);
        source.paced = false;
        Ok(source)
    }
}
impl LineSource for SimulatedSource {
    fn read_line(&mut self) -> Result<String, TelemetryError> {
        if self.paced {
            thread::sleep(Duration::from_secs_f64(1.0 / self.sample_rate_hz));
        }
        let t = self.sample_index as f64 / self.sample_rate_hz;
        self.sample_index += 1;
        let mut line = format!("{t:.3}");
        for gen in &self.gens {
            let base =
                (2.0 * std::f64::consts::PI * gen.freq_hz * t + gen.phase).sin() * gen.amplitude;
            let noise = if self.noise > 0.0 {
                self.rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            };
            line.push_str(&format!("\t{:.4}", base + noise));
        }
        Ok(line)
    }
    fn reset(&mut self) -> Result<(), TelemetryError> {
        self.sample_index = 0;
        Ok(())
    }
}
/// In-memory source useful for tests and deterministic playback.
#[derive(Default)]
pub struct ManualSource {
    stale: VecDeque<String>,
    queue: VecDeque<String>,
}
impl ManualSource {
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            stale: VecDeque::new(),
            queue: lines.into_iter().map(Into::into).collect(),
        }
    }
    /// Lines served before `reset()` is called; reset throws them away.
    pub fn with_stale<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.stale = lines.into_iter().map(Into::into).collect();
        self
    }
    pub fn remaining(&self) -> usize {
        self.stale.len() + self.queue.len()
    }
}
impl LineSource for ManualSource {
    fn read_line(&mut self) -> Result<String, TelemetryError> {
        Ok(self
            .stale
            .pop_front()
            .or_else(|| self.queue.pop_front())
            .unwrap_or_default())
    }
    fn reset(&mut self) -> Result<(), TelemetryError> {
        self.stale.clear();
        Ok(())
    }
    fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}
