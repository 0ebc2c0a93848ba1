// src/main.rs
use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use eframe::egui;
use serialscope::config::{SessionConfig, SourceKind, TimeWindow};
use serialscope::{console, gui};

/// plot line-delimited serial telemetry (`time \t x1 ... \t xn`)
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    /// JSON config file; command-line options override its values
    #[clap(short = 'c', long, global = true)]
    config: Option<PathBuf>,
    #[clap(flatten)]
    source: SourceArgs,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// serial port name
    #[clap(short = 'p', long, global = true)]
    port: Option<String>,
    /// serial baud rate
    #[clap(short = 'b', long, global = true)]
    baud: Option<u32>,
    /// serial read timeout in milliseconds
    #[clap(long, global = true)]
    timeout_ms: Option<u64>,
    /// channel label, once per measurement column
    #[clap(short = 'l', long = "label", global = true)]
    labels: Vec<String>,
    /// expected number of measurement columns (learned from the first row if omitted)
    #[clap(short = 'n', long, global = true)]
    channels: Option<usize>,
    /// records buffered before each append + redraw
    #[clap(long, global = true)]
    batch_size: Option<usize>,
    /// replay a captured log instead of reading the serial port
    #[clap(long, global = true, conflicts_with = "simulate")]
    replay: Option<PathBuf>,
    /// generate synthetic telemetry at this sample rate (Hz)
    #[clap(long, global = true)]
    simulate: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// collect until <enter>, then render the whole run to a PNG
    Collect {
        /// where to write the plot
        #[clap(short = 'o', long, default_value = "telemetry.png")]
        output: PathBuf,
    },
    /// show a live left-scrolling chart
    Live {
        /// visible time span, in timestamp units
        #[clap(short = 'w', long)]
        window: Option<f64>,
    },
}

impl SourceArgs {
    fn apply(self, config: &mut SessionConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(baud) = self.baud {
            config.baud = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if !self.labels.is_empty() {
            config.labels = self.labels;
        }
        if self.channels.is_some() {
            config.channels = self.channels;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(path) = self.replay {
            config.source = SourceKind::Replay { path };
        } else if let Some(sample_rate_hz) = self.simulate {
            config.source = SourceKind::Simulate { sample_rate_hz };
        }
    }
}

fn build_config(cli: Cli) -> Result<(SessionConfig, Command)> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    cli.source.apply(&mut config);
    if let Command::Live {
        window: Some(length),
    } = &cli.command
    {
        config.window = TimeWindow::new(*length)?;
    }
    config.validate()?;
    Ok((config, cli.command))
}

fn run_live(config: SessionConfig) -> Result<()> {
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1200.0, 700.0])
        .with_min_inner_size([640.0, 400.0])
        .with_title("Serial telemetry");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "serialscope",
        options,
        Box::new(move |_cc| Box::new(gui::LivePlotApp::new(config))),
    )
    .map_err(|e| anyhow::anyhow!("live view failed: {e}"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let (config, command) = build_config(Cli::parse())?;
    log::debug!("effective config: {config:?}");
    match command {
        Command::Collect { output } => console::run_collect(&config, &output),
        Command::Live { .. } => run_live(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialscope::config::DEFAULT_PORT;
    use std::ffi::OsString;

    #[test]
    fn cli_overrides_defaults() {
        let cli = Cli::try_parse_from([
            "serialscope", "live", "-w", "5", "-l", "A", "-l", "B", "--simulate", "100",
            "--batch-size", "5",
        ])
        .unwrap();
        let (config, command) = build_config(cli).unwrap();
        assert!(matches!(command, Command::Live { .. }));
        assert_eq!(config.window.length, 5.0);
        assert_eq!(config.labels, vec!["A", "B"]);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.source, SourceKind::Simulate { sample_rate_hz: 100.0 });
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"port": "/dev/ttyUSB0", "baud": 115200, "window": 3.0}"#).unwrap();
        let args: Vec<OsString> = vec![
            "serialscope".into(),
            "collect".into(),
            "--config".into(),
            path.into_os_string(),
            "--baud".into(),
            "9600".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let (config, command) = build_config(cli).unwrap();
        assert!(matches!(command, Command::Collect { .. }));
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud, 9600);
        assert_eq!(config.window.length, 3.0);
    }

    #[test]
    fn non_positive_window_is_rejected() {
        let cli = Cli::try_parse_from(["serialscope", "live", "--window", "0"]).unwrap();
        assert!(build_config(cli).is_err());
        let cli = Cli::try_parse_from(["serialscope", "collect", "--batch-size", "0"]).unwrap();
        assert!(build_config(cli).is_err());
    }
}
