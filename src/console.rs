// src/console.rs
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use anyhow::{Context, Result};
use crate::config::SessionConfig;
use crate::engine;
use crate::recorder::{csv_path, export_csv_file, wants_save};
use crate::telemetry::{run_until_cancelled, save_history_png, CancelFlag, PlotStyle, Session};

/// Owns stdin for the whole run. The first line typed while collecting is the
/// stop keystroke and only sets `cancel`; later lines are answers to prompts.
pub fn spawn_stdin_reader(cancel: CancelFlag) -> Receiver<String> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            if !cancel.is_cancelled() {
                cancel.cancel();
                continue;
            }
            if tx.send(line).is_err() {
                break;
            }
        }
        // EOF on stdin also counts as "stop".
        cancel.cancel();
    });
    rx
}

pub fn prompt<W: Write>(
    answers: &mut impl Iterator<Item = String>,
    output: &mut W,
    question: &str,
) -> io::Result<String> {
    writeln!(output, "{question}")?;
    output.flush()?;
    Ok(answers.next().unwrap_or_default().trim().to_owned())
}

/// Ask whether to keep the data and, if so, export it as CSV.
pub fn offer_export<W: Write>(
    session: &Session,
    answers: &mut impl Iterator<Item = String>,
    output: &mut W,
) -> Result<Option<PathBuf>> {
    let answer = prompt(answers, output, "Save the data [Y/N]?")?;
    if !wants_save(&answer) {
        writeln!(output, "OK then.")?;
        return Ok(None);
    }
    let name = prompt(answers, output, "What would you like to name the .csv file?")?;
    if name.is_empty() {
        writeln!(output, "No file name given, nothing saved.")?;
        return Ok(None);
    }
    let path = csv_path(&name);
    export_csv_file(session, &path)
        .with_context(|| format!("failed to export {}", path.display()))?;
    writeln!(output, "{} created.", path.display())?;
    Ok(Some(path))
}

/// Collect until <enter> (or the end of a replay), then plot the whole run.
pub fn run_collect(config: &SessionConfig, plot_path: &Path) -> Result<()> {
    println!("Opening and resetting source...");
    let mut pipeline = engine::prepare_pipeline(config).context("failed to open telemetry source")?;
    let mut session = match config.channels {
        Some(n) => Session::with_channel_count(config.labels.clone(), n),
        None => Session::new(config.labels.clone()),
    };
    let cancel = CancelFlag::new();
    let answers = spawn_stdin_reader(cancel.clone());
    println!("Beginning data collection... press <enter> to stop...");
    let rejected = run_until_cancelled(&mut pipeline, &mut session, &cancel, |p| {
        !p.source().is_exhausted()
    })?;
    cancel.cancel();
    session.close();
    println!(
        "Data collection finished: {} rows, {rejected} records dropped.",
        session.row_count()
    );
    if session.row_count() == 0 {
        println!("No data received; nothing to plot.");
        return Ok(());
    }
    save_history_png(&session, &PlotStyle::default(), plot_path)
        .with_context(|| format!("failed to render {}", plot_path.display()))?;
    println!("Plot written to {}", plot_path.display());
    offer_export(&session, &mut answers.iter(), &mut io::stdout())?;
    println!("Goodbye");
    Ok(())
}
