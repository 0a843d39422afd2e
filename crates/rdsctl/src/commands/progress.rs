//! Spinner driven by waiter progress events

use std::io::IsTerminal;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use rdsctl_core::{ProgressCallback, ProgressEvent};

use crate::cli::OutputFormat;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Visible only for `auto` output on an interactive stderr
    pub fn new(output: OutputFormat, message: &str) -> Self {
        let pb = if output == OutputFormat::Auto && std::io::stderr().is_terminal() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_message(message.to_string());
        Self { pb }
    }

    /// Callback handed to the workflow; updates the spinner message
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |event: ProgressEvent| pb.set_message(describe(&event)))
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

/// One-line description of a progress event
pub fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Started {
            kind,
            identifier,
            target,
        } => format!("Waiting for {} {} to be {}", kind, identifier, target),
        ProgressEvent::Polling {
            kind,
            identifier,
            status,
            attempt,
            elapsed,
        } => format!(
            "{} {}: {} (attempt {}, {:.0}s)",
            kind,
            identifier,
            status,
            attempt,
            elapsed.as_secs_f64()
        ),
        ProgressEvent::Completed {
            kind,
            identifier,
            status,
        } => format!("\u{2713} {} {}: {}", kind, identifier, status),
        ProgressEvent::Failed {
            kind,
            identifier,
            error,
        } => format!("\u{2717} {} {}: {}", kind, identifier, error),
    }
}
