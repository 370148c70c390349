//! Terminal output callback for streaming step output
//!
//! Prints every line a step writes as soon as it arrives, with stderr
//! lines routed to the terminal's stderr. In quiet mode nothing is printed
//! and the spinner message shows the latest line.

use crate::execution::{OutputCallback, OutputStream};
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::Mutex;

/// Callback that displays step output in the terminal
#[derive(Default)]
pub struct TerminalOutputCallback {
    quiet: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalOutputCallback {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }

    /// Attach the spinner of the step now running (quiet mode)
    pub fn set_spinner(&self, spinner: Option<ProgressBar>) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.take() {
                previous.finish_and_clear();
            }
            *slot = spinner;
        }
    }

    /// Print a separator line spanning the terminal width
    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        println!("{}", console::style("─".repeat(width)).dim());
    }
}

impl OutputCallback for TerminalOutputCallback {
    fn on_line(&self, stream: OutputStream, line: &str) {
        if self.quiet {
            if let Ok(slot) = self.spinner.lock() {
                if let Some(spinner) = slot.as_ref() {
                    let plain = console::strip_ansi_codes(line);
                    spinner.set_message(plain.trim().to_string());
                }
            }
            return;
        }

        match stream {
            OutputStream::Stdout => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{}", line);
                let _ = out.flush();
            }
            OutputStream::Stderr => {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{}", line);
                let _ = err.flush();
            }
        }
    }
}
