//! Terminal rendering of the status element.
//!
//! Each change of the element text becomes one timestamped line.

use std::io::{self, Write};

use chrono::{Local, NaiveTime};
use tokio::sync::watch;

/// Format one status line, e.g. `[14:03:07] Conversion completed!`.
pub fn format_line(time: NaiveTime, text: &str) -> String {
    format!("[{}] {text}", time.format("%H:%M:%S"))
}

/// Write a line for every change of the watched text.
///
/// Returns once the status element is dropped. Changes that happen
/// faster than they can be written collapse to the latest text.
pub async fn render<W: Write>(mut rx: watch::Receiver<String>, mut out: W) -> io::Result<()> {
    while rx.changed().await.is_ok() {
        let text = rx.borrow_and_update().clone();
        writeln!(out, "{}", format_line(Local::now().time(), &text))?;
        out.flush()?;
    }
    Ok(())
}
