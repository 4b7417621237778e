use std::io;

use tracing_subscriber::fmt::MakeWriter;

use crate::config::{LogFormat, LoggingSettings};

/// Install the global subscriber. Workers capture `console.log`, not stdout,
/// so every formatted line is forwarded there. Timestamps come from the
/// Workers log pipeline.
pub fn init(logging: &LoggingSettings) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(logging.level)
        .with_target(true)
        .without_time()
        .with_ansi(false)
        .with_writer(Console);

    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if let Err(err) = result {
        worker::console_error!("failed to install tracing subscriber: {}", err);
    }
}

#[derive(Debug, Clone, Copy)]
struct Console;

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine::default()
    }
}

/// Buffers one formatted event and hands it to `console.log` when flushed
/// or dropped.
#[derive(Default)]
struct ConsoleLine {
    buf: Vec<u8>,
}

impl ConsoleLine {
    fn emit(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        worker::console_log!("{}", line.trim_end());
        self.buf.clear();
    }
}

impl io::Write for ConsoleLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit();
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        self.emit();
    }
}
