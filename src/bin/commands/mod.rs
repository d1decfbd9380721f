pub mod config;
pub mod preview;
pub mod update;

use std::io::Write;

/// Write `text` to stdout, treating a closed pipe (e.g. `| head`) as success.
pub(crate) fn print_stdout(text: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}
