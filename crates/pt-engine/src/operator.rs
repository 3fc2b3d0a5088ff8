//! Operator stop triggers: a line on stdin or Ctrl-C.

use pt_optimizer::StopHandle;
use std::io::BufRead;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Request a stop on the first non-blank line read from `reader`.
///
/// Runs on a plain thread because stdin reads block. The thread exits after
/// the stop request or at end of input.
pub fn watch_lines<R>(reader: R, stop: StopHandle) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("stop-watcher".into())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(_) => {
                        info!("stop requested from input, finishing current phase");
                        stop.request();
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "stop watcher could not read input");
                        return;
                    }
                }
            }
        })
}

pub fn watch_stdin(stop: StopHandle) -> std::io::Result<JoinHandle<()>> {
    watch_lines(std::io::BufReader::new(std::io::stdin()), stop)
}

/// Request a stop on Ctrl-C. Must be called inside a tokio runtime.
pub fn watch_ctrl_c(stop: StopHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, finishing current phase");
                stop.request();
            }
            Err(e) => warn!(error = %e, "could not listen for Ctrl-C"),
        }
    })
}
