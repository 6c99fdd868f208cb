//! Delayed switch from the temporary log name to the dated one.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info};

use super::{RotatingLogWriter, Tombstone};

pub const SETTLE_BEGIN_BANNER: &str = "**************BIG BROTHER ABOUT TO SWITCH FROM TEMP RANDOM FILE NAME TO PERMANENT DATETIME FILENAME**************";
pub const SETTLE_END_BANNER: &str = "**************BIG BROTHER FINISHED SWITCHING FROM TEMP RANDOM FILE NAME TO PERMANENT DATETIME FILENAME**************";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Starts a thread that waits `delay`, then renames the product log to its
/// dated name.
///
/// Returns `None` from the thread if `running` was cleared before the delay
/// elapsed. A failed rename is recorded on the tombstone and the writer keeps
/// its temporary file.
pub fn spawn_settle_rename(
    writer: Arc<RotatingLogWriter>,
    tombstone: Arc<Tombstone>,
    delay: Duration,
    running: Arc<AtomicBool>,
) -> io::Result<JoinHandle<Option<PathBuf>>> {
    thread::Builder::new()
        .name("bb-settle".into())
        .spawn(move || {
            let deadline = Instant::now() + delay;
            loop {
                if !running.load(Ordering::SeqCst) {
                    return None;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep(POLL_INTERVAL.min(deadline - now));
            }

            // Banner failures surface again in the rotation below.
            let _ = writer.debug(SETTLE_BEGIN_BANNER);
            match writer.rotate_to_dated() {
                Ok(path) => {
                    let _ = writer.debug(SETTLE_END_BANNER);
                    info!(path = %path.display(), "product log settled");
                    Some(path)
                }
                Err(e) => {
                    error!(error = %e, "product log rename failed");
                    if let Err(te) = tombstone.epitaph(&format!("log rename failed: {}", e)) {
                        error!(error = %te, "cannot write tombstone");
                    }
                    None
                }
            }
        })
}
