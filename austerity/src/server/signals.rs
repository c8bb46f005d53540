//! Signal control (spec §4.8): SIGINT triggers a rebind cycle, SIGTERM
//! an orderly shutdown, SIGPIPE is ignored globally.

use std::sync::mpsc;
use std::sync::Mutex;

use crate::error::ServerError;

/// What the main control loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Rebind,
    Shutdown,
}

/// The main loop's one-shot-per-signal mailbox: `install` pushes onto
/// it from a dedicated signal-watching thread, `run` drains it.
pub struct ShutdownSignal {
    sender: mpsc::Sender<Signal>,
    receiver: Mutex<mpsc::Receiver<Signal>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver: Mutex::new(receiver) }
    }
}

impl ShutdownSignal {
    pub fn wait_for_signal(&self) -> Signal {
        self.receiver.lock().unwrap().recv().unwrap_or(Signal::Shutdown)
    }
}

#[cfg(unix)]
pub fn install(shutdown: std::sync::Arc<ShutdownSignal>) -> Result<(), ServerError> {
    use signal_hook::consts::{SIGINT, SIGPIPE, SIGTERM};
    use signal_hook::iterator::Signals;
    use signal_hook::low_level;
    use std::thread;

    unsafe { low_level::register(SIGPIPE, || {}) }?;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        for sig in signals.forever() {
            let event = match sig {
                SIGINT => Signal::Rebind,
                SIGTERM => Signal::Shutdown,
                _ => continue,
            };
            let shutting_down = event == Signal::Shutdown;
            if shutdown.sender.send(event).is_err() || shutting_down {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn install(_shutdown: std::sync::Arc<ShutdownSignal>) -> Result<(), ServerError> {
    Ok(())
}
