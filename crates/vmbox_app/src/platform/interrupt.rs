use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use vmbox_logging::vmbox_info;

/// Latches Ctrl-C presses until the wait loop picks them up.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    pressed: Arc<AtomicBool>,
}

impl Interrupt {
    /// Starts listening for Ctrl-C on a background thread. Once installed,
    /// Ctrl-C no longer terminates the process.
    pub fn install() -> anyhow::Result<Self> {
        let interrupt = Self::default();
        let pressed = interrupt.pressed.clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        thread::Builder::new()
            .name("vmbox-signal".to_string())
            .spawn(move || {
                runtime.block_on(async {
                    while tokio::signal::ctrl_c().await.is_ok() {
                        vmbox_info!("Interrupt received");
                        pressed.store(true, Ordering::SeqCst);
                    }
                })
            })?;
        Ok(interrupt)
    }

    #[cfg(test)]
    pub fn trigger(&self) {
        self.pressed.store(true, Ordering::SeqCst);
    }

    /// Returns whether Ctrl-C was pressed since the last call.
    pub fn take(&self) -> bool {
        self.pressed.swap(false, Ordering::SeqCst)
    }
}
