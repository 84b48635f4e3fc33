//! Broadcast shutdown signal.

use tokio::sync::broadcast::{self, error::RecvError};

/// Fires once the sender broadcasts. A closed channel never fires.
#[derive(Debug)]
pub struct Shutdown {
    rx: Option<broadcast::Receiver<()>>,
    fired: bool,
}

impl Shutdown {
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self {
            rx: Some(rx),
            fired: false,
        }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            rx: None,
            fired: false,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.fired
    }

    /// Resolves when shutdown is requested. Cancel-safe.
    pub async fn triggered(&mut self) {
        if self.fired {
            return;
        }
        if let Some(rx) = &mut self.rx {
            match rx.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    self.fired = true;
                    return;
                }
                Err(RecvError::Closed) => self.rx = None,
            }
        }
        std::future::pending::<()>().await
    }
}
