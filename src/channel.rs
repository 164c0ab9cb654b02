use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{RegistryError, Result};

/// Outgoing half of the connection to the coordinating service.
///
/// Implementations receive already serialized JSON text frames. Framing,
/// reconnection and encryption belong to the implementation.
pub trait MessageChannel: Send + Sync {
    fn send(&self, text: String) -> Result<()>;
}

/// Hands frames over to a socket task through an unbounded queue.
#[derive(Clone, Debug)]
pub struct MpscChannel {
    tx: UnboundedSender<String>,
}

impl MpscChannel {
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageChannel for MpscChannel {
    fn send(&self, text: String) -> Result<()> {
        self.tx
            .send(text)
            .map_err(|_| RegistryError::Channel("receiver is closed".to_owned()))
    }
}
