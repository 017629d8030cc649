//! Typed request/response between collaborators and a page
//!
//! Design decisions:
//! 1. One `mpsc` queue per page; the page drains it serially, so commands
//!    and input never interleave inside a handler
//! 2. Every request carries its own `oneshot` reply slot
//! 3. Fail fast - a gone page or a slow one is an error, never a hang

use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::page::{DispatchOutcome, InputEvent, PageSession};
use crate::protocol::{Command, Response};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("No listener on the receiving end")]
    NoListener,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Everything a page processes, in arrival order
#[derive(Debug)]
pub enum Inbound {
    Command {
        command: Command,
        reply: oneshot::Sender<Response>,
    },
    Input {
        event: InputEvent,
        reply: oneshot::Sender<DispatchOutcome>,
    },
}

/// Collaborator side of a page channel
#[derive(Debug, Clone)]
pub struct PageHandle {
    tx: mpsc::Sender<Inbound>,
    timeout: Duration,
}

/// Create a page channel; the receiver goes to [`serve`]
pub fn page_channel(buffer: usize, timeout: Duration) -> (PageHandle, mpsc::Receiver<Inbound>) {
    let (tx, rx) = mpsc::channel(buffer);
    (PageHandle { tx, timeout }, rx)
}

impl PageHandle {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a command and wait for the page's reply
    pub async fn request(&self, command: Command) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.round_trip(Inbound::Command { command, reply }, rx).await
    }

    /// Fire a command and ignore delivery failures
    pub async fn send_quiet(&self, command: Command) {
        if let Err(err) = self.request(command).await {
            tracing::debug!(%err, "[PageHandle] Command not delivered");
        }
    }

    /// Feed a user input event to the page
    pub async fn input(&self, event: InputEvent) -> Result<DispatchOutcome> {
        let (reply, rx) = oneshot::channel();
        self.round_trip(Inbound::Input { event, reply }, rx).await
    }

    async fn round_trip<T>(&self, message: Inbound, rx: oneshot::Receiver<T>) -> Result<T> {
        let exchange = async {
            if self.tx.send(message).await.is_err() {
                return Err(ChannelError::NoListener);
            }
            rx.await.map_err(|_| ChannelError::NoListener)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ChannelError::Timeout(self.timeout))?
    }
}

/// Page-side loop: own the session and process messages one at a time.
/// Returns the session once every handle is dropped.
pub async fn serve(mut session: PageSession, mut rx: mpsc::Receiver<Inbound>) -> PageSession {
    while let Some(message) = rx.recv().await {
        match message {
            Inbound::Command { command, reply } => {
                let response = session.handle(command).await;
                let _ = reply.send(response); // requester may have timed out
            }
            Inbound::Input { event, reply } => {
                let outcome = session.dispatch(event).await;
                let _ = reply.send(outcome);
            }
        }
    }
    tracing::debug!(page = %session.page().id, "[PageChannel] Page channel closed");
    session
}
