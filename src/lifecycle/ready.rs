//! Ready signal to a supervising process.
//!
//! # Responsibilities
//! - Tell the parent the listener is bound, exactly once
//!
//! # Design Decisions
//! - `notify` consumes the notifier, so a second signal cannot be sent
//! - In-process supervisors (tests) receive the bound address over a channel

use std::io::Write;
use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::config::SupervisorMode;

/// Environment variable marking a supervised process in `auto` mode.
pub const SUPERVISED_ENV: &str = "SOYA_SUPERVISED";

/// Line written to stdout once listening.
pub const READY_MESSAGE: &str = "ready";

#[derive(Debug)]
pub enum ReadyNotifier {
    None,
    Stdout,
    Channel(oneshot::Sender<SocketAddr>),
}

impl ReadyNotifier {
    pub fn from_mode(mode: SupervisorMode) -> Self {
        match mode {
            SupervisorMode::None => Self::None,
            SupervisorMode::Stdout => Self::Stdout,
            SupervisorMode::Auto if std::env::var_os(SUPERVISED_ENV).is_some() => Self::Stdout,
            SupervisorMode::Auto => Self::None,
        }
    }

    /// A notifier whose signal carries the bound address.
    pub fn channel() -> (Self, oneshot::Receiver<SocketAddr>) {
        let (tx, rx) = oneshot::channel();
        (Self::Channel(tx), rx)
    }

    pub fn notify(self, addr: SocketAddr) {
        match self {
            Self::None => {}
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", READY_MESSAGE).and_then(|_| stdout.flush()) {
                    tracing::warn!(error = %e, "Failed to send ready signal");
                }
            }
            Self::Channel(tx) => {
                if tx.send(addr).is_err() {
                    tracing::debug!("Ready receiver dropped");
                }
            }
        }
        tracing::debug!(address = %addr, "Ready");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_receives_address() {
        let (notifier, rx) = ReadyNotifier::channel();
        let addr: SocketAddr = "127.0.0.1:4321".parse().unwrap();
        notifier.notify(addr);
        assert_eq!(rx.await.unwrap(), addr);
    }

    #[test]
    fn test_explicit_modes() {
        assert!(matches!(ReadyNotifier::from_mode(SupervisorMode::None), ReadyNotifier::None));
        assert!(matches!(ReadyNotifier::from_mode(SupervisorMode::Stdout), ReadyNotifier::Stdout));
    }
}
