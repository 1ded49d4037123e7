//! Background keep-alive for an authorized session.
//!
//! The platform expires idle sessions. A [`KeepAlive`] task touches the
//! session on a fixed interval until it is cancelled; each session owns
//! its own task, so concurrent sessions never share a timer.

use std::time::Duration;

use ctms_domain::error::Result;
use ctms_domain::trace::TraceEvent;
use reqwest::Method;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::transport::{HalClient, JSON};

/// Which endpoint keeps the session alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveTarget {
    /// Cookie sessions: `GET /api/middleware/service/ping`.
    Ping,
    /// Token sessions: `POST /auth/tokens/current/extension`.
    TokenExtension,
}

impl KeepAliveTarget {
    pub fn path(self) -> &'static str {
        match self {
            KeepAliveTarget::Ping => "/api/middleware/service/ping",
            KeepAliveTarget::TokenExtension => "/auth/tokens/current/extension",
        }
    }

    fn method(self) -> Method {
        match self {
            KeepAliveTarget::Ping => Method::GET,
            KeepAliveTarget::TokenExtension => Method::POST,
        }
    }
}

/// Issue a single keep-alive call. The response body is ignored.
pub async fn touch(client: &HalClient, target: KeepAliveTarget) -> Result<()> {
    let url = client.url(target.path());
    client
        .send_checked(target.method(), &url, JSON, |rb| rb)
        .await?;
    Ok(())
}

/// Handle to a running keep-alive task.
#[derive(Debug)]
pub struct KeepAlive {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Spawn the task. The first call happens one `interval` after start.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(client: HalClient, target: KeepAliveTarget, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let outcome = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    res = touch(&client, target) => res,
                };

                // Failures never end the loop; the next tick tries again.
                if let Err(ref e) = outcome {
                    tracing::debug!(endpoint = target.path(), error = %e, "keep-alive failed");
                }
                TraceEvent::SessionKeepAlive {
                    endpoint: target.path().to_owned(),
                    ok: outcome.is_ok(),
                }
                .emit();
            }
            tracing::debug!(endpoint = target.path(), "keep-alive stopped");
        });

        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }

    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the task and wait until it has exited.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "keep-alive task ended abnormally");
        }
    }
}
