// src/poll/poller.rs

//! Completion polling against the control plane.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::client::{Credential, Transport};
use crate::errors::{RelayError, Result};
use crate::graph::{RemoteId, TaskStatus};
use crate::poll::filter::PollFilter;

/// Attempts per poll round before a transport failure is escalated.
const MAX_POLL_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Pause between poll rounds.
    pub interval: Duration,
    /// Overall deadline for the wait.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Watches submitted tasks until every one reaches a terminal status.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller {
    options: PollOptions,
}

impl Poller {
    pub fn new(options: PollOptions) -> Self {
        Self { options }
    }

    /// Wait until every given remote id is terminal or the timeout elapses.
    ///
    /// The first query is issued immediately, so already-terminal inputs
    /// return without a single interval wait. On timeout the error carries
    /// the last-known status map. Waiting is abandoned on timeout; the remote
    /// tasks themselves are never cancelled.
    pub async fn wait_for<T>(
        &self,
        remote_ids: &[RemoteId],
        transport: &T,
        credential: &Credential,
    ) -> Result<BTreeMap<RemoteId, TaskStatus>>
    where
        T: Transport + ?Sized,
    {
        // Ids the server has not reported on yet show up as `pending`.
        let mut statuses: BTreeMap<RemoteId, TaskStatus> = remote_ids
            .iter()
            .map(|id| (id.clone(), TaskStatus::Pending))
            .collect();

        if statuses.is_empty() {
            return Ok(statuses);
        }

        let filter = PollFilter::for_ids(remote_ids.iter().cloned());
        let deadline = Instant::now() + self.options.timeout;

        loop {
            let records = poll_round(transport, credential, &filter).await?;
            for record in records {
                if let Some(entry) = statuses.get_mut(&record.id) {
                    *entry = record.status;
                }
            }

            let remaining = statuses
                .values()
                .filter(|status| !status.is_terminal())
                .count();
            debug!(remaining, total = statuses.len(), "poll round applied");

            if remaining == 0 {
                return Ok(statuses);
            }

            if Instant::now() >= deadline {
                warn!(remaining, "poll deadline elapsed with non-terminal tasks");
                return Err(RelayError::Timeout { statuses });
            }

            sleep(self.options.interval).await;
        }
    }
}

/// Issue one list-tasks query, retrying transient transport failures up to
/// [`MAX_POLL_ATTEMPTS`] times with linear backoff. Auth rejections and
/// other errors escalate immediately.
pub(crate) async fn poll_round<T>(
    transport: &T,
    credential: &Credential,
    filter: &PollFilter,
) -> Result<Vec<crate::client::TaskRecord>>
where
    T: Transport + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match transport
            .list_tasks(credential.clone(), filter.clone())
            .await
        {
            Ok(records) => return Ok(records),
            Err(RelayError::Transport(message)) if attempt < MAX_POLL_ATTEMPTS => {
                let backoff = Duration::from_millis(100 * u64::from(attempt));
                warn!(
                    attempt,
                    error = %message,
                    backoff_ms = backoff.as_millis() as u64,
                    "transient transport failure during poll; retrying"
                );
                sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
