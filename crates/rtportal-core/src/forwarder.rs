//! Request forwarding to RealtimeKit.
//!
//! Each caller invocation becomes a [`PendingRequest`] that lives exactly as
//! long as its downstream call. Completion consumes the request, so a caller
//! is answered once; a request dropped unanswered (its future cancelled when
//! the transport goes away) is counted as abandoned.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::config::HighPriorityRouting;
use crate::error::{RealtimeError, Result};
use crate::metrics::{ForwarderMetrics, Outcome};
use crate::realtimekit::RealtimeKit;
use crate::translate::PidTranslator;
use crate::types::{AppInfo, Caller, Priority, RequestId};

/// What a pending request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Scheduling change for a thread.
    Thread {
        /// Process id as the caller sees it.
        process: u64,
        /// Thread id.
        thread: u64,
        /// Requested priority.
        priority: Priority,
    },
    /// Property read.
    Property(String),
}

/// One in-flight caller invocation.
#[derive(Debug)]
pub struct PendingRequest {
    id: RequestId,
    sender: String,
    kind: RequestKind,
    host_process: Option<u64>,
    started: Instant,
    metrics: ForwarderMetrics,
    completed: bool,
}

impl PendingRequest {
    fn new(sender: &str, kind: RequestKind, metrics: ForwarderMetrics) -> Self {
        metrics.record_request();
        Self {
            id: RequestId::new(),
            sender: sender.to_owned(),
            kind,
            host_process: None,
            started: Instant::now(),
            metrics,
            completed: false,
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Answers the caller with `result`.
    pub fn complete<T>(mut self, result: Result<T>) -> Result<T> {
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(RealtimeError::PidMapping(_)) => Outcome::MappingFailed,
            Err(RealtimeError::InvalidResponse { .. }) => Outcome::InvalidResponse,
            Err(_) => Outcome::DownstreamFailed,
        };
        let elapsed = self.started.elapsed();
        self.metrics.record_outcome(outcome, elapsed);
        self.completed = true;

        match &result {
            Ok(_) => tracing::debug!(
                id = %self.id,
                sender = %self.sender,
                kind = ?self.kind,
                host_process = ?self.host_process,
                ?elapsed,
                "request completed"
            ),
            Err(e) => tracing::debug!(
                id = %self.id,
                sender = %self.sender,
                kind = ?self.kind,
                host_process = ?self.host_process,
                ?elapsed,
                error = %e,
                "request failed"
            ),
        }
        result
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if !self.completed {
            self.metrics
                .record_outcome(Outcome::Abandoned, self.started.elapsed());
            tracing::debug!(
                id = %self.id,
                sender = %self.sender,
                kind = ?self.kind,
                "request abandoned"
            );
        }
    }
}

/// Translates and forwards realtime requests.
///
/// Owned by the composition root and shared by `Arc`; holds the single
/// RealtimeKit handle for the process lifetime.
pub struct RealtimeForwarder {
    rtkit: Arc<dyn RealtimeKit>,
    translator: PidTranslator,
    routing: HighPriorityRouting,
    metrics: ForwarderMetrics,
}

impl RealtimeForwarder {
    /// Creates a forwarder.
    #[must_use]
    pub fn new(
        rtkit: Arc<dyn RealtimeKit>,
        translator: PidTranslator,
        routing: HighPriorityRouting,
    ) -> Self {
        if routing == HighPriorityRouting::Legacy {
            tracing::warn!(
                "high-priority requests will be sent as MakeThreadRealtimeWithPID \
                 with the nice level reinterpreted as unsigned"
            );
        }
        Self {
            rtkit,
            translator,
            routing,
            metrics: ForwarderMetrics::new(),
        }
    }

    /// Returns the high-priority routing in effect.
    #[must_use]
    pub const fn routing(&self) -> HighPriorityRouting {
        self.routing
    }

    /// Returns the request metrics.
    #[must_use]
    pub const fn metrics(&self) -> &ForwarderMetrics {
        &self.metrics
    }

    /// `MakeThreadRealtimeWithPID`: grant real-time scheduling to a thread.
    ///
    /// # Errors
    /// Returns a mapping error without contacting RealtimeKit if the pid
    /// cannot be translated, otherwise RealtimeKit's own error.
    pub async fn make_thread_realtime(
        &self,
        caller: &Caller,
        process: u64,
        thread: u64,
        priority: u32,
    ) -> Result<()> {
        self.thread_request(caller, process, thread, Priority::Realtime(priority))
            .await
    }

    /// `MakeThreadHighPriorityWithPID`: move a thread to a high-priority nice level.
    ///
    /// # Errors
    /// Same as [`Self::make_thread_realtime`].
    pub async fn make_thread_high_priority(
        &self,
        caller: &Caller,
        process: u64,
        thread: u64,
        priority: i32,
    ) -> Result<()> {
        self.thread_request(caller, process, thread, Priority::HighPriority(priority))
            .await
    }

    /// `GetProperty`: read an integer property of RealtimeKit.
    ///
    /// Needs no pid translation, so only the sender is recorded.
    ///
    /// # Errors
    /// Returns RealtimeKit's error verbatim, or
    /// [`RealtimeError::InvalidResponse`] if the value is neither `x` nor `i`.
    pub async fn get_property(&self, sender: &str, name: &str) -> Result<i64> {
        let request = PendingRequest::new(
            sender,
            RequestKind::Property(name.to_owned()),
            self.metrics.clone(),
        );
        let span = tracing::debug_span!(
            "get_property",
            id = %request.id(),
            sender,
            property = name,
        );

        let result = async {
            let value = self.rtkit.get_property(name).await?;
            value.as_i64().ok_or_else(|| {
                tracing::warn!(
                    property = name,
                    signature = value.signature(),
                    "Realtime error getting property: invalid response type"
                );
                RealtimeError::invalid_response(value.signature())
            })
        }
        .instrument(span)
        .await;

        request.complete(result)
    }

    async fn thread_request(
        &self,
        caller: &Caller,
        process: u64,
        thread: u64,
        priority: Priority,
    ) -> Result<()> {
        let mut request = PendingRequest::new(
            &caller.sender,
            RequestKind::Thread {
                process,
                thread,
                priority,
            },
            self.metrics.clone(),
        );
        let span = tracing::debug_span!(
            "thread_request",
            id = %request.id(),
            sender = %caller.sender,
            app = %caller.app,
            process,
            thread,
            %priority,
        );

        let result = self
            .forward_thread(&mut request, &caller.app, process, thread, priority)
            .instrument(span)
            .await;

        request.complete(result)
    }

    async fn forward_thread(
        &self,
        request: &mut PendingRequest,
        app: &AppInfo,
        process: u64,
        thread: u64,
        priority: Priority,
    ) -> Result<()> {
        // Never forward an untranslated sandbox pid
        let host_pid = self.translator.translate(app, process).await?;
        request.host_process = Some(host_pid);

        match (priority, self.routing) {
            (Priority::Realtime(p), _) => {
                self.rtkit
                    .make_thread_realtime_with_pid(host_pid, thread, p)
                    .await?;
            }
            (Priority::HighPriority(n), HighPriorityRouting::Native) => {
                self.rtkit
                    .make_thread_high_priority_with_pid(host_pid, thread, n)
                    .await?;
            }
            (Priority::HighPriority(n), HighPriorityRouting::Legacy) => {
                self.rtkit
                    .make_thread_realtime_with_pid(host_pid, thread, n as u32)
                    .await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RealtimeForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeForwarder")
            .field("routing", &self.routing)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
