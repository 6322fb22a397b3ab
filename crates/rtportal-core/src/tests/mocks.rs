//! Mock implementations for testing.
//!
//! Provides a scriptable RealtimeKit and pid mapper that record every call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::error::{DownstreamError, MappingError};
use crate::realtimekit::{DownstreamResult, RealtimeKit};
use crate::translate::PidMapper;
use crate::types::{AppInfo, PropertyValue};

/// A call RealtimeKit received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtkitCall {
    /// `MakeThreadRealtimeWithPID`
    Realtime {
        /// Host pid.
        process: u64,
        /// Thread id.
        thread: u64,
        /// Priority.
        priority: u32,
    },
    /// `MakeThreadHighPriorityWithPID`
    HighPriority {
        /// Host pid.
        process: u64,
        /// Thread id.
        thread: u64,
        /// Nice level.
        priority: i32,
    },
    /// `Properties.Get`
    GetProperty(String),
}

/// Mock RealtimeKit for testing.
///
/// Succeeds by default; configurable to fail calls or return arbitrary
/// property encodings.
pub struct MockRealtimeKit {
    calls: parking_lot::Mutex<Vec<RtkitCall>>,
    error: parking_lot::RwLock<Option<DownstreamError>>,
    properties: parking_lot::RwLock<HashMap<String, PropertyValue>>,
}

impl MockRealtimeKit {
    /// Creates a mock that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            error: parking_lot::RwLock::new(None),
            properties: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    /// Configures every call to fail with the given D-Bus error.
    #[must_use]
    pub fn fail_with(self, name: &str, message: &str) -> Self {
        *self.error.write() = Some(DownstreamError::new(name, Some(message.to_string())));
        self
    }

    /// Configures a property value.
    #[must_use]
    pub fn property(self, name: &str, value: PropertyValue) -> Self {
        self.properties.write().insert(name.to_string(), value);
        self
    }

    /// Returns all calls received so far.
    pub fn calls(&self) -> Vec<RtkitCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: RtkitCall) -> DownstreamResult<()> {
        self.calls.lock().push(call);
        match self.error.read().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RealtimeKit for MockRealtimeKit {
    async fn make_thread_realtime_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: u32,
    ) -> DownstreamResult<()> {
        self.record(RtkitCall::Realtime {
            process,
            thread,
            priority,
        })
    }

    async fn make_thread_high_priority_with_pid(
        &self,
        process: u64,
        thread: u64,
        priority: i32,
    ) -> DownstreamResult<()> {
        self.record(RtkitCall::HighPriority {
            process,
            thread,
            priority,
        })
    }

    async fn get_property(&self, name: &str) -> DownstreamResult<PropertyValue> {
        self.record(RtkitCall::GetProperty(name.to_string()))?;
        self.properties.read().get(name).cloned().ok_or_else(|| {
            DownstreamError::new(
                "org.freedesktop.DBus.Error.InvalidArgs",
                Some(format!("No such property '{name}'")),
            )
        })
    }
}

/// Mock pid mapper with a fixed sandbox-to-host table.
pub struct MockPidMapper {
    table: HashMap<u64, u64>,
    calls: AtomicU32,
}

impl MockPidMapper {
    /// Creates a mapper that knows no pids.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            calls: AtomicU32::new(0),
        }
    }

    /// Adds a sandbox pid to host pid mapping.
    #[must_use]
    pub fn map(mut self, sandbox_pid: u64, host_pid: u64) -> Self {
        self.table.insert(sandbox_pid, host_pid);
        self
    }

    /// Returns how often the mapper was consulted.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PidMapper for MockPidMapper {
    async fn map_pid(&self, _app: &AppInfo, pid: u64) -> Result<u64, MappingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(&pid)
            .copied()
            .ok_or(MappingError::NotFound(pid))
    }
}
