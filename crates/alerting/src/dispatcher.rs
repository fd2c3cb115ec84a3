//! Alarm dispatcher

use dms::AlarmEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::sinks::AlarmSink;
use crate::AlertError;

/// Fans a raised alarm out to its sinks, one background task per sink
pub struct AlarmDispatcher {
    sinks: Vec<Arc<dyn AlarmSink>>,
    runtime: Handle,
}

impl AlarmDispatcher {
    /// Create a dispatcher spawning onto `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            sinks: Vec::new(),
            runtime,
        }
    }

    /// Create a dispatcher on the runtime of the calling context
    pub fn from_current() -> Result<Self, AlertError> {
        let runtime = Handle::try_current().map_err(|e| AlertError::NoRuntime(e.to_string()))?;
        Ok(Self::new(runtime))
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: impl AlarmSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Start every sink for `event` and return immediately.
    ///
    /// Sinks run independently and in no particular order. Failures are
    /// logged, never returned to the caller.
    pub fn dispatch(&self, event: AlarmEvent) -> DispatchHandle {
        info!("Dispatching alarm to {} sinks", self.sinks.len());

        let tasks = self
            .sinks
            .iter()
            .map(|sink| {
                let sink = Arc::clone(sink);
                let name = sink.name();
                let task = self.runtime.spawn(async move {
                    match sink.handle(&event).await {
                        Ok(()) => debug!("Alarm sink {} done", sink.name()),
                        Err(e) => error!("Alarm sink {} failed: {}", sink.name(), e),
                    }
                });
                (name, task)
            })
            .collect();

        DispatchHandle { tasks }
    }
}

/// Outstanding sink tasks of one dispatched alarm.
///
/// Dropping the handle detaches the tasks.
pub struct DispatchHandle {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl DispatchHandle {
    /// Whether every sink task has finished
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|(_, task)| task.is_finished())
    }

    /// Abort outstanding sink tasks (stops a playing alarm)
    pub fn cancel(&self) {
        for (name, task) in &self.tasks {
            if !task.is_finished() {
                debug!("Cancelling alarm sink {}", name);
                task.abort();
            }
        }
    }

    /// Wait for every sink task. Cancelled tasks count as finished.
    pub async fn join(self) -> Result<(), AlertError> {
        for (name, task) in self.tasks {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => debug!("Alarm sink {} was cancelled", name),
                Err(e) => return Err(AlertError::Join(format!("{}: {}", name, e))),
            }
        }
        Ok(())
    }

    /// Wait up to `grace` for the sink tasks, then abort the stragglers
    pub async fn cancel_after(mut self, grace: Duration) {
        let deadline = Instant::now() + grace;

        for (name, task) in &mut self.tasks {
            match tokio::time::timeout_at(deadline, &mut *task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => error!("Alarm sink {} task failed: {}", name, e),
                Err(_) => {
                    warn!("Alarm sink {} still running after {:?}, cancelling", name, grace);
                    task.abort();
                }
            }
        }
    }
}
