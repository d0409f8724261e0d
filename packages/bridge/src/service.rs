//! Service lifecycle and the host-facing facade.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pathbridge_codec::{encode_outcome, Outcome};
use pathbridge_core::{BridgeError, Engine};

use crate::config::{AutoCreatePolicy, BridgeConfig, EngineConfig};
use crate::dispatcher::Dispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

enum EngineSource {
    Configured(EngineConfig),
    Shared(Arc<dyn Engine>),
}

impl EngineSource {
    fn engine(&self) -> Result<Arc<dyn Engine>, BridgeError> {
        match self {
            EngineSource::Configured(config) => config
                .build()
                .map_err(|e| BridgeError::ExecutionError(e.to_string())),
            EngineSource::Shared(engine) => Ok(Arc::clone(engine)),
        }
    }
}

struct Inner {
    state: ServiceState,
    dispatcher: Option<Arc<Dispatcher>>,
}

/// The dispatch service: owns the lifecycle state and, while running, the
/// dispatcher and its registry.
///
/// Every `start` begins with an empty registry. The state lock is only held
/// for transitions, so `execute` calls run concurrently.
pub struct Service {
    source: EngineSource,
    policy: AutoCreatePolicy,
    inner: Mutex<Inner>,
}

impl Service {
    pub fn new(config: BridgeConfig) -> Self {
        Self::from_source(EngineSource::Configured(config.engine), config.auto_create)
    }

    /// A service over an existing engine, kept across restarts.
    pub fn with_engine(engine: Arc<dyn Engine>, policy: AutoCreatePolicy) -> Self {
        Self::from_source(EngineSource::Shared(engine), policy)
    }

    fn from_source(source: EngineSource, policy: AutoCreatePolicy) -> Self {
        Self {
            source,
            policy,
            inner: Mutex::new(Inner {
                state: ServiceState::Stopped,
                dispatcher: None,
            }),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.inner.lock().state
    }

    /// Number of live handles; zero unless running.
    pub fn open_handles(&self) -> usize {
        self.inner
            .lock()
            .dispatcher
            .as_ref()
            .map_or(0, |dispatcher| dispatcher.registry().len())
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                ServiceState::Running => return Ok(()),
                ServiceState::Starting | ServiceState::Stopping => {
                    return Err(BridgeError::ServiceBusy)
                }
                ServiceState::Stopped => inner.state = ServiceState::Starting,
            }
        }

        let engine = self.source.engine();
        let mut inner = self.inner.lock();
        match engine {
            Ok(engine) => {
                inner.dispatcher = Some(Arc::new(Dispatcher::new(engine, self.policy)));
                inner.state = ServiceState::Running;
                tracing::info!("service started");
                Ok(())
            }
            Err(error) => {
                inner.state = ServiceState::Stopped;
                tracing::warn!(%error, "service failed to start");
                Err(error)
            }
        }
    }

    /// Stop the service, closing every live handle.
    ///
    /// Calls still in flight finish with `ResourceClosed` or
    /// `ServiceUnavailable`.
    pub fn stop(&self) -> Result<(), BridgeError> {
        let dispatcher = {
            let mut inner = self.inner.lock();
            match inner.state {
                ServiceState::Stopped => return Ok(()),
                ServiceState::Starting | ServiceState::Stopping => {
                    return Err(BridgeError::ServiceBusy)
                }
                ServiceState::Running => {
                    inner.state = ServiceState::Stopping;
                    inner.dispatcher.take()
                }
            }
        };

        let closed = dispatcher.map_or(0, |dispatcher| dispatcher.registry().close_all());
        self.inner.lock().state = ServiceState::Stopped;
        tracing::info!(closed, "service stopped");
        Ok(())
    }

    pub fn dispatch(&self, path: &str, command: &str) -> Outcome {
        let dispatcher = {
            let inner = self.inner.lock();
            match inner.state {
                ServiceState::Stopped => return Err(BridgeError::ServiceNotStarted),
                ServiceState::Starting | ServiceState::Stopping => {
                    return Err(BridgeError::ServiceUnavailable)
                }
                ServiceState::Running => inner
                    .dispatcher
                    .clone()
                    .ok_or(BridgeError::ServiceUnavailable)?,
            }
        };
        dispatcher.dispatch(path, command)
    }

    pub fn execute(&self, path: &str, command: &str) -> String {
        encode_outcome(&self.dispatch(path, command))
    }
}

/// The host-facing bridge. Cheap to clone; clones share one service.
///
/// # Example
///
/// ```rust
/// use pathbridge::{Bridge, BridgeConfig};
///
/// let bridge = Bridge::new(BridgeConfig::default());
/// assert_eq!(bridge.execute("db/users", "read:name"), "!err:ServiceNotStarted");
///
/// bridge.start().unwrap();
/// assert_eq!(bridge.execute("db/users", "write:name=alice"), "ok");
/// assert_eq!(bridge.execute("db/users", "read:name"), "alice");
/// ```
#[derive(Clone)]
pub struct Bridge {
    service: Arc<Service>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            service: Arc::new(Service::new(config)),
        }
    }

    pub fn with_engine(engine: Arc<dyn Engine>, policy: AutoCreatePolicy) -> Self {
        Self {
            service: Arc::new(Service::with_engine(engine, policy)),
        }
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        self.service.start()
    }

    pub fn stop(&self) -> Result<(), BridgeError> {
        self.service.stop()
    }

    /// Execute `command` against the resource at `path`.
    ///
    /// Always returns an encoded result string; errors are prefixed `!err:`.
    pub fn execute(&self, path: &str, command: &str) -> String {
        self.service.execute(path, command)
    }

    pub fn service(&self) -> &Service {
        &self.service
    }
}
