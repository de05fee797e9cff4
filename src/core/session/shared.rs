use crate::core::clock::Clock;
use crate::core::connect::{connect, ConnectOptions};
use crate::core::link::LinkOpener;
use crate::core::protocol::Reply;
use crate::core::session::session::Session;
use crate::core::session::state::{SessionState, SessionStatistics};
use crate::domain::error::{FluidComError, FluidComResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Async handle to a [`Session`] that several tasks may hold.
///
/// The session itself is blocking; every call runs it on the blocking pool
/// while holding the lock, so exchanges never interleave on the wire.
#[derive(Clone, Debug)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Probe for the device on the blocking pool and wrap the session.
    pub async fn connect<O>(
        mut opener: O,
        clock: Arc<dyn Clock>,
        options: ConnectOptions,
    ) -> FluidComResult<Self>
    where
        O: LinkOpener + Send + 'static,
    {
        let session = tokio::task::spawn_blocking(move || connect(&mut opener, clock, &options))
            .await
            .map_err(|e| FluidComError::Session {
                message: format!("Connect task failed: {}", e),
            })??;
        Ok(Self::new(session))
    }

    /// Run `f` against the session on the blocking pool.
    pub async fn run<F, T>(&self, f: F) -> FluidComResult<T>
    where
        F: FnOnce(&mut Session) -> FluidComResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut session = inner.blocking_lock();
            f(&mut session)
        })
        .await
        .map_err(|e| FluidComError::Session {
            message: format!("Session task failed: {}", e),
        })?
    }

    pub async fn send_common(
        &self,
        command: u8,
        param: u16,
        wait: bool,
        force: bool,
    ) -> FluidComResult<Option<Reply>> {
        self.run(move |s| s.send_common(command, param, wait, force))
            .await
    }

    pub async fn send_factory(
        &self,
        command: u8,
        param: u32,
        wait: bool,
        force: bool,
    ) -> FluidComResult<Option<Reply>> {
        self.run(move |s| s.send_factory(command, param, wait, force))
            .await
    }

    pub async fn is_busy(&self) -> FluidComResult<bool> {
        self.run(|s| s.is_busy()).await
    }

    pub async fn wait_for_reply(&self, force: bool) -> FluidComResult<Reply> {
        self.run(move |s| s.wait_for_reply(force)).await
    }

    pub async fn cancel(&self, halt_command: u8) -> FluidComResult<Reply> {
        self.run(move |s| s.cancel(halt_command)).await
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state()
    }

    pub async fn statistics(&self) -> SessionStatistics {
        self.inner.lock().await.statistics().clone()
    }

    /// Unwrap the session if this is the last handle.
    pub fn try_into_inner(self) -> Result<Session, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
