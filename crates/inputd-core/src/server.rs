//! Loopback listener and the process-wide server state.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::capability::CapabilityResolver;
use crate::connection;
use crate::inject::InputInjector;

/// State shared by the accept loop and every worker: the configured secret,
/// the injector over the singleton capability, and the advisory running
/// flag. Constructed once before the listener binds.
pub struct ServerContext {
    token: Vec<u8>,
    injector: InputInjector,
    /// Advisory only: clearing it stops future accepts, it is not a
    /// correctness boundary and in-flight workers are never drained.
    running: AtomicBool,
    shutdown: Notify,
}

impl ServerContext {
    pub fn new(token: Vec<u8>, resolver: Arc<CapabilityResolver>) -> Arc<Self> {
        Arc::new(Self {
            token,
            injector: InputInjector::new(resolver),
            running: AtomicBool::new(true),
            shutdown: Notify::new(),
        })
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }

    pub fn injector(&self) -> &InputInjector {
        &self.injector
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop accepting new connections. Workers already running are left to
    /// finish or be dropped at process exit.
    pub fn begin_shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.shutdown.notify_one();
    }
}

/// The loopback-only accept loop. Binds 127.0.0.1 exclusively; any other
/// interface is unreachable by construction.
pub struct Listener {
    inner: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Listener {
    pub async fn bind(port: u16, ctx: Arc<ServerContext>) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let inner = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("listening on {}", inner.local_addr()?);
        Ok(Self { inner, ctx })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Accept until shutdown is requested. Every accepted connection runs
    /// its full handler pipeline on its own task, unbounded and unpooled,
    /// so one slow or hostile client cannot stall new accepts.
    pub async fn serve(self) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.inner.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("client connected from {}", peer);
                            let ctx = self.ctx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = connection::handle_client(stream, ctx).await {
                                    warn!("client handler error: {:#}", e);
                                }
                            });
                        }
                        Err(e) => {
                            if self.ctx.is_running() {
                                error!("accept failed: {}", e);
                            }
                        }
                    }
                }
                _ = self.ctx.shutdown.notified() => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }
}
