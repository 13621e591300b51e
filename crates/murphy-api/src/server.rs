use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use axum::Router;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use murphy_core::{CoreError, RunState, StatusServer, TrackingEndpoint, local_hostname};

use crate::{adapter::RunStateAdapter, http::HttpApi};

#[derive(Debug, Clone)]
pub struct HttpStatusConfig {
    pub bind_host: String,
    /// `0` picks a free port.
    pub port: u16,
    pub prefix: String,
    /// Host put into the tracking URL; defaults to the machine hostname.
    pub advertised_host: Option<String>,
}

impl Default for HttpStatusConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 4444,
            prefix: "/murphy".to_string(),
            advertised_host: None,
        }
    }
}

#[derive(Default)]
struct Running {
    extra: Option<Router>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

/// Serves the status API over HTTP until stopped.
pub struct HttpStatusServer {
    cfg: HttpStatusConfig,
    shutdown: CancellationToken,
    running: Mutex<Running>,
}

impl HttpStatusServer {
    pub fn new(cfg: HttpStatusConfig) -> Self {
        Self {
            cfg,
            shutdown: CancellationToken::new(),
            running: Mutex::new(Running::default()),
        }
    }

    /// Merge additional routes (e.g. `/metrics`) into the served router.
    pub fn with_routes(self, routes: Router) -> Self {
        {
            let mut running = self.lock();
            running.extra = Some(match running.extra.take() {
                Some(existing) => existing.merge(routes),
                None => routes,
            });
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, Running> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().local_addr
    }
}

#[async_trait]
impl StatusServer for HttpStatusServer {
    async fn start(&self, state: RunState) -> Result<TrackingEndpoint, CoreError> {
        let addr = format!("{}:{}", self.cfg.bind_host, self.cfg.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| CoreError::Status(format!("bind {addr}: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| CoreError::Status(e.to_string()))?;

        let mut router =
            HttpApi::new(Arc::new(RunStateAdapter::new(state)), self.cfg.prefix.clone()).router();
        let mut running = self.lock();
        if let Some(extra) = running.extra.take() {
            router = router.merge(extra);
        }

        let shutdown = self.shutdown.clone();
        running.local_addr = Some(local);
        running.task = Some(tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(err) = serve.await {
                warn!(error = %err, "status server stopped with error");
            }
        }));

        let host = self
            .cfg
            .advertised_host
            .clone()
            .unwrap_or_else(local_hostname);
        let tracking_url = format!(
            "http://{host}:{}{}/index",
            local.port(),
            self.cfg.prefix.trim_end_matches('/')
        );
        info!(%local, %tracking_url, "status server listening");

        Ok(TrackingEndpoint {
            host,
            port: local.port(),
            tracking_url,
        })
    }

    async fn stop(&self) {
        self.shutdown.cancel();
        let task = self.lock().task.take();
        if let Some(task) = task
            && let Err(err) = task.await
        {
            warn!(error = %err, "status server task ended abnormally");
        }
    }
}
