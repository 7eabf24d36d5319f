use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use std::{future::Future, io, net::SocketAddr, sync::Arc};

use futures_util::{SinkExt, StreamExt};
use http::header::{CONNECTION, USER_AGENT};
use http::HeaderValue;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::codec::Decoder;

use crate::http::codec::ConnectionCodec;
use crate::http::{Request, Response};

type Handler<A, F> = fn(Request, A) -> F;

const ACCEPT_QUEUE: usize = 10_000;
const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Where connections come from. Implemented by [`TcpListener`].
#[async_trait::async_trait]
pub trait Accept: Send + 'static {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait::async_trait]
impl Accept for TcpListener {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

pub struct Server<A, F> {
    state: A,
    handler: Handler<A, F>,
    slots: Arc<Semaphore>,
    max_connections: usize,
    timeout: Duration,
}

impl<S, F> Server<S, F>
where
    S: Clone + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    pub fn new(state: S, handler: Handler<S, F>, max_connections: usize, timeout: Duration) -> Self {
        Self {
            state,
            handler,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            timeout,
        }
    }

    pub async fn bind<A: ToSocketAddrs>(self, addr: A) -> io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Runs until the connection slots are closed. Accept failures are
    /// retried, never returned.
    pub async fn serve<L: Accept>(self, listener: L) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(target: "listener", ?addr, "server is running");

        let server = Arc::new(self);
        let backlog = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(ACCEPT_QUEUE);
        tokio::spawn(accept_loop(listener, tx, Arc::clone(&backlog)));

        let mut throughput = Throughput::default();
        while let Some((socket, peer)) = rx.recv().await {
            let Some(slot) = server.admit().await else {
                tracing::error!(target: "listener", "connection slots closed");
                break;
            };

            let queued = backlog.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
            throughput.record(queued, server.in_flight());

            tokio::spawn(Arc::clone(&server).run_connection(socket, peer, slot));
        }

        Ok(())
    }

    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        if let Ok(slot) = Arc::clone(&self.slots).try_acquire_owned() {
            return Some(slot);
        }

        tracing::warn!(
            target: "listener",
            limit = self.max_connections,
            "connection limit reached, waiting for a free slot"
        );
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    fn in_flight(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }

    async fn run_connection(
        self: Arc<Self>,
        socket: TcpStream,
        peer: SocketAddr,
        slot: OwnedSemaphorePermit,
    ) {
        let timeout = self.timeout;
        let handled = tokio::time::timeout(timeout, self.handle(socket, peer)).await;
        drop(slot);

        if handled.is_err() {
            tracing::warn!(%peer, ?timeout, "connection timed out");
        }
    }

    #[tracing::instrument(skip(self, socket))]
    async fn handle(&self, socket: TcpStream, peer: SocketAddr) {
        let mut framed = ConnectionCodec::default().framed(socket);
        let req = match framed.next().await {
            Some(Ok(req)) => req,
            Some(Err(err)) => {
                tracing::warn!(%err, "failed to read request");
                return;
            }
            None => {
                tracing::debug!("connection closed before a request arrived");
                return;
            }
        };
        log_request(&req);

        let started = Instant::now();
        let mut resp = (self.handler)(req, self.state.clone()).await;
        tracing::debug!(status = %resp.status(), elapsed = ?started.elapsed(), "request handled");

        resp.headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
        if let Err(err) = framed.send(resp).await {
            tracing::warn!(%err, "failed to send response");
        }
    }
}

fn log_request(req: &Request) {
    let agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info!(
        target: "requests",
        method = %req.method(),
        path = %req.uri(),
        agent,
        "{} {}",
        req.method(),
        req.uri()
    );
}

/// Connections admitted per second, reported at debug level.
struct Throughput {
    window: Instant,
    admitted: usize,
}

impl Default for Throughput {
    fn default() -> Self {
        Self {
            window: Instant::now(),
            admitted: 0,
        }
    }
}

impl Throughput {
    fn record(&mut self, queued: usize, in_flight: usize) {
        self.admitted += 1;
        if self.window.elapsed() < Duration::from_secs(1) {
            return;
        }

        tracing::debug!(
            target: "listener",
            admitted = self.admitted,
            in_flight,
            queued,
            "connections in the last second"
        );
        *self = Self::default();
    }
}

async fn accept_loop<L: Accept>(
    mut listener: L,
    tx: mpsc::Sender<(TcpStream, SocketAddr)>,
    backlog: Arc<AtomicUsize>,
) {
    loop {
        let connection = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                // EMFILE, ECONNABORTED and friends pass; keep listening
                tracing::warn!(target: "listener", %err, "failed to accept connection");
                tokio::time::sleep(ACCEPT_RETRY).await;
                continue;
            }
        };

        backlog.fetch_add(1, Ordering::Relaxed);
        if tx.send(connection).await.is_err() {
            return;
        }
    }
}
