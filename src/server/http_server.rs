use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use tracing::info;

const READY_TIMEOUT: Duration = Duration::from_millis(250);
const READY_INTERVAL: Duration = Duration::from_millis(5);

/// Request headers parsed per request; enough for traffic that has crossed a proxy.
const MAX_HEADERS: usize = 32;

/// Starts a `may_minihttp` server for any [`HttpService`].
pub struct HttpServer<T>(pub T);

/// Handle to a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// [`wait_ready_within`](Self::wait_ready_within) with a 250ms budget.
    pub fn wait_ready(&self) -> io::Result<()> {
        self.wait_ready_within(READY_TIMEOUT)
    }

    /// Poll until the listener accepts a TCP connection.
    ///
    /// # Errors
    ///
    /// `TimedOut` once `budget` has elapsed without a successful connect.
    pub fn wait_ready_within(&self, budget: Duration) -> io::Result<()> {
        let started = Instant::now();
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            if started.elapsed() >= budget {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} not accepting connections", self.addr),
                ));
            }
            thread::sleep(READY_INTERVAL);
        }
    }

    /// Cancel the accept loop and wait for it to exit.
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping server");
        // SAFETY: cancelling the server coroutine we own is how may_minihttp shuts a
        // listener down; the handle is joined immediately afterwards.
        unsafe {
            self.handle.coroutine().cancel();
        }
        // cancellation surfaces as an Err from join
        let _cancelled = self.handle.join();
    }

    /// Block until the server exits. It only exits when stopped or on panic.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start serving.
    ///
    /// # Errors
    ///
    /// If `addr` does not resolve or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let Some(addr) = addr.to_socket_addrs()?.next() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            ));
        };
        let handle = HttpServerWithHeaders::<_, MAX_HEADERS>(self.0).start(addr)?;
        info!(addr = %addr, "Server listening");
        Ok(ServerHandle { addr, handle })
    }
}
