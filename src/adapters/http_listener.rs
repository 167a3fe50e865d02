//! Non-blocking HTTP/1.1 listener.
//!
//! A `std::net::TcpListener` in non-blocking mode, polled once per run-loop
//! iteration.  Each poll accepts at most one connection, reads one request
//! head through [`RequestDecoder`], hands it to the router and writes the
//! response with `Connection: close`.  lwIP exposes BSD sockets on ESP-IDF,
//! so the same code runs on the device and on the host.
//!
//! ## Connection model
//!
//! 1. `bind()` opens the listener (non-blocking).
//! 2. `poll_once()` tries `accept()`; `WouldBlock` means no client.
//! 3. The accepted stream is switched to blocking with a read timeout so a
//!    silent client cannot stall the loop for longer than that.
//! 4. The stream is dropped after the response; one request per connection.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::time::Duration;

use log::{info, warn};

use crate::app::ports::NetError;
use crate::web::codec::{Request, RequestDecoder, Response};

/// Upper bound on how long one client may take to send its request head.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 512;

pub struct HttpListener {
    listener: TcpListener,
    local: SocketAddrV4,
    served: u32,
}

impl HttpListener {
    pub fn bind(addr: SocketAddrV4) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).map_err(|e| {
            warn!("HTTP: bind {} failed: {}", addr, e);
            NetError::BindFailed
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|_| NetError::BindFailed)?;
        let local = match listener.local_addr() {
            Ok(SocketAddr::V4(local)) => local,
            _ => return Err(NetError::BindFailed),
        };
        info!("HTTP: listening on {}", local);
        Ok(Self {
            listener,
            local,
            served: 0,
        })
    }

    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local
    }

    /// Requests answered since bind.
    pub fn served(&self) -> u32 {
        self.served
    }

    /// Accept and serve at most one connection.  Returns `true` if a
    /// response was written.
    pub fn poll_once(&mut self, handler: &mut dyn FnMut(&Request) -> Response) -> bool {
        match self.listener.accept() {
            Ok((stream, peer)) => match serve(stream, handler) {
                Ok(true) => {
                    self.served = self.served.wrapping_add(1);
                    true
                }
                Ok(false) => false,
                Err(e) => {
                    warn!("HTTP: client {} dropped: {}", peer, e);
                    false
                }
            },
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!("HTTP: accept error: {}", e);
                false
            }
        }
    }
}

/// Read one request head and answer it.  `Ok(false)` means the client
/// closed before sending a complete head.
fn serve(
    mut stream: TcpStream,
    handler: &mut dyn FnMut(&Request) -> Response,
) -> std::io::Result<bool> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;

    let mut decoder = RequestDecoder::new();
    let mut chunk = [0u8; READ_CHUNK];
    let response = loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(false);
        }
        match decoder.feed(&chunk[..n]) {
            Ok(Some(request)) => break handler(&request),
            Ok(None) => {}
            Err(e) => break Response::text(400, &e.to_string()),
        }
    };

    stream.write_all(response.encode_head().as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()?;
    let _ = stream.shutdown(Shutdown::Write);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn poll_without_client_returns_false() {
        let mut l = HttpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        assert_ne!(l.local_addr().port(), 0);
        assert!(!l.poll_once(&mut |_: &Request| Response::text(200, "x")));
        assert_eq!(l.served(), 0);
    }

    #[test]
    fn binding_a_taken_port_fails() {
        let a = HttpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        let b = HttpListener::bind(a.local_addr());
        assert_eq!(b.err(), Some(NetError::BindFailed));
    }
}
