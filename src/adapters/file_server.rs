//! SoftAP file server.
//!
//! Implements [`FileServerPort`]: `start` raises the WPA2 access point on
//! the shared [`WifiRadio`] and binds an [`HttpListener`] on all
//! interfaces; `poll` serves at most one connection.  There is no stop;
//! the service lives until the device restarts.

use std::cell::RefCell;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use log::warn;

use super::http_listener::HttpListener;
use super::utils::valid_ap_credentials;
use super::wifi::WifiRadio;
use crate::app::ports::{FileServerPort, NetError};
use crate::web::codec::{Request, Response};

pub struct SoftApFileServer {
    radio: Rc<RefCell<WifiRadio>>,
    listener: Option<HttpListener>,
}

impl SoftApFileServer {
    pub fn new(radio: Rc<RefCell<WifiRadio>>) -> Self {
        Self {
            radio,
            listener: None,
        }
    }

    /// Requests answered since start.
    pub fn served(&self) -> u32 {
        self.listener.as_ref().map_or(0, HttpListener::served)
    }
}

impl FileServerPort for SoftApFileServer {
    fn start(&mut self, ssid: &str, password: &str, port: u16) -> Result<SocketAddrV4, NetError> {
        if !valid_ap_credentials(ssid, password) {
            warn!("FileServer: rejected AP credentials (ssid len {})", ssid.len());
            return Err(NetError::InvalidCredentials);
        }
        let ip = self.radio.borrow_mut().start_ap(ssid, password)?;
        let listener = HttpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
        let addr = SocketAddrV4::new(ip, listener.local_addr().port());
        self.listener = Some(listener);
        Ok(addr)
    }

    fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    fn poll(&mut self, handler: &mut dyn FnMut(&Request) -> Response) -> bool {
        match self.listener.as_mut() {
            Some(listener) => listener.poll_once(handler),
            None => false,
        }
    }
}
