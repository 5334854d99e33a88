//! Validated settings for a [`DwgServer`](crate::DwgServer).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::DwgError;
use crate::protocol::auth::MAX_CREDENTIAL_LEN;

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    listen_port: u16,
    bind_address: IpAddr,
    user: String,
    password: String,
    response_timeout: Duration,
    event_capacity: usize,
    keepalive_interval: Option<Duration>,
}

impl ServerConfig {
    /// Port 0 asks the OS for a free port; [`DwgServer::start`] reports
    /// the one actually bound.
    ///
    /// [`DwgServer::start`]: crate::DwgServer::start
    pub fn new(
        listen_port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, DwgError> {
        let user = user.into();
        let password = password.into();
        validate_credential("user", &user)?;
        validate_credential("password", &password)?;
        Ok(Self {
            listen_port,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            user,
            password,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            keepalive_interval: None,
        })
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// How long `send_sms`/`send_ussd` wait for the gateway's response.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Capacity of the event queue. At least one slot is always kept.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Send a keep-alive to the gateway at this interval once a peer is
    /// connected. Off by default.
    pub fn with_keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval.filter(|i| !i.is_zero());
        self
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    pub fn bind_address(&self) -> IpAddr {
        self.bind_address
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.listen_port)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        self.keepalive_interval
    }
}

fn validate_credential(field: &str, value: &str) -> Result<(), DwgError> {
    if value.is_empty() {
        return Err(DwgError::InvalidConfiguration(format!(
            "{field} must not be empty"
        )));
    }
    if value.len() > MAX_CREDENTIAL_LEN {
        return Err(DwgError::InvalidConfiguration(format!(
            "{field} is longer than {MAX_CREDENTIAL_LEN} characters"
        )));
    }
    if !value.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(DwgError::InvalidConfiguration(format!(
            "{field} must be visible ASCII characters"
        )));
    }
    Ok(())
}
