//! SNTP-backed wall clock.

use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_time::{Duration, Instant, with_timeout};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use station_core::clock::{Clock, SyncedClock, TimeOfDay, sntp};
use station_core::config::{HostString, ScheduleConfig};

const REPLY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtpError {
    #[error("DNS lookup failed")]
    Dns,
    #[error("UDP socket error")]
    Socket,
    #[error("no reply from server")]
    Timeout,
    #[error("malformed reply")]
    BadReply,
}

/// Queries the configured server whenever the network is up and keeps time
/// from the last answer otherwise.
pub struct NtpClock {
    stack: Stack<'static>,
    server: HostString,
    clock: SyncedClock,
}

impl NtpClock {
    pub fn new(stack: Stack<'static>, config: &ScheduleConfig) -> Self {
        Self {
            stack,
            server: config.ntp_server.clone(),
            clock: SyncedClock::new(config.utc_offset),
        }
    }

    async fn query(&self) -> Result<u64, NtpError> {
        let addresses = self
            .stack
            .dns_query(self.server.as_str(), DnsQueryType::A)
            .await
            .map_err(|_| NtpError::Dns)?;
        let server = *addresses.first().ok_or(NtpError::Dns)?;

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buffer = [0u8; 128];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_buffer = [0u8; 128];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NtpError::Socket)?;
        socket
            .send_to(&sntp::request_packet(), (server, sntp::PORT))
            .await
            .map_err(|_| NtpError::Socket)?;

        let mut reply = [0u8; sntp::PACKET_LEN];
        let (len, _) = with_timeout(REPLY_TIMEOUT, socket.recv_from(&mut reply))
            .await
            .map_err(|_| NtpError::Timeout)?
            .map_err(|_| NtpError::Socket)?;
        sntp::parse_unix_seconds(&reply[..len]).ok_or(NtpError::BadReply)
    }
}

impl Clock for NtpClock {
    async fn try_get_local_time(&mut self) -> Option<TimeOfDay> {
        if self.stack.config_v4().is_some() {
            match self.query().await {
                Ok(unix_seconds) => {
                    debug!("{} => {}", self.server, unix_seconds);
                    self.clock.sync(unix_seconds, Instant::now());
                }
                Err(e) => warn!("SNTP {}: {}", self.server, e),
            }
        }

        let time = self.clock.time_at(Instant::now());
        if time.is_none() {
            info!("Failed to obtain time");
        }
        time
    }
}
