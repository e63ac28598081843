//! ThingSpeak HTTP client over an embassy-net TCP socket.

use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_time::Duration;
use log::{debug, error, warn};

use station_core::config::{ApiKeyString, ChannelConfig};
use station_core::status::StatusRecord;
use station_core::upload::{
    StatusCode, THINGSPEAK_HOST, THINGSPEAK_PORT, ThingSpeakUpdate, UploadClient, parse_response,
};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);
const RESPONSE_CAPACITY: usize = 512;

pub struct ThingSpeakClient {
    stack: Stack<'static>,
    api_key: ApiKeyString,
}

impl ThingSpeakClient {
    pub fn new(stack: Stack<'static>, config: &ChannelConfig) -> Self {
        Self {
            stack,
            api_key: config.write_api_key.clone(),
        }
    }

    async fn try_publish(&self, status: &str, fields: &[f32]) -> Result<StatusCode, StatusCode> {
        let request = ThingSpeakUpdate {
            api_key: self.api_key.as_str(),
            fields,
            status,
        }
        .to_request()
        .map_err(|e| {
            error!("ThingSpeak request: {}", e);
            StatusCode::UNEXPECTED_RESPONSE
        })?;

        let addresses = self
            .stack
            .dns_query(THINGSPEAK_HOST, DnsQueryType::A)
            .await
            .map_err(|_| StatusCode::CONNECT_FAILED)?;
        let address = *addresses.first().ok_or(StatusCode::CONNECT_FAILED)?;

        let mut rx_buffer = [0u8; 1024];
        let mut tx_buffer = [0u8; 1024];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket
            .connect((address, THINGSPEAK_PORT))
            .await
            .map_err(|_| StatusCode::CONNECT_FAILED)?;

        let mut pending = request.as_bytes();
        while !pending.is_empty() {
            match socket.write(pending).await {
                Ok(0) | Err(_) => return Err(StatusCode::TIMEOUT),
                Ok(n) => pending = &pending[n..],
            }
        }

        let mut response = [0u8; RESPONSE_CAPACITY];
        let mut len = 0;
        while len < response.len() {
            match socket.read(&mut response[len..]).await {
                Ok(0) => break,
                Ok(n) => len += n,
                // The server closing abruptly after a full reply is fine.
                Err(_) if len > 0 => break,
                Err(_) => return Err(StatusCode::TIMEOUT),
            }
        }
        socket.close();

        Ok(parse_response(&response[..len]))
    }
}

impl UploadClient for ThingSpeakClient {
    async fn publish(&mut self, status: &StatusRecord, fields: &[f32]) -> StatusCode {
        let code = match self.try_publish(status.as_str(), fields).await {
            Ok(code) | Err(code) => code,
        };
        if code.is_success() {
            debug!("Channel update successful.");
        } else {
            warn!("Problem updating channel. HTTP error code {}", code);
        }
        code
    }
}
