//! Push client: one TCP transaction per submitted reading.
//!
//! Every call to [`PushClient::submit`] walks the same path:
//!
//! ```text
//! resolve (cached) -> open socket -> connect -> send -> drain response -> close
//! ```
//!
//! Any transport failure drops the cached collector address, so the next
//! submission starts with a fresh DNS lookup. The response is echoed to the
//! debug log but not interpreted: any reply counts as delivered.

use core::net::SocketAddrV4;

use embedded_hal_async::delay::DelayNs;
use embedded_io::{Error as _, ErrorKind};
use log::{debug, error, info};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::metrics::{self, FormatError};
use crate::model::Reading;
use crate::resolver::AddressResolver;
use crate::traits::{Connection, NameResolver, Network, ReadingSink};

const RECV_CHUNK: usize = 64;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("request build failed: {0}")]
    Format(#[from] FormatError),
    #[error("failed to allocate socket: {0:?}")]
    Socket(ErrorKind),
    #[error("failed to set socket timeout: {0:?}")]
    Timeout(ErrorKind),
    #[error("connect to {remote} failed: {kind:?}")]
    Connect { remote: SocketAddrV4, kind: ErrorKind },
    #[error("send failed: {0:?}")]
    Send(ErrorKind),
}

impl SubmitError {
    /// Whether the failure casts doubt on the cached collector address.
    pub fn invalidates_address(&self) -> bool {
        !matches!(self, SubmitError::Format(_))
    }
}

pub struct PushClient<N, R, D> {
    network: N,
    resolver: AddressResolver<R>,
    delay: D,
    config: ClientConfig,
    attempts: u32,
    delivered: u32,
}

impl<N, R, D> PushClient<N, R, D>
where
    N: Network,
    R: NameResolver,
    D: DelayNs,
{
    pub fn new(network: N, resolver: R, delay: D, config: ClientConfig) -> Self {
        let resolver = AddressResolver::new(
            resolver,
            config.target.host,
            config.target.port,
            config.dns_retry_ms,
        );
        Self {
            network,
            resolver,
            delay,
            config,
            attempts: 0,
            delivered: 0,
        }
    }

    /// Push one reading to the collector.
    pub async fn submit(&mut self, reading: Reading) -> Result<(), SubmitError> {
        let remote = self.resolver.address(&mut self.delay).await;
        self.attempts += 1;

        let outcome = self.attempt(remote, reading).await;
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(e) => {
                error!("Submitting to {} failed: {}", remote, e);
                if e.invalidates_address() {
                    self.resolver.invalidate();
                }
                if let SubmitError::Socket(_) = e {
                    self.delay.delay_ms(self.config.socket_retry_ms).await;
                }
            }
        }
        outcome
    }

    async fn attempt(&mut self, remote: SocketAddrV4, reading: Reading) -> Result<(), SubmitError> {
        let request = metrics::build_request(&self.config.target, self.config.metric, reading.celsius())?;

        info!("Opening socket");
        let mut conn = self.network.open().map_err(SubmitError::Socket)?;
        info!("... allocated socket");

        let outcome = exchange(&mut conn, remote, &request, &self.config).await;
        conn.close().await;
        outcome
    }

    pub fn resolver(&self) -> &AddressResolver<R> {
        &self.resolver
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Attempts that got past address resolution
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delivered(&self) -> u32 {
        self.delivered
    }
}

impl<N, R, D> ReadingSink for PushClient<N, R, D>
where
    N: Network,
    R: NameResolver,
    D: DelayNs,
{
    async fn submit(&mut self, reading: Reading) -> Result<(), SubmitError> {
        PushClient::submit(self, reading).await
    }
}

async fn exchange<C: Connection>(
    conn: &mut C,
    remote: SocketAddrV4,
    request: &str,
    config: &ClientConfig,
) -> Result<(), SubmitError> {
    conn.set_timeout(Some(config.io_timeout))
        .map_err(|e| SubmitError::Timeout(e.kind()))?;

    conn.connect(remote).await.map_err(|e| SubmitError::Connect {
        remote,
        kind: e.kind(),
    })?;
    info!("... connected");

    debug!("{}", request);
    conn.write_all(request.as_bytes())
        .await
        .map_err(|e| SubmitError::Send(e.kind()))?;
    conn.flush().await.map_err(|e| SubmitError::Send(e.kind()))?;
    info!("... socket send success");

    conn.set_timeout(Some(config.receive_timeout))
        .map_err(|e| SubmitError::Timeout(e.kind()))?;
    info!("... set socket receiving timeout success");

    let received = drain(conn).await;
    debug!("Response finished after {} bytes", received);
    Ok(())
}

/// Read until the peer closes, the timeout hits or the socket errors out.
async fn drain<C: Connection>(conn: &mut C) -> usize {
    let mut buf = [0u8; RECV_CHUNK];
    let mut total = 0;
    loop {
        match conn.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                echo(&buf[..n]);
            }
            Err(e) => {
                debug!("Response read ended: {:?}", e.kind());
                break;
            }
        }
    }
    total
}

fn echo(chunk: &[u8]) {
    match core::str::from_utf8(chunk) {
        Ok(text) => debug!("{}", text),
        Err(_) => debug!("{:02x?}", chunk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VALID_RANGE;
    use crate::mock::{Fault, MockNetwork, MockResolver, RecordingDelay};
    use core::net::Ipv4Addr;
    use core::time::Duration;
    use embassy_futures::block_on;

    const COLLECTOR: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 7);
    const REPLY: &[u8] = b"HTTP/1.0 202 Accepted\r\nContent-Length: 0\r\n\r\n";

    type TestClient = PushClient<MockNetwork, MockResolver, RecordingDelay>;

    fn client(network: MockNetwork) -> TestClient {
        PushClient::new(
            network,
            MockResolver::answering(COLLECTOR),
            RecordingDelay::default(),
            ClientConfig::DEFAULT,
        )
    }

    fn reading(celsius: f32) -> Reading {
        Reading::validate(celsius, VALID_RANGE).unwrap()
    }

    #[test]
    fn delivers_request_to_resolved_collector() {
        let mut client = client(MockNetwork::responding(REPLY));

        block_on(client.submit(reading(22.5))).unwrap();

        let net = client.network();
        assert_eq!(net.connects, vec![SocketAddrV4::new(COLLECTOR, 9091)]);
        let sent = net.sent_text(0);
        assert!(sent.starts_with("POST /metrics/job/pushgateway/ HTTP/1.0\r\n"));
        assert!(sent.contains("\r\nContent-Length: 68\r\n\r\n"));
        assert!(sent.ends_with("temperature_slaapkamer 22.500000\n"));
        assert_eq!(net.closed, 1);
        assert_eq!(client.delivered(), 1);
    }

    #[test]
    fn every_network_wait_is_bounded() {
        let mut client = client(MockNetwork::responding(REPLY));

        block_on(client.submit(reading(20.0))).unwrap();

        assert_eq!(
            client.network().timeouts,
            vec![Some(Duration::from_secs(10)), Some(Duration::from_secs(5))]
        );
    }

    #[test]
    fn any_reply_counts_as_delivered() {
        let mut client = client(MockNetwork::responding(b"HTTP/1.0 500 Internal Server Error\r\n\r\noops"));
        assert_eq!(block_on(client.submit(reading(20.0))), Ok(()));

        let mut silent = self::client(MockNetwork::default());
        assert_eq!(block_on(silent.submit(reading(20.0))), Ok(()));
    }

    #[test]
    fn successes_share_one_lookup() {
        let mut client = client(MockNetwork::responding(REPLY));

        for _ in 0..4 {
            block_on(client.submit(reading(21.0))).unwrap();
        }

        assert_eq!(client.resolver().lookups(), 1);
        assert_eq!(client.network().connects.len(), 4);
        assert_eq!(client.attempts(), 4);
    }

    #[test]
    fn connect_failure_forces_lookup_before_next_connect() {
        let network = MockNetwork::responding(REPLY).with_plan([Some(Fault::Connect)]);
        let mut client = client(network);

        let err = block_on(client.submit(reading(21.0))).unwrap_err();
        assert_eq!(
            err,
            SubmitError::Connect {
                remote: SocketAddrV4::new(COLLECTOR, 9091),
                kind: ErrorKind::ConnectionRefused,
            }
        );
        assert_eq!(client.resolver().cached(), None);
        assert_eq!(client.network().closed, 1);
        // no pause after a refused connect
        assert!(client.delay.calls.is_empty());

        block_on(client.submit(reading(21.0))).unwrap();
        assert_eq!(client.resolver().lookups(), 2);
    }

    #[test]
    fn socket_allocation_failure_pauses_one_tick() {
        let network = MockNetwork::responding(REPLY).with_plan([Some(Fault::Allocate)]);
        let mut client = client(network);

        let err = block_on(client.submit(reading(21.0))).unwrap_err();

        assert_eq!(err, SubmitError::Socket(ErrorKind::NotConnected));
        assert_eq!(client.resolver().cached(), None);
        assert_eq!(client.delay.calls, vec![1_000]);
        assert_eq!(client.network().opened, 0);
        assert_eq!(client.network().closed, 0);
    }

    #[test]
    fn send_failure_invalidates_and_closes() {
        let network = MockNetwork::responding(REPLY).with_plan([Some(Fault::Send)]);
        let mut client = client(network);

        let err = block_on(client.submit(reading(21.0))).unwrap_err();

        assert_eq!(err, SubmitError::Send(ErrorKind::BrokenPipe));
        assert!(err.invalidates_address());
        assert_eq!(client.resolver().cached(), None);
        assert_eq!(client.network().closed, 1);
    }

    #[test]
    fn timeout_configuration_failures_invalidate() {
        for fault in [Fault::Timeout, Fault::ReceiveTimeout] {
            let network = MockNetwork::responding(REPLY).with_plan([Some(fault)]);
            let mut client = client(network);

            let err = block_on(client.submit(reading(21.0))).unwrap_err();

            assert_eq!(err, SubmitError::Timeout(ErrorKind::InvalidInput), "{fault:?}");
            assert_eq!(client.resolver().cached(), None);
            assert_eq!(client.network().closed, 1);
        }
    }

    #[test]
    fn receive_timeout_failure_happens_after_send() {
        let network = MockNetwork::responding(REPLY).with_plan([Some(Fault::ReceiveTimeout)]);
        let mut client = client(network);

        let _ = block_on(client.submit(reading(21.0)));

        assert!(client.network().sent_text(0).ends_with("temperature_slaapkamer 21.000000\n"));
        assert_eq!(client.network().connects.len(), 1);
    }

    #[test]
    fn read_error_mid_response_still_delivers() {
        let network = MockNetwork::responding(REPLY).with_plan([Some(Fault::ReadError)]);
        let mut client = client(network);

        assert_eq!(block_on(client.submit(reading(21.0))), Ok(()));

        assert_eq!(client.network().closed, 1);
        assert_eq!(client.resolver().cached(), Some(SocketAddrV4::new(COLLECTOR, 9091)));
        assert_eq!(client.delivered(), 1);
        assert!(client.delay.calls.is_empty());
    }

    #[test]
    fn format_error_keeps_address() {
        assert!(!SubmitError::Format(FormatError::BodyOverflow).invalidates_address());
    }
}
