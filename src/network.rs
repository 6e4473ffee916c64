//! WiFi bring-up and the embassy-net side of the transport traits.

use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;

use embassy_executor::Spawner;
use embassy_net::{
    IpAddress, Runner, Stack, StackResources,
    dns::{DnsQueryType, DnsSocket},
    tcp::{ConnectError, TcpSocket},
};
use embassy_time::{Duration as TimerDuration, Timer};
use embedded_io::ErrorKind;
use embedded_io_async::{ErrorType, Read, Write};
use esp_hal::{peripherals::WIFI, rng::Rng};
use esp_radio::wifi::{
    ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent, WifiStaState,
};
use log::{error, info};
use static_cell::StaticCell;

use crate::resolver::ResolveError;
use crate::traits::{Connection, NameResolver, Network};

const SSID: &str = env!("SSID");
const PASSWORD: &str = env!("PASSWORD");

const RECONNECT_DELAY_MS: u64 = 5_000;
const SOCKET_BUFFER_LEN: usize = 1024;

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

/// Start the radio in station mode and spawn the link and stack tasks.
pub fn start_wifi(spawner: &Spawner, wifi: WIFI<'static>) -> Result<Stack<'static>, &'static str> {
    let radio = RADIO.init(esp_radio::init().map_err(|_| "Failed to initialize radio")?);
    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi, Default::default())
        .map_err(|_| "Failed to initialize WiFi")?;

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner
        .spawn(keep_connected(controller))
        .map_err(|_| "Failed to spawn WiFi task")?;
    spawner
        .spawn(run_stack(runner))
        .map_err(|_| "Failed to spawn network task")?;

    Ok(stack)
}

#[embassy_executor::task]
async fn keep_connected(mut controller: WifiController<'static>) {
    loop {
        if esp_radio::wifi::sta_state() == WifiStaState::Connected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            info!("[WIFI] Disconnected");
            Timer::after(TimerDuration::from_millis(RECONNECT_DELAY_MS)).await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            let config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(SSID.into())
                    .with_password(PASSWORD.into()),
            );
            if let Err(e) = controller.set_config(&config) {
                error!("[WIFI] Bad configuration: {:?}", e);
            }
            if let Err(e) = controller.start_async().await {
                error!("[WIFI] Failed to start: {:?}", e);
            }
        }

        match controller.connect_async().await {
            Ok(()) => info!("[WIFI] Connected to {}", SSID),
            Err(e) => {
                error!("[WIFI] Failed to connect: {:?}", e);
                Timer::after(TimerDuration::from_millis(RECONNECT_DELAY_MS)).await;
            }
        }
    }
}

#[embassy_executor::task]
async fn run_stack(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Hostname lookups through the stack's DNS servers.
pub struct DnsResolver {
    stack: Stack<'static>,
}

impl DnsResolver {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl NameResolver for DnsResolver {
    async fn resolve(&mut self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        let dns = DnsSocket::new(self.stack);
        let answer = dns
            .query(host, DnsQueryType::A)
            .await
            .map_err(|_| ResolveError::Lookup)?;
        match answer.first() {
            Some(IpAddress::Ipv4(addr)) => Ok(*addr),
            #[allow(unreachable_patterns)]
            _ => Err(ResolveError::NoAddress),
        }
    }
}

/// Hands out one TCP socket at a time over a pair of owned buffers.
pub struct TcpNetwork {
    stack: Stack<'static>,
    rx: [u8; SOCKET_BUFFER_LEN],
    tx: [u8; SOCKET_BUFFER_LEN],
}

impl TcpNetwork {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            rx: [0; SOCKET_BUFFER_LEN],
            tx: [0; SOCKET_BUFFER_LEN],
        }
    }
}

impl Network for TcpNetwork {
    type Connection<'a> = TcpConnection<'a>;

    fn open(&mut self) -> Result<TcpConnection<'_>, ErrorKind> {
        // Without a DHCP lease there is nothing to bind the socket to.
        if !self.stack.is_config_up() {
            return Err(ErrorKind::NotConnected);
        }
        Ok(TcpConnection {
            socket: TcpSocket::new(self.stack, &mut self.rx, &mut self.tx),
        })
    }
}

pub struct TcpConnection<'a> {
    socket: TcpSocket<'a>,
}

impl ErrorType for TcpConnection<'_> {
    type Error = ErrorKind;
}

impl Read for TcpConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.socket
            .read(buf)
            .await
            .map_err(|_| ErrorKind::ConnectionReset)
    }
}

impl Write for TcpConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.socket
            .write(buf)
            .await
            .map_err(|_| ErrorKind::ConnectionReset)
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        self.socket
            .flush()
            .await
            .map_err(|_| ErrorKind::ConnectionReset)
    }
}

impl Connection for TcpConnection<'_> {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ErrorKind> {
        let timeout = timeout.map(|t| TimerDuration::from_millis(t.as_millis() as u64));
        self.socket.set_timeout(timeout);
        Ok(())
    }

    async fn connect(&mut self, remote: SocketAddrV4) -> Result<(), ErrorKind> {
        self.socket
            .connect((IpAddress::Ipv4(*remote.ip()), remote.port()))
            .await
            .map_err(|e| match e {
                ConnectError::TimedOut => ErrorKind::TimedOut,
                ConnectError::NoRoute => ErrorKind::NotConnected,
                ConnectError::ConnectionReset => ErrorKind::ConnectionRefused,
                ConnectError::InvalidState => ErrorKind::Other,
            })
    }

    async fn close(mut self) {
        self.socket.close();
        // Let the FIN go out before the socket is dropped.
        let _ = self.socket.flush().await;
    }
}
