//! Hardware abstraction traits

use core::future::Future;
use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;

use embedded_io::ErrorKind;
use embedded_io_async::{Read, Write};

use crate::client::SubmitError;
use crate::model::Reading;
use crate::resolver::ResolveError;

/// Trait for temperature sensors
pub trait TemperatureSensor {
    /// Initialize the sensor
    fn init(&mut self) -> Result<(), &'static str>;

    /// Read temperature in Celsius
    fn read_temperature(&mut self) -> Result<f32, &'static str>;
}

/// Trait for hostname lookups
pub trait NameResolver {
    /// Resolve `host` to a single IPv4 address
    fn resolve(&mut self, host: &str) -> impl Future<Output = Result<Ipv4Addr, ResolveError>>;
}

/// Trait for a network stack able to hand out TCP sockets
pub trait Network {
    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Allocate a fresh, unconnected socket
    fn open(&mut self) -> Result<Self::Connection<'_>, ErrorKind>;
}

/// One TCP socket, from allocation to close
pub trait Connection: Read + Write {
    /// Bound every following connect, write and read; `None` waits forever
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error>;

    fn connect(&mut self, remote: SocketAddrV4) -> impl Future<Output = Result<(), Self::Error>>;

    /// Release the socket
    fn close(self) -> impl Future<Output = ()>;
}

/// Trait for whatever accepts validated readings
pub trait ReadingSink {
    fn submit(&mut self, reading: Reading) -> impl Future<Output = Result<(), SubmitError>>;
}
