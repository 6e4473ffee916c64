//! Scripted stand-ins for the hardware traits, used by the unit tests.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use embedded_hal_async::delay::DelayNs;
use embedded_io::ErrorKind;
use embedded_io_async::{ErrorType, Read, Write};

use crate::client::SubmitError;
use crate::model::Reading;
use crate::resolver::ResolveError;
use crate::traits::{Connection, NameResolver, Network, ReadingSink, TemperatureSensor};

/// Records requested pauses in milliseconds and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub calls: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

pub struct MockSensor {
    script: VecDeque<Result<f32, &'static str>>,
    fallback: f32,
    pub reads: usize,
}

impl MockSensor {
    /// Sensor that returns `celsius` once `script` is used up.
    pub fn steady(celsius: f32) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: celsius,
            reads: 0,
        }
    }

    pub fn with_readings(mut self, readings: impl IntoIterator<Item = Result<f32, &'static str>>) -> Self {
        self.script.extend(readings);
        self
    }
}

impl TemperatureSensor for MockSensor {
    fn init(&mut self) -> Result<(), &'static str> {
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f32, &'static str> {
        self.reads += 1;
        self.script.pop_front().unwrap_or(Ok(self.fallback))
    }
}

pub struct MockResolver {
    script: VecDeque<Result<Ipv4Addr, ResolveError>>,
    answer: Ipv4Addr,
    pub queries: Vec<String>,
}

impl MockResolver {
    /// Resolver that answers `answer` once the scripted outcomes are used up.
    pub fn answering(answer: Ipv4Addr) -> Self {
        Self {
            script: VecDeque::new(),
            answer,
            queries: Vec::new(),
        }
    }

    pub fn with_outcomes(mut self, outcomes: impl IntoIterator<Item = Result<Ipv4Addr, ResolveError>>) -> Self {
        self.script.extend(outcomes);
        self
    }
}

impl NameResolver for MockResolver {
    async fn resolve(&mut self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        self.queries.push(host.to_string());
        self.script.pop_front().unwrap_or(Ok(self.answer))
    }
}

/// Where a scripted connection attempt breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Allocate,
    Timeout,
    Connect,
    Send,
    ReceiveTimeout,
    /// Part of the reply arrives, then the read times out
    ReadError,
}

/// Network whose attempts fail according to a per-attempt plan.
#[derive(Default)]
pub struct MockNetwork {
    plan: VecDeque<Option<Fault>>,
    response: Vec<u8>,
    pub opened: usize,
    pub closed: usize,
    pub connects: Vec<SocketAddrV4>,
    pub timeouts: Vec<Option<Duration>>,
    pub sent: Vec<Vec<u8>>,
}

impl MockNetwork {
    pub fn responding(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            ..Self::default()
        }
    }

    /// Queue outcomes for the next attempts; `None` is a clean exchange.
    pub fn with_plan(mut self, plan: impl IntoIterator<Item = Option<Fault>>) -> Self {
        self.plan.extend(plan);
        self
    }

    pub fn sent_text(&self, attempt: usize) -> String {
        String::from_utf8(self.sent[attempt].clone()).expect("utf-8 request")
    }
}

impl Network for MockNetwork {
    type Connection<'a> = MockConnection<'a>;

    fn open(&mut self) -> Result<MockConnection<'_>, ErrorKind> {
        let fault = self.plan.pop_front().flatten();
        if fault == Some(Fault::Allocate) {
            return Err(ErrorKind::NotConnected);
        }
        self.opened += 1;
        self.sent.push(Vec::new());
        Ok(MockConnection {
            net: self,
            fault,
            timeouts_set: 0,
            read_pos: 0,
        })
    }
}

pub struct MockConnection<'a> {
    net: &'a mut MockNetwork,
    fault: Option<Fault>,
    timeouts_set: usize,
    read_pos: usize,
}

impl ErrorType for MockConnection<'_> {
    type Error = ErrorKind;
}

impl Read for MockConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if self.fault == Some(Fault::ReadError) && self.read_pos > 0 {
            return Err(ErrorKind::TimedOut);
        }
        let rest = &self.net.response[self.read_pos..];
        // Hand the response out in small pieces, like a real socket would.
        let n = rest.len().min(buf.len()).min(16);
        buf[..n].copy_from_slice(&rest[..n]);
        self.read_pos += n;
        Ok(n)
    }
}

impl Write for MockConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        if self.fault == Some(Fault::Send) {
            return Err(ErrorKind::BrokenPipe);
        }
        if let Some(last) = self.net.sent.last_mut() {
            last.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl Connection for MockConnection<'_> {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ErrorKind> {
        self.timeouts_set += 1;
        let fails = match self.fault {
            Some(Fault::Timeout) => true,
            Some(Fault::ReceiveTimeout) => self.timeouts_set > 1,
            _ => false,
        };
        if fails {
            return Err(ErrorKind::InvalidInput);
        }
        self.net.timeouts.push(timeout);
        Ok(())
    }

    async fn connect(&mut self, remote: SocketAddrV4) -> Result<(), ErrorKind> {
        self.net.connects.push(remote);
        if self.fault == Some(Fault::Connect) {
            return Err(ErrorKind::ConnectionRefused);
        }
        Ok(())
    }

    async fn close(self) {
        self.net.closed += 1;
    }
}

/// Sink that replays scripted outcomes and remembers what it was given.
#[derive(Default)]
pub struct ScriptedSink {
    script: VecDeque<Result<(), SubmitError>>,
    pub submitted: Vec<f32>,
}

impl ScriptedSink {
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<(), SubmitError>>) -> Self {
        Self {
            script: outcomes.into_iter().collect(),
            submitted: Vec::new(),
        }
    }
}

impl ReadingSink for ScriptedSink {
    async fn submit(&mut self, reading: Reading) -> Result<(), SubmitError> {
        self.submitted.push(reading.celsius());
        self.script.pop_front().unwrap_or(Ok(()))
    }
}
