//! Cached collector address.
//!
//! The collector is looked up once and the answer is reused for every push
//! until the client reports a transport failure. Lookups themselves never
//! give up: a failed query is logged and retried after a fixed pause.

use core::net::SocketAddrV4;

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info};
use thiserror::Error;

use crate::traits::NameResolver;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("lookup failed")]
    Lookup,
    #[error("no usable address in answer")]
    NoAddress,
}

pub struct AddressResolver<R> {
    resolver: R,
    host: &'static str,
    port: u16,
    retry_ms: u32,
    cached: Option<SocketAddrV4>,
    lookups: u32,
}

impl<R: NameResolver> AddressResolver<R> {
    pub fn new(resolver: R, host: &'static str, port: u16, retry_ms: u32) -> Self {
        Self {
            resolver,
            host,
            port,
            retry_ms,
            cached: None,
            lookups: 0,
        }
    }

    /// Cached address, or a fresh lookup that is retried until it succeeds.
    pub async fn address<D: DelayNs>(&mut self, delay: &mut D) -> SocketAddrV4 {
        if let Some(addr) = self.cached {
            return addr;
        }

        loop {
            self.lookups += 1;
            let answer = self
                .resolver
                .resolve(self.host)
                .await
                .and_then(|ip| {
                    if ip.is_unspecified() {
                        Err(ResolveError::NoAddress)
                    } else {
                        Ok(ip)
                    }
                });

            match answer {
                Ok(ip) => {
                    info!("DNS lookup succeeded. IP={}", ip);
                    let addr = SocketAddrV4::new(ip, self.port);
                    self.cached = Some(addr);
                    return addr;
                }
                Err(e) => {
                    error!("DNS lookup of {} failed: {}", self.host, e);
                    error!("Going to try again in {} ms", self.retry_ms);
                    delay.delay_ms(self.retry_ms).await;
                }
            }
        }
    }

    /// Forget the cached address so the next call re-resolves.
    pub fn invalidate(&mut self) {
        if let Some(addr) = self.cached.take() {
            debug!("Dropping cached address {}", addr);
        }
    }

    pub fn cached(&self) -> Option<SocketAddrV4> {
        self.cached
    }

    /// Number of queries issued so far, failed ones included
    pub fn lookups(&self) -> u32 {
        self.lookups
    }
}
