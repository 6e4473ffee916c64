//! Exposition text and the HTTP request that carries it.

use core::fmt::{self, Write};

use heapless::String;
use thiserror::Error;

use crate::config::PushTarget;

pub const MAX_BODY_LEN: usize = 128;
pub const MAX_REQUEST_LEN: usize = 384;

pub type BodyBuffer = String<MAX_BODY_LEN>;
pub type RequestBuffer = String<MAX_REQUEST_LEN>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("exposition body exceeds {MAX_BODY_LEN} bytes")]
    BodyOverflow,
    #[error("request exceeds {MAX_REQUEST_LEN} bytes")]
    RequestOverflow,
}

/// A single gauge sample in exposition format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gauge<'a> {
    pub name: &'a str,
    pub value: f32,
}

impl fmt::Display for Gauge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#TYPE {} gauge", self.name)?;
        writeln!(f, "{} {:.6}", self.name, self.value)
    }
}

pub fn render_body(gauge: &Gauge<'_>) -> Result<BodyBuffer, FormatError> {
    let mut body = BodyBuffer::new();
    write!(body, "{}", gauge).map_err(|_| FormatError::BodyOverflow)?;
    Ok(body)
}

/// Frame `body` as a POST to `target`.
pub fn render_request(target: &PushTarget, body: &str) -> Result<RequestBuffer, FormatError> {
    let mut request = RequestBuffer::new();
    write!(
        request,
        "POST {} HTTP/1.0\r\n\
         Host: {}:{}\r\n\
         User-Agent: {}\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        target.path,
        target.host,
        target.port,
        target.user_agent,
        body.len(),
        body
    )
    .map_err(|_| FormatError::RequestOverflow)?;
    Ok(request)
}

pub fn build_request(target: &PushTarget, name: &str, value: f32) -> Result<RequestBuffer, FormatError> {
    let body = render_body(&Gauge { name, value })?;
    render_request(target, &body)
}
