//! Contract between a channel and the resource framework hosting it.
//!
//! The framework owns routing, transport and response delivery. A channel only sees a request
//! positioned on its own path segment, builds [`Response`] values and asks the framework to run
//! its maintenance task again through [`Host::schedule`].

use heapless::String;

use crate::acquisition::Snapshot;
use crate::{Duration, Instant};

/// Request methods a channel distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Post,
    Other,
}

/// A routed request as exposed by the framework.
pub trait Request {
    /// Opaque handle on the protocol exchange, kept while the request waits in a queue.
    type Exchange;

    fn exchange(&self) -> Self::Exchange;

    fn method(&self) -> Method;

    /// Path segment the request is positioned on.
    fn current(&self) -> &str;

    /// Segments left after the current one, 0 when the current one is the destination.
    fn to_destination(&self) -> usize;

    /// Moves to the next segment, false when already at the destination.
    fn next(&mut self) -> bool;

    /// Moves back one segment, false when already at the first one.
    fn previous(&mut self) -> bool;

    /// Raw value of a named form argument.
    fn arg(&self, name: &str) -> Option<&str>;
}

/// Status outcomes a channel produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    /// Accepted, the response follows once data is ready.
    Deferred,
    /// Not handled here, the framework should try other resources.
    Pass,
    BadRequest,
    RequestTimeout,
    NotImplemented,
    ServiceUnavailable,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Deferred => 102,
            Status::Pass => 308,
            Status::BadRequest => 400,
            Status::RequestTimeout => 408,
            Status::NotImplemented => 501,
            Status::ServiceUnavailable => 503,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContentType {
    OctetStream,
    Json,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::OctetStream => "application/octet-stream",
            ContentType::Json => "application/json",
        }
    }
}

/// Longest parameters document: three 5 digit values plus the keys.
pub const PARAMS_LEN: usize = 48;

/// Readable response body.
#[derive(Debug)]
pub enum Body<'p> {
    /// Owned copy of a sample window.
    Sample(Snapshot<'p>),
    /// Rendered parameters document.
    Params(String<PARAMS_LEN>),
}

impl Body<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Sample(snapshot) => snapshot.as_bytes(),
            Body::Params(doc) => doc.as_bytes(),
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Body::Sample(_) => ContentType::OctetStream,
            Body::Params(_) => ContentType::Json,
        }
    }
}

/// Status plus optional body.
#[derive(Debug)]
pub struct Response<'p> {
    pub status: Status,
    pub body: Option<Body<'p>>,
}

impl<'p> Response<'p> {
    /// Response without a body.
    pub fn status(status: Status) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(status: Status, body: Body<'p>) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }
}

/// When the framework should run a channel's maintenance task next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    After(Duration),
    /// Not until a new request asks for it.
    Never,
}

/// Services the framework provides to a channel.
pub trait Host<E> {
    /// Current uptime.
    fn uptime(&self) -> Instant;

    /// Sends a response for a queued exchange. When the framework has no room for it the
    /// exchange is handed back untouched.
    fn dispatch(&mut self, exchange: E, response: Response<'_>) -> core::result::Result<(), E>;

    fn schedule(&mut self, when: Schedule);
}
