// Line oriented request console on RTT.
// A down channel carries one request per line: `METHOD /chN[/pr] [k=v&k=v]`.
// Every answer goes to the responses up channel as a header line
// `<id> <code> <content-type> <length>` followed by `length` body bytes.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::fmt::Write;

use heapless::{String, Vec};
use rtt_target::UpChannel;

use oscope_algo::{
    acquisition::SAMPLE_SIZE, Channel, ContentType, Host, Instant, Method, Request, Response,
    Schedule, Status,
};

/// Exchange handle of a console request.
pub type RequestId = u16;

pub const LINE_LEN: usize = 96;
const MAX_SEGMENTS: usize = 4;
const HEADER_LEN: usize = 48;
const FRAME_LEN: usize = HEADER_LEN + SAMPLE_SIZE;

/// Answer of the console itself when no resource takes the path.
const NOT_FOUND: u16 = 404;

/// Collects bytes from the down channel until a full line is available.
pub struct LineBuffer {
    bytes: Vec<u8, LINE_LEN>,
    overflow: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            overflow: false,
        }
    }

    /// Returns true once `byte` terminates a line.
    pub fn push(&mut self, byte: u8) -> bool {
        match byte {
            b'\n' => true,
            b'\r' => false,
            _ => {
                if self.bytes.push(byte).is_err() {
                    self.overflow = true;
                }
                false
            }
        }
    }

    /// The completed line, `None` when it overflowed or is not UTF-8.
    pub fn line(&self) -> Option<&str> {
        if self.overflow {
            return None;
        }
        core::str::from_utf8(&self.bytes).ok()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.overflow = false;
    }
}

/// A parsed console line, walked by the channel like a URI path.
pub struct ConsoleRequest<'l> {
    id: RequestId,
    method: Method,
    segments: Vec<&'l str, MAX_SEGMENTS>,
    position: usize,
    form: &'l str,
}

impl<'l> ConsoleRequest<'l> {
    pub fn parse(id: RequestId, line: &'l str) -> Option<Self> {
        let mut words = line.split_ascii_whitespace();
        let method = match words.next()? {
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other,
        };

        let mut segments = Vec::new();
        for segment in words.next()?.split('/').filter(|s| !s.is_empty()) {
            segments.push(segment).ok()?;
        }
        if segments.is_empty() {
            return None;
        }

        Some(Self {
            id,
            method,
            segments,
            position: 0,
            form: words.next().unwrap_or(""),
        })
    }

    /// Channel index named by the first segment, `ch1` is index 0.
    pub fn channel_index(&self) -> Option<usize> {
        let number: usize = self.segments.first()?.strip_prefix("ch")?.parse().ok()?;
        number.checked_sub(1)
    }
}

impl Request for ConsoleRequest<'_> {
    type Exchange = RequestId;

    fn exchange(&self) -> RequestId {
        self.id
    }

    fn method(&self) -> Method {
        self.method
    }

    fn current(&self) -> &str {
        self.segments[self.position]
    }

    fn to_destination(&self) -> usize {
        self.segments.len() - 1 - self.position
    }

    fn next(&mut self) -> bool {
        if self.to_destination() == 0 {
            return false;
        }
        self.position += 1;
        true
    }

    fn previous(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        true
    }

    fn arg(&self, name: &str) -> Option<&str> {
        self.form
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

/// Host side of a channel for one handling pass or maintenance run.
pub struct RttHost<'c> {
    responses: &'c mut UpChannel,
    now: Instant,
    requested: Option<Schedule>,
}

impl<'c> RttHost<'c> {
    pub fn new(responses: &'c mut UpChannel, now: Instant) -> Self {
        Self {
            responses,
            now,
            requested: None,
        }
    }

    /// Last run request made by the channel during this pass.
    pub fn requested(&self) -> Option<Schedule> {
        self.requested
    }

    /// Writes a whole frame or nothing, false when the channel has no room for it.
    fn write_frame(&mut self, id: RequestId, code: u16, mime: &str, body: &[u8]) -> bool {
        let mut header: String<HEADER_LEN> = String::new();
        if writeln!(header, "{} {} {} {}", id, code, mime, body.len()).is_err() {
            return false;
        }

        let mut frame: Vec<u8, FRAME_LEN> = Vec::new();
        if frame.extend_from_slice(header.as_bytes()).is_err()
            || frame.extend_from_slice(body).is_err()
        {
            return false;
        }

        self.responses.write(&frame) == frame.len()
    }
}

impl Host<RequestId> for RttHost<'_> {
    fn uptime(&self) -> Instant {
        self.now
    }

    fn dispatch(&mut self, id: RequestId, response: Response<'_>) -> Result<(), RequestId> {
        let delivered = match &response.body {
            Some(body) => self.write_frame(
                id,
                response.status.code(),
                body.content_type().mime(),
                body.as_bytes(),
            ),
            None => self.write_frame(id, response.status.code(), ContentType::Json.mime(), &[]),
        };

        if delivered {
            Ok(())
        } else {
            Err(id)
        }
    }

    fn schedule(&mut self, when: Schedule) {
        self.requested = Some(when);
    }
}

/// Serves one console line. Returns true when a channel asked for a maintenance run.
pub fn serve<const N: usize, const Q: usize>(
    channels: &mut [Channel<'static, RequestId, Q>; N],
    responses: &mut UpChannel,
    id: RequestId,
    line: &str,
    now: Instant,
) -> bool {
    let mut host = RttHost::new(responses, now);

    let Some(mut request) = ConsoleRequest::parse(id, line) else {
        defmt::warn!("Console: unreadable request {}", id);
        reply(&mut host, id, Response::status(Status::BadRequest));
        return false;
    };

    let response = match request
        .channel_index()
        .and_then(|index| channels.get_mut(index))
    {
        Some(channel) => channel.handle(&mut request, &mut host),
        None => Response::status(Status::Pass),
    };

    match response.status {
        Status::Deferred => {}
        Status::Pass => {
            if !host.write_frame(id, NOT_FOUND, ContentType::Json.mime(), &[]) {
                defmt::warn!("Console: response {} dropped", id);
            }
        }
        _ => reply(&mut host, id, response),
    }

    matches!(host.requested(), Some(Schedule::After(_)))
}

fn reply(host: &mut RttHost<'_>, id: RequestId, response: Response<'_>) {
    if host.dispatch(id, response).is_err() {
        defmt::warn!("Console: response {} dropped", id);
    }
}
