// Implements the channel resource: protocol handling and the cooperative maintenance task that
// hands completed windows to the requests waiting for them.

// Key Features:
// - GET on the channel root answers with the current window or defers the request
// - GET/POST on `pr` read and update sampling rate and trigger settings
// - `run()` times out stale requests, drains the queue once a window is ready and tells the
//   host when it wants to run again; nothing here ever blocks

// Detailed Operation:
// A channel moves between Idle (nothing queued), Waiting (requests queued, no window) and
// Ready (requests queued and a window to copy). `handle()` enqueues into Waiting and asks for a
// run after `poll_interval`. Each `run()` first evicts expired requests from the head of the
// queue with a timeout response, then either drains every request with its own snapshot or
// polls again. A response the host cannot take puts its request back at the head and ends the
// run, so no request is lost; it is retried on the next pass or ages out.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

pub mod params;
pub mod request_queue;

use crate::acquisition::{Acquisition, SnapshotPool, TriggerConfig};
use crate::error::ChannelError;
use crate::resource::{Body, Host, Method, Request, Response, Schedule, Status};
use crate::Duration;

use params::ParamsUpdate;
use request_queue::{Pending, RequestQueue};

/// Path segment of the parameters sub-resource.
pub const PARAMS_SEGMENT: &str = "pr";

/// Runtime configuration of a channel. Volatile, back to these values on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Samples per second, informational only, the converter free runs.
    pub sampling_rate: u16,
    pub trigger: TriggerConfig,
    /// A request waiting longer than this is answered with a timeout.
    pub max_request_age: Duration,
    /// Delay between maintenance runs while requests wait for a window.
    pub poll_interval: Duration,
}

impl ChannelConfig {
    /// Two channels sharing a converter at roughly 9.6 k conversions per second.
    pub const DEFAULT_SAMPLING_RATE: u16 = 4808;

    pub const fn new() -> Self {
        Self {
            sampling_rate: Self::DEFAULT_SAMPLING_RATE,
            trigger: TriggerConfig::new(),
            max_request_age: Duration::millis(1000),
            poll_interval: Duration::millis(1),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Conceptual state of a channel as seen by its maintenance task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    Idle,
    Waiting,
    Ready,
}

/// Foreground side of one oscilloscope input.
///
/// `E` is the framework's exchange handle, `Q` the request queue capacity.
pub struct Channel<'a, E, const Q: usize> {
    /// 1-based channel number, used in log messages.
    number: u8,
    /// Buffer and trigger state shared with the ADC interrupt.
    acquisition: &'a Acquisition,
    /// Blocks that sample responses are copied into.
    snapshots: &'a SnapshotPool,
    /// Requests deferred until the next completed window, oldest first.
    queue: RequestQueue<E, Q>,
    /// Reported sampling rate in samples per second, not applied to the converter.
    sampling_rate: u16,
    /// Waiting time after which a request is answered with a timeout.
    max_request_age: Duration,
    /// Delay between maintenance runs while requests wait.
    poll_interval: Duration,
}

impl<'a, E, const Q: usize> Channel<'a, E, Q> {
    /// Creates channel `number` over its acquisition state and applies `config`.
    pub fn new(
        number: u8,
        acquisition: &'a Acquisition,
        snapshots: &'a SnapshotPool,
        config: ChannelConfig,
    ) -> Self {
        acquisition.set_trigger(config.trigger);
        info!("Channel {} ready", number);

        Self {
            number,
            acquisition,
            snapshots,
            queue: RequestQueue::new(),
            sampling_rate: config.sampling_rate,
            max_request_age: config.max_request_age,
            poll_interval: config.poll_interval,
        }
    }

    /// Protocol entry point, `request` is positioned on this channel's segment.
    pub fn handle<R, H>(&mut self, request: &mut R, host: &mut H) -> Response<'a>
    where
        R: Request<Exchange = E>,
        H: Host<E>,
    {
        match request.to_destination() {
            0 => self.handle_sample(request, host),
            1 => {
                request.next();
                if request.current() == PARAMS_SEGMENT {
                    return self.handle_params(request);
                }
                request.previous(); // Let the framework try other resources from here
                Response::status(Status::Pass)
            }
            _ => Response::status(Status::Pass),
        }
    }

    fn handle_sample<R, H>(&mut self, request: &R, host: &mut H) -> Response<'a>
    where
        R: Request<Exchange = E>,
        H: Host<E>,
    {
        if request.method() != Method::Get {
            return Response::status(Status::NotImplemented);
        }

        if self.acquisition.is_done() {
            match self.acquisition.snapshot(self.snapshots) {
                Ok(snapshot) => {
                    debug!("Channel {}: sample ready", self.number);
                    return Response::with_body(Status::Ok, Body::Sample(snapshot));
                }
                Err(ChannelError::OutOfMemory) => {
                    warn!("Channel {}: no snapshot block left", self.number);
                    return Response::status(Status::ServiceUnavailable);
                }
                Err(_) => {} // Wrapped since the check, wait for the next window
            }
        }

        match self.queue.enqueue(request.exchange(), host.uptime()) {
            Ok(()) => {
                debug!("Channel {}: sample not ready, {} waiting", self.number, self.queue.len());
                host.schedule(Schedule::After(self.poll_interval));
                Response::status(Status::Deferred)
            }
            Err(_) => {
                warn!("Channel {}: request queue full", self.number);
                Response::status(Status::ServiceUnavailable)
            }
        }
    }

    fn handle_params<R: Request>(&mut self, request: &R) -> Response<'a> {
        match request.method() {
            Method::Post => match ParamsUpdate::from_request(request) {
                Ok(update) => {
                    self.apply(&update);
                    self.params_response()
                }
                Err(_) => {
                    warn!("Channel {}: malformed parameters rejected", self.number);
                    Response::status(Status::BadRequest)
                }
            },
            Method::Get => self.params_response(),
            Method::Other => Response::status(Status::NotImplemented),
        }
    }

    /// Applies a validated update, trigger fields in one critical section.
    pub fn apply(&mut self, update: &ParamsUpdate) {
        if let Some(rate) = update.sampling_rate {
            self.sampling_rate = rate;
        }
        if update.touches_trigger() {
            self.acquisition
                .update_trigger(|trigger| update.apply_trigger(trigger));
        }
        debug!("Channel {}: parameters updated", self.number);
    }

    /// Shared by GET and POST on `pr`.
    fn params_response(&self) -> Response<'a> {
        match params::render(self.sampling_rate, &self.acquisition.trigger()) {
            Ok(doc) => Response::with_body(Status::Ok, Body::Params(doc)),
            Err(_) => Response::status(Status::ServiceUnavailable),
        }
    }

    /// Maintenance task, invoked by the host's scheduler and never re-entered.
    pub fn run<H: Host<E>>(&mut self, host: &mut H) {
        let now = host.uptime();

        while let Some(expired) = self.queue.evict_expired(now, self.max_request_age) {
            debug!("Channel {}: request too old", self.number);
            let Pending { exchange, age } = expired;
            if let Err(exchange) = host.dispatch(exchange, Response::status(Status::RequestTimeout)) {
                self.retry_later(Pending { exchange, age }, host);
                return;
            }
        }

        match self.state() {
            ChannelState::Idle => host.schedule(Schedule::Never),
            ChannelState::Waiting => host.schedule(Schedule::After(self.poll_interval)),
            ChannelState::Ready => self.drain(host),
        }
    }

    /// Answers every queued request, each with its own copy of the window.
    fn drain<H: Host<E>>(&mut self, host: &mut H) {
        debug!("Channel {}: delivering to {} requests", self.number, self.queue.len());

        while let Some(pending) = self.queue.dequeue() {
            let response = match self.acquisition.snapshot(self.snapshots) {
                Ok(snapshot) => Response::with_body(Status::Ok, Body::Sample(snapshot)),
                Err(ChannelError::NotReady) => {
                    // Acquisition wrapped mid drain, the rest waits for the next window
                    self.retry_later(pending, host);
                    return;
                }
                Err(_) => {
                    warn!("Channel {}: no snapshot block left", self.number);
                    Response::status(Status::ServiceUnavailable)
                }
            };

            let Pending { exchange, age } = pending;
            if let Err(exchange) = host.dispatch(exchange, response) {
                self.retry_later(Pending { exchange, age }, host);
                return;
            }
        }

        host.schedule(Schedule::Never);
    }

    fn retry_later<H: Host<E>>(&mut self, pending: Pending<E>, host: &mut H) {
        if self.queue.requeue_front(pending).is_err() {
            warn!("Channel {}: request dropped", self.number);
        }
        host.schedule(Schedule::After(self.poll_interval));
    }

    pub fn state(&self) -> ChannelState {
        if self.queue.is_empty() {
            ChannelState::Idle
        } else if self.acquisition.is_done() {
            ChannelState::Ready
        } else {
            ChannelState::Waiting
        }
    }

    pub fn sampling_rate(&self) -> u16 {
        self.sampling_rate
    }

    pub fn trigger(&self) -> TriggerConfig {
        self.acquisition.trigger()
    }

    /// Requests waiting for a window.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> &RequestQueue<E, Q> {
        &self.queue
    }
}
