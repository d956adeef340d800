#![no_std]

// Core of an oscilloscope channel: the interrupt side stores ADC readings and detects the
// trigger edge, the foreground side hands completed windows to polling clients.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod channel;
pub mod critical;
pub mod dispatch;
pub mod error;
pub mod resource;

pub use acquisition::{Acquisition, Slope, TriggerConfig};
pub use channel::{Channel, ChannelConfig};
pub use dispatch::{AdcDispatch, ChannelRegistry, Multiplexer};
pub use error::{ChannelError, Result};
pub use resource::{Body, ContentType, Host, Method, Request, Response, Schedule, Status};

/// Uptime instant with millisecond ticks, same base as the SysTick monotonic.
pub type Instant = fugit::TimerInstantU32<1_000>;

/// Millisecond duration matching [`Instant`].
pub type Duration = fugit::MillisDurationU32;
