use super::PinDef;
use super::{PinMode, Port};

/// Heartbeat
pub const GRN: PinDef = PinDef {
    port: Port::B,
    pin: 14,
    mode: PinMode::Output,
};
