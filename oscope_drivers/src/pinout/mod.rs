use hal::gpio::{Pin, PinMode, Port};

pub mod analog;
pub mod led;

/// Represents the definition of a GPIO pin.
pub struct PinDef {
    /// The port to which the pin belongs (e.g., Port::A, Port::B).
    port: Port,
    /// The pin number within the port.
    pin: u8,
    /// The mode of the pin (e.g., Output, Analog).
    mode: PinMode,
}

impl PinDef {
    /// Configures the pin and hands out the HAL handle.
    /// # Example
    /// ```ignore
    /// let mut heartbeat = led::GRN.init();
    /// heartbeat.toggle();
    /// ```
    pub fn init(&self) -> Pin {
        Pin::new(self.port, self.pin, self.mode)
    }
}
