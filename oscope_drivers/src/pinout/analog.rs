//! Oscilloscope probe inputs. Both sit on ADC1, the channel number is the ADC1_INx index.
use super::PinDef;
use super::{PinMode, Port};

/// Probe input of scope channel 1, ADC1_IN1
pub const CH1: PinDef = PinDef {
    port: Port::A,
    pin: 0,
    mode: PinMode::Analog,
};

/// Probe input of scope channel 2, ADC1_IN2
pub const CH2: PinDef = PinDef {
    port: Port::A,
    pin: 1,
    mode: PinMode::Analog,
};

/// ADC1 channel numbers in multiplexer order.
pub const ADC1_INPUTS: [u8; 2] = [1, 2];

/// Configures every probe pin as analog input.
pub fn init_inputs() {
    for def in [CH1, CH2] {
        def.init();
    }
}
