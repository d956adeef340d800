//! Board support for the oscilloscope firmware: pin map and the multiplexed sampling ADC.
#![no_std]

pub mod adc;
pub mod pinout;
