// Drives ADC1 as the shared converter of every scope channel.
// One regular conversion at a time: the end of conversion interrupt reads the result, points
// the sequence at the next probe input and restarts, so inputs are sampled round robin.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    adc::{Adc, AdcConfig, AdcDevice, AdcInterrupt, Align, InputType, SampleTime},
    clocks::Clocks,
    pac::ADC1,
};

use oscope_algo::Multiplexer;

/// Conversions per second of one input with two inputs sharing ADC1.
pub const NOMINAL_SAMPLE_RATE: u16 = 4808;

pub struct ScopeAdc<const N: usize> {
    adc: Adc<ADC1>,
    /// ADC1 channel number of each multiplexer input.
    inputs: [u8; N],
    selected: usize,
}

impl<const N: usize> ScopeAdc<N> {
    pub fn new(adc1: ADC1, clock_cfg: &Clocks, inputs: [u8; N]) -> Self {
        let mut adc = Adc::new_adc1(
            adc1,
            AdcDevice::One,
            AdcConfig::default(),
            clock_cfg.systick(),
        );

        for &channel in inputs.iter() {
            adc.set_input_type(channel, InputType::SingleEnded);
            adc.set_sample_time(channel, SampleTime::T48);
        }
        adc.set_sequence_len(1);

        // Left aligned 12 bit result, the top byte is the 8 bit sample
        adc.set_align(Align::Left);
        adc.enable_interrupt(AdcInterrupt::EndOfConversion);

        defmt::debug!("ADC: {} inputs on ADC1", N);

        ScopeAdc {
            adc,
            inputs,
            selected: 0,
        }
    }

    /// Starts the first conversion, every following one is started from the interrupt.
    pub fn begin(&mut self) {
        self.select(0);
    }

    /// Result of the finished conversion, reduced to 8 bits. Clears the interrupt.
    #[inline(always)]
    pub fn read_sample(&mut self) -> u8 {
        self.adc.clear_interrupt(AdcInterrupt::EndOfConversion);
        (self.adc.read_result() >> 8) as u8
    }
}

impl<const N: usize> Multiplexer for ScopeAdc<N> {
    fn selected(&self) -> usize {
        self.selected
    }

    fn select(&mut self, input: usize) {
        self.selected = input;
        if let Some(&channel) = self.inputs.get(input) {
            self.adc.start_conversion(&[channel]);
        }
    }
}
