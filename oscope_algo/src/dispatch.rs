// Routes ADC conversions to the channel that produced them.
// Several inputs share one converter: each end of conversion interrupt reads which input was
// converted, points the multiplexer at the next one, then stores the reading.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::acquisition::Acquisition;

/// Analog input selection of the converter.
pub trait Multiplexer {
    /// Input index the pending result belongs to.
    fn selected(&self) -> usize;

    /// Selects the input converted next.
    fn select(&mut self, input: usize);
}

/// Acquisition state of every input, indexed by multiplexer input.
/// Filled once at start-up and read-only afterwards.
pub struct ChannelRegistry<'a, const N: usize> {
    channels: [&'a Acquisition; N],
}

impl<'a, const N: usize> ChannelRegistry<'a, N> {
    pub const fn new(channels: [&'a Acquisition; N]) -> Self {
        Self { channels }
    }

    pub fn get(&self, input: usize) -> Option<&'a Acquisition> {
        self.channels.get(input).copied()
    }
}

/// Interrupt side entry point of the acquisition path.
pub struct AdcDispatch<'a, const N: usize> {
    registry: ChannelRegistry<'a, N>,
}

impl<'a, const N: usize> AdcDispatch<'a, N> {
    const _HAS_INPUTS: () = assert!(N > 0);

    pub const fn new(registry: ChannelRegistry<'a, N>) -> Self {
        let _ = Self::_HAS_INPUTS;
        Self { registry }
    }

    /// Input to convert after `input`, wrapping after the last one.
    #[inline(always)]
    pub fn next_input(input: usize) -> usize {
        if input >= N - 1 {
            0
        } else {
            input + 1
        }
    }

    /// Handles one end of conversion: advances the multiplexer, then stores `raw` for the
    /// input it was converted from. Constant time, no allocation.
    #[inline(always)]
    pub fn on_conversion<M: Multiplexer>(&self, mux: &mut M, raw: u8) {
        let input = mux.selected();
        mux.select(Self::next_input(input));

        if let Some(acquisition) = self.registry.get(input) {
            acquisition.store_sample(raw);
        }
    }
}
