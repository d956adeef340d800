// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Edge direction the trigger waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slope {
    Rising,
    Falling,
}

/// Trigger configuration, written by the foreground and read by the ADC interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// When false every sample is accumulated, windows complete back to back.
    pub enabled: bool,
    pub slope: Slope,
    /// Level the triggering sample must reach (rising) or fall to (falling).
    pub level: u16,
}

impl TriggerConfig {
    /// `tf` bit: triggering enabled.
    pub const FLAG_ON: u8 = 1 << 0;
    /// `tf` bit: rising slope.
    pub const FLAG_SLOPE_UP: u8 = 1 << 1;

    pub const DEFAULT_LEVEL: u16 = 128;

    /// Free running, armed for a falling edge at mid scale once enabled (`tf` = 0).
    pub const fn new() -> Self {
        Self {
            enabled: false,
            slope: Slope::Falling,
            level: Self::DEFAULT_LEVEL,
        }
    }

    /// Encodes the configuration as the `tf` flag byte of the parameters document.
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.enabled {
            flags |= Self::FLAG_ON;
        }
        if self.slope == Slope::Rising {
            flags |= Self::FLAG_SLOPE_UP;
        }
        flags
    }

    /// Applies a `tf` flag value. Bits other than on/slope are status bits and ignored.
    pub fn with_flags(self, flags: u32) -> Self {
        Self {
            enabled: flags & Self::FLAG_ON as u32 != 0,
            slope: if flags & Self::FLAG_SLOPE_UP as u32 != 0 {
                Slope::Rising
            } else {
                Slope::Falling
            },
            ..self
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::new()
    }
}
