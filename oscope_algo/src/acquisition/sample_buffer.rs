// Implements the rolling sample buffer and edge trigger of one oscilloscope channel.
// Runs from the ADC interrupt, one call per conversion, in constant time and without allocation.

// Key Features:
// - Accumulates raw 8 bit readings into a window of SAMPLE_SIZE bytes
// - Holds the window back until a configured edge (slope + level) is observed
// - Keeps the last EXTRA_SPACE bytes of a finished window as look-back for the next one

// Detailed Operation:
// While the trigger is armed the cursor does not move: each new reading is compared with the
// two readings before it and, if they do not form a monotonic edge crossing the level, the
// two most recent readings slide down one slot and the call returns. Once the edge is seen the
// cursor advances on every reading. Reaching SAMPLE_SIZE marks the window done; reaching the end
// of the buffer copies the tail to the head and starts the next window at EXTRA_SPACE - 1.
// While a done window is readable the trigger only arms once LOOKBACK readings sit in the tail,
// so the sliding look-back never reaches into buffer[..SAMPLE_SIZE].

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::trigger::{Slope, TriggerConfig};

/// Bytes in one completed window.
pub const SAMPLE_SIZE: usize = 100;
/// Tail bytes carried over to the head of the next window as trigger look-back.
pub const EXTRA_SPACE: usize = 20;
/// Total length of the rolling buffer.
pub const BUFFER_LEN: usize = SAMPLE_SIZE + EXTRA_SPACE;
/// Readings below the cursor the armed trigger compares against.
pub const LOOKBACK: usize = 2;

// The armed trigger reads LOOKBACK slots below the cursor, whose lowest value is EXTRA_SPACE - 1,
// and after completion arms at SAMPLE_SIZE + LOOKBACK, which must stay inside the tail
const _: () = assert!(EXTRA_SPACE > LOOKBACK && SAMPLE_SIZE > EXTRA_SPACE);

/// Rolling buffer, write cursor and trigger state of one channel.
pub struct SampleBuffer {
    buffer: [u8; BUFFER_LEN],

    /// Next slot to write, always in `EXTRA_SPACE - 1..BUFFER_LEN`.
    sample_ptr: usize,

    /// Edge condition that starts a window, inactive unless `enabled`.
    trigger: TriggerConfig,

    /// Edge seen for the window being filled.
    triggered: bool,

    /// A full window sits in `buffer[..SAMPLE_SIZE]`.
    sample_done: bool,
}

impl SampleBuffer {
    /// Empty buffer, positioned as if a window had just wrapped.
    pub const fn new() -> Self {
        Self {
            buffer: [0; BUFFER_LEN],
            sample_ptr: EXTRA_SPACE - 1,
            trigger: TriggerConfig::new(),
            triggered: false,
            sample_done: false,
        }
    }

    /// Stores one ADC reading. Called from interrupt context only.
    pub fn store_sample(&mut self, sample: u8) {
        let ptr = self.sample_ptr;
        self.buffer[ptr] = sample; // Stored first so the edge test sees it

        if self.trigger.enabled && !self.triggered && self.lookback_in_tail(ptr) {
            if !self.edge_at(ptr) {
                self.shift_lookback(ptr); // Noise or level not reached, keep waiting
                return;
            }
            self.fire_trigger();
        }

        self.advance();
    }

    /// Checks the reading at `ptr` against the two before it.
    #[inline(always)]
    fn edge_at(&self, ptr: usize) -> bool {
        let older = self.buffer[ptr - 2];
        let prev = self.buffer[ptr - 1];
        let current = self.buffer[ptr];
        let level = self.trigger.level;

        match self.trigger.slope {
            Slope::Rising => older <= prev && prev <= current && current as u16 >= level,
            Slope::Falling => older >= prev && prev >= current && current as u16 <= level,
        }
    }

    /// False while the look-back of `ptr` still overlaps a done window.
    #[inline(always)]
    fn lookback_in_tail(&self, ptr: usize) -> bool {
        !self.sample_done || ptr >= SAMPLE_SIZE + LOOKBACK
    }

    /// Drops the oldest of the look-back pair, the cursor stays put.
    #[inline(always)]
    fn shift_lookback(&mut self, ptr: usize) {
        self.buffer[ptr - 2] = self.buffer[ptr - 1];
        self.buffer[ptr - 1] = self.buffer[ptr];
    }

    fn advance(&mut self) {
        self.sample_ptr += 1;

        if self.sample_ptr == BUFFER_LEN {
            self.restart_window();
        }

        if self.sample_ptr == SAMPLE_SIZE {
            self.complete_window();
        }
    }

    #[inline(always)]
    fn fire_trigger(&mut self) {
        self.triggered = true;
    }

    #[inline(always)]
    fn complete_window(&mut self) {
        self.triggered = false;
        self.sample_done = true;
    }

    /// Wraps the cursor and carries the tail over as look-back for the next window.
    #[inline(always)]
    fn restart_window(&mut self) {
        self.sample_ptr = EXTRA_SPACE - 1;
        self.buffer.copy_within(SAMPLE_SIZE..BUFFER_LEN, 0);
        self.sample_done = false;
    }

    pub fn trigger(&self) -> TriggerConfig {
        self.trigger
    }

    /// Replaces the trigger configuration. A changed configuration re-arms the trigger so the
    /// new edge condition applies from the next reading; the current window stays readable.
    pub fn set_trigger(&mut self, trigger: TriggerConfig) {
        if trigger != self.trigger {
            self.trigger = trigger;
            self.triggered = false;
        }
    }

    #[inline(always)]
    pub fn is_done(&self) -> bool {
        self.sample_done
    }

    #[inline(always)]
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Current write cursor.
    pub fn cursor(&self) -> usize {
        self.sample_ptr
    }

    /// The window as last completed (meaningful while `is_done()`).
    pub fn window(&self) -> &[u8] {
        &self.buffer[..SAMPLE_SIZE]
    }

    /// The two readings the armed trigger compares against.
    pub fn lookback(&self) -> [u8; 2] {
        [
            self.buffer[self.sample_ptr - 2],
            self.buffer[self.sample_ptr - 1],
        ]
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
