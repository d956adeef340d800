// Implements the bounded queue of requests waiting for the next completed window.

// Key Features:
// - Fixed capacity, a full queue rejects instead of evicting older entries
// - Entries keep their arrival instant, so the head is always the oldest one
// - Age based eviction from the head only, stopping at the first live entry

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use heapless::Deque;

use crate::error::{ChannelError, Result};
use crate::{Duration, Instant};

/// A queued exchange and the uptime it arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending<E> {
    pub exchange: E,
    pub age: Instant,
}

impl<E> Pending<E> {
    /// True once the entry has waited longer than `max_age`.
    #[inline(always)]
    pub fn is_expired(&self, now: Instant, max_age: Duration) -> bool {
        self.age + max_age < now
    }
}

/// FIFO of pending exchanges, oldest first.
pub struct RequestQueue<E, const N: usize> {
    queue: Deque<Pending<E>, N>,
}

impl<E, const N: usize> RequestQueue<E, N> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Appends at the tail, fails without side effects when full.
    pub fn enqueue(&mut self, exchange: E, now: Instant) -> Result<()> {
        self.queue
            .push_back(Pending { exchange, age: now })
            .map_err(|_| ChannelError::QueueFull)
    }

    pub fn peek(&self) -> Option<&Pending<E>> {
        self.queue.front()
    }

    pub fn dequeue(&mut self) -> Option<Pending<E>> {
        self.queue.pop_front()
    }

    /// Puts a just dequeued entry back at the head, keeping its age.
    pub fn requeue_front(&mut self, pending: Pending<E>) -> Result<()> {
        self.queue
            .push_front(pending)
            .map_err(|_| ChannelError::QueueFull)
    }

    /// Removes the head if it has expired.
    pub fn evict_expired(&mut self, now: Instant, max_age: Duration) -> Option<Pending<E>> {
        if self.peek()?.is_expired(now, max_age) {
            self.dequeue()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pending<E>> {
        self.queue.iter()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }
}

impl<E, const N: usize> Default for RequestQueue<E, N> {
    fn default() -> Self {
        Self::new()
    }
}
