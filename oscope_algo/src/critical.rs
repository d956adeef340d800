// Scoped critical section. Interrupt delivery is suspended from `enter()` until the guard
// is dropped, whatever path leaves the scope.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::marker::PhantomData;

use critical_section::RestoreState;

/// RAII guard over the platform critical section.
pub struct CriticalSection {
    restore: RestoreState,
    _not_send: PhantomData<*mut ()>, // Must be released on the context that acquired it
}

impl CriticalSection {
    /// Suspends interrupt delivery until the returned guard is dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        // SAFETY: the matching release happens exactly once, in Drop
        let restore = unsafe { critical_section::acquire() };
        Self {
            restore,
            _not_send: PhantomData,
        }
    }

    /// Token proving the section is held, used to borrow `critical_section::Mutex` contents.
    #[inline(always)]
    pub fn token(&self) -> critical_section::CriticalSection<'_> {
        // SAFETY: the token cannot outlive `self`, which keeps the section held
        unsafe { critical_section::CriticalSection::new() }
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        // SAFETY: `restore` came from the acquire in `enter` and is released once
        unsafe { critical_section::release(self.restore) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use critical_section::Mutex;

    #[test]
    fn token_borrows_shared_state() {
        let shared = Mutex::new(Cell::new(5u8));
        {
            let guard = CriticalSection::enter();
            shared.borrow(guard.token()).set(7);
        }
        let guard = CriticalSection::enter();
        assert_eq!(shared.borrow(guard.token()).get(), 7);
    }

    #[test]
    fn sections_nest() {
        let outer = CriticalSection::enter();
        {
            let _inner = CriticalSection::enter();
        }
        let shared = Mutex::new(Cell::new(1u8));
        assert_eq!(shared.borrow(outer.token()).get(), 1);
    }
}
