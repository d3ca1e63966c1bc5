//! Cooperative cancellation.
//!
//! Two flags, set from wherever the application handles asynchronous
//! interrupts (a Ctrl-C handler, another thread, a UI callback) and polled
//! by the engine while it waits:
//! - **interrupt** - the user wants the target stopped, or wants to stop
//!   waiting for it to boot
//! - **stop** - the program wants the target stopped
//!
//! Nothing is aborted mid-exchange.  A running target is asked to stop with
//! an explicit interrupt request, which it may honour at its own pace.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to a session's cancellation flags
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    interrupt: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// User interrupt.  Safe to call from any context.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// Programmatic stop request.  Safe to call from any context.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Either flag is set
    pub fn is_pending(&self) -> bool {
        self.is_interrupted() || self.is_stop_requested()
    }

    /// Clear the interrupt flag only
    pub(crate) fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::SeqCst);
    }

    /// Clear both flags
    pub(crate) fn clear(&self) {
        self.interrupt.store(false, Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
    }
}
