//! Host interface for user-visible output.
//!
//! The engine writes the target's boot banner, target log text and the
//! advisories in [`crate::status::Advisory`] through this trait.  It also
//! gives the application a turn on every iteration of the execution poll
//! loop, so a UI can stay responsive while the target runs.
//!
//! # Possible implementations
//!
//! - For a command line debugger: write to stdout, and install a Ctrl-C
//!   handler that calls [`CancelHandle::interrupt()`] while one is offered
//! - For a GUI: append to a console widget, and pump the event loop from
//!   [`HostInterface::ui_poll()`]

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use core::fmt;

use crate::cancel::CancelHandle;

/// Host interface trait.
pub trait HostInterface {
    /// Write raw text for the user
    fn write(&mut self, text: &[u8]);

    /// Write a single character for the user
    fn write_char(&mut self, c: u8) {
        self.write(&[c]);
    }

    /// Formatted diagnostic output
    fn debug_print(&mut self, args: fmt::Arguments<'_>);

    /// Called on every turn of the execution poll loop
    fn ui_poll(&mut self) {}

    /// Install (`Some`) or remove (`None`) the application's interrupt
    /// handler.
    ///
    /// While installed, a user interrupt should call
    /// [`CancelHandle::interrupt()`] on the handle given.
    fn set_interrupt_handler(&mut self, handle: Option<CancelHandle>) {
        let _ = handle;
    }
}
