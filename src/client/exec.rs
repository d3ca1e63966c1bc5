//! Execution control.
//!
//! [`Session::execute()`] and [`Session::step()`] only wait for the target
//! to accept the request.  They then poll until the target sends a Stopped
//! notification, giving the host a turn on every iteration and forwarding
//! any pending cancellation to the target as an interrupt request.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::boxed::Box;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::{Handler, Packet, PumpMode, Transport};
use crate::client::{Buffer, Session};
use crate::codec::{Cursor, Field};
use crate::host::HostInterface;
use crate::protocol::{ChannelId, HEADER_SIZE, StopReason, TARGET_TO_HOST, hadp, tadp};
use crate::status::Status;
use crate::{Error, Result};

/// Called with the raw reason every time the target stops.  Returning an
/// error does not stop later observers from being called.
pub type StopObserver = Box<dyn FnMut(StopReason) -> core::result::Result<(), Status>>;

/// Why execution ended, translated from the target's [`StopReason`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Breakpoint,
    Watchpoint,
    /// Step finished inside the requested instruction count.  Never
    /// returned from [`Session::step()`], which reports
    /// [`StopOutcome::Completed`] instead.
    StepComplete,
    BranchThroughZero,
    UndefinedInstruction,
    SoftwareInterrupt,
    PrefetchAbort,
    DataAbort,
    AddressException,
    Irq,
    Fiq,
    /// The application exited, or a step completed
    Completed,
    UserInterrupt,
    /// Run time error, or a reason this host does not know
    Error,
}

impl From<StopReason> for StopOutcome {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::BranchThroughZero => StopOutcome::BranchThroughZero,
            StopReason::UndefinedInstr => StopOutcome::UndefinedInstruction,
            StopReason::SoftwareInterrupt => StopOutcome::SoftwareInterrupt,
            StopReason::PrefetchAbort => StopOutcome::PrefetchAbort,
            StopReason::DataAbort => StopOutcome::DataAbort,
            StopReason::AddressException => StopOutcome::AddressException,
            StopReason::Irq => StopOutcome::Irq,
            StopReason::Fiq => StopOutcome::Fiq,
            StopReason::BreakPoint => StopOutcome::Breakpoint,
            StopReason::WatchPoint => StopOutcome::Watchpoint,
            StopReason::StepComplete => StopOutcome::StepComplete,
            StopReason::UserInterruption | StopReason::OsSpecific => StopOutcome::UserInterrupt,
            StopReason::ApplicationExit => StopOutcome::Completed,
            StopReason::RunTimeErrorUnknown
            | StopReason::StackOverflow
            | StopReason::DivisionByZero
            | StopReason::InternalError
            | StopReason::Unknown(_) => StopOutcome::Error,
        }
    }
}

impl StopOutcome {
    /// Equivalent target status
    pub const fn status(&self) -> Status {
        match self {
            StopOutcome::Breakpoint => Status::BREAKPOINT_REACHED,
            StopOutcome::Watchpoint => Status::WATCHPOINT_ACCESSED,
            StopOutcome::StepComplete => Status::PROGRAM_FINISHED_IN_STEP,
            StopOutcome::BranchThroughZero => Status::BRANCH_THROUGH_0,
            StopOutcome::UndefinedInstruction => Status::UNDEFINED_INSTRUCTION,
            StopOutcome::SoftwareInterrupt => Status::SOFTWARE_INTERRUPT,
            StopOutcome::PrefetchAbort => Status::PREFETCH_ABORT,
            StopOutcome::DataAbort => Status::DATA_ABORT,
            StopOutcome::AddressException => Status::ADDRESS_EXCEPTION,
            StopOutcome::Irq => Status::IRQ,
            StopOutcome::Fiq => Status::FIQ,
            StopOutcome::Completed => Status::NO_ERROR,
            StopOutcome::UserInterrupt => Status::USER_INTERRUPT,
            StopOutcome::Error => Status::ERROR,
        }
    }
}

/// Result of running the target until it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub outcome: StopOutcome,
    /// Untranslated reason, as passed to the observers
    pub reason: StopReason,
    /// Auxiliary data from the notification.  For breakpoints and
    /// watchpoints, the handle of the point hit.
    pub handle: u32,
    /// Last failure returned by an observer, if any failed
    pub observer_status: Option<Status>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoppedInfo {
    pub(crate) reason: StopReason,
    pub(crate) handle: u32,
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Run the target from its current state until it stops.
    ///
    /// Blocks until a Stopped notification arrives.  To stop the target,
    /// call [`crate::cancel::CancelHandle::request_stop()`] or
    /// [`crate::cancel::CancelHandle::interrupt()`] from another context.
    pub fn execute(&mut self) -> Result<Stop> {
        self.run(hadp::EXECUTE, 0)
    }

    /// Step `ninstr` instructions
    pub fn step(&mut self, ninstr: u32) -> Result<Stop> {
        let mut stop = self.run(hadp::STEP, ninstr)?;
        if stop.outcome == StopOutcome::StepComplete {
            stop.outcome = StopOutcome::Completed;
        }
        Ok(stop)
    }

    /// Ask a running target to stop.  Takes effect on the next turn of the
    /// execution poll loop.
    pub fn request_stop(&self) {
        self.cancel.request_stop();
    }

    fn run(&mut self, op: u32, ninstr: u32) -> Result<Stop> {
        // Registered before the request, as the target may stop before the
        // acceptance reply has been processed
        self.router.register(ChannelId::TargetAdp, Handler::Stopped);
        self.stopped = None;
        self.executing = true;

        let accepted = self
            .request(op, &[Field::Word(ninstr)])
            .and_then(|reply| reply.check());
        if let Err(e) = accepted {
            debug!("Run request {op:#010X} failed: {e}");
            self.executing = false;
            self.router.unregister(ChannelId::TargetAdp);
            return Err(e);
        }
        debug!("Target running");

        self.cancel.clear();
        self.host.set_interrupt_handler(Some(self.cancel.clone()));

        let polled = self.poll_until_stopped();

        self.host.set_interrupt_handler(None);
        self.router.unregister(ChannelId::TargetAdp);
        polled?;

        let Some(info) = self.stopped.take() else {
            // Executing was cleared without a Stopped message being stored
            error!("Target stopped with no stop information");
            return Err(Error::InvalidOperation);
        };

        let mut observer_status = None;
        for observer in self.observers.iter_mut() {
            if let Err(status) = observer(info.reason) {
                warn!("Stop observer failed: {status}");
                observer_status = Some(status);
            }
        }

        let outcome = StopOutcome::from(info.reason);
        debug!("Target stopped: {:?} handle {:#X}", info.reason, info.handle);
        Ok(Stop {
            outcome,
            reason: info.reason,
            handle: info.handle,
            observer_status,
        })
    }

    fn poll_until_stopped(&mut self) -> Result<()> {
        while self.executing {
            self.host.ui_poll();
            if self.cancel.is_pending() {
                self.interrupt_target();
                self.cancel.clear();
            }
            self.pump(PumpMode::Poll)?;
        }
        Ok(())
    }

    /// Ask the target to stop.  The acknowledgement is waited for but
    /// its status is ignored: the Stopped notification is what matters.
    fn interrupt_target(&mut self) {
        debug!("Sending interrupt request");
        match self.exchange(hadp::INTERRUPT_REQUEST, &[], Buffer::Short) {
            Ok(packet) => trace!("Interrupt acknowledged: {:?}", packet.status()),
            Err(e) => warn!("Interrupt request failed: {e}"),
        }
    }

    pub(crate) fn handle_stopped(&mut self, packet: Packet) {
        let parsed = Cursor::new(&packet.data).word().and_then(|reason| {
            let mut body = Cursor::at(&packet.data, HEADER_SIZE)?;
            Ok((reason, body.word()?, body.word()?))
        });
        let (reason, stop_reason, handle) = match parsed {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Malformed Stopped message: {e}");
                return;
            }
        };

        if reason != tadp::STOPPED | TARGET_TO_HOST {
            warn!("Expected Stopped message, got {reason:#010X}");
            return;
        }

        if let Err(e) = self.send_message(
            ChannelId::TargetAdp,
            tadp::STOPPED,
            &[Field::Word(Status::NO_ERROR.0)],
            Buffer::Short,
        ) {
            warn!("Failed to acknowledge Stopped: {e}");
        }

        self.executing = false;
        self.stopped = Some(StoppedInfo {
            reason: StopReason::from(stop_reason),
            handle,
        });
    }
}
