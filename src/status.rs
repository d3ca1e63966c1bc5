//! Target status codes, and the advisories the host shows the user.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use core::fmt;

/// Status word reported by the target in a reply.
///
/// Zero is success.  Anything else is a target-side failure, and is
/// returned to callers as [`crate::Error::Target`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    pub const NO_ERROR: Status = Status(0);
    pub const RESET: Status = Status(1);
    pub const UNDEFINED_INSTRUCTION: Status = Status(2);
    pub const SOFTWARE_INTERRUPT: Status = Status(3);
    pub const PREFETCH_ABORT: Status = Status(4);
    pub const DATA_ABORT: Status = Status(5);
    pub const ADDRESS_EXCEPTION: Status = Status(6);
    pub const IRQ: Status = Status(7);
    pub const FIQ: Status = Status(8);
    pub const ERROR: Status = Status(9);
    pub const BRANCH_THROUGH_0: Status = Status(10);
    pub const NOT_INITIALISED: Status = Status(128);
    pub const UNABLE_TO_INITIALISE: Status = Status(129);
    pub const WRONG_BYTE_SEX: Status = Status(130);
    pub const UNABLE_TO_TERMINATE: Status = Status(131);
    pub const BAD_INSTRUCTION: Status = Status(132);
    pub const ILLEGAL_INSTRUCTION: Status = Status(133);
    pub const BAD_CPU_STATE_SETTING: Status = Status(134);
    pub const UNKNOWN_COPRO: Status = Status(135);
    pub const UNKNOWN_COPRO_STATE: Status = Status(136);
    pub const BAD_COPRO_STATE: Status = Status(137);
    pub const BAD_POINT_TYPE: Status = Status(138);
    pub const UNIMPLEMENTED_TYPE: Status = Status(139);
    pub const BAD_POINT_SIZE: Status = Status(140);
    pub const UNIMPLEMENTED_SIZE: Status = Status(141);
    pub const NO_MORE_POINTS: Status = Status(142);
    pub const BREAKPOINT_REACHED: Status = Status(143);
    pub const WATCHPOINT_ACCESSED: Status = Status(144);
    pub const NO_SUCH_POINT: Status = Status(145);
    pub const PROGRAM_FINISHED_IN_STEP: Status = Status(146);
    pub const USER_INTERRUPT: Status = Status(147);
    pub const CANT_SET_POINT: Status = Status(148);
    pub const INCOMPATIBLE_RDI_LEVELS: Status = Status(149);
    pub const CANT_LOAD_CONFIG: Status = Status(150);
    pub const BAD_CONFIG_DATA: Status = Status(151);
    pub const NO_SUCH_CONFIG: Status = Status(152);
    pub const BUFFER_FULL: Status = Status(153);
    pub const OUT_OF_STORE: Status = Status(154);
    pub const NOT_IN_DOWNLOAD: Status = Status(155);
    pub const POINT_IN_USE: Status = Status(156);
    pub const BAD_IMAGE_FORMAT: Status = Status(157);
    pub const TARGET_RUNNING: Status = Status(158);
    pub const DEVICE_WOULD_NOT_OPEN: Status = Status(159);
    pub const NO_SUCH_HANDLE: Status = Status(160);
    pub const CONFLICTING_POINT: Status = Status(161);
    pub const LITTLE_ENDIAN: Status = Status(240);
    pub const BIG_ENDIAN: Status = Status(241);
    pub const SOFT_INITIALISE_ERROR: Status = Status(242);
    pub const INSUFFICIENT_PRIVILEGE: Status = Status(253);
    pub const UNIMPLEMENTED_MESSAGE: Status = Status(254);
    pub const UNDEFINED_MESSAGE: Status = Status(255);

    pub const fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// Converts to `Ok(())` for success, or [`crate::Error::Target`]
    pub fn check(self) -> crate::Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(crate::Error::Target(self))
        }
    }

    /// Human readable description, if this is a known status
    pub fn message(&self) -> Option<&'static str> {
        let text = match *self {
            Status::NO_ERROR => "no error",
            Status::RESET => "target reset",
            Status::UNDEFINED_INSTRUCTION => "undefined instruction",
            Status::SOFTWARE_INTERRUPT => "software interrupt",
            Status::PREFETCH_ABORT => "prefetch abort",
            Status::DATA_ABORT => "data abort",
            Status::ADDRESS_EXCEPTION => "address exception",
            Status::IRQ => "IRQ",
            Status::FIQ => "FIQ",
            Status::ERROR => "error",
            Status::BRANCH_THROUGH_0 => "branch through zero",
            Status::NOT_INITIALISED => "not initialised",
            Status::UNABLE_TO_INITIALISE => "unable to initialise",
            Status::WRONG_BYTE_SEX => "wrong byte sex",
            Status::UNABLE_TO_TERMINATE => "unable to terminate",
            Status::BAD_INSTRUCTION => "bad instruction",
            Status::ILLEGAL_INSTRUCTION => "illegal instruction",
            Status::BAD_CPU_STATE_SETTING => "bad CPU state setting",
            Status::UNKNOWN_COPRO => "unknown coprocessor",
            Status::UNKNOWN_COPRO_STATE => "unknown coprocessor state",
            Status::BAD_COPRO_STATE => "bad coprocessor state",
            Status::BAD_POINT_TYPE => "bad point type",
            Status::UNIMPLEMENTED_TYPE => "unimplemented point type",
            Status::BAD_POINT_SIZE => "bad point size",
            Status::UNIMPLEMENTED_SIZE => "unimplemented point size",
            Status::NO_MORE_POINTS => "no more points",
            Status::BREAKPOINT_REACHED => "breakpoint reached",
            Status::WATCHPOINT_ACCESSED => "watchpoint accessed",
            Status::NO_SUCH_POINT => "no such point",
            Status::PROGRAM_FINISHED_IN_STEP => "program finished in step",
            Status::USER_INTERRUPT => "user interrupt",
            Status::CANT_SET_POINT => "cannot set point",
            Status::INCOMPATIBLE_RDI_LEVELS => "incompatible interface levels",
            Status::CANT_LOAD_CONFIG => "cannot load configuration",
            Status::BAD_CONFIG_DATA => "bad configuration data",
            Status::NO_SUCH_CONFIG => "no such configuration",
            Status::BUFFER_FULL => "buffer full",
            Status::OUT_OF_STORE => "out of store",
            Status::NOT_IN_DOWNLOAD => "not in download",
            Status::POINT_IN_USE => "point in use",
            Status::BAD_IMAGE_FORMAT => "bad image format",
            Status::TARGET_RUNNING => "target running",
            Status::DEVICE_WOULD_NOT_OPEN => "device would not open",
            Status::NO_SUCH_HANDLE => "no such handle",
            Status::CONFLICTING_POINT => "conflicting point",
            Status::LITTLE_ENDIAN => "little endian target",
            Status::BIG_ENDIAN => "big endian target",
            Status::SOFT_INITIALISE_ERROR => "soft initialise error",
            Status::INSUFFICIENT_PRIVILEGE => "insufficient privilege",
            Status::UNIMPLEMENTED_MESSAGE => "unimplemented message",
            Status::UNDEFINED_MESSAGE => "undefined message",
            _ => return None,
        };
        Some(text)
    }
}

impl From<u32> for Status {
    fn from(value: u32) -> Self {
        Status(value)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(text) => f.write_str(text),
            None => write!(f, "unknown status {:#X}", self.0),
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status({} {:?})", self.0, self.message().unwrap_or("?"))
    }
}

/// Messages written to the host for the user, outside of any reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// The target was already running when the host reset it
    LateStartup,
    /// The user gave up waiting for the target to boot
    AbandonBootWait,
    /// A replacement debug agent is about to be started
    NewAgentStarting,
}

impl Advisory {
    pub const fn text(&self) -> &'static str {
        match self {
            Advisory::LateStartup => {
                "Target is already running.  Reset the target, or press Ctrl-C to stop waiting\n"
            }
            Advisory::AbandonBootWait => "Abandoned waiting for the target to boot\n",
            Advisory::NewAgentStarting => {
                "Starting new debug agent.  Reset the target if it does not start\n"
            }
        }
    }
}
