//! ADP wire constants: channel ids, reason codes, sub-reasons, header sizes
//! and stop reasons.
//!
//! A reason code is the channel id in bits 16-23, the operation number in
//! bits 0-15, and the direction in bit 31.  Sub-tagged families (Info,
//! Control, ICEbreaker, ICEman, Profile) carry their sub-reason in the
//! status word at offset 16, and sub-reasons are built the same way.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use crate::{Error, Result};

/// Host to target direction
pub const HOST_TO_TARGET: u32 = 0;

/// Target to host direction
pub const TARGET_TO_HOST: u32 = 1 << 31;

/// Value sent by the host in both OS handle words
pub const HANDLE_UNKNOWN: u32 = 0xFFFF_FFFF;

/// Size of the fixed header common to every message
pub const HEADER_SIZE: usize = 16;

/// Bytes reserved by the transport's channel layer in every buffer
pub const CHANNEL_HEADER_SIZE: usize = 4;

/// Buffer budget assumed before the target reports its own
pub const BUFFER_MIN_SIZE: usize = 256;

/// Header size of a memory read reply
pub const READ_HEADER_SIZE: usize = 24;

/// Header size of a memory write request
pub const WRITE_HEADER_SIZE: usize = 24;

/// Header size of a profile map write request
pub const PROFILE_WRITE_HEADER_SIZE: usize = 32;

/// Header size of a profile map read reply
pub const PROFILE_READ_HEADER_SIZE: usize = 24;

/// Number of CPU registers addressable by a register mask
pub const NUM_CPU_REGS: u32 = 19;

/// Processor mode meaning "whatever mode the CPU is currently in"
pub const MODE_CURRENT: u8 = 255;

/// Terminator of a coprocessor description list
pub const COPRO_DESC_END: u8 = 0xFF;

/// Logical channels multiplexed over the link
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Private = 0,
    HostAdp = 1,
    TargetAdp = 2,
    HostBoot = 3,
    TargetBoot = 4,
    CLib = 5,
    HostUserDebug = 6,
    TargetUserDebug = 7,
    HostComms = 8,
    TargetComms = 9,
    TargetLog = 10,
}

/// Number of logical channels
pub const NUM_CHANNELS: usize = 11;

impl ChannelId {
    /// Index of this channel into per-channel tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ChannelId::Private),
            1 => Ok(ChannelId::HostAdp),
            2 => Ok(ChannelId::TargetAdp),
            3 => Ok(ChannelId::HostBoot),
            4 => Ok(ChannelId::TargetBoot),
            5 => Ok(ChannelId::CLib),
            6 => Ok(ChannelId::HostUserDebug),
            7 => Ok(ChannelId::TargetUserDebug),
            8 => Ok(ChannelId::HostComms),
            9 => Ok(ChannelId::TargetComms),
            10 => Ok(ChannelId::TargetLog),
            _ => Err(Error::InvalidOperation),
        }
    }
}

/// Build a reason (or sub-reason) code from a channel and operation number
pub const fn reason(channel: ChannelId, op: u32) -> u32 {
    ((channel as u32 & 0xFF) << 16) | (op & 0xFFFF)
}

/// Reason code the target sends for any operation it does not recognise
pub const UNRECOGNISED: u32 = reason(ChannelId::HostAdp, 0);

/// Whether a received reason code is the "unrecognised operation" marker,
/// whatever its direction bit.
pub const fn is_unrecognised(code: u32) -> bool {
    code & 0x00FF_FFFF == UNRECOGNISED
}

/// Boot channel reason codes
pub mod boot {
    use super::{ChannelId, reason};

    pub const BOOTED: u32 = reason(ChannelId::TargetBoot, 0);
    pub const REBOOT: u32 = reason(ChannelId::HostBoot, 2);
    pub const RESET: u32 = reason(ChannelId::HostBoot, 3);
    pub const PARAM_NEGOTIATE: u32 = reason(ChannelId::HostBoot, 5);
    pub const LINK_CHECK: u32 = reason(ChannelId::HostBoot, 6);

    /// Reset acknowledged before the target booted
    pub const NORMAL_ACK: u32 = 0;
    /// Reset acknowledged by a target that was already running
    pub const LATE_ACK: u32 = 1;
    pub const ERROR: u32 = 2;

    /// Host wants a little-endian target
    pub const HOST_FEATURE_LITTLE_END: u32 = 0x8000_0000;
    /// Host wants a big-endian target
    pub const HOST_FEATURE_BIG_END: u32 = 0x4000_0000;

    /// Bit of the Booted hardware status word set by a big-endian CPU
    pub const CPU_BIG_ENDIAN: u32 = 1 << 31;
}

/// Host originated debug channel reason codes
pub mod hadp {
    use super::{ChannelId, reason};

    const fn op(n: u32) -> u32 {
        reason(ChannelId::HostAdp, n)
    }

    pub const INFO: u32 = op(1);
    pub const CONTROL: u32 = op(2);
    pub const READ: u32 = op(3);
    pub const WRITE: u32 = op(4);
    pub const CPU_READ: u32 = op(5);
    pub const CPU_WRITE: u32 = op(6);
    pub const CP_READ: u32 = op(7);
    pub const CP_WRITE: u32 = op(8);
    pub const SET_BREAK: u32 = op(9);
    pub const CLEAR_BREAK: u32 = op(10);
    pub const SET_WATCH: u32 = op(11);
    pub const CLEAR_WATCH: u32 = op(12);
    pub const EXECUTE: u32 = op(13);
    pub const STEP: u32 = op(14);
    pub const INTERRUPT_REQUEST: u32 = op(15);
    pub const HW_EMULATION: u32 = op(16);
    pub const ICEBREAKER: u32 = op(17);
    pub const ICEMAN: u32 = op(18);
    pub const PROFILE: u32 = op(19);
    pub const INITIALISE_APPLICATION: u32 = op(20);
    pub const END: u32 = op(21);
}

/// Target originated debug channel reason codes
pub mod tadp {
    use super::{ChannelId, reason};

    pub const UNRECOGNISED: u32 = reason(ChannelId::TargetAdp, 0);
    pub const STOPPED: u32 = reason(ChannelId::TargetAdp, 1);
}

/// Comms channel reason codes
pub mod tdcc {
    use super::{ChannelId, reason};

    pub const TO_HOST: u32 = reason(ChannelId::TargetComms, 0);
    pub const FROM_HOST: u32 = reason(ChannelId::TargetComms, 1);
}

/// Sub-reasons of [`hadp::INFO`]
pub mod info {
    use super::{ChannelId, reason};

    const fn sub(n: u32) -> u32 {
        reason(ChannelId::HostAdp, n)
    }

    pub const NOP: u32 = sub(0);
    pub const TARGET: u32 = sub(1);
    pub const POINTS: u32 = sub(2);
    pub const STEP: u32 = sub(3);
    pub const MMU: u32 = sub(4);
    pub const SEMIHOSTING: u32 = sub(5);
    pub const COPRO: u32 = sub(6);
    pub const CYCLES: u32 = sub(7);
    pub const DESCRIBE_COPRO: u32 = sub(8);
    pub const REQUEST_COPRO_DESC: u32 = sub(9);
    pub const AGENT_BUFFER_SIZE: u32 = sub(10);
    pub const CHANGEABLE_SH_SWI: u32 = sub(11);
    pub const CAN_TARGET_EXECUTE: u32 = sub(12);
    pub const AGENT_ENDIANNESS: u32 = sub(13);

    /// Number of words in a cycle count reply
    pub const CYCLES_WORDS: usize = 12;
}

/// Sub-reasons of [`hadp::CONTROL`]
pub mod ctrl {
    use super::{ChannelId, reason};

    const fn sub(n: u32) -> u32 {
        reason(ChannelId::HostAdp, n)
    }

    pub const NOP: u32 = sub(0);
    pub const VECTOR_CATCH: u32 = sub(1);
    pub const POINT_STATUS_WATCH: u32 = sub(2);
    pub const POINT_STATUS_BREAK: u32 = sub(3);
    pub const SH_SET_STATE: u32 = sub(4);
    pub const SH_GET_STATE: u32 = sub(5);
    pub const SH_SET_VECTOR: u32 = sub(6);
    pub const SH_GET_VECTOR: u32 = sub(7);
    pub const LOG: u32 = sub(8);
    pub const SET_LOG: u32 = sub(9);
    pub const SH_SET_ARM_SWI: u32 = sub(10);
    pub const SH_GET_ARM_SWI: u32 = sub(11);
    pub const SH_SET_THUMB_SWI: u32 = sub(12);
    pub const SH_GET_THUMB_SWI: u32 = sub(13);
    pub const DOWNLOAD_SUPPORTED: u32 = sub(14);
    pub const DOWNLOAD_DATA: u32 = sub(15);
    pub const DOWNLOAD_AGENT: u32 = sub(16);
    pub const START_AGENT: u32 = sub(17);
    pub const SET_TOP_MEM: u32 = sub(18);
}

/// Sub-reasons of [`hadp::ICEBREAKER`]
pub mod iceb {
    use super::{ChannelId, reason};

    const fn sub(n: u32) -> u32 {
        reason(ChannelId::HostAdp, n)
    }

    pub const EXISTS: u32 = sub(0);
    pub const GET_LOCKS: u32 = sub(1);
    pub const SET_LOCKS: u32 = sub(2);
    pub const CC_EXISTS: u32 = sub(3);
    pub const CC_CONNECT_TO_HOST: u32 = sub(4);
    pub const CC_CONNECT_FROM_HOST: u32 = sub(5);
}

/// Sub-reasons of [`hadp::ICEMAN`]
pub mod icem {
    use super::{ChannelId, reason};

    const fn sub(n: u32) -> u32 {
        reason(ChannelId::HostAdp, n)
    }

    pub const ADD_CONFIG: u32 = sub(0);
    pub const SELECT_CONFIG: u32 = sub(1);
    pub const CONFIG_COUNT: u32 = sub(2);
    pub const CONFIG_NTH: u32 = sub(3);
}

/// Sub-reasons of [`hadp::PROFILE`]
pub mod profile {
    use super::{ChannelId, reason};

    const fn sub(n: u32) -> u32 {
        reason(ChannelId::HostAdp, n)
    }

    pub const SUPPORTED: u32 = sub(0);
    pub const STOP: u32 = sub(1);
    pub const START: u32 = sub(2);
    pub const WRITE_MAP: u32 = sub(3);
    pub const READ_MAP: u32 = sub(4);
    pub const CLEAR_COUNTS: u32 = sub(5);
}

/// Raw reason carried by a Stopped notification.
///
/// Observers registered with the session receive this value untranslated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BranchThroughZero,
    UndefinedInstr,
    SoftwareInterrupt,
    PrefetchAbort,
    DataAbort,
    AddressException,
    Irq,
    Fiq,
    BreakPoint,
    WatchPoint,
    StepComplete,
    RunTimeErrorUnknown,
    InternalError,
    UserInterruption,
    ApplicationExit,
    StackOverflow,
    DivisionByZero,
    OsSpecific,
    Unknown(u32),
}

impl StopReason {
    /// Wire value of this reason
    pub const fn code(&self) -> u32 {
        let n = match self {
            StopReason::BranchThroughZero => 0,
            StopReason::UndefinedInstr => 1,
            StopReason::SoftwareInterrupt => 2,
            StopReason::PrefetchAbort => 3,
            StopReason::DataAbort => 4,
            StopReason::AddressException => 5,
            StopReason::Irq => 6,
            StopReason::Fiq => 7,
            StopReason::BreakPoint => 32,
            StopReason::WatchPoint => 33,
            StopReason::StepComplete => 34,
            StopReason::RunTimeErrorUnknown => 35,
            StopReason::InternalError => 36,
            StopReason::UserInterruption => 37,
            StopReason::ApplicationExit => 38,
            StopReason::StackOverflow => 39,
            StopReason::DivisionByZero => 40,
            StopReason::OsSpecific => 41,
            StopReason::Unknown(code) => return *code,
        };
        reason(ChannelId::TargetAdp, n)
    }
}

impl From<u32> for StopReason {
    fn from(value: u32) -> Self {
        if value & !0xFFFF != reason(ChannelId::TargetAdp, 0) {
            return StopReason::Unknown(value);
        }
        match value & 0xFFFF {
            0 => StopReason::BranchThroughZero,
            1 => StopReason::UndefinedInstr,
            2 => StopReason::SoftwareInterrupt,
            3 => StopReason::PrefetchAbort,
            4 => StopReason::DataAbort,
            5 => StopReason::AddressException,
            6 => StopReason::Irq,
            7 => StopReason::Fiq,
            32 => StopReason::BreakPoint,
            33 => StopReason::WatchPoint,
            34 => StopReason::StepComplete,
            35 => StopReason::RunTimeErrorUnknown,
            36 => StopReason::InternalError,
            37 => StopReason::UserInterruption,
            38 => StopReason::ApplicationExit,
            39 => StopReason::StackOverflow,
            40 => StopReason::DivisionByZero,
            41 => StopReason::OsSpecific,
            _ => StopReason::Unknown(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_match_wire_values() {
        assert_eq!(boot::BOOTED, 0x0004_0000);
        assert_eq!(boot::RESET, 0x0003_0003);
        assert_eq!(hadp::READ, 0x0001_0003);
        assert_eq!(hadp::END, 0x0001_0015);
        assert_eq!(tadp::STOPPED, 0x0002_0001);
        assert_eq!(tdcc::FROM_HOST, 0x0009_0001);
        assert_eq!(info::AGENT_ENDIANNESS, 0x0001_000D);
    }

    #[test]
    fn unrecognised_ignores_direction() {
        assert!(is_unrecognised(UNRECOGNISED));
        assert!(is_unrecognised(UNRECOGNISED | TARGET_TO_HOST));
        assert!(!is_unrecognised(hadp::READ | TARGET_TO_HOST));
        assert!(!is_unrecognised(tadp::UNRECOGNISED | TARGET_TO_HOST));
    }

    #[test]
    fn stop_reasons_round_trip_through_wire_values() {
        for reason in [
            StopReason::BranchThroughZero,
            StopReason::Fiq,
            StopReason::BreakPoint,
            StopReason::OsSpecific,
        ] {
            assert_eq!(StopReason::from(reason.code()), reason);
        }
        assert_eq!(StopReason::from(0x0002_0020), StopReason::BreakPoint);
        assert_eq!(StopReason::from(0x0002_0008), StopReason::Unknown(0x0002_0008));
        assert_eq!(StopReason::from(0x0001_0020), StopReason::Unknown(0x0001_0020));
    }

    #[test]
    fn channel_ids_convert_from_raw() {
        assert_eq!(ChannelId::try_from(9), Ok(ChannelId::TargetComms));
        assert_eq!(ChannelId::try_from(11), Err(Error::InvalidOperation));
    }
}
