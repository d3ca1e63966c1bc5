//! Info, control and capability queries.
//!
//! [`Session::info()`] dispatches one [`InfoRequest`] to whichever request
//! family implements it.  A few requests never reach the target: they
//! read or change session state.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::string::ToString;
use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::Transport;
use crate::client::Session;
use crate::codec::Field;
use crate::host::HostInterface;
use crate::protocol::{WRITE_HEADER_SIZE, ctrl, hadp, iceb, icem, info as info_sub, profile};
use crate::status::Status;
use crate::{Error, Result};

/// A query or setting, and its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoRequest<'a> {
    /// Target capability words
    Target,
    /// Breakpoint and watchpoint capabilities
    Points,
    /// Step capabilities
    Step,
    Mmu,
    /// Whether semihosting is supported
    SemiHosting,
    /// Whether coprocessor descriptions are supported
    CoPro,
    /// Cycle counters
    Cycles,
    /// Largest data block one download message can carry
    AgentBufferSize,
    CanTargetExecute,
    AgentEndianness,
    /// Whether agent download is supported
    DownloadSupported,
    VectorCatch(u32),
    SemiHostingSetState(u32),
    SemiHostingGetState,
    SemiHostingSetVector(u32),
    SemiHostingGetVector,
    SemiHostingSetArmSwi(u32),
    SemiHostingGetArmSwi,
    SemiHostingSetThumbSwi(u32),
    SemiHostingGetThumbSwi,
    SetTopMem(u32),
    /// Status of the watchpoint with the given handle
    PointStatusWatch(u32),
    /// Status of the breakpoint with the given handle
    PointStatusBreak(u32),
    /// Whether EmbeddedICE is present
    Icebreaker,
    IcebreakerGetLocks,
    IcebreakerSetLocks(u32),
    ConfigCount,
    ProfileStart(u32),
    ProfileStop,
    ProfileClearCounts,
    /// Whether the given request could be changed.  Only
    /// [`InfoRequest::SemiHostingSetArmSwi`] is ever supported.
    CapabilityOf(&'a InfoRequest<'a>),
    /// Ask the target to stop at the next opportunity
    SignalStop,
    /// Set the session's register trace level
    SetLog(u32),
    /// Read the session's register trace level
    Log,
    /// Store the command line for the application
    SetCommandLine(&'a str),
}

/// Answer to an [`InfoRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoReply {
    Empty,
    Word(u32),
    Words(u32, u32),
    Cycles([u32; info_sub::CYCLES_WORDS]),
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Make a query, or change a setting.
    ///
    /// Returns [`Error::Unimplemented`] for anything the target does not
    /// support.
    pub fn info(&mut self, request: InfoRequest<'_>) -> Result<InfoReply> {
        use InfoRequest as R;

        trace!("Info {request:?}");
        match request {
            R::Target => {
                let words = self.info_words(hadp::INFO, info_sub::TARGET, &[], 2)?;
                Ok(InfoReply::Words(words[0], words[1]))
            }
            R::Points => self.query(hadp::INFO, info_sub::POINTS),
            R::Step => self.query(hadp::INFO, info_sub::STEP),
            R::Mmu => self.query(hadp::INFO, info_sub::MMU),
            R::SemiHosting => self.probe(hadp::INFO, info_sub::SEMIHOSTING),
            R::CoPro => self.probe(hadp::INFO, info_sub::COPRO),
            R::Cycles => {
                let words = self.info_words(
                    hadp::INFO,
                    info_sub::CYCLES,
                    &[],
                    info_sub::CYCLES_WORDS,
                )?;
                let mut cycles = [0u32; info_sub::CYCLES_WORDS];
                cycles.copy_from_slice(&words);
                Ok(InfoReply::Cycles(cycles))
            }
            R::AgentBufferSize => {
                let words = self.info_words(hadp::INFO, info_sub::AGENT_BUFFER_SIZE, &[], 2)?;
                let long = words[1].saturating_sub(WRITE_HEADER_SIZE as u32);
                debug!("Agent buffers {} and {}, load size {long}", words[0], words[1]);
                Ok(InfoReply::Word(long))
            }
            R::CanTargetExecute => self.probe(hadp::INFO, info_sub::CAN_TARGET_EXECUTE),
            R::AgentEndianness => self.agent_endianness(),
            R::DownloadSupported => self.probe(hadp::CONTROL, ctrl::DOWNLOAD_SUPPORTED),
            R::VectorCatch(v) => self.setting(hadp::CONTROL, ctrl::VECTOR_CATCH, v),
            R::SemiHostingSetState(v) => self.setting(hadp::CONTROL, ctrl::SH_SET_STATE, v),
            R::SemiHostingGetState => self.query(hadp::CONTROL, ctrl::SH_GET_STATE),
            R::SemiHostingSetVector(v) => self.setting(hadp::CONTROL, ctrl::SH_SET_VECTOR, v),
            R::SemiHostingGetVector => self.query(hadp::CONTROL, ctrl::SH_GET_VECTOR),
            R::SemiHostingSetArmSwi(v) => self.setting(hadp::CONTROL, ctrl::SH_SET_ARM_SWI, v),
            R::SemiHostingGetArmSwi => self.query(hadp::CONTROL, ctrl::SH_GET_ARM_SWI),
            R::SemiHostingSetThumbSwi(v) => {
                self.setting(hadp::CONTROL, ctrl::SH_SET_THUMB_SWI, v)
            }
            R::SemiHostingGetThumbSwi => self.query(hadp::CONTROL, ctrl::SH_GET_THUMB_SWI),
            R::SetTopMem(v) => self.setting(hadp::CONTROL, ctrl::SET_TOP_MEM, v),
            R::PointStatusWatch(handle) => self.point_status(ctrl::POINT_STATUS_WATCH, handle),
            R::PointStatusBreak(handle) => self.point_status(ctrl::POINT_STATUS_BREAK, handle),
            R::Icebreaker => self.probe(hadp::ICEBREAKER, iceb::EXISTS),
            R::IcebreakerGetLocks => self.query(hadp::ICEBREAKER, iceb::GET_LOCKS),
            R::IcebreakerSetLocks(v) => self.setting(hadp::ICEBREAKER, iceb::SET_LOCKS, v),
            R::ConfigCount => self.query(hadp::ICEMAN, icem::CONFIG_COUNT),
            R::ProfileStart(interval) => self.setting(hadp::PROFILE, profile::START, interval),
            R::ProfileStop => self.probe(hadp::PROFILE, profile::STOP),
            R::ProfileClearCounts => self.probe(hadp::PROFILE, profile::CLEAR_COUNTS),
            R::CapabilityOf(R::SemiHostingSetArmSwi(_)) => {
                self.probe(hadp::INFO, info_sub::CHANGEABLE_SH_SWI)
            }
            R::CapabilityOf(other) => {
                debug!("No capability request for {other:?}");
                Err(Error::Unimplemented)
            }
            R::SignalStop => {
                if self.cancel.is_interrupted() {
                    debug!("Previous interrupt still pending");
                }
                self.cancel.interrupt();
                Ok(InfoReply::Empty)
            }
            R::SetLog(level) => {
                self.trace_level = level;
                Ok(InfoReply::Empty)
            }
            R::Log => Ok(InfoReply::Word(self.trace_level)),
            R::SetCommandLine(line) => {
                self.command_line = Some(line.to_string());
                Ok(InfoReply::Empty)
            }
        }
    }

    /// Sub-request with no arguments, answered by status alone
    fn probe(&mut self, op: u32, sub: u32) -> Result<InfoReply> {
        self.sub_command(op, sub, &[])?;
        Ok(InfoReply::Empty)
    }

    /// Sub-request with no arguments, answered by one word
    fn query(&mut self, op: u32, sub: u32) -> Result<InfoReply> {
        self.sub_query_word(op, sub, &[]).map(InfoReply::Word)
    }

    /// Sub-request with one word argument, answered by status alone
    fn setting(&mut self, op: u32, sub: u32, value: u32) -> Result<InfoReply> {
        self.sub_command(op, sub, &[Field::Word(value)])?;
        Ok(InfoReply::Empty)
    }

    /// A conforming agent answers with an endianness status.  Anything else
    /// means it cannot say.
    fn agent_endianness(&mut self) -> Result<InfoReply> {
        let status = self
            .sub_request(hadp::INFO, info_sub::AGENT_ENDIANNESS, &[])?
            .status()?;
        match status {
            Status::LITTLE_ENDIAN | Status::BIG_ENDIAN => Ok(InfoReply::Word(status.0)),
            other => {
                debug!("Agent endianness unknown, status {other}");
                Err(Error::Unimplemented)
            }
        }
    }

    fn point_status(&mut self, sub: u32, handle: u32) -> Result<InfoReply> {
        let words = self.info_words(hadp::CONTROL, sub, &[Field::Word(handle)], 2)?;
        Ok(InfoReply::Words(words[0], words[1]))
    }

    fn info_words(
        &mut self,
        op: u32,
        sub: u32,
        fields: &[Field<'_>],
        count: usize,
    ) -> Result<Vec<u32>> {
        self.sub_request(op, sub, fields)?.check()?.words(count)
    }
}
