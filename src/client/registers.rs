//! CPU and coprocessor register access.
//!
//! Registers are selected by a bit mask.  CPU registers are one word each.
//! Coprocessor registers may be wider, so coprocessor transfers need a
//! [`RegisterMap`], built from the description the target supplies via
//! [`Session::request_coprocessor_description()`].

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

use alloc::vec;
use alloc::vec::Vec;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::channel::Transport;
use crate::client::{NUM_COPROCESSORS, Session};
use crate::codec::Field;
use crate::host::HostInterface;
use crate::protocol::{COPRO_DESC_END, NUM_CPU_REGS, hadp, info as info_sub};
use crate::{Error, Result};

/// Description of a contiguous range of coprocessor registers of the same
/// width and access method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoproRegisterDesc {
    /// First register in the range
    pub rmin: u8,
    /// Last register in the range, inclusive
    pub rmax: u8,
    /// Width of each register in bytes
    pub nbytes: u8,
    /// Access method flags
    pub access: u8,
}

/// A register range plus the instruction bytes used to access it, as sent
/// to the target to describe a coprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoproDescEntry {
    pub desc: CoproRegisterDesc,
    /// For register transfer access, the read and write instruction bytes.
    /// For data transfer access, the read bits and N bit followed by two
    /// zero bytes.
    pub access_inst: [u8; 4],
}

impl CoproDescEntry {
    fn fields(&self) -> [Field<'static>; 8] {
        let d = &self.desc;
        let a = &self.access_inst;
        [
            Field::Byte(d.rmin),
            Field::Byte(d.rmax),
            Field::Byte(d.nbytes),
            Field::Byte(d.access),
            Field::Byte(a[0]),
            Field::Byte(a[1]),
            Field::Byte(a[2]),
            Field::Byte(a[3]),
        ]
    }
}

/// Words per register for one coprocessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMap {
    words: Vec<u8>,
}

impl RegisterMap {
    /// Build from the register ranges a target described.  Registers no
    /// range covers are zero words wide.
    pub fn from_descriptions(descs: &[CoproRegisterDesc]) -> Self {
        let len = descs
            .iter()
            .map(|d| d.rmax as usize + 1)
            .max()
            .unwrap_or(0);
        let mut words = vec![0u8; len];
        for d in descs {
            let width = (d.nbytes as usize).div_ceil(4) as u8;
            for reg in d.rmin..=d.rmax {
                words[reg as usize] = width;
            }
        }
        Self { words }
    }

    /// Number of registers
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Width of register `reg` in words
    pub fn words_for(&self, reg: usize) -> usize {
        self.words.get(reg).copied().unwrap_or(0) as usize
    }

    /// Total words transferred for the registers selected by `mask`
    pub fn word_count(&self, mask: u32) -> usize {
        (0..self.len().min(32))
            .filter(|&reg| mask & (1 << reg) != 0)
            .map(|reg| self.words_for(reg))
            .sum()
    }
}

/// Number of CPU registers selected by `mask`
fn cpu_register_count(mask: u32) -> usize {
    (mask & ((1 << NUM_CPU_REGS) - 1)).count_ones() as usize
}

impl<T: Transport, H: HostInterface> Session<T, H> {
    /// Read the CPU registers selected by `mask` in processor `mode`
    /// ([`crate::protocol::MODE_CURRENT`] for the current mode).
    ///
    /// Returns one word per selected register, lowest numbered first.
    pub fn read_cpu_registers(&mut self, mode: u8, mask: u32) -> Result<Vec<u32>> {
        let count = cpu_register_count(mask);
        let values = self
            .request(hadp::CPU_READ, &[Field::Byte(mode), Field::Word(mask)])?
            .check()?
            .words(count)?;
        trace!("CPU read mode {mode} mask {mask:#010X}");
        self.dump_cpu_registers(mask, &values);
        Ok(values)
    }

    /// Write the CPU registers selected by `mask` in processor `mode`.
    ///
    /// `values` must hold exactly one word per selected register.
    pub fn write_cpu_registers(&mut self, mode: u8, mask: u32, values: &[u32]) -> Result<()> {
        let count = cpu_register_count(mask);
        if values.len() != count {
            warn!("CPU write of {} values for {count} registers", values.len());
            return Err(Error::InvalidOperation);
        }
        trace!("CPU write mode {mode} mask {mask:#010X}");
        self.dump_cpu_registers(mask, values);

        let mut fields = Vec::with_capacity(count + 2);
        fields.push(Field::Byte(mode));
        fields.push(Field::Word(mask));
        fields.extend(values.iter().map(|&v| Field::Word(v)));
        self.request(hadp::CPU_WRITE, &fields)?.check()?;
        Ok(())
    }

    /// Read the registers of coprocessor `cpnum` selected by `mask`.
    ///
    /// Returns the registers' words back to back, lowest numbered register
    /// first.  The coprocessor must have been described.
    pub fn read_coprocessor_registers(&mut self, cpnum: u8, mask: u32) -> Result<Vec<u32>> {
        let count = self.coprocessor_word_count(cpnum, mask)?;
        let values = self
            .request(hadp::CP_READ, &[Field::Byte(cpnum), Field::Word(mask)])?
            .check()?
            .words(count)?;
        trace!("CP read cp {cpnum} mask {mask:#010X}");
        self.dump_coprocessor_registers(cpnum, mask, &values);
        Ok(values)
    }

    /// Write the registers of coprocessor `cpnum` selected by `mask`.
    ///
    /// `values` must hold exactly the words the selected registers occupy.
    pub fn write_coprocessor_registers(
        &mut self,
        cpnum: u8,
        mask: u32,
        values: &[u32],
    ) -> Result<()> {
        let count = self.coprocessor_word_count(cpnum, mask)?;
        if values.len() != count {
            warn!("CP {cpnum} write of {} words, {count} needed", values.len());
            return Err(Error::InvalidOperation);
        }
        trace!("CP write cp {cpnum} mask {mask:#010X}");
        self.dump_coprocessor_registers(cpnum, mask, values);

        let mut fields = Vec::with_capacity(count + 2);
        fields.push(Field::Byte(cpnum));
        fields.push(Field::Word(mask));
        fields.extend(values.iter().map(|&v| Field::Word(v)));
        self.request(hadp::CP_WRITE, &fields)?.check()?;
        Ok(())
    }

    /// Ask the target to describe coprocessor `cpnum`, and cache the
    /// resulting [`RegisterMap`] for register transfers.
    ///
    /// Fails with [`Error::BufferFull`] if the target describes more than
    /// `capacity` register ranges.
    pub fn request_coprocessor_description(
        &mut self,
        cpnum: u8,
        capacity: usize,
    ) -> Result<Vec<CoproRegisterDesc>> {
        let slot = Self::coprocessor_slot(cpnum)?;
        let reply = self
            .sub_request(hadp::INFO, info_sub::REQUEST_COPRO_DESC, &[Field::Byte(cpnum)])?
            .check()?;

        let mut cursor = reply.payload()?;
        let mut descs = Vec::new();
        loop {
            let first = cursor.byte()?;
            if first == COPRO_DESC_END {
                break;
            }
            if descs.len() == capacity {
                warn!("Coprocessor {cpnum} has more than {capacity} register ranges");
                return Err(Error::BufferFull);
            }
            descs.push(CoproRegisterDesc {
                rmin: first,
                rmax: cursor.byte()?,
                nbytes: cursor.byte()?,
                access: cursor.byte()?,
            });
        }

        debug!("Coprocessor {cpnum} described with {} ranges", descs.len());
        self.coprocessors[slot] = Some(RegisterMap::from_descriptions(&descs));
        Ok(descs)
    }

    /// Describe coprocessor `cpnum` to the target.
    ///
    /// Only attempted if the target reports coprocessor support.
    pub fn describe_coprocessor(&mut self, cpnum: u8, entries: &[CoproDescEntry]) -> Result<()> {
        Self::coprocessor_slot(cpnum)?;
        self.sub_command(hadp::INFO, info_sub::COPRO, &[])?;

        let mut fields = Vec::with_capacity(entries.len() * 8 + 2);
        fields.push(Field::Byte(cpnum));
        for entry in entries {
            fields.extend(entry.fields());
        }
        fields.push(Field::Byte(COPRO_DESC_END));
        self.sub_command(hadp::INFO, info_sub::DESCRIBE_COPRO, &fields)
    }

    fn coprocessor_slot(cpnum: u8) -> Result<usize> {
        let slot = cpnum as usize;
        if slot >= NUM_COPROCESSORS {
            warn!("No such coprocessor {cpnum}");
            return Err(Error::InvalidOperation);
        }
        Ok(slot)
    }

    fn coprocessor_word_count(&self, cpnum: u8, mask: u32) -> Result<usize> {
        let slot = Self::coprocessor_slot(cpnum)?;
        match &self.coprocessors[slot] {
            Some(map) => Ok(map.word_count(mask)),
            None => Err(Error::UnknownCoprocessor(cpnum)),
        }
    }

    fn dump_cpu_registers(&mut self, mask: u32, values: &[u32]) {
        if self.trace_level & 1 == 0 {
            return;
        }
        let selected = (0..NUM_CPU_REGS).filter(|reg| mask & (1 << reg) != 0);
        for (i, (reg, value)) in selected.zip(values).enumerate() {
            let sep = if i % 4 == 0 { "\n" } else { " " };
            self.host.debug_print(format_args!("{sep}r{reg}={value:08x}"));
        }
        self.host.debug_print(format_args!("\n"));
    }

    fn dump_coprocessor_registers(&mut self, cpnum: u8, mask: u32, values: &[u32]) {
        if self.trace_level & 1 == 0 {
            return;
        }
        let Some(map) = self.coprocessors[cpnum as usize].as_ref() else {
            return;
        };
        let mut values = values.iter();
        for reg in (0..map.len().min(32)).filter(|&reg| mask & (1 << reg) != 0) {
            self.host.debug_print(format_args!("{reg:2}"));
            for value in values.by_ref().take(map.words_for(reg)) {
                self.host.debug_print(format_args!(" {value:08x}"));
            }
            self.host.debug_print(format_args!("\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(rmin: u8, rmax: u8, nbytes: u8) -> CoproRegisterDesc {
        CoproRegisterDesc {
            rmin,
            rmax,
            nbytes,
            access: 0,
        }
    }

    #[test]
    fn map_rounds_widths_up_to_words() {
        let map = RegisterMap::from_descriptions(&[desc(0, 3, 4), desc(4, 4, 12), desc(6, 6, 5)]);
        assert_eq!(map.len(), 7);
        assert_eq!(map.words_for(0), 1);
        assert_eq!(map.words_for(4), 3);
        assert_eq!(map.words_for(5), 0);
        assert_eq!(map.words_for(6), 2);
        assert_eq!(map.words_for(40), 0);
    }

    #[test]
    fn word_count_sums_selected_registers() {
        let map = RegisterMap::from_descriptions(&[desc(0, 1, 4), desc(2, 2, 8)]);
        assert_eq!(map.word_count(0b111), 4);
        assert_eq!(map.word_count(0b100), 2);
        // Bits beyond the map select nothing
        assert_eq!(map.word_count(0xFFFF_FFF8), 0);
    }

    #[test]
    fn cpu_mask_counts_only_real_registers() {
        assert_eq!(cpu_register_count(0), 0);
        assert_eq!(cpu_register_count(0x7FFFF), 19);
        assert_eq!(cpu_register_count(0xFFFF_FFFF), 19);
        assert_eq!(cpu_register_count(0b1010), 2);
    }
}
