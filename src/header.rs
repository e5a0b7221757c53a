use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::{FormatError, Result};
use crate::util::ByteReader;

pub const CODE_MAGIC: u32 = 0x0A0A_F1E0;
pub const DEBUG_MAGIC: u32 = 0x0A0A_F1EF;

/// Fixed part of a code section header, in bytes
pub const CODE_HEADER_SIZE: u32 = 0x20;

fn expect_magic(r: &mut ByteReader, expected: u32) -> Result<u32> {
    let offset = r.position();
    let found = r.read_u32()?;
    if found != expected {
        return Err(FormatError::BadMagic {
            expected,
            found,
            offset,
        });
    }
    Ok(found)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeHeader {
    pub section_size: u32,
    pub magic: u32,
    pub unk1: u16,
    pub unk2: u16,
    /// Offset from section start to the compressed stream
    pub header_size: u32,
    pub unk4: u32,
    /// Boundary of code plus movement data
    pub extracted_size: u32,
    /// Boundary of the code region
    pub extracted_code_size: u32,
    pub unk6: u32,
}

impl CodeHeader {
    pub fn read(r: &mut ByteReader) -> Result<CodeHeader> {
        let section_size = r.read_u32()?;
        let magic = expect_magic(r, CODE_MAGIC)?;
        Ok(CodeHeader {
            section_size,
            magic,
            unk1: r.read_u16()?,
            unk2: r.read_u16()?,
            header_size: r.read_u32()?,
            unk4: r.read_u32()?,
            extracted_size: r.read_u32()?,
            extracted_code_size: r.read_u32()?,
            unk6: r.read_u32()?,
        })
    }

    /// Number of auxiliary words between the fixed header and the stream
    pub fn aux_words(&self) -> Result<usize> {
        self.header_size
            .checked_sub(CODE_HEADER_SIZE)
            .map(|n| n as usize / 4)
            .ok_or_else(|| {
                FormatError::BadHeader(format!(
                    "header size {:#x} is smaller than the fixed header",
                    self.header_size
                ))
            })
    }

    /// Total decompressed words (code and movement)
    pub fn extracted_words(&self) -> Result<usize> {
        self.extracted_size
            .checked_sub(self.header_size)
            .map(|n| n as usize / 4)
            .ok_or_else(|| {
                FormatError::BadHeader(format!(
                    "extracted size {:#x} precedes header size {:#x}",
                    self.extracted_size, self.header_size
                ))
            })
    }

    /// Decompressed words in the code region, if the boundary is sane
    pub fn code_words(&self) -> Option<usize> {
        if self.extracted_code_size < self.header_size
            || self.extracted_code_size > self.extracted_size
        {
            return None;
        }
        Some((self.extracted_code_size - self.header_size) as usize / 4)
    }
}

impl Display for CodeHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(
            f,
            "Section size:        {:#06x}
Header size:         {:#06x}
Extracted size:      {:#06x}
Extracted code size: {:#06x}
Unknowns:            {:04x} {:04x} {:08x} {:08x}",
            self.section_size,
            self.header_size,
            self.extracted_size,
            self.extracted_code_size,
            self.unk1,
            self.unk2,
            self.unk4,
            self.unk6,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugHeader {
    pub section_size: u32,
    pub magic: u32,
    /// Must be zero
    pub count_reserved: u16,
    pub count_files: u16,
    pub count_linenos: u16,
    pub count_symbols: u16,
    pub count_types: u16,
    pub unk1: u32,
}

impl DebugHeader {
    pub fn read(r: &mut ByteReader) -> Result<DebugHeader> {
        let section_size = r.read_u32()?;
        let magic = expect_magic(r, DEBUG_MAGIC)?;
        let header = DebugHeader {
            section_size,
            magic,
            count_reserved: r.read_u16()?,
            count_files: r.read_u16()?,
            count_linenos: r.read_u16()?,
            count_symbols: r.read_u16()?,
            count_types: r.read_u16()?,
            unk1: r.read_u32()?,
        };
        if header.count_reserved != 0 {
            return Err(FormatError::ReservedCount(header.count_reserved));
        }
        Ok(header)
    }
}

impl Display for DebugHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(
            f,
            "  #unk1: {:2}   #files: {:2}   #linenos: {:2}   #symbols: {:2}   #types: {:2}
  Unknowns: {:08x}",
            self.count_reserved,
            self.count_files,
            self.count_linenos,
            self.count_symbols,
            self.count_types,
            self.unk1,
        )
    }
}
