//! Zone resources: a fixed header, an auxiliary table and two code sections
//! back to back.

use std::fmt::{Display, Error, Formatter};

use crate::config::RenderOptions;
use crate::disassembler::Disassembler;
use crate::error::{FormatError, Result};
use crate::script::CodeSection;
use crate::util::ByteReader;
use crossterm::style::Stylize;
use log::{debug, warn};

pub const ZONE_MAGIC: u32 = 0x0004_4F5A;

const HEADER_WORDS: usize = 0x1C;

/// u16 fields per entry, for each of the five auxiliary groups
pub const AUX_ENTRY_WIDTHS: [usize; 5] = [10, 24, 12, 12, 12];

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneHeader {
    pub magic: u32,
    pub unk1: u32,
    pub unk2: u32,
    pub code2_offset: u32,
    pub file_size: u32,
    pub file_size2: u32,
    pub unk3: [u16; HEADER_WORDS],
}

impl ZoneHeader {
    pub fn read(r: &mut ByteReader) -> Result<ZoneHeader> {
        let offset = r.position();
        let magic = r.read_u32()?;
        if magic != ZONE_MAGIC {
            return Err(FormatError::BadMagic {
                expected: ZONE_MAGIC,
                found: magic,
                offset,
            });
        }

        let unk1 = r.read_u32()?;
        let unk2 = r.read_u32()?;
        let code2_offset = r.read_u32()?;
        let file_size = r.read_u32()?;
        let file_size2 = r.read_u32()?;
        let mut unk3 = [0u16; HEADER_WORDS];
        for field in unk3.iter_mut() {
            *field = r.read_u16()?;
        }

        Ok(ZoneHeader {
            magic,
            unk1,
            unk2,
            code2_offset,
            file_size,
            file_size2,
            unk3,
        })
    }
}

impl Display for ZoneHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        writeln!(
            f,
            "  unk1={:04x}  unk2={:04x}  code2_offset={:04x}  filesize=({:x} {:x})",
            self.unk1, self.unk2, self.code2_offset, self.file_size, self.file_size2
        )?;
        write!(f, "  unk3=")?;
        for row in self.unk3.chunks(7) {
            write!(f, "\n    ")?;
            for field in row {
                write!(f, " {:4x}", field)?;
            }
        }
        Ok(())
    }
}

/// The five groups of fixed-width entries following the zone header
#[derive(Debug, Clone, PartialEq)]
pub struct AuxTable {
    pub size: u32,
    pub groups: Vec<Vec<Vec<u16>>>,
}

impl AuxTable {
    /// Read the table at the cursor, leaving the cursor at its declared end
    pub fn read(r: &mut ByteReader) -> Result<AuxTable> {
        let start = r.position();
        let size = r.read_u32()?;
        let mut counts = [0u8; 5];
        for count in counts.iter_mut() {
            *count = r.read_u8()?;
        }
        r.expect_zeros(3)?;

        let mut groups = Vec::with_capacity(AUX_ENTRY_WIDTHS.len());
        for (&count, &width) in counts.iter().zip(AUX_ENTRY_WIDTHS.iter()) {
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let fields = (0..width)
                    .map(|_| r.read_u16())
                    .collect::<Result<Vec<u16>>>()?;
                entries.push(fields);
            }
            groups.push(entries);
        }

        let declared_end = start + size as usize + 4;
        if r.position() != declared_end {
            warn!(
                "Aux table not read properly (size delta is {}, @ ${:x})",
                r.position() as i64 - declared_end as i64,
                r.position()
            );
            r.seek(declared_end);
        }

        Ok(AuxTable { size, groups })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub header: ZoneHeader,
    pub aux: AuxTable,
    pub code1: CodeSection,
    pub code2: CodeSection,
}

pub fn read_zone(bytes: &[u8]) -> Result<Zone> {
    let mut r = ByteReader::new(bytes);
    let header = ZoneHeader::read(&mut r)?;
    let aux = AuxTable::read(&mut r)?;

    let start = r.position();
    let code1 = CodeSection::read(&mut r)?;
    let declared_end = start + code1.header.section_size as usize;
    if r.position() != declared_end {
        warn!(
            "First code section not read properly (size delta is {})",
            r.position() as i64 - declared_end as i64
        );
        r.seek(declared_end);
    }
    r.align_to(4);

    debug!("Second code section at ${:04x}", r.position());
    let code2 = CodeSection::read(&mut r)?;

    Ok(Zone {
        header,
        aux,
        code1,
        code2,
    })
}

/// Header, auxiliary entries and both code sections as a text listing
pub fn render_zone(zone: &Zone, options: &RenderOptions) -> Vec<String> {
    let title = |name: &str| {
        let name = if options.color {
            name.bold().to_string()
        } else {
            name.to_string()
        };
        format!("===> {} <===", name)
    };
    let mut output = Vec::new();

    output.push(title("Header"));
    output.extend(zone.header.to_string().lines().map(str::to_string));
    output.push(String::new());

    output.push(title("Aux"));
    for (g, entries) in zone.aux.groups.iter().enumerate() {
        if g > 0 {
            output.push("  ----".to_string());
        }
        for (i, fields) in entries.iter().enumerate() {
            let mut line = format!("  {:2}:", i);
            for field in fields {
                line.push_str(&format!(" {:4x}", field));
            }
            output.push(line);
        }
    }
    output.push(String::new());

    output.push(title("code1"));
    output.extend(Disassembler::new(&zone.code1.stream, None, options.clone()).disassemble());
    output.push(String::new());

    output.push(title("code2"));
    output.extend(Disassembler::new(&zone.code2.stream, None, options.clone()).disassemble());

    output
}
