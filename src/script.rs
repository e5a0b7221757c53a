//! Script files: a sequence of sized sections, each tagged by a magic word.
//!
//! A code section holds a header, auxiliary words and the compressed
//! instruction stream. A debug section holds the symbol tables for the code.

use crate::config::{ReaderOptions, RenderOptions};
use crate::debug_symbols::{
    Category, DebugSymbolTable, LineMarker, SourceFile, Symbol, TypeEntry,
};
use crate::disassembler::{render_debug_listing, Disassembler};
use crate::error::{FormatError, Result};
use crate::header::{CodeHeader, DebugHeader, CODE_MAGIC, DEBUG_MAGIC};
use crate::util::ByteReader;
use crate::varint::decompress_words;
use log::{debug, info, warn};

/// Zero bytes closing every debug section
const DEBUG_TRAILER_LEN: usize = 7;

/// Decompressed words of one code section.
///
/// The first `code_len` words are instructions, the rest is movement data.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionStream {
    words: Vec<i32>,
    code_len: usize,
}

impl InstructionStream {
    /// `code_len` is clamped to the number of words
    pub fn new(words: Vec<i32>, code_len: usize) -> Self {
        let code_len = code_len.min(words.len());
        InstructionStream { words, code_len }
    }

    pub fn code(&self) -> &[i32] {
        &self.words[..self.code_len]
    }

    pub fn movement(&self) -> &[i32] {
        &self.words[self.code_len..]
    }

    pub fn code_len(&self) -> usize {
        self.code_len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeSection {
    pub header: CodeHeader,
    pub aux: Vec<u32>,
    pub stream: InstructionStream,
}

impl CodeSection {
    /// Read a code section starting at the cursor. The cursor is left just
    /// after the last compressed byte.
    pub fn read(r: &mut ByteReader) -> Result<CodeSection> {
        let start = r.position();
        let header = CodeHeader::read(r)?;

        let aux = (0..header.aux_words()?)
            .map(|_| r.read_u32())
            .collect::<Result<Vec<u32>>>()?;
        r.seek(start + header.header_size as usize);

        let extracted = header.extracted_words()?;
        let code_len = match header.code_words() {
            Some(n) => n,
            None => {
                warn!(
                    "code size {:#x} outside of extracted size {:#x}, treating all words as code",
                    header.extracted_code_size, header.extracted_size
                );
                extracted
            }
        };

        let (words, consumed) = decompress_words(r.rest(), extracted)?;
        r.skip(consumed);
        debug!(
            "Code section at ${:04x}: {} words, {} code, {} compressed bytes",
            start, extracted, code_len, consumed
        );

        Ok(CodeSection {
            header,
            aux,
            stream: InstructionStream::new(words, code_len),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugSection {
    pub header: DebugHeader,
    pub table: DebugSymbolTable,
}

impl DebugSection {
    pub fn read(r: &mut ByteReader, options: &ReaderOptions) -> Result<DebugSection> {
        let header = DebugHeader::read(r)?;
        let max = options.max_string_len;
        let mut table = DebugSymbolTable::default();

        for _ in 0..header.count_files {
            let start = r.read_u32()?;
            let name = r.read_cstring(max)?;
            table.files.push(SourceFile { start, name });
        }

        for _ in 0..header.count_linenos {
            let start = r.read_u32()?;
            let line = r.read_u32()?;
            table.line_markers.push(LineMarker { start, line });
        }

        for _ in 0..header.count_symbols {
            let id = r.read_u32()?;
            let aux = r.read_u16()?;
            let range_start = r.read_u32()?;
            let range_end = r.read_u32()?;
            let raw = r.read_u32()?;
            let name = r.read_cstring(max)?;
            let category = Category::from_raw(raw)
                .ok_or(FormatError::UnknownCategory { id, category: raw })?;
            table.symbols.push(Symbol {
                id,
                aux,
                range_start,
                range_end,
                category,
                name,
            });
        }

        for _ in 0..header.count_types {
            let id = r.read_u16()?;
            let name = r.read_cstring(max)?;
            table.types.push(TypeEntry { id, name });
        }

        r.expect_zeros(DEBUG_TRAILER_LEN)?;

        Ok(DebugSection { header, table })
    }
}

/// The sections found in one script file. A later section of the same kind
/// replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptFile {
    pub code: Option<CodeSection>,
    pub debug: Option<DebugSection>,
}

/// Scan `bytes` section by section.
///
/// A section that reads short or long of its declared size is reported and
/// the scan continues at its declared end.
pub fn read_script(bytes: &[u8], options: &ReaderOptions) -> Result<ScriptFile> {
    let mut r = ByteReader::new(bytes);
    let mut script = ScriptFile::default();

    while r.remaining() >= 8 {
        let start = r.position();
        let size = r.peek_u32_at(start).unwrap_or(0);
        let magic = r.peek_u32_at(start + 4).unwrap_or(0);

        if size < 8 {
            return Err(FormatError::BadSectionSize {
                offset: start,
                size,
            });
        }

        match magic {
            CODE_MAGIC => {
                info!("Code section at ${:04x}, {} bytes", start, size);
                if script.code.is_some() {
                    warn!("Second code section at ${:04x} replaces the first", start);
                }
                script.code = Some(CodeSection::read(&mut r)?);
            }
            DEBUG_MAGIC => {
                info!("Debug section at ${:04x}, {} bytes", start, size);
                if script.debug.is_some() {
                    warn!("Second debug section at ${:04x} replaces the first", start);
                }
                script.debug = Some(DebugSection::read(&mut r, options)?);
            }
            _ => {
                return Err(FormatError::UnknownSection {
                    offset: start,
                    magic,
                })
            }
        }

        let declared_end = start + size as usize;
        if r.position() != declared_end {
            warn!(
                "Section at ${:04x} not read properly (size delta is {})",
                start,
                r.position() as i64 - declared_end as i64
            );
            r.seek(declared_end);
        }
    }

    if r.remaining() > 0 {
        debug!("Ignoring {} trailing bytes", r.remaining());
    }

    Ok(script)
}

/// Listing for whatever sections the script holds: code annotated with debug
/// symbols when both are present, otherwise whichever one exists.
pub fn render_script(script: &ScriptFile, options: &RenderOptions) -> Result<Vec<String>> {
    match (&script.code, &script.debug) {
        (Some(code), debug) => {
            let symbols = debug.as_ref().map(|d| &d.table);
            Ok(Disassembler::new(&code.stream, symbols, options.clone()).disassemble())
        }
        (None, Some(debug)) => Ok(render_debug_listing(debug, options)),
        (None, None) => Err(FormatError::NoSections),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CODE_HEADER_SIZE;
    use crate::varint::compress_words;
    use test_log::test;

    fn push_u32(bytes: &mut Vec<u8>, value: u32) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn code_section(words: &[i32], code_len: usize, aux: &[u32]) -> Vec<u8> {
        let header_size = CODE_HEADER_SIZE + 4 * aux.len() as u32;
        let compressed = compress_words(words);
        let size = header_size + compressed.len() as u32;

        let mut bytes = Vec::new();
        push_u32(&mut bytes, size);
        push_u32(&mut bytes, CODE_MAGIC);
        bytes.extend_from_slice(&[0; 4]);
        push_u32(&mut bytes, header_size);
        push_u32(&mut bytes, 0);
        push_u32(&mut bytes, header_size + 4 * words.len() as u32);
        push_u32(&mut bytes, header_size + 4 * code_len as u32);
        push_u32(&mut bytes, 0);
        for &a in aux {
            push_u32(&mut bytes, a);
        }
        bytes.extend_from_slice(&compressed);
        bytes
    }

    fn debug_section(symbols: &[(u32, u32, u32, u32, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        // one file, one line marker
        push_u32(&mut body, 0);
        body.extend_from_slice(b"main.scr\0");
        push_u32(&mut body, 0);
        push_u32(&mut body, 12);
        for &(id, start, end, category, name) in symbols {
            push_u32(&mut body, id);
            body.extend_from_slice(&0u16.to_le_bytes());
            push_u32(&mut body, start);
            push_u32(&mut body, end);
            push_u32(&mut body, category);
            body.extend_from_slice(name.as_bytes());
            body.push(0);
        }
        body.extend_from_slice(&7u16.to_le_bytes());
        body.extend_from_slice(b"int\0");
        body.extend_from_slice(&[0; 7]);

        let mut bytes = Vec::new();
        push_u32(&mut bytes, 22 + body.len() as u32);
        push_u32(&mut bytes, DEBUG_MAGIC);
        for count in [0u16, 1, 1, symbols.len() as u16, 1] {
            bytes.extend_from_slice(&count.to_le_bytes());
        }
        push_u32(&mut bytes, 0);
        bytes.extend_from_slice(&body);
        bytes
    }

    #[test]
    fn test_stream_regions() {
        let stream = InstructionStream::new(vec![1, 2, 3, 4, 5], 3);
        assert_eq!(stream.code(), &[1, 2, 3]);
        assert_eq!(stream.movement(), &[4, 5]);

        let clamped = InstructionStream::new(vec![1, 2], 10);
        assert_eq!(clamped.code_len(), 2);
        assert!(clamped.movement().is_empty());
    }

    #[test]
    fn test_read_code_section() {
        let bytes = code_section(&[0x2e, 0x30, 7, -1], 2, &[0xdead, 0xbeef]);
        let mut r = ByteReader::new(&bytes);
        let section = CodeSection::read(&mut r).unwrap();
        assert_eq!(r.position(), bytes.len());
        assert_eq!(section.aux, vec![0xdead, 0xbeef]);
        assert_eq!(section.stream.code(), &[0x2e, 0x30]);
        assert_eq!(section.stream.movement(), &[7, -1]);
    }

    #[test]
    fn test_code_size_out_of_bounds_means_all_code() {
        let mut bytes = code_section(&[0x2e, 0x30], 2, &[]);
        // extracted_code_size past extracted_size
        bytes[0x18..0x1c].copy_from_slice(&0x1000u32.to_le_bytes());
        let section = CodeSection::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(section.stream.code_len(), 2);
    }

    #[test]
    fn test_read_debug_section() {
        let bytes = debug_section(&[
            (0x40, 0, 0, 0x0009, "main"),
            (0x01, 0, 0x100, 0x0001, "money"),
        ]);
        let mut r = ByteReader::new(&bytes);
        let section = DebugSection::read(&mut r, &ReaderOptions::default()).unwrap();
        assert_eq!(r.position(), bytes.len());

        let table = &section.table;
        assert_eq!(table.files[0].name, "main.scr");
        assert_eq!(table.line_markers[0].line, 12);
        assert_eq!(table.symbols.len(), 2);
        assert_eq!(table.symbols[1].category, Category::Global);
        assert_eq!(table.types[0], TypeEntry { id: 7, name: "int".to_string() });
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let bytes = debug_section(&[(0x05, 0, 4, 0x0002, "odd")]);
        let err = DebugSection::read(&mut ByteReader::new(&bytes), &ReaderOptions::default())
            .unwrap_err();
        assert_eq!(err, FormatError::UnknownCategory { id: 5, category: 2 });
    }

    #[test]
    fn test_debug_trailer_must_be_zero() {
        let mut bytes = debug_section(&[]);
        let last = bytes.len() - 1;
        bytes[last] = 1;
        let err = DebugSection::read(&mut ByteReader::new(&bytes), &ReaderOptions::default())
            .unwrap_err();
        assert!(matches!(err, FormatError::NonZeroPadding { value: 1, .. }));
    }

    #[test]
    fn test_read_script_both_sections() {
        let mut bytes = code_section(&[0x2e, 0x30], 2, &[]);
        bytes.extend(debug_section(&[(0, 0, 0, 0x0009, "start")]));
        let script = read_script(&bytes, &ReaderOptions::default()).unwrap();
        assert!(script.code.is_some());
        assert!(script.debug.is_some());

        let lines = render_script(&script, &RenderOptions::default()).unwrap();
        assert!(lines.iter().any(|l| l == "start:"));
    }

    #[test]
    fn test_size_drift_resyncs() {
        let mut bytes = code_section(&[0x2e, 0x30], 2, &[]);
        // Declare four extra bytes of slack after the stream
        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) + 4;
        bytes[0..4].copy_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&[0xff; 4]);
        bytes.extend(debug_section(&[]));

        let script = read_script(&bytes, &ReaderOptions::default()).unwrap();
        assert!(script.code.is_some());
        assert!(script.debug.is_some());
    }

    #[test]
    fn test_unknown_section_is_fatal() {
        let mut bytes = Vec::new();
        push_u32(&mut bytes, 16);
        push_u32(&mut bytes, 0x1234_5678);
        bytes.extend_from_slice(&[0; 8]);
        let err = read_script(&bytes, &ReaderOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownSection {
                offset: 0,
                magic: 0x1234_5678
            }
        );
    }

    #[test]
    fn test_tiny_section_size_is_fatal() {
        let mut bytes = Vec::new();
        push_u32(&mut bytes, 4);
        push_u32(&mut bytes, CODE_MAGIC);
        let err = read_script(&bytes, &ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, FormatError::BadSectionSize { size: 4, .. }));
    }

    #[test]
    fn test_no_sections() {
        let script = read_script(&[], &ReaderOptions::default()).unwrap();
        assert_eq!(
            render_script(&script, &RenderOptions::default()),
            Err(FormatError::NoSections)
        );
    }

    #[test]
    fn test_debug_only_listing() {
        let bytes = debug_section(&[(0x01, 0, 0x100, 0x0001, "money")]);
        let script = read_script(&bytes, &ReaderOptions::default()).unwrap();
        let lines = render_script(&script, &RenderOptions::default()).unwrap();
        assert!(lines.iter().any(|l| l == "  [00000000] main.scr"));
        assert!(lines.iter().any(|l| l.ends_with("money")));
    }
}
