pub mod cli;
pub mod config;
pub mod debug_symbols;
pub mod disassembler;
pub mod error;
pub mod header;
pub mod instruction;
pub mod labels;
pub mod opcode_tables;
pub mod script;
pub mod util;
pub mod varint;
pub mod zone;


/*
Layout of a script resource with debug info

        00000   code section header (size, magic 0a0af1e0, sizes)
        00020   auxiliary words
        hdrsz   compressed instruction stream
                    code words, then movement words
        size    debug section header (size, magic 0a0af1ef, counts)
                    files, line markers, symbols, types
                    7 zero bytes
*/
