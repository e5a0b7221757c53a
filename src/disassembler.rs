use crate::config::RenderOptions;
use crate::debug_symbols::{placeholder_name, Category, DebugSymbolTable, SymbolPartition};
use crate::instruction::{Instruction, JumpMap};
use crate::labels::{Label, LabelTable};
use crate::opcode_tables::{HighHalf, Opcode};
use crate::script::{DebugSection, InstructionStream};
use crossterm::style::{Color, Stylize};
use log::debug;

const COMMENT_COLOR: Color = Color::AnsiValue(243);
const BANNER_WIDTH: usize = 74;
/// Indent of jump map arm lines, so they sit under the mnemonic column
const ARM_INDENT: usize = 24;
const MOVEMENT_WORDS_PER_LINE: usize = 3;

/// Positions of the next unprinted debug entry in each table
#[derive(Debug, Default)]
struct Cursors {
    file: usize,
    line: usize,
    global: usize,
    function: usize,
    local: usize,
}

/// Renders one instruction stream as a text listing.
///
/// A `Disassembler` is good for a single pass: `disassemble` consumes it.
pub struct Disassembler<'a> {
    stream: &'a InstructionStream,
    symbols: Option<&'a DebugSymbolTable>,
    partition: SymbolPartition<'a>,
    labels: LabelTable,
    options: RenderOptions,
    cursors: Cursors,
    output: Vec<String>,
}

impl<'a> Disassembler<'a> {
    pub fn new(
        stream: &'a InstructionStream,
        symbols: Option<&'a DebugSymbolTable>,
        options: RenderOptions,
    ) -> Self {
        let labels = LabelTable::resolve(stream.code());
        let partition = symbols.map(|table| table.partition()).unwrap_or_default();
        Disassembler {
            stream,
            symbols,
            partition,
            labels,
            options,
            cursors: Cursors::default(),
            output: Vec::new(),
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Render the code region, then the movement region
    pub fn disassemble(mut self) -> Vec<String> {
        let stream = self.stream;
        let code = stream.code();

        let mut i = 0;
        while i < code.len() {
            self.emit_debug_annotations(i);
            self.emit_function_header(i);
            i += self.emit_instruction(code, i);
        }

        if self.options.show_movement {
            self.emit_movement();
        }

        debug!(
            "Rendered {} code words into {} lines",
            code.len(),
            self.output.len()
        );
        self.output
    }

    fn comment(&self, text: &str) -> String {
        if self.options.color {
            text.with(COMMENT_COLOR).dim().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.options.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Print file banners, line numbers, globals, functions and locals that
    /// start at or before word `i`.
    fn emit_debug_annotations(&mut self, i: usize) {
        let table = match self.symbols {
            Some(table) => table,
            None => return,
        };
        let offset = (i * 4) as u32;

        while let Some(file) = table.files.get(self.cursors.file) {
            if file.start > offset {
                break;
            }
            self.emit_file_banner(&file.name);
            self.cursors.file += 1;
        }

        while let Some(marker) = table.line_markers.get(self.cursors.line) {
            if marker.start > offset {
                break;
            }
            let line = self.comment(&format!("; LineNo: {}", marker.line));
            self.output.push(line);
            self.cursors.line += 1;
        }

        while let Some(&sym) = self.partition.globals.get(self.cursors.global) {
            if sym.range_start > offset {
                break;
            }
            let line = self.comment(&format!("; Global: ({:04x}) {}", sym.id as u16, sym.name));
            self.output.push(line);
            self.cursors.global += 1;
        }

        while let Some(&sym) = self.partition.functions.get(self.cursors.function) {
            if sym.range_start > offset {
                break;
            }
            self.output.push(String::new());
            let line = self.comment(&format!(";;;; {}", sym.name));
            self.output.push(line);
            self.cursors.function += 1;
        }

        while let Some(&sym) = self.partition.locals.get(self.cursors.local) {
            if sym.range_start > offset {
                break;
            }
            let line = self.comment(&format!(";   Local: ({:04x}) {}", sym.id as u16, sym.name));
            self.output.push(line);
            self.cursors.local += 1;
        }
    }

    fn emit_file_banner(&mut self, name: &str) {
        let rule = ";".repeat(BANNER_WIDTH);
        let pad = BANNER_WIDTH.saturating_sub(name.len() + ";;;;  ".len());

        self.output.push(String::new());
        self.output.push(self.comment(&rule));
        let title = format!(
            "{}{} {}",
            self.comment(";;;; "),
            name,
            self.comment(&";".repeat(pad))
        );
        self.output.push(title);
        self.output.push(self.comment(&rule));
    }

    fn emit_function_header(&mut self, i: usize) {
        if self.labels.label_at(i) == Label::FunctionEntry {
            let name = self.function_name(i as i64 * 4);
            self.output.push(String::new());
            self.output.push(self.header(&format!("{}:", name)));
        }
    }

    /// Render the instruction at word `i`; returns the words consumed
    fn emit_instruction(&mut self, code: &[i32], i: usize) -> usize {
        let insn = match Instruction::decode(code, i) {
            Ok(insn) => insn,
            Err(e) => {
                debug!("rendering raw word: {}", e);
                self.emit_unknown(i, code[i]);
                return 1;
            }
        };

        match insn.opcode {
            Opcode::Unknown(_) => {
                self.emit_unknown(i, insn.word);
                1
            }
            Opcode::JumpMap => {
                let map = insn
                    .jump_map()
                    .filter(|map| map.targets().all(|t| self.labels.in_range(t)));
                match map {
                    Some(map) => {
                        self.emit_jump_map(&insn, &map);
                        insn.width()
                    }
                    None => {
                        debug!("jump map at word {:#x} has out-of-range arms", i);
                        self.emit_unknown(i, insn.word);
                        1
                    }
                }
            }
            _ => {
                let (operands, comment) = self.format_operands(&insn);
                self.emit_line(i, insn.word, insn.opcode.name(), &operands, comment);
                insn.width()
            }
        }
    }

    fn emit_line(
        &mut self,
        i: usize,
        word: i32,
        mnemonic: &str,
        operands: &str,
        comment: Option<String>,
    ) {
        let label = match self.labels.label_at(i) {
            Label::Local(n) => format!("L{}:", n),
            _ => String::new(),
        };

        let raw = if self.options.show_raw_words {
            let word = word as u32;
            format!(
                " {}{}",
                self.half_word((word >> 16) as u16),
                self.half_word(word as u16)
            )
        } else {
            String::new()
        };
        let line = format!(
            "  {:04x}:{}  {:<6}{:<14}{}",
            i * 4,
            raw,
            label,
            mnemonic,
            operands
        );

        let mut line = line.trim_end().to_string();
        if let Some(comment) = comment {
            line.push_str("  ");
            line.push_str(&self.comment(&format!("; {}", comment)));
        }
        self.output.push(line);
    }

    /// One half of a raw word, colored by value class when color is on
    fn half_word(&self, half: u16) -> String {
        let text = format!("{:04x}", half);
        if !self.options.color {
            return text;
        }
        match half_word_color(half) {
            Some(color) => text.with(color).to_string(),
            None => text,
        }
    }

    fn emit_unknown(&mut self, i: usize, word: i32) {
        let raw = format!("{:08x}", word as u32);
        self.emit_line(i, word, Opcode::Unknown(0).name(), &raw, None);
    }

    fn emit_jump_map(&mut self, insn: &Instruction, map: &JumpMap) {
        let opening = format!("{} cases", map.cases.len());
        self.emit_line(insn.pos, insn.word, insn.opcode.name(), &opening, None);

        for case in &map.cases {
            let line = format!(
                "{:indent$}case {:>6} => {}",
                "",
                case.value,
                self.target_ref(case.target),
                indent = ARM_INDENT
            );
            self.output.push(line);
        }
        let line = format!(
            "{:indent$}else        => {}",
            "",
            self.target_ref(map.fallback),
            indent = ARM_INDENT
        );
        self.output.push(line);
        self.output.push(format!("{:indent$}end", "", indent = ARM_INDENT));
    }

    fn format_operands(&self, insn: &Instruction) -> (String, Option<String>) {
        let position = insn.offset() as u32;

        if let Some(target) = insn.call_target() {
            let comment = format!("{:+} words (= {})", insn.args[0] / 4, fmt_offset(target));
            return (self.function_name(target), Some(comment));
        }

        if let Some(target) = insn.branch_target() {
            let comment = format!(
                "{:+} words (= {})",
                insn.args[0] / 4,
                fmt_offset(target * 4)
            );
            return (self.target_ref(target), Some(comment));
        }

        if insn.opcode.has_float_operands() {
            let floats: Vec<String> = insn
                .float_args()
                .iter()
                .map(|f| format!("{:?}", f))
                .collect();
            return (floats.join(", "), None);
        }

        if !insn.args.is_empty() {
            let args: Vec<String> = insn.args.iter().map(|a| format!("{:#x}", a)).collect();
            return (args.join(", "), None);
        }

        let operands = match insn.opcode.high_half() {
            HighHalf::Unused => String::new(),
            HighHalf::Signed => format!("{}", insn.high_signed()),
            HighHalf::Hex => format!("{:04x}", insn.high),
            HighHalf::Symbol(category) => match self.symbols {
                Some(table) => {
                    let id = insn.high_signed() as u32;
                    format!("{:04x} ({})", insn.high, table.name_for(id, category, position))
                }
                None => format!("{:04x}", insn.high),
            },
        };
        (operands, None)
    }

    /// How a branch to word `target` is shown
    fn target_ref(&self, target: i64) -> String {
        if !self.labels.in_range(target) {
            return format!("<{}>", fmt_offset(target * 4));
        }
        match self.labels.label_at(target as usize) {
            Label::Local(n) => format!("L{}", n),
            Label::FunctionEntry => self.function_name(target * 4),
            Label::None => fmt_offset(target * 4),
        }
    }

    /// Function name for the byte offset `offset`
    fn function_name(&self, offset: i64) -> String {
        let id = offset as u32;
        match self.symbols {
            Some(table) => table.name_for(id, Category::Function, id),
            None => placeholder_name(id, Category::Function),
        }
    }

    fn emit_movement(&mut self) {
        let stream = self.stream;
        let movement = stream.movement();
        if movement.is_empty() {
            return;
        }

        self.output.push(String::new());
        self.output.push(self.comment("; Movement data"));
        for (row, chunk) in movement.chunks(MOVEMENT_WORDS_PER_LINE).enumerate() {
            let index = stream.code_len() + row * MOVEMENT_WORDS_PER_LINE;
            let words: Vec<String> = chunk.iter().map(|w| format!("{:08x}", *w as u32)).collect();
            self.output.push(format!("  [{:04x}] {}", index, words.join(" ")));
        }
    }
}

/// Zero, 0xff, small control-range and high values each get their own color
fn half_word_color(half: u16) -> Option<Color> {
    match half {
        0x00 => Some(Color::AnsiValue(238)),
        0xff => Some(Color::AnsiValue(194)),
        0x01..=0x1f => Some(Color::AnsiValue(150)),
        0x7f..=0xffff => Some(Color::AnsiValue(141)),
        _ => None,
    }
}

fn fmt_offset(offset: i64) -> String {
    if offset < 0 {
        format!("-{:04x}", offset.unsigned_abs())
    } else {
        format!("{:04x}", offset)
    }
}

/// Listing of a debug section on its own, for scripts without code
pub fn render_debug_listing(debug: &DebugSection, options: &RenderOptions) -> Vec<String> {
    let bold = |text: &str| {
        if options.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    };
    let table = &debug.table;
    let mut output = Vec::new();

    output.push(String::new());
    output.push(format!("------ {} ------", bold("Debug")));
    output.extend(debug.header.to_string().lines().map(str::to_string));

    output.push(String::new());
    output.push("Files:".to_string());
    for file in &table.files {
        output.push(format!("  [{:08x}] {}", file.start, file.name));
    }

    output.push(String::new());
    output.push(format!("LineNos: ({} linenos)", table.line_markers.len()));

    output.push(String::new());
    output.push("Symbols:".to_string());
    for sym in &table.symbols {
        output.push(format!("  {}", sym));
    }

    output.push(String::new());
    output.push("Types:".to_string());
    for ty in &table.types {
        output.push(format!("{:4} {}", ty.id, ty.name));
    }

    output
}
