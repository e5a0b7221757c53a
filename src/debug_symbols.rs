//! Debug symbol store for script code sections
//!
//! Holds the four tables carried by a debug section:
//! - source files and the code offset where each one starts
//! - line markers
//! - symbols (globals, functions, locals) with their valid code ranges
//! - type names
//!
//! All offsets are byte offsets into the decompressed code region.

use std::fmt;

/// Symbol classification as stored in the debug section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Global,
    Function,
    Local,
}

impl Category {
    pub const GLOBAL_RAW: u32 = 0x0001;
    pub const FUNCTION_RAW: u32 = 0x0009;
    pub const LOCAL_RAW: u32 = 0x0101;

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            Self::GLOBAL_RAW => Some(Category::Global),
            Self::FUNCTION_RAW => Some(Category::Function),
            Self::LOCAL_RAW => Some(Category::Local),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Category::Global => Self::GLOBAL_RAW,
            Category::Function => Self::FUNCTION_RAW,
            Category::Local => Self::LOCAL_RAW,
        }
    }

    fn placeholder_prefix(self) -> &'static str {
        match self {
            Category::Global => "global",
            Category::Function => "func",
            Category::Local => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub start: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMarker {
    pub start: u32,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: u32,
    /// Unclassified flag word stored next to the id
    pub aux: u16,
    pub range_start: u32,
    pub range_end: u32,
    pub category: Category,
    pub name: String,
}

impl Symbol {
    /// Whether this symbol is in scope at byte offset `position`
    pub fn covers(&self, position: u32) -> bool {
        self.range_start <= position && position < self.range_end
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:08x}] {:04x} ({:04x}..{:04x}) {:04x} {}",
            self.id,
            self.aux,
            self.range_start,
            self.range_end,
            self.category.raw(),
            self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    pub id: u16,
    pub name: String,
}

/// Parsed file/line/symbol/type tables of one debug section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugSymbolTable {
    pub files: Vec<SourceFile>,
    pub line_markers: Vec<LineMarker>,
    pub symbols: Vec<Symbol>,
    pub types: Vec<TypeEntry>,
}

/// Symbols split into sorted per-category runs
#[derive(Debug, Default)]
pub struct SymbolPartition<'a> {
    pub globals: Vec<&'a Symbol>,
    pub functions: Vec<&'a Symbol>,
    pub locals: Vec<&'a Symbol>,
}

impl DebugSymbolTable {
    /// Find the symbol with the given `id` and `category` that is defined at
    /// byte offset `position`. Position is ignored for functions.
    ///
    /// The first match in table order wins.
    pub fn lookup(&self, id: u32, category: Category, position: u32) -> Option<&Symbol> {
        self.symbols.iter().find(|sym| {
            sym.id == id
                && sym.category == category
                && (category == Category::Function || sym.covers(position))
        })
    }

    /// Like `lookup`, but synthesizes a name from the raw id on a miss
    pub fn name_for(&self, id: u32, category: Category, position: u32) -> String {
        match self.lookup(id, category, position) {
            Some(sym) => sym.name.clone(),
            None => placeholder_name(id, category),
        }
    }

    /// Sort a copy of the symbol references by (category, start, id) and
    /// split them into globals, functions and locals.
    pub fn partition(&self) -> SymbolPartition<'_> {
        let mut sorted: Vec<&Symbol> = self.symbols.iter().collect();
        sorted.sort_by_key(|sym| (sym.category.raw(), sym.range_start, sym.id));

        let mut partition = SymbolPartition::default();
        for sym in sorted {
            match sym.category {
                Category::Global => partition.globals.push(sym),
                Category::Function => partition.functions.push(sym),
                Category::Local => partition.locals.push(sym),
            }
        }
        partition
    }
}

/// Name used when a lookup fails
pub fn placeholder_name(id: u32, category: Category) -> String {
    format!("{}_{:04x}", category.placeholder_prefix(), id)
}
