//! Control-flow label assignment
//!
//! Two linear passes over the code region. The first finds function entries
//! and every in-range branch target. The second numbers the targets, starting
//! again at 1 after each function entry.

use crate::instruction::Instruction;
use crate::opcode_tables::Opcode;
use log::debug;

/// Raw table value for a function entry
pub const FUNCTION_ENTRY: i32 = -1;

const TARGET: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    None,
    FunctionEntry,
    Local(u32),
}

/// One label class per code-region word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<i32>,
}

impl LabelTable {
    /// Discover and number labels for the code region `code`
    pub fn resolve(code: &[i32]) -> Self {
        let mut table = LabelTable {
            labels: vec![0; code.len()],
        };
        table.discover_targets(code);
        table.number_targets();
        table
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.labels
    }

    pub fn label_at(&self, pos: usize) -> Label {
        match self.labels.get(pos) {
            Some(&FUNCTION_ENTRY) => Label::FunctionEntry,
            Some(&n) if n > 0 => Label::Local(n as u32),
            _ => Label::None,
        }
    }

    /// Whether word index `target` lies inside the code region
    pub fn in_range(&self, target: i64) -> bool {
        target >= 0 && (target as u64) < self.labels.len() as u64
    }

    fn mark_target(&mut self, target: i64) {
        if !self.in_range(target) {
            debug!("discarding out-of-range branch target {}", target);
            return;
        }
        let slot = &mut self.labels[target as usize];
        if *slot == 0 {
            *slot = TARGET;
        }
    }

    fn discover_targets(&mut self, code: &[i32]) {
        let mut i = 0;
        while i < code.len() {
            let insn = match Instruction::decode(code, i) {
                Ok(insn) => insn,
                Err(e) => {
                    debug!("label pass: {}", e);
                    i += 1;
                    continue;
                }
            };

            if insn.opcode == Opcode::Begin {
                self.labels[i] = FUNCTION_ENTRY;
            } else if let Some(target) = insn.branch_target() {
                self.mark_target(target);
            } else if let Some(map) = insn.jump_map() {
                self.mark_target(i as i64);
                for target in map.targets() {
                    self.mark_target(target);
                }
            }

            i += insn.width();
        }
    }

    fn number_targets(&mut self) {
        let mut counter = 0;
        for slot in self.labels.iter_mut() {
            match *slot {
                FUNCTION_ENTRY => counter = 0,
                TARGET => {
                    counter += 1;
                    *slot = counter;
                }
                _ => {}
            }
        }
    }
}
