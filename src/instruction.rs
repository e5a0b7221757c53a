use crate::opcode_tables::{Opcode, Operands};
use crate::util::sign_extend;
use std::fmt::{Display, Error, Formatter};

/// Why a word could not be decoded as a full instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The code region ends before all operand words
    Truncated {
        pos: usize,
        needed: usize,
        available: usize,
    },
    /// A branch-table count that is negative or larger than the stream
    MalformedOperand { pos: usize, value: i32 },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            DecodeError::Truncated {
                pos,
                needed,
                available,
            } => write!(
                f,
                "instruction at word {:#x} needs {} operand words, {} available",
                pos, needed, available
            ),
            DecodeError::MalformedOperand { pos, value } => {
                write!(f, "instruction at word {:#x} has malformed operand {}", pos, value)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A view of one decoded instruction inside a word slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction<'a> {
    /// Word index of the opcode word
    pub pos: usize,
    /// The full opcode word
    pub word: i32,
    pub opcode: Opcode,
    /// High half of the opcode word
    pub high: u16,
    /// Operand words following the opcode word
    pub args: &'a [i32],
}

/// One case arm of a jump map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpCase {
    pub value: i32,
    pub target: i64,
}

/// Decoded branch table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpMap {
    pub cases: Vec<JumpCase>,
    pub fallback: i64,
}

impl JumpMap {
    /// Every target, case arms first
    pub fn targets(&self) -> impl Iterator<Item = i64> + '_ {
        self.cases
            .iter()
            .map(|case| case.target)
            .chain(std::iter::once(self.fallback))
    }
}

/// Word index targeted by byte displacement `disp`, read from word `operand_pos`.
///
/// Displacements count from the word before the one holding them.
pub fn relative_target(operand_pos: usize, disp: i32) -> i64 {
    operand_pos as i64 - 1 + (disp / 4) as i64
}

impl<'a> Instruction<'a> {
    /// Decode the instruction whose opcode word is `words[pos]`.
    ///
    /// Unknown opcodes decode successfully with no operands.
    pub fn decode(words: &'a [i32], pos: usize) -> Result<Self, DecodeError> {
        let word = match words.get(pos) {
            Some(&word) => word,
            None => {
                return Err(DecodeError::Truncated {
                    pos,
                    needed: 1,
                    available: 0,
                })
            }
        };
        let opcode = Opcode::from_word(word);
        let available = words.len() - pos - 1;

        let arg_count = match opcode.operands() {
            Operands::None => 0,
            Operands::Fixed(n) => n,
            Operands::BranchTable => {
                let choices = match words.get(pos + 1) {
                    Some(&choices) => choices,
                    None => {
                        return Err(DecodeError::Truncated {
                            pos,
                            needed: 1,
                            available,
                        })
                    }
                };
                if choices < 0 || choices as usize > words.len() {
                    return Err(DecodeError::MalformedOperand {
                        pos,
                        value: choices,
                    });
                }
                2 * choices as usize + 2
            }
        };

        if arg_count > available {
            return Err(DecodeError::Truncated {
                pos,
                needed: arg_count,
                available,
            });
        }

        Ok(Instruction {
            pos,
            word,
            opcode,
            high: (word as u32 >> 16) as u16,
            args: &words[pos + 1..pos + 1 + arg_count],
        })
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Words occupied, opcode word included
    pub fn width(&self) -> usize {
        self.args.len() + 1
    }

    /// Byte offset of the opcode word
    pub fn offset(&self) -> usize {
        self.pos * 4
    }

    /// High half interpreted as a sign-extended 16-bit value
    pub fn high_signed(&self) -> i32 {
        sign_extend(self.high as u32, 15)
    }

    /// Target word of a relative branch
    pub fn branch_target(&self) -> Option<i64> {
        if self.opcode.is_relative_branch() {
            Some(relative_target(self.pos + 1, self.args[0]))
        } else {
            None
        }
    }

    /// Byte offset a call lands on
    pub fn call_target(&self) -> Option<i64> {
        match self.opcode {
            Opcode::Call => Some(self.offset() as i64 + self.args[0] as i64),
            _ => None,
        }
    }

    /// Case arms and fallback of a branch table.
    ///
    /// Arms are (displacement, value) pairs. A case arm's target is measured
    /// from its value word, the fallback from its own word.
    pub fn jump_map(&self) -> Option<JumpMap> {
        if self.opcode != Opcode::JumpMap {
            return None;
        }
        let choices = self.args[0] as usize;
        let cases = (0..choices)
            .map(|k| {
                let disp_pos = self.pos + 2 + 2 * k;
                JumpCase {
                    value: self.args[2 + 2 * k],
                    target: relative_target(disp_pos + 1, self.args[1 + 2 * k]),
                }
            })
            .collect();
        let fallback_pos = self.pos + 2 + 2 * choices;
        Some(JumpMap {
            cases,
            fallback: relative_target(fallback_pos, self.args[1 + 2 * choices]),
        })
    }

    /// Operand words reinterpreted as floats
    pub fn float_args(&self) -> Vec<f32> {
        self.args.iter().map(|&w| f32::from_bits(w as u32)).collect()
    }
}

impl Display for Instruction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.opcode.name())?;
        if let Opcode::Unknown(_) = self.opcode {
            return write!(f, " {:08x}", self.word as u32);
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i == 0 {
                write!(f, " ")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "#{:x}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JUMP: i32 = 0x33;
    const JUMP_MAP: i32 = 0x82;

    #[test]
    fn test_decode_fixed_operands() {
        let words = [JUMP, 8, 0x4e, 0x30];
        let insn = Instruction::decode(&words, 0).unwrap();
        assert_eq!(insn.opcode, Opcode::Jump);
        assert_eq!(insn.args, &[8]);
        assert_eq!(insn.width(), 2);
        assert_eq!(insn.branch_target(), Some(2));
    }

    #[test]
    fn test_decode_high_half() {
        let words = [0xfffe_00bcu32 as i32];
        let insn = Instruction::decode(&words, 0).unwrap();
        assert_eq!(insn.opcode, Opcode::PushConst);
        assert_eq!(insn.high, 0xfffe);
        assert_eq!(insn.high_signed(), -2);
        assert_eq!(insn.arg_count(), 0);
    }

    #[test]
    fn test_decode_unknown_is_one_word() {
        let words = [0x1234_5678, 0x33];
        let insn = Instruction::decode(&words, 0).unwrap();
        assert_eq!(insn.opcode, Opcode::Unknown(0x5678));
        assert_eq!(insn.width(), 1);
        assert_eq!(insn.to_string(), ".word 12345678");
    }

    #[test]
    fn test_truncated_operands() {
        let words = [0x30, JUMP];
        assert_eq!(
            Instruction::decode(&words, 1),
            Err(DecodeError::Truncated {
                pos: 1,
                needed: 1,
                available: 0
            })
        );
        assert_eq!(
            Instruction::decode(&words, 2),
            Err(DecodeError::Truncated {
                pos: 2,
                needed: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_jump_map_width_and_arms() {
        // JumpMap, 2 cases: (disp 16, value 5), (disp 20, value 7), else disp 4
        let words = [JUMP_MAP, 2, 16, 5, 20, 7, 4, 0x30, 0x30, 0x30, 0x30];
        let insn = Instruction::decode(&words, 0).unwrap();
        assert_eq!(insn.arg_count(), 6);

        let map = insn.jump_map().unwrap();
        assert_eq!(
            map.cases,
            vec![
                JumpCase { value: 5, target: 6 },
                JumpCase { value: 7, target: 9 },
            ]
        );
        assert_eq!(map.fallback, 6);
        assert_eq!(map.targets().count(), 3);
    }

    #[test]
    fn test_jump_map_bad_count() {
        let words = [JUMP_MAP, -1, 0, 0];
        assert_eq!(
            Instruction::decode(&words, 0),
            Err(DecodeError::MalformedOperand { pos: 0, value: -1 })
        );

        let words = [JUMP_MAP, 3, 0, 0];
        assert_eq!(
            Instruction::decode(&words, 0),
            Err(DecodeError::Truncated {
                pos: 0,
                needed: 8,
                available: 3
            })
        );

        // A count larger than the whole stream
        let words = [JUMP_MAP, 0x0100_0000, 0, 0];
        assert_eq!(
            Instruction::decode(&words, 0),
            Err(DecodeError::MalformedOperand {
                pos: 0,
                value: 0x0100_0000
            })
        );

        let words = [JUMP_MAP];
        assert!(matches!(
            Instruction::decode(&words, 0),
            Err(DecodeError::Truncated { needed: 1, .. })
        ));
    }

    #[test]
    fn test_call_target_is_byte_offset() {
        let words = [0x2e, 0x30, 0x31, -8];
        let insn = Instruction::decode(&words, 2).unwrap();
        assert_eq!(insn.call_target(), Some(0));
        assert_eq!(insn.branch_target(), None);
    }
}
