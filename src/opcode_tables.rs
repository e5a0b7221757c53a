use crate::debug_symbols::Category;

/// Known script opcodes (low half of an instruction word)
///
/// The catalog is reverse-engineered and incomplete; anything else decodes
/// to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Begin,
    Return,
    Call,
    Jump,
    CondJump,
    CondJump2,
    Add,
    Trampoline,
    JumpMap,
    DoCommand,
    LineNo,
    GetGlobal2,
    GetGlobal,
    GetLocal,
    SetGlobal,
    SetLocal,
    PushConst,
    /// Unconfirmed against samples: one operand word read as an `f32`
    PushFloat,
    PushCmdLocal,
    ResetLocal,
    CmpLocal,
    CmpConst,
    Unknown(u16),
}

/// How many operand words follow the opcode word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    Fixed(usize),
    /// `2 * n + 2` words, where `n` is the first operand word
    BranchTable,
}

/// How the inline high half of the opcode word is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighHalf {
    Unused,
    /// Symbol id resolved in the given category
    Symbol(Category),
    Signed,
    Hex,
}

impl Opcode {
    pub fn from_word(word: i32) -> Self {
        Self::from_u16(word as u32 as u16)
    }

    pub fn from_u16(op: u16) -> Self {
        match op {
            0x002E => Opcode::Begin,
            0x0030 => Opcode::Return,
            0x0031 => Opcode::Call,
            0x0033 => Opcode::Jump,
            0x0035 => Opcode::CondJump,
            0x0036 => Opcode::CondJump2,
            0x004E => Opcode::Add,
            0x0081 => Opcode::Trampoline,
            0x0082 => Opcode::JumpMap,
            0x0087 => Opcode::DoCommand,
            0x0089 => Opcode::LineNo,
            0x00A2 => Opcode::GetGlobal2,
            0x00A3 => Opcode::GetGlobal,
            0x00A4 => Opcode::GetLocal,
            0x00AF => Opcode::SetGlobal,
            0x00B1 => Opcode::SetLocal,
            0x00BC => Opcode::PushConst,
            0x00BD => Opcode::PushFloat,
            0x00BE => Opcode::PushCmdLocal,
            0x00BF => Opcode::ResetLocal,
            0x00C8 => Opcode::CmpLocal,
            0x00C9 => Opcode::CmpConst,
            other => Opcode::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Opcode::Begin => 0x002E,
            Opcode::Return => 0x0030,
            Opcode::Call => 0x0031,
            Opcode::Jump => 0x0033,
            Opcode::CondJump => 0x0035,
            Opcode::CondJump2 => 0x0036,
            Opcode::Add => 0x004E,
            Opcode::Trampoline => 0x0081,
            Opcode::JumpMap => 0x0082,
            Opcode::DoCommand => 0x0087,
            Opcode::LineNo => 0x0089,
            Opcode::GetGlobal2 => 0x00A2,
            Opcode::GetGlobal => 0x00A3,
            Opcode::GetLocal => 0x00A4,
            Opcode::SetGlobal => 0x00AF,
            Opcode::SetLocal => 0x00B1,
            Opcode::PushConst => 0x00BC,
            Opcode::PushFloat => 0x00BD,
            Opcode::PushCmdLocal => 0x00BE,
            Opcode::ResetLocal => 0x00BF,
            Opcode::CmpLocal => 0x00C8,
            Opcode::CmpConst => 0x00C9,
            Opcode::Unknown(op) => op,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Begin => "Begin",
            Opcode::Return => "Return",
            Opcode::Call => "Call",
            Opcode::Jump => "Jump",
            Opcode::CondJump => "CondJump",
            Opcode::CondJump2 => "CondJump2",
            Opcode::Add => "Add",
            Opcode::Trampoline => "Trampoline",
            Opcode::JumpMap => "JumpMap",
            Opcode::DoCommand => "DoCommand",
            Opcode::LineNo => "LineNo",
            Opcode::GetGlobal2 => "GetGlobal2",
            Opcode::GetGlobal => "GetGlobal",
            Opcode::GetLocal => "GetLocal",
            Opcode::SetGlobal => "SetGlobal",
            Opcode::SetLocal => "SetLocal",
            Opcode::PushConst => "PushConst",
            Opcode::PushFloat => "PushFloat",
            Opcode::PushCmdLocal => "PushCmdLocal",
            Opcode::ResetLocal => "ResetLocal",
            Opcode::CmpLocal => "CmpLocal",
            Opcode::CmpConst => "CmpConst",
            Opcode::Unknown(_) => ".word",
        }
    }

    pub fn operands(self) -> Operands {
        match self {
            Opcode::Call
            | Opcode::Jump
            | Opcode::CondJump
            | Opcode::CondJump2
            | Opcode::Trampoline
            | Opcode::PushFloat => Operands::Fixed(1),
            Opcode::DoCommand => Operands::Fixed(2),
            Opcode::JumpMap => Operands::BranchTable,
            _ => Operands::None,
        }
    }

    pub fn high_half(self) -> HighHalf {
        match self {
            Opcode::GetGlobal2 | Opcode::GetGlobal | Opcode::SetGlobal => {
                HighHalf::Symbol(Category::Global)
            }
            Opcode::GetLocal
            | Opcode::SetLocal
            | Opcode::PushCmdLocal
            | Opcode::ResetLocal
            | Opcode::CmpLocal => HighHalf::Symbol(Category::Local),
            Opcode::PushConst => HighHalf::Signed,
            Opcode::CmpConst => HighHalf::Hex,
            _ => HighHalf::Unused,
        }
    }

    /// Single-operand branches whose operand is a byte displacement
    pub fn is_relative_branch(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::CondJump | Opcode::CondJump2 | Opcode::Trampoline
        )
    }

    /// Operand words hold IEEE-754 single-precision bit patterns
    pub fn has_float_operands(self) -> bool {
        matches!(self, Opcode::PushFloat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for op in 0u16..=0x00ff {
            assert_eq!(Opcode::from_u16(op).code(), op);
        }
        assert_eq!(Opcode::from_u16(0x1234), Opcode::Unknown(0x1234));
    }

    #[test]
    fn test_low_half_selects_opcode() {
        // High half carries an inline operand, not part of the opcode
        assert_eq!(Opcode::from_word(0x0010_00a4), Opcode::GetLocal);
        assert_eq!(Opcode::from_word(-0x0001_0000 + 0x00bc), Opcode::PushConst);
    }

    #[test]
    fn test_operand_shapes() {
        assert_eq!(Opcode::Begin.operands(), Operands::None);
        assert_eq!(Opcode::Call.operands(), Operands::Fixed(1));
        assert_eq!(Opcode::DoCommand.operands(), Operands::Fixed(2));
        assert_eq!(Opcode::JumpMap.operands(), Operands::BranchTable);
        assert_eq!(Opcode::Unknown(0x7777).operands(), Operands::None);
    }

    #[test]
    fn test_high_half_modes() {
        assert_eq!(Opcode::GetGlobal.high_half(), HighHalf::Symbol(Category::Global));
        assert_eq!(Opcode::CmpLocal.high_half(), HighHalf::Symbol(Category::Local));
        assert_eq!(Opcode::PushConst.high_half(), HighHalf::Signed);
        assert_eq!(Opcode::Jump.high_half(), HighHalf::Unused);
    }

    #[test]
    fn test_branch_family() {
        let branches: Vec<Opcode> = (0u16..=0xff)
            .map(Opcode::from_u16)
            .filter(|op| op.is_relative_branch())
            .collect();
        assert_eq!(
            branches,
            vec![Opcode::Jump, Opcode::CondJump, Opcode::CondJump2, Opcode::Trampoline]
        );
        assert!(!Opcode::Call.is_relative_branch());
        assert!(!Opcode::JumpMap.is_relative_branch());
    }
}
