use core::fmt;

use crate::Value;
use crate::bytecode::{BinaryOp, DestKind, GotoMode, OperandKind, UnaryOp};

/// A source operand: where to read and the raw 32-bit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    pub data: u32,
}

impl Operand {
    pub const fn local(index: u32) -> Self {
        Self {
            kind: OperandKind::Local,
            data: index,
        }
    }

    pub const fn property(index: u32) -> Self {
        Self {
            kind: OperandKind::Property,
            data: index,
        }
    }

    pub const fn class_var(index: u32) -> Self {
        Self {
            kind: OperandKind::ClassVar,
            data: index,
        }
    }

    pub const fn constant(packed: u32) -> Self {
        Self {
            kind: OperandKind::Constant,
            data: packed,
        }
    }
}

/// An assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub kind: DestKind,
    pub index: u32,
}

impl Destination {
    pub const fn local(index: u32) -> Self {
        Self {
            kind: DestKind::Local,
            index,
        }
    }

    pub const fn property(index: u32) -> Self {
        Self {
            kind: DestKind::Property,
            index,
        }
    }

    pub const fn operand(self) -> Operand {
        Operand {
            kind: self.kind.operand_kind(),
            data: self.index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedOperand {
    pub name: u32,
    pub operand: Operand,
}

/// A decoded instruction, used for listings and tests. The interpreter reads
/// operands in place instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Unary {
        op: UnaryOp,
        dest: Destination,
        source: Operand,
    },
    Binary {
        op: BinaryOp,
        dest: Destination,
        left: Operand,
        right: Operand,
    },
    Goto {
        mode: GotoMode,
        target: u32,
        condition: Option<Operand>,
    },
    Call {
        native: u8,
        assign: Option<Destination>,
        positional: Vec<Operand>,
        named: Vec<NamedOperand>,
    },
    ReturnPropagate,
    Return {
        value: Operand,
    },
    DebugLine {
        line: u32,
    },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperandKind::Local => write!(f, "l{}", self.data),
            OperandKind::Property => write!(f, "p{}", self.data),
            OperandKind::ClassVar => write!(f, "c{}", self.data),
            OperandKind::Constant => {
                write!(f, "#{}", Value::from_constant(self.data))
            }
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.operand().fmt(f)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary { op, dest, source } => {
                write!(f, "{} {dest}, {source}", op.name())
            }
            Self::Binary {
                op,
                dest,
                left,
                right,
            } => write!(f, "{} {dest}, {left}, {right}", op.name()),
            Self::Goto {
                mode,
                target,
                condition,
            } => match (mode, condition) {
                (GotoMode::IfTrue, Some(cond)) => {
                    write!(f, "goto @{target} if {cond}")
                }
                (GotoMode::IfFalse, Some(cond)) => {
                    write!(f, "goto @{target} unless {cond}")
                }
                _ => write!(f, "goto @{target}"),
            },
            Self::Call {
                native,
                assign,
                positional,
                named,
            } => {
                if let Some(dest) = assign {
                    write!(f, "{dest} := ")?;
                }
                write!(f, "call !{native}(")?;
                let mut first = true;
                for operand in positional {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{operand}")?;
                    first = false;
                }
                for named in named {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "${}={}", named.name, named.operand)?;
                    first = false;
                }
                f.write_str(")")
            }
            Self::ReturnPropagate => f.write_str("propagate"),
            Self::Return { value } => write!(f, "return {value}"),
            Self::DebugLine { line } => write!(f, "line {line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_instructions() {
        let constant = Value::int(3).to_constant().unwrap();
        assert_eq!(
            Instruction::Binary {
                op: BinaryOp::Add,
                dest: Destination::local(0),
                left: Operand::property(2),
                right: Operand::constant(constant),
            }
            .to_string(),
            "add l0, p2, #INT 3"
        );
        assert_eq!(
            Instruction::Goto {
                mode: GotoMode::IfFalse,
                target: 40,
                condition: Some(Operand::local(1)),
            }
            .to_string(),
            "goto @40 unless l1"
        );
        assert_eq!(
            Instruction::Call {
                native: 2,
                assign: Some(Destination::property(1)),
                positional: vec![Operand::local(0), Operand::class_var(4)],
                named: vec![NamedOperand {
                    name: 9,
                    operand: Operand::local(2)
                }],
            }
            .to_string(),
            "p1 := call !2(l0, c4, $9=l2)"
        );
        assert_eq!(Instruction::ReturnPropagate.to_string(), "propagate");
    }

    #[test]
    fn nil_constant_renders_as_dollar() {
        assert_eq!(Operand::constant(0).to_string(), "#$");
    }
}
