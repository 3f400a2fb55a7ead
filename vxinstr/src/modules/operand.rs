//! Shared operand types for instructions.
//!
//! An instruction operand can be a reference to another SSA value (`Reg`),
//! an immediate integer constant (`Imm`), a function symbol (`Func`), a global
//! variable (`Global`) or an undefined value of a given type (`Undef`).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::{
    modules::symbol::{FunctionPointer, GlobalPointer},
    types::{IType, Type},
};

/// SSA value identifier used to name the destination or reference another
/// instruction's result. Parameters are SSA values as well.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Name(pub u32);

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Represents a code label used as a target for control‑flow instructions.
///
/// Labels and control-flow may not cross function boundaries. Thus, labels are
/// only valid within the function they are defined in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label(pub u32);

impl Label {
    pub const NIL: Label = Label(0);

    /// Returns true if this is the "nil" label (i.e., label 0).
    ///
    /// This label is reserved as the 'function entry' label. It should always be present
    /// in functions that have a body.
    pub fn is_nil(&self) -> bool {
        self == &Label::NIL
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "label %block_{}", self.0)
        } else {
            write!(f, "%block_{}", self.0)
        }
    }
}

/// Integer immediate. The value is always kept truncated to the width of `ty`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IConst {
    pub ty: IType,
    pub value: u64,
}

impl IConst {
    pub fn new(ty: IType, value: u64) -> Self {
        Self {
            ty,
            value: ty.truncate(value),
        }
    }
}

impl std::fmt::Display for IConst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.value)
    }
}

/// Instruction operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Reference to a previously defined SSA value.
    Reg(Name),
    /// Immediate integer literal.
    Imm(IConst),
    /// Address of a function of the module.
    Func(FunctionPointer),
    /// Address of a global variable of the module.
    Global(GlobalPointer),
    /// Undefined value of the given type.
    Undef(Type),
}

impl Operand {
    /// Shorthand for an integer immediate.
    pub fn imm(ty: IType, value: u64) -> Self {
        Operand::Imm(IConst::new(ty, value))
    }

    /// Returns the SSA name this operand refers to, if any.
    pub fn reg(&self) -> Option<Name> {
        match self {
            Operand::Reg(name) => Some(*name),
            _ => None,
        }
    }
}

impl From<Name> for Operand {
    fn from(name: Name) -> Self {
        Operand::Reg(name)
    }
}

impl From<IConst> for Operand {
    fn from(constant: IConst) -> Self {
        Operand::Imm(constant)
    }
}
