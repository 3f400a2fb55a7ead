//! Types of the device IR.
//!
//! The device IR only needs enough typing to drive the passes: integer widths for
//! constants and loop counters, and address spaces on pointers. Pointers are opaque
//! and do not carry a pointee type.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

pub mod primary;

pub use primary::{AddressSpace, FType, IType};

/// Any first-class type a value, parameter or return slot may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    Int(IType),
    Float(FType),
    Ptr(AddressSpace),
}

impl Type {
    pub const I1: Type = Type::Int(IType::I1);
    pub const I8: Type = Type::Int(IType::I8);
    pub const I32: Type = Type::Int(IType::I32);
    pub const I64: Type = Type::Int(IType::I64);

    /// Shorthand for a pointer into the given address space.
    pub const fn ptr(addrspace: AddressSpace) -> Type {
        Type::Ptr(addrspace)
    }
}

impl From<IType> for Type {
    fn from(ty: IType) -> Self {
        Type::Int(ty)
    }
}

impl From<FType> for Type {
    fn from(ty: FType) -> Self {
        Type::Float(ty)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int(ty) => write!(f, "{}", ty),
            Type::Float(ty) => write!(f, "{}", ty),
            Type::Ptr(AddressSpace::Private) => write!(f, "ptr"),
            Type::Ptr(addrspace) => write!(f, "ptr {}", addrspace),
        }
    }
}
