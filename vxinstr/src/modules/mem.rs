//! Memory operations
//!
//! Loads, stores, stack allocation, pointer arithmetic, address-space casts and
//! the block memory intrinsics (`memcpy`, `memmove`, `memset`). The intrinsics
//! are first-class instructions rather than calls so passes can match them
//! exhaustively.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        Instruction,
        operand::{Name, Operand},
    },
    types::{AddressSpace, IType, Type},
};

/// Load from memory into a destination SSA name.
///
/// When `volatile` is true, the operation is prevented from being removed or
/// merged by typical optimizations.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MLoad {
    pub dest: Name,
    pub ty: Type,
    pub addr: Operand,
    pub alignment: Option<u32>,
    pub volatile: bool,
}

impl Instruction for MLoad {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.addr)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.addr)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }
}

/// Store a value to memory.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MStore {
    pub addr: Operand,
    pub value: Operand,
    pub ty: Type,
    pub alignment: Option<u32>,
    pub volatile: bool,
}

impl Instruction for MStore {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.addr, &self.value].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.addr, &mut self.value].into_iter()
    }
}

/// Stack allocation of `count` elements of type `ty` in the private address space.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MAlloca {
    pub dest: Name,
    pub ty: Type,
    pub count: Operand,
    pub alignment: Option<u32>,
}

impl Instruction for MAlloca {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.count)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.count)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }
}

/// Byte-granular pointer arithmetic: `dest = base + offset`.
///
/// The result lives in the same address space as `base`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MOffset {
    pub dest: Name,
    pub addrspace: AddressSpace,
    pub base: Operand,
    pub offset: Operand,
}

impl Instruction for MOffset {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.base, &self.offset].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.base, &mut self.offset].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }
}

/// Address-space cast of a pointer.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MCast {
    pub dest: Name,
    pub value: Operand,
    pub from: AddressSpace,
    pub to: AddressSpace,
}

impl Instruction for MCast {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.value)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.value)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }
}

/// Block transfer of `len` bytes from `src` to `dst`.
///
/// Shared by `memcpy` (regions must not overlap) and `memmove` (regions may
/// overlap).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemTransfer {
    pub dst: Operand,
    pub dst_addrspace: AddressSpace,
    pub src: Operand,
    pub src_addrspace: AddressSpace,
    pub len: Operand,
    pub len_ty: IType,
    pub alignment: Option<u32>,
    pub volatile: bool,
}

impl Instruction for MemTransfer {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.dst, &self.src, &self.len].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.dst, &mut self.src, &mut self.len].into_iter()
    }
}

/// Fill `len` bytes at `dst` with the `i8` value `value`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemSet {
    pub dst: Operand,
    pub dst_addrspace: AddressSpace,
    pub value: Operand,
    pub len: Operand,
    pub len_ty: IType,
    pub alignment: Option<u32>,
    pub volatile: bool,
}

impl Instruction for MemSet {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.dst, &self.value, &self.len].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.dst, &mut self.value, &mut self.len].into_iter()
    }
}
