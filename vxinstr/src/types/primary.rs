#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents an integer type with a specific bit width.
///
/// Signeness is not represented here; all integer types are treated as unsigned.
/// Instructions that operate on signed integers will interpret the bits accordingly.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct IType {
    num_bits: u32,
}

impl IType {
    /// Common integer types.
    pub const I1: Self = Self { num_bits: 1 };
    pub const I8: Self = Self { num_bits: 8 };
    pub const I16: Self = Self { num_bits: 16 };
    pub const I32: Self = Self { num_bits: 32 };
    pub const I64: Self = Self { num_bits: 64 };
    pub const MIN_BITS: u32 = 1;
    pub const MAX_BITS: u32 = 64;

    #[inline]
    const fn check_validity(num_bits: u32) -> bool {
        num_bits >= Self::MIN_BITS && num_bits <= Self::MAX_BITS
    }

    /// Creates a new `IType` with the specified number of bits.
    #[inline]
    pub const fn new(num_bits: u32) -> Option<Self> {
        if Self::check_validity(num_bits) {
            Some(Self { num_bits })
        } else {
            None
        }
    }

    /// Returns the number of bits of the integer type.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Returns the number of bytes required to store the integer type.
    #[inline]
    pub const fn byte_size(&self) -> u32 {
        (self.num_bits + 7) / 8
    }

    /// Truncates `value` to the width of this type.
    #[inline]
    pub const fn truncate(&self, value: u64) -> u64 {
        if self.num_bits == 64 {
            value
        } else {
            value & ((1u64 << self.num_bits) - 1)
        }
    }
}

impl std::fmt::Display for IType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.num_bits)
    }
}

/// Represents a floating-point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FType {
    /// 16-bit floating point value (IEEE-754 binary16)
    Fp16,

    /// 32-bit floating point value (IEEE-754 binary32)
    Fp32,

    /// 64-bit floating point value (IEEE-754 binary64)
    Fp64,
}

impl std::fmt::Display for FType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FType::Fp16 => "half",
            FType::Fp32 => "float",
            FType::Fp64 => "double",
        };
        write!(f, "{}", s)
    }
}

/// Address space of a pointer, numbered the way the SPIR target numbers them.
///
/// `Generic` is the unqualified address space: any of the concrete spaces can be
/// cast into it, and back ends that cannot track provenance reject leftover casts
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AddressSpace {
    Private,
    Global,
    Constant,
    Local,
    Generic,
    Other(u32),
}

impl AddressSpace {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => AddressSpace::Private,
            1 => AddressSpace::Global,
            2 => AddressSpace::Constant,
            3 => AddressSpace::Local,
            4 => AddressSpace::Generic,
            n => AddressSpace::Other(n),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            AddressSpace::Private => 0,
            AddressSpace::Global => 1,
            AddressSpace::Constant => 2,
            AddressSpace::Local => 3,
            AddressSpace::Generic => 4,
            AddressSpace::Other(n) => n,
        }
    }
}

impl std::fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "addrspace({})", self.to_u32())
    }
}
