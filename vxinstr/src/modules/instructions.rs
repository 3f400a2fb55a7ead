use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::modules::{
    Instruction, int, mem, misc,
    operand::{Name, Operand},
};

/// Discriminated union covering all public instruction kinds.
///
/// Passes pattern‑match on this enum exhaustively; there is no fallthrough
/// for unknown instruction kinds. The generated `VxInstrKind` discriminant (via
/// `strum`) can be helpful for fast classification.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(VxInstrKind))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VxInstr {
    // Integer instructions
    IAdd(int::IAdd),
    ICmp(int::ICmp),

    // Memory instructions
    MLoad(mem::MLoad),
    MStore(mem::MStore),
    MAlloca(mem::MAlloca),
    MOffset(mem::MOffset),
    MCast(mem::MCast),

    // Memory intrinsics
    MemCpy(mem::MemTransfer),
    MemMove(mem::MemTransfer),
    MemSet(mem::MemSet),

    // Other instructions
    Invoke(misc::Invoke),
    Phi(misc::Phi),
    Select(misc::Select),
}

impl VxInstr {
    /// Returns `true` for `memcpy`, `memmove` and `memset`.
    pub fn is_mem_intrinsic(&self) -> bool {
        matches!(
            self,
            VxInstr::MemCpy(_) | VxInstr::MemMove(_) | VxInstr::MemSet(_)
        )
    }
}

macro_rules! define_instr_any_instr {
    (
        $($variant:ident),*
    ) => {
        impl Instruction for VxInstr {
            #[auto_enum(Iterator)]
            fn operands(&self) -> impl Iterator<Item = &Operand> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.operands(),
                    )*
                }
            }

            fn destination(&self) -> Option<Name> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.destination(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.operands_mut(),
                    )*
                }
            }

            fn set_destination(&mut self, name: Name) {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.set_destination(name),
                    )*
                }
            }
        }
    };
}

define_instr_any_instr! {
    IAdd,
    ICmp,
    MLoad,
    MStore,
    MAlloca,
    MOffset,
    MCast,
    MemCpy,
    MemMove,
    MemSet,
    Invoke,
    Phi,
    Select
}

macro_rules! define_vxinstr_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for VxInstr {
            fn from(inst: $typ) -> Self {
                VxInstr::$variant(inst)
            }
        }
    };
}

define_vxinstr_from!(int::IAdd, IAdd);
define_vxinstr_from!(int::ICmp, ICmp);

define_vxinstr_from!(mem::MLoad, MLoad);
define_vxinstr_from!(mem::MStore, MStore);
define_vxinstr_from!(mem::MAlloca, MAlloca);
define_vxinstr_from!(mem::MOffset, MOffset);
define_vxinstr_from!(mem::MCast, MCast);
define_vxinstr_from!(mem::MemSet, MemSet);

define_vxinstr_from!(misc::Invoke, Invoke);
define_vxinstr_from!(misc::Phi, Phi);
define_vxinstr_from!(misc::Select, Select);
