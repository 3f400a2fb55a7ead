use strum::{EnumIs, EnumTryAs};
use thiserror::Error;
use uuid::Uuid;

use crate::modules::{
    CallingConvention,
    operand::{Label, Name},
};

#[derive(Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// An SSA name is defined more than once.
    #[error(
        "Multiple operations with shared destination target violate SSA requirements. The name `{duplicate}` is defined more than once within function `{function}`."
    )]
    DuplicateSSAName { function: String, duplicate: Name },

    /// No basic block with the entrypoint label was found.
    #[error(
        "By convention, the entrypoint basic block of a function must have label `block_0`. No such basic block was found in function `{function}`."
    )]
    MissingEntryBlock { function: String },

    /// An operand refers to an unresolved name.
    #[error(
        "An operand of function `{function}` refers to an undefined name: `{undefined}`. This name was never defined in the function."
    )]
    UndefinedSSAName { function: String, undefined: Name },

    /// The callee of a call instruction is not part of the module.
    #[error(
        "An instruction of function `{function}` refers to a function referenced by `{undefined}` that is not defined within the module."
    )]
    UndefinedFunction { function: String, undefined: Uuid },

    /// Phi instructions must be the first instructions or following other phi instructions in a basic block.
    #[error(
        "Phi instructions must be the first instructions in a basic block or follow other phi instructions. The basic block `{block}` of function `{function}` contains a phi instruction that is not the first instruction."
    )]
    PhiNotFirstInstruction { function: String, block: Label },

    /// The basic block referenced cannot be found within the function.
    #[error(
        "The basic block `{label}` referenced in function `{function}` is not defined within the function."
    )]
    UndefinedBasicBlock { function: String, label: Label },

    /// A call site disagrees with its callee on the calling convention.
    #[error(
        "Call to `{callee}` at `{block}`:{index} in function `{caller}` uses calling convention `{site}`, but the callee is declared with `{expected}`."
    )]
    CallingConventionMismatch {
        caller: String,
        callee: String,
        block: Label,
        index: usize,
        site: CallingConvention,
        expected: CallingConvention,
    },

    /// Two symbols of the module share a name.
    #[error("The symbol `{0}` is defined more than once in the module.")]
    DuplicateSymbol(String),
}
