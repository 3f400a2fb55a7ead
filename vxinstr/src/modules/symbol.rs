//! Symbols of a module: references to functions and global variables.
//!
//! Instructions never embed symbol names. They refer to functions and globals
//! through the stable UUID assigned at creation, so renaming a symbol never
//! requires rewriting its users.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    modules::{Linkage, operand::IConst},
    types::{AddressSpace, Type},
};

/// A reference to a function of the module (definition or declaration).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionPointer(pub Uuid);

impl FunctionPointer {
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

/// A reference to a global variable of the module.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalPointer(pub Uuid);

/// A global variable.
///
/// A global without initializer is an external declaration: it is defined in
/// another module and only referenced here.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalVariable {
    pub uuid: Uuid,
    pub name: String,
    pub ty: Type,
    pub addrspace: AddressSpace,
    pub linkage: Linkage,

    /// Name of the COMDAT section the global belongs to, if any.
    pub comdat: Option<String>,

    /// Initial value. Aggregates are represented as a sequence of integer constants.
    pub initializer: Option<Vec<IConst>>,
}

impl GlobalVariable {
    /// Create a new external global declaration with a fresh UUID.
    pub fn new(name: impl Into<String>, ty: Type, addrspace: AddressSpace) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            ty,
            addrspace,
            linkage: Linkage::External,
            comdat: None,
            initializer: None,
        }
    }

    pub fn pointer(&self) -> GlobalPointer {
        GlobalPointer(self.uuid)
    }

    pub fn is_declaration(&self) -> bool {
        self.initializer.is_none()
    }
}
