//! Whole-module stages.
//!
//! Every stage is a unit struct implementing [`crate::pipeline::Stage`]. Stages
//! only communicate through the module itself: roles are recomputed by
//! [`crate::classify`] each time they are needed.
use vxinstr::modules::{Module, symbol::FunctionPointer};

use crate::classify::is_kernel;

pub mod builtins;
pub mod casts;
pub mod cconv;
pub mod linkage;
pub mod memintrin;
pub mod metadata;
pub mod rename;
pub mod unwrap;

/// Pointers to the kernels of `module`, in module order.
pub(crate) fn kernels(module: &Module) -> Vec<FunctionPointer> {
    module
        .functions
        .iter()
        .filter(|f| is_kernel(f))
        .map(|f| f.pointer())
        .collect()
}
