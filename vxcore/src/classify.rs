//! Role inference for functions.
//!
//! The role of a function is never stored. It is derived on demand from the
//! calling convention, the attributes and the presence of a body, so that a
//! function renamed or re-annotated by a previous stage is classified by what
//! it is now.
use strum::{EnumIs, IntoStaticStr};
use vxinstr::modules::{CallingConvention, Function, attributes::ATTR_TOP_FUNC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, IntoStaticStr)]
pub enum Role {
    /// Offload entry point.
    Kernel,
    /// Declaration resolved against the target's builtin library. Intrinsics included.
    DeviceLibraryFunction,
    /// Device function with a body.
    InternalHelper,
}

/// A kernel carries the SPIR kernel convention, or the top-function attribute set
/// by an earlier vendor-flow run.
pub fn is_kernel(function: &Function) -> bool {
    function.cconv == CallingConvention::SpirKernel || function.attrs.has(ATTR_TOP_FUNC)
}

/// Non-intrinsic function with the SPIR device convention: either generated by the
/// frontend for a kernel or provided by the target's SPIR library.
pub fn is_transitive_device_function(function: &Function) -> bool {
    function.cconv == CallingConvention::SpirFunc && !function.is_intrinsic()
}

pub fn classify(function: &Function) -> Role {
    if is_kernel(function) {
        Role::Kernel
    } else if function.is_declaration() {
        Role::DeviceLibraryFunction
    } else {
        Role::InternalHelper
    }
}
