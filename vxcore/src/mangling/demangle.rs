//! Itanium C++ demangling of kernel and builtin names.
use std::fmt::Write;

use cpp_demangle::Symbol;

/// Demangle `name`. Returns `None` if the name is not a valid Itanium mangling.
pub fn demangle(name: &str) -> Option<String> {
    let symbol = Symbol::new(name).ok()?;
    let mut demangled = String::new();
    write!(demangled, "{}", symbol).ok()?;
    Some(demangled)
}

/// Demangle `name`, falling back to the raw name when that is not possible.
pub fn demangle_or_raw(name: &str) -> String {
    demangle(name).unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_and_builtins() {
        assert_eq!(demangle("_Z6kernelv").as_deref(), Some("kernel()"));
        assert_eq!(demangle("_Z3addii").as_deref(), Some("add(int, int)"));
        assert_eq!(
            demangle("_Z24__spir_ocl_get_global_idj").as_deref(),
            Some("__spir_ocl_get_global_id(unsigned int)")
        );
    }

    #[test]
    fn lambda_local_typeinfo_names() {
        let demangled = demangle(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi8ELi1EZZ4mainENKUlRNS0_7handlerEE_clES4_E6kernelEE",
        )
        .unwrap();
        assert!(demangled.starts_with("typeinfo name for "));
        assert!(demangled.contains("cl::sycl::xilinx::reqd_work_group_size<4, 8, 1, main::"));
        assert!(demangled.ends_with("::kernel>"));
    }

    #[test]
    fn unmangled_names_fall_back() {
        assert_eq!(demangle("get_global_id"), None);
        assert_eq!(demangle("_Z"), None);
        assert_eq!(demangle_or_raw("llvm.memcpy"), "llvm.memcpy");
        assert_eq!(demangle_or_raw("xSYCL18056571196894167053"), "xSYCL18056571196894167053");
    }
}
