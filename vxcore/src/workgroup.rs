//! Required work-group size encoded in kernel names.
//!
//! The frontend names kernels after their type. Wrapping the kernel type in
//! `cl::sycl::xilinx::reqd_work_group_size<X, Y, Z, Kernel>` is how user code
//! requests a launch configuration, so the three sizes are recovered from the
//! demangled name.
use smallvec::SmallVec;

use crate::{
    magic::{WORK_GROUP_SIZE_SOURCE_NAME, WORK_GROUP_SIZE_TEMPLATE},
    mangling::demangle,
    utils::error::{PassError, PassResult},
};

/// Top-level arguments of the template argument list starting right after `<`.
fn template_arguments(list: &str) -> SmallVec<&str, 4> {
    let mut args = SmallVec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => {
                args.push(list[start..i].trim());
                return args;
            }
            '>' => depth -= 1,
            ',' if depth == 0 => {
                args.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(list[start..].trim());
    args
}

/// Integer literal as printed by the demangler (`4`, `4u`, `4ul`).
fn integer_literal(arg: &str) -> Option<u32> {
    arg.trim_end_matches(['u', 'U', 'l', 'L']).parse().ok()
}

/// Extract the required work-group size from the kernel named `mangled`.
///
/// Returns `Ok(None)` when the name does not use the size template. Fails when
/// the template is present but its leading integer arguments are not exactly
/// three, or when the name mentions the template but cannot be demangled.
pub fn reqd_work_group_size(mangled: &str) -> PassResult<Option<[u32; 3]>> {
    let Some(demangled) = demangle(mangled) else {
        if mangled.contains(WORK_GROUP_SIZE_SOURCE_NAME) {
            return Err(PassError::UndecodableKernelName {
                kernel: mangled.to_string(),
            });
        }
        return Ok(None);
    };
    let Some(position) = demangled.find(WORK_GROUP_SIZE_TEMPLATE) else {
        return Ok(None);
    };
    let Some(list) = demangled[position + WORK_GROUP_SIZE_TEMPLATE.len()..].strip_prefix('<')
    else {
        return Ok(None);
    };

    let sizes: SmallVec<u32, 4> = template_arguments(list)
        .iter()
        .map_while(|arg| integer_literal(arg))
        .collect();

    match sizes.as_slice() {
        &[x, y, z] => Ok(Some([x, y, z])),
        _ => Err(PassError::MalformedWorkGroupSize {
            kernel: demangled.clone(),
            found: sizes.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_sizes_are_extracted() {
        let sizes = reqd_work_group_size(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi8ELi1EZ4mainE6kernelEE",
        )
        .unwrap();
        assert_eq!(sizes, Some([4, 8, 1]));
    }

    #[test]
    fn names_without_the_template_have_no_size() {
        assert_eq!(reqd_work_group_size("_ZTS6kernel").unwrap(), None);
        assert_eq!(reqd_work_group_size("plain_kernel").unwrap(), None);
    }

    #[test]
    fn wrong_arity_is_fatal() {
        let two = reqd_work_group_size(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi8EZ4mainE6kernelEE",
        );
        assert!(matches!(
            two,
            Err(PassError::MalformedWorkGroupSize { found: 2, .. })
        ));

        let four = reqd_work_group_size(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi8ELi1ELi2EZ4mainE6kernelEE",
        );
        assert!(matches!(
            four,
            Err(PassError::MalformedWorkGroupSize { found: 4, .. })
        ));
    }

    #[test]
    fn lambda_local_kernels_are_read() {
        let sizes = reqd_work_group_size(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi8ELi1EZZ4mainENKUlRNS0_7handlerEE_clES4_E6kernelEE",
        )
        .unwrap();
        assert_eq!(sizes, Some([4, 8, 1]));

        let two = reqd_work_group_size(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi8EZZ4mainENKUlRNS0_7handlerEE_clES4_E6kernelEE",
        );
        assert!(matches!(
            two,
            Err(PassError::MalformedWorkGroupSize { found: 2, .. })
        ));
    }

    #[test]
    fn unsigned_sizes_are_read() {
        let sizes = reqd_work_group_size(
            "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILj4ELj8ELj1EZ4mainE6kernelEE",
        )
        .unwrap();
        assert_eq!(sizes, Some([4, 8, 1]));
    }

    #[test]
    fn undecodable_size_template_is_fatal() {
        let truncated = reqd_work_group_size("_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4E");
        assert!(matches!(
            truncated,
            Err(PassError::UndecodableKernelName { .. })
        ));
    }

    #[test]
    fn argument_splitting_respects_nesting() {
        let args = template_arguments("4, 8, 1, ns::K<2, 3>> tail");
        assert_eq!(args.as_slice(), ["4", "8", "1", "ns::K<2, 3>"]);
        assert_eq!(integer_literal("16ul"), Some(16));
        assert_eq!(integer_literal("main::kernel"), None);
    }
}
