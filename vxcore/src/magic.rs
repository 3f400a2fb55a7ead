//! Fixed names and values shared with the back end and the runtime.
//!
//! Everything in this module is part of an external contract: changing a value
//! here changes the produced modules.

/// Prefix of renamed kernels. The runtime resolves kernels by this prefix followed
/// by the decimal digest of the original name.
pub const KERNEL_NAME_PREFIX: &str = "xSYCL";

/// Prefix of renamed device helpers, followed by a module-order counter.
pub const HELPER_NAME_PREFIX: &str = "sycl_func_";

/// Prefix given to unnamed parameters, followed by a counter over unnamed parameters.
pub const ARG_NAME_PREFIX: &str = "arg_";

/// Maximum identifier length accepted by the back end for kernels.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Characters the back end appends to a kernel name for its compute units (`_N`).
pub const COMPUTE_UNIT_SUFFIX_RESERVE: usize = 4;

/// Maximum length of a renamed kernel.
pub const MAX_KERNEL_NAME_LEN: usize = MAX_IDENTIFIER_LEN - COMPUTE_UNIT_SUFFIX_RESERVE;

/// Additive constant of the digest fold (32-bit golden ratio).
pub const DIGEST_FOLD_CONSTANT: u64 = 0x9e37_79b9;

/// Library namespaces stripped from builtin declarations, most specific first.
pub const LIBRARY_PREFIXES: [&str; 4] = [
    "__spirv_ocl_u_",
    "__spirv_ocl_s_",
    "__spirv_ocl_",
    "__spir_ocl_",
];

/// Qualified template encoding the required work-group size in a kernel name.
pub const WORK_GROUP_SIZE_TEMPLATE: &str = "cl::sycl::xilinx::reqd_work_group_size";

/// Length-prefixed source name of the size template inside a mangled name.
pub const WORK_GROUP_SIZE_SOURCE_NAME: &str = "20reqd_work_group_size";

/// Function metadata key of the required work-group size.
pub const WORK_GROUP_SIZE_METADATA: &str = "reqd_work_group_size";

/// Named metadata holding the SPIR version.
pub const SPIR_VERSION_METADATA: &str = "opencl.spir.version";
pub const SPIR_VERSION: [u32; 2] = [2, 0];

/// Named metadata holding the OpenCL version.
pub const OCL_VERSION_METADATA: &str = "opencl.ocl.version";
pub const OCL_VERSION: [u32; 2] = [1, 2];

/// Source-language record emitted by the frontend and rejected downstream.
pub const SPIRV_SOURCE_METADATA: &str = "spirv.Source";

/// Frontend global constructor list. Never privatized.
pub const GLOBAL_CTORS: &str = "llvm.global_ctors";

/// Name prefix of the black-box synthesis intrinsics.
pub const BLACK_BOX_PREFIX: &str = "_ssdm_";

/// Global-id intrinsic folded to a constant once the optimizer ran.
pub const GET_GLOBAL_ID_INTRINSIC: &str = "llvm.spir.get.global.id.i64";

/// Value substituted for folded global-id queries.
pub const FOLDED_GLOBAL_ID: u64 = 1;

/// Demangled prefix of builtins the vendor flow cannot compile.
pub const UNSUPPORTED_BUILTIN_PREFIX: &str = "__spir_ocl_get";

/// Target architectures of the vendor HLS flow.
pub const HLS_ARCHES: [&str; 3] = ["fpga32", "fpga64", "vitis_ip"];

/// Vendor component of the HLS target triples.
pub const HLS_VENDOR: &str = "xilinx";
