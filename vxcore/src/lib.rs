//! Normalization pipelines for device modules.
//!
//! Two pipelines prepare a device module for a vendor back end:
//!
//! - [`pipeline::Pipeline::spir_compatibility`] renames kernels to a digest the
//!   runtime can recompute, names helpers and their arguments, rewrites builtin
//!   declarations to the target library's names and records the SPIR and OpenCL
//!   versions.
//! - [`pipeline::Pipeline::prepare_for_optimization`] inlines property wrappers,
//!   privatizes everything but the kernels, lowers memory intrinsics to loops,
//!   normalizes calling conventions and attaches inlining hints.
//!
//! Both operate in place on a [`vxinstr::modules::Module`]. The flow (generic
//! SPIR or vendor HLS) is taken from the module's target triple, the remaining
//! options from [`utils::conf::PipelineConfig`].

pub mod classify;
pub mod inline;
pub mod magic;
pub mod mangling;
pub mod naming;
pub mod passes;
pub mod pipeline;
pub mod utils;
pub mod workgroup;
