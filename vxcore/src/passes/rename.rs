//! Renaming of kernels, helpers and builtin declarations.
use std::collections::BTreeSet;

use log::debug;
use vxinstr::modules::{
    Function, Module, instructions::VxInstr, metadata::MetadataNode, symbol::FunctionPointer,
};

use crate::{
    classify::{Role, classify, is_transitive_device_function},
    magic::WORK_GROUP_SIZE_METADATA,
    mangling::strip_library_prefix,
    naming::{helper_name, is_kernel_name, kernel_name, name_unnamed_params},
    pipeline::{Milestone, PipelineContext, Stage},
    utils::error::PassResult,
    workgroup::reqd_work_group_size,
};

/// Gives kernels their digest name and required work-group size, and device
/// helpers their `sycl_func_<n>` name. Unnamed parameters of both are named.
pub struct RenameKernelsAndHelpers;

impl RenameKernelsAndHelpers {
    fn rename_kernel(function: &mut Function) -> PassResult<bool> {
        let mut changed = name_unnamed_params(function) > 0;
        if is_kernel_name(&function.name) {
            return Ok(changed);
        }

        if let Some(sizes) = reqd_work_group_size(&function.name)? {
            debug!(
                "Kernel '{}' requires work-group size {:?}",
                function.name, sizes
            );
            function.metadata.insert(
                WORK_GROUP_SIZE_METADATA.to_string(),
                MetadataNode::from_i32s(sizes),
            );
        }

        let renamed = kernel_name(&function.name);
        debug!("Renaming kernel '{}' to '{}'", function.name, renamed);
        function.name = renamed;
        changed = true;
        Ok(changed)
    }

    fn is_renamed_helper(function: &Function) -> bool {
        classify(function).is_internal_helper() && is_transitive_device_function(function)
    }
}

impl Stage for RenameKernelsAndHelpers {
    fn name(&self) -> &'static str {
        "rename-kernels-and-helpers"
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::KernelsRenamed]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let mut changed = false;
        let mut helpers = 0;

        // Names held by functions that keep them; helper numbering skips these.
        let reserved: BTreeSet<String> = module
            .functions
            .iter()
            .filter(|f| !Self::is_renamed_helper(f))
            .map(|f| f.name.clone())
            .collect();

        for function in module.functions.iter_mut() {
            match classify(function) {
                Role::Kernel => changed |= Self::rename_kernel(function)?,
                Role::InternalHelper if is_transitive_device_function(function) => {
                    let mut renamed = helper_name(helpers);
                    while reserved.contains(&renamed) {
                        helpers += 1;
                        renamed = helper_name(helpers);
                    }
                    helpers += 1;
                    name_unnamed_params(function);
                    if function.name != renamed {
                        debug!("Renaming helper '{}' to '{}'", function.name, renamed);
                        function.name = renamed;
                        changed = true;
                    }
                }
                _ => {}
            }
        }

        Ok(changed)
    }
}

/// Rewrites builtin declarations to the names of the target's library, e.g.
/// `_Z24__spir_ocl_get_global_idj` becomes `_Z13get_global_idj`.
///
/// When the rewritten name is already declared, calls are redirected to the
/// existing declaration and the duplicate is dropped.
pub struct RewriteLibraryDeclarations;

impl RewriteLibraryDeclarations {
    fn redirect_calls(module: &mut Module, from: FunctionPointer, to: FunctionPointer) {
        for function in module.functions.iter_mut() {
            for bb in function.body.values_mut() {
                for instr in bb.instructions.iter_mut() {
                    if let VxInstr::Invoke(invoke) = instr {
                        if invoke.function == from {
                            invoke.function = to;
                        }
                    }
                }
            }
        }
    }
}

impl Stage for RewriteLibraryDeclarations {
    fn name(&self) -> &'static str {
        "rewrite-library-declarations"
    }

    fn requires(&self) -> &'static [Milestone] {
        &[Milestone::KernelsRenamed]
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::LibraryDeclarationsRewritten]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let renames: Vec<(FunctionPointer, String)> = module
            .functions
            .iter()
            .filter(|f| classify(f).is_device_library_function())
            .filter(|f| is_transitive_device_function(f))
            .filter_map(|f| strip_library_prefix(&f.name).map(|name| (f.pointer(), name)))
            .collect();

        let mut changed = false;
        for (ptr, renamed) in renames {
            let existing = module
                .function_by_name(&renamed)
                .map(|f| (f.pointer(), f.params.len(), f.return_type));

            match existing {
                Some((target, arity, return_type)) => {
                    debug_assert!(module.function(ptr).is_some_and(|f| {
                        f.params.len() == arity && f.return_type == return_type
                    }));
                    debug!(
                        "Merging builtin declaration into existing '{}'",
                        renamed
                    );
                    Self::redirect_calls(module, ptr, target);
                    module.remove_function(ptr);
                }
                None => {
                    if let Some(function) = module.function_mut(ptr) {
                        debug!("Renaming builtin '{}' to '{}'", function.name, renamed);
                        function.name = renamed;
                    }
                }
            }
            changed = true;
        }

        Ok(changed)
    }
}
