//! Builtin checks of the vendor HLS flow.
//!
//! The vendor library has no implementation of the `__spir_ocl_get*` work-item
//! queries, and after the optimizer the global-id intrinsic must be gone.
use log::debug;
use vxinstr::{
    modules::{
        Function, Module, instructions::VxInstr, operand::Operand, symbol::FunctionPointer,
    },
    types::{IType, Type},
};

use crate::{
    magic::{FOLDED_GLOBAL_ID, GET_GLOBAL_ID_INTRINSIC, UNSUPPORTED_BUILTIN_PREFIX},
    mangling::demangle_or_raw,
    pipeline::{Milestone, PipelineContext, Stage},
    utils::error::{PassError, PassResult},
};

pub struct CheckVendorBuiltins;

/// Fail on the first call to a builtin the vendor library does not provide.
pub fn reject_unsupported(module: &Module) -> PassResult<()> {
    let unsupported = module
        .functions
        .iter()
        .filter(|f| demangle_or_raw(&f.name).starts_with(UNSUPPORTED_BUILTIN_PREFIX));

    for builtin in unsupported {
        if let Some(site) = module.users_of(builtin.pointer()).first() {
            let caller = module
                .function(site.caller)
                .map(|f| f.name.clone())
                .unwrap_or_default();
            return Err(PassError::UnsupportedBuiltin {
                caller,
                builtin: builtin.name.clone(),
            });
        }
    }
    Ok(())
}

/// Replace every result of the global-id intrinsic by a constant and erase the
/// calls and the declaration. Returns `true` if the intrinsic was present.
pub fn fold_global_id(module: &mut Module) -> bool {
    let Some((ptr, ty)) = module
        .function_by_name(GET_GLOBAL_ID_INTRINSIC)
        .map(|f| (f.pointer(), f.return_type))
    else {
        return false;
    };
    let ty = match ty {
        Some(Type::Int(ty)) => ty,
        _ => IType::I64,
    };
    let constant = Operand::imm(ty, FOLDED_GLOBAL_ID);

    let mut folded = 0;
    for function in module.functions.iter_mut() {
        folded += fold_calls(function, ptr, &constant);
    }
    module.remove_function(ptr);
    debug!(
        "Folded {} calls to '{}' to {}",
        folded, GET_GLOBAL_ID_INTRINSIC, FOLDED_GLOBAL_ID
    );
    true
}

fn fold_calls(function: &mut Function, callee: FunctionPointer, constant: &Operand) -> usize {
    let mut folded = 0;
    while let Some((label, index)) = function.call_sites(callee).first().copied() {
        if let Some(VxInstr::Invoke(invoke)) = function.remove_instruction(label, index) {
            if let Some(dest) = invoke.dest {
                function.replace_all_uses(dest, constant);
            }
        }
        folded += 1;
    }
    folded
}

impl Stage for CheckVendorBuiltins {
    fn name(&self) -> &'static str {
        "check-vendor-builtins"
    }

    fn requires(&self) -> &'static [Milestone] {
        &[Milestone::ConventionsNormalized]
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::BuiltinsChecked]
    }

    fn run(&self, module: &mut Module, ctx: &PipelineContext) -> PassResult<bool> {
        if !ctx.flow.is_vendor_hls() {
            return Ok(false);
        }

        reject_unsupported(module)?;
        Ok(ctx.config.after_optimizer && fold_global_id(module))
    }
}
