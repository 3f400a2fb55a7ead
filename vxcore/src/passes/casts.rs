//! Removal of generic address-space casts feeding black-box intrinsics.
//!
//! The synthesis intrinsics (`_ssdm_*`) track their pointer arguments by
//! provenance and reject pointers laundered through the generic address space.
use std::collections::BTreeSet;

use log::debug;
use vxinstr::{
    modules::{
        Function, Module,
        instructions::VxInstr,
        operand::{Name, Operand},
        symbol::FunctionPointer,
    },
    types::AddressSpace,
};

use crate::{
    magic::BLACK_BOX_PREFIX,
    pipeline::{Milestone, PipelineContext, Stage},
    utils::error::PassResult,
};

pub struct ElideGenericCasts;

/// Register arguments passed to any function in `black_boxes`.
fn black_box_arguments(function: &Function, black_boxes: &BTreeSet<FunctionPointer>) -> Vec<Name> {
    function
        .instructions()
        .filter_map(|(_, _, instr)| instr.try_as_invoke_ref())
        .filter(|invoke| black_boxes.contains(&invoke.function))
        .flat_map(|invoke| invoke.args.iter().filter_map(Operand::reg))
        .collect()
}

/// Forward the source of the generic cast defining `name`, if it is one.
fn elide_cast(function: &mut Function, name: Name) -> bool {
    let Some((label, index, VxInstr::MCast(cast))) = function.definition(name) else {
        return false;
    };
    if cast.to != AddressSpace::Generic {
        return false;
    }

    let source = cast.value.clone();
    function.replace_all_uses(name, &source);
    function.remove_instruction(label, index);
    true
}

impl Stage for ElideGenericCasts {
    fn name(&self) -> &'static str {
        "elide-generic-casts"
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::GenericCastsElided]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let black_boxes: BTreeSet<FunctionPointer> = module
            .functions
            .iter()
            .filter(|f| f.name.starts_with(BLACK_BOX_PREFIX))
            .map(|f| f.pointer())
            .collect();
        if black_boxes.is_empty() {
            return Ok(false);
        }

        let mut changed = false;
        for function in module.functions.iter_mut() {
            let mut elided = 0;
            // A cast may feed several intrinsic calls; the first elision removes it.
            for name in black_box_arguments(function, &black_boxes) {
                if elide_cast(function, name) {
                    elided += 1;
                }
            }
            if elided > 0 {
                debug!(
                    "Removed {} generic casts feeding black-box intrinsics in '{}'",
                    elided, function.name
                );
                changed = true;
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use vxinstr::{
        modules::{CallingConvention, builder::FunctionBuilder},
        types::Type,
    };

    use super::*;
    use crate::utils::conf::{PipelineConfig, TargetFlow};

    #[test]
    fn generic_casts_are_forwarded() {
        let mut module = Module::new("fpga64-xilinx-none");
        let intrinsic = Function::new(
            "_ssdm_op_SpecInterface",
            [Type::ptr(AddressSpace::Generic)],
            None,
            CallingConvention::SpirFunc,
        );
        let other = Function::new(
            "_Z4sinkPv",
            [Type::ptr(AddressSpace::Generic)],
            None,
            CallingConvention::SpirFunc,
        );

        let mut b = FunctionBuilder::new(
            "user",
            [Type::ptr(AddressSpace::Global)],
            None,
            CallingConvention::SpirFunc,
        );
        let param = b.param(0);
        let to_generic = b.cast(param.clone(), AddressSpace::Global, AddressSpace::Generic);
        let kept = b.cast(param.clone(), AddressSpace::Global, AddressSpace::Generic);
        b.call(&intrinsic, vec![to_generic.into()]);
        b.call(&other, vec![kept.into()]);
        b.ret(None);

        module.add_function(intrinsic);
        module.add_function(other);
        module.add_function(b.build());

        let ctx = PipelineContext {
            config: PipelineConfig::default(),
            flow: TargetFlow::VendorHls,
        };
        assert!(ElideGenericCasts.run(&mut module, &ctx).unwrap());

        let user = &module.functions[2];
        let casts = user
            .instructions()
            .filter(|(_, _, i)| matches!(i, VxInstr::MCast(_)))
            .count();
        assert_eq!(casts, 1);
        let first_call = user
            .instructions()
            .find_map(|(_, _, i)| i.try_as_invoke_ref())
            .unwrap();
        assert_eq!(first_call.args, vec![param]);
        assert!(module.verify().is_ok());

        assert!(!ElideGenericCasts.run(&mut module, &ctx).unwrap());
    }
}
