//! Linkage and inlining hints for the optimizer and the back end.
use log::debug;
use vxinstr::modules::{
    Linkage, Module,
    attributes::{ATTR_ALWAYS_INLINE, ATTR_FLATTEN, ATTR_NOINLINE},
};

use crate::{
    classify::is_kernel,
    magic::GLOBAL_CTORS,
    pipeline::{Milestone, PipelineContext, Stage},
    utils::{conf::TargetFlow, error::PassResult},
};

/// Gives every non-kernel definition private linkage and drops its COMDAT, so
/// the optimizer may remove or specialize anything the kernels do not need.
pub struct PrivatizeNonKernels;

fn privatize(linkage: &mut Linkage, comdat: &mut Option<String>) -> bool {
    let changed = *linkage != Linkage::Private || comdat.is_some();
    *linkage = Linkage::Private;
    *comdat = None;
    changed
}

impl Stage for PrivatizeNonKernels {
    fn name(&self) -> &'static str {
        "privatize-non-kernels"
    }

    fn requires(&self) -> &'static [Milestone] {
        &[Milestone::WrappersUnwrapped]
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::NonKernelsPrivatized]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let mut count = 0;

        for function in module.functions.iter_mut() {
            if is_kernel(function) || function.is_declaration() || function.name == GLOBAL_CTORS {
                continue;
            }
            if privatize(&mut function.linkage, &mut function.comdat) {
                count += 1;
            }
        }

        for global in module.globals.iter_mut() {
            if global.is_declaration() || global.name == GLOBAL_CTORS {
                continue;
            }
            if privatize(&mut global.linkage, &mut global.comdat) {
                count += 1;
            }
        }

        if count > 0 {
            debug!("Privatized {} symbols", count);
        }
        Ok(count > 0)
    }
}

/// Inlining hints per flow.
///
/// The vendor back end inlines everything it is told to flatten, so kernels and
/// explicit `noinline` functions are flattened. The generic flow asks the
/// optimizer to inline every non-kernel definition.
pub struct ApplyInliningPolicy;

impl Stage for ApplyInliningPolicy {
    fn name(&self) -> &'static str {
        "apply-inlining-policy"
    }

    fn requires(&self) -> &'static [Milestone] {
        &[Milestone::ConventionsNormalized]
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::InliningPolicyApplied]
    }

    fn run(&self, module: &mut Module, ctx: &PipelineContext) -> PassResult<bool> {
        let mut changed = false;
        for function in module.functions.iter_mut() {
            let kernel = is_kernel(function);
            let attr = match ctx.flow {
                TargetFlow::VendorHls if kernel || function.attrs.has(ATTR_NOINLINE) => {
                    ATTR_FLATTEN
                }
                TargetFlow::Generic if !kernel && !function.is_declaration() => {
                    ATTR_ALWAYS_INLINE
                }
                _ => continue,
            };
            if function.attrs.insert_flag(attr) {
                debug!("Marked '{}' {}", function.name, attr);
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use vxinstr::{
        modules::{
            CallingConvention, Function, builder::FunctionBuilder, operand::IConst,
            symbol::GlobalVariable,
        },
        types::{AddressSpace, IType, Type},
    };

    use super::*;
    use crate::utils::conf::PipelineConfig;

    fn module() -> Module {
        let mut module = Module::new("spir64");
        let mut kernel = FunctionBuilder::new("kernel", [], None, CallingConvention::SpirKernel);
        kernel.ret(None);
        module.add_function(kernel.build());

        let mut helper = FunctionBuilder::new("helper", [], None, CallingConvention::SpirFunc)
            .with_linkage(Linkage::LinkOnceOdr)
            .with_comdat("helper");
        helper.ret(None);
        module.add_function(helper.build());

        let mut pinned = FunctionBuilder::new("pinned", [], None, CallingConvention::SpirFunc)
            .with_attr(ATTR_NOINLINE, "");
        pinned.ret(None);
        module.add_function(pinned.build());

        module.add_function(Function::new("_Z3absi", [Type::I32], Some(Type::I32), CallingConvention::SpirFunc));

        let mut table = GlobalVariable::new("table", Type::I32, AddressSpace::Global);
        table.initializer = Some(vec![IConst::new(IType::I32, 7)]);
        table.comdat = Some("table".to_string());
        module.add_global(table);

        let mut ctors = GlobalVariable::new(GLOBAL_CTORS, Type::I32, AddressSpace::Private);
        ctors.initializer = Some(Vec::new());
        module.add_global(ctors);
        module
    }

    fn ctx(flow: TargetFlow) -> PipelineContext {
        PipelineContext {
            config: PipelineConfig::default(),
            flow,
        }
    }

    #[test]
    fn only_non_kernel_definitions_become_private() {
        let mut module = module();
        assert!(PrivatizeNonKernels.run(&mut module, &ctx(TargetFlow::Generic)).unwrap());

        let linkages: Vec<_> = module.functions.iter().map(|f| f.linkage).collect();
        assert_eq!(
            linkages,
            [Linkage::External, Linkage::Private, Linkage::Private, Linkage::External]
        );
        assert_eq!(module.functions[1].comdat, None);
        assert_eq!(module.globals[0].linkage, Linkage::Private);
        assert_eq!(module.globals[0].comdat, None);
        assert_eq!(module.globals[1].linkage, Linkage::External);

        assert!(!PrivatizeNonKernels.run(&mut module, &ctx(TargetFlow::Generic)).unwrap());
    }

    #[test]
    fn vendor_flow_flattens_kernels_and_noinline_functions() {
        let mut module = module();
        ApplyInliningPolicy.run(&mut module, &ctx(TargetFlow::VendorHls)).unwrap();

        let flattened: Vec<_> = module
            .functions
            .iter()
            .filter(|f| f.attrs.has(ATTR_FLATTEN))
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(flattened, ["kernel", "pinned"]);
        assert!(module.functions.iter().all(|f| !f.attrs.has(ATTR_ALWAYS_INLINE)));
    }

    #[test]
    fn generic_flow_inlines_every_helper() {
        let mut module = module();
        assert!(ApplyInliningPolicy.run(&mut module, &ctx(TargetFlow::Generic)).unwrap());

        let inlined: Vec<_> = module
            .functions
            .iter()
            .filter(|f| f.attrs.has(ATTR_ALWAYS_INLINE))
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(inlined, ["helper", "pinned"]);
        assert!(!ApplyInliningPolicy.run(&mut module, &ctx(TargetFlow::Generic)).unwrap());
    }
}
