//! Elimination of property wrappers.
//!
//! Kernel-level properties are attached by wrapping the kernel body in a
//! function marked `fpga.propertywrapper` and carrying the `fpga.*` directives.
//! Each call to such a wrapper is inlined into its caller, and the wrapper's
//! directives move to the caller. Nested wrappers are unwrapped innermost first.
use std::collections::BTreeSet;

use log::debug;
use vxinstr::{
    analysis::CallGraph,
    modules::{
        Module,
        attributes::{ATTR_PROPERTY_WRAPPER, FPGA_NAMESPACE},
        operand::Label,
        symbol::FunctionPointer,
    },
};

use crate::{
    inline::inline_call,
    passes::kernels,
    pipeline::{Milestone, PipelineContext, Stage},
    utils::error::{PassError, PassResult},
};

pub struct UnwrapProperties;

struct Unwrapper<'m> {
    module: &'m mut Module,
    wrappers: BTreeSet<FunctionPointer>,
    /// Functions on the current unwrapping path, to detect wrapper cycles.
    visiting: Vec<FunctionPointer>,
    done: BTreeSet<FunctionPointer>,
}

impl<'m> Unwrapper<'m> {
    fn new(module: &'m mut Module) -> Self {
        let wrappers = module
            .functions
            .iter()
            .filter(|f| f.attrs.has(ATTR_PROPERTY_WRAPPER))
            .map(|f| f.pointer())
            .collect();
        Self {
            module,
            wrappers,
            visiting: Vec::new(),
            done: BTreeSet::new(),
        }
    }

    fn name_of(&self, ptr: FunctionPointer) -> String {
        self.module
            .function(ptr)
            .map(|f| f.name.clone())
            .unwrap_or_default()
    }

    fn unresolved(&self, caller: FunctionPointer, wrapper: FunctionPointer) -> PassError {
        PassError::UnresolvedPropertyWrapper {
            caller: self.name_of(caller),
            wrapper: self.name_of(wrapper),
        }
    }

    fn next_wrapper_call(&self, ptr: FunctionPointer) -> Option<(Label, usize, FunctionPointer)> {
        self.module.function(ptr)?.instructions().find_map(|(label, index, instr)| {
            instr
                .try_as_invoke_ref()
                .filter(|invoke| self.wrappers.contains(&invoke.function))
                .map(|invoke| (label, index, invoke.function))
        })
    }

    /// Inline every wrapper called from `ptr`. Returns the number of inlined calls.
    fn unwrap(&mut self, ptr: FunctionPointer) -> PassResult<usize> {
        if self.done.contains(&ptr) {
            return Ok(0);
        }
        self.visiting.push(ptr);

        let mut inlined = 0;
        while let Some((label, index, wrapper)) = self.next_wrapper_call(ptr) {
            if self.visiting.contains(&wrapper) {
                return Err(self.unresolved(ptr, wrapper));
            }
            inlined += self.unwrap(wrapper)?;

            let Some(body) = self
                .module
                .function(wrapper)
                .filter(|f| !f.is_declaration())
                .cloned()
            else {
                return Err(self.unresolved(ptr, wrapper));
            };
            let Some(caller) = self.module.function_mut(ptr) else {
                break;
            };

            for (key, value) in body.attrs.iter_prefixed(FPGA_NAMESPACE) {
                if key != ATTR_PROPERTY_WRAPPER {
                    caller.attrs.insert(key, value);
                }
            }
            inline_call(caller, label, index, &body)?;
            debug!("Unwrapped '{}' into '{}'", body.name, caller.name);
            inlined += 1;
        }

        self.visiting.pop();
        self.done.insert(ptr);
        Ok(inlined)
    }
}

/// Fail if any function reachable from a kernel still calls a wrapper.
fn check_no_wrappers(module: &Module) -> PassResult<()> {
    let graph = CallGraph::new(module);
    for ptr in graph.reachable_from(kernels(module)) {
        for callee in graph.callees(ptr) {
            if module
                .function(callee)
                .is_some_and(|f| f.attrs.has(ATTR_PROPERTY_WRAPPER))
            {
                return Err(PassError::UnresolvedPropertyWrapper {
                    caller: module.function(ptr).map(|f| f.name.clone()).unwrap_or_default(),
                    wrapper: module.function(callee).map(|f| f.name.clone()).unwrap_or_default(),
                });
            }
        }
    }
    Ok(())
}

impl Stage for UnwrapProperties {
    fn name(&self) -> &'static str {
        "unwrap-properties"
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::WrappersUnwrapped]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let reachable = CallGraph::new(module).reachable_from(kernels(module));
        let order: Vec<FunctionPointer> = module
            .functions
            .iter()
            .map(|f| f.pointer())
            .filter(|ptr| reachable.contains(ptr))
            .collect();

        let mut unwrapper = Unwrapper::new(module);
        if unwrapper.wrappers.is_empty() {
            return Ok(false);
        }

        let mut inlined = 0;
        for ptr in order {
            inlined += unwrapper.unwrap(ptr)?;
        }

        check_no_wrappers(module)?;
        Ok(inlined > 0)
    }
}

#[cfg(test)]
mod tests {
    use vxinstr::{
        modules::{CallingConvention, Function, builder::FunctionBuilder, operand::Operand},
        types::{IType, Type},
    };

    use super::*;
    use crate::utils::conf::{PipelineConfig, TargetFlow};

    fn ctx() -> PipelineContext {
        PipelineContext {
            config: PipelineConfig::default(),
            flow: TargetFlow::VendorHls,
        }
    }

    fn wrapper(name: &str, inner: &Function, directive: &str) -> Function {
        let mut b = FunctionBuilder::new(name, [Type::I32], None, CallingConvention::SpirFunc)
            .with_attr(ATTR_PROPERTY_WRAPPER, "")
            .with_attr(directive, "");
        let arg = b.param(0);
        b.call(inner, vec![arg]);
        b.ret(None);
        b.build()
    }

    fn kernel_calling(callee: &Function) -> Function {
        let mut b = FunctionBuilder::new("kernel", [Type::I32], None, CallingConvention::SpirKernel);
        let arg = b.param(0);
        b.call(callee, vec![arg]);
        b.ret(None);
        b.build()
    }

    fn body() -> Function {
        let mut b = FunctionBuilder::new("body", [Type::I32], None, CallingConvention::SpirFunc);
        let arg = b.param(0);
        b.add(IType::I32, arg, Operand::imm(IType::I32, 1));
        b.ret(None);
        b.build()
    }

    #[test]
    fn nested_wrappers_are_inlined_and_directives_kept() {
        let body = body();
        let inner = wrapper("inner", &body, "fpga.pipeline");
        let outer = wrapper("outer", &inner, "fpga.dataflow");
        let kernel = kernel_calling(&outer);
        let kernel_ptr = kernel.pointer();
        let body_ptr = body.pointer();

        let mut module = Module::new("fpga64-xilinx-none");
        module.add_function(kernel);
        module.add_function(outer);
        module.add_function(inner);
        module.add_function(body);

        assert!(UnwrapProperties.run(&mut module, &ctx()).unwrap());
        assert!(module.verify().is_ok());

        let kernel = module.function(kernel_ptr).unwrap();
        assert!(kernel.attrs.has("fpga.dataflow"));
        assert!(kernel.attrs.has("fpga.pipeline"));
        assert!(!kernel.attrs.has(ATTR_PROPERTY_WRAPPER));
        assert_eq!(kernel.call_sites(body_ptr).len(), 1);

        let graph = CallGraph::new(&module);
        assert_eq!(graph.callees(kernel_ptr), BTreeSet::from([body_ptr]));
        assert!(!UnwrapProperties.run(&mut module, &ctx()).unwrap());
    }

    #[test]
    fn body_less_wrapper_is_unresolved() {
        let mut decl = Function::new("decl", [Type::I32], None, CallingConvention::SpirFunc);
        decl.attrs.insert_flag(ATTR_PROPERTY_WRAPPER);
        let kernel = kernel_calling(&decl);

        let mut module = Module::new("fpga64-xilinx-none");
        module.add_function(kernel);
        module.add_function(decl);

        let err = UnwrapProperties.run(&mut module, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            PassError::UnresolvedPropertyWrapper { ref wrapper, .. } if wrapper == "decl"
        ));
    }

    #[test]
    fn wrapper_cycle_is_unresolved() {
        let mut first = FunctionBuilder::new("first", [], None, CallingConvention::SpirFunc)
            .with_attr(ATTR_PROPERTY_WRAPPER, "");
        let mut second = FunctionBuilder::new("second", [], None, CallingConvention::SpirFunc)
            .with_attr(ATTR_PROPERTY_WRAPPER, "");
        first.call_with(second.pointer(), None, CallingConvention::SpirFunc, vec![]);
        first.ret(None);
        second.call_with(first.pointer(), None, CallingConvention::SpirFunc, vec![]);
        second.ret(None);
        let (first, second) = (first.build(), second.build());

        let mut kernel = FunctionBuilder::new("kernel", [], None, CallingConvention::SpirKernel);
        kernel.call(&first, vec![]);
        kernel.ret(None);

        let mut module = Module::new("fpga64-xilinx-none");
        module.add_function(kernel.build());
        module.add_function(first);
        module.add_function(second);

        assert!(matches!(
            UnwrapProperties.run(&mut module, &ctx()),
            Err(PassError::UnresolvedPropertyWrapper { .. })
        ));
    }

    #[test]
    fn unreachable_wrappers_are_left_alone() {
        let body = body();
        let orphan = wrapper("orphan", &body, "fpga.pipeline");
        let orphan_ptr = orphan.pointer();
        let mut caller = FunctionBuilder::new("not_a_kernel", [Type::I32], None, CallingConvention::SpirFunc);
        let arg = caller.param(0);
        caller.call(&orphan, vec![arg]);
        caller.ret(None);

        let mut module = Module::new("fpga64-xilinx-none");
        module.add_function(caller.build());
        module.add_function(orphan);
        module.add_function(body);

        assert!(!UnwrapProperties.run(&mut module, &ctx()).unwrap());
        assert_eq!(module.users_of(orphan_ptr).len(), 1);
    }
}
