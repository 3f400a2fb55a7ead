//! Calling-convention normalization.
//!
//! Every non-kernel function and all of its call sites end up with the same
//! convention, chosen by the target flow:
//!
//! | flow       | `after_optimizer` | device functions |
//! |------------|-------------------|------------------|
//! | generic    | any               | `spir_func`      |
//! | vendor HLS | `false`           | `spir_func`      |
//! | vendor HLS | `true`            | `ccc`            |
//!
//! The vendor builtin library is linked with `spir_func` before the optimizer
//! runs, and the back end expects the platform default afterwards. Kernels keep
//! their convention; in the vendor flow they are tagged with `fpga.top.func`.
use log::debug;
use vxinstr::modules::{CallingConvention, Module, attributes::ATTR_TOP_FUNC};

use crate::{
    classify::is_kernel,
    pipeline::{Milestone, PipelineContext, Stage},
    utils::{conf::TargetFlow, error::PassResult},
};

pub struct NormalizeConventions;

impl NormalizeConventions {
    fn device_convention(ctx: &PipelineContext) -> CallingConvention {
        match ctx.flow {
            TargetFlow::VendorHls if ctx.config.after_optimizer => CallingConvention::C,
            _ => CallingConvention::SpirFunc,
        }
    }

    fn tag_kernel(module: &mut Module, index: usize) -> bool {
        let function = &mut module.functions[index];
        let name = function.name.clone();
        function.attrs.insert(ATTR_TOP_FUNC, name)
    }
}

impl Stage for NormalizeConventions {
    fn name(&self) -> &'static str {
        "normalize-conventions"
    }

    fn requires(&self) -> &'static [Milestone] {
        &[Milestone::WrappersUnwrapped]
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::ConventionsNormalized]
    }

    fn run(&self, module: &mut Module, ctx: &PipelineContext) -> PassResult<bool> {
        let cconv = Self::device_convention(ctx);
        let mut changed = false;

        for index in 0..module.functions.len() {
            let function = &module.functions[index];
            let ptr = function.pointer();
            if function.is_intrinsic() {
                continue;
            }

            if ctx.flow.is_vendor_hls() && function.attrs.has(ATTR_TOP_FUNC) {
                continue;
            }

            if function.cconv == CallingConvention::SpirKernel
                || (ctx.flow.is_generic() && is_kernel(function))
            {
                debug_assert!(
                    module.users_of(ptr).is_empty(),
                    "kernel '{}' is called from device code",
                    function.name
                );
                if ctx.flow.is_vendor_hls() {
                    changed |= Self::tag_kernel(module, index);
                }
                continue;
            }

            if module.set_calling_convention(ptr, cconv) {
                debug!(
                    "Set calling convention of '{}' and its call sites to {}",
                    module.functions[index].name, cconv
                );
                changed = true;
            }
        }

        Ok(changed)
    }
}
