//! Ordered stage lists and their execution.
//!
//! A [`Pipeline`] is an explicit list of [`Stage`]s. Every stage declares the
//! [`Milestone`]s it relies on and the ones it establishes; the order is checked
//! when the pipeline is built, so a stage can never run before the work it
//! depends on.
use std::collections::BTreeSet;

use log::{debug, info};
use strum::EnumIter;
use vxinstr::{modules::Module, utils::Error};

use crate::{
    passes::{
        builtins::CheckVendorBuiltins,
        casts::ElideGenericCasts,
        cconv::NormalizeConventions,
        linkage::{ApplyInliningPolicy, PrivatizeNonKernels},
        memintrin::LowerMemIntrinsics,
        metadata::EmitVersionMetadata,
        rename::{RenameKernelsAndHelpers, RewriteLibraryDeclarations},
        unwrap::UnwrapProperties,
    },
    utils::{
        conf::{PipelineConfig, TargetFlow, TargetTriple},
        error::{PassError, PassResult},
    },
};

/// Facts about a module established by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum Milestone {
    /// Kernels carry their digest name, helpers their `sycl_func_<n>` name.
    KernelsRenamed,
    /// No generic-space cast feeds a black-box intrinsic.
    GenericCastsElided,
    /// Builtin declarations use the target library's names.
    LibraryDeclarationsRewritten,
    /// SPIR and OpenCL version records are present.
    VersionMetadataEmitted,
    /// No property wrapper is reachable from a kernel.
    WrappersUnwrapped,
    /// Non-kernel definitions have private linkage.
    NonKernelsPrivatized,
    /// No memory intrinsic remains.
    MemIntrinsicsLowered,
    /// Every call site uses its callee's calling convention.
    ConventionsNormalized,
    /// The module calls no builtin the target flow rejects.
    BuiltinsChecked,
    /// Inlining hints for the back end are attached.
    InliningPolicyApplied,
}

/// Per-run information handed to every stage.
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub flow: TargetFlow,
}

/// A whole-module rewrite.
pub trait Stage {
    fn name(&self) -> &'static str;

    /// Milestones that must be established by earlier stages.
    fn requires(&self) -> &'static [Milestone] {
        &[]
    }

    /// Milestones established once this stage completed.
    fn provides(&self) -> &'static [Milestone];

    /// Rewrite `module`. Returns `true` if anything changed.
    fn run(&self, module: &mut Module, ctx: &PipelineContext) -> PassResult<bool>;
}

pub struct Pipeline {
    name: &'static str,
    stages: Vec<Box<dyn Stage>>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Build a pipeline, rejecting stage lists where a stage requires a milestone
    /// no earlier stage provides.
    pub fn new(
        name: &'static str,
        stages: Vec<Box<dyn Stage>>,
        config: PipelineConfig,
    ) -> PassResult<Self> {
        check_order(&stages)?;
        Ok(Self {
            name,
            stages,
            config,
        })
    }

    fn with_stages(name: &'static str, stages: Vec<Box<dyn Stage>>, config: PipelineConfig) -> Self {
        debug_assert!(check_order(&stages).is_ok());
        Self {
            name,
            stages,
            config,
        }
    }

    /// Make kernels and helpers acceptable to a SPIR consumer: digest kernel names,
    /// helper names, named arguments, library builtin names and version metadata.
    pub fn spir_compatibility(config: PipelineConfig) -> Self {
        Self::with_stages(
            "spir-compatibility",
            vec![
                Box::new(RenameKernelsAndHelpers),
                Box::new(ElideGenericCasts),
                Box::new(RewriteLibraryDeclarations),
                Box::new(EmitVersionMetadata),
            ],
            config,
        )
    }

    /// Prepare device code for the optimizer and the back end: unwrap property
    /// wrappers, privatize, lower memory intrinsics, normalize calling conventions
    /// and attach inlining hints.
    pub fn prepare_for_optimization(config: PipelineConfig) -> Self {
        Self::with_stages(
            "prepare-for-optimization",
            vec![
                Box::new(UnwrapProperties),
                Box::new(PrivatizeNonKernels),
                Box::new(LowerMemIntrinsics),
                Box::new(NormalizeConventions),
                Box::new(CheckVendorBuiltins),
                Box::new(ApplyInliningPolicy),
            ],
            config,
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|stage| stage.name())
    }

    /// Run every stage in order on `module`. Stops at the first error.
    ///
    /// Once a stage has established [`Milestone::ConventionsNormalized`], the
    /// convention of every call site is re-checked after each stage.
    pub fn run(&self, module: &mut Module) -> PassResult<bool> {
        let ctx = PipelineContext {
            config: self.config,
            flow: TargetTriple::parse(&module.triple).flow(),
        };
        info!(
            "Running pipeline '{}' ({} flow, after_optimizer = {}) on {} functions",
            self.name,
            ctx.flow,
            ctx.config.after_optimizer,
            module.functions.len()
        );

        module.verify()?;

        let mut established = BTreeSet::new();
        let mut changed = false;
        for stage in &self.stages {
            let stage_changed = stage.run(module, &ctx)?;
            debug!(
                "Stage '{}' finished ({})",
                stage.name(),
                if stage_changed { "changed" } else { "unchanged" }
            );
            changed |= stage_changed;
            established.extend(stage.provides().iter().copied());

            if established.contains(&Milestone::ConventionsNormalized) {
                check_conventions(module, stage.name())?;
            }
        }

        debug_assert!(module.verify().is_ok());
        info!("Pipeline '{}' done (changed = {})", self.name, changed);
        Ok(changed)
    }
}

fn check_order(stages: &[Box<dyn Stage>]) -> PassResult<()> {
    let mut established = BTreeSet::new();
    for stage in stages {
        if let Some(missing) = stage
            .requires()
            .iter()
            .find(|milestone| !established.contains(*milestone))
        {
            return Err(PassError::StageOrdering {
                stage: stage.name(),
                missing: *missing,
            });
        }
        established.extend(stage.provides().iter().copied());
    }
    Ok(())
}

fn check_conventions(module: &Module, stage: &'static str) -> PassResult<()> {
    match module.check_calling_conventions() {
        Ok(()) => Ok(()),
        Err(Error::CallingConventionMismatch {
            caller,
            callee,
            site,
            expected,
            ..
        }) => Err(PassError::ConventionMismatch {
            stage,
            caller,
            callee,
            site,
            expected,
        }),
        Err(err) => Err(err.into()),
    }
}
