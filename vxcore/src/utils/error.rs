use thiserror::Error;
use vxinstr::modules::CallingConvention;

#[derive(Debug, Error)]
pub enum PassError {
    #[error(
        "The reqd_work_group_size property of kernel '{kernel}' has {found} dimensions, expected 3"
    )]
    MalformedWorkGroupSize { kernel: String, found: usize },

    #[error("Kernel name '{kernel}' uses reqd_work_group_size but cannot be demangled")]
    UndecodableKernelName { kernel: String },

    #[error("Unsupported SPIR-V builtin '{builtin}' called from '{caller}'")]
    UnsupportedBuiltin { caller: String, builtin: String },

    #[error(
        "Property wrapper '{wrapper}' is still called from '{caller}' after unwrapping"
    )]
    UnresolvedPropertyWrapper { caller: String, wrapper: String },

    #[error(
        "Calling convention mismatch after stage '{stage}': call from '{caller}' to '{callee}' uses {site}, callee uses {expected}"
    )]
    ConventionMismatch {
        stage: &'static str,
        caller: String,
        callee: String,
        site: CallingConvention,
        expected: CallingConvention,
    },

    #[error("Stage '{stage}' requires milestone {missing:?} which no earlier stage provides")]
    StageOrdering {
        stage: &'static str,
        missing: crate::pipeline::Milestone,
    },

    #[error("Invalid module: {0}")]
    InvalidModule(#[from] vxinstr::utils::Error),

    #[error("Failed to parse pipeline configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type PassResult<T> = Result<T, PassError>;
