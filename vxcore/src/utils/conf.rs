use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    magic::{HLS_ARCHES, HLS_VENDOR},
    utils::error::PassResult,
};

/// Options supplied by the driver invoking the pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The module was already consumed by the external optimizer. In the vendor
    /// flow this selects the platform-default calling convention for device
    /// functions and enables folding of the global-id intrinsic.
    pub after_optimizer: bool,
}

impl PipelineConfig {
    /// Load a configuration from a TOML document. Missing keys take their default value.
    pub fn from_toml_str(toml_str: &str) -> PassResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// Policy family selected from the module's target triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TargetFlow {
    /// SPIR/OpenCL-style ABI.
    Generic,
    /// Vendor high-level synthesis ABI.
    VendorHls,
}

/// The components of a target triple `arch-vendor-os[-environment]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    pub arch: String,
    pub vendor: String,
    pub os: String,
    pub environment: Option<String>,
}

impl TargetTriple {
    /// Split a triple string. Missing components are left empty; this never fails.
    pub fn parse(triple: &str) -> Self {
        let mut parts = triple.splitn(4, '-');
        let mut next = || parts.next().unwrap_or_default().to_string();
        let arch = next();
        let vendor = next();
        let os = next();
        let environment = Some(next()).filter(|env| !env.is_empty());

        Self {
            arch,
            vendor,
            os,
            environment,
        }
    }

    pub fn is_hls(&self) -> bool {
        self.vendor == HLS_VENDOR && HLS_ARCHES.contains(&self.arch.as_str())
    }

    pub fn flow(&self) -> TargetFlow {
        if self.is_hls() {
            TargetFlow::VendorHls
        } else {
            TargetFlow::Generic
        }
    }
}
