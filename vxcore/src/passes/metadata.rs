//! Module-level version records.
use log::debug;
use vxinstr::modules::{Module, metadata::MetadataNode};

use crate::{
    magic::{
        OCL_VERSION, OCL_VERSION_METADATA, SPIR_VERSION, SPIR_VERSION_METADATA,
        SPIRV_SOURCE_METADATA,
    },
    pipeline::{Milestone, PipelineContext, Stage},
    utils::error::PassResult,
};

/// Declares the SPIR and OpenCL versions the module conforms to and removes the
/// frontend's source-language record.
pub struct EmitVersionMetadata;

/// Register `node` under `name` unless an identical node is already there.
fn add_once(module: &mut Module, name: &str, node: MetadataNode) -> bool {
    let record = module.get_or_insert_named_metadata(name);
    if record.operands.contains(&node) {
        return false;
    }
    debug!("Adding !{} = {}", name, node);
    record.operands.push(node);
    true
}

impl Stage for EmitVersionMetadata {
    fn name(&self) -> &'static str {
        "emit-version-metadata"
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::VersionMetadataEmitted]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let mut changed = add_once(
            module,
            SPIR_VERSION_METADATA,
            MetadataNode::from_i32s(SPIR_VERSION),
        );
        changed |= add_once(
            module,
            OCL_VERSION_METADATA,
            MetadataNode::from_i32s(OCL_VERSION),
        );
        changed |= module.erase_named_metadata(SPIRV_SOURCE_METADATA);
        Ok(changed)
    }
}
