use vxcore::{
    magic::GET_GLOBAL_ID_INTRINSIC,
    pipeline::Pipeline,
    utils::{conf::PipelineConfig, error::PassError},
};
use vxinstr::{
    analysis::CallGraph,
    modules::{
        CallingConvention, Function, Linkage, Module,
        attributes::{ATTR_ALWAYS_INLINE, ATTR_FLATTEN, ATTR_PROPERTY_WRAPPER, ATTR_TOP_FUNC},
        builder::FunctionBuilder,
        instructions::VxInstr,
        mem::MemTransfer,
        operand::Operand,
    },
    types::{AddressSpace, IType, Type},
};

// Helpers

/// `kernel(dst, src)` calls a property wrapper around `body(dst, src)`, which
/// copies 16 bytes with `memcpy` and stores the global id through `store_id`.
fn device_module(triple: &str) -> Module {
    let mut module = Module::new(triple);
    let ptr = Type::ptr(AddressSpace::Global);

    let global_id = Function::new(
        GET_GLOBAL_ID_INTRINSIC,
        [Type::I32],
        Some(Type::I64),
        CallingConvention::C,
    );

    let mut store_id = FunctionBuilder::new("store_id", [ptr], None, CallingConvention::C)
        .with_linkage(Linkage::LinkOnceOdr)
        .with_comdat("store_id");
    let dst = store_id.param(0);
    let id = store_id
        .call(&global_id, vec![Operand::imm(IType::I32, 0)])
        .unwrap();
    store_id.store(Type::I64, dst, id.into());
    store_id.ret(None);
    let store_id = store_id.build();

    let mut body = FunctionBuilder::new("body", [ptr, ptr], None, CallingConvention::SpirFunc);
    let (dst, src) = (body.param(0), body.param(1));
    body.push(VxInstr::MemCpy(MemTransfer {
        dst: dst.clone(),
        dst_addrspace: AddressSpace::Global,
        src,
        src_addrspace: AddressSpace::Global,
        len: Operand::imm(IType::I64, 16),
        len_ty: IType::I64,
        alignment: Some(4),
        volatile: false,
    }));
    body.call(&store_id, vec![dst]);
    body.ret(None);
    let body = body.build();

    let mut wrapper = FunctionBuilder::new("wrapper", [ptr, ptr], None, CallingConvention::SpirFunc)
        .with_attr(ATTR_PROPERTY_WRAPPER, "")
        .with_attr("fpga.dataflow", "");
    let args = vec![wrapper.param(0), wrapper.param(1)];
    wrapper.call(&body, args);
    wrapper.ret(None);
    let wrapper = wrapper.build();

    let mut kernel = FunctionBuilder::new(
        "xSYCL18056571196894167053",
        [ptr, ptr],
        None,
        CallingConvention::SpirKernel,
    );
    let args = vec![kernel.param(0), kernel.param(1)];
    kernel.call(&wrapper, args);
    kernel.ret(None);

    module.add_function(kernel.build());
    module.add_function(wrapper);
    module.add_function(body);
    module.add_function(store_id);
    module.add_function(global_id);
    module
}

fn prepare(module: &mut Module, after_optimizer: bool) -> Result<bool, PassError> {
    Pipeline::prepare_for_optimization(PipelineConfig { after_optimizer }).run(module)
}

fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
    module.function_by_name(name).unwrap()
}

#[test]
fn vendor_flow_after_optimizer() {
    let mut module = device_module("fpga64-xilinx-none");
    assert!(prepare(&mut module, true).unwrap());
    module.verify().unwrap();
    module.check_calling_conventions().unwrap();

    let kernel = function(&module, "xSYCL18056571196894167053");
    assert_eq!(kernel.cconv, CallingConvention::SpirKernel);
    assert_eq!(kernel.linkage, Linkage::External);
    assert_eq!(kernel.attrs.get(ATTR_TOP_FUNC), Some("xSYCL18056571196894167053"));
    assert!(kernel.attrs.has("fpga.dataflow"));
    assert!(kernel.attrs.has(ATTR_FLATTEN));

    let graph = CallGraph::new(&module);
    let wrapper = function(&module, "wrapper").pointer();
    assert!(!graph.reachable_from([kernel.pointer()]).contains(&wrapper));

    assert!(
        module
            .functions
            .iter()
            .flat_map(|f| f.instructions())
            .all(|(_, _, instr)| !instr.is_mem_intrinsic())
    );

    let store_id = function(&module, "store_id");
    assert_eq!(store_id.cconv, CallingConvention::C);
    assert_eq!(store_id.linkage, Linkage::Private);
    assert_eq!(store_id.comdat, None);
    assert!(module.function_by_name(GET_GLOBAL_ID_INTRINSIC).is_none());
}

#[test]
fn vendor_flow_before_optimizer_keeps_global_id() {
    let mut module = device_module("fpga64-xilinx-none");
    prepare(&mut module, false).unwrap();
    module.check_calling_conventions().unwrap();

    assert_eq!(function(&module, "body").cconv, CallingConvention::SpirFunc);
    assert_eq!(function(&module, "store_id").cconv, CallingConvention::SpirFunc);
    // Intrinsics keep their convention.
    assert_eq!(
        function(&module, GET_GLOBAL_ID_INTRINSIC).cconv,
        CallingConvention::C
    );
}

#[test]
fn generic_flow_forces_inlining() {
    let mut module = device_module("spir64-unknown-unknown");
    prepare(&mut module, false).unwrap();
    module.check_calling_conventions().unwrap();

    let kernel = function(&module, "xSYCL18056571196894167053");
    assert!(!kernel.attrs.has(ATTR_TOP_FUNC));
    assert!(!kernel.attrs.has(ATTR_ALWAYS_INLINE));
    for name in ["wrapper", "body", "store_id"] {
        let helper = function(&module, name);
        assert_eq!(helper.cconv, CallingConvention::SpirFunc, "{}", name);
        assert!(helper.attrs.has(ATTR_ALWAYS_INLINE), "{}", name);
        assert!(!helper.attrs.has(ATTR_FLATTEN), "{}", name);
    }
    assert!(module.function_by_name(GET_GLOBAL_ID_INTRINSIC).is_some());
}

#[test]
fn vendor_flow_rejects_unsupported_builtins() {
    let mut module = device_module("fpga64-xilinx-none");
    let builtin = Function::new(
        "_Z24__spir_ocl_get_local_idj",
        [Type::I32],
        Some(Type::I64),
        CallingConvention::SpirFunc,
    );
    let mut user = FunctionBuilder::new("user", [], None, CallingConvention::SpirFunc);
    user.call(&builtin, vec![Operand::imm(IType::I32, 0)]);
    user.ret(None);
    module.add_function(user.build());
    module.add_function(builtin);

    let err = prepare(&mut module, false).unwrap_err();
    assert!(matches!(
        err,
        PassError::UnsupportedBuiltin { ref caller, .. } if caller == "user"
    ));
}

#[test]
fn generic_flow_ignores_vendor_builtins() {
    let mut module = device_module("spir64-unknown-unknown");
    let builtin = Function::new(
        "_Z24__spir_ocl_get_local_idj",
        [Type::I32],
        Some(Type::I64),
        CallingConvention::SpirFunc,
    );
    let mut user = FunctionBuilder::new("user", [], None, CallingConvention::SpirFunc);
    user.call(&builtin, vec![Operand::imm(IType::I32, 0)]);
    user.ret(None);
    module.add_function(user.build());
    module.add_function(builtin);

    assert!(prepare(&mut module, false).is_ok());
}

#[test]
fn config_is_read_from_toml() {
    let config = PipelineConfig::from_toml_str("after_optimizer = true").unwrap();
    let mut module = device_module("vitis_ip-xilinx-none");
    Pipeline::prepare_for_optimization(config)
        .run(&mut module)
        .unwrap();
    assert_eq!(function(&module, "body").cconv, CallingConvention::C);
}

#[test]
fn stage_order_is_fixed() {
    let config = PipelineConfig::default();
    let spir: Vec<_> = Pipeline::spir_compatibility(config).stage_names().collect();
    assert_eq!(
        spir,
        [
            "rename-kernels-and-helpers",
            "elide-generic-casts",
            "rewrite-library-declarations",
            "emit-version-metadata",
        ]
    );
    let prepare: Vec<_> = Pipeline::prepare_for_optimization(config)
        .stage_names()
        .collect();
    assert_eq!(
        prepare,
        [
            "unwrap-properties",
            "privatize-non-kernels",
            "lower-mem-intrinsics",
            "normalize-conventions",
            "check-vendor-builtins",
            "apply-inlining-policy",
        ]
    );
}
