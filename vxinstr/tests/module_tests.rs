use vxinstr::{
    analysis::{CallGraph, control_flow_graph},
    modules::{
        CallingConvention, Function, Module,
        builder::FunctionBuilder,
        instructions::VxInstr,
        int::ICmpOp,
        operand::{Label, Name, Operand},
    },
    types::{AddressSpace, IType, Type},
    utils::Error,
};

/// `helper(x) = x + 1`, `kernel(p) = store helper(load p) into p`.
fn sample_module() -> Module {
    let mut module = Module::new("spir64-unknown-unknown");

    let mut helper = FunctionBuilder::new(
        "_Z6helperi",
        [Type::I32],
        Some(Type::I32),
        CallingConvention::SpirFunc,
    );
    let x = helper.param(0);
    let sum = helper.add(IType::I32, x, Operand::imm(IType::I32, 1));
    helper.ret(Some(sum.into()));
    let helper = helper.build();

    let mut kernel = FunctionBuilder::new(
        "_ZTS6kernel",
        [Type::ptr(AddressSpace::Global)],
        None,
        CallingConvention::SpirKernel,
    );
    let p = kernel.param(0);
    let value = kernel.load(Type::I32, p.clone());
    let result = kernel
        .call(&helper, vec![value.into()])
        .expect("helper returns a value");
    kernel.store(Type::I32, p, result.into());
    kernel.ret(None);

    module.add_function(helper);
    module.add_function(kernel.build());
    module
}

#[test]
fn builder_produces_valid_ssa() {
    let module = sample_module();
    module.verify().expect("sample module verifies");
    module
        .check_calling_conventions()
        .expect("sample conventions agree");
}

#[test]
fn next_available_name_skips_params_and_results() {
    let module = sample_module();
    let helper = module.function_by_name("_Z6helperi").unwrap();
    assert_eq!(helper.next_available_name(), Name(2));
    assert_eq!(helper.next_available_label(), Label(1));
}

#[test]
fn renaming_a_callee_keeps_call_sites_resolved() {
    let mut module = sample_module();
    let helper = module.function_by_name("_Z6helperi").unwrap().pointer();
    module.function_mut(helper).unwrap().name = "sycl_func_0".to_string();

    module.verify().unwrap();
    let printed = module.to_string();
    assert!(printed.contains("call spir_func i32 @sycl_func_0(%1)"));
    assert!(!printed.contains("_Z6helperi"));
}

#[test]
fn set_calling_convention_updates_every_call_site() {
    let mut module = sample_module();
    let helper = module.function_by_name("_Z6helperi").unwrap().pointer();

    assert!(module.set_calling_convention(helper, CallingConvention::C));
    assert!(!module.set_calling_convention(helper, CallingConvention::C));
    module.check_calling_conventions().unwrap();

    let users = module.users_of(helper);
    assert_eq!(users.len(), 1);
}

#[test]
fn mismatched_call_site_is_reported() {
    let mut module = sample_module();
    let helper = module.function_by_name("_Z6helperi").unwrap().pointer();
    module.function_mut(helper).unwrap().cconv = CallingConvention::C;

    let err = module.check_calling_conventions().unwrap_err();
    assert!(err.is_calling_convention_mismatch());
    assert!(err.to_string().contains("_Z6helperi"));
}

#[test]
fn replace_all_uses_rewrites_operands_and_terminators() {
    let mut module = sample_module();
    let helper = module.function_by_name("_Z6helperi").unwrap().pointer();
    let function = module.function_mut(helper).unwrap();

    let rewritten = function.replace_all_uses(Name(0), &Operand::imm(IType::I32, 41));
    assert_eq!(rewritten, 1);
    assert!(!function.has_uses(Name(0)));
    assert!(function.has_uses(Name(1)));
}

#[test]
fn split_block_moves_tail_and_fixes_phis() {
    let mut builder = FunctionBuilder::new(
        "select_like",
        [Type::I32],
        Some(Type::I32),
        CallingConvention::SpirFunc,
    );
    let x = builder.param(0);
    let cond = builder.icmp(ICmpOp::Eq, IType::I32, x.clone(), Operand::imm(IType::I32, 0));
    let bumped = builder.add(IType::I32, x.clone(), Operand::imm(IType::I32, 2));
    let then_bb = builder.block();
    let join_bb = builder.block();
    builder.branch(cond.into(), then_bb, join_bb);

    builder.switch_to(then_bb);
    builder.jump(join_bb);

    builder.switch_to(join_bb);
    let merged = builder.phi(
        Type::I32,
        vec![(Label::NIL, bumped.into()), (then_bb, x)],
    );
    builder.ret(Some(merged.into()));

    let mut function = builder.build();
    function.check_ssa().unwrap();

    let tail = function.split_block(Label::NIL, 1).unwrap();
    function.check_ssa().unwrap();

    let entry = &function.body[&Label::NIL];
    assert_eq!(entry.instructions.len(), 1);
    assert_eq!(function.body[&tail].instructions.len(), 1);

    let VxInstr::Phi(phi) = &function.body[&join_bb].instructions[0] else {
        panic!("join block starts with a phi");
    };
    assert_eq!(phi.values[0].0, tail);
}

#[test]
fn verify_rejects_duplicate_symbols() {
    let mut module = sample_module();
    module.add_function(Function::new(
        "_Z6helperi",
        [Type::I32],
        Some(Type::I32),
        CallingConvention::SpirFunc,
    ));
    assert_eq!(
        module.verify(),
        Err(Error::DuplicateSymbol("_Z6helperi".to_string()))
    );
}

#[test]
fn call_graph_reachability() {
    let mut module = sample_module();
    let orphan = module.add_function(Function::new(
        "orphan",
        [],
        None,
        CallingConvention::SpirFunc,
    ));
    let kernel = module.function_by_name("_ZTS6kernel").unwrap().pointer();
    let helper = module.function_by_name("_Z6helperi").unwrap().pointer();

    let graph = CallGraph::new(&module);
    let reached = graph.reachable_from([kernel]);
    assert!(reached.contains(&kernel));
    assert!(reached.contains(&helper));
    assert!(!reached.contains(&orphan));
    assert_eq!(graph.callers(helper).into_iter().collect::<Vec<_>>(), vec![kernel]);
    assert!(!graph.is_recursive(helper));
}

#[test]
fn cfg_has_one_node_per_block() {
    let module = sample_module();
    let kernel = module.function_by_name("_ZTS6kernel").unwrap();
    let cfg = control_flow_graph(kernel);
    assert_eq!(cfg.node_count(), 1);
    assert_eq!(cfg.edge_count(), 0);
}
