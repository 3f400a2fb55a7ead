//! Inlining of a single call site.
//!
//! The callee body is cloned into the caller with every SSA name and block label
//! shifted past the caller's own, parameters replaced by the call arguments and
//! every `ret` turned into a jump to the continuation block holding the
//! instructions that followed the call.
use std::collections::BTreeMap;

use log::trace;
use vxinstr::{
    modules::{
        BasicBlock, Function, Instruction,
        instructions::VxInstr,
        misc::Phi,
        operand::{Label, Name, Operand},
        terminator::{Jump, Terminator},
    },
    utils::Error,
};

/// Renaming applied to the cloned callee body.
struct Remap<'a> {
    params: BTreeMap<Name, &'a Operand>,
    name_base: u32,
    label_base: u32,
}

impl Remap<'_> {
    fn name(&self, name: Name) -> Name {
        Name(name.0 + self.name_base)
    }

    fn label(&self, label: Label) -> Label {
        Label(label.0 + self.label_base)
    }

    fn operand(&self, operand: &mut Operand) {
        if let Operand::Reg(name) = operand {
            *operand = match self.params.get(name) {
                Some(arg) => (*arg).clone(),
                None => Operand::Reg(self.name(*name)),
            };
        }
    }
}

/// Inline the call at instruction `index` of block `label` in `caller`.
///
/// `callee` must be the function targeted by that call and must have a body.
/// Returns the label of the continuation block.
pub fn inline_call(
    caller: &mut Function,
    label: Label,
    index: usize,
    callee: &Function,
) -> Result<Label, Error> {
    debug_assert!(!callee.is_declaration());

    let continuation = caller.split_block(label, index)?;
    let Some(VxInstr::Invoke(invoke)) = caller.remove_instruction(continuation, 0) else {
        return Err(Error::UndefinedBasicBlock {
            function: caller.name.clone(),
            label,
        });
    };
    debug_assert_eq!(invoke.function, callee.pointer());

    let remap = Remap {
        params: callee
            .params
            .iter()
            .map(|p| p.value)
            .zip(invoke.args.iter())
            .collect(),
        name_base: caller
            .next_available_name()
            .0
            .max(invoke.dest.map_or(0, |dest| dest.0 + 1)),
        label_base: caller.next_available_label().0,
    };

    let mut returns: Vec<(Label, Operand)> = Vec::new();
    for bb in callee.body.values() {
        let new_label = remap.label(bb.label);
        let mut instructions = bb.instructions.clone();
        for instr in instructions.iter_mut() {
            if let Some(dest) = instr.destination() {
                instr.set_destination(remap.name(dest));
            }
            for op in instr.operands_mut() {
                remap.operand(op);
            }
            if let VxInstr::Phi(phi) = instr {
                for (pred, _) in phi.values.iter_mut() {
                    *pred = remap.label(*pred);
                }
            }
        }

        let mut terminator = bb.terminator.clone();
        for op in terminator.operands_mut() {
            remap.operand(op);
        }
        for target in terminator.targets_mut() {
            *target = remap.label(*target);
        }
        if let Terminator::Ret(ret) = terminator {
            if let Some(value) = ret.value {
                returns.push((new_label, value));
            }
            terminator = Terminator::Jump(Jump {
                target: continuation,
            });
        }

        caller.body.insert(
            new_label,
            BasicBlock {
                label: new_label,
                instructions,
                terminator,
            },
        );
    }

    if let Some(bb) = caller.body.get_mut(&label) {
        bb.terminator = Terminator::Jump(Jump {
            target: remap.label(Label::NIL),
        });
    }

    if let (Some(dest), Some(ty)) = (invoke.dest, invoke.ty) {
        match returns.len() {
            0 => {
                caller.replace_all_uses(dest, &Operand::Undef(ty));
            }
            1 => {
                let (_, value) = returns.remove(0);
                caller.replace_all_uses(dest, &value);
            }
            _ => {
                if let Some(bb) = caller.body.get_mut(&continuation) {
                    bb.instructions.insert(
                        0,
                        Phi {
                            dest,
                            ty,
                            values: returns,
                        }
                        .into(),
                    );
                }
            }
        }
    }

    trace!(
        "Inlined '{}' into '{}' at {}:{}",
        callee.name, caller.name, label, index
    );
    Ok(continuation)
}

#[cfg(test)]
mod tests {
    use vxinstr::{
        modules::{CallingConvention, builder::FunctionBuilder, int::ICmpOp},
        types::{IType, Type},
    };

    use super::*;

    fn abs_like() -> Function {
        let mut builder = FunctionBuilder::new(
            "pick",
            [Type::I32, Type::I32],
            Some(Type::I32),
            CallingConvention::SpirFunc,
        );
        let a = builder.param(0);
        let b = builder.param(1);
        let cond = builder.icmp(ICmpOp::Slt, IType::I32, a.clone(), b.clone());
        let left = builder.block();
        let right = builder.block();
        builder.branch(cond.into(), left, right);
        builder.switch_to(left);
        builder.ret(Some(a));
        builder.switch_to(right);
        let sum = builder.add(IType::I32, b, Operand::imm(IType::I32, 1));
        builder.ret(Some(sum.into()));
        builder.build()
    }

    #[test]
    fn single_return_is_substituted() {
        let mut inc = FunctionBuilder::new(
            "inc",
            [Type::I32],
            Some(Type::I32),
            CallingConvention::SpirFunc,
        );
        let x = inc.param(0);
        let y = inc.add(IType::I32, x, Operand::imm(IType::I32, 1));
        inc.ret(Some(y.into()));
        let inc = inc.build();

        let mut caller =
            FunctionBuilder::new("caller", [Type::I32], Some(Type::I32), CallingConvention::SpirFunc);
        let p = caller.param(0);
        let r = caller.call(&inc, vec![p]).unwrap();
        let s = caller.add(IType::I32, r.into(), r.into());
        caller.ret(Some(s.into()));
        let mut caller = caller.build();

        inline_call(&mut caller, Label::NIL, 0, &inc).unwrap();
        caller.check_ssa().unwrap();
        assert!(caller.instructions().all(|(_, _, i)| !i.is_invoke()));
        assert!(!caller.has_uses(r));
    }

    #[test]
    fn multiple_returns_merge_through_phi() {
        let pick = abs_like();
        let mut caller =
            FunctionBuilder::new("caller", [Type::I32], Some(Type::I32), CallingConvention::SpirFunc);
        let p = caller.param(0);
        let r = caller
            .call(&pick, vec![p, Operand::imm(IType::I32, 7)])
            .unwrap();
        caller.ret(Some(r.into()));
        let mut caller = caller.build();

        let continuation = inline_call(&mut caller, Label::NIL, 0, &pick).unwrap();
        caller.check_ssa().unwrap();

        let VxInstr::Phi(phi) = &caller.body[&continuation].instructions[0] else {
            panic!("continuation starts with the merged return value");
        };
        assert_eq!(phi.dest, r);
        assert_eq!(phi.values.len(), 2);
        assert!(phi.values.iter().any(|(_, v)| *v == Operand::Reg(Name(0))));
        assert_eq!(caller.body.len(), 5);
    }

    #[test]
    fn successor_phis_follow_the_continuation() {
        let mut noop = FunctionBuilder::new("noop", [], None, CallingConvention::SpirFunc);
        noop.ret(None);
        let noop = noop.build();

        let mut caller =
            FunctionBuilder::new("caller", [Type::I1], Some(Type::I32), CallingConvention::SpirFunc);
        let c = caller.param(0);
        let other = caller.block();
        let join = caller.block();
        caller.call(&noop, vec![]);
        caller.branch(c, join, other);
        caller.switch_to(other);
        caller.jump(join);
        caller.switch_to(join);
        let v = caller.phi(
            Type::I32,
            vec![
                (Label::NIL, Operand::imm(IType::I32, 1)),
                (other, Operand::imm(IType::I32, 2)),
            ],
        );
        caller.ret(Some(v.into()));
        let mut caller = caller.build();

        let continuation = inline_call(&mut caller, Label::NIL, 0, &noop).unwrap();
        caller.check_ssa().unwrap();
        let VxInstr::Phi(phi) = &caller.body[&join].instructions[0] else {
            panic!("join keeps its phi");
        };
        assert_eq!(phi.values[0].0, continuation);
    }
}
