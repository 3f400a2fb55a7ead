//! Lowering of `memcpy`, `memmove` and `memset` to explicit byte loops.
//!
//! The loops are guarded on a non-zero length. `memmove` compares the two
//! pointers and copies backward when the source lies below the destination.
use log::{debug, trace};
use vxinstr::{
    modules::{
        BasicBlock, Function, Module,
        instructions::VxInstr,
        int::{IAdd, ICmp, ICmpOp},
        mem::{MLoad, MOffset, MStore, MemSet, MemTransfer},
        misc::Phi,
        operand::{Label, Name, Operand},
        terminator::{CBranch, Terminator, Trap},
    },
    types::{AddressSpace, IType, Type},
    utils::Error,
};

use crate::{
    pipeline::{Milestone, PipelineContext, Stage},
    utils::error::PassResult,
};

pub struct LowerMemIntrinsics;

/// Per-byte body of a loop: what to store at byte offset `index`.
enum ByteOp<'a> {
    Copy(&'a MemTransfer),
    Fill(&'a MemSet),
}

/// Emits new blocks and instructions into a function being lowered.
struct Emitter<'f> {
    function: &'f mut Function,
    next_name: u32,
}

impl<'f> Emitter<'f> {
    fn new(function: &'f mut Function) -> Self {
        let next_name = function.next_available_name().0;
        Self {
            function,
            next_name,
        }
    }

    fn fresh(&mut self) -> Name {
        let name = Name(self.next_name);
        self.next_name += 1;
        name
    }

    fn block(&mut self) -> Label {
        let label = self.function.next_available_label();
        self.function.body.insert(
            label,
            BasicBlock {
                label,
                instructions: Vec::new(),
                terminator: Terminator::Trap(Trap),
            },
        );
        label
    }

    fn push(&mut self, label: Label, instr: impl Into<VxInstr>) {
        if let Some(bb) = self.function.body.get_mut(&label) {
            bb.instructions.push(instr.into());
        }
    }

    fn terminate(&mut self, label: Label, terminator: Terminator) {
        if let Some(bb) = self.function.body.get_mut(&label) {
            bb.terminator = terminator;
        }
    }

    fn icmp(&mut self, label: Label, op: ICmpOp, ty: Type, lhs: Operand, rhs: Operand) -> Name {
        let dest = self.fresh();
        self.push(
            label,
            ICmp {
                dest,
                ty,
                op,
                lhs,
                rhs,
            },
        );
        dest
    }

    fn add(&mut self, label: Label, ty: IType, lhs: Operand, rhs: Operand) -> Name {
        let dest = self.fresh();
        self.push(label, IAdd { dest, ty, lhs, rhs });
        dest
    }

    fn offset(&mut self, label: Label, addrspace: AddressSpace, base: &Operand, index: Name) -> Name {
        let dest = self.fresh();
        self.push(
            label,
            MOffset {
                dest,
                addrspace,
                base: base.clone(),
                offset: index.into(),
            },
        );
        dest
    }

    fn branch(&mut self, label: Label, cond: Name, target_true: Label, target_false: Label) {
        self.terminate(
            label,
            Terminator::CBranch(CBranch {
                cond: cond.into(),
                target_true,
                target_false,
            }),
        );
    }

    /// Emit the load/store pair moving (or writing) the byte at `index`.
    fn byte(&mut self, label: Label, op: &ByteOp, index: Name) {
        match op {
            ByteOp::Copy(transfer) => {
                let src = self.offset(label, transfer.src_addrspace, &transfer.src, index);
                let dst = self.offset(label, transfer.dst_addrspace, &transfer.dst, index);
                let byte = self.fresh();
                self.push(
                    label,
                    MLoad {
                        dest: byte,
                        ty: Type::I8,
                        addr: src.into(),
                        alignment: None,
                        volatile: transfer.volatile,
                    },
                );
                self.push(
                    label,
                    MStore {
                        addr: dst.into(),
                        value: byte.into(),
                        ty: Type::I8,
                        alignment: None,
                        volatile: transfer.volatile,
                    },
                );
            }
            ByteOp::Fill(set) => {
                let dst = self.offset(label, set.dst_addrspace, &set.dst, index);
                self.push(
                    label,
                    MStore {
                        addr: dst.into(),
                        value: set.value.clone(),
                        ty: Type::I8,
                        alignment: None,
                        volatile: set.volatile,
                    },
                );
            }
        }
    }

    /// Loop over byte offsets `0..len`, entered from `pred`. Returns the loop header.
    fn forward_loop(
        &mut self,
        pred: Label,
        exit: Label,
        op: &ByteOp,
        len: &Operand,
        len_ty: IType,
    ) -> Label {
        let body = self.block();
        let index = self.fresh();
        let next = self.fresh();
        self.push(
            body,
            Phi {
                dest: index,
                ty: len_ty.into(),
                values: vec![
                    (pred, Operand::imm(len_ty, 0)),
                    (body, next.into()),
                ],
            },
        );
        self.byte(body, op, index);
        self.push(
            body,
            IAdd {
                dest: next,
                ty: len_ty,
                lhs: index.into(),
                rhs: Operand::imm(len_ty, 1),
            },
        );
        let more = self.icmp(body, ICmpOp::Ult, len_ty.into(), next.into(), len.clone());
        self.branch(body, more, body, exit);
        body
    }

    /// Loop over byte offsets `len-1` down to `0`, entered from `pred`.
    fn backward_loop(
        &mut self,
        pred: Label,
        exit: Label,
        op: &ByteOp,
        len: &Operand,
        len_ty: IType,
    ) -> Label {
        let body = self.block();
        let counter = self.fresh();
        let index = self.fresh();
        self.push(
            body,
            Phi {
                dest: counter,
                ty: len_ty.into(),
                values: vec![(pred, len.clone()), (body, index.into())],
            },
        );
        // Adding all ones decrements modulo the counter width.
        self.push(
            body,
            IAdd {
                dest: index,
                ty: len_ty,
                lhs: counter.into(),
                rhs: Operand::imm(len_ty, u64::MAX),
            },
        );
        self.byte(body, op, index);
        let more = self.icmp(
            body,
            ICmpOp::Ne,
            len_ty.into(),
            index.into(),
            Operand::imm(len_ty, 0),
        );
        self.branch(body, more, body, exit);
        body
    }
}

/// Replace the intrinsic at `index` of block `label` by its loop.
///
/// Returns `false` if that instruction is not a memory intrinsic.
fn lower_at(function: &mut Function, label: Label, index: usize) -> Result<bool, Error> {
    let intrinsic = match function
        .body
        .get(&label)
        .and_then(|bb| bb.instructions.get(index))
    {
        Some(instr) if instr.is_mem_intrinsic() => instr.clone(),
        _ => return Ok(false),
    };
    trace!(
        "Lowering {:?} in block {} of '{}'",
        intrinsic, label, function.name
    );

    let continuation = function.split_block(label, index)?;
    function.remove_instruction(continuation, 0);

    let (op, len, len_ty) = match &intrinsic {
        VxInstr::MemSet(set) => (ByteOp::Fill(set), set.len.clone(), set.len_ty),
        VxInstr::MemCpy(transfer) | VxInstr::MemMove(transfer) => {
            (ByteOp::Copy(transfer), transfer.len.clone(), transfer.len_ty)
        }
        _ => return Ok(false),
    };

    let mut emitter = Emitter::new(function);
    let nonzero = emitter.icmp(
        label,
        ICmpOp::Ne,
        len_ty.into(),
        len.clone(),
        Operand::imm(len_ty, 0),
    );

    let entry = match &intrinsic {
        VxInstr::MemMove(transfer) => {
            let choose = emitter.block();
            let backward = emitter.backward_loop(choose, continuation, &op, &len, len_ty);
            let forward = emitter.forward_loop(choose, continuation, &op, &len, len_ty);
            let src_below = emitter.icmp(
                choose,
                ICmpOp::Ult,
                Type::ptr(transfer.src_addrspace),
                transfer.src.clone(),
                transfer.dst.clone(),
            );
            emitter.branch(choose, src_below, backward, forward);
            choose
        }
        _ => emitter.forward_loop(label, continuation, &op, &len, len_ty),
    };

    emitter.branch(label, nonzero, entry, continuation);
    Ok(true)
}

fn first_intrinsic(function: &Function) -> Option<(Label, usize)> {
    function
        .instructions()
        .find(|(_, _, instr)| instr.is_mem_intrinsic())
        .map(|(label, index, _)| (label, index))
}

impl Stage for LowerMemIntrinsics {
    fn name(&self) -> &'static str {
        "lower-mem-intrinsics"
    }

    fn provides(&self) -> &'static [Milestone] {
        &[Milestone::MemIntrinsicsLowered]
    }

    fn run(&self, module: &mut Module, _ctx: &PipelineContext) -> PassResult<bool> {
        let mut changed = false;
        for function in module.functions.iter_mut() {
            let mut lowered = 0;
            while let Some((label, index)) = first_intrinsic(function) {
                if !lower_at(function, label, index)? {
                    break;
                }
                lowered += 1;
            }
            if lowered > 0 {
                debug!(
                    "Lowered {} memory intrinsics in '{}'",
                    lowered, function.name
                );
                changed = true;
            }
        }
        Ok(changed)
    }
}
