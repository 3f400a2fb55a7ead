//! Incremental construction of function bodies.
//!
//! [`FunctionBuilder`] keeps an insertion point and hands out fresh SSA names so
//! frontends, passes and tests can assemble well-formed bodies without tracking
//! numbering by hand.
use crate::{
    modules::{
        BasicBlock, CallingConvention, Function, Linkage,
        attributes::AttributeSet,
        instructions::VxInstr,
        int::{IAdd, ICmp, ICmpOp},
        mem::{MCast, MLoad, MOffset, MStore},
        misc::{Invoke, Phi},
        operand::{Label, Name, Operand},
        symbol::FunctionPointer,
        terminator::{CBranch, Jump, Ret, Terminator, Trap},
    },
    types::{AddressSpace, IType, Type},
};

pub struct FunctionBuilder {
    function: Function,
    next_name: u32,
    current: Label,
}

impl FunctionBuilder {
    /// Start a definition. The entry block is created and selected.
    pub fn new(
        name: impl Into<String>,
        param_types: impl IntoIterator<Item = Type>,
        return_type: Option<Type>,
        cconv: CallingConvention,
    ) -> Self {
        let mut function = Function::new(name, param_types, return_type, cconv);
        function.body.insert(
            Label::NIL,
            BasicBlock {
                label: Label::NIL,
                instructions: Vec::new(),
                terminator: Terminator::Trap(Trap),
            },
        );
        let next_name = function.params.len() as u32;

        Self {
            function,
            next_name,
            current: Label::NIL,
        }
    }

    pub fn pointer(&self) -> FunctionPointer {
        self.function.pointer()
    }

    /// Operand referring to parameter `index`.
    pub fn param(&self, index: usize) -> Operand {
        Operand::Reg(self.function.params[index].value)
    }

    /// Give parameter `index` a source identifier.
    pub fn with_param_ident(mut self, index: usize, ident: impl Into<String>) -> Self {
        self.function.params[index].ident = Some(ident.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.function.attrs.insert(key, value);
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.function.linkage = linkage;
        self
    }

    pub fn with_comdat(mut self, comdat: impl Into<String>) -> Self {
        self.function.comdat = Some(comdat.into());
        self
    }

    pub fn fresh(&mut self) -> Name {
        let name = Name(self.next_name);
        self.next_name += 1;
        name
    }

    /// Create a new empty block ending in `trap`. The insertion point is unchanged.
    pub fn block(&mut self) -> Label {
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

    pub fn switch_to(&mut self, label: Label) {
        debug_assert!(self.function.body.contains_key(&label));
        self.current = label;
    }

    pub fn current(&self) -> Label {
        self.current
    }

    pub fn push(&mut self, instr: impl Into<VxInstr>) {
        if let Some(bb) = self.function.body.get_mut(&self.current) {
            bb.instructions.push(instr.into());
        }
    }

    pub fn terminate(&mut self, terminator: impl Into<Terminator>) {
        if let Some(bb) = self.function.body.get_mut(&self.current) {
            bb.terminator = terminator.into();
        }
    }

    pub fn ret(&mut self, value: Option<Operand>) {
        self.terminate(Ret { value });
    }

    pub fn jump(&mut self, target: Label) {
        self.terminate(Jump { target });
    }

    pub fn branch(&mut self, cond: Operand, target_true: Label, target_false: Label) {
        self.terminate(CBranch {
            cond,
            target_true,
            target_false,
        });
    }

    /// Call `callee` using its current calling convention and return type.
    pub fn call(&mut self, callee: &Function, args: Vec<Operand>) -> Option<Name> {
        self.call_with(callee.pointer(), callee.return_type, callee.cconv, args)
    }

    pub fn call_with(
        &mut self,
        callee: FunctionPointer,
        ty: Option<Type>,
        cconv: CallingConvention,
        args: Vec<Operand>,
    ) -> Option<Name> {
        let dest = ty.map(|_| self.fresh());
        self.push(Invoke {
            function: callee,
            args,
            dest,
            ty,
            cconv,
            attrs: AttributeSet::new(),
        });
        dest
    }

    pub fn add(&mut self, ty: IType, lhs: Operand, rhs: Operand) -> Name {
        let dest = self.fresh();
        self.push(IAdd { dest, ty, lhs, rhs });
        dest
    }

    pub fn icmp(&mut self, op: ICmpOp, ty: impl Into<Type>, lhs: Operand, rhs: Operand) -> Name {
        let dest = self.fresh();
        self.push(ICmp {
            dest,
            ty: ty.into(),
            op,
            lhs,
            rhs,
        });
        dest
    }

    pub fn phi(&mut self, ty: Type, values: Vec<(Label, Operand)>) -> Name {
        let dest = self.fresh();
        self.push(Phi { dest, ty, values });
        dest
    }

    pub fn load(&mut self, ty: Type, addr: Operand) -> Name {
        let dest = self.fresh();
        self.push(MLoad {
            dest,
            ty,
            addr,
            alignment: None,
            volatile: false,
        });
        dest
    }

    pub fn store(&mut self, ty: Type, addr: Operand, value: Operand) {
        self.push(MStore {
            addr,
            value,
            ty,
            alignment: None,
            volatile: false,
        });
    }

    pub fn offset(&mut self, addrspace: AddressSpace, base: Operand, offset: Operand) -> Name {
        let dest = self.fresh();
        self.push(MOffset {
            dest,
            addrspace,
            base,
            offset,
        });
        dest
    }

    pub fn cast(&mut self, value: Operand, from: AddressSpace, to: AddressSpace) -> Name {
        let dest = self.fresh();
        self.push(MCast {
            dest,
            value,
            from,
            to,
        });
        dest
    }

    pub fn build(self) -> Function {
        self.function
    }
}
