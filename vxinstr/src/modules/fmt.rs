//! Pretty-print helpers for instructions, terminators, functions, and modules.
//!
//! The textual form is stable: two structurally equal modules print identically,
//! which is what determinism checks compare.
use crate::modules::{
    BasicBlock, Function, Linkage, Module, Param,
    instructions::VxInstr,
    operand::Operand,
    terminator::Terminator,
};

impl Operand {
    /// Build a formatting helper that renders the operand using the given module for context.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        pub struct Fmt<'a> {
            operand: &'a Operand,
            module: Option<&'a Module>,
        }

        impl<'a> std::fmt::Display for Fmt<'a> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.operand {
                    Operand::Reg(name) => write!(f, "{}", name),
                    Operand::Imm(constant) => write!(f, "{}", constant),
                    Operand::Func(ptr) => match self.module.and_then(|m| m.function(*ptr)) {
                        Some(function) => write!(f, "@{}", function.name),
                        None => write!(f, "@{}", ptr.0),
                    },
                    Operand::Global(ptr) => {
                        match self
                            .module
                            .and_then(|m| m.globals.iter().find(|g| g.uuid == ptr.0))
                        {
                            Some(global) => write!(f, "@{}", global.name),
                            None => write!(f, "@{}", ptr.0),
                        }
                    }
                    Operand::Undef(ty) => write!(f, "{} undef", ty),
                }
            }
        }

        Fmt {
            operand: self,
            module,
        }
    }
}

fn fmt_align(f: &mut std::fmt::Formatter<'_>, alignment: Option<u32>) -> std::fmt::Result {
    if let Some(alignment) = alignment {
        write!(f, ", align {}", alignment)?;
    }
    Ok(())
}

impl VxInstr {
    /// Build a formatting helper that renders the instruction.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        pub struct Fmt<'a> {
            instr: &'a VxInstr,
            module: Option<&'a Module>,
        }

        impl<'a> std::fmt::Display for Fmt<'a> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let m = self.module;
                match self.instr {
                    VxInstr::IAdd(iadd) => write!(
                        f,
                        "{} = add {} {}, {}",
                        iadd.dest,
                        iadd.ty,
                        iadd.lhs.fmt(m),
                        iadd.rhs.fmt(m)
                    ),
                    VxInstr::ICmp(icmp) => write!(
                        f,
                        "{} = icmp {} {} {}, {}",
                        icmp.dest,
                        icmp.op.to_str(),
                        icmp.ty,
                        icmp.lhs.fmt(m),
                        icmp.rhs.fmt(m)
                    ),
                    VxInstr::MLoad(load) => {
                        write!(f, "{} = load ", load.dest)?;
                        if load.volatile {
                            write!(f, "volatile ")?;
                        }
                        write!(f, "{}, {}", load.ty, load.addr.fmt(m))?;
                        fmt_align(f, load.alignment)
                    }
                    VxInstr::MStore(store) => {
                        write!(f, "store ")?;
                        if store.volatile {
                            write!(f, "volatile ")?;
                        }
                        write!(
                            f,
                            "{} {}, {}",
                            store.ty,
                            store.value.fmt(m),
                            store.addr.fmt(m)
                        )?;
                        fmt_align(f, store.alignment)
                    }
                    VxInstr::MAlloca(alloca) => {
                        write!(
                            f,
                            "{} = alloca {}, {}",
                            alloca.dest,
                            alloca.ty,
                            alloca.count.fmt(m)
                        )?;
                        fmt_align(f, alloca.alignment)
                    }
                    VxInstr::MOffset(offset) => write!(
                        f,
                        "{} = offset {}, {}, {}",
                        offset.dest,
                        offset.addrspace,
                        offset.base.fmt(m),
                        offset.offset.fmt(m)
                    ),
                    VxInstr::MCast(cast) => write!(
                        f,
                        "{} = addrspacecast {} from {} to {}",
                        cast.dest,
                        cast.value.fmt(m),
                        cast.from,
                        cast.to
                    ),
                    VxInstr::MemCpy(transfer) | VxInstr::MemMove(transfer) => {
                        let op = if self.instr.is_mem_cpy() {
                            "memcpy"
                        } else {
                            "memmove"
                        };
                        write!(f, "{} ", op)?;
                        if transfer.volatile {
                            write!(f, "volatile ")?;
                        }
                        write!(
                            f,
                            "{} {}, {} {}, {} {}",
                            transfer.dst_addrspace,
                            transfer.dst.fmt(m),
                            transfer.src_addrspace,
                            transfer.src.fmt(m),
                            transfer.len_ty,
                            transfer.len.fmt(m)
                        )?;
                        fmt_align(f, transfer.alignment)
                    }
                    VxInstr::MemSet(set) => {
                        write!(f, "memset ")?;
                        if set.volatile {
                            write!(f, "volatile ")?;
                        }
                        write!(
                            f,
                            "{} {}, {}, {} {}",
                            set.dst_addrspace,
                            set.dst.fmt(m),
                            set.value.fmt(m),
                            set.len_ty,
                            set.len.fmt(m)
                        )?;
                        fmt_align(f, set.alignment)
                    }
                    VxInstr::Invoke(invoke) => {
                        if let Some(dest) = invoke.dest {
                            write!(f, "{} = ", dest)?;
                        }
                        write!(f, "call {} ", invoke.cconv)?;
                        match invoke.ty {
                            Some(ty) => write!(f, "{} ", ty)?,
                            None => write!(f, "void ")?,
                        }
                        write!(f, "{}(", Operand::Func(invoke.function).fmt(m))?;
                        for (i, arg) in invoke.args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", arg.fmt(m))?;
                        }
                        write!(f, ")")?;
                        if !invoke.attrs.is_empty() {
                            write!(f, " {}", invoke.attrs)?;
                        }
                        Ok(())
                    }
                    VxInstr::Phi(phi) => {
                        write!(f, "{} = phi {} ", phi.dest, phi.ty)?;
                        for (i, (label, value)) in phi.values.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "[{}, {}]", value.fmt(m), label)?;
                        }
                        Ok(())
                    }
                    VxInstr::Select(select) => write!(
                        f,
                        "{} = select {}, {} {}, {}",
                        select.dest,
                        select.condition.fmt(m),
                        select.ty,
                        select.true_value.fmt(m),
                        select.false_value.fmt(m)
                    ),
                }
            }
        }

        Fmt {
            instr: self,
            module,
        }
    }
}

impl Terminator {
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            terminator: &'a Terminator,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.terminator {
                    Terminator::CBranch(cbranch) => write!(
                        f,
                        "branch {}, {:#}, {:#}",
                        cbranch.cond.fmt(self.module),
                        cbranch.target_true,
                        cbranch.target_false
                    ),
                    Terminator::Jump(jump) => write!(f, "jump {:#}", jump.target),
                    Terminator::Ret(ret) => match &ret.value {
                        Some(value) => write!(f, "ret {}", value.fmt(self.module)),
                        None => write!(f, "ret void"),
                    },
                    Terminator::Trap(_) => write!(f, "trap"),
                }
            }
        }

        Fmt {
            terminator: self,
            module,
        }
    }
}

fn fmt_param(f: &mut std::fmt::Formatter<'_>, param: &Param) -> std::fmt::Result {
    write!(f, "{} {}", param.ty, param.value)?;
    if let Some(ident) = &param.ident {
        write!(f, " \"{}\"", ident)?;
    }
    if !param.attrs.is_empty() {
        write!(f, " {}", param.attrs)?;
    }
    Ok(())
}

fn fmt_block(
    f: &mut std::fmt::Formatter<'_>,
    bb: &BasicBlock,
    module: Option<&Module>,
) -> std::fmt::Result {
    writeln!(f, "block_{}:", bb.label.0)?;
    for instr in &bb.instructions {
        writeln!(f, "    {}", instr.fmt(module))?;
    }
    writeln!(f, "    {}", bb.terminator.fmt(module))
}

impl Function {
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            function: &'a Function,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let func = self.function;
                let keyword = if func.is_declaration() {
                    "declare"
                } else {
                    "define"
                };
                write!(f, "{} ", keyword)?;
                if func.linkage != Linkage::External {
                    write!(f, "{} ", func.linkage.to_str())?;
                }
                write!(f, "{} ", func.cconv)?;
                match func.return_type {
                    Some(ty) => write!(f, "{} ", ty)?,
                    None => write!(f, "void ")?,
                }
                write!(f, "@{}(", func.name)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    fmt_param(f, param)?;
                }
                write!(f, ")")?;
                if !func.attrs.is_empty() {
                    write!(f, " {}", func.attrs)?;
                }
                if let Some(comdat) = &func.comdat {
                    write!(f, " comdat(${})", comdat)?;
                }
                for (key, node) in &func.metadata {
                    write!(f, " !{} {}", key, node)?;
                }

                if func.is_declaration() {
                    return writeln!(f);
                }

                writeln!(f, " {{")?;
                for bb in func.body.values() {
                    fmt_block(f, bb, self.module)?;
                }
                writeln!(f, "}}")
            }
        }

        Fmt {
            function: self,
            module,
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "target triple = \"{}\"", self.triple)?;

        for global in &self.globals {
            write!(f, "@{} = ", global.name)?;
            if global.linkage != Linkage::External {
                write!(f, "{} ", global.linkage.to_str())?;
            }
            write!(f, "{} global {}", global.addrspace, global.ty)?;
            if let Some(init) = &global.initializer {
                write!(f, " [")?;
                for (i, value) in init.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")?;
            }
            if let Some(comdat) = &global.comdat {
                write!(f, " comdat(${})", comdat)?;
            }
            writeln!(f)?;
        }

        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function.fmt(Some(self)))?;
        }

        if !self.named_metadata.is_empty() {
            writeln!(f)?;
        }
        for md in &self.named_metadata {
            write!(f, "!{} = !{{", md.name)?;
            for (i, node) in md.operands.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", node)?;
            }
            writeln!(f, "}}")?;
        }

        Ok(())
    }
}
