//! Device IR modules
//!
//! This module groups the in-memory representation of a device program: a
//! [`Module`] owns [`Function`]s, [`GlobalVariable`]s and named metadata, each
//! function owns a control-flow graph of [`BasicBlock`]s. Submodules contain
//! families of operations:
//!
//! - `int`: integer arithmetic and comparisons
//! - `mem`: loads, stores, pointer arithmetic, address-space casts and the
//!   block memory intrinsics
//! - `misc`: calls, phi and select
//! - `operand`: shared operand and SSA name types
//!
//! You typically manipulate instructions via the `VxInstr` enum which is a
//! tagged union of all concrete instruction forms.
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    modules::{
        attributes::AttributeSet,
        instructions::VxInstr,
        metadata::{MetadataNode, NamedMetadata},
        operand::{Label, Name, Operand},
        symbol::{FunctionPointer, GlobalVariable},
        terminator::{Jump, Terminator},
    },
    types::Type,
    utils::Error,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod attributes;
pub mod builder;
pub mod fmt;
pub mod instructions;
pub mod int;
pub mod mem;
pub mod metadata;
pub mod misc;
pub mod operand;
pub mod symbol;
pub mod terminator;

/// Reserved name prefix of target-independent intrinsics.
pub const INTRINSIC_PREFIX: &str = "llvm.";

/// Common interface implemented by every instruction node.
///
/// This trait provides lightweight, zero‑allocation iteration over an
/// instruction's input operands and exposes its optional destination SSA
/// name when present.
pub trait Instruction {
    /// Iterate over all input operands for this instruction.
    fn operands(&self) -> impl Iterator<Item = &Operand>;

    /// Mutably iterate over all input operands for this instruction.
    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand>;

    /// Return the destination SSA name if the instruction produces a result.
    fn destination(&self) -> Option<Name> {
        None
    }

    /// Update the destination SSA name for this instruction. No-op if the
    /// instruction does not produce a result.
    fn set_destination(&mut self, _name: Name) {}

    /// Convenience iterator over referenced SSA names (i.e., register
    /// operands). Immediates and symbols are ignored.
    fn name_dependencies(&self) -> impl Iterator<Item = Name> {
        self.operands().filter_map(Operand::reg)
    }
}

/// All Global Variables and Functions have one of the following types of linkage:
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Global values with `Linkage::Private` linkage are only directly accessible by objects in the current module.
    ///
    /// This doesn’t show up in any symbol table in the object file.
    Private,

    /// Similar to `Linkage::Private`, but the value shows as a local symbol in the object file.
    Internal,

    /// Merged with other definitions of the same name when linking; unreferenced
    /// definitions may be discarded.
    LinkOnceOdr,

    /// Global values with `Linkage::External` linkage may be referenced by other modules,
    /// and may also be defined in other modules.
    #[default]
    External,
}

impl Linkage {
    pub fn to_str(&self) -> &'static str {
        match self {
            Linkage::Private => "private",
            Linkage::Internal => "internal",
            Linkage::LinkOnceOdr => "linkonce_odr",
            Linkage::External => "external",
        }
    }
}

/// Functions and calls carry a calling convention. The calling convention of any pair
/// of dynamic caller/callee must match, or the behavior of the program is undefined.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CallingConvention {
    /// The C calling convention
    ///
    /// The platform default. Back ends that consume an already optimized module
    /// expect every non-kernel function to use it.
    #[default]
    C,

    /// The fast calling convention
    ///
    /// Allows the target to use whatever tricks it wants to produce fast code,
    /// without having to conform to an externally specified ABI.
    FastC,

    /// The cold calling convention
    ///
    /// Optimizes the caller under the assumption that the call is rarely executed.
    ColdC,

    /// SPIR device function convention
    ///
    /// Used by every function that is callable from device code, including the
    /// builtins of the target's SPIR library.
    SpirFunc,

    /// SPIR kernel convention
    ///
    /// Marks an offload entry point. Kernels are never called from device code.
    SpirKernel,

    /// Numbered/target-specific calling convention (cc &lt;n&gt;)
    Numbered(u32),
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConvention::C => write!(f, "ccc"),
            CallingConvention::FastC => write!(f, "fastcc"),
            CallingConvention::ColdC => write!(f, "coldcc"),
            CallingConvention::SpirFunc => write!(f, "spir_func"),
            CallingConvention::SpirKernel => write!(f, "spir_kernel"),
            CallingConvention::Numbered(n) => write!(f, "cc {}", n),
        }
    }
}

/// A basic block within a function, containing a sequence of instructions
/// and ending with a control flow terminator.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasicBlock {
    pub label: Label,
    pub instructions: Vec<VxInstr>,
    pub terminator: Terminator,
}

/// A formal parameter of a function.
///
/// `ident` is the source-level identifier of the parameter; `None` means the
/// parameter is unnamed and only addressable through its SSA `value`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Param {
    pub value: Name,
    pub ty: Type,
    pub ident: Option<String>,
    pub attrs: AttributeSet,
}

/// Position of a call instruction inside a module.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallSiteRef {
    pub caller: FunctionPointer,
    pub block: Label,
    pub index: usize,
}

/// A function (procedure) made of basic blocks and parameter metadata.
///
/// A function without basic blocks is a declaration: its body is provided by
/// another module or by the target's builtin library.
///
/// By convention the entrypoint is the basic block with the [`Label::NIL`] label.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    pub uuid: Uuid,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    pub body: BTreeMap<Label, BasicBlock>,
    pub attrs: AttributeSet,
    pub cconv: CallingConvention,
    pub linkage: Linkage,
    pub comdat: Option<String>,
    pub metadata: BTreeMap<String, MetadataNode>,
}

impl Function {
    /// Create a new declaration with a fresh UUID. Parameters are numbered from `%0`.
    pub fn new(
        name: impl Into<String>,
        param_types: impl IntoIterator<Item = Type>,
        return_type: Option<Type>,
        cconv: CallingConvention,
    ) -> Self {
        let params = param_types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Param {
                value: Name(i as u32),
                ty,
                ident: None,
                attrs: AttributeSet::new(),
            })
            .collect();

        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            params,
            return_type,
            body: BTreeMap::new(),
            attrs: AttributeSet::new(),
            cconv,
            linkage: Linkage::External,
            comdat: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn pointer(&self) -> FunctionPointer {
        FunctionPointer(self.uuid)
    }

    /// A function without body is a declaration.
    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }

    /// Returns `true` for target-independent intrinsics (`llvm.*`).
    pub fn is_intrinsic(&self) -> bool {
        self.name.starts_with(INTRINSIC_PREFIX)
    }

    /// Iterate over every instruction with its position.
    pub fn instructions(&self) -> impl Iterator<Item = (Label, usize, &VxInstr)> {
        self.body.values().flat_map(|bb| {
            bb.instructions
                .iter()
                .enumerate()
                .map(move |(i, instr)| (bb.label, i, instr))
        })
    }

    /// Find next available [`Name`] for a new SSA value.
    pub fn next_available_name(&self) -> Name {
        let mut max_index = None;
        let mut bump = |name: Name| {
            max_index = Some(max_index.map_or(name.0, |m: u32| m.max(name.0)));
        };

        for param in &self.params {
            bump(param.value);
        }

        for bb in self.body.values() {
            for instr in &bb.instructions {
                if let Some(dest) = instr.destination() {
                    bump(dest);
                }
                for name in instr.name_dependencies() {
                    bump(name);
                }
            }
            for name in bb.terminator.dependencies() {
                bump(name);
            }
        }

        Name(max_index.map_or(0, |m| m + 1))
    }

    /// Find next available [`Label`] for a new basic block.
    pub fn next_available_label(&self) -> Label {
        self.body
            .keys()
            .next_back()
            .map_or(Label::NIL, |label| Label(label.0 + 1))
    }

    /// Positions of every call to `callee` within this function.
    pub fn call_sites(&self, callee: FunctionPointer) -> Vec<(Label, usize)> {
        self.instructions()
            .filter_map(|(label, index, instr)| match instr {
                VxInstr::Invoke(invoke) if invoke.function == callee => Some((label, index)),
                _ => None,
            })
            .collect()
    }

    /// Find the instruction defining `name`, if any.
    pub fn definition(&self, name: Name) -> Option<(Label, usize, &VxInstr)> {
        self.instructions()
            .find(|(_, _, instr)| instr.destination() == Some(name))
    }

    /// Replace every use of `name` by `replacement` in instructions and terminators.
    ///
    /// Returns the number of rewritten operands.
    pub fn replace_all_uses(&mut self, name: Name, replacement: &Operand) -> usize {
        let mut count = 0;
        for bb in self.body.values_mut() {
            let operands = bb
                .instructions
                .iter_mut()
                .flat_map(|instr| instr.operands_mut())
                .chain(bb.terminator.operands_mut());
            for op in operands {
                if *op == Operand::Reg(name) {
                    *op = replacement.clone();
                    count += 1;
                }
            }
        }
        count
    }

    /// Returns `true` if any instruction or terminator reads `name`.
    pub fn has_uses(&self, name: Name) -> bool {
        self.body.values().any(|bb| {
            bb.instructions
                .iter()
                .any(|instr| instr.name_dependencies().any(|n| n == name))
                || bb.terminator.dependencies().any(|n| n == name)
        })
    }

    /// Remove and return the instruction at `index` of block `label`.
    pub fn remove_instruction(&mut self, label: Label, index: usize) -> Option<VxInstr> {
        let bb = self.body.get_mut(&label)?;
        if index < bb.instructions.len() {
            Some(bb.instructions.remove(index))
        } else {
            None
        }
    }

    /// Split block `label` before instruction `at`.
    ///
    /// Instructions from `at` onwards and the terminator move to a new block whose
    /// label is returned. The original block falls through to the new block with an
    /// unconditional jump. Phi nodes in successors are updated to name the new block
    /// as their predecessor.
    pub fn split_block(&mut self, label: Label, at: usize) -> Result<Label, Error> {
        let new_label = self.next_available_label();
        let bb = self.body.get_mut(&label).ok_or(Error::UndefinedBasicBlock {
            function: self.name.clone(),
            label,
        })?;

        let tail = bb.instructions.split_off(at.min(bb.instructions.len()));
        let terminator = std::mem::replace(
            &mut bb.terminator,
            Terminator::Jump(Jump { target: new_label }),
        );

        let successors: BTreeSet<Label> = terminator.targets().collect();
        self.body.insert(
            new_label,
            BasicBlock {
                label: new_label,
                instructions: tail,
                terminator,
            },
        );

        for succ in successors {
            if let Some(succ_bb) = self.body.get_mut(&succ) {
                succ_bb.rename_predecessor(label, new_label);
            }
        }

        Ok(new_label)
    }

    /// Verify SSA form:
    /// 1) Each operand refers to a defined name.
    /// 2) Each name is defined exactly once.
    /// 3) Branch targets and phi predecessors exist, phis lead their block.
    pub fn check_ssa(&self) -> Result<(), Error> {
        if self.is_declaration() {
            return Ok(());
        }

        let mut defined_names = BTreeSet::new();

        // Ensure existence of entry block
        if !self.body.contains_key(&Label::NIL) {
            return Err(Error::MissingEntryBlock {
                function: self.name.clone(),
            });
        }

        // Construct a set of defined names from parameters
        for param in self.params.iter() {
            if !defined_names.insert(param.value) {
                return Err(Error::DuplicateSSAName {
                    function: self.name.clone(),
                    duplicate: param.value,
                });
            }
        }

        // Same for each instruction destination of each basic block
        for bb in self.body.values() {
            let mut phi_prefix = true;
            for instr in &bb.instructions {
                if instr.is_phi() {
                    if !phi_prefix {
                        return Err(Error::PhiNotFirstInstruction {
                            function: self.name.clone(),
                            block: bb.label,
                        });
                    }
                } else {
                    phi_prefix = false;
                }

                if let Some(dest) = instr.destination() {
                    if !defined_names.insert(dest) {
                        return Err(Error::DuplicateSSAName {
                            function: self.name.clone(),
                            duplicate: dest,
                        });
                    }
                }
            }
        }

        // Now ensure all operands refer to defined names and labels exist
        for bb in self.body.values() {
            for instr in &bb.instructions {
                for name in instr.name_dependencies() {
                    if !defined_names.contains(&name) {
                        return Err(Error::UndefinedSSAName {
                            function: self.name.clone(),
                            undefined: name,
                        });
                    }
                }

                if let VxInstr::Phi(phi) = instr {
                    for (pred, _) in &phi.values {
                        if !self.body.contains_key(pred) {
                            return Err(Error::UndefinedBasicBlock {
                                function: self.name.clone(),
                                label: *pred,
                            });
                        }
                    }
                }
            }

            for name in bb.terminator.dependencies() {
                if !defined_names.contains(&name) {
                    return Err(Error::UndefinedSSAName {
                        function: self.name.clone(),
                        undefined: name,
                    });
                }
            }

            for target in bb.terminator.targets() {
                if !self.body.contains_key(&target) {
                    return Err(Error::UndefinedBasicBlock {
                        function: self.name.clone(),
                        label: target,
                    });
                }
            }
        }

        Ok(())
    }
}

impl BasicBlock {
    /// Rewrite every phi incoming edge from `old` to come from `new`.
    pub fn rename_predecessor(&mut self, old: Label, new: Label) {
        for instr in &mut self.instructions {
            if let VxInstr::Phi(phi) = instr {
                for (pred, _) in phi.values.iter_mut() {
                    if *pred == old {
                        *pred = new;
                    }
                }
            }
        }
    }
}

/// A device module: the unit every pass transforms.
///
/// Function and global order is the order in which the frontend emitted them and
/// is preserved by every pass, so printing a module is deterministic.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    pub triple: String,
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
    pub named_metadata: Vec<NamedMetadata>,
}

impl Module {
    pub fn new(triple: impl Into<String>) -> Self {
        Self {
            triple: triple.into(),
            ..Default::default()
        }
    }

    /// Append a function and return a pointer to it.
    pub fn add_function(&mut self, function: Function) -> FunctionPointer {
        let ptr = function.pointer();
        self.functions.push(function);
        ptr
    }

    pub fn add_global(&mut self, global: GlobalVariable) -> symbol::GlobalPointer {
        let ptr = global.pointer();
        self.globals.push(global);
        ptr
    }

    pub fn position(&self, ptr: FunctionPointer) -> Option<usize> {
        self.functions.iter().position(|f| f.uuid == ptr.0)
    }

    pub fn function(&self, ptr: FunctionPointer) -> Option<&Function> {
        self.functions.iter().find(|f| f.uuid == ptr.0)
    }

    pub fn function_mut(&mut self, ptr: FunctionPointer) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.uuid == ptr.0)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Remove a function from the module. Callers are not updated.
    pub fn remove_function(&mut self, ptr: FunctionPointer) -> Option<Function> {
        let index = self.position(ptr)?;
        Some(self.functions.remove(index))
    }

    /// Every call site that targets `callee`, in module order.
    pub fn users_of(&self, callee: FunctionPointer) -> Vec<CallSiteRef> {
        self.functions
            .iter()
            .flat_map(|f| {
                f.call_sites(callee)
                    .into_iter()
                    .map(move |(block, index)| CallSiteRef {
                        caller: f.pointer(),
                        block,
                        index,
                    })
            })
            .collect()
    }

    /// Set the calling convention of `callee` and of every call site targeting it.
    ///
    /// Returns `true` if anything changed.
    pub fn set_calling_convention(
        &mut self,
        callee: FunctionPointer,
        cconv: CallingConvention,
    ) -> bool {
        let mut changed = false;
        if let Some(function) = self.function_mut(callee) {
            changed |= function.cconv != cconv;
            function.cconv = cconv;
        }

        for function in self.functions.iter_mut() {
            for bb in function.body.values_mut() {
                for instr in bb.instructions.iter_mut() {
                    if let VxInstr::Invoke(invoke) = instr {
                        if invoke.function == callee && invoke.cconv != cconv {
                            invoke.cconv = cconv;
                            changed = true;
                        }
                    }
                }
            }
        }

        changed
    }

    pub fn named_metadata(&self, name: &str) -> Option<&NamedMetadata> {
        self.named_metadata.iter().find(|md| md.name == name)
    }

    /// Return the named metadata `name`, creating an empty record if needed.
    pub fn get_or_insert_named_metadata(&mut self, name: &str) -> &mut NamedMetadata {
        let index = match self.named_metadata.iter().position(|md| md.name == name) {
            Some(index) => index,
            None => {
                self.named_metadata.push(NamedMetadata {
                    name: name.to_string(),
                    operands: Vec::new(),
                });
                self.named_metadata.len() - 1
            }
        };
        &mut self.named_metadata[index]
    }

    /// Erase the named metadata `name`. Returns `false` if it was absent.
    pub fn erase_named_metadata(&mut self, name: &str) -> bool {
        let before = self.named_metadata.len();
        self.named_metadata.retain(|md| md.name != name);
        before != self.named_metadata.len()
    }

    /// Every call site whose convention differs from its callee's.
    pub fn check_calling_conventions(&self) -> Result<(), Error> {
        for function in &self.functions {
            for (label, index, instr) in function.instructions() {
                let VxInstr::Invoke(invoke) = instr else {
                    continue;
                };
                let callee = self.function(invoke.function).ok_or_else(|| {
                    Error::UndefinedFunction {
                        function: function.name.clone(),
                        undefined: invoke.function.0,
                    }
                })?;
                if callee.cconv != invoke.cconv {
                    return Err(Error::CallingConventionMismatch {
                        caller: function.name.clone(),
                        callee: callee.name.clone(),
                        block: label,
                        index,
                        site: invoke.cconv,
                        expected: callee.cconv,
                    });
                }
            }
        }
        Ok(())
    }

    /// Structural verification: unique symbol names, SSA form of every body and
    /// resolvable callees.
    pub fn verify(&self) -> Result<(), Error> {
        let mut names = BTreeSet::new();
        for function in &self.functions {
            if !names.insert(function.name.as_str()) {
                return Err(Error::DuplicateSymbol(function.name.clone()));
            }
        }
        for global in &self.globals {
            if !names.insert(global.name.as_str()) {
                return Err(Error::DuplicateSymbol(global.name.clone()));
            }
        }

        for function in &self.functions {
            function.check_ssa()?;
            for (_, _, instr) in function.instructions() {
                if let VxInstr::Invoke(invoke) = instr {
                    if self.function(invoke.function).is_none() {
                        return Err(Error::UndefinedFunction {
                            function: function.name.clone(),
                            undefined: invoke.function.0,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
