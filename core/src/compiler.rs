/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * Lowering engine and compilation driver.
 *
 * Methods are pulled from a queue strictly sequentially. For each method a
 * single forward prepass registers a label per distinct branch-target
 * offset, then the lowering pass walks the instruction stream once,
 * maintaining an operand stack of typed value references and the
 * parameter/local slot arrays, and appends SPIR-V instructions to the
 * function record. Translation either completes a method or fails the
 * whole run; there is no partial output.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::bytecode::{Inst, KernelMethod, Op};
use crate::emit;
use crate::ids::{IdAllocator, ResultId};
use crate::intrinsics;
use crate::ir::{
    BinaryOp, CompareOp, ConvertOp, EntryPoint, FunctionRecord, Instruction, Module, ValueRef,
};
use crate::types::{ScalarDesc, StorageClass, TypeNode, TypeToken};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Any failure aborts the compilation run; there is no recovery tier and no
/// partial module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unsupported type '{0}'")]
    UnsupportedType(String),
    #[error("unsupported opcode '{0}'")]
    UnsupportedOpcode(String),
    #[error("unsupported call to '{0}'")]
    UnsupportedCall(String),
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
    #[error("incompatible operand types for '{op}': {lhs} and {rhs}")]
    IncompatibleOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
    },
    #[error("operand stack underflow at '{0}'")]
    StackUnderflow(String),
    #[error("result id bound mismatch: header has {written}, allocator reports {derived}")]
    BoundMismatch { written: u32, derived: u32 },
}

/// Compilation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Generator magic word written into the module header.
    #[serde(default)]
    pub generator_id: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions { generator_id: 0 }
    }
}

/// Compiles a queue of kernel methods into one SPIR-V module.
pub struct KernelCompiler {
    queue: VecDeque<KernelMethod>,
    ids: IdAllocator,
    module: Module,
    options: CompilerOptions,
}

impl KernelCompiler {
    pub fn new(methods: impl IntoIterator<Item = KernelMethod>) -> Self {
        Self::with_options(methods, CompilerOptions::default())
    }

    pub fn with_options(
        methods: impl IntoIterator<Item = KernelMethod>,
        options: CompilerOptions,
    ) -> Self {
        KernelCompiler {
            queue: methods.into_iter().collect(),
            ids: IdAllocator::new(),
            module: Module::new(),
            options,
        }
    }

    /// Compile a single method into a binary module. This is the public
    /// entry point; one root method per invocation.
    pub fn compile_kernel(method: KernelMethod) -> Result<Vec<u8>, CompileError> {
        Self::new([method]).run()
    }

    /// Drain the queue and emit the combined binary module.
    pub fn run(mut self) -> Result<Vec<u8>, CompileError> {
        self.lower_all()?;
        emit::emit_module(&self.module, &mut self.ids, &self.options)
    }

    /// Lower every queued method, leaving the structured module
    /// inspectable. `run` is this followed by binary emission.
    pub fn lower_all(&mut self) -> Result<(), CompileError> {
        while let Some(method) = self.queue.pop_front() {
            let record = self.lower_method(&method)?;
            self.module.functions.push(record);
        }
        Ok(())
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    fn lower_method(&mut self, method: &KernelMethod) -> Result<FunctionRecord, CompileError> {
        let labels = collect_labels(&method.code, &mut self.ids);
        let mut lowering = MethodLowering::new(&mut self.module, &mut self.ids, method, labels);
        lowering.prologue()?;
        lowering.lower_body()?;
        Ok(FunctionRecord { body: lowering.finish() })
    }
}

/// Control-flow prepass: one forward scan registering a label per distinct
/// branch-target offset, so forward branches can reference labels that do
/// not yet exist in the output stream.
fn collect_labels(code: &[Inst], ids: &mut IdAllocator) -> HashMap<u32, ResultId> {
    let mut labels = HashMap::new();
    for inst in code {
        if let Some(target) = inst.op.branch_target() {
            labels.entry(target).or_insert_with(|| ids.next());
        }
    }
    labels
}

/// Numeric kind of an operand, for promotion and op selection.
enum NumKind {
    Int(u32),
    Float(u32),
    Other,
}

fn num_kind(node: &TypeNode) -> NumKind {
    match node {
        TypeNode::Int { width, .. } => NumKind::Int(*width),
        TypeNode::Float { width } => NumKind::Float(*width),
        _ => NumKind::Other,
    }
}

/// Comparison category shared by the value-producing and branching forms.
#[derive(Clone, Copy)]
enum CmpKind {
    Eq,
    Ne,
    LtS,
    LtU,
    LeS,
    LeU,
    GtS,
    GtU,
    GeS,
    GeU,
}

/// Select the comparison op for operand kind. No width promotion is applied
/// to comparisons; equality on floats is the ordered op, everything else
/// the unordered one.
fn compare_op(kind: CmpKind, float: bool) -> CompareOp {
    if float {
        match kind {
            CmpKind::Eq => CompareOp::FOrdEqual,
            CmpKind::Ne => CompareOp::FUnordNotEqual,
            CmpKind::LtS | CmpKind::LtU => CompareOp::FUnordLessThan,
            CmpKind::LeS | CmpKind::LeU => CompareOp::FUnordLessThanEqual,
            CmpKind::GtS | CmpKind::GtU => CompareOp::FUnordGreaterThan,
            CmpKind::GeS | CmpKind::GeU => CompareOp::FUnordGreaterThanEqual,
        }
    } else {
        match kind {
            CmpKind::Eq => CompareOp::IEqual,
            CmpKind::Ne => CompareOp::INotEqual,
            CmpKind::LtS => CompareOp::SLessThan,
            CmpKind::LtU => CompareOp::ULessThan,
            CmpKind::LeS => CompareOp::SLessThanEqual,
            CmpKind::LeU => CompareOp::ULessThanEqual,
            CmpKind::GtS => CompareOp::SGreaterThan,
            CmpKind::GtU => CompareOp::UGreaterThan,
            CmpKind::GeS => CompareOp::SGreaterThanEqual,
            CmpKind::GeU => CompareOp::UGreaterThanEqual,
        }
    }
}

/// Per-method lowering state.
pub(crate) struct MethodLowering<'a> {
    pub(crate) module: &'a mut Module,
    pub(crate) ids: &'a mut IdAllocator,
    method: &'a KernelMethod,
    labels: HashMap<u32, ResultId>,
    pub(crate) stack: Vec<ValueRef>,
    params: Vec<ValueRef>,
    locals: Vec<Option<ValueRef>>,
    local_tys: Vec<TypeToken>,
    ret_void: bool,
    body: Vec<Instruction>,
}

impl<'a> MethodLowering<'a> {
    fn new(
        module: &'a mut Module,
        ids: &'a mut IdAllocator,
        method: &'a KernelMethod,
        labels: HashMap<u32, ResultId>,
    ) -> Self {
        MethodLowering {
            module,
            ids,
            method,
            labels,
            stack: Vec::new(),
            params: Vec::new(),
            locals: Vec::new(),
            local_tys: Vec::new(),
            ret_void: false,
            body: Vec::new(),
        }
    }

    /// Emit the function-begin marker and parameter declarations, register
    /// the entry point, and size the slot arrays.
    fn prologue(&mut self) -> Result<(), CompileError> {
        let method = self.method;
        let ret = self
            .module
            .types
            .resolve(&method.sig.ret, StorageClass::Function, self.ids)?;
        self.ret_void = matches!(self.module.types.node(ret), TypeNode::Void);

        let mut param_tys = Vec::with_capacity(method.sig.params.len());
        for param in &method.sig.params {
            let ty = self
                .module
                .types
                .resolve(&param.ty, param.space.storage_class(), self.ids)?;
            param_tys.push(ty);
        }
        let fn_ty = self.module.types.function(ret, param_tys.clone(), self.ids);

        let fn_id = self.ids.next();
        self.body.push(Instruction::Function {
            result_type: self.module.types.id(ret),
            result: fn_id,
            function_type: self.module.types.id(fn_ty),
        });
        if method.kernel {
            self.module.entry_points.push(EntryPoint {
                function: fn_id,
                name: method.export_label().to_string(),
            });
        }

        for &ty in &param_tys {
            let id = self.ids.next();
            self.body.push(Instruction::FunctionParameter {
                result_type: self.module.types.id(ty),
                result: id,
            });
            self.params.push(ValueRef { id, ty });
        }

        for local in &method.locals {
            let ty = self
                .module
                .types
                .resolve(local, StorageClass::Function, self.ids)?;
            self.local_tys.push(ty);
        }
        self.locals = vec![None; method.locals.len()];
        Ok(())
    }

    /// Lower the instruction stream, then append the function-end marker.
    fn lower_body(&mut self) -> Result<(), CompileError> {
        let method = self.method;
        for inst in &method.code {
            // basic-block boundary
            if let Some(&label) = self.labels.get(&inst.offset) {
                self.body.push(Instruction::Label { result: label });
            }
            self.lower_inst(inst)?;
        }
        self.body.push(Instruction::FunctionEnd);
        Ok(())
    }

    fn finish(self) -> Vec<Instruction> {
        self.body
    }

    fn lower_inst(&mut self, inst: &Inst) -> Result<(), CompileError> {
        match &inst.op {
            Op::Nop => self.emit(Instruction::Nop),
            Op::Dup => {
                let top = *self
                    .stack
                    .last()
                    .ok_or_else(|| CompileError::StackUnderflow("dup".to_string()))?;
                self.stack.push(top);
            }

            Op::ConstI32(v) => self.push_const(ScalarDesc::I32, *v as u32 as u64),
            Op::ConstI64(v) => self.push_const(ScalarDesc::I64, *v as u64),
            Op::ConstF32(v) => self.push_const(ScalarDesc::F32, v.to_bits() as u64),
            Op::ConstF64(v) => self.push_const(ScalarDesc::F64, v.to_bits()),

            Op::LoadParam(i) => {
                let param = self.params[*i as usize];
                self.stack.push(param);
            }
            Op::LoadLocal(i) => {
                let local = self.locals[*i as usize].expect("local loaded before first store");
                self.stack.push(local);
            }
            Op::StoreLocal(i) => {
                let value = self.pop("store.local")?;
                self.locals[*i as usize] = Some(value);
            }
            Op::LoadParamAddr(i) => {
                let param = self.params[*i as usize];
                self.capture_address(param.ty, param.id);
            }
            Op::LoadLocalAddr(i) => {
                let value = self.locals[*i as usize].expect("local loaded before first store");
                let declared = self.local_tys[*i as usize];
                self.capture_address(declared, value.id);
            }

            Op::LoadElem => {
                let index = self.pop("load.elem")?;
                let base = self.pop("load.elem")?;
                let (addr, pointee) = self.elem_addr(base, index, "load.elem")?;
                let id = self.ids.next();
                self.emit(Instruction::Load {
                    result_type: self.module.types.id(pointee),
                    result: id,
                    pointer: addr,
                });
                self.stack.push(ValueRef { id, ty: pointee });
            }
            Op::LoadElemAddr => {
                let index = self.pop("load.elem.addr")?;
                let base = self.pop("load.elem.addr")?;
                let (addr, _) = self.elem_addr(base, index, "load.elem.addr")?;
                self.stack.push(ValueRef { id: addr, ty: base.ty });
            }
            Op::StoreElem => {
                let value = self.pop("store.elem")?;
                let index = self.pop("store.elem")?;
                let base = self.pop("store.elem")?;
                let (addr, _) = self.elem_addr(base, index, "store.elem")?;
                self.emit(Instruction::Store { pointer: addr, value: value.id });
            }
            Op::LoadIndirect => {
                let pointer = self.pop("load.ind")?;
                let pointee = self.pointee_of(pointer, "load.ind")?;
                let id = self.ids.next();
                self.emit(Instruction::Load {
                    result_type: self.module.types.id(pointee),
                    result: id,
                    pointer: pointer.id,
                });
                self.stack.push(ValueRef { id, ty: pointee });
            }
            Op::StoreIndirect => {
                let value = self.pop("store.ind")?;
                let pointer = self.pop("store.ind")?;
                self.pointee_of(pointer, "store.ind")?;
                self.emit(Instruction::Store { pointer: pointer.id, value: value.id });
            }

            Op::Convert(dst) => {
                let value = self.pop("conv")?;
                let (op, ty) = self.conversion(value, *dst)?;
                let id = self.ids.next();
                self.emit(Instruction::Convert {
                    op,
                    result_type: self.module.types.id(ty),
                    result: id,
                    value: value.id,
                });
                self.stack.push(ValueRef { id, ty });
            }

            Op::Add => self.binary("add", BinaryOp::IAdd, Some(BinaryOp::FAdd), ConvertOp::SConvert)?,
            Op::Sub => self.binary("sub", BinaryOp::ISub, Some(BinaryOp::FSub), ConvertOp::SConvert)?,
            Op::Mul => self.binary("mul", BinaryOp::IMul, Some(BinaryOp::FMul), ConvertOp::SConvert)?,
            Op::DivS => self.binary("div", BinaryOp::SDiv, Some(BinaryOp::FDiv), ConvertOp::SConvert)?,
            Op::DivU => self.binary("div.un", BinaryOp::UDiv, None, ConvertOp::UConvert)?,
            Op::And => self.binary("and", BinaryOp::BitwiseAnd, None, ConvertOp::SConvert)?,
            Op::Or => self.binary("or", BinaryOp::BitwiseOr, None, ConvertOp::SConvert)?,
            Op::Xor => self.binary("xor", BinaryOp::BitwiseXor, None, ConvertOp::SConvert)?,
            Op::Shl => self.binary("shl", BinaryOp::ShiftLeftLogical, None, ConvertOp::SConvert)?,
            Op::ShrS => self.binary("shr", BinaryOp::ShiftRightArithmetic, None, ConvertOp::SConvert)?,
            Op::ShrU => self.binary("shr.un", BinaryOp::ShiftRightLogical, None, ConvertOp::UConvert)?,

            Op::CmpEq => self.compare_push(CmpKind::Eq, "ceq")?,
            Op::CmpNe => self.compare_push(CmpKind::Ne, "cne")?,
            Op::CmpLtS => self.compare_push(CmpKind::LtS, "clt")?,
            Op::CmpLtU => self.compare_push(CmpKind::LtU, "clt.un")?,
            Op::CmpLeS => self.compare_push(CmpKind::LeS, "cle")?,
            Op::CmpLeU => self.compare_push(CmpKind::LeU, "cle.un")?,
            Op::CmpGtS => self.compare_push(CmpKind::GtS, "cgt")?,
            Op::CmpGtU => self.compare_push(CmpKind::GtU, "cgt.un")?,
            Op::CmpGeS => self.compare_push(CmpKind::GeS, "cge")?,
            Op::CmpGeU => self.compare_push(CmpKind::GeU, "cge.un")?,

            Op::Branch(target) => {
                let label = self.label(*target);
                self.emit(Instruction::Branch { target: label });
            }
            Op::BranchIf(target) => self.zero_branch(*target, true, "br.true")?,
            Op::BranchIfNot(target) => self.zero_branch(*target, false, "br.false")?,
            Op::BranchEq(t) => self.compare_branch(CmpKind::Eq, *t, "br.eq")?,
            Op::BranchNe(t) => self.compare_branch(CmpKind::Ne, *t, "br.ne")?,
            Op::BranchLtS(t) => self.compare_branch(CmpKind::LtS, *t, "br.lt")?,
            Op::BranchLtU(t) => self.compare_branch(CmpKind::LtU, *t, "br.lt.un")?,
            Op::BranchLeS(t) => self.compare_branch(CmpKind::LeS, *t, "br.le")?,
            Op::BranchLeU(t) => self.compare_branch(CmpKind::LeU, *t, "br.le.un")?,
            Op::BranchGtS(t) => self.compare_branch(CmpKind::GtS, *t, "br.gt")?,
            Op::BranchGtU(t) => self.compare_branch(CmpKind::GtU, *t, "br.gt.un")?,
            Op::BranchGeS(t) => self.compare_branch(CmpKind::GeS, *t, "br.ge")?,
            Op::BranchGeU(t) => self.compare_branch(CmpKind::GeU, *t, "br.ge.un")?,

            Op::Return => {
                if self.ret_void {
                    self.emit(Instruction::Return);
                } else {
                    let value = self.pop("ret")?;
                    self.emit(Instruction::ReturnValue { value: value.id });
                }
            }

            Op::Call { name, .. } => intrinsics::lower_call(self, name)?,

            Op::Unsupported(name) => {
                return Err(CompileError::UnsupportedOpcode(name.clone()));
            }
        }
        Ok(())
    }

    // -- helpers ----------------------------------------------------------

    pub(crate) fn emit(&mut self, inst: Instruction) {
        self.body.push(inst);
    }

    pub(crate) fn pop(&mut self, op: &str) -> Result<ValueRef, CompileError> {
        self.stack
            .pop()
            .ok_or_else(|| CompileError::StackUnderflow(op.to_string()))
    }

    fn push_const(&mut self, scalar: ScalarDesc, bits: u64) {
        let ty = self.module.types.scalar(scalar, self.ids);
        let id = self.module.constants.intern(ty, bits, self.ids);
        self.stack.push(ValueRef { id, ty });
    }

    fn label(&self, target: u32) -> ResultId {
        // registered by the prepass for every branch operand
        self.labels[&target]
    }

    fn incompatible(&self, op: &'static str, lhs: TypeToken, rhs: TypeToken) -> CompileError {
        CompileError::IncompatibleOperands {
            op,
            lhs: self.module.types.describe(lhs),
            rhs: self.module.types.describe(rhs),
        }
    }

    /// Capture a plain value as an addressable location: a fresh
    /// function-local pointer variable holding the value.
    fn capture_address(&mut self, value_ty: TypeToken, value: ResultId) {
        let ptr_ty = self
            .module
            .types
            .pointer(StorageClass::Function, value_ty, self.ids);
        let var = self.ids.next();
        self.emit(Instruction::Variable {
            result_type: self.module.types.id(ptr_ty),
            result: var,
            storage: StorageClass::Function,
        });
        self.stack.push(ValueRef { id: var, ty: ptr_ty });
        self.emit(Instruction::Store { pointer: var, value });
    }

    fn pointee_of(&self, pointer: ValueRef, op: &'static str) -> Result<TypeToken, CompileError> {
        self.module.types.pointee(pointer.ty).ok_or_else(|| {
            CompileError::IncompatibleOperands {
                op,
                lhs: self.module.types.describe(pointer.ty),
                rhs: "pointer".to_string(),
            }
        })
    }

    /// Address computation over (base, index). The chain keeps the base's
    /// pointer type; loading through it yields the pointee.
    fn elem_addr(
        &mut self,
        base: ValueRef,
        index: ValueRef,
        op: &'static str,
    ) -> Result<(ResultId, TypeToken), CompileError> {
        let pointee = self
            .module
            .types
            .pointee(base.ty)
            .ok_or_else(|| self.incompatible(op, base.ty, index.ty))?;
        let id = self.ids.next();
        self.emit(Instruction::AccessChain {
            result_type: self.module.types.id(base.ty),
            result: id,
            base: base.id,
            index: index.id,
        });
        Ok((id, pointee))
    }

    /// Conversion table, keyed by destination kind. Unsigned destination
    /// kinds have no table entry and are rejected.
    fn conversion(
        &mut self,
        value: ValueRef,
        dst: ScalarDesc,
    ) -> Result<(ConvertOp, TypeToken), CompileError> {
        if dst.is_unsigned() {
            return Err(CompileError::UnsupportedConversion {
                from: self.module.types.describe(value.ty),
                to: dst.to_string(),
            });
        }
        let dst_ty = self.module.types.scalar(dst, self.ids);
        let op = match (
            num_kind(self.module.types.node(value.ty)),
            num_kind(self.module.types.node(dst_ty)),
        ) {
            (NumKind::Int(_), NumKind::Int(_)) => ConvertOp::SConvert,
            (NumKind::Float(_), NumKind::Int(_)) => ConvertOp::ConvertFToS,
            (NumKind::Int(_), NumKind::Float(_)) => ConvertOp::ConvertSToF,
            (NumKind::Float(_), NumKind::Float(_)) => ConvertOp::FConvert,
            _ => {
                return Err(CompileError::UnsupportedConversion {
                    from: self.module.types.describe(value.ty),
                    to: dst.to_string(),
                })
            }
        };
        Ok((op, dst_ty))
    }

    fn widen(&mut self, value: ValueRef, to: TypeToken, op: ConvertOp) -> ValueRef {
        let id = self.ids.next();
        self.emit(Instruction::Convert {
            op,
            result_type: self.module.types.id(to),
            result: id,
            value: value.id,
        });
        ValueRef { id, ty: to }
    }

    /// Binary arithmetic/bitwise lowering with width promotion: the
    /// narrower integer operand is widened to the wider width before the
    /// op. `float_op` is `None` for the integer-only family.
    fn binary(
        &mut self,
        mnemonic: &'static str,
        int_op: BinaryOp,
        float_op: Option<BinaryOp>,
        widen_op: ConvertOp,
    ) -> Result<(), CompileError> {
        let rhs = self.pop(mnemonic)?;
        let lhs = self.pop(mnemonic)?;
        match (
            num_kind(self.module.types.node(lhs.ty)),
            num_kind(self.module.types.node(rhs.ty)),
        ) {
            (NumKind::Int(wl), NumKind::Int(wr)) => {
                let (lhs, rhs) = if wl < wr {
                    (self.widen(lhs, rhs.ty, widen_op), rhs)
                } else if wr < wl {
                    (lhs, self.widen(rhs, lhs.ty, widen_op))
                } else {
                    (lhs, rhs)
                };
                self.push_binary(int_op, lhs, rhs);
                Ok(())
            }
            (NumKind::Float(wl), NumKind::Float(wr)) => {
                let op = match float_op {
                    Some(op) => op,
                    None => return Err(self.incompatible(mnemonic, lhs.ty, rhs.ty)),
                };
                let (lhs, rhs) = if wl < wr {
                    (self.widen(lhs, rhs.ty, ConvertOp::FConvert), rhs)
                } else if wr < wl {
                    (lhs, self.widen(rhs, lhs.ty, ConvertOp::FConvert))
                } else {
                    (lhs, rhs)
                };
                self.push_binary(op, lhs, rhs);
                Ok(())
            }
            _ => Err(self.incompatible(mnemonic, lhs.ty, rhs.ty)),
        }
    }

    pub(crate) fn push_binary(&mut self, op: BinaryOp, lhs: ValueRef, rhs: ValueRef) {
        let id = self.ids.next();
        self.emit(Instruction::Binary {
            op,
            result_type: self.module.types.id(lhs.ty),
            result: id,
            lhs: lhs.id,
            rhs: rhs.id,
        });
        self.stack.push(ValueRef { id, ty: lhs.ty });
    }

    /// Pop two operands and emit the comparison selected by their kind.
    fn compare_value(
        &mut self,
        kind: CmpKind,
        mnemonic: &'static str,
    ) -> Result<ValueRef, CompileError> {
        let rhs = self.pop(mnemonic)?;
        let lhs = self.pop(mnemonic)?;
        let float = match (
            num_kind(self.module.types.node(lhs.ty)),
            num_kind(self.module.types.node(rhs.ty)),
        ) {
            (NumKind::Int(_), NumKind::Int(_)) => false,
            (NumKind::Float(_), NumKind::Float(_)) => true,
            _ => return Err(self.incompatible(mnemonic, lhs.ty, rhs.ty)),
        };
        let op = compare_op(kind, float);
        let bool_ty = self.module.types.bool(self.ids);
        let id = self.ids.next();
        self.emit(Instruction::Compare {
            op,
            result_type: self.module.types.id(bool_ty),
            result: id,
            lhs: lhs.id,
            rhs: rhs.id,
        });
        Ok(ValueRef { id, ty: bool_ty })
    }

    fn compare_push(&mut self, kind: CmpKind, mnemonic: &'static str) -> Result<(), CompileError> {
        let result = self.compare_value(kind, mnemonic)?;
        self.stack.push(result);
        Ok(())
    }

    fn compare_branch(
        &mut self,
        kind: CmpKind,
        target: u32,
        mnemonic: &'static str,
    ) -> Result<(), CompileError> {
        let condition = self.compare_value(kind, mnemonic)?;
        self.branch_with_fallthrough(condition.id, target);
        Ok(())
    }

    /// Conditional branch on a truth test: compare the popped integer
    /// operand against a zero constant of its own type, branch on the
    /// result, and continue lowering at a fresh fall-through label.
    fn zero_branch(
        &mut self,
        target: u32,
        branch_if_nonzero: bool,
        mnemonic: &'static str,
    ) -> Result<(), CompileError> {
        let arg = self.pop(mnemonic)?;
        if !matches!(self.module.types.node(arg.ty), TypeNode::Int { .. }) {
            return Err(CompileError::IncompatibleOperands {
                op: mnemonic,
                lhs: self.module.types.describe(arg.ty),
                rhs: "int".to_string(),
            });
        }
        let zero = self.module.constants.intern(arg.ty, 0, self.ids);
        let bool_ty = self.module.types.bool(self.ids);
        let op = if branch_if_nonzero {
            CompareOp::INotEqual
        } else {
            CompareOp::IEqual
        };
        let id = self.ids.next();
        self.emit(Instruction::Compare {
            op,
            result_type: self.module.types.id(bool_ty),
            result: id,
            lhs: arg.id,
            rhs: zero,
        });
        self.branch_with_fallthrough(id, target);
        Ok(())
    }

    fn branch_with_fallthrough(&mut self, condition: ResultId, target: u32) {
        let true_label = self.label(target);
        let fall = self.ids.next();
        self.emit(Instruction::BranchConditional {
            condition,
            true_label,
            false_label: fall,
        });
        self.emit(Instruction::Label { result: fall });
    }
}
