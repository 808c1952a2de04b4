/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * Kernel bytecode input model.
 *
 * The container front end (class/method/attribute parsing) is an external
 * collaborator; it hands the compiler this abstract view of one method:
 * a signature, declared locals, entry-point metadata, and a linear stream
 * of typed stack-machine instructions keyed by byte offset. Serde derives
 * let front ends and test fixtures describe methods as JSON.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::types::{ScalarDesc, StorageClass, TypeDesc};
use serde::{Deserialize, Serialize};

/// Memory region annotation on a kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AddressSpace {
    /// Function-local (the default when a parameter carries no annotation).
    #[default]
    Private,
    /// Device global memory.
    Global,
}

impl AddressSpace {
    /// Storage class used when resolving a pointer parameter declared in
    /// this address space.
    pub fn storage_class(self) -> StorageClass {
        match self {
            AddressSpace::Private => StorageClass::Function,
            AddressSpace::Global => StorageClass::CrossWorkgroup,
        }
    }
}

/// One declared parameter: its type descriptor plus address-space tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDesc {
    pub ty: TypeDesc,
    #[serde(default)]
    pub space: AddressSpace,
}

/// Declared method signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSig {
    pub ret: TypeDesc,
    pub params: Vec<ParamDesc>,
}

/// A stack-machine instruction, dispatched exhaustively by the lowering
/// engine. Operands ride in the variants: immediates, slot indices, branch
/// target offsets (byte offsets into the same stream), or a callee name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Nop,
    /// Push a copy of the top of stack.
    Dup,

    // Constant pushes. Small immediate integer forms are canonicalized to
    // 32-bit by the front end; 64-bit and float forms keep their width.
    ConstI32(i32),
    ConstI64(i64),
    ConstF32(f32),
    ConstF64(f64),

    // Slot access.
    LoadParam(u32),
    LoadParamAddr(u32),
    LoadLocal(u32),
    LoadLocalAddr(u32),
    StoreLocal(u32),

    // Element access through an array/pointer base on the stack.
    LoadElem,
    LoadElemAddr,
    StoreElem,
    LoadIndirect,
    StoreIndirect,

    /// Numeric conversion to the given destination scalar kind.
    Convert(ScalarDesc),

    // Binary arithmetic / bitwise.
    Add,
    Sub,
    Mul,
    DivS,
    DivU,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,

    // Comparisons, pushing a boolean.
    CmpEq,
    CmpNe,
    CmpLtS,
    CmpLtU,
    CmpLeS,
    CmpLeU,
    CmpGtS,
    CmpGtU,
    CmpGeS,
    CmpGeU,

    // Branches; the operand is the byte offset of the target instruction.
    Branch(u32),
    BranchIf(u32),
    BranchIfNot(u32),
    BranchEq(u32),
    BranchNe(u32),
    BranchLtS(u32),
    BranchLtU(u32),
    BranchLeS(u32),
    BranchLeU(u32),
    BranchGtS(u32),
    BranchGtU(u32),
    BranchGeS(u32),
    BranchGeU(u32),

    Return,

    /// Call of a qualified name; resolved by the intrinsic table.
    Call { name: String, arity: u32 },

    /// A container instruction outside the supported set, carried through
    /// by the front end under its container mnemonic. Lowering fails on it.
    Unsupported(String),
}

impl Op {
    /// Branch target offset, for the control-flow prepass.
    pub fn branch_target(&self) -> Option<u32> {
        match *self {
            Op::Branch(t)
            | Op::BranchIf(t)
            | Op::BranchIfNot(t)
            | Op::BranchEq(t)
            | Op::BranchNe(t)
            | Op::BranchLtS(t)
            | Op::BranchLtU(t)
            | Op::BranchLeS(t)
            | Op::BranchLeU(t)
            | Op::BranchGtS(t)
            | Op::BranchGtU(t)
            | Op::BranchGeS(t)
            | Op::BranchGeU(t) => Some(t),
            _ => None,
        }
    }

    /// Mnemonic used in error messages.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Dup => "dup",
            Op::ConstI32(_) => "const.i32",
            Op::ConstI64(_) => "const.i64",
            Op::ConstF32(_) => "const.f32",
            Op::ConstF64(_) => "const.f64",
            Op::LoadParam(_) => "load.param",
            Op::LoadParamAddr(_) => "load.param.addr",
            Op::LoadLocal(_) => "load.local",
            Op::LoadLocalAddr(_) => "load.local.addr",
            Op::StoreLocal(_) => "store.local",
            Op::LoadElem => "load.elem",
            Op::LoadElemAddr => "load.elem.addr",
            Op::StoreElem => "store.elem",
            Op::LoadIndirect => "load.ind",
            Op::StoreIndirect => "store.ind",
            Op::Convert(_) => "conv",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::DivS => "div",
            Op::DivU => "div.un",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Shl => "shl",
            Op::ShrS => "shr",
            Op::ShrU => "shr.un",
            Op::CmpEq => "ceq",
            Op::CmpNe => "cne",
            Op::CmpLtS => "clt",
            Op::CmpLtU => "clt.un",
            Op::CmpLeS => "cle",
            Op::CmpLeU => "cle.un",
            Op::CmpGtS => "cgt",
            Op::CmpGtU => "cgt.un",
            Op::CmpGeS => "cge",
            Op::CmpGeU => "cge.un",
            Op::Branch(_) => "br",
            Op::BranchIf(_) => "br.true",
            Op::BranchIfNot(_) => "br.false",
            Op::BranchEq(_) => "br.eq",
            Op::BranchNe(_) => "br.ne",
            Op::BranchLtS(_) => "br.lt",
            Op::BranchLtU(_) => "br.lt.un",
            Op::BranchLeS(_) => "br.le",
            Op::BranchLeU(_) => "br.le.un",
            Op::BranchGtS(_) => "br.gt",
            Op::BranchGtU(_) => "br.gt.un",
            Op::BranchGeS(_) => "br.ge",
            Op::BranchGeU(_) => "br.ge.un",
            Op::Return => "ret",
            Op::Call { .. } => "call",
            Op::Unsupported(_) => "unsupported",
        }
    }
}

/// One instruction at its byte offset in the method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inst {
    pub offset: u32,
    pub op: Op,
}

impl Inst {
    pub fn new(offset: u32, op: Op) -> Self {
        Inst { offset, op }
    }
}

/// One method as handed over by the container front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelMethod {
    pub name: String,
    pub sig: MethodSig,
    /// Declared local variable types, one per slot.
    #[serde(default)]
    pub locals: Vec<TypeDesc>,
    /// True when the method is flagged as a kernel entry point.
    #[serde(default)]
    pub kernel: bool,
    /// Optional exported-name override from method metadata.
    #[serde(default)]
    pub export_name: Option<String>,
    pub code: Vec<Inst>,
}

impl KernelMethod {
    /// Name under which an entry point is registered: the metadata override
    /// when present, otherwise the method's own name.
    pub fn export_label(&self) -> &str {
        self.export_name.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_target_extraction() {
        assert_eq!(Op::Branch(12).branch_target(), Some(12));
        assert_eq!(Op::BranchLeU(3).branch_target(), Some(3));
        assert_eq!(Op::Return.branch_target(), None);
        assert_eq!(Op::ConstI32(7).branch_target(), None);
    }

    #[test]
    fn test_export_label_prefers_override() {
        let mut method = KernelMethod {
            name: "add_vec".to_string(),
            sig: MethodSig { ret: TypeDesc::Void, params: vec![] },
            locals: vec![],
            kernel: true,
            export_name: None,
            code: vec![],
        };
        assert_eq!(method.export_label(), "add_vec");
        method.export_name = Some("vadd".to_string());
        assert_eq!(method.export_label(), "vadd");
    }

    #[test]
    fn test_method_json_round_trip() {
        let json = r#"{
            "name": "copy",
            "sig": {
                "ret": "Void",
                "params": [
                    { "ty": { "Array": { "Scalar": "I32" } }, "space": "Global" },
                    { "ty": { "Array": { "Scalar": "I32" } } }
                ]
            },
            "kernel": true,
            "code": [
                { "offset": 0, "op": { "LoadParam": 0 } },
                { "offset": 1, "op": { "ConstI32": 0 } },
                { "offset": 2, "op": "LoadElem" },
                { "offset": 3, "op": "Return" }
            ]
        }"#;
        let method: KernelMethod = serde_json::from_str(json).expect("fixture parses");
        assert_eq!(method.sig.params.len(), 2);
        assert_eq!(method.sig.params[0].space, AddressSpace::Global);
        assert_eq!(method.sig.params[1].space, AddressSpace::Private);
        assert_eq!(method.code.len(), 4);
        assert_eq!(method.code[2].op, Op::LoadElem);

        let back = serde_json::to_string(&method).unwrap();
        let again: KernelMethod = serde_json::from_str(&back).unwrap();
        assert_eq!(method, again);
    }
}
