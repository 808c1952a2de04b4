/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * Intrinsic call resolver.
 *
 * Calls in kernel bytecode never become real calls: a fixed table of
 * qualified names maps each recognized callee onto its SPIR-V lowering.
 * The global-invocation-index builtin materializes an import symbol on
 * first use; vector operator overloads lower to single vector ops. Every
 * other callee is rejected.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::compiler::{CompileError, MethodLowering};
use crate::ir::{BinaryOp, Builtin, Decoration, ImportSymbol, Instruction, Linkage, ValueRef};
use crate::types::StorageClass;

/// Qualified name of the global invocation index builtin.
pub const GLOBAL_ID: &str = "kernel.get_global_id";

/// A recognized callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// `kernel.get_global_id(dim)`: component `dim` of the global
    /// invocation index vector.
    GlobalInvocationId,
    /// Elementwise addition operator of a fixed-size integer vector type.
    VectorAdd,
}

/// Look up a qualified callee name in the fixed intrinsic table.
pub fn resolve(name: &str) -> Option<Intrinsic> {
    match name {
        GLOBAL_ID => Some(Intrinsic::GlobalInvocationId),
        // vector operator overloads, one per element kind and lane count
        "char2.add" | "char3.add" | "char4.add" | "char8.add" | "char16.add"
        | "short2.add" | "short3.add" | "short4.add" | "short8.add" | "short16.add"
        | "int2.add" | "int3.add" | "int4.add" | "int8.add" | "int16.add"
        | "long2.add" | "long3.add" | "long4.add" | "long8.add" | "long16.add" => {
            Some(Intrinsic::VectorAdd)
        }
        _ => None,
    }
}

/// Dispatch a call instruction through the table.
pub(crate) fn lower_call(
    lowering: &mut MethodLowering<'_>,
    name: &str,
) -> Result<(), CompileError> {
    match resolve(name) {
        Some(Intrinsic::GlobalInvocationId) => lower_global_id(lowering, name),
        Some(Intrinsic::VectorAdd) => lower_vector_add(lowering),
        None => Err(CompileError::UnsupportedCall(name.to_string())),
    }
}

/// Import symbol for the global invocation index: a module-scope variable
/// of pointer(uniform-constant -> int64x3), decorated with its builtin
/// semantic, constant-ness and import linkage. Created once per run.
fn import_global_id(l: &mut MethodLowering<'_>, name: &str) -> ImportSymbol {
    if let Some(sym) = l.module.import(name) {
        return *sym;
    }
    let elem = l.module.types.int(64, l.ids);
    let vec3 = l.module.types.vector(elem, 3, l.ids);
    let ptr = l
        .module
        .types
        .pointer(StorageClass::UniformConstant, vec3, l.ids);
    let id = l.ids.next();
    let sym = ImportSymbol { id, pointer_ty: ptr, pointee_ty: vec3 };
    l.module.add_import(name, sym);
    l.module.decorations.push(Decoration::BuiltIn {
        target: id,
        builtin: Builtin::GlobalInvocationId,
    });
    l.module.decorations.push(Decoration::Constant { target: id });
    l.module.decorations.push(Decoration::LinkageAttributes {
        target: id,
        name: name.to_string(),
        linkage: Linkage::Import,
    });
    sym
}

fn lower_global_id(l: &mut MethodLowering<'_>, name: &str) -> Result<(), CompileError> {
    let index = l.pop("call")?;
    let sym = import_global_id(l, name);
    let elem = l.module.types.int(64, l.ids);

    let loaded = l.ids.next();
    l.emit(Instruction::Load {
        result_type: l.module.types.id(sym.pointee_ty),
        result: loaded,
        pointer: sym.id,
    });
    let component = l.ids.next();
    l.emit(Instruction::VectorExtractDynamic {
        result_type: l.module.types.id(elem),
        result: component,
        vector: loaded,
        index: index.id,
    });
    l.stack.push(ValueRef { id: component, ty: elem });
    Ok(())
}

fn lower_vector_add(l: &mut MethodLowering<'_>) -> Result<(), CompileError> {
    let rhs = l.pop("call")?;
    let lhs = l.pop("call")?;
    l.push_binary(BinaryOp::IAdd, lhs, rhs);
    Ok(())
}
