/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * SPIR-V instruction set and module aggregate.
 *
 * Only the subset of SPIR-V the lowering engine can produce is modeled,
 * as a closed tagged-union matched exhaustively by the binary emitter.
 * Operands are result ids; type operands are resolved to ids when the
 * instruction is built, so a recorded function body emits verbatim.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::constants::ConstantPool;
use crate::ids::ResultId;
use crate::types::{StorageClass, TypeCatalog, TypeToken};

/// A typed value on the operand stack or in a slot: the id of the
/// instruction (or constant, parameter, import) that produced it, plus its
/// type. Never mutated; slot redefinition replaces the whole ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRef {
    pub id: ResultId,
    pub ty: TypeToken,
}

/// Binary arithmetic and bitwise ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    IAdd,
    ISub,
    IMul,
    SDiv,
    UDiv,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeftLogical,
    ShiftRightArithmetic,
    ShiftRightLogical,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

/// Comparison ops producing a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    IEqual,
    INotEqual,
    SLessThan,
    ULessThan,
    SLessThanEqual,
    ULessThanEqual,
    SGreaterThan,
    UGreaterThan,
    SGreaterThanEqual,
    UGreaterThanEqual,
    FOrdEqual,
    FUnordNotEqual,
    FUnordLessThan,
    FUnordLessThanEqual,
    FUnordGreaterThan,
    FUnordGreaterThanEqual,
}

/// Numeric conversion ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOp {
    /// Sign-preserving integer resize.
    SConvert,
    /// Zero-extending integer resize.
    UConvert,
    /// Float width change.
    FConvert,
    /// Float to signed integer.
    ConvertFToS,
    /// Signed integer to float.
    ConvertSToF,
}

/// One emitted instruction of a function body.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Nop,
    Label { result: ResultId },
    Function { result_type: ResultId, result: ResultId, function_type: ResultId },
    FunctionParameter { result_type: ResultId, result: ResultId },
    FunctionEnd,
    Variable { result_type: ResultId, result: ResultId, storage: StorageClass },
    Load { result_type: ResultId, result: ResultId, pointer: ResultId },
    Store { pointer: ResultId, value: ResultId },
    AccessChain { result_type: ResultId, result: ResultId, base: ResultId, index: ResultId },
    VectorExtractDynamic { result_type: ResultId, result: ResultId, vector: ResultId, index: ResultId },
    Convert { op: ConvertOp, result_type: ResultId, result: ResultId, value: ResultId },
    Binary { op: BinaryOp, result_type: ResultId, result: ResultId, lhs: ResultId, rhs: ResultId },
    Compare { op: CompareOp, result_type: ResultId, result: ResultId, lhs: ResultId, rhs: ResultId },
    Branch { target: ResultId },
    BranchConditional { condition: ResultId, true_label: ResultId, false_label: ResultId },
    Return,
    ReturnValue { value: ResultId },
}

/// Builtin semantics a symbol can be decorated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    GlobalInvocationId,
}

/// Linkage kind for import/export decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Export,
    Import,
}

/// Metadata attached to a declared symbol, consumed by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    BuiltIn { target: ResultId, builtin: Builtin },
    Constant { target: ResultId },
    LinkageAttributes { target: ResultId, name: String, linkage: Linkage },
}

/// A function flagged for external invocation by the execution host.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    pub function: ResultId,
    pub name: String,
}

/// Module-scope placeholder for an externally-resolved builtin symbol.
/// Created at most once per qualified name per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSymbol {
    pub id: ResultId,
    /// Pointer type of the symbol's module-scope variable.
    pub pointer_ty: TypeToken,
    /// Type produced by loading through the symbol.
    pub pointee_ty: TypeToken,
}

/// The emitted instructions of one compiled method, delimited by the
/// function-begin and function-end markers.
#[derive(Debug, Clone, Default)]
pub struct FunctionRecord {
    pub body: Vec<Instruction>,
}

/// Everything accumulated over one compilation run, handed to the binary
/// emitter in one piece and discarded afterwards.
#[derive(Debug, Default)]
pub struct Module {
    pub types: TypeCatalog,
    pub constants: ConstantPool,
    /// Import symbols keyed by qualified name, in first-use order.
    pub imports: Vec<(String, ImportSymbol)>,
    pub entry_points: Vec<EntryPoint>,
    pub decorations: Vec<Decoration>,
    pub functions: Vec<FunctionRecord>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an import symbol by qualified name.
    pub fn import(&self, name: &str) -> Option<&ImportSymbol> {
        self.imports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, sym)| sym)
    }

    pub fn add_import(&mut self, name: &str, sym: ImportSymbol) {
        self.imports.push((name.to_string(), sym));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::types::ScalarDesc;

    #[test]
    fn test_import_lookup_by_name() {
        let mut ids = IdAllocator::new();
        let mut module = Module::new();
        let i64_t = module.types.scalar(ScalarDesc::I64, &mut ids);
        let vec_t = module.types.vector(i64_t, 3, &mut ids);
        let ptr_t = module
            .types
            .pointer(StorageClass::UniformConstant, vec_t, &mut ids);
        let sym = ImportSymbol { id: ids.next(), pointer_ty: ptr_t, pointee_ty: vec_t };
        module.add_import("kernel.get_global_id", sym);

        assert_eq!(module.import("kernel.get_global_id"), Some(&sym));
        assert_eq!(module.import("kernel.get_local_id"), None);
    }
}
