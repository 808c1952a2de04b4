/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * SPIR-V binary emitter.
 *
 * Serializes the accumulated module as a little-endian word stream: the
 * fixed five-word header, then capabilities, the extended-instruction-set
 * import, the memory model, entry points, decorations, types in first-use
 * order, globals (import variables, then constants), and finally every
 * function body verbatim. Section order is fixed by the consumer and is
 * not negotiable.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::compiler::{CompileError, CompilerOptions};
use crate::constants::ConstKey;
use crate::ids::IdAllocator;
use crate::ir::{
    BinaryOp, Builtin, CompareOp, ConvertOp, Decoration, Instruction, Linkage, Module,
};
use crate::types::{StorageClass, TypeNode};

const MAGIC: u32 = 0x0723_0203;
const VERSION_1_0: u32 = 0x0001_0000;

const CAP_ADDRESSES: u32 = 4;
const CAP_LINKAGE: u32 = 5;
const CAP_KERNEL: u32 = 6;
const CAP_INT64: u32 = 11;

const ADDRESSING_PHYSICAL64: u32 = 2;
const MEMORY_SIMPLE: u32 = 0;
const EXEC_MODEL_KERNEL: u32 = 6;
const FUNCTION_CONTROL_NONE: u32 = 0;

const DECORATION_BUILTIN: u32 = 11;
const DECORATION_CONSTANT: u32 = 22;
const DECORATION_LINKAGE: u32 = 41;
const BUILTIN_GLOBAL_INVOCATION_ID: u32 = 28;
const LINKAGE_EXPORT: u32 = 0;
const LINKAGE_IMPORT: u32 = 1;

/// Extended instruction set required by the kernel execution model.
const EXT_INST_SET: &str = "OpenCL.std";

/// SPIR-V opcode numbers, restricted to what the lowering engine produces.
mod op {
    pub const NOP: u16 = 0;
    pub const EXT_INST_IMPORT: u16 = 11;
    pub const MEMORY_MODEL: u16 = 14;
    pub const ENTRY_POINT: u16 = 15;
    pub const CAPABILITY: u16 = 17;
    pub const TYPE_VOID: u16 = 19;
    pub const TYPE_BOOL: u16 = 20;
    pub const TYPE_INT: u16 = 21;
    pub const TYPE_FLOAT: u16 = 22;
    pub const TYPE_VECTOR: u16 = 23;
    pub const TYPE_POINTER: u16 = 32;
    pub const TYPE_FUNCTION: u16 = 33;
    pub const CONSTANT: u16 = 43;
    pub const FUNCTION: u16 = 54;
    pub const FUNCTION_PARAMETER: u16 = 55;
    pub const FUNCTION_END: u16 = 56;
    pub const VARIABLE: u16 = 59;
    pub const LOAD: u16 = 61;
    pub const STORE: u16 = 62;
    pub const ACCESS_CHAIN: u16 = 65;
    pub const DECORATE: u16 = 71;
    pub const VECTOR_EXTRACT_DYNAMIC: u16 = 77;
    pub const CONVERT_F_TO_S: u16 = 110;
    pub const CONVERT_S_TO_F: u16 = 111;
    pub const U_CONVERT: u16 = 113;
    pub const S_CONVERT: u16 = 114;
    pub const F_CONVERT: u16 = 115;
    pub const I_ADD: u16 = 128;
    pub const F_ADD: u16 = 129;
    pub const I_SUB: u16 = 130;
    pub const F_SUB: u16 = 131;
    pub const I_MUL: u16 = 132;
    pub const F_MUL: u16 = 133;
    pub const U_DIV: u16 = 134;
    pub const S_DIV: u16 = 135;
    pub const F_DIV: u16 = 136;
    pub const I_EQUAL: u16 = 170;
    pub const I_NOT_EQUAL: u16 = 171;
    pub const U_GREATER_THAN: u16 = 172;
    pub const S_GREATER_THAN: u16 = 173;
    pub const U_GREATER_THAN_EQUAL: u16 = 174;
    pub const S_GREATER_THAN_EQUAL: u16 = 175;
    pub const U_LESS_THAN: u16 = 176;
    pub const S_LESS_THAN: u16 = 177;
    pub const U_LESS_THAN_EQUAL: u16 = 178;
    pub const S_LESS_THAN_EQUAL: u16 = 179;
    pub const F_ORD_EQUAL: u16 = 180;
    pub const F_UNORD_NOT_EQUAL: u16 = 183;
    pub const F_UNORD_LESS_THAN: u16 = 185;
    pub const F_UNORD_GREATER_THAN: u16 = 187;
    pub const F_UNORD_LESS_THAN_EQUAL: u16 = 189;
    pub const F_UNORD_GREATER_THAN_EQUAL: u16 = 191;
    pub const SHIFT_RIGHT_LOGICAL: u16 = 194;
    pub const SHIFT_RIGHT_ARITHMETIC: u16 = 195;
    pub const SHIFT_LEFT_LOGICAL: u16 = 196;
    pub const BITWISE_OR: u16 = 197;
    pub const BITWISE_XOR: u16 = 198;
    pub const BITWISE_AND: u16 = 199;
    pub const LABEL: u16 = 248;
    pub const BRANCH: u16 = 249;
    pub const BRANCH_CONDITIONAL: u16 = 250;
    pub const RETURN: u16 = 253;
    pub const RETURN_VALUE: u16 = 254;
}

fn storage_word(storage: StorageClass) -> u32 {
    match storage {
        StorageClass::UniformConstant => 0,
        StorageClass::CrossWorkgroup => 5,
        StorageClass::Function => 7,
    }
}

fn binary_opcode(op: BinaryOp) -> u16 {
    match op {
        BinaryOp::IAdd => op::I_ADD,
        BinaryOp::ISub => op::I_SUB,
        BinaryOp::IMul => op::I_MUL,
        BinaryOp::SDiv => op::S_DIV,
        BinaryOp::UDiv => op::U_DIV,
        BinaryOp::BitwiseAnd => op::BITWISE_AND,
        BinaryOp::BitwiseOr => op::BITWISE_OR,
        BinaryOp::BitwiseXor => op::BITWISE_XOR,
        BinaryOp::ShiftLeftLogical => op::SHIFT_LEFT_LOGICAL,
        BinaryOp::ShiftRightArithmetic => op::SHIFT_RIGHT_ARITHMETIC,
        BinaryOp::ShiftRightLogical => op::SHIFT_RIGHT_LOGICAL,
        BinaryOp::FAdd => op::F_ADD,
        BinaryOp::FSub => op::F_SUB,
        BinaryOp::FMul => op::F_MUL,
        BinaryOp::FDiv => op::F_DIV,
    }
}

fn compare_opcode(op: CompareOp) -> u16 {
    match op {
        CompareOp::IEqual => op::I_EQUAL,
        CompareOp::INotEqual => op::I_NOT_EQUAL,
        CompareOp::SLessThan => op::S_LESS_THAN,
        CompareOp::ULessThan => op::U_LESS_THAN,
        CompareOp::SLessThanEqual => op::S_LESS_THAN_EQUAL,
        CompareOp::ULessThanEqual => op::U_LESS_THAN_EQUAL,
        CompareOp::SGreaterThan => op::S_GREATER_THAN,
        CompareOp::UGreaterThan => op::U_GREATER_THAN,
        CompareOp::SGreaterThanEqual => op::S_GREATER_THAN_EQUAL,
        CompareOp::UGreaterThanEqual => op::U_GREATER_THAN_EQUAL,
        CompareOp::FOrdEqual => op::F_ORD_EQUAL,
        CompareOp::FUnordNotEqual => op::F_UNORD_NOT_EQUAL,
        CompareOp::FUnordLessThan => op::F_UNORD_LESS_THAN,
        CompareOp::FUnordLessThanEqual => op::F_UNORD_LESS_THAN_EQUAL,
        CompareOp::FUnordGreaterThan => op::F_UNORD_GREATER_THAN,
        CompareOp::FUnordGreaterThanEqual => op::F_UNORD_GREATER_THAN_EQUAL,
    }
}

fn convert_opcode(op: ConvertOp) -> u16 {
    match op {
        ConvertOp::SConvert => op::S_CONVERT,
        ConvertOp::UConvert => op::U_CONVERT,
        ConvertOp::FConvert => op::F_CONVERT,
        ConvertOp::ConvertFToS => op::CONVERT_F_TO_S,
        ConvertOp::ConvertSToF => op::CONVERT_S_TO_F,
    }
}

/// UTF-8 literal string operand: nul-terminated, zero-padded to a word
/// boundary, packed little-endian.
fn literal_string(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[derive(Default)]
struct WordWriter {
    words: Vec<u32>,
}

impl WordWriter {
    /// One instruction: the (word count | opcode) word, then the operands.
    fn instruction(&mut self, opcode: u16, operands: &[u32]) {
        self.words
            .push(((operands.len() as u32 + 1) << 16) | opcode as u32);
        self.words.extend_from_slice(operands);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }
}

/// Value words of one constant: one word up to 32 bits, two (low first)
/// for 64-bit types.
fn constant_words(module: &Module, key: &ConstKey) -> Vec<u32> {
    let width = match module.types.node(key.ty) {
        TypeNode::Int { width, .. } => *width,
        TypeNode::Float { width } => *width,
        _ => 32,
    };
    if width > 32 {
        vec![key.bits as u32, (key.bits >> 32) as u32]
    } else {
        vec![key.bits as u32]
    }
}

fn encode_type(w: &mut WordWriter, module: &Module, node: &TypeNode, id: u32) {
    match node {
        TypeNode::Void => w.instruction(op::TYPE_VOID, &[id]),
        TypeNode::Bool => w.instruction(op::TYPE_BOOL, &[id]),
        TypeNode::Int { width, signed } => {
            w.instruction(op::TYPE_INT, &[id, *width, *signed as u32])
        }
        TypeNode::Float { width } => w.instruction(op::TYPE_FLOAT, &[id, *width]),
        TypeNode::Vector { elem, lanes } => {
            w.instruction(op::TYPE_VECTOR, &[id, module.types.id(*elem).0, *lanes])
        }
        TypeNode::Pointer { storage, pointee } => w.instruction(
            op::TYPE_POINTER,
            &[id, storage_word(*storage), module.types.id(*pointee).0],
        ),
        TypeNode::Function { ret, params } => {
            let mut operands = vec![id, module.types.id(*ret).0];
            operands.extend(params.iter().map(|p| module.types.id(*p).0));
            w.instruction(op::TYPE_FUNCTION, &operands);
        }
    }
}

fn encode_decoration(w: &mut WordWriter, dec: &Decoration) {
    match dec {
        Decoration::BuiltIn { target, builtin } => {
            let semantic = match builtin {
                Builtin::GlobalInvocationId => BUILTIN_GLOBAL_INVOCATION_ID,
            };
            w.instruction(op::DECORATE, &[target.0, DECORATION_BUILTIN, semantic]);
        }
        Decoration::Constant { target } => {
            w.instruction(op::DECORATE, &[target.0, DECORATION_CONSTANT]);
        }
        Decoration::LinkageAttributes { target, name, linkage } => {
            let mut operands = vec![target.0, DECORATION_LINKAGE];
            operands.extend(literal_string(name));
            operands.push(match linkage {
                Linkage::Export => LINKAGE_EXPORT,
                Linkage::Import => LINKAGE_IMPORT,
            });
            w.instruction(op::DECORATE, &operands);
        }
    }
}

fn encode_instruction(w: &mut WordWriter, inst: &Instruction) {
    match inst {
        Instruction::Nop => w.instruction(op::NOP, &[]),
        Instruction::Label { result } => w.instruction(op::LABEL, &[result.0]),
        Instruction::Function { result_type, result, function_type } => w.instruction(
            op::FUNCTION,
            &[result_type.0, result.0, FUNCTION_CONTROL_NONE, function_type.0],
        ),
        Instruction::FunctionParameter { result_type, result } => {
            w.instruction(op::FUNCTION_PARAMETER, &[result_type.0, result.0])
        }
        Instruction::FunctionEnd => w.instruction(op::FUNCTION_END, &[]),
        Instruction::Variable { result_type, result, storage } => w.instruction(
            op::VARIABLE,
            &[result_type.0, result.0, storage_word(*storage)],
        ),
        Instruction::Load { result_type, result, pointer } => {
            w.instruction(op::LOAD, &[result_type.0, result.0, pointer.0])
        }
        Instruction::Store { pointer, value } => {
            w.instruction(op::STORE, &[pointer.0, value.0])
        }
        Instruction::AccessChain { result_type, result, base, index } => w.instruction(
            op::ACCESS_CHAIN,
            &[result_type.0, result.0, base.0, index.0],
        ),
        Instruction::VectorExtractDynamic { result_type, result, vector, index } => w
            .instruction(
                op::VECTOR_EXTRACT_DYNAMIC,
                &[result_type.0, result.0, vector.0, index.0],
            ),
        Instruction::Convert { op: conv, result_type, result, value } => w.instruction(
            convert_opcode(*conv),
            &[result_type.0, result.0, value.0],
        ),
        Instruction::Binary { op: bin, result_type, result, lhs, rhs } => w.instruction(
            binary_opcode(*bin),
            &[result_type.0, result.0, lhs.0, rhs.0],
        ),
        Instruction::Compare { op: cmp, result_type, result, lhs, rhs } => w.instruction(
            compare_opcode(*cmp),
            &[result_type.0, result.0, lhs.0, rhs.0],
        ),
        Instruction::Branch { target } => w.instruction(op::BRANCH, &[target.0]),
        Instruction::BranchConditional { condition, true_label, false_label } => w.instruction(
            op::BRANCH_CONDITIONAL,
            &[condition.0, true_label.0, false_label.0],
        ),
        Instruction::Return => w.instruction(op::RETURN, &[]),
        Instruction::ReturnValue { value } => w.instruction(op::RETURN_VALUE, &[value.0]),
    }
}

/// Serialize the module. The header's id bound is re-derived after the
/// sections are written and must agree with the written value.
pub fn emit_module(
    module: &Module,
    ids: &mut IdAllocator,
    options: &CompilerOptions,
) -> Result<Vec<u8>, CompileError> {
    let ext_import = ids.next();
    let bound = ids.bound();

    let mut w = WordWriter::default();
    w.words
        .extend_from_slice(&[MAGIC, VERSION_1_0, options.generator_id, bound, 0]);

    for cap in [CAP_ADDRESSES, CAP_LINKAGE, CAP_KERNEL, CAP_INT64] {
        w.instruction(op::CAPABILITY, &[cap]);
    }

    let mut operands = vec![ext_import.0];
    operands.extend(literal_string(EXT_INST_SET));
    w.instruction(op::EXT_INST_IMPORT, &operands);

    w.instruction(op::MEMORY_MODEL, &[ADDRESSING_PHYSICAL64, MEMORY_SIMPLE]);

    for ep in &module.entry_points {
        let mut operands = vec![EXEC_MODEL_KERNEL, ep.function.0];
        operands.extend(literal_string(&ep.name));
        w.instruction(op::ENTRY_POINT, &operands);
    }

    for dec in &module.decorations {
        encode_decoration(&mut w, dec);
    }

    for (node, id) in module.types.iter() {
        encode_type(&mut w, module, node, id.0);
    }

    // globals: import symbols first, then constants, in first-use order
    for (_, sym) in &module.imports {
        let storage = match module.types.node(sym.pointer_ty) {
            TypeNode::Pointer { storage, .. } => *storage,
            _ => StorageClass::UniformConstant,
        };
        w.instruction(
            op::VARIABLE,
            &[module.types.id(sym.pointer_ty).0, sym.id.0, storage_word(storage)],
        );
    }
    for (key, id) in module.constants.iter() {
        let mut operands = vec![module.types.id(key.ty).0, id.0];
        operands.extend(constant_words(module, &key));
        w.instruction(op::CONSTANT, &operands);
    }

    for func in &module.functions {
        for inst in &func.body {
            encode_instruction(&mut w, inst);
        }
    }

    let derived = ids.bound();
    if derived != bound {
        return Err(CompileError::BoundMismatch { written: bound, derived });
    }
    Ok(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{AddressSpace, Inst, KernelMethod, MethodSig, Op, ParamDesc};
    use crate::compiler::KernelCompiler;
    use crate::types::{ScalarDesc, TypeDesc};

    /// Decoded instruction stream: (opcode, operand words).
    fn decode(bytes: &[u8]) -> (Vec<u32>, Vec<(u16, Vec<u32>)>) {
        assert_eq!(bytes.len() % 4, 0, "stream is word-aligned");
        let words: Vec<u32> = bytes
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let header = words[..5].to_vec();
        let mut insts = Vec::new();
        let mut i = 5;
        while i < words.len() {
            let wc = (words[i] >> 16) as usize;
            let opcode = (words[i] & 0xFFFF) as u16;
            assert!(wc >= 1, "zero word count at {}", i);
            insts.push((opcode, words[i + 1..i + wc].to_vec()));
            i += wc;
        }
        (header, insts)
    }

    fn vadd_kernel() -> KernelMethod {
        let arr = || ParamDesc {
            ty: TypeDesc::Array(Box::new(TypeDesc::Scalar(ScalarDesc::I32))),
            space: AddressSpace::Global,
        };
        KernelMethod {
            name: "vector_add".to_string(),
            sig: MethodSig { ret: TypeDesc::Void, params: vec![arr(), arr(), arr()] },
            locals: vec![TypeDesc::Scalar(ScalarDesc::I64)],
            kernel: true,
            export_name: None,
            code: vec![
                Inst::new(0, Op::ConstI32(0)),
                Inst::new(1, Op::Call { name: crate::intrinsics::GLOBAL_ID.to_string(), arity: 1 }),
                Inst::new(2, Op::StoreLocal(0)),
                Inst::new(3, Op::LoadParam(2)),
                Inst::new(4, Op::LoadLocal(0)),
                Inst::new(5, Op::LoadParam(0)),
                Inst::new(6, Op::LoadLocal(0)),
                Inst::new(7, Op::LoadElem),
                Inst::new(8, Op::LoadParam(1)),
                Inst::new(9, Op::LoadLocal(0)),
                Inst::new(10, Op::LoadElem),
                Inst::new(11, Op::Add),
                Inst::new(12, Op::StoreElem),
                Inst::new(13, Op::Return),
            ],
        }
    }

    #[test]
    fn test_literal_string_is_nul_terminated_and_padded() {
        // 10 bytes + nul -> 12 bytes -> 3 words
        let words = literal_string("OpenCL.std");
        assert_eq!(words.len(), 3);
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        assert_eq!(&bytes[..10], b"OpenCL.std");
        assert_eq!(&bytes[10..], &[0, 0]);

        // exactly one word including the terminator
        assert_eq!(literal_string("abc").len(), 1);
        // a length-4 string needs a second word for the terminator
        assert_eq!(literal_string("abcd").len(), 2);
    }

    #[test]
    fn test_header_words() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        assert_eq!(&bytes[..4], &[0x03, 0x02, 0x23, 0x07], "magic");
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x01, 0x00], "version 1.0");
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0], "generator");
        let bound = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        assert!(bound > 1);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0], "reserved word");
    }

    #[test]
    fn test_section_order() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        let (_, insts) = decode(&bytes);
        let opcodes: Vec<u16> = insts.iter().map(|(o, _)| *o).collect();

        // four capabilities lead
        assert_eq!(
            &opcodes[..4],
            &[op::CAPABILITY, op::CAPABILITY, op::CAPABILITY, op::CAPABILITY]
        );
        assert_eq!(opcodes[4], op::EXT_INST_IMPORT);
        assert_eq!(opcodes[5], op::MEMORY_MODEL);
        assert_eq!(opcodes[6], op::ENTRY_POINT);

        let pos = |code: u16| opcodes.iter().position(|&o| o == code);
        let decorate = pos(op::DECORATE).expect("decorations present");
        let first_type = pos(op::TYPE_VOID).expect("types present");
        let import_var = pos(op::VARIABLE).expect("import variable present");
        let constant = pos(op::CONSTANT).expect("constants present");
        let function = pos(op::FUNCTION).expect("function body present");
        assert!(decorate < first_type);
        assert!(first_type < import_var);
        assert!(import_var < constant);
        assert!(constant < function);

        // function body instructions come last, ended by OpFunctionEnd
        assert_eq!(*opcodes.last().unwrap(), op::FUNCTION_END);
    }

    #[test]
    fn test_capability_set() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        let (_, insts) = decode(&bytes);
        let caps: Vec<u32> = insts
            .iter()
            .filter(|(o, _)| *o == op::CAPABILITY)
            .map(|(_, ops)| ops[0])
            .collect();
        assert_eq!(caps, vec![CAP_ADDRESSES, CAP_LINKAGE, CAP_KERNEL, CAP_INT64]);
    }

    #[test]
    fn test_ext_import_and_memory_model() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        let (_, insts) = decode(&bytes);
        let ext = insts
            .iter()
            .find(|(o, _)| *o == op::EXT_INST_IMPORT)
            .unwrap();
        let name_bytes: Vec<u8> = ext.1[1..].iter().flat_map(|w| w.to_le_bytes()).collect();
        let name = String::from_utf8(name_bytes).unwrap();
        assert_eq!(name.trim_end_matches('\0'), "OpenCL.std");

        let mm = insts.iter().find(|(o, _)| *o == op::MEMORY_MODEL).unwrap();
        assert_eq!(mm.1, vec![ADDRESSING_PHYSICAL64, MEMORY_SIMPLE]);
    }

    #[test]
    fn test_entry_point_carries_exported_name() {
        let mut method = vadd_kernel();
        method.export_name = Some("vadd".to_string());
        let bytes = KernelCompiler::compile_kernel(method).unwrap();
        let (_, insts) = decode(&bytes);
        let ep = insts.iter().find(|(o, _)| *o == op::ENTRY_POINT).unwrap();
        assert_eq!(ep.1[0], EXEC_MODEL_KERNEL);
        let name_bytes: Vec<u8> = ep.1[2..].iter().flat_map(|w| w.to_le_bytes()).collect();
        let name = String::from_utf8(name_bytes).unwrap();
        assert_eq!(name.trim_end_matches('\0'), "vadd");
    }

    #[test]
    fn test_header_bound_covers_every_result_id() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        let (header, insts) = decode(&bytes);
        let bound = header[3];

        // word index of the result id per result-carrying opcode
        let result_index = |opcode: u16| -> Option<usize> {
            match opcode {
                op::EXT_INST_IMPORT | op::TYPE_VOID | op::TYPE_BOOL | op::TYPE_INT
                | op::TYPE_FLOAT | op::TYPE_VECTOR | op::TYPE_POINTER | op::TYPE_FUNCTION
                | op::LABEL => Some(0),
                op::CONSTANT | op::FUNCTION | op::FUNCTION_PARAMETER | op::VARIABLE
                | op::LOAD | op::ACCESS_CHAIN | op::VECTOR_EXTRACT_DYNAMIC
                | op::CONVERT_F_TO_S | op::CONVERT_S_TO_F | op::U_CONVERT | op::S_CONVERT
                | op::F_CONVERT | op::I_ADD | op::F_ADD | op::I_SUB | op::F_SUB
                | op::I_MUL | op::F_MUL | op::U_DIV | op::S_DIV | op::F_DIV
                | op::I_EQUAL | op::I_NOT_EQUAL => Some(1),
                _ => None,
            }
        };

        let mut seen = std::collections::HashSet::new();
        for (opcode, operands) in &insts {
            if let Some(idx) = result_index(*opcode) {
                let id = operands[idx];
                assert!(id < bound, "id {} exceeds bound {}", id, bound);
                assert!(seen.insert(id), "result id {} defined twice", id);
            }
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_emitted_body_contains_add_and_access_chains() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        let (_, insts) = decode(&bytes);
        let count = |code: u16| insts.iter().filter(|(o, _)| *o == code).count();
        assert_eq!(count(op::I_ADD), 1);
        assert_eq!(count(op::ACCESS_CHAIN), 3);
        assert_eq!(count(op::STORE), 1);
        // two element loads plus one import load
        assert_eq!(count(op::LOAD), 3);
        assert_eq!(count(op::VECTOR_EXTRACT_DYNAMIC), 1);
        assert_eq!(count(op::RETURN), 1);
    }

    #[test]
    fn test_int64_constant_spans_two_words() {
        let method = KernelMethod {
            name: "wide".to_string(),
            sig: MethodSig { ret: TypeDesc::Scalar(ScalarDesc::I64), params: vec![] },
            locals: vec![],
            kernel: false,
            export_name: None,
            code: vec![
                Inst::new(0, Op::ConstI64(0x1_0000_0002)),
                Inst::new(1, Op::Return),
            ],
        };
        let bytes = KernelCompiler::compile_kernel(method).unwrap();
        let (_, insts) = decode(&bytes);
        let constant = insts.iter().find(|(o, _)| *o == op::CONSTANT).unwrap();
        // type, result, low word, high word
        assert_eq!(constant.1.len(), 4);
        assert_eq!(constant.1[2], 2);
        assert_eq!(constant.1[3], 1);
    }

    #[test]
    fn test_global_parameter_uses_cross_workgroup_pointer() {
        let bytes = KernelCompiler::compile_kernel(vadd_kernel()).unwrap();
        let (_, insts) = decode(&bytes);
        let pointer_storages: Vec<u32> = insts
            .iter()
            .filter(|(o, _)| *o == op::TYPE_POINTER)
            .map(|(_, ops)| ops[1])
            .collect();
        assert!(
            pointer_storages.contains(&storage_word(StorageClass::CrossWorkgroup)),
            "global array parameters are cross-workgroup pointers"
        );
        assert!(
            pointer_storages.contains(&storage_word(StorageClass::UniformConstant)),
            "the import symbol is a uniform-constant pointer"
        );
    }
}
