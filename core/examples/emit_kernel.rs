/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * This file is part of the Spirc kernel compiler.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use spirc::{
    AddressSpace, Inst, KernelCompiler, KernelMethod, MethodSig, Op, ParamDesc, ScalarDesc,
    TypeDesc,
};

/// Builds the bytecode of `r[i] = a[i] + b[i]` with `i` taken from the
/// first component of the global invocation index, compiles it, and writes
/// the binary module next to the working directory.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let int_array = || ParamDesc {
        ty: TypeDesc::Array(Box::new(TypeDesc::Scalar(ScalarDesc::I32))),
        space: AddressSpace::Global,
    };
    let method = KernelMethod {
        name: "vector_add".to_string(),
        sig: MethodSig {
            ret: TypeDesc::Void,
            params: vec![int_array(), int_array(), int_array()],
        },
        locals: vec![TypeDesc::Scalar(ScalarDesc::I64)],
        kernel: true,
        export_name: None,
        code: vec![
            Inst::new(0, Op::ConstI32(0)),
            Inst::new(1, Op::Call { name: "kernel.get_global_id".to_string(), arity: 1 }),
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
    };

    let binary = KernelCompiler::compile_kernel(method)?;
    std::fs::write("vector_add.spv", &binary)?;
    println!("wrote vector_add.spv ({} bytes)", binary.len());
    Ok(())
}
