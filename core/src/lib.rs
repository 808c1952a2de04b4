/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * This file is part of the Spirc kernel compiler: a single-pass backend
 * translating stack-machine kernel bytecode into SPIR-V binary modules.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

pub mod bytecode;
pub mod compiler;
pub mod constants;
pub mod emit;
pub mod ids;
pub mod intrinsics;
pub mod ir;
pub mod types;

pub use bytecode::{AddressSpace, Inst, KernelMethod, MethodSig, Op, ParamDesc};
pub use compiler::{CompileError, CompilerOptions, KernelCompiler};
pub use types::{ScalarDesc, TypeDesc};
