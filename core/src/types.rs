/*
 * Copyright (c) 2026 Spirc Contributors.
 *
 * Type catalog for the Spirc kernel compiler.
 *
 * Maps source type descriptors onto SPIR-V type nodes. Nodes live in an
 * arena addressed by `TypeToken`; composite nodes store child tokens, so
 * structural equality of a node value is canonical and the arena never
 * forms ownership cycles. Structurally equal nodes share one result id.
 *
 * LICENSE: MIT OR Apache-2.0.
 */

use crate::compiler::CompileError;
use crate::ids::{IdAllocator, ResultId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Scalar type descriptor, as declared by the bytecode container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarDesc {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Pointer-sized integer. The translation target is 64-bit addressing,
    /// so this resolves to a signed 64-bit integer.
    NativeInt,
}

impl ScalarDesc {
    fn node(self) -> TypeNode {
        match self {
            ScalarDesc::I8 => TypeNode::Int { width: 8, signed: true },
            ScalarDesc::I16 => TypeNode::Int { width: 16, signed: true },
            ScalarDesc::I32 => TypeNode::Int { width: 32, signed: true },
            ScalarDesc::I64 | ScalarDesc::NativeInt => TypeNode::Int { width: 64, signed: true },
            ScalarDesc::U8 => TypeNode::Int { width: 8, signed: false },
            ScalarDesc::U16 => TypeNode::Int { width: 16, signed: false },
            ScalarDesc::U32 => TypeNode::Int { width: 32, signed: false },
            ScalarDesc::U64 => TypeNode::Int { width: 64, signed: false },
            ScalarDesc::F32 => TypeNode::Float { width: 32 },
            ScalarDesc::F64 => TypeNode::Float { width: 64 },
        }
    }

    /// True for the unsigned integer descriptors.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ScalarDesc::U8 | ScalarDesc::U16 | ScalarDesc::U32 | ScalarDesc::U64
        )
    }
}

impl fmt::Display for ScalarDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarDesc::I8 => "int8",
            ScalarDesc::I16 => "int16",
            ScalarDesc::I32 => "int32",
            ScalarDesc::I64 => "int64",
            ScalarDesc::U8 => "uint8",
            ScalarDesc::U16 => "uint16",
            ScalarDesc::U32 => "uint32",
            ScalarDesc::U64 => "uint64",
            ScalarDesc::F32 => "float32",
            ScalarDesc::F64 => "float64",
            ScalarDesc::NativeInt => "intptr",
        };
        write!(f, "{}", name)
    }
}

/// Source type descriptor: what the front end declares for returns,
/// parameters and locals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    Void,
    Scalar(ScalarDesc),
    /// Fixed-size vector of a scalar element.
    Vector { elem: ScalarDesc, lanes: u32 },
    /// One-dimensional array of (equivalently, pointer to) the element type.
    Array(Box<TypeDesc>),
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Void => write!(f, "void"),
            TypeDesc::Scalar(s) => write!(f, "{}", s),
            TypeDesc::Vector { elem, lanes } => write!(f, "{}x{}", elem, lanes),
            TypeDesc::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// Memory region addressed by a pointer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Externally-resolved constant memory (import symbols).
    UniformConstant,
    /// Device global memory.
    CrossWorkgroup,
    /// Function-local memory.
    Function,
}

/// Handle into the type arena. Copyable; the arena owns the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeToken(usize);

/// A SPIR-V type node. Composites reference children by token, never by
/// nesting, so two structurally equal nodes compare equal directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { elem: TypeToken, lanes: u32 },
    Pointer { storage: StorageClass, pointee: TypeToken },
    Function { ret: TypeToken, params: Vec<TypeToken> },
}

/// Vector lane counts accepted by the target.
const VECTOR_LANES: [u32; 5] = [2, 3, 4, 8, 16];

/// Deduplicating arena of type nodes.
///
/// Each distinct node is assigned one result id on first use and is emitted
/// once, in first-use order.
#[derive(Debug)]
pub struct TypeCatalog {
    nodes: Vec<(TypeNode, ResultId)>,
    dedup: HashMap<TypeNode, TypeToken>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        TypeCatalog {
            nodes: Vec::new(),
            dedup: HashMap::new(),
        }
    }

    /// Intern a node, minting an id only if it was not seen before.
    pub fn intern(&mut self, node: TypeNode, ids: &mut IdAllocator) -> TypeToken {
        if let Some(&token) = self.dedup.get(&node) {
            return token;
        }
        let token = TypeToken(self.nodes.len());
        self.nodes.push((node.clone(), ids.next()));
        self.dedup.insert(node, token);
        token
    }

    /// Resolve a source descriptor to a type token.
    ///
    /// `storage` applies to any pointer type produced by the resolution;
    /// scalar and vector descriptors ignore it.
    pub fn resolve(
        &mut self,
        desc: &TypeDesc,
        storage: StorageClass,
        ids: &mut IdAllocator,
    ) -> Result<TypeToken, CompileError> {
        match desc {
            TypeDesc::Void => Ok(self.intern(TypeNode::Void, ids)),
            TypeDesc::Scalar(s) => Ok(self.scalar(*s, ids)),
            TypeDesc::Vector { elem, lanes } => self.vector_of(*elem, *lanes, ids),
            TypeDesc::Array(inner) => match inner.as_ref() {
                TypeDesc::Void | TypeDesc::Array(_) => {
                    Err(CompileError::UnsupportedType(desc.to_string()))
                }
                elem => {
                    let pointee = self.resolve(elem, storage, ids)?;
                    Ok(self.pointer(storage, pointee, ids))
                }
            },
        }
    }

    pub fn scalar(&mut self, s: ScalarDesc, ids: &mut IdAllocator) -> TypeToken {
        self.intern(s.node(), ids)
    }

    fn vector_of(
        &mut self,
        elem: ScalarDesc,
        lanes: u32,
        ids: &mut IdAllocator,
    ) -> Result<TypeToken, CompileError> {
        if !VECTOR_LANES.contains(&lanes) {
            return Err(CompileError::UnsupportedType(format!("{}x{}", elem, lanes)));
        }
        let elem = self.scalar(elem, ids);
        Ok(self.intern(TypeNode::Vector { elem, lanes }, ids))
    }

    pub fn void(&mut self, ids: &mut IdAllocator) -> TypeToken {
        self.intern(TypeNode::Void, ids)
    }

    pub fn bool(&mut self, ids: &mut IdAllocator) -> TypeToken {
        self.intern(TypeNode::Bool, ids)
    }

    pub fn int(&mut self, width: u32, ids: &mut IdAllocator) -> TypeToken {
        self.intern(TypeNode::Int { width, signed: true }, ids)
    }

    pub fn float(&mut self, width: u32, ids: &mut IdAllocator) -> TypeToken {
        self.intern(TypeNode::Float { width }, ids)
    }

    pub fn vector(&mut self, elem: TypeToken, lanes: u32, ids: &mut IdAllocator) -> TypeToken {
        self.intern(TypeNode::Vector { elem, lanes }, ids)
    }

    pub fn pointer(
        &mut self,
        storage: StorageClass,
        pointee: TypeToken,
        ids: &mut IdAllocator,
    ) -> TypeToken {
        self.intern(TypeNode::Pointer { storage, pointee }, ids)
    }

    pub fn function(
        &mut self,
        ret: TypeToken,
        params: Vec<TypeToken>,
        ids: &mut IdAllocator,
    ) -> TypeToken {
        self.intern(TypeNode::Function { ret, params }, ids)
    }

    pub fn node(&self, token: TypeToken) -> &TypeNode {
        &self.nodes[token.0].0
    }

    pub fn id(&self, token: TypeToken) -> ResultId {
        self.nodes[token.0].1
    }

    /// Pointee of a pointer node, if `token` is a pointer.
    pub fn pointee(&self, token: TypeToken) -> Option<TypeToken> {
        match self.node(token) {
            TypeNode::Pointer { pointee, .. } => Some(*pointee),
            _ => None,
        }
    }

    /// Human-readable name of a node, for error messages.
    pub fn describe(&self, token: TypeToken) -> String {
        match self.node(token) {
            TypeNode::Void => "void".to_string(),
            TypeNode::Bool => "bool".to_string(),
            TypeNode::Int { width, signed: true } => format!("int{}", width),
            TypeNode::Int { width, signed: false } => format!("uint{}", width),
            TypeNode::Float { width } => format!("float{}", width),
            TypeNode::Vector { elem, lanes } => format!("{}x{}", self.describe(*elem), lanes),
            TypeNode::Pointer { pointee, .. } => format!("{}*", self.describe(*pointee)),
            TypeNode::Function { .. } => "function".to_string(),
        }
    }

    /// Nodes with their ids, in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = (&TypeNode, ResultId)> {
        self.nodes.iter().map(|(node, id)| (node, *id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> (TypeCatalog, IdAllocator) {
        (TypeCatalog::new(), IdAllocator::new())
    }

    #[test]
    fn test_same_descriptor_resolves_to_same_id() {
        let (mut types, mut ids) = catalog();
        let desc = TypeDesc::Scalar(ScalarDesc::I32);
        let a = types.resolve(&desc, StorageClass::Function, &mut ids).unwrap();
        let b = types.resolve(&desc, StorageClass::Function, &mut ids).unwrap();
        assert_eq!(a, b);
        assert_eq!(types.id(a), types.id(b));
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn test_distinct_descriptors_resolve_to_distinct_ids() {
        let (mut types, mut ids) = catalog();
        let a = types
            .resolve(&TypeDesc::Scalar(ScalarDesc::I32), StorageClass::Function, &mut ids)
            .unwrap();
        let b = types
            .resolve(&TypeDesc::Scalar(ScalarDesc::I64), StorageClass::Function, &mut ids)
            .unwrap();
        assert_ne!(a, b);
        assert_ne!(types.id(a), types.id(b));
    }

    #[test]
    fn test_nested_composite_dedup() {
        let (mut types, mut ids) = catalog();
        let desc = TypeDesc::Array(Box::new(TypeDesc::Vector {
            elem: ScalarDesc::I32,
            lanes: 4,
        }));
        let a = types
            .resolve(&desc, StorageClass::CrossWorkgroup, &mut ids)
            .unwrap();
        let b = types
            .resolve(&desc, StorageClass::CrossWorkgroup, &mut ids)
            .unwrap();
        assert_eq!(a, b);
        // scalar + vector + pointer, each interned once
        assert_eq!(types.len(), 3);
    }

    #[test]
    fn test_pointer_storage_class_distinguishes_types() {
        let (mut types, mut ids) = catalog();
        let desc = TypeDesc::Array(Box::new(TypeDesc::Scalar(ScalarDesc::I32)));
        let global = types
            .resolve(&desc, StorageClass::CrossWorkgroup, &mut ids)
            .unwrap();
        let local = types.resolve(&desc, StorageClass::Function, &mut ids).unwrap();
        assert_ne!(global, local);
    }

    #[test]
    fn test_function_type_composition() {
        let (mut types, mut ids) = catalog();
        let void = types.void(&mut ids);
        let i32_t = types.scalar(ScalarDesc::I32, &mut ids);
        let a = types.function(void, vec![i32_t, i32_t], &mut ids);
        let b = types.function(void, vec![i32_t, i32_t], &mut ids);
        let c = types.function(void, vec![i32_t], &mut ids);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unsupported_vector_width() {
        let (mut types, mut ids) = catalog();
        let err = types
            .resolve(
                &TypeDesc::Vector { elem: ScalarDesc::I16, lanes: 5 },
                StorageClass::Function,
                &mut ids,
            )
            .unwrap_err();
        assert!(err.to_string().contains("int16x5"), "got: {}", err);
    }

    #[test]
    fn test_array_of_array_is_unsupported() {
        let (mut types, mut ids) = catalog();
        let desc = TypeDesc::Array(Box::new(TypeDesc::Array(Box::new(TypeDesc::Scalar(
            ScalarDesc::I32,
        )))));
        assert!(types
            .resolve(&desc, StorageClass::Function, &mut ids)
            .is_err());
    }

    #[test]
    fn test_native_int_resolves_to_int64() {
        let (mut types, mut ids) = catalog();
        let a = types.scalar(ScalarDesc::NativeInt, &mut ids);
        let b = types.scalar(ScalarDesc::I64, &mut ids);
        assert_eq!(a, b);
    }
}
