//! Terminal values of a record.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::tensor::Tensor;
use crate::utils::error::{FrameError, Result};

/// Element type of a terminal, as seen by matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// Encoded byte string (e.g. a JPEG payload)
    Bytes,
    /// Unsigned 8-bit tensor
    Uint8,
    /// 32-bit float tensor
    Float32,
    /// Integer scalar
    Int64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Bytes => write!(f, "bytes"),
            DType::Uint8 => write!(f, "uint8"),
            DType::Float32 => write!(f, "float32"),
            DType::Int64 => write!(f, "int64"),
        }
    }
}

/// A terminal value: anything in a record that is not a nested mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Bytes(Arc<[u8]>),
    Uint8(Tensor<u8>),
    Float32(Tensor<f32>),
    Int(i64),
}

impl Leaf {
    pub fn bytes(payload: impl Into<Vec<u8>>) -> Self {
        Leaf::Bytes(payload.into().into())
    }

    pub fn dtype(&self) -> DType {
        match self {
            Leaf::Bytes(_) => DType::Bytes,
            Leaf::Uint8(_) => DType::Uint8,
            Leaf::Float32(_) => DType::Float32,
            Leaf::Int(_) => DType::Int64,
        }
    }

    /// Shape of tensor terminals; scalars report an empty shape
    pub fn shape(&self) -> &[usize] {
        match self {
            Leaf::Uint8(t) => t.shape(),
            Leaf::Float32(t) => t.shape(),
            Leaf::Bytes(_) | Leaf::Int(_) => &[],
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Leaf::Bytes(b) => Ok(b),
            other => Err(unexpected(DType::Bytes, other)),
        }
    }

    pub fn as_uint8(&self) -> Result<&Tensor<u8>> {
        match self {
            Leaf::Uint8(t) => Ok(t),
            other => Err(unexpected(DType::Uint8, other)),
        }
    }

    pub fn as_float32(&self) -> Result<&Tensor<f32>> {
        match self {
            Leaf::Float32(t) => Ok(t),
            other => Err(unexpected(DType::Float32, other)),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Leaf::Int(v) => Ok(*v),
            other => Err(unexpected(DType::Int64, other)),
        }
    }

    /// Whether both leaves hold the same value and, for tensors and bytes, the same storage
    pub fn is_same(&self, other: &Leaf) -> bool {
        match (self, other) {
            (Leaf::Bytes(a), Leaf::Bytes(b)) => Arc::ptr_eq(a, b),
            (Leaf::Uint8(a), Leaf::Uint8(b)) => a.shares_storage(b),
            (Leaf::Float32(a), Leaf::Float32(b)) => a.shares_storage(b),
            (Leaf::Int(a), Leaf::Int(b)) => a == b,
            _ => false,
        }
    }
}

fn unexpected(expected: DType, found: &Leaf) -> FrameError {
    FrameError::InvalidTensor(format!(
        "expected a {} terminal, found {}",
        expected,
        found.dtype()
    ))
}

impl From<Tensor<u8>> for Leaf {
    fn from(t: Tensor<u8>) -> Self {
        Leaf::Uint8(t)
    }
}

impl From<Tensor<f32>> for Leaf {
    fn from(t: Tensor<f32>) -> Self {
        Leaf::Float32(t)
    }
}

impl From<i64> for Leaf {
    fn from(v: i64) -> Self {
        Leaf::Int(v)
    }
}
