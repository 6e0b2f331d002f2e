//! Dense row-major tensors held by record terminals.

use std::sync::Arc;

use crate::utils::error::{FrameError, Result};

/// A dense, immutable, row-major tensor.
///
/// Storage is reference counted: cloning a tensor never copies its elements,
/// so a terminal left untouched by a transform shares storage with the input
/// record it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Vec<usize>,
    data: Arc<[T]>,
}

impl<T> Tensor<T> {
    /// Create a tensor, checking that `data` holds exactly `shape.product()` elements
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(FrameError::InvalidTensor(format!(
                "shape {:?} requires {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            shape,
            data: data.into(),
        })
    }

    /// Create a rank-0 tensor
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: Arc::from(vec![value]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether both tensors point at the same storage
    pub fn shares_storage(&self, other: &Tensor<T>) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Interpret the tensor as `[H, W, C]`
    pub fn hwc(&self) -> Result<(usize, usize, usize)> {
        match self.shape.as_slice() {
            &[h, w, c] => Ok((h, w, c)),
            other => Err(FrameError::InvalidTensor(format!(
                "expected an [H, W, C] image, got shape {:?}",
                other
            ))),
        }
    }
}

impl<T: Copy> Tensor<T> {
    /// Element-wise conversion into a tensor of the same shape
    pub fn map<U, F>(&self, f: F) -> Tensor<U>
    where
        F: Fn(T) -> U,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Copy of the elements
    pub fn to_vec(&self) -> Vec<T> {
        self.data.to_vec()
    }
}
