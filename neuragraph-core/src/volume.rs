// src/volume.rs
use crate::error::NeuraGraphError;
use std::ops::{Index, IndexMut};

/// Dense 3-dimensional array of `f32` values stored in row-major order.
///
/// The three dimensions are called depth, width and height, in that order.
/// Element `(d, w, h)` lives at offset `(d * width + w) * height + h`.
///
/// A `Volume` is the storage behind both halves (value and gradient) of a
/// [`TensorBlock`](crate::block::TensorBlock).
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl Volume {
    /// Creates a zero-filled volume of the given shape.
    pub fn zeros(depth: usize, width: usize, height: usize) -> Self {
        Volume::filled([depth, width, height], 0.0)
    }

    /// Creates a volume of the given shape with every element set to `value`.
    pub fn filled(shape: [usize; 3], value: f32) -> Self {
        let numel = shape.iter().product();
        Volume {
            shape,
            data: vec![value; numel],
        }
    }

    /// Creates a zero-filled volume with the same shape as `other`.
    pub fn zeros_like(other: &Volume) -> Self {
        Volume::filled(other.shape, 0.0)
    }

    /// Creates a volume from row-major data.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if `data.len()` does not match the
    /// number of elements described by `shape`.
    pub fn from_vec(shape: [usize; 3], data: Vec<f32>) -> Result<Self, NeuraGraphError> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(NeuraGraphError::dimension(
                "Volume::from_vec",
                &[numel],
                &[data.len()],
            ));
        }
        Ok(Volume { shape, data })
    }

    /// Returns the `[depth, width, height]` shape.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn depth(&self) -> usize {
        self.shape[0]
    }

    pub fn width(&self) -> usize {
        self.shape[1]
    }

    pub fn height(&self) -> usize {
        self.shape[2]
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear offset of element `(d, w, h)`.
    #[inline]
    pub fn offset(&self, d: usize, w: usize, h: usize) -> usize {
        debug_assert!(
            d < self.shape[0] && w < self.shape[1] && h < self.shape[2],
            "index ({}, {}, {}) out of bounds for shape {:?}",
            d,
            w,
            h,
            self.shape
        );
        (d * self.shape[1] + w) * self.shape[2] + h
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f32> {
        self.data.iter()
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Copies the contents of `other` into `self`.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if the shapes differ.
    pub fn copy_from(&mut self, other: &Volume) -> Result<(), NeuraGraphError> {
        self.check_same_shape(other, "Volume::copy_from")?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Element-wise `self += alpha * other`.
    ///
    /// This is the single primitive behind gradient accumulation and the
    /// optimizer updates.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Dimension` if the shapes differ.
    pub fn scaled_add(&mut self, alpha: f32, other: &Volume) -> Result<(), NeuraGraphError> {
        self.check_same_shape(other, "Volume::scaled_add")?;
        for (dst, src) in self.data.iter_mut().zip(other.data.iter()) {
            *dst += alpha * *src;
        }
        Ok(())
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for x in self.data.iter_mut() {
            *x *= factor;
        }
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    fn check_same_shape(&self, other: &Volume, operation: &str) -> Result<(), NeuraGraphError> {
        if self.shape != other.shape {
            return Err(NeuraGraphError::dimension(
                operation,
                &self.shape,
                &other.shape,
            ));
        }
        Ok(())
    }
}

impl Index<(usize, usize, usize)> for Volume {
    type Output = f32;

    fn index(&self, (d, w, h): (usize, usize, usize)) -> &f32 {
        &self.data[self.offset(d, w, h)]
    }
}

impl IndexMut<(usize, usize, usize)> for Volume {
    fn index_mut(&mut self, (d, w, h): (usize, usize, usize)) -> &mut f32 {
        let offset = self.offset(d, w, h);
        &mut self.data[offset]
    }
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod tests;
