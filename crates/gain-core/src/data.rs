//! Data model and loader.
//!
//! The experiment consumes three arrays: the ground-truth 3-D tensor and
//! two auxiliary random arrays from which the observation mask is derived.
//! Arrays are stored as JSON documents of the form
//! `{"shape": [d0, d1, d2], "data": [...]}` with row-major data.
//!
//! Unfolding follows the column-major reshape convention: the mode axis is
//! moved to the front and the remaining axes are flattened with the earliest
//! axis varying fastest, so for mode 0 `mat[i, j + k * d1] = tensor[i, j, k]`.

use crate::error::{GainError, Result};
use crate::types::{Matrix, Shape3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Dense row-major 3-D array of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    shape: Shape3,
    data: Vec<f64>,
}

impl Tensor3 {
    /// Creates a tensor from a flat row-major buffer.
    pub fn from_vec(shape: Shape3, data: Vec<f64>) -> Result<Self> {
        let expected = element_count("tensor buffer", &shape)?;
        if data.len() != expected {
            return Err(GainError::shape_mismatch(
                "tensor buffer",
                format!("{} elements for shape {:?}", expected, shape),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: Shape3) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    /// Creates a tensor by evaluating `f(i, j, k)` at every index.
    pub fn from_fn<F>(shape: Shape3, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(shape.iter().product());
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for k in 0..shape[2] {
                    data.push(f(i, j, k));
                }
            }
        }
        Self { shape, data }
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> Shape3 {
        self.shape
    }

    /// Row-major data buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.shape[1] + j) * self.shape[2] + k
    }

    /// Element at `(i, j, k)`.
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.offset(i, j, k)]
    }

    /// Sets the element at `(i, j, k)`.
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let idx = self.offset(i, j, k);
        self.data[idx] = value;
    }

    /// Applies `f` element-wise, producing a new tensor.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            shape: self.shape,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Unfolds the tensor along `mode` into a matrix of shape
    /// `[shape[mode], product of the other two dimensions]`.
    pub fn unfold(&self, mode: usize) -> Result<Matrix> {
        let (rest_a, rest_b) = other_axes(mode)?;
        let dims = self.shape;
        let cols = dims[rest_a] * dims[rest_b];
        let mut mat = Matrix::zeros(dims[mode], cols);
        for i in 0..dims[0] {
            for j in 0..dims[1] {
                for k in 0..dims[2] {
                    let idx = [i, j, k];
                    let col = idx[rest_a] + idx[rest_b] * dims[rest_a];
                    mat[(idx[mode], col)] = self.get(i, j, k);
                }
            }
        }
        Ok(mat)
    }

    /// Inverse of [`Tensor3::unfold`].
    pub fn fold(mat: &Matrix, mode: usize, shape: Shape3) -> Result<Self> {
        let (rest_a, rest_b) = other_axes(mode)?;
        let expected = (shape[mode], shape[rest_a] * shape[rest_b]);
        if (mat.nrows(), mat.ncols()) != expected {
            return Err(GainError::shape_mismatch(
                format!("mode-{} fold", mode),
                format!("[{}, {}]", expected.0, expected.1),
                format!("[{}, {}]", mat.nrows(), mat.ncols()),
            ));
        }
        let mut tensor = Self::zeros(shape);
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for k in 0..shape[2] {
                    let idx = [i, j, k];
                    let col = idx[rest_a] + idx[rest_b] * shape[rest_a];
                    tensor.set(i, j, k, mat[(idx[mode], col)]);
                }
            }
        }
        Ok(tensor)
    }
}

/// Number of elements of an array of the given dimensions, rejecting
/// shapes whose size does not fit in `usize`.
fn element_count(context: &str, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            GainError::shape_mismatch(context, "an addressable element count", format!("{:?}", dims))
        })
}

fn other_axes(mode: usize) -> Result<(usize, usize)> {
    match mode {
        0 => Ok((1, 2)),
        1 => Ok((0, 2)),
        2 => Ok((0, 1)),
        _ => Err(GainError::invalid_configuration(
            "mode",
            mode,
            "a 3-D tensor only has modes 0, 1 and 2",
        )),
    }
}

/// On-disk representation of a dense array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayDocument {
    /// Array dimensions
    pub shape: Vec<usize>,
    /// Row-major values
    pub data: Vec<f64>,
}

impl ArrayDocument {
    /// Reads a document from a JSON file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GainError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| GainError::parse(path, e))
    }

    /// Writes the document to a JSON file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string(self).map_err(|e| GainError::parse(path, e))?;
        fs::write(path, text).map_err(|e| GainError::io(path, e))
    }

    /// Interprets the document as a 3-D tensor.
    pub fn into_tensor3(self) -> Result<Tensor3> {
        let shape: Shape3 = self.shape.as_slice().try_into().map_err(|_| {
            GainError::shape_mismatch("tensor document", "3 dimensions", format!("{:?}", self.shape))
        })?;
        Tensor3::from_vec(shape, self.data)
    }

    /// Interprets the document as a matrix.
    pub fn into_matrix(self) -> Result<Matrix> {
        let [rows, cols]: [usize; 2] = self.shape.as_slice().try_into().map_err(|_| {
            GainError::shape_mismatch("matrix document", "2 dimensions", format!("{:?}", self.shape))
        })?;
        let expected = element_count("matrix buffer", &[rows, cols])?;
        if self.data.len() != expected {
            return Err(GainError::shape_mismatch(
                "matrix buffer",
                format!("{} elements", expected),
                format!("{} elements", self.data.len()),
            ));
        }
        Ok(Matrix::from_row_slice(rows, cols, &self.data))
    }
}

impl From<&Tensor3> for ArrayDocument {
    fn from(tensor: &Tensor3) -> Self {
        Self {
            shape: tensor.shape.to_vec(),
            data: tensor.data.clone(),
        }
    }
}

impl From<&Matrix> for ArrayDocument {
    fn from(mat: &Matrix) -> Self {
        let data = (0..mat.nrows())
            .flat_map(|i| (0..mat.ncols()).map(move |j| (i, j)))
            .map(|(i, j)| mat[(i, j)])
            .collect();
        Self {
            shape: vec![mat.nrows(), mat.ncols()],
            data,
        }
    }
}

/// Rejects random draws outside `[0, 1)`, which would shift the effective
/// missing rate.
fn ensure_unit_interval<'a>(name: &str, values: impl Iterator<Item = &'a f64>) -> Result<()> {
    match values.copied().find(|x| !(0.0..1.0).contains(x)) {
        Some(bad) => Err(GainError::invalid_configuration(
            name,
            bad,
            "random inputs must lie in [0, 1)",
        )),
        None => Ok(()),
    }
}

/// Ground truth plus the random arrays the mask is derived from.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Ground-truth observations
    pub tensor: Tensor3,
    /// Uniform `[0, 1)` matrix of shape `[d0, d1]` (non-random missing)
    pub random_matrix: Matrix,
    /// Uniform `[0, 1)` tensor of the ground-truth shape (random missing)
    pub random_tensor: Tensor3,
}

impl Dataset {
    /// Builds a dataset, checking that the random inputs match the tensor.
    pub fn new(tensor: Tensor3, random_matrix: Matrix, random_tensor: Tensor3) -> Result<Self> {
        let [d0, d1, _] = tensor.shape();
        if (random_matrix.nrows(), random_matrix.ncols()) != (d0, d1) {
            return Err(GainError::shape_mismatch(
                "random matrix",
                format!("[{}, {}]", d0, d1),
                format!("[{}, {}]", random_matrix.nrows(), random_matrix.ncols()),
            ));
        }
        if random_tensor.shape() != tensor.shape() {
            return Err(GainError::shape_mismatch(
                "random tensor",
                format!("{:?}", tensor.shape()),
                format!("{:?}", random_tensor.shape()),
            ));
        }
        ensure_unit_interval("random_matrix", random_matrix.iter())?;
        ensure_unit_interval("random_tensor", random_tensor.as_slice().iter())?;
        Ok(Self {
            tensor,
            random_matrix,
            random_tensor,
        })
    }

    /// Loads the three arrays from JSON documents.
    pub fn load<P, Q, R>(tensor_path: P, random_matrix_path: Q, random_tensor_path: R) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let tensor = ArrayDocument::read(tensor_path)?.into_tensor3()?;
        let random_matrix = ArrayDocument::read(random_matrix_path)?.into_matrix()?;
        let random_tensor = ArrayDocument::read(random_tensor_path)?.into_tensor3()?;
        tracing::info!(shape = ?tensor.shape(), "loaded ground-truth tensor");
        Self::new(tensor, random_matrix, random_tensor)
    }

    /// Deterministic toy dataset: a smooth daily speed profile per location
    /// with seeded uniform random inputs.
    pub fn synthetic(shape: Shape3, seed: u64) -> Result<Self> {
        if shape.contains(&0) {
            return Err(GainError::invalid_configuration(
                "shape",
                format!("{:?}", shape),
                "all dimensions must be positive",
            ));
        }
        let period = shape[2] as f64;
        let tensor = Tensor3::from_fn(shape, |i, j, k| {
            let phase = 2.0 * std::f64::consts::PI * k as f64 / period;
            40.0 + 5.0 * i as f64 + 2.0 * ((j % 7) as f64) + 10.0 * phase.sin()
        });

        let mut rng = StdRng::seed_from_u64(seed);
        let random_matrix = Matrix::from_fn(shape[0], shape[1], |_, _| rng.gen::<f64>());
        let random_tensor = Tensor3::from_fn(shape, |_, _, _| rng.gen::<f64>());
        Self::new(tensor, random_matrix, random_tensor)
    }

    /// Mode-0 unfolding of the ground truth: `[d0, d1 * d2]`.
    pub fn matrix(&self) -> Result<Matrix> {
        self.tensor.unfold(0)
    }
}
