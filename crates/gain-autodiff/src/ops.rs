//! Differentiable operations on dense matrices.
//!
//! Each operation is a small struct implementing [`Op`]. The forward pass
//! maps input values to an output value; the backward pass maps the
//! upstream gradient to one gradient per input, with the same shape as that
//! input. Only the operations needed by the imputation networks and their
//! losses are provided.

use crate::graph::Tensor;
use nalgebra::DMatrix;
use std::fmt::Debug;

/// A node-producing operation.
pub trait Op: Debug {
    /// Output value from the input values.
    fn forward(&self, inputs: &[Tensor]) -> Tensor;

    /// Gradients with respect to each input.
    ///
    /// `output` is the value produced by [`Op::forward`] on `inputs`, so
    /// activations can reuse it instead of recomputing.
    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], output: &Tensor) -> Vec<Tensor>;

    /// Display name.
    fn name(&self) -> &str;
}

fn unary<'a>(op: &str, inputs: &'a [Tensor]) -> &'a Tensor {
    match inputs {
        [a] => a,
        _ => panic!("{} takes 1 input, got {}", op, inputs.len()),
    }
}

fn binary<'a>(op: &str, inputs: &'a [Tensor]) -> (&'a Tensor, &'a Tensor) {
    match inputs {
        [a, b] => (a, b),
        _ => panic!("{} takes 2 inputs, got {}", op, inputs.len()),
    }
}

/// `a + b` for equal shapes.
#[derive(Debug, Clone, Copy)]
pub struct Add;

impl Op for Add {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        let (a, b) = binary(self.name(), inputs);
        a + b
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.clone(); 2]
    }

    fn name(&self) -> &str {
        "Add"
    }
}

/// `a - b` for equal shapes.
#[derive(Debug, Clone, Copy)]
pub struct Subtract;

impl Op for Subtract {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        let (a, b) = binary(self.name(), inputs);
        a - b
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.clone(), -grad_output]
    }

    fn name(&self) -> &str {
        "Subtract"
    }
}

/// Hadamard product `a ⊙ b`.
#[derive(Debug, Clone, Copy)]
pub struct Multiply;

impl Op for Multiply {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        let (a, b) = binary(self.name(), inputs);
        a.component_mul(b)
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        let (a, b) = binary(self.name(), inputs);
        vec![grad_output.component_mul(b), grad_output.component_mul(a)]
    }

    fn name(&self) -> &str {
        "Multiply"
    }
}

/// Matrix product `a b`.
#[derive(Debug, Clone, Copy)]
pub struct MatMul;

impl Op for MatMul {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        let (a, b) = binary(self.name(), inputs);
        a * b
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        let (a, b) = binary(self.name(), inputs);
        vec![grad_output * b.transpose(), a.transpose() * grad_output]
    }

    fn name(&self) -> &str {
        "MatMul"
    }
}

/// `aᵀ`.
#[derive(Debug, Clone, Copy)]
pub struct Transpose;

impl Op for Transpose {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs).transpose()
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.transpose()]
    }

    fn name(&self) -> &str {
        "Transpose"
    }
}

/// Sum of every entry, as a 1x1 tensor.
#[derive(Debug, Clone, Copy)]
pub struct Sum;

impl Op for Sum {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        Tensor::from_element(1, 1, unary(self.name(), inputs).sum())
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        let (rows, cols) = unary(self.name(), inputs).shape();
        vec![Tensor::from_element(rows, cols, grad_output[(0, 0)])]
    }

    fn name(&self) -> &str {
        "Sum"
    }
}

/// Mean of every entry, as a 1x1 tensor.
#[derive(Debug, Clone, Copy)]
pub struct Mean;

impl Op for Mean {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        Tensor::from_element(1, 1, unary(self.name(), inputs).mean())
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        let a = unary(self.name(), inputs);
        let share = grad_output[(0, 0)] / a.len() as f64;
        vec![Tensor::from_element(a.nrows(), a.ncols(), share)]
    }

    fn name(&self) -> &str {
        "Mean"
    }
}

/// `-a`.
#[derive(Debug, Clone, Copy)]
pub struct Negate;

impl Op for Negate {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        -unary(self.name(), inputs)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![-grad_output]
    }

    fn name(&self) -> &str {
        "Negate"
    }
}

/// `a + c` for a constant `c`.
#[derive(Debug, Clone, Copy)]
pub struct AddScalar {
    /// Constant added to every entry
    pub value: f64,
}

impl Op for AddScalar {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs).add_scalar(self.value)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.clone()]
    }

    fn name(&self) -> &str {
        "AddScalar"
    }
}

/// `c a` for a constant `c`.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    /// Constant multiplier
    pub factor: f64,
}

impl Op for Scale {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs) * self.factor
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![grad_output * self.factor]
    }

    fn name(&self) -> &str {
        "Scale"
    }
}

/// Entry-wise `a^p` for a constant exponent `p`.
#[derive(Debug, Clone, Copy)]
pub struct Pow {
    /// Exponent `p`
    pub exponent: f64,
}

impl Pow {
    fn apply(&self, x: f64) -> f64 {
        if self.exponent == 2.0 {
            x * x
        } else {
            x.powf(self.exponent)
        }
    }
}

impl Op for Pow {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs).map(|x| self.apply(x))
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        let p = self.exponent;
        let a = unary(self.name(), inputs);
        vec![grad_output.zip_map(a, |g, x| g * p * x.powf(p - 1.0))]
    }

    fn name(&self) -> &str {
        "Pow"
    }
}

/// Entry-wise natural logarithm.
#[derive(Debug, Clone, Copy)]
pub struct Log;

impl Op for Log {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs).map(f64::ln)
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.component_div(unary(self.name(), inputs))]
    }

    fn name(&self) -> &str {
        "Log"
    }
}

/// Exponential linear unit with unit scale: `x` for `x > 0`, `eˣ - 1` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct Elu;

impl Op for Elu {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs).map(|x| if x > 0.0 { x } else { x.exp_m1() })
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], output: &Tensor) -> Vec<Tensor> {
        // slope is 1 on the positive side and elu(x) + 1 = eˣ on the other
        let slope = unary(self.name(), inputs).zip_map(output, |x, y| if x > 0.0 { 1.0 } else { y + 1.0 });
        vec![grad_output.component_mul(&slope)]
    }

    fn name(&self) -> &str {
        "Elu"
    }
}

/// Entry-wise logistic function.
#[derive(Debug, Clone, Copy)]
pub struct Sigmoid;

impl Op for Sigmoid {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        unary(self.name(), inputs).map(sigmoid)
    }

    fn backward(&self, grad_output: &Tensor, _inputs: &[Tensor], output: &Tensor) -> Vec<Tensor> {
        vec![grad_output.zip_map(output, |g, s| g * s * (1.0 - s))]
    }

    fn name(&self) -> &str {
        "Sigmoid"
    }
}

/// Logistic function that does not overflow for large `|x|`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Column-wise concatenation `[a | b]`; both inputs need the same row count.
#[derive(Debug, Clone, Copy)]
pub struct ConcatColumns;

impl Op for ConcatColumns {
    fn forward(&self, inputs: &[Tensor]) -> Tensor {
        let (a, b) = binary(self.name(), inputs);
        assert_eq!(a.nrows(), b.nrows(), "ConcatColumns needs equal row counts");
        let split = a.ncols();
        DMatrix::from_fn(a.nrows(), split + b.ncols(), |i, j| {
            if j < split {
                a[(i, j)]
            } else {
                b[(i, j - split)]
            }
        })
    }

    fn backward(&self, grad_output: &Tensor, inputs: &[Tensor], _output: &Tensor) -> Vec<Tensor> {
        let (a, b) = binary(self.name(), inputs);
        vec![
            grad_output.columns(0, a.ncols()).into_owned(),
            grad_output.columns(a.ncols(), b.ncols()).into_owned(),
        ]
    }

    fn name(&self) -> &str {
        "ConcatColumns"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(values: &[f64]) -> Tensor {
        Tensor::from_row_slice(1, values.len(), values)
    }

    #[test]
    fn test_elementwise_binary_ops() {
        let a = row(&[5.0, 2.0]);
        let b = row(&[2.0, 3.0]);
        assert_eq!(Add.forward(&[a.clone(), b.clone()]), row(&[7.0, 5.0]));
        assert_eq!(Subtract.forward(&[a.clone(), b.clone()]), row(&[3.0, -1.0]));
        assert_eq!(Multiply.forward(&[a.clone(), b.clone()]), row(&[10.0, 6.0]));

        let ones = row(&[1.0, 1.0]);
        let out = Multiply.forward(&[a.clone(), b.clone()]);
        let grads = Multiply.backward(&ones, &[a.clone(), b.clone()], &out);
        assert_eq!(grads, vec![b.clone(), a.clone()]);

        let grads = Subtract.backward(&ones, &[a, b], &out);
        assert_eq!(grads[1], row(&[-1.0, -1.0]));
    }

    #[test]
    fn test_matmul_forward_backward() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = DMatrix::from_row_slice(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let out = MatMul.forward(&[a.clone(), b.clone()]);
        assert_eq!(out.shape(), (2, 2));
        assert_eq!(out[(0, 0)], 58.0);

        let grads = MatMul.backward(&Tensor::from_element(2, 2, 1.0), &[a.clone(), b.clone()], &out);
        assert_eq!(grads[0].shape(), a.shape());
        assert_eq!(grads[1].shape(), b.shape());
        // row sums of b
        assert_eq!(grads[0][(1, 2)], 23.0);
    }

    #[test]
    fn test_transpose() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let out = Transpose.forward(&[a]);
        assert_eq!(out.shape(), (3, 2));
        assert_eq!(out[(0, 1)], 4.0);
    }

    #[test]
    fn test_reductions() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(Sum.forward(&[a.clone()])[(0, 0)], 10.0);

        let mean = Mean.forward(&[a.clone()]);
        assert_eq!(mean[(0, 0)], 2.5);
        let grads = Mean.backward(&Tensor::from_element(1, 1, 2.0), &[a], &mean);
        assert_eq!(grads[0], Tensor::from_element(2, 2, 0.5));
    }

    #[test]
    fn test_scalar_ops() {
        let a = row(&[1.0, -2.0]);
        assert_eq!(AddScalar { value: 0.5 }.forward(&[a.clone()]), row(&[1.5, -1.5]));
        assert_eq!(Negate.forward(&[a.clone()]), row(&[-1.0, 2.0]));

        let scaled = Scale { factor: 3.0 }.forward(&[a.clone()]);
        assert_eq!(scaled, row(&[3.0, -6.0]));
        let grads = Scale { factor: 3.0 }.backward(&row(&[1.0, 1.0]), &[a], &scaled);
        assert_eq!(grads[0], row(&[3.0, 3.0]));
    }

    #[test]
    fn test_pow_square() {
        let a = row(&[3.0, -2.0]);
        let out = Pow { exponent: 2.0 }.forward(&[a.clone()]);
        assert_eq!(out, row(&[9.0, 4.0]));
        let grads = Pow { exponent: 2.0 }.backward(&row(&[1.0, 1.0]), &[a], &out);
        assert_relative_eq!(grads[0][(0, 0)], 6.0, epsilon = 1e-12);
        assert_relative_eq!(grads[0][(0, 1)], -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_backward() {
        let a = row(&[2.0, 0.5]);
        let out = Log.forward(&[a.clone()]);
        assert_relative_eq!(out[(0, 0)], 2.0_f64.ln(), epsilon = 1e-12);
        let grads = Log.backward(&row(&[1.0, 1.0]), &[a], &out);
        assert_eq!(grads[0], row(&[0.5, 2.0]));
    }

    #[test]
    fn test_elu_forward_backward() {
        let a = row(&[-1.0, 0.0, 2.0]);
        let out = Elu.forward(&[a.clone()]);
        assert_relative_eq!(out[(0, 0)], (-1.0_f64).exp() - 1.0, epsilon = 1e-12);
        assert_eq!(out[(0, 1)], 0.0);
        assert_eq!(out[(0, 2)], 2.0);

        let grads = Elu.backward(&row(&[1.0, 1.0, 1.0]), &[a], &out);
        assert_relative_eq!(grads[0][(0, 0)], (-1.0_f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(grads[0][(0, 1)], 1.0, epsilon = 1e-12);
        assert_eq!(grads[0][(0, 2)], 1.0);
    }

    #[test]
    fn test_sigmoid_is_stable() {
        let out = Sigmoid.forward(&[row(&[0.0, 1.0, -1.0, -800.0, 800.0])]);
        assert_relative_eq!(out[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(out[(0, 1)] + out[(0, 2)], 1.0, epsilon = 1e-12);
        assert_eq!(out[(0, 3)], 0.0);
        assert_eq!(out[(0, 4)], 1.0);

        let grads = Sigmoid.backward(&row(&[1.0]), &[row(&[0.0])], &row(&[0.5]));
        assert_relative_eq!(grads[0][(0, 0)], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_concat_columns() {
        let a = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let b = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 5.0, 6.0]);
        let out = ConcatColumns.forward(&[a.clone(), b.clone()]);
        assert_eq!(out, DMatrix::from_row_slice(2, 3, &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]));

        let grad_output = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let grads = ConcatColumns.backward(&grad_output, &[a, b], &out);
        assert_eq!(grads[0], DMatrix::from_row_slice(2, 1, &[1.0, 4.0]));
        assert_eq!(grads[1], DMatrix::from_row_slice(2, 2, &[2.0, 3.0, 5.0, 6.0]));
    }

    #[test]
    #[should_panic(expected = "takes 2 inputs")]
    fn test_arity_is_checked() {
        Add.forward(&[row(&[1.0])]);
    }
}
