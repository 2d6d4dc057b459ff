use crate::error::{check_dim, Result};
use crate::matrix::Mat;

/// A dense set of weights carrying activations from one layer into the net
/// input of another.
///
/// Unit `j` of the source feeds unit `i` of the destination through
/// `weights[i][j]`, so the matrix is `to.size x from.size`.
#[derive(Debug)]
pub struct Connection {
    from: usize,
    to: usize,
    weights: Mat,
}

impl Connection {
    /// Creates a zero-weighted connection between the layers at indices
    /// `from` and `to`, sized `to_size x from_size`.
    pub fn new(from: usize, to: usize, from_size: usize, to_size: usize) -> Self {
        Connection {
            from,
            to,
            weights: Mat::zeros(to_size, from_size),
        }
    }

    /// Index of the source layer.
    pub fn from(&self) -> usize {
        self.from
    }

    /// Index of the destination layer.
    pub fn to(&self) -> usize {
        self.to
    }

    pub fn weights(&self) -> &Mat {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut Mat {
        &mut self.weights
    }

    /// Replaces every weight at once.
    pub fn set_weights(&mut self, weights: Mat) -> Result<()> {
        check_dim("Connection::set_weights rows", self.weights.rows(), weights.rows())?;
        check_dim("Connection::set_weights cols", self.weights.cols(), weights.cols())?;
        self.weights = weights;
        Ok(())
    }

    /// Adds this connection's share, `from_activation * weights^T`, into the
    /// destination's net input.
    pub fn accumulate_net_input(&self, from_activation: &Mat, net_input: &mut Mat) -> Result<()> {
        net_input.accumulate_product_transpose_right(from_activation, &self.weights)
    }

    /// Adds `to_delta * weights` into the source layer's delta.
    pub fn accumulate_net_delta(&self, to_delta: &Mat, from_delta: &mut Mat) -> Result<()> {
        from_delta.accumulate_product(1.0, to_delta, &self.weights)
    }
}
