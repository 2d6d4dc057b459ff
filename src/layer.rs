use crate::activator::Activator;
use crate::connection::Connection;
use crate::error::{check_dim, Error, Result};
use crate::error_function::ErrorFunction;
use crate::matrix::Mat;

/// A group of units sharing one activation function and one bias vector.
///
/// Net inputs and activations are stored as `batch x size` matrices, one row
/// per pattern in the batch currently being processed.
#[derive(Debug)]
pub struct Layer {
    size: usize,
    max_batch_size: usize,
    /// The activation function to be used for every unit in the layer.
    activator: Activator,
    bias: Vec<f64>,
    net_input: Mat,
    activation: Mat,
    /// Indices into the owning network's connection list.
    incoming: Vec<usize>,
    outgoing: Vec<usize>,
}

impl Layer {
    /// Creates a layer of `size` units able to hold up to `max_batch_size`
    /// patterns at once. Biases start at zero.
    pub fn new(size: usize, max_batch_size: usize, activator: Activator) -> Self {
        let mut net_input = Mat::zeros(max_batch_size, size);
        let mut activation = Mat::zeros(max_batch_size, size);
        // reserve the full batch, then start empty until the first pass
        net_input.resize_rows(0);
        activation.resize_rows(0);
        Layer {
            size,
            max_batch_size,
            activator,
            bias: vec![0.0; size],
            net_input,
            activation,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Number of units.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Number of patterns in the most recent pass.
    pub fn batch_size(&self) -> usize {
        self.activation.rows()
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn set_activator(&mut self, activator: Activator) {
        self.activator = activator;
    }

    pub fn bias(&self) -> &[f64] {
        &self.bias
    }

    pub(crate) fn bias_mut(&mut self) -> &mut [f64] {
        &mut self.bias
    }

    pub fn net_input(&self) -> &Mat {
        &self.net_input
    }

    pub fn activation(&self) -> &Mat {
        &self.activation
    }

    /// Connections feeding into this layer.
    pub fn incoming(&self) -> &[usize] {
        &self.incoming
    }

    /// Connections leaving this layer.
    pub fn outgoing(&self) -> &[usize] {
        &self.outgoing
    }

    pub(crate) fn add_incoming(&mut self, connection: usize) {
        self.incoming.push(connection);
    }

    pub(crate) fn add_outgoing(&mut self, connection: usize) {
        self.outgoing.push(connection);
    }

    fn check_batch(&self, rows: usize) -> Result<()> {
        if rows > self.max_batch_size {
            return Err(Error::BatchTooLarge {
                rows,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Injects a batch of encoded patterns directly, as done for the input
    /// layer. The net input is set to the same values.
    pub fn set_activation(&mut self, batch: &Mat) -> Result<()> {
        check_dim("Layer::set_activation cols", self.size, batch.cols())?;
        self.check_batch(batch.rows())?;
        self.activation.copy_from(batch)?;
        self.net_input.copy_from(batch)?;
        Ok(())
    }

    /// Computes `activation = f(bias + sum(from_activation * weights^T))`
    /// for a batch of `rows` patterns, given every incoming connection paired
    /// with its source layer's activation.
    pub fn compute_activation(
        &mut self,
        rows: usize,
        sources: &[(&Mat, &Connection)],
    ) -> Result<()> {
        self.check_batch(rows)?;
        self.net_input.resize_rows(rows);
        for row in 0..rows {
            self.net_input.row_mut(row).copy_from_slice(&self.bias);
        }
        for &(from_activation, connection) in sources {
            connection.accumulate_net_input(from_activation, &mut self.net_input)?;
        }
        self.activation.resize_rows(rows);
        self.activator.apply(&self.net_input, &mut self.activation)
    }

    /// Sums `error_fn` over every unit of every pattern in the batch.
    pub fn total_error(&self, target: &Mat, error_fn: ErrorFunction) -> Result<f64> {
        check_dim("Layer::total_error rows", self.activation.rows(), target.rows())?;
        check_dim("Layer::total_error cols", self.activation.cols(), target.cols())?;
        Ok(self
            .activation
            .as_slice()
            .iter()
            .zip(target.as_slice())
            .map(|(&a, &t)| error_fn.e(a, t))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_from_bias_and_sources() {
        let mut layer = Layer::new(2, 4, Activator::Linear(1.0));
        layer.bias_mut().copy_from_slice(&[0.5, -1.0]);

        let from = Mat::from_rows(&[[1.0, 2.0, 3.0], [0.0, 1.0, 0.0]]).unwrap();
        let mut connection = Connection::new(0, 1, 3, 2);
        connection
            .set_weights(Mat::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 1.0]]).unwrap())
            .unwrap();
        layer.compute_activation(2, &[(&from, &connection)]).unwrap();

        assert_eq!(layer.batch_size(), 2);
        assert_eq!(layer.activation().as_slice(), &[1.5, 4.0, 0.5, 0.0]);
        assert_eq!(layer.net_input(), layer.activation());
    }

    #[test]
    fn rejects_oversized_batch() {
        let mut layer = Layer::new(1, 2, Activator::TanH);
        let batch = Mat::zeros(3, 1);
        assert_eq!(
            layer.set_activation(&batch),
            Err(Error::BatchTooLarge { rows: 3, max: 2 })
        );
        assert!(layer.set_activation(&Mat::zeros(2, 2)).is_err());
        assert!(layer.set_activation(&Mat::zeros(2, 1)).is_ok());
    }

    #[test]
    fn total_error_sums_all_entries() {
        let mut layer = Layer::new(2, 2, Activator::Linear(1.0));
        layer
            .set_activation(&Mat::from_rows(&[[1.0, 0.0], [0.0, 2.0]]).unwrap())
            .unwrap();
        let target = Mat::zeros(2, 2);
        let error = layer
            .total_error(&target, ErrorFunction::SquaredError)
            .unwrap();
        assert_eq!(error, 2.5);
        assert!(layer
            .total_error(&Mat::zeros(1, 2), ErrorFunction::SquaredError)
            .is_err());
    }
}
