//! A layered [feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network).
//!
//! Layers and connections live in two arenas owned by the `Network`; each
//! connection names its endpoints by layer index, and each layer lists the
//! indices of its incoming and outgoing connections. Connections always run
//! from a lower layer index to a higher one, so construction order is a
//! topological order.

use crate::activator::Activator;
use crate::connection::Connection;
use crate::error::{check_dim, Error, Result};
use crate::error_function::ErrorFunction;
use crate::layer::Layer;
use crate::matrix::Mat;
use crate::observer::Observer;

use itertools::Itertools;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle returned by `Network::attach`, used to detach the observer later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

pub struct Network {
    layers: Vec<Layer>,
    connections: Vec<Connection>,
    error_function: ErrorFunction,
    max_batch_size: usize,
    epoch: usize,
    last_error: f64,
    epoch_error: f64,
    observers: Vec<(ObserverId, Rc<RefCell<dyn Observer>>)>,
    next_observer: usize,
}

impl Network {
    /// Creates a new, untrained neural network chaining each layer to the
    /// next.
    ///
    /// Arguments:
    ///  * `layer_sizes` - the number of units in each layer, input first.
    ///                    Needs at least an input and an output layer.
    ///  * `max_batch_size` - the most patterns a single forward pass takes.
    ///  * `hidden` - the activation function of every hidden layer.
    ///  * `output` - the activation function of the output layer.
    ///  * `error_function` - the loss scored at the output layer.
    pub fn new(
        layer_sizes: &[usize],
        max_batch_size: usize,
        hidden: Activator,
        output: Activator,
        error_function: ErrorFunction,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(Error::InvalidTopology(format!(
                "need at least 2 layers, got {}",
                layer_sizes.len()
            )));
        }
        let mut network = Network::empty(max_batch_size, error_function)?;
        let last = layer_sizes.len() - 1;
        for (i, &size) in layer_sizes.iter().enumerate() {
            let activator = match i {
                0 => Activator::Linear(1.0),
                i if i == last => output,
                _ => hidden,
            };
            network.add_layer(size, activator)?;
        }
        network.add_default_connections();
        Ok(network)
    }

    /// Creates a network with no layers, to be assembled with `add_layer` and
    /// `add_connection`.
    pub fn empty(max_batch_size: usize, error_function: ErrorFunction) -> Result<Self> {
        if max_batch_size == 0 {
            return Err(Error::InvalidParameter(
                "maximum batch size must be positive".into(),
            ));
        }
        Ok(Network {
            layers: Vec::new(),
            connections: Vec::new(),
            error_function,
            max_batch_size,
            epoch: 0,
            last_error: 0.0,
            epoch_error: 0.0,
            observers: Vec::new(),
            next_observer: 0,
        })
    }

    /// Appends a layer and returns its index. The first layer added is the
    /// input layer; the last is the output layer.
    pub fn add_layer(&mut self, size: usize, activator: Activator) -> Result<usize> {
        if size == 0 {
            return Err(Error::InvalidTopology("layers must have units".into()));
        }
        self.layers
            .push(Layer::new(size, self.max_batch_size, activator));
        Ok(self.layers.len() - 1)
    }

    /// Connects layer `from` into layer `to` and returns the connection
    /// index. Only forward edges (`from < to`) are allowed, and each pair of
    /// layers may be connected once.
    pub fn add_connection(&mut self, from: usize, to: usize) -> Result<usize> {
        if to >= self.layers.len() {
            return Err(Error::InvalidTopology(format!("no layer {}", to)));
        }
        if from >= to {
            return Err(Error::InvalidTopology(format!(
                "connection {} -> {} does not feed forward",
                from, to
            )));
        }
        if self.is_connected(from, to) {
            return Err(Error::InvalidTopology(format!(
                "layers {} and {} are already connected",
                from, to
            )));
        }
        Ok(self.connect(from, to))
    }

    /// Appends the connection `from -> to` without checking it.
    fn connect(&mut self, from: usize, to: usize) -> usize {
        let index = self.connections.len();
        self.connections.push(Connection::new(
            from,
            to,
            self.layers[from].size(),
            self.layers[to].size(),
        ));
        self.layers[from].add_outgoing(index);
        self.layers[to].add_incoming(index);
        index
    }

    /// Connects every layer to the next one, skipping pairs that are already
    /// connected. Returns the total number of connections.
    pub fn add_default_connections(&mut self) -> usize {
        for (from, to) in (0..self.layers.len()).tuple_windows() {
            if !self.is_connected(from, to) {
                self.connect(from, to);
            }
        }
        self.connections.len()
    }

    fn is_connected(&self, from: usize, to: usize) -> bool {
        self.connections
            .iter()
            .any(|c| c.from() == from && c.to() == to)
    }

    /// Feeds a batch of encoded input rows through the network, returning
    /// the output layer's activation.
    pub fn feed_forward(&mut self, input: &Mat) -> Result<&Mat> {
        let (input_layer, _) = self
            .layers
            .split_first_mut()
            .ok_or_else(|| Error::InvalidTopology("network has no layers".into()))?;
        input_layer.set_activation(input)?;
        let rows = input.rows();
        for l in 1..self.layers.len() {
            self.compute_layer(l, rows)?;
        }
        Ok(self.output())
    }

    fn compute_layer(&mut self, l: usize, rows: usize) -> Result<()> {
        let (before, after) = self.layers.split_at_mut(l);
        let layer = &mut after[0];
        let connections = &self.connections;
        let sources: Vec<(&Mat, &Connection)> = layer
            .incoming()
            .iter()
            .map(|&c| {
                let connection = &connections[c];
                (before[connection.from()].activation(), connection)
            })
            .collect();
        layer.compute_activation(rows, &sources)
    }

    /// Runs a single pattern through the network.
    pub fn run(&mut self, pattern: &[f64]) -> Result<Vec<f64>> {
        check_dim("Network::run", self.input_len(), pattern.len())?;
        let input = Mat::from_vec(1, pattern.len(), pattern.to_vec())?;
        let output = self.feed_forward(&input)?;
        Ok(output.row(0).to_vec())
    }

    /// Scores the output of the last forward pass against `target`, caching
    /// the result as `last_error`.
    pub fn total_error(&mut self, target: &Mat) -> Result<f64> {
        let output = self
            .layers
            .last()
            .ok_or_else(|| Error::InvalidTopology("network has no layers".into()))?;
        let error = output.total_error(target, self.error_function)?;
        self.last_error = error;
        Ok(error)
    }

    /// Subscribes `observer` to batch and epoch notifications.
    pub fn attach(&mut self, observer: Rc<RefCell<dyn Observer>>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    /// Unsubscribes an observer, returning whether it was attached.
    pub fn detach(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    pub fn notify_batch(&self) {
        for (_, observer) in &self.observers {
            observer.borrow_mut().on_batch_complete(self);
        }
    }

    pub fn notify_epoch(&self) {
        for (_, observer) in &self.observers {
            observer.borrow_mut().on_epoch_complete(self);
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Mutable access to every layer and connection at once, for trainers.
    pub(crate) fn parts_mut(&mut self) -> (&mut [Layer], &mut [Connection]) {
        (&mut self.layers, &mut self.connections)
    }

    /// Returns the size of the input layer, or zero for an empty network.
    pub fn input_len(&self) -> usize {
        self.layers.first().map_or(0, Layer::size)
    }

    /// Returns the size of the output layer, or zero for an empty network.
    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, Layer::size)
    }

    /// The output layer's activation from the last forward pass.
    ///
    /// Panics if the network has no layers.
    pub fn output(&self) -> &Mat {
        self.layers
            .last()
            .expect("network has no layers")
            .activation()
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn error_function(&self) -> ErrorFunction {
        self.error_function
    }

    pub fn set_error_function(&mut self, error_function: ErrorFunction) {
        self.error_function = error_function;
    }

    /// The epoch currently being (or last) trained, counting from 1.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// The error of the most recently scored batch.
    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    /// The error summed over the batches of the current epoch so far.
    pub fn epoch_error(&self) -> f64 {
        self.epoch_error
    }

    pub(crate) fn set_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
    }

    pub(crate) fn set_epoch_error(&mut self, error: f64) {
        self.epoch_error = error;
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("layers", &self.layers)
            .field("connections", &self.connections)
            .field("error_function", &self.error_function)
            .field("epoch", &self.epoch)
            .field("last_error", &self.last_error)
            .field("observers", &self.observers.len())
            .finish()
    }
}
