//! Batched backpropagation with momentum, weight decay and optional
//! gradient normalization.

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::matrix::Mat;
use crate::network::Network;
use crate::utils::{split_low_mut, ZeroOut};

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Settings for a training run.
///
/// Missing fields take their default values when deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParameters {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    /// Caps each row of a weight gradient at unit norm before it is applied.
    pub normalize_gradient: bool,
    pub max_epochs: usize,
    /// Training stops as soon as an epoch's summed error drops below this.
    pub min_error: f64,
    /// Weights and biases start uniformly in `[-init_range, init_range]`.
    pub init_range: f64,
    /// Rescales initial weights with the Nguyen-Widrow heuristic.
    pub nguyen_widrow: bool,
    /// Wall-clock budget in seconds.
    pub max_duration: Option<f64>,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        TrainingParameters {
            learning_rate: 0.01,
            momentum: 0.9,
            weight_decay: 0.0,
            normalize_gradient: false,
            max_epochs: 150_000,
            min_error: 0.0,
            init_range: 0.2,
            nguyen_widrow: false,
            max_duration: None,
        }
    }
}

impl TrainingParameters {
    pub fn new() -> Self {
        TrainingParameters::default()
    }

    /// Sets the learning rate to use during gradient descent.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn weight_decay(mut self, decay: f64) -> Self {
        self.weight_decay = decay;
        self
    }

    pub fn normalize_gradient(mut self, normalize: bool) -> Self {
        self.normalize_gradient = normalize;
        self
    }

    pub fn max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn min_error(mut self, error: f64) -> Self {
        self.min_error = error;
        self
    }

    pub fn init_range(mut self, range: f64) -> Self {
        self.init_range = range;
        self
    }

    pub fn nguyen_widrow(mut self, enabled: bool) -> Self {
        self.nguyen_widrow = enabled;
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration.as_secs_f64());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning rate", self.learning_rate));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(invalid("momentum", self.momentum));
        }
        if !(0.0..1.0).contains(&self.weight_decay) {
            return Err(invalid("weight decay", self.weight_decay));
        }
        if !(self.init_range > 0.0) {
            return Err(invalid("initialization range", self.init_range));
        }
        self.time_budget()?;
        Ok(())
    }

    /// `max_duration` as a `Duration`, rejecting values a `Duration` cannot
    /// hold.
    fn time_budget(&self) -> Result<Option<Duration>> {
        self.max_duration
            .map(|seconds| {
                Duration::try_from_secs_f64(seconds)
                    .map_err(|_| invalid("maximum duration", seconds))
            })
            .transpose()
    }
}

fn invalid(name: &str, value: f64) -> Error {
    Error::InvalidParameter(format!("{} out of range: {}", name, value))
}

/// Where a trainer is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrainingState {
    /// Weights have not been initialized, or the last run failed.
    Uninitialized,
    Initialized,
    Training,
    /// The last run stopped because the epoch error fell below `min_error`.
    Converged,
    MaxEpochsReached,
    /// The last run was stopped by the cancel flag or the time budget.
    Cancelled,
}

/// The outcome of a call to `BackpropTrainer::train`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub state: TrainingState,
    /// Number of epochs fully completed.
    pub epochs: usize,
    /// The epoch error when training stopped. For a cancelled run this only
    /// covers the batches finished in the interrupted epoch.
    pub final_error: f64,
}

/// Error signals for one layer of the network.
#[derive(Debug)]
struct BackpropLayer {
    delta: Mat,
    activation_df: Mat,
    bias_gradient: Vec<f64>,
}

/// Gradient accumulators for one connection of the network.
#[derive(Debug)]
struct BackpropConnection {
    weight_gradient: Mat,
    previous_gradient: Mat,
}

/// Trains a `Network` by batched backpropagation.
///
/// The trainer borrows the network for its whole lifetime and is the only
/// thing that mutates its weights and biases while it exists.
pub struct BackpropTrainer<'a> {
    network: &'a mut Network,
    params: TrainingParameters,
    layers: Vec<BackpropLayer>,
    connections: Vec<BackpropConnection>,
    training_data: Option<&'a [Batch]>,
    state: TrainingState,
    cancel: Arc<AtomicBool>,
}

impl<'a> BackpropTrainer<'a> {
    pub fn new(network: &'a mut Network, params: TrainingParameters) -> Result<Self> {
        params.validate()?;
        if network.layers().len() < 2 {
            return Err(Error::InvalidTopology(
                "training needs an input and an output layer".into(),
            ));
        }
        let layers = network
            .layers()
            .iter()
            .map(|layer| BackpropLayer {
                delta: Mat::zeros(0, layer.size()),
                activation_df: Mat::zeros(0, layer.size()),
                bias_gradient: vec![0.0; layer.size()],
            })
            .collect();
        let connections = network
            .connections()
            .iter()
            .map(|c| {
                let (rows, cols) = (c.weights().rows(), c.weights().cols());
                BackpropConnection {
                    weight_gradient: Mat::zeros(rows, cols),
                    previous_gradient: Mat::zeros(rows, cols),
                }
            })
            .collect();
        Ok(BackpropTrainer {
            network,
            params,
            layers,
            connections,
            training_data: None,
            state: TrainingState::Uninitialized,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn network(&self) -> &Network {
        &*self.network
    }

    pub fn params(&self) -> &TrainingParameters {
        &self.params
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// A flag which, once set, stops training before the next batch. It is
    /// cleared again when a run ends because of it.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn set_training_data(&mut self, batches: &'a [Batch]) {
        self.training_data = Some(batches);
    }

    /// Randomizes every weight and bias and clears any momentum.
    pub fn initialize_network<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let range = Uniform::new_inclusive(-self.params.init_range, self.params.init_range);
        let nguyen_widrow = self.params.nguyen_widrow;
        let (layers, connections) = self.network.parts_mut();
        for layer in layers.iter_mut() {
            for b in layer.bias_mut() {
                *b = range.sample(rng);
            }
        }
        for connection in connections.iter_mut() {
            let weights = connection.weights_mut();
            weights.fill_random(&range, rng);
            if nguyen_widrow {
                let target = nguyen_widrow_norm(weights.rows(), weights.cols());
                for row in 0..weights.rows() {
                    weights.rescale_row(row, target);
                }
            }
        }
        for bp in &mut self.connections {
            bp.weight_gradient.zero_out();
            bp.previous_gradient.zero_out();
        }
        self.network.set_epoch(0);
        self.state = TrainingState::Initialized;
        debug!(
            init_range = self.params.init_range,
            nguyen_widrow, "initialized network"
        );
    }

    /// Accepts whatever weights the network already holds, for networks
    /// whose parameters were set by hand or by an earlier trainer.
    pub fn mark_initialized(&mut self) {
        self.state = TrainingState::Initialized;
    }

    /// Runs epochs over the training data until the error target, the epoch
    /// limit or a cancellation stops it.
    pub fn train(&mut self) -> Result<TrainingReport> {
        let data = match self.training_data {
            Some(data) => data,
            None => {
                warn!("no training data selected");
                return Err(Error::MissingTrainingData);
            }
        };
        if self.state == TrainingState::Uninitialized {
            warn!("training an uninitialized network");
            return Err(Error::NotInitialized);
        }

        self.state = TrainingState::Training;
        info!(
            max_epochs = self.params.max_epochs,
            batches = data.len(),
            "starting training"
        );
        let started = Instant::now();
        match self.run_epochs(data, started) {
            Ok(report) => {
                self.state = report.state;
                info!(
                    state = ?report.state,
                    epochs = report.epochs,
                    error = report.final_error,
                    elapsed = ?started.elapsed(),
                    "training finished"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "training aborted");
                self.state = TrainingState::Uninitialized;
                Err(e)
            }
        }
    }

    fn run_epochs(&mut self, data: &[Batch], started: Instant) -> Result<TrainingReport> {
        let deadline = self.params.time_budget()?;
        let mut epoch_error = 0.0;
        for epoch in 1..=self.params.max_epochs {
            self.network.set_epoch(epoch);
            epoch_error = 0.0;
            self.network.set_epoch_error(epoch_error);
            for batch in data {
                if self.should_cancel(started, deadline) {
                    return Ok(TrainingReport {
                        state: TrainingState::Cancelled,
                        epochs: epoch - 1,
                        final_error: epoch_error,
                    });
                }
                if batch.is_empty() {
                    continue;
                }
                epoch_error += self.backpropagate(batch, epoch_error)?;
                self.apply_updates()?;
            }
            self.network.set_epoch_error(epoch_error);
            self.network.notify_epoch();
            debug!(epoch, error = epoch_error, "epoch complete");

            if epoch_error < self.params.min_error {
                return Ok(TrainingReport {
                    state: TrainingState::Converged,
                    epochs: epoch,
                    final_error: epoch_error,
                });
            }
        }
        Ok(TrainingReport {
            state: TrainingState::MaxEpochsReached,
            epochs: self.params.max_epochs,
            final_error: epoch_error,
        })
    }

    fn should_cancel(&self, started: Instant, deadline: Option<Duration>) -> bool {
        if self.cancel.swap(false, Ordering::SeqCst) {
            info!("training cancelled");
            return true;
        }
        match deadline {
            Some(limit) if started.elapsed() >= limit => {
                info!(limit = ?limit, "training time budget exhausted");
                true
            }
            _ => false,
        }
    }

    /// Propagates one batch forward, scores it, and accumulates the bias and
    /// weight gradients. Returns the batch error.
    fn backpropagate(&mut self, batch: &Batch, epoch_error: f64) -> Result<f64> {
        self.network.feed_forward(batch.input())?;
        let error = self.network.total_error(batch.output())?;
        self.network.set_epoch_error(epoch_error + error);
        self.network.notify_batch();

        self.compute_deltas(batch.output())?;
        self.accumulate_gradients()?;
        Ok(error)
    }

    /// Computes every layer's delta, output layer first and then each hidden
    /// layer in reverse order. The input layer gets none.
    fn compute_deltas(&mut self, target: &Mat) -> Result<()> {
        let error_function = self.network.error_function();
        let layers = self.network.layers();
        let connections = self.network.connections();
        let last = layers.len() - 1;

        for l in (1..=last).rev() {
            let layer = &layers[l];
            {
                let bp = &mut self.layers[l];
                layer.activator().derivative(
                    layer.net_input(),
                    layer.activation(),
                    &mut bp.activation_df,
                )?;
            }
            if l == last {
                let bp = &mut self.layers[l];
                bp.delta.copy_from(layer.activation())?;
                bp.delta.zip_apply(target, |a, t| error_function.de(a, t))?;
            } else {
                {
                    let bp = &mut self.layers[l];
                    bp.delta.resize_rows(layer.batch_size());
                    bp.delta.zero_out();
                }
                for &c in layer.outgoing() {
                    let connection = &connections[c];
                    let (bp, downstream) = split_low_mut(&mut self.layers, l, connection.to());
                    connection.accumulate_net_delta(&downstream.delta, &mut bp.delta)?;
                }
            }
            let bp = &mut self.layers[l];
            bp.delta.zip_apply(&bp.activation_df, |d, df| d * df)?;
        }
        Ok(())
    }

    fn accumulate_gradients(&mut self) -> Result<()> {
        for bp in self.layers.iter_mut().skip(1) {
            bp.bias_gradient.zero_out();
            bp.delta.accumulate_column_sums(&mut bp.bias_gradient)?;
        }
        let layers = self.network.layers();
        for (connection, bp) in self
            .network
            .connections()
            .iter()
            .zip(&mut self.connections)
        {
            bp.weight_gradient.accumulate_product_transpose_left(
                &self.layers[connection.to()].delta,
                layers[connection.from()].activation(),
            )?;
        }
        Ok(())
    }

    /// Steps biases, then weights, against their gradients and resets the
    /// weight accumulators.
    fn apply_updates(&mut self) -> Result<()> {
        let TrainingParameters {
            learning_rate,
            momentum,
            weight_decay,
            normalize_gradient,
            ..
        } = self.params;
        let (layers, connections) = self.network.parts_mut();

        for (layer, bp) in layers.iter_mut().zip(&self.layers).skip(1) {
            for (b, g) in layer.bias_mut().iter_mut().zip(&bp.bias_gradient) {
                *b -= learning_rate * g;
            }
        }

        for (connection, bp) in connections.iter_mut().zip(&mut self.connections) {
            if normalize_gradient {
                bp.weight_gradient.cap_row_norms(1.0);
            }
            if momentum != 0.0 {
                bp.weight_gradient
                    .accumulate(momentum, &bp.previous_gradient)?;
            }
            let weights = connection.weights_mut();
            if weight_decay != 0.0 {
                weights.scale(1.0 - weight_decay);
            }
            weights.accumulate(-learning_rate, &bp.weight_gradient)?;
            bp.previous_gradient.copy_from(&bp.weight_gradient)?;
            bp.weight_gradient.zero_out();
        }
        Ok(())
    }
}

/// Target row norm `0.7 * h^(1/n)` for a connection into `h` units from `n`
/// units.
fn nguyen_widrow_norm(to_size: usize, from_size: usize) -> f64 {
    0.7 * (to_size as f64).powf(1.0 / from_size as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use crate::error_function::ErrorFunction;
    use crate::observer::ErrorStatistics;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn and_batches() -> Vec<Batch> {
        let mut batch = Batch::new(4, 2, 1);
        for &(a, b) in &[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let target = if a == 1.0 && b == 1.0 { 1.0 } else { 0.0 };
            batch.add_pair(&[a, b], &[target]).unwrap();
        }
        vec![batch]
    }

    fn small_network(error_function: ErrorFunction) -> Network {
        Network::new(
            &[2, 3, 1],
            4,
            Activator::TanH,
            Activator::sigmoid(),
            error_function,
        )
        .unwrap()
    }

    #[test]
    fn learns_xor() {
        let mut network = small_network(ErrorFunction::SquaredError);
        let mut batch = Batch::new(4, 2, 1);
        for &(a, b) in &[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let target = if a != b { 1.0 } else { 0.0 };
            batch.add_pair(&[a, b], &[target]).unwrap();
        }
        let batches = vec![batch];
        let params = TrainingParameters::new()
            .learning_rate(0.1)
            .max_epochs(10_000);

        let report = {
            let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
            trainer.initialize_network(&mut StdRng::seed_from_u64(0));
            trainer.set_training_data(&batches);
            trainer.train().unwrap()
        };
        assert_eq!(report.state, TrainingState::MaxEpochsReached);
        assert_eq!(report.epochs, 10_000);
        assert!(report.final_error < 0.05, "error {}", report.final_error);
    }

    #[test]
    fn learns_and() {
        let mut network = small_network(ErrorFunction::SquaredError);
        let stats = Rc::new(RefCell::new(ErrorStatistics::new(10)));
        network.attach(stats.clone());

        let batches = and_batches();
        let params = TrainingParameters::new()
            .learning_rate(0.2)
            .momentum(0.9)
            .max_epochs(20_000)
            .min_error(0.05);
        let report = {
            let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
            trainer.initialize_network(&mut StdRng::seed_from_u64(7));
            trainer.set_training_data(&batches);
            trainer.train().unwrap()
        };

        assert_eq!(report.state, TrainingState::Converged);
        assert!(report.final_error < 0.05);
        assert_eq!(network.epoch(), report.epochs);

        let stats = stats.borrow();
        assert_eq!(stats.epochs(), report.epochs);
        assert!(stats.latest().unwrap() < stats.first().unwrap());

        for &(a, b, expected) in &[(0.0, 0.0, 0.0), (0.0, 1.0, 0.0), (1.0, 1.0, 1.0)] {
            let output = network.run(&[a, b]).unwrap();
            assert!((output[0] - expected).abs() < 0.35, "{} AND {}", a, b);
        }
    }

    #[test]
    fn learns_or_with_cross_entropy() {
        let mut network = small_network(ErrorFunction::CrossEntropy);
        let mut batch = Batch::new(4, 2, 1);
        for &(a, b) in &[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let target = if a == 1.0 || b == 1.0 { 1.0 } else { 0.0 };
            batch.add_pair(&[a, b], &[target]).unwrap();
        }
        let batches = vec![batch];
        let params = TrainingParameters::new()
            .learning_rate(0.1)
            .momentum(0.5)
            .max_epochs(20_000)
            .min_error(0.1);

        let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
        trainer.initialize_network(&mut StdRng::seed_from_u64(11));
        trainer.set_training_data(&batches);
        let report = trainer.train().unwrap();
        assert_eq!(report.state, TrainingState::Converged);
        assert_eq!(trainer.state(), TrainingState::Converged);
    }

    #[test]
    fn seeded_initialization_is_deterministic() {
        let weights = |seed| {
            let mut network = small_network(ErrorFunction::SquaredError);
            {
                let mut trainer =
                    BackpropTrainer::new(&mut network, TrainingParameters::new()).unwrap();
                trainer.initialize_network(&mut StdRng::seed_from_u64(seed));
            }
            network.connections()[0].weights().clone()
        };
        assert_eq!(weights(3), weights(3));
        assert_ne!(weights(3), weights(4));
        assert!(weights(3).as_slice().iter().all(|w| w.abs() <= 0.2));
    }

    #[test]
    fn nguyen_widrow_sets_row_norms() {
        let mut network = Network::new(
            &[4, 9, 1],
            1,
            Activator::TanH,
            Activator::TanH,
            ErrorFunction::SquaredError,
        )
        .unwrap();
        {
            let params = TrainingParameters::new().nguyen_widrow(true);
            let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
            trainer.initialize_network(&mut StdRng::seed_from_u64(1));
        }

        // 9 units fed by 4: 0.7 * 9^(1/4)
        let expected = 0.7 * 3f64.sqrt();
        let hidden = network.connections()[0].weights();
        for row in 0..hidden.rows() {
            assert!((hidden.row_norm(row) - expected).abs() < 1e-12);
        }
        assert!((nguyen_widrow_norm(1, 9) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn train_requires_data_and_initialization() {
        let mut network = small_network(ErrorFunction::SquaredError);
        let batches = and_batches();
        let mut trainer = BackpropTrainer::new(&mut network, TrainingParameters::new()).unwrap();
        assert_eq!(trainer.train(), Err(Error::MissingTrainingData));

        trainer.set_training_data(&batches);
        assert_eq!(trainer.train(), Err(Error::NotInitialized));
        assert_eq!(trainer.state(), TrainingState::Uninitialized);
    }

    #[test]
    fn failure_resets_state() {
        let mut network = small_network(ErrorFunction::SquaredError);
        // three inputs for a two-unit input layer
        let batches = vec![{
            let mut b = Batch::new(1, 3, 1);
            b.add_pair(&[0.0, 1.0, 2.0], &[1.0]).unwrap();
            b
        }];
        let mut trainer = BackpropTrainer::new(&mut network, TrainingParameters::new()).unwrap();
        trainer.initialize_network(&mut StdRng::seed_from_u64(0));
        trainer.set_training_data(&batches);
        assert!(matches!(
            trainer.train(),
            Err(Error::DimensionMismatch { .. })
        ));
        assert_eq!(trainer.state(), TrainingState::Uninitialized);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut network = small_network(ErrorFunction::SquaredError);
        for params in vec![
            TrainingParameters::new().learning_rate(0.0),
            TrainingParameters::new().momentum(1.0),
            TrainingParameters::new().weight_decay(-0.1),
            TrainingParameters::new().init_range(0.0),
        ] {
            assert!(matches!(
                BackpropTrainer::new(&mut network, params),
                Err(Error::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn rejects_durations_out_of_range() {
        let params: TrainingParameters =
            serde_json::from_str(r#"{"max_duration": 1e20, "max_epochs": 1}"#).unwrap();
        assert!(matches!(params.validate(), Err(Error::InvalidParameter(_))));
        let mut network = small_network(ErrorFunction::SquaredError);
        assert!(BackpropTrainer::new(&mut network, params).is_err());

        for &seconds in &[-1.0, f64::NAN, f64::INFINITY] {
            let mut params = TrainingParameters::new();
            params.max_duration = Some(seconds);
            assert!(params.validate().is_err(), "{}", seconds);
        }
        let params = TrainingParameters::new().max_duration(Duration::from_secs(3600));
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn cancel_flag_stops_training() {
        let mut network = small_network(ErrorFunction::SquaredError);
        let batches = and_batches();
        let mut trainer = BackpropTrainer::new(&mut network, TrainingParameters::new()).unwrap();
        trainer.initialize_network(&mut StdRng::seed_from_u64(0));
        trainer.set_training_data(&batches);

        trainer.cancel_flag().store(true, Ordering::SeqCst);
        let report = trainer.train().unwrap();
        assert_eq!(report.state, TrainingState::Cancelled);
        assert_eq!(report.epochs, 0);

        // the flag was consumed, so a time budget of zero is what stops this run
        trainer.params.max_duration = Some(0.0);
        let report = trainer.train().unwrap();
        assert_eq!(report.state, TrainingState::Cancelled);
        assert!(!trainer.cancel_flag().load(Ordering::SeqCst));
    }

    /// A single linear unit: out = w * x + b.
    fn single_unit(w: f64) -> (Network, Vec<Batch>) {
        let mut network = Network::new(
            &[1, 1],
            1,
            Activator::Linear(1.0),
            Activator::Linear(1.0),
            ErrorFunction::SquaredError,
        )
        .unwrap();
        network.parts_mut().1[0]
            .set_weights(Mat::from_vec(1, 1, vec![w]).unwrap())
            .unwrap();
        let mut batch = Batch::new(1, 1, 1);
        batch.add_pair(&[2.0], &[0.0]).unwrap();
        (network, vec![batch])
    }

    fn train_unit(params: TrainingParameters) -> (f64, f64) {
        let (mut network, batches) = single_unit(0.5);
        {
            let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
            trainer.mark_initialized();
            trainer.set_training_data(&batches);
            trainer.train().unwrap();
        }
        (
            network.connections()[0].weights().get(0, 0),
            network.layers()[1].bias()[0],
        )
    }

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-12 && (actual.1 - expected.1).abs() < 1e-12,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn plain_gradient_step() {
        // out = 1, delta = 1, weight gradient = 2
        let params = TrainingParameters::new()
            .learning_rate(0.1)
            .momentum(0.0)
            .max_epochs(1);
        assert_close(train_unit(params), (0.3, -0.1));
    }

    #[test]
    fn momentum_reuses_previous_gradient() {
        // second epoch: out = 0.5, gradient 1.0 + 0.5 * 2.0
        let params = TrainingParameters::new()
            .learning_rate(0.1)
            .momentum(0.5)
            .max_epochs(2);
        assert_close(train_unit(params), (0.1, -0.15));
    }

    #[test]
    fn decay_shrinks_weights_before_the_step() {
        let params = TrainingParameters::new()
            .learning_rate(0.1)
            .momentum(0.0)
            .weight_decay(0.5)
            .max_epochs(1);
        assert_close(train_unit(params), (0.05, -0.1));
    }

    #[test]
    fn normalization_caps_the_gradient() {
        let params = TrainingParameters::new()
            .learning_rate(0.1)
            .momentum(0.0)
            .normalize_gradient(true)
            .max_epochs(1);
        assert_close(train_unit(params), (0.4, -0.1));
    }

    fn batch_error(network: &mut Network, batch: &Batch) -> f64 {
        network.feed_forward(batch.input()).unwrap();
        network.total_error(batch.output()).unwrap()
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut network = Network::new(
            &[3, 4, 2],
            2,
            Activator::TanH,
            Activator::sigmoid(),
            ErrorFunction::SquaredError,
        )
        .unwrap();
        // a skip connection exercises deltas from more than one layer
        network.add_connection(0, 2).unwrap();
        let mut batch = Batch::new(2, 3, 2);
        batch.add_pair(&[0.5, -1.0, 0.25], &[1.0, 0.0]).unwrap();
        batch.add_pair(&[-0.3, 0.8, 1.0], &[0.0, 1.0]).unwrap();

        let (weight_gradients, bias_gradients) = {
            let params = TrainingParameters::new().init_range(1.0);
            let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
            trainer.initialize_network(&mut StdRng::seed_from_u64(42));
            trainer.backpropagate(&batch, 0.0).unwrap();
            (
                trainer
                    .connections
                    .iter()
                    .map(|c| c.weight_gradient.clone())
                    .collect::<Vec<_>>(),
                trainer
                    .layers
                    .iter()
                    .map(|l| l.bias_gradient.clone())
                    .collect::<Vec<_>>(),
            )
        };

        let h = 1e-6;
        for (c, gradient) in weight_gradients.iter().enumerate() {
            for r in 0..gradient.rows() {
                for col in 0..gradient.cols() {
                    let original = network.connections()[c].weights().get(r, col);
                    network.parts_mut().1[c]
                        .weights_mut()
                        .set_entry(r, col, original + h);
                    let plus = batch_error(&mut network, &batch);
                    network.parts_mut().1[c]
                        .weights_mut()
                        .set_entry(r, col, original - h);
                    let minus = batch_error(&mut network, &batch);
                    network.parts_mut().1[c]
                        .weights_mut()
                        .set_entry(r, col, original);

                    let numeric = (plus - minus) / (2.0 * h);
                    assert!(
                        (gradient.get(r, col) - numeric).abs() < 1e-6,
                        "connection {} [{}, {}]: {} vs {}",
                        c,
                        r,
                        col,
                        gradient.get(r, col),
                        numeric
                    );
                }
            }
        }

        for (l, gradient) in bias_gradients.iter().enumerate().skip(1) {
            for (i, &g) in gradient.iter().enumerate() {
                let original = network.layers()[l].bias()[i];
                network.parts_mut().0[l].bias_mut()[i] = original + h;
                let plus = batch_error(&mut network, &batch);
                network.parts_mut().0[l].bias_mut()[i] = original - h;
                let minus = batch_error(&mut network, &batch);
                network.parts_mut().0[l].bias_mut()[i] = original;

                let numeric = (plus - minus) / (2.0 * h);
                assert!((g - numeric).abs() < 1e-6, "bias {} of layer {}", i, l);
            }
        }
    }

    #[test]
    fn parameters_from_partial_json() {
        let params: TrainingParameters =
            serde_json::from_str(r#"{"learning_rate": 0.5, "max_duration": 30.0}"#).unwrap();
        assert_eq!(params.learning_rate, 0.5);
        assert_eq!(params.max_duration, Some(30.0));
        assert_eq!(params.momentum, 0.9);
        assert_eq!(params.max_epochs, 150_000);

        let json = serde_json::to_string(&params).unwrap();
        let back: TrainingParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
