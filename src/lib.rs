//! Layered feedforward neural networks trained by batched backpropagation.
//!
//! A `Network` owns its layers and the weighted connections between them.
//! Training data is encoded into fixed-capacity `Batch`es, and a
//! `BackpropTrainer` borrows the network to fit its weights and biases.
//!
//! ```
//! use nnet::{Activator, BackpropTrainer, Batch, ErrorFunction, Network};
//! use nnet::{TrainingParameters, TrainingState};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut network = Network::new(
//!     &[2, 4, 1],
//!     4,
//!     Activator::TanH,
//!     Activator::sigmoid(),
//!     ErrorFunction::SquaredError,
//! )
//! .unwrap();
//!
//! let mut batch = Batch::new(4, 2, 1);
//! batch.add_pair(&[0.0, 0.0], &[0.0]).unwrap();
//! batch.add_pair(&[0.0, 1.0], &[1.0]).unwrap();
//! batch.add_pair(&[1.0, 0.0], &[1.0]).unwrap();
//! batch.add_pair(&[1.0, 1.0], &[1.0]).unwrap();
//! let batches = vec![batch];
//!
//! let params = TrainingParameters::new()
//!     .learning_rate(0.2)
//!     .max_epochs(20_000)
//!     .min_error(0.05);
//! let report = {
//!     let mut trainer = BackpropTrainer::new(&mut network, params).unwrap();
//!     trainer.initialize_network(&mut StdRng::seed_from_u64(5));
//!     trainer.set_training_data(&batches);
//!     trainer.train().unwrap()
//! };
//! assert_eq!(report.state, TrainingState::Converged);
//!
//! assert!(network.run(&[1.0, 0.0]).unwrap()[0] > 0.5);
//! ```

pub mod activator;
pub mod batch;
pub mod connection;
pub mod encoder;
pub mod error;
pub mod error_function;
pub mod layer;
pub mod matrix;
pub mod network;
pub mod observer;
pub mod stats;
pub mod timer;
pub mod train;

mod utils;

pub use crate::activator::Activator;
pub use crate::batch::{Batch, TrainingData};
pub use crate::error::{Error, Result};
pub use crate::error_function::ErrorFunction;
pub use crate::matrix::Mat;
pub use crate::network::{Network, ObserverId};
pub use crate::observer::{ErrorLogger, ErrorStatistics, Observer};
pub use crate::timer::Timer;
pub use crate::train::{BackpropTrainer, TrainingParameters, TrainingReport, TrainingState};
