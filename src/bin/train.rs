//! Trains a small network to tell which diagonal pair of quadrants a noisy
//! point on the unit circle falls in.

use nnet::encoder::{CategoryCoding, CategoryEncoder, Encoder, RecordEncoder, ScaleEncoder};
use nnet::{
    Activator, BackpropTrainer, ErrorFunction, ErrorLogger, Network, Timer, TrainingData,
    TrainingParameters,
};

use rand::distributions::{Distribution, Uniform};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info};

#[derive(Clone, Debug, Default)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Quadrants {
    /// First and third.
    Odd,
    /// Second and fourth.
    Even,
}

fn generate_data(num_samples: usize) -> Vec<(Point, Quadrants)> {
    let mut rng = rand::thread_rng();
    let radians = Uniform::new(0.0, 2.0 * std::f64::consts::PI);
    let noise = Uniform::new_inclusive(-0.1, 0.1);

    let mut data = Vec::new();
    for _ in 0..num_samples {
        let theta = radians.sample(&mut rng);
        let point = Point {
            x: theta.cos() + noise.sample(&mut rng),
            y: theta.sin() + noise.sample(&mut rng),
        };
        let class = if point.x * point.y > 0.0 {
            Quadrants::Odd
        } else {
            Quadrants::Even
        };
        data.push((point, class));
    }
    data
}

fn point_encoder() -> nnet::Result<RecordEncoder<Point>> {
    let mut encoder = RecordEncoder::new();
    encoder.add_field(
        "x",
        ScaleEncoder::new(-1.1, 1.1, -1.0, 1.0)?,
        |p: &Point| &p.x,
        |p: &mut Point, v| p.x = v,
    )?;
    encoder.add_field(
        "y",
        ScaleEncoder::new(-1.1, 1.1, -1.0, 1.0)?,
        |p: &Point| &p.y,
        |p: &mut Point, v| p.y = v,
    )?;
    Ok(encoder)
}

fn score(
    set_name: &str,
    network: &mut Network,
    encoders: (&RecordEncoder<Point>, &CategoryEncoder<Quadrants>),
    test_data: &[(Point, Quadrants)],
) -> nnet::Result<()> {
    let (input, output) = encoders;
    let mut num_correct = 0;
    for (point, expected) in test_data {
        let prediction = output.decode(&network.run(&input.encode(point)?)?)?;
        if prediction == *expected {
            num_correct += 1;
        }
    }
    info!(
        set = set_name,
        correct = num_correct,
        total = test_data.len(),
        "scored"
    );
    Ok(())
}

fn run() -> nnet::Result<()> {
    let classes = CategoryEncoder::from_categories(
        CategoryCoding::OneHot,
        vec![Quadrants::Odd, Quadrants::Even],
    );
    let mut training_data = TrainingData::new(100, 100, point_encoder()?, classes)?;
    for (point, class) in generate_data(10_000) {
        training_data.add_pair(&point, &class)?;
    }

    let mut network = Network::new(
        &[2, 5, 5, 2],
        100,
        Activator::TanH,
        Activator::sigmoid(),
        ErrorFunction::SquaredError,
    )?;
    network.attach(Rc::new(RefCell::new(ErrorLogger::new(50).with_timer())));

    let params = TrainingParameters::new()
        .learning_rate(0.01)
        .momentum(0.9)
        .max_epochs(2_000)
        .min_error(10.0)
        .nguyen_widrow(true);
    let mut timer = Timer::started();
    {
        let mut trainer = BackpropTrainer::new(&mut network, params)?;
        trainer.initialize_network(&mut rand::thread_rng());
        trainer.set_training_data(training_data.batches());
        let report = trainer.train()?;
        info!(
            state = ?report.state,
            epochs = report.epochs,
            error = report.final_error,
            "training complete"
        );
    }
    timer.stop();
    info!(elapsed = %timer.elapsed_string(), "training time");

    let encoders = (
        training_data.input_encoder(),
        training_data.output_encoder(),
    );
    let test_data = generate_data(1_000);
    score("test", &mut network, encoders, &test_data)
}

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        error!(error = %e, "training failed");
        std::process::exit(1);
    }
}
