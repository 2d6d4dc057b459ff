//! Activation function types.

use crate::error::{check_dim, Error, Result};
use crate::matrix::Mat;

use serde_derive::{Deserialize, Serialize};

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activator {
    /// Logistic function stretched onto `(min, max)`, with `slope` scaling
    /// the input.
    Sigmoid { min: f64, max: f64, slope: f64 },
    /// Hyperbolic tan function
    TanH,
    /// `slope * x`
    Linear(f64),
}

impl Activator {
    /// The standard logistic function onto `(0, 1)`.
    pub fn sigmoid() -> Self {
        Activator::Sigmoid {
            min: 0.0,
            max: 1.0,
            slope: 1.0,
        }
    }

    /// A logistic function onto `(min, max)`.
    pub fn sigmoid_range(min: f64, max: f64, slope: f64) -> Result<Self> {
        if !(max > min) {
            return Err(Error::InvalidParameter(format!(
                "sigmoid range [{}, {}] is empty",
                min, max
            )));
        }
        Ok(Activator::Sigmoid { min, max, slope })
    }

    /// Evaluates `f(x)` for the selected the activation function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Activator::Sigmoid { min, max, slope } => {
                (max - min) / (1.0 + (-slope * x).exp()) + min
            }
            Activator::TanH => x.tanh(),
            Activator::Linear(slope) => slope * x,
        }
    }

    /// Evaluates the derivative `f'(x)`, given both `x` and `fx = f(x)`.
    ///
    /// None of the variants need `x`: the derivative is written in terms of
    /// the output, so the pre-activation buffer never has to be re-read.
    pub fn fprime(&self, _x: f64, fx: f64) -> f64 {
        match *self {
            Activator::Sigmoid { min, max, slope } => {
                slope / (max - min) * (fx - min) * (max - fx)
            }
            Activator::TanH => 1.0 - fx * fx,
            Activator::Linear(slope) => slope,
        }
    }

    /// Writes `f(net_input)` into `activation`, entry by entry.
    pub fn apply(&self, net_input: &Mat, activation: &mut Mat) -> Result<()> {
        activation.map_from(net_input, |x| self.f(x))
    }

    /// Writes `f'(net_input)` into `derivative`, using the stored
    /// `activation` values.
    pub fn derivative(
        &self,
        net_input: &Mat,
        activation: &Mat,
        derivative: &mut Mat,
    ) -> Result<()> {
        check_dim("Activator::derivative rows", net_input.rows(), activation.rows())?;
        check_dim("Activator::derivative cols", net_input.cols(), activation.cols())?;
        derivative.resize_rows(activation.rows());
        check_dim("Activator::derivative output", derivative.cols(), activation.cols())?;
        for ((d, &x), &fx) in derivative
            .as_mut_slice()
            .iter_mut()
            .zip(net_input.as_slice())
            .zip(activation.as_slice())
        {
            *d = self.fprime(x, fx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [f64; 7] = [-3.0, -1.2, -0.3, 0.0, 0.4, 1.7, 2.9];

    fn finite_difference(act: &Activator, x: f64) -> f64 {
        let h = 1e-6;
        (act.f(x + h) - act.f(x - h)) / (2.0 * h)
    }

    fn check_derivative(act: Activator) {
        for &x in SAMPLES.iter() {
            let analytic = act.fprime(x, act.f(x));
            let numeric = finite_difference(&act, x);
            assert!(
                (analytic - numeric).abs() < 1e-6,
                "{:?} at {}: {} vs {}",
                act,
                x,
                analytic,
                numeric
            );
        }
    }

    #[test]
    fn sigmoid_derivatives() {
        check_derivative(Activator::sigmoid());
        check_derivative(Activator::sigmoid_range(-1.0, 1.0, 1.0).unwrap());
        check_derivative(Activator::sigmoid_range(-2.0, 3.0, 0.5).unwrap());
        check_derivative(Activator::sigmoid_range(0.0, 1.0, 2.5).unwrap());
    }

    #[test]
    fn sigmoid_derivative_ignores_input() {
        let act = Activator::sigmoid_range(-2.0, 3.0, 0.5).unwrap();
        for &x in SAMPLES.iter() {
            let fx = act.f(x);
            assert_eq!(act.fprime(x, fx), act.fprime(f64::NAN, fx));
        }
    }

    #[test]
    fn sigmoid_respects_range() {
        let act = Activator::sigmoid_range(-2.0, 3.0, 1.0).unwrap();
        assert!((act.f(0.0) - 0.5).abs() < 1e-12);
        assert!(act.f(-40.0) > -2.0 - 1e-12 && act.f(-40.0) < -1.999);
        assert!(act.f(40.0) < 3.0 + 1e-12 && act.f(40.0) > 2.999);
        assert!(Activator::sigmoid_range(1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn tanh_and_linear_derivatives() {
        check_derivative(Activator::TanH);
        check_derivative(Activator::Linear(1.0));
        check_derivative(Activator::Linear(-0.25));
    }

    #[test]
    fn elementwise_application() {
        let act = Activator::Linear(2.0);
        let net = Mat::from_rows(&[[1.0, -1.0], [0.5, 0.0]]).unwrap();
        let mut out = Mat::zeros(2, 2);
        act.apply(&net, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[2.0, -2.0, 1.0, 0.0]);

        let mut df = Mat::zeros(2, 2);
        act.derivative(&net, &out, &mut df).unwrap();
        assert_eq!(df.as_slice(), &[2.0; 4]);
    }
}
