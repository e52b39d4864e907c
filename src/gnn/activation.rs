use ndarray::Array2;

use crate::config::Activation;

/// Negative slope of the leaky ReLU used between layers.
pub const LEAKY_SLOPE: f64 = 0.01;

impl Activation {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu => leaky_relu(x, LEAKY_SLOPE),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }

    /// Derivative at pre-activation `x`, given the activated value `y`.
    #[inline]
    pub fn derivative(self, x: f64, y: f64) -> f64 {
        match self {
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyRelu => leaky_relu_grad(x, LEAKY_SLOPE),
            Activation::Tanh => 1.0 - y * y,
            Activation::Linear => 1.0,
        }
    }

    pub fn forward(self, pre: &Array2<f64>) -> Array2<f64> {
        pre.mapv(|x| self.apply(x))
    }

    /// Multiplies `upstream` by the activation's local derivative.
    pub fn backward(
        self,
        pre: &Array2<f64>,
        out: &Array2<f64>,
        upstream: &Array2<f64>,
    ) -> Array2<f64> {
        let mut grad = upstream.clone();
        ndarray::Zip::from(&mut grad)
            .and(pre)
            .and(out)
            .for_each(|g, &x, &y| *g *= self.derivative(x, y));
        grad
    }
}

#[inline]
pub fn leaky_relu(x: f64, slope: f64) -> f64 {
    if x > 0.0 { x } else { slope * x }
}

#[inline]
pub fn leaky_relu_grad(x: f64, slope: f64) -> f64 {
    if x > 0.0 { 1.0 } else { slope }
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^x)` without overflow.
#[inline]
pub fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn softplus_matches_naive_form() {
        for x in [-5.0, -0.5, 0.0, 0.5, 5.0] {
            let naive = (1.0 + f64::exp(x)).ln();
            assert!((softplus(x) - naive).abs() < 1e-12);
        }
        assert!((softplus(1000.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn derivatives_match_definitions() {
        assert_eq!(Activation::Relu.derivative(-1.0, 0.0), 0.0);
        assert_eq!(Activation::LeakyRelu.apply(-2.0), -0.02);
        assert_eq!(Activation::LeakyRelu.derivative(-2.0, -0.02), LEAKY_SLOPE);
        let y = Activation::Tanh.apply(0.3);
        assert!((Activation::Tanh.derivative(0.3, y) - (1.0 - y * y)).abs() < 1e-15);
        assert_eq!(Activation::Linear.derivative(7.0, 7.0), 1.0);
    }
}
