use serde::{Deserialize, Serialize};

/// Per-layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActFn {
    /// No non-linearity; used for regression readouts.
    Identity,
    Sigmoid,
    Relu,
    Tanh,
}

impl ActFn {
    pub fn f(self, z: f32) -> f32 {
        match self {
            ActFn::Identity => z,
            ActFn::Sigmoid => 1.0 / (1.0 + (-z).exp()),
            ActFn::Relu => z.max(0.0),
            ActFn::Tanh => z.tanh(),
        }
    }

    /// Derivative with respect to the pre-activation `z`.
    pub fn df(self, z: f32) -> f32 {
        match self {
            ActFn::Identity => 1.0,
            ActFn::Sigmoid => {
                let s = self.f(z);
                s * (1.0 - s)
            }
            ActFn::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActFn::Tanh => 1.0 - z.tanh().powi(2),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sigmoid_is_bounded() {
        assert!(ActFn::Sigmoid.f(100.0) <= 1.0);
        assert!(ActFn::Sigmoid.f(-100.0) >= 0.0);
        assert!((ActFn::Sigmoid.f(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let eps = 1e-3;
        for act in [ActFn::Identity, ActFn::Sigmoid, ActFn::Tanh] {
            for z in [-1.5f32, -0.3, 0.2, 1.1] {
                let numeric = (act.f(z + eps) - act.f(z - eps)) / (2.0 * eps);
                assert!(
                    (numeric - act.df(z)).abs() < 1e-2,
                    "{act:?} derivative mismatch at {z}"
                );
            }
        }
    }
}
