use super::SystemModel;
use nalgebra::{DMatrix, DVector};

/// Linear system f(x, u) = A·x + B·u with observation h(x) = C·x.
///
/// Mostly useful as a sanity baseline: on a linear system the cubature
/// transform reproduces the classical Kalman filter exactly.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    A: DMatrix<f64>,
    B: DMatrix<f64>,
    C: DMatrix<f64>,
}

impl LinearSystem {
    pub fn new(A: DMatrix<f64>, B: DMatrix<f64>, C: DMatrix<f64>) -> Self {
        LinearSystem { A, B, C }
    }

    /// Identity dynamics with no control input: f(x) = x, h(x) = x.
    pub fn fixed_point(n: usize) -> Self {
        LinearSystem {
            A: DMatrix::identity(n, n),
            B: DMatrix::zeros(n, 0),
            C: DMatrix::identity(n, n),
        }
    }
}

impl SystemModel for LinearSystem {
    type State = DVector<f64>;
    type Input = DVector<f64>;
    type Measurement = DVector<f64>;

    fn f(&self, x: &Self::State, u: &Self::Input) -> Self::State {
        &self.A * x + &self.B * u
    }

    fn h(&self, x: &Self::State) -> Self::Measurement {
        &self.C * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_f() {
        let sys = LinearSystem::new(
            DMatrix::from_row_slice(2, 2, &[1., 0.5, 0., 1.]),
            DMatrix::from_row_slice(2, 1, &[0.125, 0.5]),
            DMatrix::from_row_slice(1, 2, &[1., 0.]),
        );
        let x = DVector::from_row_slice(&[1., 2.]);
        let u = DVector::from_row_slice(&[2.]);
        let x_correct = DVector::from_row_slice(&[2.25, 3.]);
        let x_next = sys.f(&x, &u);
        assert!(x_correct.relative_eq(&x_next, 1e-12, 1e-12));
    }

    #[test]
    fn test_linear_h() {
        let sys = LinearSystem::new(
            DMatrix::identity(2, 2),
            DMatrix::zeros(2, 1),
            DMatrix::from_row_slice(1, 2, &[1., 0.]),
        );
        let x = DVector::from_row_slice(&[3., 4.]);
        let z = sys.h(&x);
        assert_eq!(z.len(), 1);
        assert!((z[0] - 3.).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_point_is_identity() {
        let sys = LinearSystem::fixed_point(3);
        let x = DVector::from_row_slice(&[1., -2., 0.5]);
        let u = DVector::zeros(0);
        assert!(x.relative_eq(&sys.f(&x, &u), 1e-12, 1e-12));
        assert!(x.relative_eq(&sys.h(&x), 1e-12, 1e-12));
    }
}
