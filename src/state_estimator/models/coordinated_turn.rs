use super::SystemModel;
use nalgebra::DVector;

/// Constant-turn-rate planar model with state [x, y, u, v, omega] and a
/// position observation. The timestep is fixed at construction and the
/// model takes no control input (pass a zero-length vector).
#[derive(Debug, Clone)]
pub struct CoordinatedTurn {
    ts: f64,
}

impl CoordinatedTurn {
    pub fn new(ts: f64) -> Self {
        CoordinatedTurn { ts }
    }
}

// Computes sin(x)/x
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-3 {
        1.0 - x.powi(2) / 6.0
    } else {
        x.sin() / x
    }
}

// Computes (1 - cos(x))/x
fn cosc(x: f64) -> f64 {
    if x.abs() < 1e-3 {
        x / 2.0 - x.powi(3) / 24.0
    } else {
        (1.0 - x.cos()) / x
    }
}

impl SystemModel for CoordinatedTurn {
    type State = DVector<f64>;
    type Input = DVector<f64>;
    type Measurement = DVector<f64>;

    fn f(&self, x: &Self::State, _u: &Self::Input) -> Self::State {
        let ts = self.ts;
        let x0 = x[0];
        let y0 = x[1];
        let u0 = x[2];
        let v0 = x[3];
        let omega = x[4];

        let theta = omega * ts;

        let cth = theta.cos();
        let sth = theta.sin();

        let sincth = sinc(theta);
        let coscth = cosc(theta);

        DVector::from_row_slice(&[
            x0 + ts * u0 * sincth - ts * v0 * coscth,
            y0 + ts * u0 * coscth + ts * v0 * sincth,
            u0 * cth - v0 * sth,
            u0 * sth + v0 * cth,
            omega,
        ])
    }

    /// Position is the first two states
    fn h(&self, x: &Self::State) -> Self::Measurement {
        x.rows(0, 2).clone_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_CT_f() {
        let ct = CoordinatedTurn::new(1.0);
        let x = DVector::from_row_slice(&[
            0.814723686393179,
            0.905791937075619,
            0.126986816293506,
            0.913375856139019,
            0.123,
        ]);
        let x_correct = DVector::from_row_slice(&[
            0.885288716322700,
            1.824666305629147,
            0.013965268961422,
            0.922055354820350,
            0.123000000000000,
        ]);
        let x_next = ct.f(&x, &DVector::zeros(0));
        assert!(x_correct.relative_eq(&x_next, 1e-5, 1e-5));
    }

    #[test]
    fn test_CT_f_zero_turn_rate() {
        // omega = 0 degenerates to constant velocity
        let ct = CoordinatedTurn::new(0.5);
        let x = DVector::from_row_slice(&[1., 2., 3., 4., 0.]);
        let x_correct = DVector::from_row_slice(&[2.5, 4., 3., 4., 0.]);
        let x_next = ct.f(&x, &DVector::zeros(0));
        assert!(x_correct.relative_eq(&x_next, 1e-9, 1e-9));
    }

    #[test]
    fn test_CT_h() {
        let ct = CoordinatedTurn::new(1.0);
        let x = DVector::from_row_slice(&[1., 2., 3., 4., 0.1]);
        let z = ct.h(&x);
        let z_correct = DVector::from_row_slice(&[1., 2.]);
        assert!(z_correct.relative_eq(&z, 1e-12, 1e-12));
    }
}
