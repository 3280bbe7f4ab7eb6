use super::models::SystemModel;
use crate::error::FilterError;
use itertools::izip;
use nalgebra::{DMatrix, DVector};

/// Cubature Kalman filter over a system model supplying the transition
/// function f and the measurement function h.
///
/// The filter owns a Gaussian belief (mean, covariance) over the latent
/// state and advances it in place: `predict` propagates 2N cubature points
/// through f and recombines them, `correct` fuses a measurement by
/// resampling cubature points over the state augmented with the
/// measurement-noise block. Neither f nor h needs to be differentiable.
pub struct CKF<S> {
    state_dim: usize,
    input_dim: usize,
    measurement_dim: usize,

    mean: DVector<f64>,
    cov: DMatrix<f64>,

    system: S,
    process_noise: DMatrix<f64>,
    measurement_noise: DMatrix<f64>,

    weights: DVector<f64>,
    ext_weights: DVector<f64>,

    cubature_points: DMatrix<f64>,
    ext_cubature_points: DMatrix<f64>,
    kalman_gain: Option<DMatrix<f64>>,

    // Eigenvalue floor applied before factorization, None = off
    regularization: Option<f64>,
}

/// Deterministic cubature sampling of a Gaussian: 2n points, rows i and
/// n+i holding mean ± col_i(L·√n) where L·Lᵗ = cov. Fails if the
/// covariance has no Cholesky factor.
pub fn cubature_points(
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
) -> Result<DMatrix<f64>, FilterError> {
    let n = mean.len();
    check_square(cov, n, "covariance")?;

    let chol = cov
        .clone()
        .cholesky()
        .ok_or_else(|| FilterError::NonPositiveDefinite {
            context: "covariance".to_string(),
        })?;
    let l = chol.l() * (n as f64).sqrt();

    let mut points = DMatrix::zeros(2 * n, n);
    for i in 0..n {
        let c = l.column(i);
        points.row_mut(i).copy_from(&(mean + c).transpose());
        points.row_mut(n + i).copy_from(&(mean - c).transpose());
    }
    Ok(points)
}

/// Clip eigenvalues below `eps` up to `eps` and recompose, so that a
/// numerically indefinite covariance becomes factorizable again.
pub fn ensure_positive_finite(cov: &DMatrix<f64>, eps: f64) -> DMatrix<f64> {
    let mut eig = cov.clone().symmetric_eigen();
    for lambda in eig.eigenvalues.iter_mut() {
        if *lambda < eps {
            *lambda = eps;
        }
    }
    eig.recompose()
}

fn innovation_gain(
    cross_cov: &DMatrix<f64>,
    expected_measurement_cov: &DMatrix<f64>,
) -> Result<DMatrix<f64>, FilterError> {
    let S_inv = expected_measurement_cov
        .clone()
        .try_inverse()
        .ok_or(FilterError::SingularInnovationCov)?;
    Ok(cross_cov * S_inv)
}

fn check_len(actual: usize, expected: usize, context: &str) -> Result<(), FilterError> {
    if actual != expected {
        return Err(FilterError::DimensionMismatch {
            expected,
            actual,
            context: context.to_string(),
        });
    }
    Ok(())
}

fn check_square(m: &DMatrix<f64>, n: usize, context: &str) -> Result<(), FilterError> {
    check_len(m.nrows(), n, context)?;
    check_len(m.ncols(), n, context)
}

impl<S> CKF<S>
where
    S: SystemModel<State = DVector<f64>, Input = DVector<f64>, Measurement = DVector<f64>>,
{
    /// Construct a filter with an initial belief and caller-owned noise
    /// covariances. All dimensions are fixed here for the filter's
    /// lifetime; every supplied vector and matrix is validated against
    /// them.
    pub fn new(
        system: S,
        state_dim: usize,
        input_dim: usize,
        measurement_dim: usize,
        process_noise: DMatrix<f64>,
        measurement_noise: DMatrix<f64>,
        mean: DVector<f64>,
        cov: DMatrix<f64>,
    ) -> Result<Self, FilterError> {
        check_len(mean.len(), state_dim, "initial mean")?;
        check_square(&cov, state_dim, "initial covariance")?;
        check_square(&process_noise, state_dim, "process noise covariance")?;
        check_square(&measurement_noise, measurement_dim, "measurement noise covariance")?;

        let s = 2 * state_dim;
        let e = 2 * (state_dim + measurement_dim);

        Ok(CKF {
            state_dim,
            input_dim,
            measurement_dim,
            mean,
            cov,
            system,
            process_noise,
            measurement_noise,
            weights: DVector::from_element(s, 1.0 / s as f64),
            ext_weights: DVector::from_element(e, 1.0 / e as f64),
            cubature_points: DMatrix::zeros(s, state_dim),
            ext_cubature_points: DMatrix::zeros(e, state_dim + measurement_dim),
            kalman_gain: None,
            regularization: None,
        })
    }

    /// Propagate the belief through the transition function and add the
    /// process noise.
    pub fn predict(&mut self, control: &DVector<f64>) -> Result<(), FilterError> {
        let n = self.state_dim;
        check_len(control.len(), self.input_dim, "control vector")?;
        check_len(self.mean.len(), n, "mean")?;
        check_square(&self.cov, n, "state covariance")?;
        check_square(&self.process_noise, n, "process noise covariance")?;

        let P = match self.regularization {
            Some(eps) => ensure_positive_finite(&self.cov, eps),
            None => self.cov.clone(),
        };
        self.cubature_points = cubature_points(&self.mean, &P).map_err(|err| match err {
            FilterError::NonPositiveDefinite { .. } => FilterError::NonPositiveDefinite {
                context: "state covariance".to_string(),
            },
            other => other,
        })?;

        for i in 0..2 * n {
            let x = self.cubature_points.row(i).transpose();
            let fx = self.system.f(&x, control);
            check_len(fx.len(), n, "transition function output")?;
            self.cubature_points.row_mut(i).copy_from(&fx.transpose());
        }

        let mut mean_pred = DVector::zeros(n);
        for (&w, xi) in izip!(self.weights.iter(), self.cubature_points.row_iter()) {
            mean_pred += xi.transpose() * w;
        }
        let mut cov_pred = DMatrix::zeros(n, n);
        for (&w, xi) in izip!(self.weights.iter(), self.cubature_points.row_iter()) {
            let x = xi.transpose();
            cov_pred += (&x * x.transpose()) * w;
        }
        cov_pred -= &mean_pred * mean_pred.transpose();
        cov_pred += &self.process_noise;

        self.mean = mean_pred;
        self.cov = cov_pred;
        Ok(())
    }

    /// Fuse a measurement into the belief.
    ///
    /// The belief is augmented with a zero-mean measurement-noise block so
    /// that the noise is carried through the nonlinear measurement
    /// function by the cubature points themselves; the Kalman gain is then
    /// computed against the expected-measurement covariance and the
    /// updated state is read back out of the augmented blocks.
    pub fn correct(&mut self, measurement: &DVector<f64>) -> Result<(), FilterError> {
        let n = self.state_dim;
        let k = self.measurement_dim;
        let e = n + k;
        check_len(measurement.len(), k, "measurement vector")?;
        check_len(self.mean.len(), n, "mean")?;
        check_square(&self.cov, n, "state covariance")?;
        check_square(&self.measurement_noise, k, "measurement noise covariance")?;

        // state ⊕ measurement-noise, the two blocks uncorrelated
        let mut ext_mean = DVector::zeros(e);
        ext_mean.rows_mut(0, n).copy_from(&self.mean);
        let mut ext_cov = DMatrix::zeros(e, e);
        ext_cov.view_mut((0, 0), (n, n)).copy_from(&self.cov);
        ext_cov
            .view_mut((n, n), (k, k))
            .copy_from(&self.measurement_noise);
        if let Some(eps) = self.regularization {
            ext_cov = ensure_positive_finite(&ext_cov, eps);
        }

        self.ext_cubature_points = cubature_points(&ext_mean, &ext_cov).map_err(|err| match err {
            FilterError::NonPositiveDefinite { .. } => FilterError::NonPositiveDefinite {
                context: "augmented covariance".to_string(),
            },
            other => other,
        })?;

        let mut expected_measurements = DMatrix::zeros(2 * e, k);
        for i in 0..2 * e {
            let p = self.ext_cubature_points.row(i).transpose();
            let hx = self.system.h(&p.rows(0, n).clone_owned());
            check_len(hx.len(), k, "measurement function output")?;
            let z = hx + p.rows(n, k);
            expected_measurements.row_mut(i).copy_from(&z.transpose());
        }

        let mut expected_measurement_mean = DVector::zeros(k);
        for (&w, zi) in izip!(self.ext_weights.iter(), expected_measurements.row_iter()) {
            expected_measurement_mean += zi.transpose() * w;
        }
        // The noise block already carries R through the points, so the
        // recombined covariance is the full innovation covariance.
        let mut expected_measurement_cov = DMatrix::zeros(k, k);
        for (&w, zi) in izip!(self.ext_weights.iter(), expected_measurements.row_iter()) {
            let z = zi.transpose();
            expected_measurement_cov += (&z * z.transpose()) * w;
        }
        expected_measurement_cov -= &expected_measurement_mean * expected_measurement_mean.transpose();

        let mut cross_cov = DMatrix::zeros(e, k);
        for (&w, xi, zi) in izip!(
            self.ext_weights.iter(),
            self.ext_cubature_points.row_iter(),
            expected_measurements.row_iter()
        ) {
            let x = xi.transpose();
            let z = zi.transpose();
            cross_cov += (&x * z.transpose()) * w;
        }
        cross_cov -= &ext_mean * expected_measurement_mean.transpose();

        let W = innovation_gain(&cross_cov, &expected_measurement_cov)?;

        let ext_mean_upd = &ext_mean + &W * (measurement - &expected_measurement_mean);
        let ext_cov_upd = &ext_cov - &W * &expected_measurement_cov * W.transpose();

        self.mean = ext_mean_upd.rows(0, n).clone_owned();
        self.cov = ext_cov_upd.view((0, 0), (n, n)).clone_owned();
        self.kalman_gain = Some(W.rows(0, n).clone_owned());
        Ok(())
    }

    /*			getters			*/
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }
    /// Cubature points from the last predict, rows are points
    pub fn cubature_points(&self) -> &DMatrix<f64> {
        &self.cubature_points
    }
    /// Augmented cubature points from the last correct
    pub fn ext_cubature_points(&self) -> &DMatrix<f64> {
        &self.ext_cubature_points
    }
    pub fn process_noise_cov(&self) -> &DMatrix<f64> {
        &self.process_noise
    }
    pub fn measurement_noise_cov(&self) -> &DMatrix<f64> {
        &self.measurement_noise
    }
    /// State block of the gain from the last correct, None before the
    /// first correct
    pub fn kalman_gain(&self) -> Option<&DMatrix<f64>> {
        self.kalman_gain.as_ref()
    }
    pub fn system(&self) -> &S {
        &self.system
    }
    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }
    pub fn measurement_dim(&self) -> usize {
        self.measurement_dim
    }

    /*			setters			*/
    /// Replacements are validated against the construction dimensions at
    /// the next predict/correct.
    pub fn set_mean(&mut self, m: DVector<f64>) -> &mut Self {
        self.mean = m;
        self
    }
    pub fn set_cov(&mut self, P: DMatrix<f64>) -> &mut Self {
        self.cov = P;
        self
    }
    pub fn set_process_noise_cov(&mut self, Q: DMatrix<f64>) -> &mut Self {
        self.process_noise = Q;
        self
    }
    pub fn set_measurement_noise_cov(&mut self, R: DMatrix<f64>) -> &mut Self {
        self.measurement_noise = R;
        self
    }
    /// Eigenvalue floor applied to covariances before factorization;
    /// None disables regularization (the default).
    pub fn set_regularization(&mut self, eps: Option<f64>) -> &mut Self {
        self.regularization = eps;
        self
    }
}
