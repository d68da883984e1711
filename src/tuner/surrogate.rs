//! Proposal strategies for the search phase.
//!
//! The optimizer only sees [`Proposer::suggest`]. The default implementation
//! fits a Gaussian process to every `(point, score)` pair observed so far and
//! returns the candidate with the highest expected improvement.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tuner::evaluation::EvaluationResult;
use crate::tuner::space::{SearchPoint, SearchSpace};

/// Chooses the next point to evaluate from the history so far.
pub trait Proposer {
    fn suggest(&mut self, space: &SearchSpace, history: &[EvaluationResult]) -> SearchPoint;
}

/// Uniform random proposals.
pub struct RandomProposer {
    rng: StdRng,
}

impl RandomProposer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Proposer for RandomProposer {
    fn suggest(&mut self, space: &SearchSpace, _history: &[EvaluationResult]) -> SearchPoint {
        space.sample(&mut self.rng)
    }
}

/// Settings for [`GaussianProcessProposer`].
#[derive(Debug, Clone)]
pub struct GpConfig {
    /// Uniform random candidates scored per proposal.
    pub random_candidates: usize,
    /// Candidates drawn around the incumbent per proposal.
    pub local_candidates: usize,
    /// Half-width of the local neighbourhood, in unit-cube coordinates.
    pub local_radius: f64,
    /// Length scales tried when fitting; the best marginal likelihood wins.
    pub length_scales: Vec<f64>,
    /// Observation noise added to the kernel diagonal.
    pub noise: f64,
    /// Exploration margin for expected improvement.
    pub xi: f64,
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            random_candidates: 1000,
            local_candidates: 200,
            local_radius: 0.1,
            length_scales: vec![0.05, 0.1, 0.2, 0.35, 0.5, 0.75, 1.0, 1.5],
            noise: 1e-6,
            xi: 0.01,
        }
    }
}

/// Gaussian-process surrogate with expected-improvement acquisition.
pub struct GaussianProcessProposer {
    config: GpConfig,
    rng: StdRng,
}

impl GaussianProcessProposer {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, GpConfig::default())
    }

    pub fn with_config(seed: u64, config: GpConfig) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn candidates(&mut self, space: &SearchSpace, incumbent: &[f64; 3]) -> Vec<[f64; 3]> {
        let mut out = Vec::with_capacity(self.config.random_candidates + self.config.local_candidates);
        for _ in 0..self.config.random_candidates {
            let unit: [f64; 3] = [self.rng.r#gen(), self.rng.r#gen(), self.rng.r#gen()];
            out.push(snap(space, &unit));
        }
        let r = self.config.local_radius;
        for _ in 0..self.config.local_candidates {
            let unit = incumbent.map(|x| x + self.rng.gen_range(-r..=r));
            out.push(snap(space, &unit));
        }
        out
    }
}

/// Round a unit-cube point through the space so integer dimensions land on grid values.
fn snap(space: &SearchSpace, unit: &[f64; 3]) -> [f64; 3] {
    space.to_unit(&space.from_unit(unit))
}

impl Proposer for GaussianProcessProposer {
    fn suggest(&mut self, space: &SearchSpace, history: &[EvaluationResult]) -> SearchPoint {
        if history.len() < 2 {
            return space.sample(&mut self.rng);
        }

        let xs: Vec<[f64; 3]> = history.iter().map(|r| space.to_unit(&r.point)).collect();
        let ys: Vec<f64> = history.iter().map(|r| r.score).collect();

        let Some(gp) = GaussianProcess::fit(&xs, &ys, &self.config.length_scales, self.config.noise)
        else {
            tracing::warn!("surrogate fit failed, falling back to a random proposal");
            return space.sample(&mut self.rng);
        };
        tracing::debug!(
            length_scale = gp.length_scale,
            observations = xs.len(),
            "fitted surrogate"
        );

        let best = ys
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let best_y = gp.standardize(ys[best]);

        let mut chosen = xs[best];
        let mut chosen_ei = f64::NEG_INFINITY;
        for candidate in self.candidates(space, &xs[best]) {
            let (mean, sd) = gp.predict(&candidate);
            let ei = expected_improvement(mean, sd, best_y, self.config.xi);
            if ei > chosen_ei {
                chosen_ei = ei;
                chosen = candidate;
            }
        }

        space.from_unit(&chosen)
    }
}

/// Expected reduction below `best` (minimization).
pub fn expected_improvement(mean: f64, sd: f64, best: f64, xi: f64) -> f64 {
    let improvement = best - mean - xi;
    if sd <= 1e-12 {
        return improvement.max(0.0);
    }
    let z = improvement / sd;
    improvement * normal_cdf(z) + sd * normal_pdf(z)
}

fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26; absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Zero-mean GP with a squared-exponential kernel on standardized targets.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    xs: Vec<[f64; 3]>,
    chol: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    y_mean: f64,
    y_std: f64,
    pub length_scale: f64,
}

impl GaussianProcess {
    /// Fit one model per candidate length scale and keep the most likely.
    pub fn fit(xs: &[[f64; 3]], ys: &[f64], length_scales: &[f64], noise: f64) -> Option<Self> {
        if xs.is_empty() || xs.len() != ys.len() {
            return None;
        }
        let n = ys.len() as f64;
        let y_mean = ys.iter().sum::<f64>() / n;
        let var = ys.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n;
        let y_std = if var.sqrt() > 1e-12 { var.sqrt() } else { 1.0 };
        let targets: Vec<f64> = ys.iter().map(|y| (y - y_mean) / y_std).collect();

        let mut best: Option<(f64, GaussianProcess)> = None;
        for &length_scale in length_scales {
            let Some((chol, alpha, log_likelihood)) =
                Self::factorize(xs, &targets, length_scale, noise)
            else {
                continue;
            };
            if best.as_ref().is_none_or(|(ll, _)| log_likelihood > *ll) {
                best = Some((
                    log_likelihood,
                    GaussianProcess {
                        xs: xs.to_vec(),
                        chol,
                        alpha,
                        y_mean,
                        y_std,
                        length_scale,
                    },
                ));
            }
        }
        best.map(|(_, gp)| gp)
    }

    fn factorize(
        xs: &[[f64; 3]],
        targets: &[f64],
        length_scale: f64,
        noise: f64,
    ) -> Option<(Vec<Vec<f64>>, Vec<f64>, f64)> {
        let n = xs.len();
        let mut jitter = noise;
        for _ in 0..6 {
            let mut k = vec![vec![0.0; n]; n];
            for i in 0..n {
                for j in 0..n {
                    k[i][j] = kernel(&xs[i], &xs[j], length_scale);
                }
                k[i][i] += jitter;
            }
            if let Some(chol) = cholesky(&k) {
                let alpha = solve_upper_t(&chol, &solve_lower(&chol, targets));
                let data_fit: f64 = targets.iter().zip(&alpha).map(|(y, a)| y * a).sum();
                let log_det: f64 = (0..n).map(|i| chol[i][i].ln()).sum();
                let log_likelihood =
                    -0.5 * data_fit - log_det - 0.5 * n as f64 * (2.0 * PI).ln();
                return Some((chol, alpha, log_likelihood));
            }
            // Duplicate points make the kernel matrix singular.
            jitter = (jitter * 10.0).max(1e-10);
        }
        None
    }

    pub fn standardize(&self, y: f64) -> f64 {
        (y - self.y_mean) / self.y_std
    }

    /// Posterior mean and standard deviation, in standardized units.
    pub fn predict(&self, x: &[f64; 3]) -> (f64, f64) {
        let k_star: Vec<f64> = self
            .xs
            .iter()
            .map(|xi| kernel(xi, x, self.length_scale))
            .collect();
        let mean = k_star.iter().zip(&self.alpha).map(|(k, a)| k * a).sum::<f64>();
        let v = solve_lower(&self.chol, &k_star);
        let var = (1.0 - v.iter().map(|x| x * x).sum::<f64>()).max(1e-12);
        (mean, var.sqrt())
    }

    /// Posterior mean in the original score units.
    pub fn predict_score(&self, x: &[f64; 3]) -> f64 {
        self.predict(x).0 * self.y_std + self.y_mean
    }
}

fn kernel(a: &[f64; 3], b: &[f64; 3], length_scale: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-0.5 * sq / (length_scale * length_scale)).exp()
}

/// Lower-triangular `L` with `L * L^T = a`, or `None` if `a` is not positive definite.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = a[i][i] - dot;
                if d <= 0.0 || !d.is_finite() {
                    return None;
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - dot) / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L x = b`.
fn solve_lower(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = vec![0.0; n];
    for i in 0..n {
        let dot: f64 = (0..i).map(|k| l[i][k] * x[k]).sum();
        x[i] = (b[i] - dot) / l[i][i];
    }
    x
}

/// Solve `L^T x = b`.
fn solve_upper_t(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let dot: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (b[i] - dot) / l[i][i];
    }
    x
}
