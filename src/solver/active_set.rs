//! Primal active-set method for the long-only portfolio QP.
//!
//! Starting from a feasible point, each iteration solves the
//! equality-constrained subproblem on the current working set via its KKT
//! system:
//!
//! ```text
//! [ G  A' ] [ p  ]   [ -G w ]
//! [ A  0  ] [ nu ] = [  0   ]        G = 2 (C + rI)
//! ```
//!
//! where `A` stacks the budget row and the working-set normals. A blocked
//! step adds the blocking constraint; a full step checks the multipliers
//! `lambda = -nu` and drops the most negative one.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use super::{check_target, Backend, ConstraintKind, QpBackend, Settings, Solution};
use crate::error::{FrontierError, Result};
use crate::linalg;
use crate::model::MeanReturns;
use crate::problem::{QpInstance, BUDGET, LOWER_BOUND, UPPER_BOUND};

/// Native active-set solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveSetSolver;

impl QpBackend for ActiveSetSolver {
    fn kind(&self) -> Backend {
        Backend::ActiveSet
    }

    fn solve(&self, instance: &QpInstance<'_>, settings: &Settings) -> Result<Solution> {
        settings.validate()?;
        let n = instance.dim();
        let mean = instance.mean();
        let eps = settings.epsilon;
        let (lo, hi) = (mean.min(), mean.max());

        check_target(instance, eps)?;
        let mut target = instance.target_return();

        if n == 1 {
            let w = DVector::from_element(1, BUDGET);
            return Solution::from_weights(instance, w, eps, 0, Backend::ActiveSet);
        }
        // With identical returns the budget already fixes mu' w.
        if hi - lo <= eps {
            target = None;
        }

        let (w, working) = match initial_point(mean, target, eps) {
            Start::Vertex(k) => {
                debug!(asset = k, "target return only attainable by a single asset");
                let mut w = DVector::zeros(n);
                w[k] = BUDGET;
                return Solution::from_weights(instance, w, eps, 0, Backend::ActiveSet);
            }
            Start::Feasible { w, working } => (w, working),
        };

        let mut state = WorkingSet {
            g: hessian(instance, settings.regularization),
            mean: mean.as_vector(),
            target,
            w,
            working,
            eps,
            pivot_tolerance: settings.pivot_tolerance,
        };

        let max_iter = settings.max_iterations(n);
        for iteration in 1..=max_iter {
            if state.iterate(iteration, settings.verbose)? {
                debug!(
                    iterations = iteration,
                    active = state.working.len(),
                    "active-set converged"
                );
                return Solution::from_weights(
                    instance,
                    state.w,
                    eps,
                    iteration,
                    Backend::ActiveSet,
                );
            }
        }

        Err(FrontierError::IterationLimitExceeded {
            iterations: max_iter,
        })
    }
}

/// Feasible starting point.
#[derive(Debug)]
enum Start {
    /// The feasible set is the single vertex `e_k`.
    Vertex(usize),
    /// A feasible point and the constraints active there.
    Feasible {
        w: DVector<f64>,
        working: Vec<ConstraintKind>,
    },
}

/// Pick a feasible start.
///
/// Equal weights when they meet the target; otherwise a blend of equal
/// weights and the highest-return asset that meets the target exactly.
/// When the target equals the largest return, only the assets attaining it
/// may hold weight.
fn initial_point(mean: &MeanReturns, target: Option<f64>, eps: f64) -> Start {
    let n = mean.len();
    let equal = DVector::from_element(n, BUDGET / n as f64);
    let Some(t) = target else {
        return Start::Feasible {
            w: equal,
            working: Vec::new(),
        };
    };

    let avg = equal.dot(mean.as_vector());
    if avg >= t - eps {
        return Start::Feasible {
            w: equal,
            working: Vec::new(),
        };
    }

    let hi = mean.max();
    if t >= hi - eps {
        let top: Vec<usize> = (0..n).filter(|&i| mean[i] >= hi - eps).collect();
        if top.len() == 1 {
            return Start::Vertex(top[0]);
        }
        let mut w = DVector::zeros(n);
        for &i in &top {
            w[i] = BUDGET / top.len() as f64;
        }
        let working = (0..n)
            .filter(|i| !top.contains(i))
            .map(ConstraintKind::Lower)
            .collect();
        return Start::Feasible { w, working };
    }

    let k = mean.argmax();
    let s = (t - avg) / (hi - avg);
    let mut w = equal * (1.0 - s);
    w[k] += s;
    Start::Feasible {
        w,
        working: vec![ConstraintKind::MinReturn],
    }
}

/// Objective Hessian `2 (C + rI)`.
fn hessian(instance: &QpInstance<'_>, ridge: f64) -> DMatrix<f64> {
    let n = instance.dim();
    let mut g = instance.cov().as_matrix() * 2.0;
    if ridge > 0.0 {
        for i in 0..n {
            g[(i, i)] += 2.0 * ridge;
        }
    }
    g
}

impl ConstraintKind {
    /// a' v for the constraint normal `a` of `a' w >= b`.
    fn normal_dot(&self, mean: &DVector<f64>, v: &DVector<f64>) -> f64 {
        match *self {
            ConstraintKind::MinReturn => mean.dot(v),
            ConstraintKind::Lower(i) => v[i],
            ConstraintKind::Upper(i) => -v[i],
        }
    }

    /// Right-hand side `b` of `a' w >= b`.
    fn rhs(&self, target: f64) -> f64 {
        match *self {
            ConstraintKind::MinReturn => target,
            ConstraintKind::Lower(_) => LOWER_BOUND,
            ConstraintKind::Upper(_) => -UPPER_BOUND,
        }
    }

    /// Write the normal into row `row` and column `row` of a KKT matrix.
    fn fill_kkt(&self, kkt: &mut DMatrix<f64>, mean: &DVector<f64>, row: usize) {
        match *self {
            ConstraintKind::MinReturn => {
                for (i, &m) in mean.iter().enumerate() {
                    kkt[(row, i)] = m;
                    kkt[(i, row)] = m;
                }
            }
            ConstraintKind::Lower(i) => {
                kkt[(row, i)] = 1.0;
                kkt[(i, row)] = 1.0;
            }
            ConstraintKind::Upper(i) => {
                kkt[(row, i)] = -1.0;
                kkt[(i, row)] = -1.0;
            }
        }
    }
}

/// Per-solve iteration state.
struct WorkingSet<'a> {
    g: DMatrix<f64>,
    mean: &'a DVector<f64>,
    target: Option<f64>,
    w: DVector<f64>,
    working: Vec<ConstraintKind>,
    eps: f64,
    pivot_tolerance: f64,
}

impl WorkingSet<'_> {
    /// Run one iteration. Returns `true` once the iterate is optimal.
    fn iterate(&mut self, iteration: usize, verbose: bool) -> Result<bool> {
        let (p, nu) = self.kkt_step()?;

        let (alpha, blocking) = self.ratio_test(&p);
        self.w.axpy(alpha, &p, 1.0);

        if verbose {
            debug!(iteration, alpha, blocking = ?blocking, working = ?self.working, "active-set step");
        } else {
            trace!(iteration, alpha, working = self.working.len(), "active-set step");
        }

        if let Some(c) = blocking {
            self.working.push(c);
            return Ok(false);
        }

        // Full step: nu[0] belongs to the budget row, the rest follow the
        // working set order.
        let most_negative = (0..self.working.len())
            .map(|j| (j, -nu[j + 1]))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match most_negative {
            Some((j, lambda)) if lambda < -self.eps => {
                let dropped = self.working.remove(j);
                trace!(iteration, ?dropped, lambda, "dropping constraint");
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Solve the KKT system for the step `p` and multipliers `nu`.
    fn kkt_step(&self) -> Result<(DVector<f64>, DVector<f64>)> {
        let n = self.w.len();
        let m = 1 + self.working.len();
        let mut kkt = DMatrix::zeros(n + m, n + m);
        kkt.view_mut((0, 0), (n, n)).copy_from(&self.g);

        for i in 0..n {
            kkt[(n, i)] = 1.0;
            kkt[(i, n)] = 1.0;
        }
        for (j, c) in self.working.iter().enumerate() {
            c.fill_kkt(&mut kkt, self.mean, n + 1 + j);
        }

        let grad = linalg::mat_vec(&self.g, &self.w);
        let mut rhs = DVector::zeros(n + m);
        for i in 0..n {
            rhs[i] = -grad[i];
        }

        let sol = linalg::solve_symmetric(&kkt, &rhs, self.pivot_tolerance)?;
        let p = sol.rows(0, n).into_owned();
        let nu = sol.rows(n, m).into_owned();
        Ok((p, nu))
    }

    /// Largest step in [0, 1] along `p` keeping inactive constraints
    /// satisfied, and the constraint that blocks it.
    fn ratio_test(&self, p: &DVector<f64>) -> (f64, Option<ConstraintKind>) {
        let n = self.w.len();
        let mut alpha = 1.0;
        let mut blocking = None;

        let candidates = self
            .target
            .map(|_| ConstraintKind::MinReturn)
            .into_iter()
            .chain((0..n).map(ConstraintKind::Lower))
            .chain((0..n).map(ConstraintKind::Upper));

        for c in candidates {
            if self.working.contains(&c) {
                continue;
            }
            let ap = c.normal_dot(self.mean, p);
            if ap >= -self.eps {
                continue;
            }
            let slack = c.normal_dot(self.mean, &self.w) - c.rhs(self.target.unwrap_or(0.0));
            let step = slack.max(0.0) / -ap;
            if step < alpha {
                alpha = step;
                blocking = Some(c);
            }
        }

        (alpha, blocking)
    }
}
