//! Clarabel reference backend.
//!
//! Hands the portfolio QP to the Clarabel interior-point solver in its conic
//! form:
//!
//! ```text
//! minimize    (1/2) w' P w          P = 2C (upper triangle)
//! subject to  A w + s = b,  s in K
//! ```
//!
//! with the budget row in the zero cone and the return and box constraints in
//! the nonnegative cone.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra::DVector;
use tracing::debug;

use super::{check_target, Backend, QpBackend, Settings, Solution};
use crate::error::{FrontierError, Result};
use crate::problem::{QpInstance, BUDGET, LOWER_BOUND, UPPER_BOUND};
use crate::sparse::{dense_upper_to_csc, Triplets};

/// Clarabel-backed solver.
#[derive(Debug, Clone)]
pub struct ClarabelBackend {
    /// Maximum interior-point iterations.
    pub max_iter: u32,
    /// Absolute duality gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality gap tolerance.
    pub tol_gap_rel: f64,
    /// Distance from a bound within which a weight is snapped onto it.
    pub bound_tolerance: f64,
}

impl Default for ClarabelBackend {
    fn default() -> Self {
        ClarabelBackend {
            max_iter: 200,
            tol_gap_abs: 1e-10,
            tol_gap_rel: 1e-10,
            bound_tolerance: 1e-6,
        }
    }
}

/// Conic data for Clarabel.
#[derive(Debug)]
struct ConicProblem {
    p: ClarabelCsc<f64>,
    q: Vec<f64>,
    a: ClarabelCsc<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl QpBackend for ClarabelBackend {
    fn kind(&self) -> Backend {
        Backend::Clarabel
    }

    fn solve(&self, instance: &QpInstance<'_>, settings: &Settings) -> Result<Solution> {
        settings.validate()?;
        check_target(instance, settings.epsilon)?;

        let conic = stuff(instance);
        let clarabel_settings = DefaultSettingsBuilder::default()
            .verbose(settings.verbose)
            .max_iter(self.max_iter)
            .tol_gap_abs(self.tol_gap_abs)
            .tol_gap_rel(self.tol_gap_rel)
            .build()
            .map_err(|e| FrontierError::InvalidInput(format!("clarabel settings: {}", e)))?;

        let mut solver = DefaultSolver::new(
            &conic.p,
            &conic.q,
            &conic.a,
            &conic.b,
            &conic.cones,
            clarabel_settings,
        );
        solver.solve();

        let status = solver.solution.status;
        let iterations = solver.info.iterations as usize;
        debug!(?status, iterations, "clarabel finished");

        match status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                let w = DVector::from_column_slice(&solver.solution.x);
                Solution::from_weights(
                    instance,
                    w,
                    self.bound_tolerance,
                    iterations,
                    Backend::Clarabel,
                )
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(
                FrontierError::Infeasible("clarabel reported primal infeasibility".into()),
            ),
            SolverStatus::MaxIterations | SolverStatus::MaxTime => {
                Err(FrontierError::IterationLimitExceeded { iterations })
            }
            other => Err(FrontierError::NumericalError(format!(
                "clarabel terminated with status {:?}",
                other
            ))),
        }
    }
}

/// Build P, q, A, b and the cone list for an instance.
fn stuff(instance: &QpInstance<'_>) -> ConicProblem {
    let n = instance.dim();
    let mean = instance.mean().as_vector();

    let mut a = Triplets::new(n);
    let mut b = Vec::new();
    let mut nonneg = 0;

    // sum(w) = 1
    a.push_row((0..n).map(|j| (j, 1.0)));
    b.push(BUDGET);

    // -mu' w <= -target
    if let Some(t) = instance.target_return() {
        a.push_row(mean.iter().enumerate().map(|(j, &m)| (j, -m)));
        b.push(-t);
        nonneg += 1;
    }

    // -w <= 0
    a.push_identity(-1.0);
    b.extend(std::iter::repeat(-LOWER_BOUND).take(n));

    // w <= 1
    a.push_identity(1.0);
    b.extend(std::iter::repeat(UPPER_BOUND).take(n));
    nonneg += 2 * n;

    debug_assert_eq!(a.nrows(), b.len());
    let a = a.into_csc();
    let p = dense_upper_to_csc(instance.cov().as_matrix(), 2.0);

    ConicProblem {
        p: to_clarabel_csc(&p),
        q: vec![0.0; n],
        a: to_clarabel_csc(&a),
        b,
        cones: vec![
            SupportedConeT::ZeroConeT(1),
            SupportedConeT::NonnegativeConeT(nonneg),
        ],
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}
