//! # efficient-frontier
//!
//! Markowitz mean-variance portfolio optimization in Rust.
//!
//! The crate finds long-only, fully invested minimum-variance portfolios with
//! a native active-set quadratic programming solver, and traces the efficient
//! frontier by sweeping the required return.
//!
//! ## Quick Start
//!
//! ```ignore
//! use efficient_frontier::prelude::*;
//!
//! let mu = MeanReturns::from_vec(vec![0.08, 0.12, 0.15])?;
//! let cov = CovarianceMatrix::from_row_slice(3, &[/* 3x3 covariance */])?;
//!
//! // One portfolio
//! let solution = QpInstance::builder(&mu, &cov)
//!     .target_return(0.12)
//!     .solve()?;
//! println!("risk: {}", solution.std_dev);
//!
//! // The whole frontier
//! let frontier = FrontierSweeper::new(SweepSettings::default().with_points(20))
//!     .sweep(&mu, &cov)?;
//! ```
//!
//! ## The Problem
//!
//! ```text
//! minimize    w' C w
//! subject to  sum(w) = 1
//!             mu' w >= target      (optional)
//!             0 <= w <= 1
//! ```
//!
//! ## Architecture
//!
//! - **Linear algebra** helpers over nalgebra with singularity detection
//! - **Active-set solver** working on the KKT system of the current working set
//! - **Clarabel backend** solving the same problem by interior point, for
//!   cross-checking
//! - **Frontier sweep** over evenly spaced targets, skipping failed points,
//!   optionally in parallel with rayon
//! - **Adapters** from price histories to statistics, and from frontiers to
//!   tables or JSON

pub mod error;
pub mod frontier;
pub mod linalg;
pub mod model;
pub mod problem;
pub mod report;
pub mod solver;
pub mod sparse;
pub mod stats;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use efficient_frontier::prelude::*;
/// ```
pub mod prelude {
    // Data model
    pub use crate::model::{AssetUniverse, CovarianceMatrix, MeanReturns, PortfolioWeights};

    // Problem
    pub use crate::problem::{QpInstance, QpInstanceBuilder};

    // Solvers
    pub use crate::solver::{
        ActiveSetSolver, Backend, ClarabelBackend, ConstraintKind, QpBackend, Settings, Solution,
    };

    // Frontier
    pub use crate::frontier::{
        efficient_frontier, Frontier, FrontierPoint, FrontierSweeper, SkippedPoint, SweepSettings,
    };

    // Adapters
    pub use crate::report::{sharpe_ratio, FrontierRenderer, JsonRenderer, TableRenderer};
    pub use crate::stats::ReturnStatistics;

    // Errors
    pub use crate::error::{FrontierError, Result};
}

// Re-export main types at crate root
pub use error::{FrontierError, Result};
pub use frontier::{efficient_frontier, Frontier, FrontierPoint, FrontierSweeper, SweepSettings};
pub use problem::QpInstance;
pub use solver::{Settings, Solution};
