//! Frontier presentation.
//!
//! Renderers turn a [`Frontier`] into text or JSON. Derived display metrics
//! such as the Sharpe ratio are computed here, not in the solver.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::frontier::Frontier;
use crate::model::AssetUniverse;

/// Risk below which the Sharpe ratio is reported as undefined.
pub const DEFAULT_RISK_EPSILON: f64 = 1e-12;

/// Sharpe ratio `(ret - risk_free) / risk`, or `None` when `risk < eps`.
pub fn sharpe_ratio(ret: f64, risk: f64, risk_free: f64, eps: f64) -> Option<f64> {
    if risk < eps {
        None
    } else {
        Some((ret - risk_free) / risk)
    }
}

/// Something that can present a frontier.
pub trait FrontierRenderer {
    /// Render every point of the frontier.
    fn render(&mut self, universe: &AssetUniverse, frontier: &Frontier) -> Result<()>;
}

/// Fixed-width text table.
#[derive(Debug)]
pub struct TableRenderer<W: Write> {
    out: W,
    risk_free: f64,
}

impl<W: Write> TableRenderer<W> {
    /// Create a renderer writing to `out`.
    pub fn new(out: W) -> Self {
        TableRenderer {
            out,
            risk_free: 0.0,
        }
    }

    /// Risk-free rate used for the Sharpe column.
    pub fn with_risk_free(mut self, risk_free: f64) -> Self {
        self.risk_free = risk_free;
        self
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrontierRenderer for TableRenderer<W> {
    fn render(&mut self, universe: &AssetUniverse, frontier: &Frontier) -> Result<()> {
        write!(self.out, "{:>10} {:>10} {:>10} {:>8}", "target", "return", "risk", "sharpe")?;
        for name in universe.names() {
            write!(self.out, " {:>8}", name)?;
        }
        writeln!(self.out)?;

        for point in &frontier.points {
            let sharpe = point
                .sharpe_ratio(self.risk_free, DEFAULT_RISK_EPSILON)
                .map(|s| format!("{:.4}", s))
                .unwrap_or_else(|| "-".into());
            write!(
                self.out,
                "{:>9.4}% {:>9.4}% {:>9.4}% {:>8}",
                point.target_return * 100.0,
                point.achieved_return * 100.0,
                point.achieved_risk * 100.0,
                sharpe
            )?;
            for (_, w) in point.weights.labeled(universe) {
                write!(self.out, " {:>7.2}%", w * 100.0)?;
            }
            writeln!(self.out)?;
        }

        if !frontier.skipped.is_empty() {
            writeln!(self.out, "({} target returns skipped)", frontier.skipped.len())?;
        }
        Ok(())
    }
}

/// JSON document of the frontier.
#[derive(Debug)]
pub struct JsonRenderer<W: Write> {
    out: W,
    risk_free: f64,
    pretty: bool,
}

#[derive(Serialize)]
struct FrontierDocument<'a> {
    assets: &'a [String],
    points: Vec<PointRecord<'a>>,
    skipped: Vec<SkippedRecord>,
}

#[derive(Serialize)]
struct PointRecord<'a> {
    target_return: f64,
    achieved_return: f64,
    achieved_risk: f64,
    sharpe: Option<f64>,
    weights: &'a [f64],
}

#[derive(Serialize)]
struct SkippedRecord {
    target_return: f64,
    reason: String,
}

impl<W: Write> JsonRenderer<W> {
    /// Create a renderer writing compact JSON to `out`.
    pub fn new(out: W) -> Self {
        JsonRenderer {
            out,
            risk_free: 0.0,
            pretty: false,
        }
    }

    /// Pretty-print the document.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Risk-free rate used for the Sharpe field.
    pub fn with_risk_free(mut self, risk_free: f64) -> Self {
        self.risk_free = risk_free;
        self
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FrontierRenderer for JsonRenderer<W> {
    fn render(&mut self, universe: &AssetUniverse, frontier: &Frontier) -> Result<()> {
        let doc = FrontierDocument {
            assets: universe.names(),
            points: frontier
                .points
                .iter()
                .map(|p| PointRecord {
                    target_return: p.target_return,
                    achieved_return: p.achieved_return,
                    achieved_risk: p.achieved_risk,
                    sharpe: p.sharpe_ratio(self.risk_free, DEFAULT_RISK_EPSILON),
                    weights: p.weights.as_slice(),
                })
                .collect(),
            skipped: frontier
                .skipped
                .iter()
                .map(|s| SkippedRecord {
                    target_return: s.target_return,
                    reason: s.error.to_string(),
                })
                .collect(),
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, &doc)?;
        } else {
            serde_json::to_writer(&mut self.out, &doc)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrontierError;
    use crate::frontier::{FrontierPoint, SkippedPoint};
    use crate::model::PortfolioWeights;
    use nalgebra::DVector;

    fn sample() -> (AssetUniverse, Frontier) {
        let universe = AssetUniverse::new(["A", "B"]).unwrap();
        let frontier = Frontier {
            points: vec![
                FrontierPoint {
                    target_return: 0.0,
                    achieved_return: 0.0,
                    achieved_risk: 0.0,
                    variance: 0.0,
                    weights: PortfolioWeights::new(DVector::from_vec(vec![1.0, 0.0])),
                },
                FrontierPoint {
                    target_return: 0.15,
                    achieved_return: 0.15,
                    achieved_risk: 0.18,
                    variance: 0.0324,
                    weights: PortfolioWeights::equal(2),
                },
            ],
            skipped: vec![SkippedPoint {
                target_return: 0.2,
                error: FrontierError::IterationLimitExceeded { iterations: 20 },
            }],
        };
        (universe, frontier)
    }

    #[test]
    fn test_sharpe_guard() {
        assert_eq!(sharpe_ratio(0.1, 0.0, 0.0, 1e-12), None);
        assert_eq!(sharpe_ratio(0.1, 1e-13, 0.0, 1e-12), None);
        let s = sharpe_ratio(0.12, 0.2, 0.02, 1e-12).unwrap();
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_table_renderer() {
        let (universe, frontier) = sample();
        let mut renderer = TableRenderer::new(Vec::new());
        renderer.render(&universe, &frontier).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("sharpe"));
        assert!(lines[0].ends_with("A        B"));
        assert!(lines[1].contains(" - "));
        assert!(lines[2].contains("0.8333"));
        assert!(lines[2].contains("50.00%"));
        assert_eq!(lines[3], "(1 target returns skipped)");
    }

    #[test]
    fn test_json_renderer() {
        let (universe, frontier) = sample();
        let mut renderer = JsonRenderer::new(Vec::new());
        renderer.render(&universe, &frontier).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&renderer.into_inner()).unwrap();
        assert_eq!(value["assets"][1], "B");
        assert_eq!(value["points"].as_array().unwrap().len(), 2);
        assert!(value["points"][0]["sharpe"].is_null());
        assert_eq!(value["points"][1]["weights"][0], 0.5);
        assert_eq!(value["skipped"][0]["target_return"], 0.2);
    }
}
