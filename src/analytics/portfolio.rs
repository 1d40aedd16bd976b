use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::liquidation::{LiquidationPipeline, PositionValuation};
use crate::models::Position;
use crate::risk::RiskLevel;

/// How many of the riskiest positions a report lists.
pub const MAX_CRITICAL_POSITIONS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthDistribution {
    pub safe: u64,
    pub warning: u64,
    pub critical: u64,
}

impl HealthDistribution {
    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Safe => self.safe += 1,
            RiskLevel::Warning => self.warning += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPosition {
    pub position_id: String,
    pub owner_address: String,
    pub health_factor: f64,
    pub collateral_usd: f64,
    pub debt_usd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    Warning,
    Critical,
}

impl SystemStatus {
    /// `healthy` with nothing liquidatable, `warning` under 10%, else `critical`.
    pub fn from_counts(total: u64, liquidatable: u64) -> Self {
        if liquidatable == 0 {
            SystemStatus::Healthy
        } else if liquidatable * 10 < total {
            SystemStatus::Warning
        } else {
            SystemStatus::Critical
        }
    }
}

/// Aggregate risk view over a set of evaluated positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub evaluated: u64,
    pub skipped: u64,
    pub liquidatable: u64,
    pub distribution: HealthDistribution,
    /// Mean health factor, rounded to two places. Zero when nothing evaluated.
    pub average_health_factor: f64,
    /// Riskiest critical positions, ascending by health factor.
    pub critical_positions: Vec<CriticalPosition>,
}

impl PortfolioReport {
    pub fn from_valuations(valuations: &[PositionValuation], skipped: u64) -> Self {
        let mut distribution = HealthDistribution::default();
        let mut liquidatable = 0;
        let mut sum = 0.0;
        let mut critical = Vec::new();

        for v in valuations {
            let hf = v.metrics.health_factor;
            let level = RiskLevel::from_health_factor(hf);
            distribution.record(level);
            sum += hf;
            if v.metrics.eligible {
                liquidatable += 1;
            }
            if level == RiskLevel::Critical {
                critical.push(CriticalPosition {
                    position_id: v.position.position_id.clone(),
                    owner_address: v.position.owner_address.clone(),
                    health_factor: hf,
                    collateral_usd: v.collateral_usd.to_f64().unwrap_or_default(),
                    debt_usd: v.debt_usd.to_f64().unwrap_or_default(),
                });
            }
        }

        critical.sort_by(|a, b| a.health_factor.total_cmp(&b.health_factor));
        critical.truncate(MAX_CRITICAL_POSITIONS);

        let evaluated = valuations.len() as u64;
        let average_health_factor = if evaluated == 0 {
            0.0
        } else {
            round2(sum / evaluated as f64)
        };

        Self {
            evaluated,
            skipped,
            liquidatable,
            distribution,
            average_health_factor,
            critical_positions: critical,
        }
    }
}

/// Evaluate every position through the pipeline. Positions whose
/// evaluation fails are logged and counted as skipped.
pub async fn assess_positions(pipeline: &LiquidationPipeline, positions: Vec<Position>) -> PortfolioReport {
    let mut valuations = Vec::with_capacity(positions.len());
    let mut skipped = 0;

    for position in positions {
        let position_id = position.position_id.clone();
        match pipeline.evaluate_position(position).await {
            Ok(v) => valuations.push(v),
            Err(e) => {
                skipped += 1;
                tracing::warn!(
                    position_id = %position_id,
                    kind = e.kind().as_str(),
                    error = %e,
                    "Skipping position in risk report"
                );
            }
        }
    }

    PortfolioReport::from_valuations(&valuations, skipped)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::NewPosition;
    use crate::pricing::FixedPriceResolver;
    use crate::store::{InMemoryStore, PositionStore};

    async fn seeded(rows: &[(&str, &str, &str, &str)]) -> (LiquidationPipeline, Vec<Position>) {
        let store = Arc::new(InMemoryStore::new());
        for (id, collateral_symbol, collateral_amount, debt_amount) in rows {
            store
                .create(NewPosition {
                    position_id: id.to_string(),
                    owner_address: "0x1234567890123456789012345678901234567890".into(),
                    collateral_symbol: collateral_symbol.to_string(),
                    collateral_amount: collateral_amount.to_string(),
                    debt_symbol: "USDC".into(),
                    debt_amount: debt_amount.to_string(),
                })
                .await
                .unwrap();
        }
        let positions = PositionStore::list(&*store, 100, 0).await.unwrap();
        let pipeline = LiquidationPipeline::new(store, Arc::new(FixedPriceResolver::reference()));
        (pipeline, positions)
    }

    #[test]
    fn test_system_status_thresholds() {
        assert_eq!(SystemStatus::from_counts(0, 0), SystemStatus::Healthy);
        assert_eq!(SystemStatus::from_counts(100, 0), SystemStatus::Healthy);
        assert_eq!(SystemStatus::from_counts(100, 9), SystemStatus::Warning);
        assert_eq!(SystemStatus::from_counts(100, 10), SystemStatus::Critical);
        assert_eq!(SystemStatus::from_counts(1, 1), SystemStatus::Critical);
    }

    #[tokio::test]
    async fn test_distribution_and_ordering() {
        let (pipeline, positions) = seeded(&[
            ("safe", "ETH", "10", "1000"),   // 25.5
            ("warn", "ETH", "1", "2000"),    // 1.275
            ("crit_a", "ETH", "1", "5000"),  // 0.51
            ("crit_b", "ETH", "1", "3000"),  // 0.85
            ("nodebt", "ETH", "1", "0"),     // 10.0
        ])
        .await;

        let report = assess_positions(&pipeline, positions).await;
        assert_eq!(report.evaluated, 5);
        assert_eq!(report.skipped, 0);
        assert_eq!(
            report.distribution,
            HealthDistribution { safe: 2, warning: 1, critical: 2 }
        );
        assert_eq!(report.liquidatable, 2);

        let ids: Vec<_> = report.critical_positions.iter().map(|c| c.position_id.as_str()).collect();
        assert_eq!(ids, vec!["crit_a", "crit_b"]);
        assert_eq!(report.critical_positions[0].collateral_usd, 3000.0);

        // (25.5 + 1.275 + 0.51 + 0.85 + 10.0) / 5 = 7.627
        assert_eq!(report.average_health_factor, 7.63);
    }

    #[tokio::test]
    async fn test_failed_positions_are_skipped() {
        let (pipeline, positions) = seeded(&[
            ("good", "ETH", "1", "5000"),
            ("bad", "DOGE", "1", "5000"),
        ])
        .await;

        let report = assess_positions(&pipeline, positions).await;
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_critical_list_is_capped() {
        let rows: Vec<(String, &str, &str, String)> = (0..15)
            .map(|i| (format!("p{i}"), "ETH", "1", format!("{}", 4000 + i * 100)))
            .collect();
        let borrowed: Vec<(&str, &str, &str, &str)> = rows
            .iter()
            .map(|(id, sym, amt, debt)| (id.as_str(), *sym, *amt, debt.as_str()))
            .collect();
        let (pipeline, positions) = seeded(&borrowed).await;

        let report = assess_positions(&pipeline, positions).await;
        assert_eq!(report.critical_positions.len(), MAX_CRITICAL_POSITIONS);
        // highest debt is riskiest
        assert_eq!(report.critical_positions[0].position_id, "p14");
    }

    #[test]
    fn test_empty_report() {
        let report = PortfolioReport::from_valuations(&[], 0);
        assert_eq!(report.average_health_factor, 0.0);
        assert!(report.critical_positions.is_empty());
    }
}
