use super::types::{DealAssessment, DealTier, IncentiveFlags};

const MODEST_ROI_PERCENT: f64 = 20.0;
const GOOD_ROI_PERCENT: f64 = 50.0;
const EXCELLENT_ROI_PERCENT: f64 = 100.0;
const GRID_DEPENDENT_OFFSET_PERCENT: f64 = 50.0;
/// First-month overspend tolerated before the advisor flags it.
const MONTHLY_OVERSPEND_TOLERANCE: f64 = -20.0;

/// Figures the advisor needs from a finished projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisorInputs {
    pub savings_25yr: f64,
    pub roi_25yr: Option<f64>,
    pub solar_offset_percent: f64,
    pub monthly_difference: f64,
    pub incentives: IncentiveFlags,
    pub tou_enabled: bool,
    pub battery_included: bool,
    pub potential_utility_rebate: f64,
    pub potential_federal_credit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub issue: String,
    pub solutions: Vec<String>,
}

pub struct AdvisorRule {
    pub name: &'static str,
    pub check: fn(&AdvisorInputs) -> Option<Finding>,
}

pub static RULES: [AdvisorRule; 6] = [
    AdvisorRule {
        name: "negative-savings",
        check: negative_savings,
    },
    AdvisorRule {
        name: "modest-roi",
        check: modest_roi,
    },
    AdvisorRule {
        name: "grid-dependent",
        check: grid_dependent,
    },
    AdvisorRule {
        name: "higher-monthly-cost",
        check: higher_monthly_cost,
    },
    AdvisorRule {
        name: "missing-utility-rebate",
        check: missing_utility_rebate,
    },
    AdvisorRule {
        name: "missing-federal-credit",
        check: missing_federal_credit,
    },
];

pub fn assess_deal(inputs: &AdvisorInputs) -> DealAssessment {
    let mut issues = Vec::new();
    let mut solutions = Vec::new();
    for rule in &RULES {
        if let Some(finding) = (rule.check)(inputs) {
            issues.push(finding.issue);
            solutions.extend(finding.solutions);
        }
    }
    DealAssessment {
        has_issues: !issues.is_empty(),
        issues,
        solutions,
        tier: classify_deal(inputs.savings_25yr, inputs.roi_25yr),
    }
}

pub fn classify_deal(savings_25yr: f64, roi_25yr: Option<f64>) -> DealTier {
    if !savings_25yr.is_finite() || savings_25yr <= 0.0 {
        return DealTier::NotRecommended;
    }
    // No financed amount means any positive savings is pure return.
    let roi = roi_25yr.unwrap_or(f64::INFINITY);
    if roi > EXCELLENT_ROI_PERCENT {
        DealTier::Excellent
    } else if roi > GOOD_ROI_PERCENT {
        DealTier::Good
    } else if roi > MODEST_ROI_PERCENT {
        DealTier::Marginal
    } else {
        DealTier::Poor
    }
}

fn finding<S: Into<String>>(
    issue: impl Into<String>,
    solutions: impl IntoIterator<Item = S>,
) -> Finding {
    Finding {
        issue: issue.into(),
        solutions: solutions.into_iter().map(Into::into).collect(),
    }
}

fn negative_savings(inputs: &AdvisorInputs) -> Option<Finding> {
    (inputs.savings_25yr < 0.0).then(|| {
        finding(
            "System will cost more than staying with the utility over 25 years",
            [
                "Apply all available incentives (federal ITC + utility rebates)",
                "Consider a lower interest rate option",
                "Increase system size if roof space allows",
            ],
        )
    })
}

fn modest_roi(inputs: &AdvisorInputs) -> Option<Finding> {
    let roi = inputs.roi_25yr?;
    (roi < MODEST_ROI_PERCENT && inputs.savings_25yr > 0.0).then(|| {
        finding(
            "ROI is below 20%: very modest returns",
            [
                "Enable TOU rate arbitrage if customer has time-of-use rates",
                "Consider shorter loan term for less interest",
                "Select a better interest rate option",
            ],
        )
    })
}

fn grid_dependent(inputs: &AdvisorInputs) -> Option<Finding> {
    (inputs.solar_offset_percent < GRID_DEPENDENT_OFFSET_PERCENT).then(|| {
        finding(
            format!(
                "Solar offset is only {}%; customer still heavily dependent on grid",
                inputs.solar_offset_percent
            ),
            [
                "Increase system size to 75-95% offset for better savings",
                "Consider ground mount or carport if roof space limited",
            ],
        )
    })
}

fn higher_monthly_cost(inputs: &AdvisorInputs) -> Option<Finding> {
    if inputs.monthly_difference >= MONTHLY_OVERSPEND_TOLERANCE {
        return None;
    }
    let mut found = finding(
        format!(
            "First year cost is ${:.0}/month more than current bill",
            inputs.monthly_difference.abs()
        ),
        ["Emphasize equity building and long-term savings"],
    );
    if !inputs.tou_enabled && inputs.battery_included {
        found
            .solutions
            .push("Enable TOU arbitrage savings to improve monthly costs".to_string());
    }
    Some(found)
}

fn missing_utility_rebate(inputs: &AdvisorInputs) -> Option<Finding> {
    (!inputs.incentives.apply_utility_rebate).then(|| {
        finding(
            "Utility rebates not applied: missing significant incentives",
            [format!(
                "Enable utility rebates (worth ${:.0})",
                inputs.potential_utility_rebate
            )],
        )
    })
}

fn missing_federal_credit(inputs: &AdvisorInputs) -> Option<Finding> {
    (!inputs.incentives.apply_federal_itc).then(|| {
        finding(
            "Federal ITC not applied: missing 30% tax credit",
            [format!(
                "Enable federal ITC (worth ${:.0})",
                inputs.potential_federal_credit
            )],
        )
    })
}
