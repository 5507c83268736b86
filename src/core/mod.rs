mod advisor;
mod engine;
mod financing;
mod types;

pub use advisor::{AdvisorInputs, AdvisorRule, Finding, RULES, assess_deal, classify_deal};
pub use engine::{
    breakeven_month, compute_incentives, compute_tou_savings, financed_principal, run_projection,
    simulate, utility_rebate_potential,
};
pub use financing::{
    Amortization, DEFAULT_FINANCING_TIER, FINANCING_TIERS, FinancingTier, LoanInstallment,
    financing_tier, monthly_payment,
};
pub use types::{
    DEFAULT_UTILITY_ESCALATION_RATE, DealAssessment, DealTier, FinancingTerms, IncentiveFlags,
    IncentiveResult, MAX_LOAN_TERM_YEARS, MonthlyComparison, MonthlyPoint, PROJECTION_MONTHS,
    ProjectionReport, ProjectionSummary, RoiAnalysis, SavingsSummary, Simulation,
    SystemConfiguration, TouArbitrage, TouSavings,
};
