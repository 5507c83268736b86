use serde::Serialize;

/// Months covered by every projection (25 years).
pub const PROJECTION_MONTHS: usize = 300;

/// Escalation used by the comparison tool when the caller does not override it.
pub const DEFAULT_UTILITY_ESCALATION_RATE: f64 = 0.04;

/// Longest loan the projection models; longer terms are clamped.
pub const MAX_LOAN_TERM_YEARS: u32 = 50;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FinancingTerms {
    pub annual_rate_percent: f64,
    pub term_years: u32,
    pub dealer_fee: f64,
}

impl FinancingTerms {
    pub fn term_months(self) -> u32 {
        self.term_years.saturating_mul(12)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IncentiveFlags {
    pub apply_federal_itc: bool,
    pub apply_utility_rebate: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TouArbitrage {
    pub enabled: bool,
    pub on_peak_rate: f64,
    pub off_peak_rate: f64,
    pub cycles_per_year: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfiguration {
    pub monthly_utility_bill: f64,
    pub utility_service_fee: f64,
    pub hard_costs: f64,
    pub system_size_kw: f64,
    pub battery_included: bool,
    pub battery_capacity_kwh: f64,
    pub solar_offset_percent: f64,
    pub solar_service_fee: f64,
    pub financing: FinancingTerms,
    pub incentives: IncentiveFlags,
    pub tou_arbitrage: Option<TouArbitrage>,
    pub utility_escalation_rate: f64,
    /// Display-only replacement for the computed post-solar bill.
    pub bill_after_offset_override: Option<f64>,
}

impl SystemConfiguration {
    /// Hard costs plus the dealer fee of the selected financing.
    pub fn quoted_amount(&self) -> f64 {
        self.hard_costs + self.financing.dealer_fee
    }

    /// Utility bill remaining once solar covers its share of usage.
    pub fn offset_utility_bill(&self) -> f64 {
        self.monthly_utility_bill * (1.0 - self.solar_offset_percent / 100.0)
    }

    pub fn tou_enabled(&self) -> bool {
        self.tou_arbitrage.is_some_and(|tou| tou.enabled)
    }

    /// Copy with every non-finite number replaced by zero and the loan term clamped.
    pub fn sanitized(&self) -> Self {
        Self {
            monthly_utility_bill: finite_or_zero(self.monthly_utility_bill),
            utility_service_fee: finite_or_zero(self.utility_service_fee),
            hard_costs: finite_or_zero(self.hard_costs),
            system_size_kw: finite_or_zero(self.system_size_kw),
            battery_included: self.battery_included,
            battery_capacity_kwh: finite_or_zero(self.battery_capacity_kwh),
            solar_offset_percent: finite_or_zero(self.solar_offset_percent),
            solar_service_fee: finite_or_zero(self.solar_service_fee),
            financing: FinancingTerms {
                annual_rate_percent: finite_or_zero(self.financing.annual_rate_percent),
                term_years: self.financing.term_years.min(MAX_LOAN_TERM_YEARS),
                dealer_fee: finite_or_zero(self.financing.dealer_fee),
            },
            incentives: self.incentives,
            tou_arbitrage: self.tou_arbitrage.map(|tou| TouArbitrage {
                enabled: tou.enabled,
                on_peak_rate: finite_or_zero(tou.on_peak_rate),
                off_peak_rate: finite_or_zero(tou.off_peak_rate),
                cycles_per_year: finite_or_zero(tou.cycles_per_year),
            }),
            utility_escalation_rate: finite_or_zero(self.utility_escalation_rate),
            bill_after_offset_override: self.bill_after_offset_override.map(finite_or_zero),
        }
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveResult {
    pub federal_credit: f64,
    pub utility_solar_rebate: f64,
    pub utility_battery_rebate: f64,
    pub total_utility_rebate: f64,
    pub total_incentives: f64,
    /// Quoted amount minus incentives. Negative when incentives exceed the quote.
    pub effective_cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TouSavings {
    pub monthly: f64,
    pub annual: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    pub month: u32,
    pub year: u32,
    pub escalation_factor: f64,
    pub utility_monthly: f64,
    pub solar_monthly: f64,
    pub utility_cumulative: f64,
    pub solar_cumulative: f64,
    pub interest: f64,
    pub remaining_balance: f64,
}

/// Month-by-month result of one projection run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub utility_costs: Vec<f64>,
    pub solar_costs: Vec<f64>,
    pub interest_payments: Vec<f64>,
    pub points: Vec<MonthlyPoint>,
    pub total_interest: f64,
    pub offset_utility_bill: f64,
    pub monthly_after_loan_payoff: f64,
    pub loan_term_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    #[serde(rename = "duke5")]
    pub utility_5yr: f64,
    #[serde(rename = "duke10")]
    pub utility_10yr: f64,
    #[serde(rename = "duke25")]
    pub utility_25yr: f64,
    #[serde(rename = "solar5")]
    pub solar_5yr: f64,
    #[serde(rename = "solar10")]
    pub solar_10yr: f64,
    #[serde(rename = "solar25")]
    pub solar_25yr: f64,
    #[serde(rename = "interest5")]
    pub interest_5yr: f64,
    #[serde(rename = "interest10")]
    pub interest_10yr: f64,
    pub total_interest: f64,
    /// First month where cumulative solar cost drops below the utility baseline.
    pub breakeven_month: Option<u32>,
    /// Financed cost over first-year bill savings; ignores escalation and interest.
    pub simple_payback_years: Option<f64>,
    pub offset_utility_bill: f64,
    pub monthly_after_loan_payoff: f64,
    pub loan_term_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsSummary {
    pub five: f64,
    pub ten: f64,
    pub twenty_five: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiAnalysis {
    /// Absent when there is no financed amount or interest to return on.
    pub roi_25_year: Option<f64>,
    pub total_paid: f64,
    pub net_cost: f64,
    pub effective_discount_percent: f64,
    pub dealer_fee_impact_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComparison {
    pub current_monthly_cost: f64,
    pub effective_monthly_cost: f64,
    /// Positive when the first solar month is cheaper than today's bill.
    pub monthly_difference: f64,
    pub bill_after_offset: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DealTier {
    Excellent,
    Good,
    Marginal,
    Poor,
    NotRecommended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealAssessment {
    pub has_issues: bool,
    pub issues: Vec<String>,
    pub solutions: Vec<String>,
    pub tier: DealTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub hard_costs: f64,
    pub quoted_amount: f64,
    pub financed_principal: f64,
    pub incentives: IncentiveResult,
    pub monthly_payment: f64,
    pub tou_savings: TouSavings,
    pub projection: ProjectionSummary,
    pub savings: SavingsSummary,
    pub roi: RoiAnalysis,
    pub monthly_comparison: MonthlyComparison,
    pub advisor_assessment: DealAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<Vec<MonthlyPoint>>,
}
