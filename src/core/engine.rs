use super::advisor::{AdvisorInputs, assess_deal};
use super::financing::Amortization;
use super::types::{
    IncentiveFlags, IncentiveResult, MonthlyComparison, MonthlyPoint, PROJECTION_MONTHS,
    ProjectionReport, ProjectionSummary, RoiAnalysis, SavingsSummary, Simulation,
    SystemConfiguration, TouArbitrage, TouSavings,
};

pub const FEDERAL_ITC_RATE: f64 = 0.30;
pub const UTILITY_SOLAR_REBATE_PER_WATT: f64 = 0.36;
pub const UTILITY_SOLAR_REBATE_CAP_KW: f64 = 10.0;
pub const UTILITY_BATTERY_REBATE_PER_KWH: f64 = 400.0;
pub const UTILITY_BATTERY_REBATE_CAP_KWH: f64 = 13.5;
/// Share of nameplate battery capacity available per arbitrage cycle.
pub const TOU_USABLE_CAPACITY: f64 = 0.90;

/// Quantities every stage of a projection shares.
#[derive(Debug, Clone, Copy)]
struct Financials {
    incentives: IncentiveResult,
    financed_principal: f64,
    monthly_payment: f64,
    tou: TouSavings,
}

impl Financials {
    fn derive(config: &SystemConfiguration) -> Self {
        let incentives = compute_incentives(
            config.quoted_amount(),
            config.system_size_kw,
            config.battery_included,
            config.battery_capacity_kwh,
            config.incentives,
        );
        let financed_principal = financed_principal(&incentives);
        let loan = Amortization::new(
            financed_principal,
            config.financing.annual_rate_percent,
            config.financing.term_years,
        );
        Self {
            incentives,
            financed_principal,
            monthly_payment: loan.payment(),
            tou: compute_tou_savings(
                config.battery_included,
                config.battery_capacity_kwh,
                config.tou_arbitrage,
            ),
        }
    }
}

pub fn compute_incentives(
    quoted_amount: f64,
    system_size_kw: f64,
    battery_included: bool,
    battery_capacity_kwh: f64,
    flags: IncentiveFlags,
) -> IncentiveResult {
    let federal_credit = if flags.apply_federal_itc {
        quoted_amount * FEDERAL_ITC_RATE
    } else {
        0.0
    };
    let (utility_solar_rebate, utility_battery_rebate) = if flags.apply_utility_rebate {
        utility_rebate_potential(system_size_kw, battery_included, battery_capacity_kwh)
    } else {
        (0.0, 0.0)
    };
    let total_utility_rebate = utility_solar_rebate + utility_battery_rebate;
    let total_incentives = federal_credit + total_utility_rebate;

    IncentiveResult {
        federal_credit,
        utility_solar_rebate,
        utility_battery_rebate,
        total_utility_rebate,
        total_incentives,
        effective_cost: quoted_amount - total_incentives,
    }
}

/// Solar and battery rebate the utility program would pay, each at its own cap.
pub fn utility_rebate_potential(
    system_size_kw: f64,
    battery_included: bool,
    battery_capacity_kwh: f64,
) -> (f64, f64) {
    let solar_watts = system_size_kw.min(UTILITY_SOLAR_REBATE_CAP_KW) * 1000.0;
    let battery_kwh = if battery_included {
        battery_capacity_kwh.min(UTILITY_BATTERY_REBATE_CAP_KWH)
    } else {
        0.0
    };
    (
        solar_watts * UTILITY_SOLAR_REBATE_PER_WATT,
        battery_kwh * UTILITY_BATTERY_REBATE_PER_KWH,
    )
}

/// Amount actually borrowed. Incentives beyond the quote are a payout, not a negative loan.
pub fn financed_principal(incentives: &IncentiveResult) -> f64 {
    incentives.effective_cost.max(0.0)
}

pub fn compute_tou_savings(
    battery_included: bool,
    battery_capacity_kwh: f64,
    tou: Option<TouArbitrage>,
) -> TouSavings {
    let Some(tou) = tou.filter(|tou| tou.enabled) else {
        return TouSavings::default();
    };
    if !battery_included {
        return TouSavings::default();
    }

    let usable_kwh = battery_capacity_kwh * TOU_USABLE_CAPACITY;
    let daily_arbitrage = usable_kwh * (tou.on_peak_rate - tou.off_peak_rate);
    let annual = daily_arbitrage * tou.cycles_per_year;
    TouSavings {
        monthly: annual / 12.0,
        annual,
    }
}

fn escalation_factor(rate: f64, years: u32) -> f64 {
    (1.0 + rate).powi(i32::try_from(years).unwrap_or(i32::MAX))
}

pub fn simulate(config: &SystemConfiguration) -> Simulation {
    simulate_with(config, &Financials::derive(config))
}

fn simulate_with(config: &SystemConfiguration, financials: &Financials) -> Simulation {
    let escalation = config.utility_escalation_rate;
    let offset_utility_bill = config.offset_utility_bill();
    let mut loan = Amortization::new(
        financials.financed_principal,
        config.financing.annual_rate_percent,
        config.financing.term_years,
    );

    let mut utility_costs = Vec::with_capacity(PROJECTION_MONTHS);
    let mut solar_costs = Vec::with_capacity(PROJECTION_MONTHS);
    let mut interest_payments = Vec::with_capacity(PROJECTION_MONTHS);
    let mut points = Vec::with_capacity(PROJECTION_MONTHS);
    let mut utility_total = 0.0;
    let mut solar_total = 0.0;

    for month in 1..=PROJECTION_MONTHS as u32 {
        let year = (month - 1) / 12;
        let factor = escalation_factor(escalation, year);

        let utility_monthly = config.monthly_utility_bill * factor + config.utility_service_fee;
        utility_total += utility_monthly;

        let (loan_payment, interest) = match loan.next() {
            Some(installment) => (installment.payment, installment.interest),
            None => (0.0, 0.0),
        };
        let solar_monthly = offset_utility_bill * factor + config.solar_service_fee + loan_payment
            - financials.tou.monthly * factor;
        solar_total += solar_monthly;

        utility_costs.push(utility_total);
        solar_costs.push(solar_total);
        interest_payments.push(interest);
        points.push(MonthlyPoint {
            month,
            year,
            escalation_factor: factor,
            utility_monthly,
            solar_monthly,
            utility_cumulative: utility_total,
            solar_cumulative: solar_total,
            interest,
            remaining_balance: loan.remaining_balance(),
        });
    }

    let payoff_factor = escalation_factor(escalation, config.financing.term_years);
    Simulation {
        total_interest: interest_payments.iter().sum(),
        utility_costs,
        solar_costs,
        interest_payments,
        points,
        offset_utility_bill,
        monthly_after_loan_payoff: offset_utility_bill * payoff_factor
            + config.solar_service_fee
            - financials.tou.monthly * payoff_factor,
        loan_term_months: config.financing.term_months(),
    }
}

/// First 1-based month where cumulative solar cost is below the utility baseline.
pub fn breakeven_month(utility_costs: &[f64], solar_costs: &[f64]) -> Option<u32> {
    utility_costs
        .iter()
        .zip(solar_costs)
        .position(|(utility, solar)| solar < utility)
        .map(|idx| idx as u32 + 1)
}

fn cumulative_at_year(costs: &[f64], years: usize) -> f64 {
    costs
        .get(years * 12 - 1)
        .or_else(|| costs.last())
        .copied()
        .unwrap_or(0.0)
}

fn interest_through_year(interest_payments: &[f64], years: usize) -> f64 {
    interest_payments.iter().take(years * 12).sum()
}

fn simple_payback_years(
    config: &SystemConfiguration,
    financials: &Financials,
    offset_utility_bill: f64,
) -> Option<f64> {
    let utility_first_month = config.monthly_utility_bill + config.utility_service_fee;
    let solar_first_month_before_loan =
        offset_utility_bill + config.solar_service_fee - financials.tou.monthly;
    let first_year_annual_savings = (utility_first_month - solar_first_month_before_loan) * 12.0;
    (first_year_annual_savings > 0.0)
        .then(|| financials.financed_principal / first_year_annual_savings)
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Runs the full projection pipeline. Non-finite inputs are treated as zero.
pub fn run_projection(config: &SystemConfiguration, include_monthly: bool) -> ProjectionReport {
    let config = config.sanitized();
    let financials = Financials::derive(&config);
    let simulation = simulate_with(&config, &financials);

    let projection = ProjectionSummary {
        utility_5yr: cumulative_at_year(&simulation.utility_costs, 5),
        utility_10yr: cumulative_at_year(&simulation.utility_costs, 10),
        utility_25yr: cumulative_at_year(&simulation.utility_costs, 25),
        solar_5yr: cumulative_at_year(&simulation.solar_costs, 5),
        solar_10yr: cumulative_at_year(&simulation.solar_costs, 10),
        solar_25yr: cumulative_at_year(&simulation.solar_costs, 25),
        interest_5yr: interest_through_year(&simulation.interest_payments, 5),
        interest_10yr: interest_through_year(&simulation.interest_payments, 10),
        total_interest: simulation.total_interest,
        breakeven_month: breakeven_month(&simulation.utility_costs, &simulation.solar_costs),
        simple_payback_years: simple_payback_years(
            &config,
            &financials,
            simulation.offset_utility_bill,
        ),
        offset_utility_bill: simulation.offset_utility_bill,
        monthly_after_loan_payoff: simulation.monthly_after_loan_payoff,
        loan_term_months: simulation.loan_term_months,
    };

    let savings = SavingsSummary {
        five: projection.utility_5yr - projection.solar_5yr,
        ten: projection.utility_10yr - projection.solar_10yr,
        twenty_five: projection.utility_25yr - projection.solar_25yr,
    };

    let quoted_amount = config.quoted_amount();
    let invested = financials.financed_principal + simulation.total_interest;
    let roi = RoiAnalysis {
        roi_25_year: (invested > 0.0).then(|| savings.twenty_five / invested * 100.0),
        total_paid: financials.monthly_payment * simulation.loan_term_months as f64,
        net_cost: financials.financed_principal,
        effective_discount_percent: percent_of(
            financials.incentives.total_incentives,
            quoted_amount,
        ),
        dealer_fee_impact_percent: percent_of(config.financing.dealer_fee, quoted_amount),
    };

    let current_monthly_cost = config.monthly_utility_bill + config.utility_service_fee;
    let effective_monthly_cost = simulation.offset_utility_bill
        + config.solar_service_fee
        + financials.monthly_payment
        - financials.tou.monthly;
    let monthly_comparison = MonthlyComparison {
        current_monthly_cost,
        effective_monthly_cost,
        monthly_difference: current_monthly_cost - effective_monthly_cost,
        bill_after_offset: config
            .bill_after_offset_override
            .unwrap_or_else(|| simulation.offset_utility_bill.max(0.0)),
    };

    let (solar_rebate, battery_rebate) = utility_rebate_potential(
        config.system_size_kw,
        config.battery_included,
        config.battery_capacity_kwh,
    );
    let advisor_assessment = assess_deal(&AdvisorInputs {
        savings_25yr: savings.twenty_five,
        roi_25yr: roi.roi_25_year,
        solar_offset_percent: config.solar_offset_percent,
        monthly_difference: monthly_comparison.monthly_difference,
        incentives: config.incentives,
        tou_enabled: config.tou_enabled(),
        battery_included: config.battery_included,
        potential_utility_rebate: solar_rebate + battery_rebate,
        potential_federal_credit: quoted_amount * FEDERAL_ITC_RATE,
    });

    ProjectionReport {
        hard_costs: config.hard_costs,
        quoted_amount,
        financed_principal: financials.financed_principal,
        incentives: financials.incentives,
        monthly_payment: financials.monthly_payment,
        tou_savings: financials.tou,
        projection,
        savings,
        roi,
        monthly_comparison,
        advisor_assessment,
        months: include_monthly.then_some(simulation.points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        DEFAULT_UTILITY_ESCALATION_RATE, DealTier, FinancingTerms, MAX_LOAN_TERM_YEARS,
    };
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_config() -> SystemConfiguration {
        SystemConfiguration {
            monthly_utility_bill: 205.04,
            utility_service_fee: 0.0,
            hard_costs: 9_200.0 + 1_288.0 + 10_650.0,
            system_size_kw: 3.68,
            battery_included: true,
            battery_capacity_kwh: 5.0,
            solar_offset_percent: 30.0,
            solar_service_fee: 0.0,
            financing: FinancingTerms {
                annual_rate_percent: 2.99,
                term_years: 15,
                dealer_fee: 9_492.34,
            },
            incentives: IncentiveFlags {
                apply_federal_itc: true,
                apply_utility_rebate: true,
            },
            tou_arbitrage: None,
            utility_escalation_rate: DEFAULT_UTILITY_ESCALATION_RATE,
            bill_after_offset_override: None,
        }
    }

    fn enabled_tou() -> TouArbitrage {
        TouArbitrage {
            enabled: true,
            on_peak_rate: 0.22,
            off_peak_rate: 0.10,
            cycles_per_year: 250.0,
        }
    }

    #[test]
    fn end_to_end_quote_matches_hand_computed_figures() {
        let report = run_projection(&sample_config(), false);

        assert_approx(report.hard_costs, 21_138.0);
        assert_approx(report.quoted_amount, 30_630.34);
        assert_approx(report.incentives.federal_credit, 9_189.102);
        assert_approx(report.incentives.utility_solar_rebate, 1_324.8);
        assert_approx(report.incentives.utility_battery_rebate, 2_000.0);
        assert_approx(report.incentives.total_incentives, 12_513.902);
        assert_approx(report.incentives.effective_cost, 18_116.438);
        assert_approx_tol(report.monthly_payment, 125.021_683, 1e-5);

        assert_eq!(report.projection.loan_term_months, 180);
        assert_eq!(report.projection.breakeven_month, Some(244));
        assert_approx_tol(report.projection.total_interest, 4_387.4649, 1e-3);
        assert_approx_tol(report.savings.twenty_five, 8_236.7744, 1e-3);
        let roi = report.roi.roi_25_year.expect("financed deal has an ROI");
        assert_approx_tol(roi, 36.6015, 1e-3);
        assert_eq!(report.advisor_assessment.tier, DealTier::Marginal);
        assert!(report.months.is_none());
    }

    #[test]
    fn extreme_loan_rate_keeps_report_finite() {
        let mut config = sample_config();
        config.hard_costs = 20_000.0;
        config.financing = FinancingTerms {
            annual_rate_percent: 5_000.0,
            term_years: 50,
            dealer_fee: 0.0,
        };
        let report = run_projection(&config, false);

        assert!(report.monthly_payment.is_finite());
        assert!(report.projection.solar_25yr.is_finite());
        assert!(report.projection.total_interest.is_finite());
        assert!(report.savings.twenty_five.is_finite());
        assert!(report.savings.twenty_five < 0.0);
        let roi = report.roi.roi_25_year.expect("financed deal has an ROI");
        assert!(roi.is_finite());
        assert_eq!(report.advisor_assessment.tier, DealTier::NotRecommended);
    }

    #[test]
    fn oversized_loan_term_is_clamped() {
        let mut config = sample_config();
        config.financing.term_years = u32::MAX;
        let report = run_projection(&config, false);

        assert_eq!(report.projection.loan_term_months, MAX_LOAN_TERM_YEARS * 12);
        assert!(report.projection.monthly_after_loan_payoff.is_finite());
        assert!(report.roi.total_paid.is_finite());
    }

    #[test]
    fn utility_rebates_stop_growing_at_caps() {
        let flags = IncentiveFlags {
            apply_federal_itc: false,
            apply_utility_rebate: true,
        };
        let at_cap = compute_incentives(0.0, 10.0, true, 13.5, flags);
        let above_cap = compute_incentives(0.0, 15.0, true, 20.0, flags);
        assert_approx(above_cap.utility_solar_rebate, at_cap.utility_solar_rebate);
        assert_approx(above_cap.utility_battery_rebate, at_cap.utility_battery_rebate);
        assert_approx(at_cap.utility_solar_rebate, 3_600.0);
        assert_approx(at_cap.utility_battery_rebate, 5_400.0);
    }

    #[test]
    fn battery_rebate_requires_battery() {
        let flags = IncentiveFlags {
            apply_federal_itc: true,
            apply_utility_rebate: true,
        };
        let result = compute_incentives(20_000.0, 6.0, false, 10.0, flags);
        assert_approx(result.utility_battery_rebate, 0.0);
        assert_approx(result.utility_solar_rebate, 2_160.0);
        assert_approx(result.federal_credit, 6_000.0);
    }

    #[test]
    fn disabled_flags_yield_no_incentives() {
        let result = compute_incentives(30_000.0, 8.0, true, 10.0, IncentiveFlags::default());
        assert_approx(result.total_incentives, 0.0);
        assert_approx(result.effective_cost, 30_000.0);
    }

    #[test]
    fn tou_savings_require_enabled_flag_and_battery() {
        let mut tou = enabled_tou();
        let savings = compute_tou_savings(true, 10.0, Some(tou));
        // 9 usable kWh * $0.12 spread * 250 cycles.
        assert_approx(savings.annual, 270.0);
        assert_approx(savings.monthly, 22.5);

        assert_eq!(compute_tou_savings(false, 10.0, Some(tou)), TouSavings::default());
        assert_eq!(compute_tou_savings(true, 10.0, None), TouSavings::default());
        tou.enabled = false;
        assert_eq!(compute_tou_savings(true, 10.0, Some(tou)), TouSavings::default());
    }

    #[test]
    fn tou_savings_reduce_solar_side_costs() {
        let baseline = simulate(&sample_config());
        let mut config = sample_config();
        config.tou_arbitrage = Some(enabled_tou());
        let with_tou = simulate(&config);

        assert_eq!(baseline.utility_costs, with_tou.utility_costs);
        assert!(with_tou.solar_costs[299] < baseline.solar_costs[299]);
        assert!(with_tou.monthly_after_loan_payoff < baseline.monthly_after_loan_payoff);
    }

    #[test]
    fn utility_side_ignores_solar_and_escalates_yearly() {
        let mut config = sample_config();
        config.utility_service_fee = 12.5;
        let sim = simulate(&config);

        assert_approx(sim.utility_costs[0], 205.04 + 12.5);
        assert_approx(sim.utility_costs[11], (205.04 + 12.5) * 12.0);
        assert_approx(sim.points[12].utility_monthly, 205.04 * 1.04 + 12.5);
        assert_eq!(sim.points[12].year, 1);
        assert_eq!(sim.points[23].year, 1);
        assert_eq!(sim.points[24].year, 2);
    }

    #[test]
    fn loan_payment_drops_out_after_term() {
        let config = sample_config();
        let sim = simulate(&config);
        let payment = monthly_payment_for(&config);

        let in_term = &sim.points[179];
        let after_term = &sim.points[180];
        assert_approx(
            in_term.solar_monthly,
            sim.offset_utility_bill * in_term.escalation_factor + payment,
        );
        assert_approx(
            after_term.solar_monthly,
            sim.offset_utility_bill * after_term.escalation_factor,
        );
        assert_approx_tol(in_term.remaining_balance, 0.0, 1e-6);
        assert_approx(sim.interest_payments[180], 0.0);
    }

    fn monthly_payment_for(config: &SystemConfiguration) -> f64 {
        Financials::derive(config).monthly_payment
    }

    #[test]
    fn monthly_after_payoff_escalates_for_loan_term() {
        let mut config = sample_config();
        config.solar_service_fee = 15.0;
        let sim = simulate(&config);
        let expected = 205.04 * 0.7 * 1.04_f64.powi(15) + 15.0;
        assert_approx(sim.monthly_after_loan_payoff, expected);
    }

    #[test]
    fn breakeven_is_first_crossing_or_none() {
        assert_eq!(breakeven_month(&[10.0, 20.0, 30.0], &[15.0, 20.0, 25.0]), Some(3));
        assert_eq!(breakeven_month(&[10.0, 20.0], &[5.0, 30.0]), Some(1));
        assert_eq!(breakeven_month(&[10.0, 20.0], &[10.0, 25.0]), None);
        assert_eq!(breakeven_month(&[], &[]), None);
    }

    #[test]
    fn expensive_system_never_breaks_even() {
        let mut config = sample_config();
        config.hard_costs = 250_000.0;
        config.financing.annual_rate_percent = 9.74;
        config.financing.term_years = 25;
        let report = run_projection(&config, false);
        assert_eq!(report.projection.breakeven_month, None);
        assert!(report.savings.twenty_five < 0.0);
        assert_eq!(report.advisor_assessment.tier, DealTier::NotRecommended);
    }

    #[test]
    fn incentives_beyond_quote_clamp_financed_principal() {
        let mut config = sample_config();
        config.hard_costs = 1_000.0;
        config.financing.dealer_fee = 0.0;
        config.system_size_kw = 10.0;
        config.battery_capacity_kwh = 13.5;

        let report = run_projection(&config, false);
        assert!(report.incentives.effective_cost < 0.0);
        assert_approx(report.financed_principal, 0.0);
        assert_approx(report.monthly_payment, 0.0);
        assert_approx(report.projection.total_interest, 0.0);
        assert_eq!(report.roi.roi_25_year, None);
        assert_eq!(report.projection.simple_payback_years, Some(0.0));
        assert_eq!(report.projection.breakeven_month, Some(1));
    }

    #[test]
    fn simple_payback_ignores_escalation_and_interest() {
        let config = sample_config();
        let report = run_projection(&config, false);
        let annual_bill_savings = 205.04 * 0.30 * 12.0;
        let payback = report
            .projection
            .simple_payback_years
            .expect("solar lowers the bill");
        assert_approx(payback, 18_116.438 / annual_bill_savings);

        let mut zero_offset = sample_config();
        zero_offset.solar_offset_percent = 0.0;
        let report = run_projection(&zero_offset, false);
        assert_eq!(report.projection.simple_payback_years, None);
    }

    #[test]
    fn horizon_checkpoints_and_savings_line_up() {
        let report = run_projection(&sample_config(), true);
        let months = report.months.as_ref().expect("monthly series requested");
        assert_eq!(months.len(), PROJECTION_MONTHS);
        assert_approx(report.projection.utility_5yr, months[59].utility_cumulative);
        assert_approx(report.projection.solar_10yr, months[119].solar_cumulative);
        assert_approx(
            report.savings.five,
            months[59].utility_cumulative - months[59].solar_cumulative,
        );
        let interest_5yr: f64 = months[..60].iter().map(|m| m.interest).sum();
        assert_approx(report.projection.interest_5yr, interest_5yr);
        assert!(report.projection.interest_10yr > report.projection.interest_5yr);
    }

    #[test]
    fn roi_extras_report_discount_and_dealer_fee_share() {
        let report = run_projection(&sample_config(), false);
        assert_approx(
            report.roi.effective_discount_percent,
            12_513.902 / 30_630.34 * 100.0,
        );
        assert_approx(report.roi.dealer_fee_impact_percent, 9_492.34 / 30_630.34 * 100.0);
        assert_approx(report.roi.total_paid, report.monthly_payment * 180.0);
        assert_approx(
            report.roi.total_paid - report.roi.net_cost,
            report.projection.total_interest,
        );
    }

    #[test]
    fn monthly_comparison_feeds_advisor() {
        let report = run_projection(&sample_config(), false);
        let comparison = report.monthly_comparison;
        assert_approx(comparison.current_monthly_cost, 205.04);
        assert_approx(
            comparison.effective_monthly_cost,
            205.04 * 0.7 + report.monthly_payment,
        );
        // Payment of ~$125 against ~$61.5 of offset savings.
        assert!(comparison.monthly_difference < -20.0);
        assert!(
            report
                .advisor_assessment
                .issues
                .iter()
                .any(|issue| issue.starts_with("First year cost is $64/month"))
        );
    }

    #[test]
    fn bill_after_offset_override_is_display_only() {
        let mut config = sample_config();
        config.bill_after_offset_override = Some(99.0);
        let report = run_projection(&config, false);
        let baseline = run_projection(&sample_config(), false);

        assert_approx(report.monthly_comparison.bill_after_offset, 99.0);
        assert_approx(
            baseline.monthly_comparison.bill_after_offset,
            205.04 * 0.7,
        );
        assert_eq!(report.projection, baseline.projection);
    }

    #[test]
    fn non_finite_inputs_are_treated_as_zero() {
        let mut config = sample_config();
        config.utility_service_fee = f64::NAN;
        config.solar_service_fee = f64::INFINITY;
        let report = run_projection(&config, false);
        assert_eq!(report, run_projection(&sample_config(), false));
    }

    #[test]
    fn zero_escalation_keeps_bill_flat() {
        let mut config = sample_config();
        config.utility_escalation_rate = 0.0;
        let sim = simulate(&config);
        assert_approx(sim.utility_costs[299], 205.04 * 300.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_yearly_utility_increments_strictly_grow(
            bill_cents in 1_000u32..100_000,
            escalation_bp in 1u32..1_000,
            month in 12usize..=288
        ) {
            let mut config = sample_config();
            config.monthly_utility_bill = bill_cents as f64 / 100.0;
            config.utility_escalation_rate = escalation_bp as f64 / 10_000.0;
            let sim = simulate(&config);
            let costs = &sim.utility_costs;
            // costs[k] is the cumulative cost through month k + 1.
            let later = costs[month + 11] - costs[month - 1];
            let earlier = costs[month - 1] - if month >= 13 { costs[month - 13] } else { 0.0 };
            prop_assert!(later > earlier, "later {later} <= earlier {earlier}");
        }

        #[test]
        fn prop_breakeven_marks_first_crossing(
            bill_cents in 5_000u32..60_000,
            offset in 0u32..101,
            hard_cost in 0u32..80_000,
            tier in 0usize..8,
            itc in proptest::bool::ANY,
            rebate in proptest::bool::ANY
        ) {
            let mut config = sample_config();
            config.monthly_utility_bill = bill_cents as f64 / 100.0;
            config.solar_offset_percent = offset as f64;
            config.hard_costs = hard_cost as f64;
            config.financing = crate::core::financing::FINANCING_TIERS[tier].terms();
            config.incentives = IncentiveFlags {
                apply_federal_itc: itc,
                apply_utility_rebate: rebate,
            };
            let sim = simulate(&config);
            match breakeven_month(&sim.utility_costs, &sim.solar_costs) {
                Some(month) => {
                    let idx = month as usize - 1;
                    prop_assert!(sim.solar_costs[idx] < sim.utility_costs[idx]);
                    for earlier in 0..idx {
                        prop_assert!(sim.solar_costs[earlier] >= sim.utility_costs[earlier]);
                    }
                }
                None => {
                    for idx in 0..PROJECTION_MONTHS {
                        prop_assert!(sim.solar_costs[idx] >= sim.utility_costs[idx]);
                    }
                }
            }
        }

        #[test]
        fn prop_projection_is_idempotent(
            bill_cents in 0u32..60_000,
            offset in 0u32..101,
            battery_kwh in 0u32..30,
            tou_enabled in proptest::bool::ANY
        ) {
            let mut config = sample_config();
            config.monthly_utility_bill = bill_cents as f64 / 100.0;
            config.solar_offset_percent = offset as f64;
            config.battery_capacity_kwh = battery_kwh as f64;
            config.tou_arbitrage = Some(TouArbitrage { enabled: tou_enabled, ..enabled_tou() });
            prop_assert_eq!(run_projection(&config, true), run_projection(&config, true));
        }

        #[test]
        fn prop_disabled_tou_is_always_zero(
            on_peak_mills in 0u32..1_000,
            off_peak_mills in 0u32..1_000,
            cycles in 0u32..366,
            battery_kwh in 0u32..40
        ) {
            let tou = TouArbitrage {
                enabled: false,
                on_peak_rate: on_peak_mills as f64 / 1_000.0,
                off_peak_rate: off_peak_mills as f64 / 1_000.0,
                cycles_per_year: cycles as f64,
            };
            let savings = compute_tou_savings(true, battery_kwh as f64, Some(tou));
            prop_assert_eq!(savings.monthly, 0.0);
            prop_assert_eq!(savings.annual, 0.0);
        }
    }
}
