use axum::{
    Router,
    body::Bytes,
    extract::Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    DEFAULT_FINANCING_TIER, FINANCING_TIERS, FinancingTerms, FinancingTier, IncentiveFlags,
    MAX_LOAN_TERM_YEARS, ProjectionReport, SystemConfiguration, TouArbitrage, financing_tier,
    run_projection,
};
use crate::error::ConfigError;

const CUSTOM_LOAN_RATE: f64 = 3.99;
const CUSTOM_LOAN_TERM_YEARS: u32 = 25;

/// Form inputs arrive as numbers, numeric strings, or blanks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FormNumber {
    Number(f64),
    Text(String),
}

impl FormNumber {
    /// Blank text counts as zero, matching what an empty form field means.
    fn resolve(self, field: &str) -> Result<f64, ConfigError> {
        match self {
            FormNumber::Number(v) => Ok(v),
            FormNumber::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| ConfigError::invalid(field, "must be a number"))
            }
        }
    }

    fn resolve_whole(self, field: &str) -> Result<u32, ConfigError> {
        let value = self.resolve(field)?;
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(ConfigError::invalid(field, "must be a whole number"));
        }
        Ok(value as u32)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FinancingPayload {
    annual_rate_percent: Option<FormNumber>,
    term_years: Option<FormNumber>,
    #[serde(alias = "dealerFeeCurrency")]
    dealer_fee: Option<FormNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IncentivesPayload {
    #[serde(alias = "applyFederalITC")]
    apply_federal_itc: Option<bool>,
    #[serde(alias = "applyPowerPair")]
    apply_utility_rebate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TouPayload {
    enabled: Option<bool>,
    on_peak_rate: Option<FormNumber>,
    off_peak_rate: Option<FormNumber>,
    #[serde(alias = "cycleDays")]
    cycles_per_year: Option<FormNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    #[serde(alias = "dukeBill")]
    monthly_utility_bill: Option<FormNumber>,
    #[serde(alias = "dukeServiceFee")]
    utility_service_fee: Option<FormNumber>,
    hard_costs: Option<FormNumber>,
    base_system_cost: Option<FormNumber>,
    adders_cost: Option<FormNumber>,
    battery_cost: Option<FormNumber>,
    #[serde(alias = "systemSize")]
    system_size_kw: Option<FormNumber>,
    battery_included: Option<bool>,
    #[serde(alias = "batterySizeKwh")]
    battery_capacity_kwh: Option<FormNumber>,
    #[serde(alias = "solarOffset")]
    solar_offset_percent: Option<FormNumber>,
    solar_service_fee: Option<FormNumber>,
    financing_tier: Option<usize>,
    financing: Option<FinancingPayload>,
    incentives: Option<IncentivesPayload>,
    tou_arbitrage: Option<TouPayload>,
    utility_escalation_percent: Option<FormNumber>,
    bill_after_offset_override: Option<FormNumber>,
    include_monthly: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "solar-projection",
    about = "25-year solar + battery savings projection (financing, incentives, TOU arbitrage)"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Current average monthly utility bill before solar"
    )]
    monthly_utility_bill: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Fixed monthly utility fee that solar does not offset"
    )]
    utility_service_fee: f64,
    #[arg(
        long,
        help = "Total hard costs; defaults to base system + adders + battery cost"
    )]
    hard_costs: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    base_system_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    adders_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    battery_cost: f64,
    #[arg(long, default_value_t = 0.0, help = "Nameplate solar capacity in kW")]
    system_size_kw: f64,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    battery_included: bool,
    #[arg(long, default_value_t = 0.0)]
    battery_capacity_kwh: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Share of usage covered by solar in percent"
    )]
    solar_offset: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Fixed monthly solar-side fee, e.g. monitoring"
    )]
    solar_service_fee: f64,
    #[arg(
        long,
        help = "Index into the financing tier table; defaults to the best-value tier"
    )]
    financing_tier: Option<usize>,
    #[arg(long, help = "Custom loan APR in percent; replaces the tier table")]
    loan_rate: Option<f64>,
    #[arg(long, help = "Custom loan term in years (default 25)")]
    loan_term_years: Option<u32>,
    #[arg(long, help = "Custom dealer fee added to hard costs (default 0)")]
    dealer_fee: Option<f64>,
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        help = "Apply the 30% federal investment tax credit"
    )]
    apply_itc: bool,
    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        help = "Apply the utility per-watt solar and per-kWh battery rebates"
    )]
    apply_utility_rebate: bool,
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    tou_enabled: bool,
    #[arg(long, default_value_t = 0.22, help = "On-peak rate per kWh")]
    tou_on_peak_rate: f64,
    #[arg(long, default_value_t = 0.10, help = "Off-peak rate per kWh")]
    tou_off_peak_rate: f64,
    #[arg(
        long,
        default_value_t = 250.0,
        help = "Arbitrage cycles per year the battery actually completes"
    )]
    tou_cycles_per_year: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual utility price escalation in percent"
    )]
    escalation_rate: f64,
    #[arg(long, help = "Display-only override for the bill after solar offset")]
    bill_after_offset: Option<f64>,
    #[arg(long, help = "Include the 300-month series in the output")]
    include_monthly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct FinancingSummary {
    annual_rate_percent: f64,
    term_years: u32,
    dealer_fee: f64,
    tier_index: Option<usize>,
    tier_label: Option<&'static str>,
}

#[derive(Debug)]
struct ApiRequest {
    config: SystemConfiguration,
    financing: FinancingSummary,
    include_monthly: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    financing: FinancingSummary,
    utility_escalation_rate: f64,
    #[serde(flatten)]
    report: ProjectionReport,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(field, "must be >= 0"));
    }
    Ok(())
}

fn resolve_financing(cli: &Cli) -> Result<FinancingSummary, ConfigError> {
    let custom = cli.loan_rate.is_some() || cli.loan_term_years.is_some() || cli.dealer_fee.is_some();
    if custom && cli.financing_tier.is_some() {
        return Err(ConfigError::Conflict(
            "--financing-tier cannot be combined with --loan-rate, --loan-term-years or --dealer-fee"
                .to_string(),
        ));
    }

    if custom {
        return Ok(FinancingSummary {
            annual_rate_percent: cli.loan_rate.unwrap_or(CUSTOM_LOAN_RATE),
            term_years: cli.loan_term_years.unwrap_or(CUSTOM_LOAN_TERM_YEARS),
            dealer_fee: cli.dealer_fee.unwrap_or(0.0),
            tier_index: None,
            tier_label: None,
        });
    }

    let index = cli.financing_tier.unwrap_or(DEFAULT_FINANCING_TIER);
    let tier = financing_tier(index).ok_or(ConfigError::UnknownFinancingTier {
        index,
        max: FINANCING_TIERS.len() - 1,
    })?;
    Ok(FinancingSummary {
        annual_rate_percent: tier.rate_percent,
        term_years: tier.term_years,
        dealer_fee: tier.dealer_fee,
        tier_index: Some(index),
        tier_label: Some(tier.label),
    })
}

fn build_request(cli: Cli) -> Result<ApiRequest, ConfigError> {
    for (name, value) in [
        ("--monthly-utility-bill", cli.monthly_utility_bill),
        ("--utility-service-fee", cli.utility_service_fee),
        ("--base-system-cost", cli.base_system_cost),
        ("--adders-cost", cli.adders_cost),
        ("--battery-cost", cli.battery_cost),
        ("--system-size-kw", cli.system_size_kw),
        ("--battery-capacity-kwh", cli.battery_capacity_kwh),
        ("--solar-service-fee", cli.solar_service_fee),
        ("--tou-on-peak-rate", cli.tou_on_peak_rate),
        ("--tou-off-peak-rate", cli.tou_off_peak_rate),
        ("--tou-cycles-per-year", cli.tou_cycles_per_year),
    ] {
        require_non_negative(name, value)?;
    }

    if let Some(hard_costs) = cli.hard_costs {
        require_non_negative("--hard-costs", hard_costs)?;
    }

    if let Some(bill) = cli.bill_after_offset {
        require_non_negative("--bill-after-offset", bill)?;
    }

    if !cli.solar_offset.is_finite() || !(0.0..=100.0).contains(&cli.solar_offset) {
        return Err(ConfigError::invalid(
            "--solar-offset",
            "must be between 0 and 100",
        ));
    }

    if !cli.escalation_rate.is_finite() || cli.escalation_rate <= -100.0 {
        return Err(ConfigError::invalid("--escalation-rate", "must be > -100"));
    }

    let financing = resolve_financing(&cli)?;
    require_non_negative("--loan-rate", financing.annual_rate_percent)?;
    require_non_negative("--dealer-fee", financing.dealer_fee)?;
    if financing.term_years == 0 || financing.term_years > MAX_LOAN_TERM_YEARS {
        return Err(ConfigError::invalid(
            "--loan-term-years",
            &format!("must be between 1 and {MAX_LOAN_TERM_YEARS}"),
        ));
    }

    let hard_costs = cli
        .hard_costs
        .unwrap_or(cli.base_system_cost + cli.adders_cost + cli.battery_cost);

    let config = SystemConfiguration {
        monthly_utility_bill: cli.monthly_utility_bill,
        utility_service_fee: cli.utility_service_fee,
        hard_costs,
        system_size_kw: cli.system_size_kw,
        battery_included: cli.battery_included,
        battery_capacity_kwh: cli.battery_capacity_kwh,
        solar_offset_percent: cli.solar_offset,
        solar_service_fee: cli.solar_service_fee,
        financing: FinancingTerms {
            annual_rate_percent: financing.annual_rate_percent,
            term_years: financing.term_years,
            dealer_fee: financing.dealer_fee,
        },
        incentives: IncentiveFlags {
            apply_federal_itc: cli.apply_itc,
            apply_utility_rebate: cli.apply_utility_rebate,
        },
        tou_arbitrage: Some(TouArbitrage {
            enabled: cli.tou_enabled,
            on_peak_rate: cli.tou_on_peak_rate,
            off_peak_rate: cli.tou_off_peak_rate,
            cycles_per_year: cli.tou_cycles_per_year,
        }),
        utility_escalation_rate: cli.escalation_rate / 100.0,
        bill_after_offset_override: cli.bill_after_offset,
    };

    Ok(ApiRequest {
        config,
        financing,
        include_monthly: cli.include_monthly,
    })
}

/// Parses process arguments, runs one projection and prints it as JSON.
pub fn run_cli() -> Result<(), ConfigError> {
    let request = build_request(Cli::parse())?;
    let report = run_projection(&request.config, request.include_monthly);
    info!(
        breakeven_month = ?report.projection.breakeven_month,
        tier = ?report.advisor_assessment.tier,
        "projection computed"
    );
    let response = build_projection_response(&request, report);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/financing-tiers", get(financing_tiers_handler))
        .route("/api/solar-projection", post(projection_post_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "solar projection API listening");
    info!("local access: http://127.0.0.1:{port}/api/solar-projection");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn financing_tiers_handler() -> Response {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct TiersResponse {
        default_index: usize,
        tiers: &'static [FinancingTier],
    }

    json_response(
        StatusCode::OK,
        TiersResponse {
            default_index: DEFAULT_FINANCING_TIER,
            tiers: &FINANCING_TIERS,
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_post_handler(body: Bytes) -> Response {
    let request = match api_request_from_json(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected projection request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let report = run_projection(&request.config, request.include_monthly);
    debug!(
        breakeven_month = ?report.projection.breakeven_month,
        tier = ?report.advisor_assessment.tier,
        "projection computed"
    );
    json_response(StatusCode::OK, build_projection_response(&request, report))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn api_request_from_json(body: &[u8]) -> Result<ApiRequest, ConfigError> {
    let payload = serde_json::from_slice::<ProjectionPayload>(body)?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectionPayload) -> Result<ApiRequest, ConfigError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.monthly_utility_bill {
        cli.monthly_utility_bill = v.resolve("monthlyUtilityBill")?;
    }
    if let Some(v) = payload.utility_service_fee {
        cli.utility_service_fee = v.resolve("utilityServiceFee")?;
    }
    if let Some(v) = payload.hard_costs {
        cli.hard_costs = Some(v.resolve("hardCosts")?);
    }
    if let Some(v) = payload.base_system_cost {
        cli.base_system_cost = v.resolve("baseSystemCost")?;
    }
    if let Some(v) = payload.adders_cost {
        cli.adders_cost = v.resolve("addersCost")?;
    }
    if let Some(v) = payload.battery_cost {
        cli.battery_cost = v.resolve("batteryCost")?;
    }
    if let Some(v) = payload.system_size_kw {
        cli.system_size_kw = v.resolve("systemSizeKw")?;
    }
    if let Some(v) = payload.battery_included {
        cli.battery_included = v;
    }
    if let Some(v) = payload.battery_capacity_kwh {
        cli.battery_capacity_kwh = v.resolve("batteryCapacityKwh")?;
    }
    if let Some(v) = payload.solar_offset_percent {
        cli.solar_offset = v.resolve("solarOffsetPercent")?;
    }
    if let Some(v) = payload.solar_service_fee {
        cli.solar_service_fee = v.resolve("solarServiceFee")?;
    }

    if let Some(v) = payload.financing_tier {
        cli.financing_tier = Some(v);
    }
    if let Some(financing) = payload.financing {
        if let Some(v) = financing.annual_rate_percent {
            cli.loan_rate = Some(v.resolve("financing.annualRatePercent")?);
        }
        if let Some(v) = financing.term_years {
            cli.loan_term_years = Some(v.resolve_whole("financing.termYears")?);
        }
        if let Some(v) = financing.dealer_fee {
            cli.dealer_fee = Some(v.resolve("financing.dealerFee")?);
        }
    }

    if let Some(incentives) = payload.incentives {
        if let Some(v) = incentives.apply_federal_itc {
            cli.apply_itc = v;
        }
        if let Some(v) = incentives.apply_utility_rebate {
            cli.apply_utility_rebate = v;
        }
    }

    if let Some(tou) = payload.tou_arbitrage {
        if let Some(v) = tou.enabled {
            cli.tou_enabled = v;
        }
        if let Some(v) = tou.on_peak_rate {
            cli.tou_on_peak_rate = v.resolve("touArbitrage.onPeakRate")?;
        }
        if let Some(v) = tou.off_peak_rate {
            cli.tou_off_peak_rate = v.resolve("touArbitrage.offPeakRate")?;
        }
        if let Some(v) = tou.cycles_per_year {
            cli.tou_cycles_per_year = v.resolve("touArbitrage.cyclesPerYear")?;
        }
    }

    if let Some(v) = payload.utility_escalation_percent {
        cli.escalation_rate = v.resolve("utilityEscalationPercent")?;
    }
    if let Some(v) = payload.bill_after_offset_override {
        cli.bill_after_offset = Some(v.resolve("billAfterOffsetOverride")?);
    }
    if let Some(v) = payload.include_monthly {
        cli.include_monthly = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_utility_bill: 0.0,
        utility_service_fee: 0.0,
        hard_costs: None,
        base_system_cost: 0.0,
        adders_cost: 0.0,
        battery_cost: 0.0,
        system_size_kw: 0.0,
        battery_included: true,
        battery_capacity_kwh: 0.0,
        solar_offset: 0.0,
        solar_service_fee: 0.0,
        financing_tier: None,
        loan_rate: None,
        loan_term_years: None,
        dealer_fee: None,
        apply_itc: true,
        apply_utility_rebate: true,
        tou_enabled: false,
        tou_on_peak_rate: 0.22,
        tou_off_peak_rate: 0.10,
        tou_cycles_per_year: 250.0,
        escalation_rate: 4.0,
        bill_after_offset: None,
        include_monthly: false,
    }
}

fn build_projection_response(request: &ApiRequest, report: ProjectionReport) -> ProjectionResponse {
    ProjectionResponse {
        financing: request.financing,
        utility_escalation_rate: request.config.utility_escalation_rate,
        report,
    }
}
