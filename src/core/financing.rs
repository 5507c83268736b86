use serde::Serialize;

use super::types::FinancingTerms;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingTier {
    pub rate_percent: f64,
    pub term_years: u32,
    pub dealer_fee: f64,
    pub label: &'static str,
}

impl FinancingTier {
    pub fn terms(self) -> FinancingTerms {
        FinancingTerms {
            annual_rate_percent: self.rate_percent,
            term_years: self.term_years,
            dealer_fee: self.dealer_fee,
        }
    }
}

/// Lender price sheet: each step down in rate costs a larger dealer fee.
pub const FINANCING_TIERS: [FinancingTier; 8] = [
    FinancingTier {
        rate_percent: 9.74,
        term_years: 25,
        dealer_fee: 0.0,
        label: "9.74% / 25yr (Zero Fee)",
    },
    FinancingTier {
        rate_percent: 9.49,
        term_years: 25,
        dealer_fee: 653.75,
        label: "9.49% / 25yr",
    },
    FinancingTier {
        rate_percent: 8.99,
        term_years: 25,
        dealer_fee: 1227.89,
        label: "8.99% / 25yr",
    },
    FinancingTier {
        rate_percent: 7.99,
        term_years: 25,
        dealer_fee: 2609.89,
        label: "7.99% / 25yr",
    },
    FinancingTier {
        rate_percent: 6.99,
        term_years: 25,
        dealer_fee: 4326.40,
        label: "6.99% / 25yr",
    },
    FinancingTier {
        rate_percent: 5.99,
        term_years: 25,
        dealer_fee: 6133.32,
        label: "5.99% / 25yr",
    },
    FinancingTier {
        rate_percent: 3.99,
        term_years: 25,
        dealer_fee: 10406.55,
        label: "3.99% / 25yr",
    },
    FinancingTier {
        rate_percent: 2.99,
        term_years: 15,
        dealer_fee: 9492.34,
        label: "2.99% / 15yr (Best Value)",
    },
];

pub const DEFAULT_FINANCING_TIER: usize = FINANCING_TIERS.len() - 1;

pub fn financing_tier(index: usize) -> Option<FinancingTier> {
    FINANCING_TIERS.get(index).copied()
}

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// Level payment that retires `principal` over `term_years` of monthly installments.
pub fn monthly_payment(principal: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    let payments = term_years.saturating_mul(12);
    if payments == 0 {
        return 0.0;
    }
    let rate = monthly_rate(annual_rate_percent);
    let n = payments as f64;
    if rate == 0.0 {
        return principal / n;
    }
    // Discount form stays finite when (1 + r)^n overflows; tends to principal * r.
    principal * rate / (1.0 - (1.0 + rate).powf(-n))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanInstallment {
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub remaining_balance: f64,
}

/// Walks a fixed-rate loan one installment at a time.
#[derive(Debug, Clone)]
pub struct Amortization {
    payment: f64,
    rate: f64,
    term_months: u32,
    month: u32,
    remaining_balance: f64,
}

impl Amortization {
    pub fn new(principal: f64, annual_rate_percent: f64, term_years: u32) -> Self {
        Self {
            payment: monthly_payment(principal, annual_rate_percent, term_years),
            rate: monthly_rate(annual_rate_percent),
            term_months: term_years.saturating_mul(12),
            month: 0,
            remaining_balance: principal,
        }
    }

    pub fn payment(&self) -> f64 {
        self.payment
    }

    pub fn remaining_balance(&self) -> f64 {
        self.remaining_balance
    }
}

impl Iterator for Amortization {
    type Item = LoanInstallment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.month >= self.term_months {
            return None;
        }
        self.month += 1;
        let interest = self.remaining_balance * self.rate;
        let principal = self.payment - interest;
        self.remaining_balance = (self.remaining_balance - principal).max(0.0);
        Some(LoanInstallment {
            month: self.month,
            payment: self.payment,
            interest,
            principal,
            remaining_balance: self.remaining_balance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.term_months - self.month) as usize;
        (left, Some(left))
    }
}
