//! Fixture databases backing the mock providers.
//!
//! Keyed by SSN. The records mirror the scenarios exercised in demos and
//! tests: clean applicants, a suspicious applicant with identity-theft flags
//! and thin employment history, sanctioned SSNs, and high-velocity SSNs.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Identity record for one known SSN.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub name: &'static str,
    pub address: &'static str,
    pub identity_verified: bool,
    pub identity_theft_flags: bool,
    pub address_history_months: u32,
    pub government_verified: bool,
}

/// Income/employment record for one known SSN.
#[derive(Debug, Clone)]
pub struct IncomeRecord {
    pub employer: &'static str,
    pub employment_status: &'static str,
    pub annual_income: f64,
    pub employment_months: u32,
    pub income_verified: bool,
    pub documentation_complete: bool,
}

pub static IDENTITY_DB: Lazy<HashMap<&'static str, IdentityRecord>> = Lazy::new(|| {
    HashMap::from([
        (
            "111-22-3333",
            IdentityRecord {
                name: "John Doe",
                address: "123 Main St, New York, NY 10001",
                identity_verified: true,
                identity_theft_flags: false,
                address_history_months: 36,
                government_verified: true,
            },
        ),
        (
            "222-33-4444",
            IdentityRecord {
                name: "Jane Smith",
                address: "456 Oak Ave, Los Angeles, CA 90001",
                identity_verified: true,
                identity_theft_flags: false,
                address_history_months: 24,
                government_verified: true,
            },
        ),
        (
            "333-44-5555",
            IdentityRecord {
                name: "Bob Johnson",
                address: "789 Elm St, Chicago, IL 60601",
                identity_verified: false,
                identity_theft_flags: true,
                address_history_months: 3,
                government_verified: false,
            },
        ),
    ])
});

pub static INCOME_DB: Lazy<HashMap<&'static str, IncomeRecord>> = Lazy::new(|| {
    HashMap::from([
        (
            "111-22-3333",
            IncomeRecord {
                employer: "Tech Corp Inc",
                employment_status: "full_time",
                annual_income: 85_000.0,
                employment_months: 48,
                income_verified: true,
                documentation_complete: true,
            },
        ),
        (
            "222-33-4444",
            IncomeRecord {
                employer: "Healthcare Solutions LLC",
                employment_status: "full_time",
                annual_income: 120_000.0,
                employment_months: 60,
                income_verified: true,
                documentation_complete: true,
            },
        ),
        (
            "333-44-5555",
            IncomeRecord {
                employer: "Unknown",
                employment_status: "self_employed",
                annual_income: 45_000.0,
                employment_months: 2,
                income_verified: false,
                documentation_complete: false,
            },
        ),
    ])
});

/// SSNs present on the sanctions list. Any match is a zero-tolerance denial.
pub const OFAC_LIST: &[&str] = &["444-55-6666", "555-66-7777"];

/// SSNs with suspicious application velocity.
pub const HIGH_VELOCITY_SSNS: &[&str] = &["333-44-5555", "666-77-8888"];

/// Employment must be at least this long to count as stable.
pub const MIN_STABLE_EMPLOYMENT_MONTHS: u32 = 3;

/// Address history must be at least this long to verify.
pub const MIN_ADDRESS_HISTORY_MONTHS: u32 = 6;

/// DTI ceiling applied by the mock `dti_calculation` check.
pub const DTI_LIMIT: f64 = 0.43;
