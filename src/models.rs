// src/models.rs
use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::fmt;

/// How bad things look. `Checking` is only ever used for progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Checking,
    Healthy,
    Warning,
    Danger,
}

impl Severity {
    /// Healthy, Warning and Danger are classification results.
    pub fn is_verdict(self) -> bool {
        matches!(self, Severity::Healthy | Severity::Warning | Severity::Danger)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Unknown => "unknown",
            Severity::Checking => "checking",
            Severity::Healthy => "healthy",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        };
        f.write_str(s)
    }
}

/// One element of the health check stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub severity: Severity,
    pub text: Option<String>,
}

impl Status {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: Some(text.into()),
        }
    }

    /// Placeholder shown before any check has run.
    pub fn unknown() -> Self {
        Self {
            severity: Severity::Unknown,
            text: None,
        }
    }

    pub fn checking(text: impl Into<String>) -> Self {
        Self::new(Severity::Checking, text)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Which way value moved across the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlowDirection {
    Deposit,
    Withdrawal,
}

/// A decoded bridge log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub direction: FlowDirection,
    pub amount: U256,       // raw units, wei for ETH
    pub token_address: Address,
    pub from_address: Address,
    pub block_number: u64,
    pub tx_hash: String,
}

/// Summed bridge flow on one chain over the lookback window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowTotals {
    pub deposited: U256,
    pub withdrawn: U256,
}

/// `from_block ..= latest`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: u64,
}

impl BlockRange {
    /// Range covering the last `lookback` blocks up to `head`.
    pub fn lookback(head: u64, lookback: u64) -> Self {
        Self {
            from_block: head.saturating_sub(lookback),
        }
    }

    pub fn from_block_hex(&self) -> String {
        format!("0x{:x}", self.from_block)
    }

    pub fn to_block_tag(&self) -> &'static str {
        "latest"
    }
}
