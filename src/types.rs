use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{DebtError, Result};

/// unique identifier for a debt
pub type DebtId = Uuid;

/// unique identifier for a recorded payment
pub type PaymentId = Uuid;

/// the user who owns a debt record
pub type OwnerId = Uuid;

/// the other party of a debt (a contact managed elsewhere)
pub type CounterpartyId = Uuid;

/// repeating interval between installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    OneTime,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Cadence {
    pub const ALL: [Cadence; 6] = [
        Cadence::OneTime,
        Cadence::Weekly,
        Cadence::Biweekly,
        Cadence::Monthly,
        Cadence::Quarterly,
        Cadence::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::OneTime => "one_time",
            Cadence::Weekly => "weekly",
            Cadence::Biweekly => "biweekly",
            Cadence::Monthly => "monthly",
            Cadence::Quarterly => "quarterly",
            Cadence::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = DebtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one_time" | "onetime" | "one-time" => Ok(Cadence::OneTime),
            "weekly" => Ok(Cadence::Weekly),
            "biweekly" => Ok(Cadence::Biweekly),
            "monthly" => Ok(Cadence::Monthly),
            "quarterly" => Ok(Cadence::Quarterly),
            "yearly" => Ok(Cadence::Yearly),
            other => Err(DebtError::validation(format!("unknown cadence '{}'", other))),
        }
    }
}

/// debt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    /// balance outstanding, due date not yet passed
    Active,
    /// nothing left to pay
    Settled,
    /// closed manually, never derived
    Archived,
    /// balance outstanding after the due date
    Overdue,
}

/// which side of the relationship the owner is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtType {
    OwedToMe,
    IOwe,
}

/// payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
    Rejected,
}

impl PaymentStatus {
    /// only completed payments count toward the ledger
    pub fn counts_toward_ledger(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Check,
    DigitalWallet,
    Other,
}

/// outcome of verifying a pending payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Completed,
    Rejected,
}

impl From<Verdict> for PaymentStatus {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Completed => PaymentStatus::Completed,
            Verdict::Rejected => PaymentStatus::Rejected,
        }
    }
}

/// iso 4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(pub(crate) String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DebtError::validation(format!(
                "currency code must be three letters, got '{}'",
                code
            )));
        }
        Ok(Currency(code))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// decimal places of the currency's minor unit
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XOF" | "XAF" => 0,
            "BHD" | "JOD" | "KWD" | "OMR" | "TND" | "IQD" | "LYD" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = DebtError;

    fn from_str(s: &str) -> Result<Self> {
        Currency::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = DebtError;

    fn try_from(s: String) -> Result<Self> {
        Currency::new(&s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}
