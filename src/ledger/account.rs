use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::format_amount;

/// A named balance record. The identifier lives in the owning ledger's map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    name: String,
    #[serde(
        serialize_with = "finite_balance",
        deserialize_with = "balance_from_number_or_text"
    )]
    balance: f64,
}

impl Account {
    /// Creates an account without validating the opening balance.
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Self {
            name: name.into(),
            balance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub(crate) fn set_balance(&mut self, balance: f64) {
        self.balance = balance;
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}, Balance: {}", self.name, format_amount(self.balance))
    }
}

// JSON has no NaN or infinity; serde_json would write `null` and the file would no longer load.
fn finite_balance<S>(balance: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if !balance.is_finite() {
        return Err(serde::ser::Error::custom(format!(
            "balance {balance} cannot be stored"
        )));
    }
    serializer.serialize_f64(*balance)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBalance {
    Number(f64),
    Text(String),
}

// Hand-edited files sometimes quote the balance; accept anything that parses as a float.
fn balance_from_number_or_text<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawBalance::deserialize(deserializer)? {
        RawBalance::Number(value) => Ok(value),
        RawBalance::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| serde::de::Error::custom(format!("balance `{text}` is not a number"))),
    }
}
