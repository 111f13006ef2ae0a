//! Series macroeconómicas (fecha, valor).
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{DateRange, DomainError};

/// Punto de una serie macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Frecuencia de muestreo solicitada al colaborador macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub const ALL: [&'static str; 5] = ["daily", "weekly", "monthly", "quarterly", "annual"];
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            "quarterly" | "q" => Ok(Frequency::Quarterly),
            "annual" | "a" => Ok(Frequency::Annual),
            other => Err(DomainError::ParseError(format!("unknown frequency '{other}' (expected one of: {})",
                                                         Frequency::ALL.join(", ")))),
        }
    }
}

/// Consulta a un colaborador macro.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroQuery {
    pub range: DateRange,
    pub frequency: Option<Frequency>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_accepts_short_codes() {
        assert_eq!("m".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert_eq!("quarterly".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert!("hourly".parse::<Frequency>().is_err());
    }
}
