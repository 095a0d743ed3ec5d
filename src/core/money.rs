use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pence per shilling.
pub const PENCE_PER_SHILLING: u64 = 12;
/// Shillings per pound.
pub const SHILLINGS_PER_POUND: u64 = 20;
/// Pence per pound, the base-unit multiplier for the pounds field.
pub const PENCE_PER_POUND: u64 = PENCE_PER_SHILLING * SHILLINGS_PER_POUND;

/// Errors arising from constructing or converting currency values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum CurrencyError {
    #[error("negative amounts are not supported: {pounds}/{shillings}/{pence}")]
    Negative {
        pounds: i64,
        shillings: i64,
        pence: i64,
    },
    #[error("amount {pounds}/{shillings}/{pence} overflows the pence range")]
    Overflow {
        pounds: i64,
        shillings: i64,
        pence: i64,
    },
    #[error("sum of amounts overflows the pence range")]
    SumOverflow,
    #[error("value {0} is not normalized")]
    Unnormalized(Lsd),
    #[error("cannot parse '{input}' as pounds,shillings,pence: {reason}")]
    Parse { input: String, reason: String },
    #[error("columns differ in length: {pounds} pounds, {shillings} shillings, {pence} pence")]
    ColumnLengths {
        pounds: usize,
        shillings: usize,
        pence: usize,
    },
}

/// A sum of money in pounds, shillings and pence.
///
/// Values may be held unnormalized (e.g. 17 pence) exactly as they appear in
/// the source ledgers; [`Lsd::normalize`] produces the canonical form where
/// `shillings < 20` and `pence < 12`. Negative amounts are rejected at
/// construction.
///
/// # Examples
///
/// ```
/// use parish_records::core::money::Lsd;
///
/// let raw = Lsd::new(0, 19, 15).unwrap();
/// assert_eq!(raw.normalize(), Lsd::new(1, 0, 3).unwrap());
/// assert_eq!(raw.to_base_units(), 243);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Lsd {
    pounds: u64,
    shillings: u64,
    pence: u64,
}

impl Lsd {
    pub const ZERO: Lsd = Lsd {
        pounds: 0,
        shillings: 0,
        pence: 0,
    };

    /// Build a value from raw ledger fields.
    ///
    /// Fields need not be normalized, but all must be non-negative and the
    /// total must be representable in pence.
    pub fn new(pounds: i64, shillings: i64, pence: i64) -> Result<Self, CurrencyError> {
        if pounds < 0 || shillings < 0 || pence < 0 {
            return Err(CurrencyError::Negative {
                pounds,
                shillings,
                pence,
            });
        }
        let value = Lsd {
            pounds: pounds as u64,
            shillings: shillings as u64,
            pence: pence as u64,
        };
        value.checked_base_units().ok_or(CurrencyError::Overflow {
            pounds,
            shillings,
            pence,
        })?;
        Ok(value)
    }

    pub fn pounds(&self) -> u64 {
        self.pounds
    }

    pub fn shillings(&self) -> u64 {
        self.shillings
    }

    pub fn pence(&self) -> u64 {
        self.pence
    }

    fn checked_base_units(&self) -> Option<u64> {
        self.pounds
            .checked_mul(PENCE_PER_POUND)?
            .checked_add(self.shillings.checked_mul(PENCE_PER_SHILLING)?)?
            .checked_add(self.pence)
    }

    /// Total value in pence. Valid for unnormalized values.
    pub fn to_base_units(&self) -> u64 {
        // Construction guarantees the checked conversion succeeds.
        self.checked_base_units().unwrap_or(u64::MAX)
    }

    /// The normalized value equal to `pence` pence.
    pub fn from_base_units(pence: u64) -> Self {
        Lsd {
            pounds: pence / PENCE_PER_POUND,
            shillings: (pence % PENCE_PER_POUND) / PENCE_PER_SHILLING,
            pence: pence % PENCE_PER_SHILLING,
        }
    }

    /// Carry overflow from pence into shillings, then shillings into pounds.
    ///
    /// Pence are folded first since their carry can itself push shillings
    /// past twenty.
    pub fn normalize(&self) -> Self {
        let shillings = self.shillings + self.pence / PENCE_PER_SHILLING;
        let pence = self.pence % PENCE_PER_SHILLING;
        let pounds = self.pounds + shillings / SHILLINGS_PER_POUND;
        let shillings = shillings % SHILLINGS_PER_POUND;
        Lsd {
            pounds,
            shillings,
            pence,
        }
    }

    pub fn is_normalized(&self) -> bool {
        self.shillings < SHILLINGS_PER_POUND && self.pence < PENCE_PER_SHILLING
    }

    /// Split into `(pounds, shillings, pence)` columns for tabulation.
    ///
    /// Only canonical values may cross into presentation.
    pub fn to_denomination_columns(&self) -> Result<(u64, u64, u64), CurrencyError> {
        if !self.is_normalized() {
            return Err(CurrencyError::Unnormalized(*self));
        }
        Ok((self.pounds, self.shillings, self.pence))
    }

    /// Sum values in pence and return the normalized total.
    pub fn sum<'a, I>(values: I) -> Result<Self, CurrencyError>
    where
        I: IntoIterator<Item = &'a Lsd>,
    {
        values
            .into_iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v.to_base_units()))
            .map(Lsd::from_base_units)
            .ok_or(CurrencyError::SumOverflow)
    }
}

/// Sum entries given column-wise: every pounds value, then every shillings
/// value, then every pence value. Row `i` is `(pounds[i], shillings[i], pence[i])`.
pub fn sum_columns(pounds: &[i64], shillings: &[i64], pence: &[i64]) -> Result<Lsd, CurrencyError> {
    if pounds.len() != shillings.len() || shillings.len() != pence.len() {
        return Err(CurrencyError::ColumnLengths {
            pounds: pounds.len(),
            shillings: shillings.len(),
            pence: pence.len(),
        });
    }
    let rows = pounds
        .iter()
        .zip(shillings)
        .zip(pence)
        .map(|((&p, &s), &d)| Lsd::new(p, s, d))
        .collect::<Result<Vec<_>, _>>()?;
    Lsd::sum(&rows)
}

/// Parse one comma separated column of integers, e.g. `"1, 0,3"`.
pub fn parse_column(input: &str) -> Result<Vec<i64>, CurrencyError> {
    input
        .split(',')
        .map(|field| {
            let field = field.trim();
            field.parse().map_err(|_| CurrencyError::Parse {
                input: input.to_string(),
                reason: format!("'{field}' is not an integer"),
            })
        })
        .collect()
}

impl fmt::Display for Lsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{} {}s {}d", self.pounds, self.shillings, self.pence)
    }
}

/// Parses the calculator row syntax `pounds,shillings,pence`.
impl FromStr for Lsd {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: &str| CurrencyError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let fields: Vec<&str> = cleaned.split(',').collect();
        if fields.len() != 3 {
            return Err(parse_error("expected three comma separated values"));
        }

        let mut parsed = [0i64; 3];
        for (slot, field) in parsed.iter_mut().zip(&fields) {
            *slot = field
                .parse()
                .map_err(|_| parse_error(&format!("'{field}' is not an integer")))?;
        }
        Lsd::new(parsed[0], parsed[1], parsed[2])
    }
}
