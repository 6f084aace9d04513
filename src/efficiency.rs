//! Token grammar by length: `M-A` is M/A, `M-AA` is M/AA, `MM-AA` is MM/AA.
//! A leading `0` is ratio 0 at any length. Anything else is left untouched.

use std::fmt;

use tracing::{debug, warn};

use crate::wide_table::WideTable;

pub const HOME_THIRD_DOWN: &str = "home.thirdDownEff";
pub const AWAY_THIRD_DOWN: &str = "away.thirdDownEff";
pub const HOME_FOURTH_DOWN: &str = "home.fourthDownEff";
pub const AWAY_FOURTH_DOWN: &str = "away.fourthDownEff";

pub const EFFICIENCY_COLUMNS: [&str; 4] =
    [HOME_THIRD_DOWN, AWAY_THIRD_DOWN, HOME_FOURTH_DOWN, AWAY_FOURTH_DOWN];

pub const LEGACY_PATCH_VALUE: &str = "0.4";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Efficiency {
    Zero,
    Ratio(f64),
}

impl Efficiency {
    pub fn value(self) -> f64 {
        match self {
            Efficiency::Zero => 0.0,
            Efficiency::Ratio(r) => r,
        }
    }
}

impl fmt::Display for Efficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Efficiency::Zero => f.write_str("0"),
            // Whole ratios keep a trailing ".0" so historical files diff clean.
            Efficiency::Ratio(r) if r.fract() == 0.0 => write!(f, "{r:.1}"),
            Efficiency::Ratio(r) => write!(f, "{r}"),
        }
    }
}

pub fn parse_efficiency(token: &str) -> Option<Efficiency> {
    let bytes = token.as_bytes();
    if bytes.first() == Some(&b'0') {
        return Some(Efficiency::Zero);
    }
    let (made, attempted) = match bytes {
        [m, b'-', a] => (digit(*m)?, digit(*a)?),
        [m, b'-', a1, a2] => (digit(*m)?, two_digits(*a1, *a2)?),
        [m1, m2, b'-', a1, a2] => (two_digits(*m1, *m2)?, two_digits(*a1, *a2)?),
        _ => return None,
    };
    if attempted == 0 {
        return None;
    }
    Some(Efficiency::Ratio(f64::from(made) / f64::from(attempted)))
}

fn digit(b: u8) -> Option<u32> {
    b.is_ascii_digit().then(|| u32::from(b - b'0'))
}

fn two_digits(tens: u8, ones: u8) -> Option<u32> {
    Some(digit(tens)? * 10 + digit(ones)?)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub converted: usize,
    pub absent: usize,
    pub unrecognized: usize,
    pub missing_columns: Vec<String>,
    pub patched: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EfficiencyNormalizer {
    /// Replace the first `away.thirdDownEff` value with `0.4`. Only valid for
    /// the historical 2013-start B1G dataset; keep off for anything else.
    pub legacy_away_third_down_patch: bool,
}

impl EfficiencyNormalizer {
    pub fn new(legacy_away_third_down_patch: bool) -> Self {
        Self {
            legacy_away_third_down_patch,
        }
    }

    pub fn normalize(&self, table: &mut WideTable) -> NormalizeReport {
        let mut report = NormalizeReport::default();
        for name in EFFICIENCY_COLUMNS {
            let Some(values) = table.column_mut(name) else {
                warn!(column = name, "efficiency column missing, skipped");
                report.missing_columns.push(name.to_string());
                continue;
            };
            let mut start = 0;
            if self.legacy_away_third_down_patch && name == AWAY_THIRD_DOWN && !values.is_empty()
            {
                values[0] = Some(LEGACY_PATCH_VALUE.to_string());
                report.patched = true;
                start = 1;
            }
            for value in values[start..].iter_mut() {
                let Some(raw) = value.as_deref() else {
                    report.absent += 1;
                    continue;
                };
                match parse_efficiency(raw) {
                    Some(eff) => {
                        *value = Some(eff.to_string());
                        report.converted += 1;
                    }
                    None => {
                        debug!(column = name, token = raw, "unrecognized efficiency token");
                        report.unrecognized += 1;
                    }
                }
            }
        }
        report
    }
}
