//! Derivation of missing dispersion statistics.
//!
//! Given any of sd, se, cv together with the mean and the sample count, the
//! missing ones are filled in with fixed precedence:
//!
//! 1. `sd = se * sqrt(n)`
//! 2. `sd = cv * mean`
//! 3. `se = sd / sqrt(n)`
//! 4. `cv = sd / mean` (mean must be non-zero)
//!
//! A step only fires when its target is null and its inputs are present.
//! Time courses are handled position by position, so a null at one index
//! never blocks another.

use pkdb_model::{StatColumn, StatField, Statistics};
use thiserror::Error;

/// A statistic that could not be derived. Never fatal: the target stays null.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticsError {
    #[error("cannot derive {target}: {reason}")]
    InsufficientData {
        target: StatField,
        reason: &'static str,
    },
}

fn insufficient(target: StatField, reason: &'static str) -> StatisticsError {
    StatisticsError::InsufficientData { target, reason }
}

fn sqrt_count(target: StatField, count: Option<u32>) -> Result<f64, StatisticsError> {
    match count {
        Some(n) if n > 0 => Ok(f64::from(n).sqrt()),
        Some(_) => Err(insufficient(target, "sample count is zero")),
        None => Err(insufficient(target, "sample count is unknown")),
    }
}

pub fn sd_from_se(se: f64, count: Option<u32>) -> Result<f64, StatisticsError> {
    Ok(se * sqrt_count(StatField::Sd, count)?)
}

pub fn se_from_sd(sd: f64, count: Option<u32>) -> Result<f64, StatisticsError> {
    Ok(sd / sqrt_count(StatField::Se, count)?)
}

pub fn sd_from_cv(cv: f64, mean: f64) -> f64 {
    cv * mean
}

pub fn cv_from_sd(sd: f64, mean: f64) -> Result<f64, StatisticsError> {
    if mean == 0.0 {
        return Err(insufficient(StatField::Cv, "mean is zero"));
    }
    Ok(sd / mean)
}

/// Dispersion statistics after completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed<C> {
    pub sd: C,
    pub se: C,
    pub cv: C,
}

/// Fills missing sd, se and cv element-wise.
pub fn complete_statistics<C: StatColumn>(
    sd: &C,
    se: &C,
    cv: &C,
    mean: &C,
    count: Option<u32>,
) -> Completed<C> {
    let len = [sd, se, cv, mean]
        .iter()
        .map(|column| column.len())
        .max()
        .unwrap_or(0);

    let mut sd_out = Vec::with_capacity(len);
    let mut se_out = Vec::with_capacity(len);
    let mut cv_out = Vec::with_capacity(len);

    for index in 0..len {
        let (d, e, v) = complete_at(
            sd.get(index),
            se.get(index),
            cv.get(index),
            mean.get(index),
            count,
        );
        sd_out.push(d);
        se_out.push(e);
        cv_out.push(v);
    }

    Completed {
        sd: C::from_values(sd_out),
        se: C::from_values(se_out),
        cv: C::from_values(cv_out),
    }
}

fn complete_at(
    mut sd: Option<f64>,
    mut se: Option<f64>,
    mut cv: Option<f64>,
    mean: Option<f64>,
    count: Option<u32>,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    if sd.is_none()
        && let Some(se) = se
    {
        sd = recover(sd_from_se(se, count));
    }
    if sd.is_none()
        && let (Some(cv), Some(mean)) = (cv, mean)
    {
        sd = Some(sd_from_cv(cv, mean));
    }
    if se.is_none()
        && let Some(sd) = sd
    {
        se = recover(se_from_sd(sd, count));
    }
    if cv.is_none()
        && let (Some(sd), Some(mean)) = (sd, mean)
    {
        cv = recover(cv_from_sd(sd, mean));
    }
    (sd, se, cv)
}

fn recover(result: Result<f64, StatisticsError>) -> Option<f64> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::trace!(%err, "statistic left null");
            None
        }
    }
}

/// Completes the dispersion fields of `statistics` in place. Returns the
/// fields that gained a value.
pub fn complete_record_statistics<C: StatColumn>(
    statistics: &mut Statistics<C>,
    count: Option<u32>,
) -> Vec<StatField> {
    let completed = complete_statistics(
        &statistics.sd,
        &statistics.se,
        &statistics.cv,
        &statistics.mean,
        count,
    );
    let mut derived = Vec::new();
    for (field, column) in [
        (StatField::Sd, completed.sd),
        (StatField::Se, completed.se),
        (StatField::Cv, completed.cv),
    ] {
        if !column.is_null() && *statistics.get(field) != column {
            derived.push(field);
            statistics.set(field, column);
        }
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkdb_model::{Scalar, Series};

    #[test]
    fn se_and_count_give_sd_then_cv() {
        let completed = complete_statistics::<Scalar>(&None, &Some(2.0), &None, &Some(10.0), Some(4));
        assert_eq!(completed.sd, Some(4.0));
        assert_eq!(completed.se, Some(2.0));
        assert_eq!(completed.cv, Some(0.4));
    }

    #[test]
    fn nothing_is_derived_without_inputs() {
        let completed = complete_statistics::<Scalar>(&None, &None, &None, &Some(5.0), None);
        assert_eq!(completed.sd, None);
        assert_eq!(completed.se, None);
        assert_eq!(completed.cv, None);
    }

    #[test]
    fn cv_and_mean_give_sd_before_se() {
        let completed = complete_statistics::<Scalar>(&None, &None, &Some(0.5), &Some(8.0), Some(16));
        assert_eq!(completed.sd, Some(4.0));
        assert_eq!(completed.se, Some(1.0));
        assert_eq!(completed.cv, Some(0.5));
    }

    #[test]
    fn zero_count_disables_sd_se() {
        let completed = complete_statistics::<Scalar>(&Some(3.0), &None, &None, &Some(6.0), Some(0));
        assert_eq!(completed.se, None);
        assert_eq!(completed.cv, Some(0.5));
        assert_eq!(
            se_from_sd(3.0, Some(0)),
            Err(StatisticsError::InsufficientData {
                target: StatField::Se,
                reason: "sample count is zero",
            })
        );
    }

    #[test]
    fn zero_mean_disables_cv() {
        let completed = complete_statistics::<Scalar>(&Some(1.0), &None, &None, &Some(0.0), None);
        assert_eq!(completed.cv, None);
    }

    #[test]
    fn series_complete_per_index() {
        let sd: Series = Some(vec![Some(1.0), None, Some(2.0)]);
        let mean: Series = Some(vec![Some(2.0), Some(5.0), Some(0.0)]);
        let completed = complete_statistics(&sd, &None, &None, &mean, Some(4));
        assert_eq!(completed.se, Some(vec![Some(0.5), None, Some(1.0)]));
        assert_eq!(completed.cv, Some(vec![Some(0.5), None, None]));
        assert_eq!(completed.sd, sd);
    }

    #[test]
    fn record_completion_reports_new_fields() {
        let mut stats = Statistics::<Scalar> {
            mean: Some(10.0),
            se: Some(2.0),
            ..Default::default()
        };
        let derived = complete_record_statistics(&mut stats, Some(4));
        assert_eq!(derived, vec![StatField::Sd, StatField::Cv]);
        assert!(complete_record_statistics(&mut stats, Some(4)).is_empty());
    }
}
