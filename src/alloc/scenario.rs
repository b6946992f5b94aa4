//! Scenario inputs: channel filters and metric uplifts.
//!
//! Both return new datasets; the input is never modified.

use crate::alloc::validate::require_columns;
use crate::alloc::AllocError;
use crate::domain::{Column, Dataset, Uplift};

/// Resolve a user-typed channel name (case-insensitive) to its canonical form.
pub fn resolve_channel(channels: &[String], name: &str) -> Result<String, AllocError> {
    let wanted = name.trim();
    channels
        .iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| AllocError::UnknownChannel {
            channel: wanted.to_string(),
        })
}

/// Keep only records of the named channels. An empty filter keeps everything.
pub fn filter_channels(dataset: &Dataset, names: &[String]) -> Result<Dataset, AllocError> {
    if names.is_empty() {
        return Ok(dataset.clone());
    }

    let known = dataset.channels();
    let wanted = names
        .iter()
        .map(|n| resolve_channel(&known, n))
        .collect::<Result<Vec<_>, _>>()?;

    let records = dataset
        .records()
        .iter()
        .filter(|r| wanted.contains(&r.channel))
        .cloned()
        .collect();
    Ok(dataset.with_records(records))
}

/// Scale metrics by `1 + percent / 100`, per channel or across all channels.
///
/// Unpopulated values stay unpopulated.
pub fn apply_uplift(dataset: &Dataset, uplifts: &[Uplift]) -> Result<Dataset, AllocError> {
    let known = dataset.channels();
    let mut records = dataset.records().to_vec();

    for u in uplifts {
        if !u.percent.is_finite() || u.percent <= -100.0 {
            return Err(AllocError::InvalidUplift {
                metric: u.metric,
                percent: u.percent,
            });
        }
        require_columns(dataset, &[Column::Metric(u.metric)])?;

        let target = match &u.channel {
            Some(name) => Some(resolve_channel(&known, name)?),
            None => None,
        };
        let factor = 1.0 + u.percent / 100.0;

        for r in records.iter_mut() {
            if target.as_ref().is_some_and(|t| *t != r.channel) {
                continue;
            }
            let scaled = r.get(u.metric).map(|v| v * factor);
            r.set(u.metric, scaled);
        }
    }

    Ok(dataset.with_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::allocate;
    use crate::domain::{Metric, PerformanceRecord};

    fn dataset() -> Dataset {
        Dataset::from_records(
            &[Metric::Conversions],
            vec![
                PerformanceRecord::new("Search").with(Metric::Conversions, 100.0),
                PerformanceRecord::new("Social").with(Metric::Conversions, 100.0),
                PerformanceRecord::new("Search").with(Metric::Conversions, 100.0),
            ],
        )
    }

    #[test]
    fn filter_is_case_insensitive_and_keeps_order() {
        let out = filter_channels(&dataset(), &["search".to_string()]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.channels(), vec!["Search"]);
        assert_eq!(out.columns(), dataset().columns());
    }

    #[test]
    fn filter_rejects_unknown_channel() {
        assert_eq!(
            filter_channels(&dataset(), &["Radio".to_string()]).unwrap_err(),
            AllocError::UnknownChannel {
                channel: "Radio".to_string()
            }
        );
    }

    #[test]
    fn channel_uplift_shifts_allocation() {
        let uplift = Uplift {
            channel: Some("Social".to_string()),
            metric: Metric::Conversions,
            percent: 100.0,
        };
        let lifted = apply_uplift(&dataset(), &[uplift]).unwrap();
        let out = allocate(&lifted, Metric::Conversions, 1000.0).unwrap();
        assert!((out.get("Search").unwrap() - 500.0).abs() < 1e-9);
        assert!((out.get("Social").unwrap() - 500.0).abs() < 1e-9);

        // Input left untouched.
        assert_eq!(dataset().records()[1].conversions, Some(100.0));
    }

    #[test]
    fn global_uplift_scales_every_record() {
        let uplift = Uplift {
            channel: None,
            metric: Metric::Conversions,
            percent: 10.0,
        };
        let lifted = apply_uplift(&dataset(), &[uplift]).unwrap();
        for r in lifted.records() {
            assert!((r.conversions.unwrap() - 110.0).abs() < 1e-9);
        }
    }

    #[test]
    fn uplift_at_or_below_minus_hundred_is_rejected() {
        let uplift = Uplift {
            channel: None,
            metric: Metric::Conversions,
            percent: -100.0,
        };
        assert!(matches!(
            apply_uplift(&dataset(), &[uplift]),
            Err(AllocError::InvalidUplift { .. })
        ));
    }

    #[test]
    fn uplift_on_absent_column_is_a_missing_column() {
        let uplift = Uplift {
            channel: None,
            metric: Metric::Sales,
            percent: 5.0,
        };
        assert!(matches!(
            apply_uplift(&dataset(), &[uplift]),
            Err(AllocError::MissingColumn { .. })
        ));
    }
}
