//! Condition contrasts over a filtered interaction set.

use ndarray::Array2;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};

use contactrs_core::errors::ConfigError;
use contactrs_core::models::filter::FilterSet;
use contactrs_core::models::record::InteractionRecord;
use contactrs_core::models::sample::Sample;
use contactrs_core::utils::chrom_karyotype_key;
use contactrs_model::correction::benjamini_hochberg;
use contactrs_model::glm::{self, MAX_ALPHA, MIN_ALPHA};

use crate::dispersion::{DispersionTrend, shrink};

/// Fewest per-interaction estimates needed before a trend is fitted.
const MIN_TREND_POINTS: usize = 8;
/// Last-resort dispersion when neither replicates nor background fits
/// provide an estimate.
const DEFAULT_ALPHA: f64 = 0.1;

///
/// One experimental condition and its replicate samples. All samples must
/// share the binning schema and have been scored by the significance
/// model (the fitted mu is the normalization offset).
///
#[derive(Debug, Clone)]
pub struct Condition {
    pub name: String,
    pub samples: Vec<Sample>,
}

///
/// Differential test result for one interaction under one contrast.
///
/// `None` values mark interactions whose per-interaction fit did not
/// converge (or could not be normalized); they are reported rather than
/// dropped so identity survives for downstream joins.
///
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialResult {
    pub chrom: String,
    pub start_i: u32,
    pub start_j: u32,
    /// Contrast label, `<condition>_vs_<baseline>`.
    pub contrast: String,
    pub log2_fold_change: Option<f64>,
    pub p_value: Option<f64>,
    pub q_value: Option<f64>,
}

/// Per-interaction intermediate state for one contrast.
struct Cell {
    key: (String, u32, u32),
    y: Vec<f64>,
    offsets: Vec<f64>,
    is_b: Vec<bool>,
    missing_mu: bool,
    all_zero: bool,
    mean_count: f64,
    /// Method-of-moments estimate and its degrees of freedom.
    mom: Option<(f64, f64)>,
    /// Dispersion recovered from the replicates' background fits.
    prior: Option<f64>,
}

///
/// Test each non-reference condition against its chain predecessor over
/// the filtered interaction set.
///
/// The contrast chain is monotonic: with conditions `[ref, b, c]` the
/// contrasts are `b_vs_ref` and `c_vs_b`, not all pairs. Interactions
/// with all-zero counts in both compared conditions are excluded;
/// interactions whose individual fit fails are reported with NA values.
/// q-values are BH-corrected across every tested interaction of the run.
///
pub fn compare(
    conditions: &[Condition],
    filter: &FilterSet,
    reference: &str,
) -> Result<Vec<DifferentialResult>, ConfigError> {
    validate(conditions, reference)?;

    let chain: Vec<&Condition> = std::iter::once(
        conditions
            .iter()
            .find(|c| c.name == reference)
            .expect("validated above"),
    )
    .chain(conditions.iter().filter(|c| c.name != reference))
    .collect();

    let keys = test_keys(conditions, filter)?;

    let mut results: Vec<DifferentialResult> = Vec::new();
    for pair in chain.windows(2) {
        let (base, other) = (pair[0], pair[1]);
        let contrast = format!("{}_vs_{}", other.name, base.name);

        let replicates: Vec<(&Sample, bool)> = base
            .samples
            .iter()
            .map(|s| (s, false))
            .chain(other.samples.iter().map(|s| (s, true)))
            .collect();

        let cells: Vec<Cell> = keys
            .par_iter()
            .map(|key| gather_cell(key, &replicates))
            .collect();

        // dispersion-mean trend across the contrast's testable cells
        let points: Vec<(f64, f64)> = cells
            .iter()
            .filter(|c| !c.all_zero && !c.missing_mu)
            .filter_map(|c| c.mom.map(|(alpha, _)| (c.mean_count, alpha)))
            .collect();
        let trend = if points.len() >= MIN_TREND_POINTS {
            DispersionTrend::fit(&points)
        } else {
            None
        };

        results.extend(
            cells
                .par_iter()
                .filter(|cell| !cell.all_zero)
                .map(|cell| test_cell(cell, trend, &contrast))
                .collect::<Vec<DifferentialResult>>(),
        );
    }

    if results.is_empty() {
        return Err(ConfigError::EmptyFilterSet);
    }

    // BH across all tested interactions of the run
    let scored: Vec<usize> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.p_value.map(|_| i))
        .collect();
    let q = benjamini_hochberg(
        &scored
            .iter()
            .map(|&i| results[i].p_value.expect("filtered to Some"))
            .collect::<Vec<f64>>(),
    );
    for (&i, q) in scored.iter().zip(q) {
        results[i].q_value = Some(q);
    }

    Ok(results)
}

fn validate(conditions: &[Condition], reference: &str) -> Result<(), ConfigError> {
    if conditions.len() < 2 {
        return Err(ConfigError::TooFewConditions(conditions.len()));
    }
    for condition in conditions {
        if condition.samples.is_empty() {
            return Err(ConfigError::NoReplicates(condition.name.clone()));
        }
    }
    if !conditions.iter().any(|c| c.name == reference) {
        return Err(ConfigError::UnknownReference(reference.to_string()));
    }

    let first = &conditions[0].samples[0];
    for condition in conditions {
        for sample in &condition.samples {
            if !first.is_comparable_with(sample) {
                return Err(ConfigError::SchemaMismatch(
                    first.schema().unwrap_or("<empty>").to_string(),
                    sample.schema().unwrap_or("<empty>").to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Filter keys restricted to interactions present in every input sample,
/// in deterministic karyotypic order.
fn test_keys(
    conditions: &[Condition],
    filter: &FilterSet,
) -> Result<Vec<(String, u32, u32)>, ConfigError> {
    let mut keys: Vec<(String, u32, u32)> = filter
        .iter()
        .filter(|(chrom, start_i, start_j)| {
            conditions.iter().all(|condition| {
                condition.samples.iter().all(|sample| {
                    sample
                        .get(chrom)
                        .and_then(|c| c.get(*start_i, *start_j))
                        .is_some()
                })
            })
        })
        .cloned()
        .collect();

    if keys.is_empty() {
        return Err(ConfigError::EmptyFilterSet);
    }
    keys.sort_by(|a, b| {
        chrom_karyotype_key(&a.0)
            .cmp(&chrom_karyotype_key(&b.0))
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });
    Ok(keys)
}

fn gather_cell(key: &(String, u32, u32), replicates: &[(&Sample, bool)]) -> Cell {
    let records: Vec<(&InteractionRecord, bool)> = replicates
        .iter()
        .map(|(sample, is_b)| {
            let record = sample
                .get(&key.0)
                .and_then(|c| c.get(key.1, key.2))
                .expect("test keys are present in every sample");
            (record, *is_b)
        })
        .collect();

    let y: Vec<f64> = records.iter().map(|(r, _)| r.count as f64).collect();
    let is_b: Vec<bool> = records.iter().map(|(_, b)| *b).collect();
    let all_zero = y.iter().all(|&v| v == 0.0);
    let missing_mu = records.iter().any(|(r, _)| r.mu.is_none());
    let mean_count = y.iter().sum::<f64>() / y.len() as f64;

    let mut offsets = Vec::with_capacity(records.len());
    let mut prior_sum = 0.0;
    let mut prior_n = 0usize;
    if !missing_mu {
        for (record, _) in &records {
            let mu = record.mu.expect("checked above").max(1e-10);
            offsets.push(mu.ln());
            if let Some(sdev) = record.sdev {
                let alpha = ((sdev * sdev - mu) / (mu * mu)).clamp(MIN_ALPHA, MAX_ALPHA);
                prior_sum += alpha.ln();
                prior_n += 1;
            }
        }
    }
    let prior = if prior_n > 0 {
        Some((prior_sum / prior_n as f64).exp())
    } else {
        None
    };

    let mom = if !missing_mu && y.len() >= 3 {
        moments_dispersion(&y, &offsets, &is_b)
    } else {
        None
    };

    Cell {
        key: key.clone(),
        y,
        offsets,
        is_b,
        missing_mu,
        all_zero,
        mean_count,
        mom,
        prior,
    }
}

///
/// Method-of-moments dispersion around the offset-aware group means:
/// `alpha = sum(((y - mu_hat)^2 - mu_hat) / mu_hat^2) / (n - 2)`.
///
fn moments_dispersion(y: &[f64], offsets: &[f64], is_b: &[bool]) -> Option<(f64, f64)> {
    let n = y.len();
    let df = n as f64 - 2.0;
    if df <= 0.0 {
        return None;
    }

    // group ratios on the normalized scale
    let mut sums = [(0.0, 0.0); 2];
    for i in 0..n {
        let g = is_b[i] as usize;
        sums[g].0 += y[i];
        sums[g].1 += offsets[i].exp();
    }
    let ratio = |g: usize| -> f64 {
        if sums[g].1 > 0.0 {
            (sums[g].0 / sums[g].1).max(1e-8)
        } else {
            1e-8
        }
    };

    let mut acc = 0.0;
    for i in 0..n {
        let mu_hat = (ratio(is_b[i] as usize) * offsets[i].exp()).max(1e-8);
        acc += ((y[i] - mu_hat).powi(2) - mu_hat) / (mu_hat * mu_hat);
    }
    Some(((acc / df).clamp(MIN_ALPHA, MAX_ALPHA), df))
}

fn test_cell(cell: &Cell, trend: Option<DispersionTrend>, contrast: &str) -> DifferentialResult {
    let na = DifferentialResult {
        chrom: cell.key.0.clone(),
        start_i: cell.key.1,
        start_j: cell.key.2,
        contrast: contrast.to_string(),
        log2_fold_change: None,
        p_value: None,
        q_value: None,
    };

    if cell.missing_mu {
        return na;
    }

    let trend_value = trend
        .map(|t| t.value(cell.mean_count))
        .or(cell.prior)
        .unwrap_or(DEFAULT_ALPHA);
    let alpha = match cell.mom {
        Some((mom, df)) => shrink(mom, trend_value, df),
        None => trend_value,
    };

    let n = cell.y.len();
    let mut design = Array2::zeros((n, 2));
    for i in 0..n {
        design[[i, 0]] = 1.0;
        design[[i, 1]] = if cell.is_b[i] { 1.0 } else { 0.0 };
    }

    let fit = match glm::fit_nb_glm_fixed(&cell.y, &design, Some(&cell.offsets), alpha) {
        Ok(fit) => fit,
        Err(err) => {
            log::debug!(
                "{} {}:{}-{}: fit failed ({err}); reporting NA",
                contrast,
                cell.key.0,
                cell.key.1,
                cell.key.2
            );
            return na;
        }
    };
    let se = match glm::wald_standard_errors(&design, &fit.mu, alpha) {
        Ok(se) => se,
        Err(_) => return na,
    };

    let z = fit.beta[1] / se[1];
    let normal = Normal::new(0.0, 1.0).expect("standard normal");
    let p = (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0);

    DifferentialResult {
        log2_fold_change: Some(fit.beta[1] / std::f64::consts::LN_2),
        p_value: Some(p),
        q_value: None,
        ..na
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactrs_core::models::bin::{BinTable, GenomicBin};
    use contactrs_core::models::container::InteractionContainer;
    use contactrs_core::models::record::CountRecord;

    use pretty_assertions::assert_eq;
    use rstest::*;

    const N_BINS: u32 = 12;
    const BIN: u32 = 10_000;

    /// A scored container: counts decay with distance, mu matches the
    /// generating curve, sdev encodes a known background dispersion.
    fn scored_container(counts: &dyn Fn(u32, u32) -> u32) -> InteractionContainer {
        let bins: Vec<GenomicBin> = (0..N_BINS)
            .map(|k| GenomicBin {
                start: k * BIN,
                end: (k + 1) * BIN,
                gc: 0.4,
                mappability: None,
                effective_length: BIN as f64,
                index: 0,
            })
            .collect();
        let table = BinTable::new("chr1", "uniform:10000", bins).unwrap();
        let mut container = InteractionContainer::build(table, 200_000).unwrap();

        let rows: Vec<CountRecord> = container
            .records()
            .iter()
            .map(|r| CountRecord {
                chrom: "chr1".into(),
                start_i: r.start_i,
                start_j: r.start_j,
                count: counts(r.start_i, r.start_j),
            })
            .collect();
        container.add_counts(rows);

        let alpha = 0.05;
        for record in container.records_mut() {
            let mu = expected(record.start_i, record.start_j);
            record.mu = Some(mu);
            record.sdev = Some((mu + alpha * mu * mu).sqrt());
        }
        container
    }

    fn expected(start_i: u32, start_j: u32) -> f64 {
        let d = (start_j - start_i) as f64;
        5000.0 / d.powf(0.5)
    }

    fn sample(name: &str, counts: &dyn Fn(u32, u32) -> u32) -> Sample {
        Sample::new(name, vec![scored_container(counts)]).unwrap()
    }

    fn baseline_counts(jitter: u64) -> impl Fn(u32, u32) -> u32 {
        move |i, j| {
            let base = expected(i, j);
            let wiggle = 0.9 + 0.2 * (((i as u64 + 3 * j as u64 + jitter) % 7) as f64 / 7.0);
            (base * wiggle).round() as u32
        }
    }

    fn full_filter() -> FilterSet {
        let container = scored_container(&|_, _| 0);
        container
            .records()
            .iter()
            .map(|r| ("chr1".to_string(), r.start_i, r.start_j))
            .collect()
    }

    fn two_conditions(b_scale: f64) -> Vec<Condition> {
        let scaled = move |jitter: u64| {
            let base = baseline_counts(jitter);
            move |i: u32, j: u32| (base(i, j) as f64 * b_scale).round() as u32
        };
        vec![
            Condition {
                name: "control".into(),
                samples: vec![
                    sample("control_1", &baseline_counts(1)),
                    sample("control_2", &baseline_counts(2)),
                ],
            },
            Condition {
                name: "treated".into(),
                samples: vec![sample("treated_1", &scaled(3)), sample("treated_2", &scaled(4))],
            },
        ]
    }

    #[rstest]
    fn test_null_contrast_is_flat() {
        let conditions = two_conditions(1.0);
        let results = compare(&conditions, &full_filter(), "control").unwrap();

        assert!(!results.is_empty());
        for r in &results {
            let lfc = r.log2_fold_change.unwrap();
            assert!(lfc.abs() < 0.5, "lfc={} at {}:{}", lfc, r.start_i, r.start_j);
            assert!(r.q_value.unwrap() > 0.05, "q={}", r.q_value.unwrap());
        }
    }

    #[rstest]
    fn test_identical_counts_give_zero_lfc_and_unit_q() {
        // both conditions share the exact same replicate counts
        let conditions = vec![
            Condition {
                name: "a".into(),
                samples: vec![
                    sample("a1", &baseline_counts(5)),
                    sample("a2", &baseline_counts(6)),
                ],
            },
            Condition {
                name: "b".into(),
                samples: vec![
                    sample("b1", &baseline_counts(5)),
                    sample("b2", &baseline_counts(6)),
                ],
            },
        ];
        let results = compare(&conditions, &full_filter(), "a").unwrap();
        for r in &results {
            assert!(r.log2_fold_change.unwrap().abs() < 1e-6);
            assert!(r.q_value.unwrap() > 0.99);
        }
    }

    #[rstest]
    fn test_shifted_condition_detected() {
        let conditions = two_conditions(4.0);
        let results = compare(&conditions, &full_filter(), "control").unwrap();

        let mean_lfc: f64 = results
            .iter()
            .filter_map(|r| r.log2_fold_change)
            .sum::<f64>()
            / results.len() as f64;
        assert!((mean_lfc - 2.0).abs() < 0.3, "mean lfc={}", mean_lfc);
        let n_significant = results
            .iter()
            .filter(|r| r.q_value.is_some_and(|q| q < 0.05))
            .count();
        assert!(
            n_significant > results.len() / 2,
            "{} of {} significant",
            n_significant,
            results.len()
        );
    }

    #[rstest]
    fn test_contrast_chain_is_monotonic() {
        let mut conditions = two_conditions(1.0);
        conditions.push(Condition {
            name: "late".into(),
            samples: vec![
                sample("late_1", &baseline_counts(7)),
                sample("late_2", &baseline_counts(8)),
            ],
        });
        let results = compare(&conditions, &full_filter(), "control").unwrap();

        let mut contrasts: Vec<&str> = results.iter().map(|r| r.contrast.as_str()).collect();
        contrasts.dedup();
        assert_eq!(contrasts, vec!["treated_vs_control", "late_vs_treated"]);
    }

    #[rstest]
    fn test_all_zero_interactions_excluded() {
        let zero_pair = (0u32, 10_000u32);
        let base = baseline_counts(1);
        let zeroed = move |i: u32, j: u32| {
            if (i, j) == zero_pair { 0 } else { base(i, j) }
        };
        let conditions = vec![
            Condition {
                name: "a".into(),
                samples: vec![sample("a1", &zeroed), sample("a2", &zeroed)],
            },
            Condition {
                name: "b".into(),
                samples: vec![sample("b1", &zeroed), sample("b2", &zeroed)],
            },
        ];
        let results = compare(&conditions, &full_filter(), "a").unwrap();
        assert!(
            !results
                .iter()
                .any(|r| (r.start_i, r.start_j) == zero_pair)
        );
    }

    #[rstest]
    fn test_unscored_replicate_reports_na() {
        let mut conditions = two_conditions(1.0);
        // strip the background fit from one replicate record
        let target = (0u32, 10_000u32);
        {
            let container = &mut conditions[0].samples[0].containers_mut()[0];
            let pos = container.position(target.0, target.1).unwrap();
            container.records_mut()[pos].clear_scores();
        }
        let results = compare(&conditions, &full_filter(), "control").unwrap();
        let hit = results
            .iter()
            .find(|r| (r.start_i, r.start_j) == target)
            .unwrap();
        assert_eq!(hit.p_value, None);
        assert_eq!(hit.q_value, None);
        assert_eq!(hit.log2_fold_change, None);
    }

    #[rstest]
    fn test_config_errors() {
        let conditions = two_conditions(1.0);

        assert!(matches!(
            compare(&conditions[..1], &full_filter(), "control"),
            Err(ConfigError::TooFewConditions(1))
        ));
        assert!(matches!(
            compare(&conditions, &full_filter(), "missing"),
            Err(ConfigError::UnknownReference(_))
        ));
        let mut empty = FilterSet::new();
        empty.insert("chr9", 0, 10_000);
        assert!(matches!(
            compare(&conditions, &empty, "control"),
            Err(ConfigError::EmptyFilterSet)
        ));
    }

    #[rstest]
    fn test_q_at_least_p() {
        let conditions = two_conditions(2.0);
        let results = compare(&conditions, &full_filter(), "control").unwrap();
        for r in results.iter().filter(|r| r.p_value.is_some()) {
            assert!(r.q_value.unwrap() >= r.p_value.unwrap() - 1e-12);
        }
    }
}
