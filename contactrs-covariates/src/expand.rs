use std::collections::BTreeMap;

use contactrs_core::consts::{COV_EFFECTIVE_LENGTH, COV_GC, COV_LOG_DISTANCE, COV_MAPPABILITY};
use contactrs_core::models::container::InteractionContainer;

use crate::errors::CovariateError;

/// Symmetric combination of the two anchor bins' values for one 1-D
/// covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    Mean,
    GeometricMean,
    Product,
    Sum,
}

impl Combine {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Combine::Mean => (a + b) / 2.0,
            Combine::GeometricMean => (a * b).sqrt(),
            Combine::Product => a * b,
            Combine::Sum => a + b,
        }
    }
}

///
/// Maps each 1-D covariate name to its combination function.
///
/// Defaults: arithmetic mean for fraction-like covariates (GC,
/// mappability), product for length-like covariates.
///
#[derive(Debug, Clone)]
pub struct ExpansionSpec {
    combiners: BTreeMap<String, Combine>,
}

impl Default for ExpansionSpec {
    fn default() -> Self {
        let mut combiners = BTreeMap::new();
        combiners.insert(COV_GC.to_string(), Combine::Mean);
        combiners.insert(COV_EFFECTIVE_LENGTH.to_string(), Combine::Product);
        combiners.insert(COV_MAPPABILITY.to_string(), Combine::Mean);
        ExpansionSpec { combiners }
    }
}

impl ExpansionSpec {
    pub fn with_combiner(mut self, name: impl Into<String>, combine: Combine) -> Self {
        self.combiners.insert(name.into(), combine);
        self
    }

    fn combiner_for(&self, name: &str) -> Combine {
        self.combiners.get(name).copied().unwrap_or(Combine::Mean)
    }
}

///
/// Expand the container's 1-D bin covariates into 2-D interaction-level
/// covariate columns, plus the derived log-distance term.
///
/// Must run before significance fitting. Re-running is safe: columns are
/// overwritten, so expansion is idempotent.
///
pub fn expand(
    container: &mut InteractionContainer,
    spec: &ExpansionSpec,
) -> Result<(), CovariateError> {
    let with_mappability = container.bins().has_mappability();

    let mut gc = Vec::with_capacity(container.len());
    let mut eff_len = Vec::with_capacity(container.len());
    let mut mappability = Vec::with_capacity(container.len());
    let mut log_distance = Vec::with_capacity(container.len());

    let gc_combine = spec.combiner_for(COV_GC);
    let len_combine = spec.combiner_for(COV_EFFECTIVE_LENGTH);
    let map_combine = spec.combiner_for(COV_MAPPABILITY);

    for record in container.records() {
        let bins = container.bins();
        let bin_i = &bins.bins()[bins
            .index_of_start(record.start_i)
            .expect("container invariant: anchors are bin starts")];
        let bin_j = &bins.bins()[bins
            .index_of_start(record.start_j)
            .expect("container invariant: anchors are bin starts")];

        gc.push(gc_combine.apply(bin_i.gc, bin_j.gc));
        eff_len.push(len_combine.apply(bin_i.effective_length, bin_j.effective_length));
        if with_mappability {
            // has_mappability guarantees Some for every bin
            mappability.push(map_combine.apply(
                bin_i.mappability.unwrap_or(0.0),
                bin_j.mappability.unwrap_or(0.0),
            ));
        }
        log_distance.push((1.0 + record.distance() as f64).ln());
    }

    container.set_covariate(COV_GC, gc)?;
    container.set_covariate(COV_EFFECTIVE_LENGTH, eff_len)?;
    if with_mappability {
        container.set_covariate(COV_MAPPABILITY, mappability)?;
    }
    container.set_covariate(COV_LOG_DISTANCE, log_distance)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactrs_core::models::bin::{BinTable, GenomicBin};

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn bin(start: u32, end: u32, gc: f64, mappability: Option<f64>) -> GenomicBin {
        GenomicBin {
            start,
            end,
            gc,
            mappability,
            effective_length: (end - start) as f64,
            index: 0,
        }
    }

    fn toy_container(mappability: bool) -> InteractionContainer {
        let m = |v: f64| if mappability { Some(v) } else { None };
        let table = BinTable::new(
            "chr1",
            "uniform:1000",
            vec![
                bin(0, 1000, 0.2, m(1.0)),
                bin(1000, 2000, 0.4, m(0.5)),
                bin(2000, 3000, 0.6, m(0.8)),
            ],
        )
        .unwrap();
        InteractionContainer::build(table, 10_000).unwrap()
    }

    #[rstest]
    fn test_default_combiners() {
        let mut container = toy_container(true);
        expand(&mut container, &ExpansionSpec::default()).unwrap();

        // record order: (0,1000) (0,2000) (1000,2000)
        let gc = container.covariate(COV_GC).unwrap();
        assert!((gc[0] - 0.3).abs() < 1e-12);
        assert!((gc[1] - 0.4).abs() < 1e-12);

        let eff = container.covariate(COV_EFFECTIVE_LENGTH).unwrap();
        assert!((eff[0] - 1_000_000.0).abs() < 1e-9);

        let mappability = container.covariate(COV_MAPPABILITY).unwrap();
        assert!((mappability[0] - 0.75).abs() < 1e-12);

        let log_d = container.covariate(COV_LOG_DISTANCE).unwrap();
        assert!((log_d[0] - 1001f64.ln()).abs() < 1e-12);
        assert!((log_d[1] - 2001f64.ln()).abs() < 1e-12);
    }

    #[rstest]
    fn test_mappability_omitted_without_track() {
        let mut container = toy_container(false);
        expand(&mut container, &ExpansionSpec::default()).unwrap();
        assert_eq!(container.covariate(COV_MAPPABILITY), None);
    }

    #[rstest]
    fn test_expand_is_idempotent() {
        let mut once = toy_container(true);
        expand(&mut once, &ExpansionSpec::default()).unwrap();

        let mut twice = once.clone();
        expand(&mut twice, &ExpansionSpec::default()).unwrap();
        assert_eq!(once, twice);
    }

    #[rstest]
    fn test_custom_combiner() {
        let mut container = toy_container(false);
        let spec = ExpansionSpec::default().with_combiner(COV_GC, Combine::GeometricMean);
        expand(&mut container, &spec).unwrap();

        let gc = container.covariate(COV_GC).unwrap();
        assert!((gc[0] - (0.2f64 * 0.4).sqrt()).abs() < 1e-12);
    }
}
