use crate::errors::ConfigError;
use crate::models::container::InteractionContainer;
use crate::utils::chrom_karyotype_key;

///
/// A named collection of per-chromosome interaction containers sharing one
/// binning schema.
///
/// Containers are kept in karyotypic chromosome order (1..22, X, Y, M,
/// then everything else), which fixes the per-chromosome seed derivation
/// and the output order of parallel runs.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    containers: Vec<InteractionContainer>,
}

impl Sample {
    pub fn new(
        name: impl Into<String>,
        mut containers: Vec<InteractionContainer>,
    ) -> Result<Self, ConfigError> {
        containers.sort_by(|a, b| chrom_karyotype_key(a.chrom()).cmp(&chrom_karyotype_key(b.chrom())));

        for pair in containers.windows(2) {
            if pair[0].chrom() == pair[1].chrom() {
                return Err(ConfigError::DuplicateChromosome(pair[0].chrom().to_string()));
            }
        }
        if let Some(first) = containers.first() {
            let schema = first.bins().schema().to_string();
            for container in &containers[1..] {
                if container.bins().schema() != schema {
                    return Err(ConfigError::SchemaMismatch(
                        schema,
                        container.bins().schema().to_string(),
                    ));
                }
            }
        }

        Ok(Sample {
            name: name.into(),
            containers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn containers(&self) -> &[InteractionContainer] {
        &self.containers
    }

    pub fn containers_mut(&mut self) -> &mut [InteractionContainer] {
        &mut self.containers
    }

    pub fn get(&self, chrom: &str) -> Option<&InteractionContainer> {
        self.containers.iter().find(|c| c.chrom() == chrom)
    }

    /// The shared binning schema label, if the sample has any containers.
    pub fn schema(&self) -> Option<&str> {
        self.containers.first().map(|c| c.bins().schema())
    }

    /// Whether `other` was binned identically to this sample -- the
    /// precondition for any cross-sample comparison.
    pub fn is_comparable_with(&self, other: &Sample) -> bool {
        match (self.schema(), other.schema()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
