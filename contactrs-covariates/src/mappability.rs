use std::collections::HashMap;

///
/// A quantitative mappability track.
///
/// Absence of a track is a valid state everywhere in the pipeline: the
/// covariate is then omitted from modeling rather than treated as an
/// error.
///
pub trait MappabilitySource {
    /// Length-weighted mean mappability over `[start, end)`, or `None`
    /// when the track has no data for the interval.
    fn mean(&self, chrom: &str, start: u32, end: u32) -> Option<f64>;
}

///
/// Sorted interval track held in memory, one interval list per
/// chromosome.
///
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappability {
    tracks: HashMap<String, Vec<(u32, u32, f64)>>,
}

impl InMemoryMappability {
    pub fn new() -> Self {
        InMemoryMappability::default()
    }

    pub fn from_intervals<I, S>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (S, u32, u32, f64)>,
        S: Into<String>,
    {
        let mut tracks: HashMap<String, Vec<(u32, u32, f64)>> = HashMap::new();
        for (chrom, start, end, value) in intervals {
            tracks.entry(chrom.into()).or_default().push((start, end, value));
        }
        for list in tracks.values_mut() {
            list.sort_by_key(|iv| iv.0);
        }
        InMemoryMappability { tracks }
    }
}

impl MappabilitySource for InMemoryMappability {
    fn mean(&self, chrom: &str, start: u32, end: u32) -> Option<f64> {
        let list = self.tracks.get(chrom)?;
        if end <= start {
            return None;
        }

        // first interval that could overlap [start, end)
        let from = list.partition_point(|iv| iv.1 <= start);

        let mut weighted = 0.0;
        let mut covered = 0u64;
        for &(iv_start, iv_end, value) in &list[from..] {
            if iv_start >= end {
                break;
            }
            let lo = iv_start.max(start);
            let hi = iv_end.min(end);
            if hi > lo {
                let len = (hi - lo) as u64;
                weighted += value * len as f64;
                covered += len;
            }
        }

        if covered == 0 {
            None
        } else {
            // uncovered bases count as zero mappability
            Some(weighted / (end - start) as f64)
        }
    }
}
