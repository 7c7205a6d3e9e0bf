use crate::utils::util::Result;
use std::{collections::HashMap, fmt, str::FromStr};

/// A 1-based, inclusive locus range on one contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicRange {
    pub contig: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicRange {
    pub fn new(contig: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            contig: contig.into(),
            start,
            end,
        }
    }

    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for GenomicRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.contig, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    Linear,
    Exponential,
}

impl FromStr for GrowthPolicy {
    type Err = crate::error::VcfxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(GrowthPolicy::Linear),
            "exponential" | "exp" => Ok(GrowthPolicy::Exponential),
            _ => Err(crate::vcfx_error!(
                "Invalid shard growth policy '{s}', expected 'linear' or 'exponential'"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub initial_size: u64,
    pub growth: GrowthPolicy,
    pub intervals: Option<Vec<GenomicRange>>,
}

impl ShardConfig {
    pub fn new(initial_size: u64, growth: GrowthPolicy) -> Result<Self> {
        if initial_size == 0 {
            return Err(crate::vcfx_error!("Shard size must be at least 1"));
        }
        Ok(Self {
            initial_size,
            growth,
            intervals: None,
        })
    }

    pub fn with_intervals(mut self, intervals: Vec<GenomicRange>) -> Self {
        self.intervals = Some(intervals);
        self
    }
}

/// Tiles a sequence dictionary (or an interval list over it) into shards.
///
/// Exponential growth yields `initial_size^k` for the k-th shard of a contig
/// and starts over at `k = 1` on the next contig.
#[derive(Debug)]
pub struct LocusShards {
    regions: Vec<GenomicRange>,
    initial_size: u64,
    growth: GrowthPolicy,
    region_idx: usize,
    cursor: Option<u64>,
    exponent: u32,
    last_contig: Option<String>,
}

impl LocusShards {
    pub fn new(dictionary: &[(String, u64)], config: &ShardConfig) -> Result<Self> {
        let regions = match &config.intervals {
            None => dictionary
                .iter()
                .map(|(contig, length)| GenomicRange::new(contig.clone(), 1, *length))
                .collect(),
            Some(intervals) => Self::clip_intervals(dictionary, intervals)?,
        };
        Ok(Self {
            regions,
            initial_size: config.initial_size,
            growth: config.growth,
            region_idx: 0,
            cursor: None,
            exponent: 0,
            last_contig: None,
        })
    }

    fn clip_intervals(
        dictionary: &[(String, u64)],
        intervals: &[GenomicRange],
    ) -> Result<Vec<GenomicRange>> {
        let lengths: HashMap<&str, u64> = dictionary
            .iter()
            .map(|(contig, length)| (contig.as_str(), *length))
            .collect();
        intervals
            .iter()
            .map(|interval| {
                let length = lengths.get(interval.contig.as_str()).ok_or_else(|| {
                    crate::vcfx_error!(
                        "Interval {} is on a contig missing from the sequence dictionary",
                        interval
                    )
                })?;
                if interval.start == 0 || interval.start > interval.end {
                    return Err(crate::vcfx_error!(
                        "Interval {} must be 1-based with start <= end",
                        interval
                    ));
                }
                Ok(GenomicRange::new(
                    interval.contig.clone(),
                    interval.start,
                    interval.end.min(*length),
                ))
            })
            .collect()
    }

    fn next_size(&mut self) -> u64 {
        match self.growth {
            GrowthPolicy::Linear => self.initial_size,
            GrowthPolicy::Exponential => {
                self.exponent = self.exponent.saturating_add(1);
                self.initial_size.saturating_pow(self.exponent)
            }
        }
    }
}

impl Iterator for LocusShards {
    type Item = GenomicRange;

    fn next(&mut self) -> Option<GenomicRange> {
        loop {
            let region = self.regions.get(self.region_idx)?.clone();
            let cursor = match self.cursor {
                Some(cursor) => cursor,
                None => {
                    if self.last_contig.as_deref() != Some(region.contig.as_str()) {
                        self.exponent = 0;
                        self.last_contig = Some(region.contig.clone());
                    }
                    region.start
                }
            };
            if cursor > region.end {
                self.region_idx += 1;
                self.cursor = None;
                continue;
            }

            let size = self.next_size();
            let end = cursor.saturating_add(size - 1).min(region.end);
            if end == region.end {
                self.region_idx += 1;
                self.cursor = None;
            } else {
                self.cursor = Some(end + 1);
            }
            return Some(GenomicRange::new(region.contig, cursor, end));
        }
    }
}
