//! Synthetic `LOOKUP` responses.
//!
//! Produces a random path statistics object in the same shape as the
//! lookup fixtures, one entry per path in each parallel array. Only used
//! when `random_lookup` is enabled; fixtures are the default.

use rand::Rng;
use serde::Serialize;
use std::ops::Range;

const PATHS: Range<usize> = 5..10;
const PACKETS: Range<u64> = 0..100;
const RTT_US: Range<u64> = 10_000..99_999;
const HOPS: Range<usize> = 10..16;
const IFID: Range<u32> = 1..5;
const ISD: Range<u32> = 1..2;
const AS: Range<u32> = 10..25;

/// One interface hop along a path
#[derive(Debug, Clone, Serialize)]
pub struct Hop {
    #[serde(rename = "IFID")]
    pub ifid: u32,
    #[serde(rename = "ISD")]
    pub isd: u32,
    #[serde(rename = "AS")]
    pub asn: u32,
}

/// Per-path statistics for a looked-up URL
#[derive(Debug, Clone, Serialize)]
pub struct LookupStats {
    pub sent_packets: Vec<u64>,
    pub received_packets: Vec<u64>,
    pub acked_packets: Vec<u64>,
    pub rtts: Vec<u64>,
    pub loss_rates: Vec<f64>,
    pub if_lists: Vec<Vec<Hop>>,
    pub if_counts: Vec<usize>,
}

impl LookupStats {
    /// Generate random statistics for 5 to 9 paths.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let paths = rng.gen_range(PATHS);

        let if_counts: Vec<usize> = (0..paths).map(|_| rng.gen_range(HOPS)).collect();
        let if_lists = if_counts
            .iter()
            .map(|&count| {
                (0..count)
                    .map(|_| Hop {
                        ifid: rng.gen_range(IFID),
                        isd: rng.gen_range(ISD),
                        asn: rng.gen_range(AS),
                    })
                    .collect()
            })
            .collect();

        LookupStats {
            sent_packets: random_ints(rng, PACKETS, paths),
            received_packets: random_ints(rng, PACKETS, paths),
            acked_packets: random_ints(rng, PACKETS, paths),
            rtts: random_ints(rng, RTT_US, paths),
            loss_rates: (0..paths).map(|_| rng.gen::<f64>()).collect(),
            if_lists,
            if_counts,
        }
    }
}

fn random_ints<R: Rng + ?Sized>(rng: &mut R, range: Range<u64>, count: usize) -> Vec<u64> {
    (0..count).map(|_| rng.gen_range(range.clone())).collect()
}

/// Generate a random `LOOKUP` response body.
pub fn generate_random_lookup<R: Rng + ?Sized>(rng: &mut R) -> String {
    // Serializing plain numbers and vectors cannot fail
    serde_json::to_string(&LookupStats::random(rng)).unwrap_or_default()
}
