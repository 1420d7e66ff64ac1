//! Efficiency-binned record of the best cuts found so far.

use rectcut_core::{
    Bounds, BoundsVector, Sample, TradeoffCurve, TradeoffPoint,
    evaluate::{Performance, evaluate},
};

use crate::genetic::Individual;

#[derive(Debug, Clone, PartialEq)]
struct ArchiveEntry {
    signal_efficiency: f64,
    background_efficiency: f64,
    cuts: Vec<Bounds>,
}

/// Keeps, for each signal-efficiency bin, the cuts with the lowest background
/// efficiency seen in any generation of any cycle.
///
/// Ties on background efficiency prefer the higher signal efficiency, then the
/// entry already stored.
#[derive(Debug, Clone)]
pub struct FrontierArchive {
    bins: Vec<Option<ArchiveEntry>>,
}

impl FrontierArchive {
    #[must_use]
    pub fn new(bin_count: usize) -> Self {
        Self {
            bins: vec![None; bin_count.max(1)],
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn bin_index(&self, signal_efficiency: f64) -> usize {
        let n = self.bins.len();
        ((signal_efficiency * n as f64).floor() as usize).min(n - 1)
    }

    /// Records `ind` if it beats its bin. Returns whether it was stored.
    ///
    /// Cuts that keep no signal are ignored.
    pub fn offer(&mut self, ind: &Individual) -> bool {
        let signal_efficiency = ind.signal_efficiency();
        let background_efficiency = ind.background_efficiency();
        if !(signal_efficiency > 0.0) || background_efficiency.is_nan() {
            return false;
        }
        let index = self.bin_index(signal_efficiency);
        let better = match &self.bins[index] {
            None => true,
            Some(entry) => {
                background_efficiency < entry.background_efficiency
                    || (background_efficiency == entry.background_efficiency
                        && signal_efficiency > entry.signal_efficiency)
            }
        };
        if better {
            self.bins[index] = Some(ArchiveEntry {
                signal_efficiency,
                background_efficiency,
                cuts: ind.cuts().to_vec(),
            });
        }
        better
    }

    /// Number of filled bins.
    #[must_use]
    pub fn coverage(&self) -> usize {
        self.bins.iter().flatten().count()
    }

    /// Cuts of up to `count` filled bins spread evenly over the filled range.
    #[must_use]
    pub fn elites(&self, count: usize) -> Vec<Vec<Bounds>> {
        let filled = self.bins.iter().flatten().collect::<Vec<_>>();
        if filled.is_empty() || count == 0 {
            return vec![];
        }
        let count = count.min(filled.len());
        let mut elites = Vec::with_capacity(count);
        for k in 0..count {
            // integer spacing, always includes the loosest filled bin when count > 1
            let index = if count == 1 {
                filled.len() - 1
            } else {
                k * (filled.len() - 1) / (count - 1)
            };
            elites.push(filled[index].cuts.clone());
        }
        elites
    }

    /// Turns the archive into a monotone trade-off curve.
    ///
    /// `anchor` is the loosest cut set allowed by the search range and `anchor_train`
    /// its performance on the training samples. It always closes the curve at the
    /// high-efficiency end, so targets beyond every trained point clamp to it and
    /// never to cuts outside the search range. Stored cuts that reach the anchor's
    /// efficiency are left to it. When `test` samples are given, every point also
    /// records its held-out performance.
    #[must_use]
    pub fn into_curve(
        self,
        anchor: BoundsVector,
        anchor_train: Performance,
        test: Option<(&Sample, &Sample)>,
    ) -> TradeoffCurve {
        let measure = |cuts: &BoundsVector| {
            test.and_then(|(signal, background)| evaluate(cuts, signal, background).ok())
        };
        let mut candidates = self
            .bins
            .into_iter()
            .flatten()
            .filter(|entry| entry.signal_efficiency < anchor_train.signal_efficiency)
            .map(|entry| {
                let cuts = BoundsVector::new(entry.cuts);
                TradeoffPoint {
                    signal_efficiency: entry.signal_efficiency,
                    background_rejection: 1.0 - entry.background_efficiency,
                    test: measure(&cuts),
                    cuts,
                }
            })
            .collect::<Vec<_>>();

        candidates.push(TradeoffPoint {
            signal_efficiency: anchor_train.signal_efficiency,
            background_rejection: anchor_train.background_rejection,
            test: measure(&anchor),
            cuts: anchor,
        });
        TradeoffCurve::from_candidates(candidates)
    }
}
