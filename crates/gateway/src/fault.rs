//! Fault injection for the in-process gateway

use rand::Rng;

/// Fault injection rates, each a probability in `[0, 1]`.
///
/// Rates are disjoint slices of a single roll: a dispatch is rejected with
/// `reject_rate`, fails asynchronously with `failure_rate`, is silently
/// dropped with `drop_rate`, and is delivered otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultProfile {
    /// Probability of a synchronous dispatch rejection.
    pub reject_rate: f64,
    /// Probability of an asynchronous remote failure.
    pub failure_rate: f64,
    /// Probability that an accepted request never completes.
    pub drop_rate: f64,
}

/// What the fault roll decided for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultDecision {
    Deliver,
    Reject,
    Fail,
    Drop,
}

impl FaultProfile {
    pub(crate) fn decide<R: Rng>(&self, rng: &mut R) -> FaultDecision {
        let roll: f64 = rng.random();
        if roll < self.reject_rate {
            FaultDecision::Reject
        } else if roll < self.reject_rate + self.failure_rate {
            FaultDecision::Fail
        } else if roll < self.reject_rate + self.failure_rate + self.drop_rate {
            FaultDecision::Drop
        } else {
            FaultDecision::Deliver
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rates_always_deliver() {
        let profile = FaultProfile::default();
        let mut rng = rand::rng();
        for _ in 0..100 {
            assert_eq!(profile.decide(&mut rng), FaultDecision::Deliver);
        }
    }

    #[test]
    fn test_full_reject_rate_always_rejects() {
        let profile = FaultProfile {
            reject_rate: 1.0,
            ..Default::default()
        };
        let mut rng = rand::rng();
        for _ in 0..100 {
            assert_eq!(profile.decide(&mut rng), FaultDecision::Reject);
        }
    }

    #[test]
    fn test_rates_roughly_proportional() {
        let profile = FaultProfile {
            reject_rate: 0.25,
            failure_rate: 0.25,
            drop_rate: 0.25,
        };
        let mut rng = rand::rng();
        let mut delivered = 0;
        let trials = 10_000;
        for _ in 0..trials {
            if profile.decide(&mut rng) == FaultDecision::Deliver {
                delivered += 1;
            }
        }
        let ratio = delivered as f64 / trials as f64;
        assert!((0.20..0.30).contains(&ratio), "delivered ratio {ratio}");
    }
}
