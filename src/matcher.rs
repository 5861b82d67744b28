use handkey_gesture::{bit_similarity, Credential, HashProfile};
use log::warn;

pub const DEFAULT_THRESHOLD: f64 = 0.85;
pub const MIN_THRESHOLD: f64 = 0.50;
pub const MAX_THRESHOLD: f64 = 0.99;

/// How a re-derived credential is compared with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MatchPolicy {
    /// Byte-equal digests only.
    #[default]
    Exact,
    /// Accept when the fraction of equal digest bits reaches `threshold`.
    /// Trades discrimination for tolerance; meant for short rolling digests.
    Similarity { threshold: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub accepted: bool,
    pub similarity: f64,
}

pub fn decide(policy: MatchPolicy, stored: &Credential, probe: &Credential) -> Decision {
    if !stored.is_comparable(probe) {
        return Decision {
            accepted: false,
            similarity: 0.0,
        };
    }

    match policy {
        MatchPolicy::Exact => {
            let accepted = stored.digest == probe.digest;
            Decision {
                accepted,
                similarity: if accepted { 1.0 } else { 0.0 },
            }
        }
        MatchPolicy::Similarity { threshold } => {
            if stored.params.profile == HashProfile::Sha256 {
                warn!("similarity matching on a SHA-256 credential gives no useful tolerance");
            }
            let similarity = bit_similarity(&stored.digest, &probe.digest);
            Decision {
                accepted: similarity >= threshold,
                similarity,
            }
        }
    }
}

/// Best accepted candidate for `probe`, highest similarity first.
pub fn best_match<'a, I>(
    candidates: I,
    probe: &Credential,
    policy: MatchPolicy,
) -> Option<(&'a str, Decision)>
where
    I: IntoIterator<Item = (&'a str, &'a Credential)>,
{
    candidates
        .into_iter()
        .map(|(name, stored)| (name, decide(policy, stored, probe)))
        .filter(|(_, d)| d.accepted)
        .fold(None, |acc, (name, d)| match acc {
            Some((best, bd)) if bd.similarity >= d.similarity => Some((best, bd)),
            _ => Some((name, d)),
        })
}
