//! Enrollment and verification built on the gesture pipeline.
//!
//! One attempt walks `Idle → Captured → FeaturesExtracted → Quantized → Hashed` and
//! ends `Accepted` or `Rejected`. The username is always the salt, so the same
//! pose enrolled by two users yields unrelated credentials.
//!
//! Verification re-derives with the parameters stored next to the credential,
//! not the configured ones: a config change never silently locks users out.

use handkey_gesture::{
    Credential, Gesture, LandmarkSet, LandmarkSource, Pipeline, PipelineParams,
};
use log::{debug, info, warn};

use crate::config::Config;
use crate::error::AuthError;
use crate::matcher::{self, MatchPolicy};
use crate::storage::CredentialStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Captured,
    FeaturesExtracted,
    Quantized,
    Hashed,
    Accepted,
    Rejected,
}

struct Attempt<'a> {
    user: &'a str,
    state: AttemptState,
}

impl<'a> Attempt<'a> {
    fn new(user: &'a str) -> Self {
        Self {
            user,
            state: AttemptState::Idle,
        }
    }

    fn advance(&mut self, next: AttemptState) {
        debug!("{}: {:?} -> {:?}", self.user, self.state, next);
        self.state = next;
    }

    /// Run the pipeline stages, recording each transition.
    fn derive(&mut self, pipeline: &Pipeline, hand: &LandmarkSet) -> Credential {
        self.advance(AttemptState::Captured);
        let features = pipeline.extract(hand);
        self.advance(AttemptState::FeaturesExtracted);
        let quantized = pipeline.quantize(&features);
        self.advance(AttemptState::Quantized);
        let credential = pipeline.hash(&quantized, Some(self.user));
        self.advance(AttemptState::Hashed);
        credential
    }
}

#[derive(Debug, Clone)]
pub struct Enrollment {
    pub user: String,
    pub credential: Credential,
    pub gesture: Gesture,
    pub state: AttemptState,
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub user: String,
    pub similarity: f64,
    pub gesture: Gesture,
    pub state: AttemptState,
}

pub struct Authenticator<S> {
    store: S,
    params: PipelineParams,
    policy: MatchPolicy,
}

impl<S: CredentialStore> Authenticator<S> {
    pub fn new(store: S, params: PipelineParams, policy: MatchPolicy) -> Self {
        Self {
            store,
            params,
            policy,
        }
    }

    pub fn from_config(store: S, cfg: &Config) -> Self {
        Self::new(store, cfg.params(), cfg.policy())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn params(&self) -> PipelineParams {
        self.params
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Register a first credential for `username` from one captured hand.
    pub fn enroll(
        &self,
        username: &str,
        hand: Option<&LandmarkSet>,
    ) -> Result<Enrollment, AuthError> {
        let user = username.trim();
        if user.is_empty() {
            return Err(AuthError::EmptyUsername);
        }
        if self.store.lookup(user)?.is_some() {
            return Err(AuthError::AlreadyExists(user.to_string()));
        }
        let hand = hand.ok_or(AuthError::NoHandDetected)?;

        let mut attempt = Attempt::new(user);
        let pipeline = Pipeline::new(self.params);
        let credential = attempt.derive(&pipeline, hand);

        self.store.insert(user, credential.clone())?;
        attempt.advance(AttemptState::Accepted);

        let gesture = Gesture::of(hand);
        info!("enrolled {} ({}, {})", user, gesture, self.params);
        Ok(Enrollment {
            user: user.to_string(),
            credential,
            gesture,
            state: attempt.state,
        })
    }

    /// Re-derive the credential for `username` from a fresh capture and compare.
    ///
    /// A mismatch is an ordinary outcome: the caller should let the user capture again.
    pub fn verify(
        &self,
        username: &str,
        hand: Option<&LandmarkSet>,
    ) -> Result<Verification, AuthError> {
        let user = username.trim();
        if user.is_empty() {
            return Err(AuthError::EmptyUsername);
        }
        let stored = self
            .store
            .lookup(user)?
            .ok_or_else(|| AuthError::UserNotFound(user.to_string()))?;
        if !stored.params.is_supported() {
            return Err(AuthError::StoreUnavailable(format!(
                "record for '{}' has unsupported params {}",
                user, stored.params
            )));
        }
        let hand = hand.ok_or(AuthError::NoHandDetected)?;

        if stored.params != self.params {
            warn!(
                "{} was enrolled with {}, configured {}; verifying with the enrolled parameters",
                user, stored.params, self.params
            );
        }

        let mut attempt = Attempt::new(user);
        let pipeline = Pipeline::new(stored.params);
        let probe = attempt.derive(&pipeline, hand);
        let decision = matcher::decide(self.policy, &stored, &probe);

        if !decision.accepted {
            attempt.advance(AttemptState::Rejected);
            info!("rejected {} (similarity {:.3})", user, decision.similarity);
            return Err(AuthError::CredentialMismatch {
                similarity: decision.similarity,
            });
        }

        attempt.advance(AttemptState::Accepted);
        info!("accepted {} (similarity {:.3})", user, decision.similarity);
        Ok(Verification {
            user: user.to_string(),
            similarity: decision.similarity,
            gesture: Gesture::of(hand),
            state: attempt.state,
        })
    }

    /// Enroll from the first frame that yields a usable hand.
    pub fn enroll_from<L, F>(
        &self,
        username: &str,
        source: &mut L,
        frames: &[F],
    ) -> anyhow::Result<Enrollment>
    where
        L: LandmarkSource,
        F: AsRef<L::Frame>,
    {
        over_frames(source, frames, |hand| self.enroll(username, hand))
    }

    /// Verify against each frame in turn until one is accepted.
    pub fn verify_from<L, F>(
        &self,
        username: &str,
        source: &mut L,
        frames: &[F],
    ) -> anyhow::Result<Verification>
    where
        L: LandmarkSource,
        F: AsRef<L::Frame>,
    {
        over_frames(source, frames, |hand| self.verify(username, hand))
    }

    /// Drop the enrolled credential so the user can enroll again.
    pub fn purge(&self, username: &str) -> Result<(), AuthError> {
        let user = username.trim();
        if user.is_empty() {
            return Err(AuthError::EmptyUsername);
        }
        if !self.store.remove(user)? {
            return Err(AuthError::UserNotFound(user.to_string()));
        }
        info!("purged {}", user);
        Ok(())
    }
}

/// Feed frames to `attempt` until one succeeds.
///
/// Unreadable frames and recapturable outcomes are logged and skipped; any other
/// error ends the run. With no success the last skipped error is returned.
fn over_frames<L, F, T>(
    source: &mut L,
    frames: &[F],
    mut attempt: impl FnMut(Option<&LandmarkSet>) -> Result<T, AuthError>,
) -> anyhow::Result<T>
where
    L: LandmarkSource,
    F: AsRef<L::Frame>,
{
    let mut last_err = anyhow::Error::new(AuthError::NoHandDetected);

    for (i, frame) in frames.iter().enumerate() {
        let hand = match source.detect(frame.as_ref()) {
            Ok(hand) => hand,
            Err(e) => {
                warn!("Frame {}: {:#}", i + 1, e);
                last_err = e;
                continue;
            }
        };
        match attempt(hand.as_ref()) {
            Ok(done) => return Ok(done),
            Err(e) if e.wants_recapture() => {
                warn!("Frame {}: {} ({})", i + 1, e, e.hint());
                last_err = e.into();
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(last_err)
}
