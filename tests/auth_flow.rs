mod common;

use std::num::NonZeroU32;
use std::sync::Barrier;
use std::thread;

use anyhow::Result;
use handkey::{
    AttemptState, AuthError, Authenticator, CaptureFileSource, Credential, CredentialStore,
    FileStore, LandmarkSource, MatchPolicy, MemoryStore, PipelineParams,
};
use handkey_gesture::{Gesture, HashProfile};

use common::{hand, recaptured, write_capture, FIST, OPEN, PEACE};

fn authenticator<S: CredentialStore>(store: S) -> Authenticator<S> {
    Authenticator::new(store, PipelineParams::default(), MatchPolicy::Exact)
}

#[test]
fn enrolled_gesture_verifies_on_recapture() -> Result<()> {
    env_logger::try_init().ok();

    let auth = authenticator(MemoryStore::new());

    let enrollment = auth.enroll("alice", Some(&hand(OPEN)))?;
    assert_eq!(enrollment.state, AttemptState::Accepted);
    assert_eq!(enrollment.gesture, Gesture::OpenHand);
    assert_eq!(enrollment.credential.digest, "9e8ad47e");

    let verification = auth.verify("alice", Some(&recaptured(&hand(OPEN))))?;
    assert_eq!(verification.state, AttemptState::Accepted);
    assert_eq!(verification.similarity, 1.0);
    Ok(())
}

#[test]
fn different_gesture_is_rejected() -> Result<()> {
    let auth = authenticator(MemoryStore::new());
    auth.enroll("alice", Some(&hand(OPEN)))?;

    let err = auth.verify("alice", Some(&hand(FIST))).unwrap_err();
    assert_eq!(err, AuthError::CredentialMismatch { similarity: 0.0 });
    assert!(err.wants_recapture());

    // a rejection leaves the enrollment intact
    auth.verify("alice", Some(&hand(OPEN)))?;
    Ok(())
}

#[test]
fn same_pose_gives_unrelated_credentials_per_user() -> Result<()> {
    let auth = authenticator(MemoryStore::new());
    let alice = auth.enroll("alice", Some(&hand(OPEN)))?;
    let bob = auth.enroll("bob", Some(&hand(OPEN)))?;
    assert_eq!(alice.credential.digest, "9e8ad47e");
    assert_eq!(bob.credential.digest, "9e8ad804");
    Ok(())
}

#[test]
fn usernames_are_trimmed() -> Result<()> {
    let auth = authenticator(MemoryStore::new());
    let enrollment = auth.enroll("  alice\n", Some(&hand(PEACE)))?;
    assert_eq!(enrollment.user, "alice");
    assert_eq!(enrollment.credential.digest, "369b1bbf");

    assert!(auth.store().lookup("alice")?.is_some());
    auth.verify(" alice ", Some(&hand(PEACE)))?;
    Ok(())
}

#[test]
fn empty_username_is_refused_before_anything_else() {
    let store = MemoryStore::new();
    let auth = authenticator(&store);
    for user in ["", "   ", "\t"] {
        assert_eq!(auth.enroll(user, None).unwrap_err(), AuthError::EmptyUsername);
        assert_eq!(
            auth.enroll(user, Some(&hand(OPEN))).unwrap_err(),
            AuthError::EmptyUsername
        );
        assert_eq!(auth.verify(user, None).unwrap_err(), AuthError::EmptyUsername);
        assert_eq!(auth.purge(user).unwrap_err(), AuthError::EmptyUsername);
    }
    assert!(store.is_empty());
}

#[test]
fn duplicate_enrollment_keeps_the_first_credential() -> Result<()> {
    let auth = authenticator(MemoryStore::new());
    auth.enroll("alice", Some(&hand(OPEN)))?;

    let err = auth.enroll("alice", Some(&hand(FIST))).unwrap_err();
    assert_eq!(err, AuthError::AlreadyExists("alice".into()));
    assert!(!err.wants_recapture());

    // duplicate check comes before the capture is looked at
    assert_eq!(
        auth.enroll("alice", None).unwrap_err(),
        AuthError::AlreadyExists("alice".into())
    );
    auth.verify("alice", Some(&hand(OPEN)))?;
    Ok(())
}

#[test]
fn unknown_user_is_reported_before_missing_hand() {
    let auth = authenticator(MemoryStore::new());
    assert_eq!(
        auth.verify("carol", None).unwrap_err(),
        AuthError::UserNotFound("carol".into())
    );
    assert_eq!(
        auth.verify("carol", Some(&hand(OPEN))).unwrap_err(),
        AuthError::UserNotFound("carol".into())
    );
}

#[test]
fn missing_hand_stores_nothing() -> Result<()> {
    let store = MemoryStore::new();
    let auth = authenticator(&store);

    assert_eq!(auth.enroll("alice", None).unwrap_err(), AuthError::NoHandDetected);
    assert!(store.is_empty());

    auth.enroll("alice", Some(&hand(FIST)))?;
    assert_eq!(auth.verify("alice", None).unwrap_err(), AuthError::NoHandDetected);
    Ok(())
}

#[test]
fn similarity_policy_reports_the_score() -> Result<()> {
    let auth = Authenticator::new(
        MemoryStore::new(),
        PipelineParams::default(),
        MatchPolicy::Similarity { threshold: 0.85 },
    );
    auth.enroll("alice", Some(&hand(OPEN)))?;

    let accepted = auth.verify("alice", Some(&hand(OPEN)))?;
    assert_eq!(accepted.similarity, 1.0);

    // 000007df against 9e8ad47e: half the bits agree
    match auth.verify("alice", Some(&hand(FIST))) {
        Err(AuthError::CredentialMismatch { similarity }) => assert_eq!(similarity, 0.5),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn verification_uses_the_enrolled_params() -> Result<()> {
    env_logger::try_init().ok();

    let store = MemoryStore::new();
    let enrolled_params = PipelineParams {
        num_bins: NonZeroU32::new(8).unwrap(),
        profile: HashProfile::Sha256,
        ..PipelineParams::default()
    };
    let before = Authenticator::new(&store, enrolled_params, MatchPolicy::Exact);
    let enrollment = before.enroll("alice", Some(&hand(PEACE)))?;
    assert_eq!(enrollment.credential.digest.len(), 64);

    // configuration changed after enrollment
    let after = authenticator(&store);
    after.verify("alice", Some(&hand(PEACE)))?;
    assert!(matches!(
        after.verify("alice", Some(&hand(OPEN))),
        Err(AuthError::CredentialMismatch { .. })
    ));
    assert_eq!(store.lookup("alice")?.unwrap().params, enrolled_params);
    Ok(())
}

#[test]
fn purge_allows_enrolling_again() -> Result<()> {
    let auth = authenticator(MemoryStore::new());
    auth.enroll("alice", Some(&hand(OPEN)))?;
    auth.purge("alice")?;

    assert_eq!(
        auth.verify("alice", Some(&hand(OPEN))).unwrap_err(),
        AuthError::UserNotFound("alice".into())
    );
    assert_eq!(
        auth.purge("alice").unwrap_err(),
        AuthError::UserNotFound("alice".into())
    );

    auth.enroll("alice", Some(&hand(FIST)))?;
    auth.verify("alice", Some(&hand(FIST)))?;
    Ok(())
}

#[test]
fn file_store_survives_restart() -> Result<()> {
    env_logger::try_init().ok();

    let dir = tempfile::tempdir()?;

    authenticator(FileStore::new(dir.path())).enroll("alice", Some(&hand(PEACE)))?;

    let restarted = authenticator(FileStore::new(dir.path()));
    let verification = restarted.verify("alice", Some(&recaptured(&hand(PEACE))))?;
    assert_eq!(verification.gesture, Gesture::PeaceSign);
    assert_eq!(
        restarted.enroll("alice", Some(&hand(OPEN))).unwrap_err(),
        AuthError::AlreadyExists("alice".into())
    );
    Ok(())
}

#[test]
fn file_store_rejects_path_usernames() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let auth = authenticator(FileStore::new(dir.path()));
    assert!(matches!(
        auth.enroll("../root", Some(&hand(OPEN))),
        Err(AuthError::InvalidUsername { .. })
    ));
    Ok(())
}

#[test]
fn capture_files_feed_the_protocol() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let open = dir.path().join("open.json");
    let empty = dir.path().join("empty.json");
    write_capture(&open, Some(&hand(OPEN)))?;
    write_capture(&empty, None)?;

    let mut source = CaptureFileSource::new(false);
    let auth = authenticator(MemoryStore::new());

    let no_hand = source.detect(&empty)?;
    assert_eq!(
        auth.enroll("alice", no_hand.as_ref()).unwrap_err(),
        AuthError::NoHandDetected
    );

    let captured = source.detect(&open)?;
    auth.enroll("alice", captured.as_ref())?;
    auth.verify("alice", source.detect(&open)?.as_ref())?;
    Ok(())
}

#[test]
fn unreadable_frames_are_skipped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.json");
    let garbage = dir.path().join("garbage.json");
    let empty = dir.path().join("empty.json");
    let fist = dir.path().join("fist.json");
    let open = dir.path().join("open.json");
    std::fs::write(&garbage, "{ not json")?;
    write_capture(&empty, None)?;
    write_capture(&fist, Some(&hand(FIST)))?;
    write_capture(&open, Some(&hand(OPEN)))?;

    let mut source = CaptureFileSource::new(false);
    let auth = authenticator(MemoryStore::new());

    let frames = [&missing, &garbage, &empty, &open];
    let enrollment = auth.enroll_from("alice", &mut source, &frames)?;
    assert_eq!(enrollment.gesture, Gesture::OpenHand);

    let verification = auth.verify_from("alice", &mut source, &[&missing, &fist, &open])?;
    assert_eq!(verification.similarity, 1.0);

    let err = auth.verify_from("alice", &mut source, &[&fist, &empty]).unwrap_err();
    assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::NoHandDetected));

    let err = auth.verify_from("alice", &mut source, &[&missing]).unwrap_err();
    assert!(err.downcast_ref::<AuthError>().is_none());

    let err = auth.verify_from("carol", &mut source, &[&open, &open]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AuthError>(),
        Some(&AuthError::UserNotFound("carol".into()))
    );
    Ok(())
}

#[test]
fn oversized_stored_params_do_not_reach_the_pipeline() -> Result<()> {
    let store = MemoryStore::new();
    let mut credential = Credential {
        params: PipelineParams::default(),
        digest: "000007df".into(),
    };
    credential.params.num_bins = NonZeroU32::MAX;
    store.insert("alice", credential)?;

    let auth = authenticator(&store);
    assert!(matches!(
        auth.verify("alice", Some(&hand(FIST))),
        Err(AuthError::StoreUnavailable(_))
    ));
    Ok(())
}

fn race_enrollment<S: CredentialStore + Sync>(store: S) {
    const RACERS: usize = 8;
    let auth = authenticator(store);
    let barrier = Barrier::new(RACERS);

    let outcomes: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    auth.enroll("alice", Some(&hand(OPEN)))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let enrolled = outcomes.iter().filter(|r| r.is_ok()).count();
    let refused = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AuthError::AlreadyExists(user)) if user == "alice"))
        .count();
    assert_eq!(enrolled, 1, "outcomes: {:?}", outcomes);
    assert_eq!(refused, RACERS - 1, "outcomes: {:?}", outcomes);
    assert_eq!(auth.store().lookup("alice").unwrap().unwrap().digest, "9e8ad47e");
}

#[test]
fn concurrent_enrollment_in_memory_has_one_winner() {
    race_enrollment(MemoryStore::new());
}

#[test]
fn concurrent_enrollment_on_disk_has_one_winner() -> Result<()> {
    let dir = tempfile::tempdir()?;
    race_enrollment(FileStore::new(dir.path()));
    Ok(())
}

#[test]
fn leftover_user_directory_is_not_an_enrollment() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("ghost"))?;
    let auth = authenticator(FileStore::new(dir.path()));

    assert_eq!(
        auth.purge("ghost").unwrap_err(),
        AuthError::UserNotFound("ghost".into())
    );
    assert_eq!(
        auth.verify("ghost", Some(&hand(OPEN))).unwrap_err(),
        AuthError::UserNotFound("ghost".into())
    );
    auth.enroll("ghost", Some(&hand(OPEN)))?;
    auth.purge("ghost")?;
    Ok(())
}
