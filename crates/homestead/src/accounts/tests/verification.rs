use std::sync::Arc;

use chrono::Duration;

use crate::accounts::verification::{verify_path, MAX_ATTEMPTS};
use crate::accounts::{VerificationError, VerificationIssuer, VerificationKind};
use crate::testing::{fixed_now, MemoryStore};

fn issuer(store: &MemoryStore) -> VerificationIssuer<MemoryStore> {
    VerificationIssuer::new(
        Arc::new(store.clone()),
        Duration::minutes(10),
        "http://homestead.test",
    )
}

#[test]
fn prepare_stores_digest_and_builds_links() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();

    let prepared = issuer
        .prepare(VerificationKind::ChangeEmail, "user-1", now)
        .expect("prepared");

    assert_eq!(prepared.otp.len(), 6);
    assert!(prepared.otp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(prepared.expires_at, now + Duration::minutes(10));
    assert_eq!(prepared.redirect_to, "/verify?type=change-email&target=user-1");
    assert_eq!(
        prepared.verify_url,
        format!(
            "http://homestead.test/verify?type=change-email&target=user-1&code={}",
            prepared.otp
        )
    );

    let stored = store
        .verification(VerificationKind::ChangeEmail, "user-1")
        .expect("stored");
    assert_ne!(stored.code_digest, prepared.otp, "code is not stored in clear");
    assert_eq!(stored.code_digest.len(), 64);
}

#[test]
fn valid_code_is_consumed() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let prepared = issuer
        .prepare(VerificationKind::Login, "kelly@example.com", now)
        .expect("prepared");

    issuer
        .validate(
            VerificationKind::Login,
            "kelly@example.com",
            &prepared.otp,
            now + Duration::minutes(9),
        )
        .expect("code accepted");

    let replay = issuer.validate(
        VerificationKind::Login,
        "kelly@example.com",
        &prepared.otp,
        now + Duration::minutes(9),
    );
    assert!(matches!(replay, Err(VerificationError::Invalid)));
}

#[test]
fn expired_code_is_rejected_and_removed() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let prepared = issuer
        .prepare(VerificationKind::Login, "kelly@example.com", now)
        .expect("prepared");

    let result = issuer.validate(
        VerificationKind::Login,
        "kelly@example.com",
        &prepared.otp,
        now + Duration::minutes(10),
    );
    assert!(matches!(result, Err(VerificationError::Expired)));
    assert!(store
        .verification(VerificationKind::Login, "kelly@example.com")
        .is_none());
}

#[test]
fn wrong_code_keeps_verification_pending() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let prepared = issuer
        .prepare(VerificationKind::Login, "kelly@example.com", now)
        .expect("prepared");
    let wrong = if prepared.otp == "000000" { "111111" } else { "000000" };

    for code in [wrong, "12345", "abcdef", ""] {
        let result = issuer.validate(VerificationKind::Login, "kelly@example.com", code, now);
        assert!(matches!(result, Err(VerificationError::Invalid)), "{code}");
    }
    assert!(store
        .verification(VerificationKind::Login, "kelly@example.com")
        .is_some());
}

fn wrong_code_for(otp: &str, offset: u32) -> String {
    let value: u32 = otp.parse().expect("numeric code");
    format!("{:06}", (value + offset) % 1_000_000)
}

#[test]
fn repeated_wrong_guesses_discard_the_code() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let prepared = issuer
        .prepare(VerificationKind::Login, "kelly@example.com", now)
        .expect("prepared");

    for offset in 1..=MAX_ATTEMPTS {
        let guess = wrong_code_for(&prepared.otp, offset);
        let result = issuer.validate(VerificationKind::Login, "kelly@example.com", &guess, now);
        assert!(matches!(result, Err(VerificationError::Invalid)), "{guess}");
    }
    assert!(store
        .verification(VerificationKind::Login, "kelly@example.com")
        .is_none());

    let correct = issuer.validate(
        VerificationKind::Login,
        "kelly@example.com",
        &prepared.otp,
        now,
    );
    assert!(matches!(correct, Err(VerificationError::Invalid)));
}

#[test]
fn guesses_below_the_limit_leave_the_code_usable() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let prepared = issuer
        .prepare(VerificationKind::ChangeEmail, "user-1", now)
        .expect("prepared");

    for offset in 1..MAX_ATTEMPTS {
        let guess = wrong_code_for(&prepared.otp, offset);
        let result = issuer.validate(VerificationKind::ChangeEmail, "user-1", &guess, now);
        assert!(matches!(result, Err(VerificationError::Invalid)));
    }
    let stored = store
        .verification(VerificationKind::ChangeEmail, "user-1")
        .expect("still pending");
    assert_eq!(stored.attempts, MAX_ATTEMPTS - 1);

    issuer
        .validate(VerificationKind::ChangeEmail, "user-1", &prepared.otp, now)
        .expect("correct code still accepted");
}

#[test]
fn reissued_code_starts_with_a_clean_attempt_count() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let first = issuer
        .prepare(VerificationKind::Login, "kelly@example.com", now)
        .expect("prepared");
    for offset in 1..MAX_ATTEMPTS {
        let guess = wrong_code_for(&first.otp, offset);
        let _ = issuer.validate(VerificationKind::Login, "kelly@example.com", &guess, now);
    }

    issuer
        .prepare(VerificationKind::Login, "kelly@example.com", now)
        .expect("reissued");
    let stored = store
        .verification(VerificationKind::Login, "kelly@example.com")
        .expect("pending");
    assert_eq!(stored.attempts, 0);
}

#[test]
fn codes_are_scoped_by_kind_and_reissue_replaces() {
    let store = MemoryStore::default();
    let issuer = issuer(&store);
    let now = fixed_now();
    let first = issuer
        .prepare(VerificationKind::ChangeEmail, "user-1", now)
        .expect("prepared");
    let second = issuer
        .prepare(VerificationKind::ChangeEmail, "user-1", now)
        .expect("prepared");

    let cross_kind = issuer.validate(VerificationKind::Login, "user-1", &second.otp, now);
    assert!(matches!(cross_kind, Err(VerificationError::Invalid)));

    if first.otp != second.otp {
        let stale = issuer.validate(VerificationKind::ChangeEmail, "user-1", &first.otp, now);
        assert!(matches!(stale, Err(VerificationError::Invalid)));
    }
    issuer
        .validate(VerificationKind::ChangeEmail, "user-1", &second.otp, now)
        .expect("latest code accepted");
}

#[test]
fn verify_path_encodes_targets() {
    assert_eq!(
        verify_path(VerificationKind::Login, "kelly+ops@example.com", Some("123456")),
        "/verify?type=login&target=kelly%2Bops%40example.com&code=123456"
    );
    assert_eq!(VerificationKind::parse("change-email"), Some(VerificationKind::ChangeEmail));
    assert_eq!(VerificationKind::parse("reset-password"), None);
}
