//! PostgreSQL backend tests.
//!
//! These need a reachable server (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p verity-db -- --ignored`.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use verity_core::roles::default_roles;
use verity_core::types::{IdentityField, TokenKind};
use verity_db::models::account::{Insertion, NewAccount};
use verity_db::models::verification_token::{Consumption, VerificationToken};
use verity_db::repositories::PgStore;
use verity_db::store::{AccountStore, TokenStore, VerificationLedger};

fn new_account(username: &str, email: &str) -> NewAccount {
    NewAccount {
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "digest".to_string(),
        roles: default_roles(),
        created_at: Utc::now(),
    }
}

fn link_token(id: &str, email: &str, ttl: Duration) -> VerificationToken {
    let now = Utc::now();
    VerificationToken {
        id: id.to_string(),
        email: email.to_string(),
        code: None,
        kind: TokenKind::Link,
        expires_at: now + ttl,
        used: false,
        created_at: now,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn insert_if_absent_classifies_conflicts(pool: PgPool) {
    let store = PgStore::new(pool);

    assert_matches!(
        store.insert_if_absent(new_account("alice", "alice@x.com")).await,
        Ok(Insertion::Inserted(account)) if !account.verified && account.roles == default_roles()
    );
    assert_matches!(
        store.insert_if_absent(new_account("alice", "other@x.com")).await,
        Ok(Insertion::Duplicate(IdentityField::Username))
    );
    assert_matches!(
        store.insert_if_absent(new_account("alice2", "alice@x.com")).await,
        Ok(Insertion::Duplicate(IdentityField::Email))
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_redemptions_verify_exactly_once(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool));
    store
        .insert_if_absent(new_account("bob", "bob@x.com"))
        .await
        .expect("insert should succeed");
    TokenStore::save(&*store, &link_token("tok-1", "bob@x.com", Duration::hours(1)))
        .await
        .expect("token save should succeed");

    let now = Utc::now();
    let (a, b) = tokio::join!(
        store.consume_and_verify("tok-1", now),
        store.consume_and_verify("tok-1", now)
    );
    let outcomes = [a.expect("first redeem"), b.expect("second redeem")];

    let verified = outcomes
        .iter()
        .filter(|o| matches!(o, Consumption::Verified { .. }))
        .count();
    let already_used = outcomes
        .iter()
        .filter(|o| matches!(o, Consumption::AlreadyUsed))
        .count();
    assert_eq!((verified, already_used), (1, 1));

    let account = store.find_by_username("bob").await.unwrap().unwrap();
    assert!(account.verified);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn missing_account_rolls_back_the_token(pool: PgPool) {
    let store = PgStore::new(pool);
    TokenStore::save(&store, &link_token("tok-2", "ghost@x.com", Duration::hours(1)))
        .await
        .unwrap();

    assert_matches!(
        store.consume_and_verify("tok-2", Utc::now()).await,
        Ok(Consumption::AccountMissing)
    );
    let token = store.find_by_id("tok-2").await.unwrap().unwrap();
    assert!(!token.used);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sweep_deletes_only_expired_rows(pool: PgPool) {
    let store = PgStore::new(pool);
    TokenStore::save(&store, &link_token("old", "a@x.com", Duration::hours(-1)))
        .await
        .unwrap();
    TokenStore::save(&store, &link_token("new", "a@x.com", Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(store.delete_expired_before(Utc::now()).await.unwrap(), 1);
    assert!(store.find_by_id("new").await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn enroll_keeps_account_and_token_together(pool: PgPool) {
    let store = PgStore::new(pool);

    assert_matches!(
        store
            .enroll(new_account("carl", "carl@x.com"), &link_token("tok-3", "carl@x.com", Duration::hours(1)))
            .await,
        Ok(Insertion::Inserted(_))
    );
    assert!(store.find_by_id("tok-3").await.unwrap().is_some());

    // A colliding token id fails the second insert; the account goes with it.
    assert!(store
        .enroll(new_account("dina", "dina@x.com"), &link_token("tok-3", "dina@x.com", Duration::hours(1)))
        .await
        .is_err());
    assert!(store.find_by_username("dina").await.unwrap().is_none());

    assert_matches!(
        store
            .enroll(new_account("carl", "other@x.com"), &link_token("tok-4", "other@x.com", Duration::hours(1)))
            .await,
        Ok(Insertion::Duplicate(IdentityField::Username))
    );
    assert!(store.find_by_id("tok-4").await.unwrap().is_none());
}
