mod common;

use common::doubles::Call;
use common::{identity_of, wait_until, Harness};
use meme_board::errors::MemeError;
use meme_board::models::{DeleteOutcome, MemeRecord};
use meme_board::notify::NoticeLevel;
use std::sync::atomic::Ordering;

async fn seed(h: &Harness, titles: &[&str]) -> Vec<MemeRecord> {
    let mut created = Vec::new();
    for title in titles {
        created.push(
            h.form
                .submit_values(*title, format!("{} description", title), None)
                .await
                .unwrap(),
        );
    }
    created
}

#[tokio::test]
async fn refresh_replaces_mirror_newest_first() {
    let h = Harness::new(Some("alice"));
    assert!(!h.gallery.is_empty(), "nothing loaded yet");

    h.gallery.refresh().await.unwrap();
    assert!(h.gallery.is_empty());
    assert!(!h.gallery.is_loading());

    seed(&h, &["first meme", "second meme", "third meme"]).await;
    let listed = h.gallery.refresh().await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["third meme", "second meme", "first meme"]);
    assert_eq!(h.gallery.records(), listed);
    assert!(!h.gallery.is_empty());
    assert_eq!(h.gallery.error(), None);
}

#[tokio::test]
async fn mirror_is_sorted_even_if_store_is_not() {
    let h = Harness::new(Some("alice"));
    seed(&h, &["older meme", "newer meme"]).await;
    h.repo.reverse_lists.store(true, Ordering::SeqCst);

    h.gallery.refresh().await.unwrap();
    assert_eq!(h.gallery.records()[0].title, "newer meme");
}

#[tokio::test]
async fn delete_is_offered_only_to_the_owner() {
    let alice = Harness::new(Some("alice"));
    let bob = alice.second_session(Some("bob"));
    let anonymous = alice.second_session(None);
    seed(&alice, &["alice meme"]).await;
    seed(&bob, &["bob meme"]).await;

    for session in [&alice, &bob, &anonymous] {
        session.gallery.refresh().await.unwrap();
    }

    let flags = |h: &Harness| -> Vec<(String, bool)> {
        h.gallery
            .entries()
            .into_iter()
            .map(|e| (e.record.title, e.can_delete))
            .collect()
    };
    assert_eq!(
        flags(&alice),
        vec![(String::from("bob meme"), false), (String::from("alice meme"), true)]
    );
    assert_eq!(
        flags(&bob),
        vec![(String::from("bob meme"), true), (String::from("alice meme"), false)]
    );
    assert!(flags(&anonymous).iter().all(|(_, can_delete)| !can_delete));

    // Flags follow the identity as it changes.
    anonymous.identity.sign_in(identity_of("alice"));
    assert!(anonymous.gallery.entries()[1].can_delete);
}

#[tokio::test]
async fn deleting_twice_is_an_idempotent_no_op() {
    let h = Harness::new(Some("alice"));
    let created = seed(&h, &["keep me", "delete me"]).await;
    let target = created[1].id;
    h.gallery.refresh().await.unwrap();

    assert_eq!(h.gallery.delete(target).await.unwrap(), DeleteOutcome::Deleted);
    let after_first = h.gallery.records();
    assert!(after_first.iter().all(|r| r.id != target));
    assert_eq!(after_first.len(), 1);

    assert_eq!(h.gallery.delete(target).await.unwrap(), DeleteOutcome::NotFound);
    assert_eq!(h.gallery.records(), after_first);

    let listed = h.gallery.refresh().await.unwrap();
    assert_eq!(listed, after_first);
}

#[tokio::test]
async fn foreign_mirrored_record_is_refused_locally() {
    let alice = Harness::new(Some("alice"));
    let bob = alice.second_session(Some("bob"));
    let created = seed(&alice, &["alice meme"]).await;
    bob.gallery.refresh().await.unwrap();
    alice.log.clear();

    let err = bob.gallery.delete(created[0].id).await.unwrap_err();
    assert!(matches!(err, MemeError::NotOwner(id) if id == created[0].id));
    assert_eq!(alice.log.count(|c| matches!(c, Call::Delete { .. })), 0);
    assert_eq!(bob.gallery.records().len(), 1);
}

#[tokio::test]
async fn store_refuses_foreign_delete_of_unmirrored_record() {
    let alice = Harness::new(Some("alice"));
    let bob = alice.second_session(Some("bob"));
    let created = seed(&alice, &["alice meme"]).await;

    let err = bob.gallery.delete(created[0].id).await.unwrap_err();
    assert!(matches!(err, MemeError::NotOwner(_)));
    assert_eq!(alice.repo.inner.len().await, 1);
}

#[tokio::test]
async fn unauthenticated_delete_makes_no_store_call() {
    let alice = Harness::new(Some("alice"));
    let created = seed(&alice, &["alice meme"]).await;
    alice.log.clear();

    alice.identity.sign_out();
    let err = alice.gallery.delete(created[0].id).await.unwrap_err();
    assert!(matches!(err, MemeError::AuthRequired));
    assert!(alice.log.is_empty());
}

#[tokio::test]
async fn failed_delete_leaves_mirror_untouched() {
    let mut h = Harness::new(Some("alice"));
    let created = seed(&h, &["sticky meme"]).await;
    h.gallery.refresh().await.unwrap();
    h.drain_notices();
    h.repo.fail_deletes.store(true, Ordering::SeqCst);

    let err = h.gallery.delete(created[0].id).await.unwrap_err();
    assert!(matches!(err, MemeError::Delete(_)));
    assert!(!err.is_local());
    assert_eq!(h.gallery.records(), created);

    let notices = h.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].title, "Failed to delete meme");
}

#[tokio::test]
async fn failed_refresh_keeps_previous_mirror() {
    let mut h = Harness::new(Some("alice"));
    let created = seed(&h, &["survivor"]).await;
    h.gallery.refresh().await.unwrap();
    h.drain_notices();

    h.repo.fail_lists.store(true, Ordering::SeqCst);
    let err = h.gallery.refresh().await.unwrap_err();
    assert!(matches!(err, MemeError::Fetch(_)));
    assert_eq!(h.gallery.records(), created);
    assert!(!h.gallery.is_loading());
    assert!(h.gallery.error().is_some());
    assert_eq!(h.drain_notices().len(), 1);

    h.repo.fail_lists.store(false, Ordering::SeqCst);
    h.gallery.refresh().await.unwrap();
    assert_eq!(h.gallery.error(), None);
}

#[tokio::test]
async fn concurrent_deletes_of_one_id_both_succeed() {
    let alice = Harness::new(Some("alice"));
    let other_tab = alice.second_session(Some("alice"));
    let created = seed(&alice, &["double tap"]).await;
    alice.gallery.refresh().await.unwrap();
    other_tab.gallery.refresh().await.unwrap();

    let (a, b) = tokio::join!(
        alice.gallery.delete(created[0].id),
        other_tab.gallery.delete(created[0].id),
    );
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, DeleteOutcome::NotFound));
    assert_eq!(outcomes, vec![DeleteOutcome::Deleted, DeleteOutcome::NotFound]);
    assert!(alice.gallery.records().is_empty());
    assert!(other_tab.gallery.records().is_empty());
}

#[tokio::test]
async fn dismissed_gallery_does_not_mutate_after_delete_completes() {
    let h = Harness::new(Some("alice"));
    let created = seed(&h, &["in flight"]).await;
    h.gallery.refresh().await.unwrap();
    let held = h.repo.deletes.close().await;

    let gallery = h.gallery.clone();
    let id = created[0].id;
    let pending = tokio::spawn(async move { gallery.delete(id).await });
    let log = h.log.clone();
    wait_until(|| log.count(|c| matches!(c, Call::Delete { .. })) == 1).await;

    h.gallery.dismiss();
    drop(held);

    assert_eq!(pending.await.unwrap().unwrap(), DeleteOutcome::Deleted);
    assert!(h.repo.inner.is_empty().await);
    // The detached mirror keeps its last observed state.
    assert_eq!(h.gallery.records(), created);
}

#[tokio::test]
async fn loading_is_set_while_a_list_is_outstanding() {
    let h = Harness::new(Some("alice"));
    seed(&h, &["slow meme"]).await;
    let release = h.repo.hold_next_list();

    let gallery = h.gallery.clone();
    let pending = tokio::spawn(async move { gallery.refresh().await });
    let log = h.log.clone();
    wait_until(|| log.count(|c| matches!(c, Call::List)) == 1).await;

    assert!(h.gallery.is_loading());
    assert!(h.gallery.records().is_empty());

    release.send(()).unwrap();
    pending.await.unwrap().unwrap();
    assert!(!h.gallery.is_loading());
    assert_eq!(h.gallery.records().len(), 1);
}

#[tokio::test]
async fn superseded_refresh_does_not_overwrite_newer_result() {
    let h = Harness::new(Some("alice"));
    seed(&h, &["early meme"]).await;
    let release = h.repo.hold_next_list();

    let gallery = h.gallery.clone();
    let older = tokio::spawn(async move { gallery.refresh().await });
    let log = h.log.clone();
    wait_until(|| log.count(|c| matches!(c, Call::List)) == 1).await;

    seed(&h, &["late meme"]).await;
    let newer = h.gallery.refresh().await.unwrap();
    assert_eq!(newer.len(), 2);

    release.send(()).unwrap();
    // The older caller still gets its own list back.
    let stale = older.await.unwrap().unwrap();
    assert_eq!(stale.len(), 1);

    assert_eq!(h.gallery.records(), newer);
    assert!(!h.gallery.is_loading());
}

#[tokio::test]
async fn confirmed_delete_survives_a_refresh_that_listed_before_it() {
    let h = Harness::new(Some("alice"));
    let created = seed(&h, &["doomed meme", "other meme"]).await;
    h.gallery.refresh().await.unwrap();
    let release = h.repo.hold_next_list();

    let gallery = h.gallery.clone();
    let pending = tokio::spawn(async move { gallery.refresh().await });
    let log = h.log.clone();
    wait_until(|| log.count(|c| matches!(c, Call::List)) == 2).await;

    let doomed = created[0].id;
    assert_eq!(h.gallery.delete(doomed).await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(h.gallery.records().len(), 1);

    release.send(()).unwrap();
    pending.await.unwrap().unwrap();

    assert_eq!(h.repo.inner.len().await, 1);
    let remaining = h.gallery.records();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|r| r.id != doomed));

    // A refresh issued after the delete lists normally.
    assert_eq!(h.gallery.refresh().await.unwrap(), remaining);
}
