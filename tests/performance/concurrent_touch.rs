use tokio::task::JoinSet;
use warden_lib::{session::LoginOptions, Clock};

use crate::test_utils::{setup_engine, test_settings};

const TOUCHES: usize = 1000;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_touches_leave_consistent_record() {
    let (warden, clock) = setup_engine(test_settings());
    let sessions = warden.auth.clone();
    let grant = sessions.sessions().login("u1", LoginOptions::default()).await.unwrap();
    let sliding = sessions.sessions().policy().sliding_ttl;

    let mut tasks = JoinSet::new();
    for i in 0..TOUCHES {
        let auth = sessions.clone();
        let clock = clock.clone();
        let id = grant.session_id.clone();
        tasks.spawn(async move {
            if i % 10 == 0 {
                clock.advance_secs(1);
            }
            auth.sessions().store().touch(&id, sliding).await
        });
    }

    let mut previous = Vec::with_capacity(TOUCHES);
    while let Some(result) = tasks.join_next().await {
        previous.push(result.unwrap().unwrap());
    }

    let record = sessions.sessions().store().get(&grant.session_id).await.unwrap();
    let now = clock.now();
    assert!(record.last_seen_at <= now);
    assert!(record.last_seen_at <= record.absolute_expiry);
    assert!(record.idle_expiry <= record.absolute_expiry);
    assert_eq!(record.idle_expiry, record.last_seen_at + sliding);
    // No touch ever moved the stored access time backwards
    assert!(previous.iter().all(|s| s.last_seen_at <= record.last_seen_at));
    assert_eq!(record.principal_id, "u1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_distinct_sessions_in_parallel() {
    let (warden, _) = setup_engine(test_settings());
    let auth = warden.auth.clone();

    let mut tasks = JoinSet::new();
    for i in 0..200 {
        let auth = auth.clone();
        tasks.spawn(async move {
            let principal = format!("user-{i}");
            let grant = auth.sessions().login(&principal, LoginOptions::default()).await.unwrap();
            let found = auth
                .sessions()
                .validate(&grant.session_id, Some(&grant.csrf_token), true)
                .await
                .unwrap();
            assert_eq!(found.id, principal);
            grant.session_id
        });
    }

    let mut ids = Vec::new();
    while let Some(id) = tasks.join_next().await {
        ids.push(id.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 200);
}
