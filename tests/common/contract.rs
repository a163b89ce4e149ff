//! Behaviour every `PreferenceStore` backend must show. Each check takes the
//! user id to work under so backends with shared state can isolate runs.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{ensure, Result};

use notify_prefs::database::models::{Frequency, NewDevice, User};
use notify_prefs::database::PreferenceStore;

pub async fn concurrent_appends_are_all_kept(store: Arc<dyn PreferenceStore>, user_id: i64) -> Result<()> {
    store.upsert_user(&User::new(user_id, "en")).await?;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .add_device(user_id, NewDevice::new(format!("device-{}", i), i % 2 == 0, Frequency::Hourly))
                    .await
            })
        })
        .collect();

    let mut returned = HashSet::new();
    for task in tasks {
        let device = task.await??;
        returned.insert(device.id);
    }
    ensure!(returned.len() == 20, "expected 20 distinct ids, got {}", returned.len());

    let user = store.get_user(user_id).await?;
    ensure!(user.devices.len() == 20, "expected 20 devices, got {}", user.devices.len());
    let stored: HashSet<_> = user.devices.into_iter().map(|d| d.id).collect();
    ensure!(stored == returned, "stored ids differ from returned ids");
    Ok(())
}

pub async fn append_to_missing_user_writes_nothing(store: Arc<dyn PreferenceStore>, user_id: i64) -> Result<()> {
    let err = store
        .add_device(user_id, NewDevice::new("Chrome", true, Frequency::Daily))
        .await
        .err();
    ensure!(
        err.as_ref().is_some_and(|e| e.is_not_found()),
        "expected NotFound, got {:?}",
        err
    );

    let lookup = store.get_user(user_id).await.err();
    ensure!(
        lookup.as_ref().is_some_and(|e| e.is_not_found()),
        "user appeared after failed append"
    );
    Ok(())
}

pub async fn upsert_does_not_duplicate(store: Arc<dyn PreferenceStore>, user_id: i64) -> Result<()> {
    store.upsert_user(&User::new(user_id, "en")).await?;
    let device = store
        .add_device(user_id, NewDevice::new("Laptop", false, Frequency::Weekly))
        .await?;
    store.upsert_user(&User::new(user_id, "ru")).await?;

    let matching = store
        .get_users()
        .await?
        .into_iter()
        .filter(|u| u.id == user_id)
        .collect::<Vec<_>>();
    ensure!(matching.len() == 1, "expected one user, found {}", matching.len());
    ensure!(matching[0].language == "ru", "language not updated");
    ensure!(matching[0].devices == vec![device], "devices changed by upsert");
    Ok(())
}

pub async fn delete_semantics(store: Arc<dyn PreferenceStore>, user_id: i64) -> Result<()> {
    let missing = store.delete_user(user_id).await.err();
    ensure!(
        missing.as_ref().is_some_and(|e| e.is_not_found()),
        "delete of missing user should be NotFound"
    );

    store.upsert_user(&User::new(user_id, "en")).await?;
    store.delete_user(user_id).await?;

    let lookup = store.get_user(user_id).await.err();
    ensure!(lookup.as_ref().is_some_and(|e| e.is_not_found()), "user still present");
    Ok(())
}
