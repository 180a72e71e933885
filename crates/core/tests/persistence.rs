use pretty_assertions::assert_eq;
use roster_core::{
    load_roster_or, read_roster, write_roster, RenderOptions, Roster, RosterPersister,
    RosterService,
};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn seeded() -> Roster {
    let mut roster = Roster::with_categories(["Council", "Staff", "Moderador", "Eclipse", "Trial"]);
    roster.add_member("Staff", "maria").unwrap();
    roster.add_member("Staff", "ana").unwrap();
    roster.add_member("Trial", "atlas").unwrap();
    roster
}

#[tokio::test]
async fn round_trip_keeps_order_and_members() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("state.json");
    let mut roster = seeded();
    roster.add_category("Academy", Some(2)).unwrap();

    write_roster(&path, &roster).await.expect("write");
    let loaded = read_roster(&path).await.expect("read").expect("present");

    assert_eq!(loaded, roster);
    let names: Vec<&str> = loaded.category_names().collect();
    assert_eq!(
        names,
        vec!["Council", "Academy", "Staff", "Moderador", "Eclipse", "Trial"]
    );
}

#[tokio::test]
async fn corrupt_state_is_discarded() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("state.json");
    tokio::fs::write(&path, b"{ not json").await.unwrap();

    let loaded = load_roster_or(&path, Roster::with_categories(["Staff"])).await;
    assert_eq!(loaded, Roster::with_categories(["Staff"]));
}

#[tokio::test]
async fn burst_of_mutations_lands_as_one_write() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("state.json");
    let persister = RosterPersister::start(&path, Duration::from_millis(100));
    let mut updates = persister.subscribe();

    let mut service = RosterService::init(
        Roster::with_categories(["Staff", "Trial"]),
        Some(persister.clone()),
        RenderOptions::default(),
    );
    service.add_member("Staff", "bob").unwrap();
    service.add_member("Trial", "bob").unwrap();
    service.add_member("Staff", "zoe").unwrap();
    service.add_category("Council", Some(1)).unwrap();
    service.rename_category("Trial", "Recruits").unwrap();

    let report = timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("a write within the timeout")
        .expect("report");
    assert!(report.success, "{:?}", report.error);
    assert_eq!(report.members, 2);

    let second = timeout(Duration::from_millis(400), updates.recv()).await;
    assert!(second.is_err(), "expected exactly one write, got {second:?}");

    let on_disk = read_roster(&path).await.unwrap().unwrap();
    assert_eq!(on_disk, service.snapshot());
    assert_eq!(
        on_disk.category_names().collect::<Vec<_>>(),
        vec!["Council", "Staff", "Recruits"]
    );

    service.shutdown().await;
}

#[tokio::test]
async fn unchanged_re_add_schedules_nothing() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("state.json");
    let persister = RosterPersister::start(&path, Duration::from_millis(50));
    let mut updates = persister.subscribe();

    let mut initial = Roster::with_categories(["Staff"]);
    initial.add_member("Staff", "bob").unwrap();
    let mut service = RosterService::init(initial, Some(persister), RenderOptions::default());

    let outcome = service.add_member("Staff", "BOB").unwrap();
    assert!(!outcome.changed());

    let got = timeout(Duration::from_millis(300), updates.recv()).await;
    assert!(got.is_err(), "no write expected, got {got:?}");
    assert!(!path.exists());
}

#[tokio::test]
async fn shutdown_flushes_pending_write() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("state.json");
    let persister = RosterPersister::start(&path, Duration::from_secs(60));

    let mut service = RosterService::init(
        Roster::with_categories(["Staff"]),
        Some(persister),
        RenderOptions::default(),
    );
    service.add_member("Staff", "late").unwrap();
    let expected = service.snapshot();
    service.shutdown().await;

    let on_disk = read_roster(&path).await.unwrap().unwrap();
    assert_eq!(on_disk, expected);
}

#[tokio::test]
async fn flush_writes_before_the_debounce_expires() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("nested").join("state.json");
    let persister = RosterPersister::start(&path, Duration::from_secs(60));
    assert_eq!(persister.path(), path.as_path());

    let mut roster = Roster::with_categories(["Staff"]);
    roster.add_member("Staff", "early").unwrap();
    persister.schedule(roster.clone());
    persister.flush().await;

    assert_eq!(read_roster(&path).await.unwrap(), Some(roster));
    persister.shutdown().await;
}
