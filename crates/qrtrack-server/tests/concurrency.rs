//! Scan recording against a file-backed database with a multi-connection pool.

use std::path::Path;
use std::time::Duration;

use qrtrack_core::db::{PoolSettings, unix_timestamp};
use qrtrack_server::scan::{ScanInput, ScanRecorder, ScanRejection};
use qrtrack_server::storage::{NewCode, QrDatabase, QrType};

async fn open_db(dir: &Path) -> QrDatabase {
    let settings = PoolSettings {
        max_connections: 5,
        busy_timeout: Duration::from_secs(30),
    };
    QrDatabase::open(&dir.join("qrtrack.db"), &settings)
        .await
        .unwrap()
}

async fn seed(db: &QrDatabase, id: &str, max_scans: i64, expires_at: Option<i64>) {
    db.create_code(&NewCode {
        id,
        owner_id: "owner",
        destination: "https://example.com",
        qr_type: QrType::Url,
        tracking_url: None,
        is_password_protected: false,
        password_hash: "",
        expires_at,
        max_scans,
    })
    .await
    .unwrap();
}

fn scan(n: usize) -> ScanInput {
    ScanInput {
        user_agent: format!("agent-{n}"),
        tracking_token: "tok".into(),
        ..ScanInput::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ceiling_holds_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    seed(&db, "limited", 10, None).await;
    let recorder = ScanRecorder::new(db.clone());

    let handles: Vec<_> = (0..60)
        .map(|n| {
            let recorder = recorder.clone();
            tokio::spawn(async move { recorder.record_scan("limited", &scan(n)).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(code) => {
                assert!(code.scan_count <= 10);
                succeeded += 1;
            }
            Err(ScanRejection::LimitReached | ScanRejection::Conflict) => rejected += 1,
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(rejected, 50);

    let stored = db.get_code("limited").await.unwrap();
    assert_eq!(stored.scan_count, 10);
    assert!(stored.expired);
    assert_eq!(db.count_scan_events("limited").await.unwrap(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unlimited_code_takes_every_scan() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    seed(&db, "open", 0, None).await;
    let recorder = ScanRecorder::new(db.clone());

    let handles: Vec<_> = (0..1000)
        .map(|n| {
            let recorder = recorder.clone();
            tokio::spawn(async move { recorder.record_scan("open", &scan(n)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = db.get_code("open").await.unwrap();
    assert_eq!(stored.scan_count, 1000);
    assert!(!stored.expired);
    assert_eq!(db.count_scan_events("open").await.unwrap(), 1000);

    let events = db.list_scan_events("open").await.unwrap();
    assert!(events.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expired_flag_never_reverts_under_load() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    seed(&db, "stale", 0, Some(unix_timestamp() - 1)).await;
    let recorder = ScanRecorder::new(db.clone());

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let recorder = recorder.clone();
            let db = db.clone();
            tokio::spawn(async move {
                let result = recorder.record_scan("stale", &scan(n)).await;
                if let Ok(code) = db.get_code("stale").await {
                    let _ = recorder.ensure_valid(&code).await;
                }
                result
            })
        })
        .collect();

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ScanRejection::Expired | ScanRejection::Conflict));
        assert!(db.get_code("stale").await.unwrap().expired);
    }

    let stored = db.get_code("stale").await.unwrap();
    assert_eq!(stored.scan_count, 0);
    assert_eq!(db.count_scan_events("stale").await.unwrap(), 0);
}
