//! Read-side rollups over stored scan history.
//!
//! Nothing here writes. An owner without codes, or codes without scans,
//! produce zero-valued results rather than errors.

pub mod device;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use qrtrack_core::db::unix_timestamp;
use serde::Serialize;

use crate::scan::is_expired;
use crate::storage::{DatabaseError, QrCode, QrDatabase, ScanEvent};

pub use device::DeviceType;

/// Per-owner rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_codes: u64,
    pub total_scans: u64,
    pub most_scanned: Option<MostScanned>,
    pub scans_by_device: BTreeMap<String, u64>,
    pub scans_by_country: BTreeMap<String, u64>,
    /// Keyed by UTC calendar day (`YYYY-MM-DD`).
    pub scans_by_date: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostScanned {
    pub id: String,
    pub destination: String,
    pub scan_count: i64,
}

/// Per-code view.
#[derive(Debug, Clone, Serialize)]
pub struct CodeAnalytics {
    pub code_id: String,
    pub scan_count: i64,
    pub max_scans: i64,
    pub remaining_scans: Option<i64>,
    pub last_scanned_at: Option<i64>,
    pub expired: bool,
    pub events: Vec<ScanEvent>,
}

/// Roll up every code owned by `owner_id`.
pub async fn aggregate(db: &QrDatabase, owner_id: &str) -> Result<Summary, DatabaseError> {
    let codes = db.list_codes_by_owner(owner_id).await?;
    if codes.is_empty() {
        return Ok(Summary::default());
    }
    let events = db.list_owner_scan_events(owner_id).await?;
    Ok(summarize(&codes, &events))
}

/// Pure rollup; `codes` must be in creation order for tie-breaking.
pub fn summarize(codes: &[QrCode], events: &[ScanEvent]) -> Summary {
    let mut summary = Summary {
        total_codes: u64::try_from(codes.len()).unwrap_or(u64::MAX),
        ..Summary::default()
    };

    for code in codes {
        summary.total_scans += u64::try_from(code.scan_count).unwrap_or(0);

        // Strictly greater: the first code wins ties, zero counts never win.
        let best = summary.most_scanned.as_ref().map_or(0, |m| m.scan_count);
        if code.scan_count > best {
            summary.most_scanned = Some(MostScanned {
                id: code.id.clone(),
                destination: code.destination.clone(),
                scan_count: code.scan_count,
            });
        }
    }

    for event in events {
        let device = device::detect(&event.user_agent);
        *summary
            .scans_by_device
            .entry(device.as_str().to_string())
            .or_default() += 1;

        let country = if event.country.trim().is_empty() {
            crate::scan::recorder::UNKNOWN_LOCATION
        } else {
            event.country.as_str()
        };
        *summary
            .scans_by_country
            .entry(country.to_string())
            .or_default() += 1;

        if let Some(day) = DateTime::<Utc>::from_timestamp(event.timestamp, 0) {
            *summary
                .scans_by_date
                .entry(day.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }
    }

    summary
}

/// Analytics for a single, already-authorised record.
pub async fn code_analytics(db: &QrDatabase, code: &QrCode) -> Result<CodeAnalytics, DatabaseError> {
    let events = db.list_scan_events(&code.id).await?;
    Ok(CodeAnalytics {
        code_id: code.id.clone(),
        scan_count: code.scan_count,
        max_scans: code.max_scans,
        remaining_scans: code.remaining_scans(),
        last_scanned_at: code.last_scanned_at,
        expired: is_expired(code, unix_timestamp()),
        events,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scan::{ScanInput, ScanRecorder};
    use crate::storage::{NewCode, QrType};

    fn code(id: &str, scan_count: i64) -> QrCode {
        QrCode {
            id: id.into(),
            owner_id: "u1".into(),
            destination: format!("https://example.com/{id}"),
            qr_type: "url".into(),
            tracking_url: None,
            is_password_protected: false,
            password_hash: String::new(),
            expires_at: None,
            max_scans: 0,
            scan_count,
            last_scanned_at: None,
            expired: false,
            created_at: 0,
        }
    }

    fn event(code_id: &str, ua: &str, country: &str, timestamp: i64) -> ScanEvent {
        ScanEvent {
            id: 0,
            code_id: code_id.into(),
            user_agent: ua.into(),
            source_ip: String::new(),
            referer: String::new(),
            country: country.into(),
            city: "Unknown".into(),
            tracking_token: String::new(),
            timestamp,
        }
    }

    #[test]
    fn empty_input_is_zero_summary() {
        assert_eq!(summarize(&[], &[]), Summary::default());
    }

    #[test]
    fn zero_scans_have_no_most_scanned() {
        let summary = summarize(&[code("a", 0), code("b", 0)], &[]);
        assert_eq!(summary.total_codes, 2);
        assert_eq!(summary.total_scans, 0);
        assert!(summary.most_scanned.is_none());
    }

    #[test]
    fn ties_go_to_first_code() {
        let summary = summarize(&[code("a", 1), code("b", 4), code("c", 4)], &[]);
        assert_eq!(summary.total_scans, 9);
        let most = summary.most_scanned.unwrap();
        assert_eq!(most.id, "b");
        assert_eq!(most.scan_count, 4);
        assert_eq!(most.destination, "https://example.com/b");
    }

    #[test]
    fn groups_by_device_country_and_day() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";
        // 2024-03-01T12:00:00Z and 2024-03-02T00:00:10Z
        let day1 = 1_709_294_400;
        let day2 = 1_709_337_610;
        let events = vec![
            event("a", iphone, "NL", day1),
            event("a", mac, "NL", day1),
            event("b", iphone, "", day2),
            event("b", "", "DE", day2),
        ];

        let summary = summarize(&[code("a", 2), code("b", 2)], &events);
        assert_eq!(summary.scans_by_device.get("mobile"), Some(&2));
        assert_eq!(summary.scans_by_device.get("desktop"), Some(&1));
        assert_eq!(summary.scans_by_device.get("unknown"), Some(&1));
        assert_eq!(summary.scans_by_country.get("NL"), Some(&2));
        assert_eq!(summary.scans_by_country.get("DE"), Some(&1));
        assert_eq!(summary.scans_by_country.get("Unknown"), Some(&1));
        assert_eq!(summary.scans_by_date.get("2024-03-01"), Some(&2));
        assert_eq!(summary.scans_by_date.get("2024-03-02"), Some(&2));
    }

    #[tokio::test]
    async fn aggregate_reads_owner_scope_only() {
        let db = QrDatabase::open_in_memory().await.unwrap();
        for (id, owner) in [("a", "u1"), ("b", "u1"), ("z", "u2")] {
            db.create_code(&NewCode {
                id,
                owner_id: owner,
                destination: "https://example.com",
                qr_type: QrType::Url,
                tracking_url: None,
                is_password_protected: false,
                password_hash: "",
                expires_at: None,
                max_scans: 0,
            })
            .await
            .unwrap();
        }

        let recorder = ScanRecorder::new(db.clone());
        let scan = ScanInput {
            country: "FR".into(),
            ..ScanInput::default()
        };
        recorder.record_scan("b", &scan).await.unwrap();
        recorder.record_scan("b", &scan).await.unwrap();
        recorder.record_scan("z", &scan).await.unwrap();

        let summary = aggregate(&db, "u1").await.unwrap();
        assert_eq!(summary.total_codes, 2);
        assert_eq!(summary.total_scans, 2);
        assert_eq!(summary.most_scanned.unwrap().id, "b");
        assert_eq!(summary.scans_by_country.get("FR"), Some(&2));

        let nobody = aggregate(&db, "ghost").await.unwrap();
        assert_eq!(nobody, Summary::default());
    }

    #[tokio::test]
    async fn code_analytics_lists_history() {
        let db = QrDatabase::open_in_memory().await.unwrap();
        let created = db
            .create_code(&NewCode {
                id: "a",
                owner_id: "u1",
                destination: "https://example.com",
                qr_type: QrType::Url,
                tracking_url: None,
                is_password_protected: false,
                password_hash: "",
                expires_at: None,
                max_scans: 4,
            })
            .await
            .unwrap();

        let empty = code_analytics(&db, &created).await.unwrap();
        assert_eq!(empty.scan_count, 0);
        assert_eq!(empty.remaining_scans, Some(4));
        assert!(empty.events.is_empty());

        ScanRecorder::new(db.clone())
            .record_scan("a", &ScanInput::default())
            .await
            .unwrap();
        let code = db.get_code("a").await.unwrap();
        let stats = code_analytics(&db, &code).await.unwrap();
        assert_eq!(stats.scan_count, 1);
        assert_eq!(stats.remaining_scans, Some(3));
        assert_eq!(stats.events.len(), 1);
        assert_eq!(stats.events[0].country, "Unknown");
        assert!(!stats.expired);
    }
}
