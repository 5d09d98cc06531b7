// SPDX-License-Identifier: MIT OR Apache-2.0

// Reset boundary tests - periodic and count-based counter rollover
// through the full generation path.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serialflux_rust::core::model::{GenerationContext, LogAction, ResetPeriod, Sequence};
use serialflux_rust::core::service::GenerationService;
use serialflux_rust::core::store::{InMemorySequenceStore, SequenceStore};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn monthly_service() -> (GenerationService, Arc<InMemorySequenceStore>) {
    let store = Arc::new(InMemorySequenceStore::new());
    let service = GenerationService::new(store.clone());
    service
        .create_sequence(
            Sequence::new("acme", "inv", "INV-{YEAR}{MONTH}-{COUNTER:4}")
                .with_reset_period(ResetPeriod::Monthly),
        )
        .unwrap();
    (service, store)
}

#[test]
fn test_same_month_shares_counter() {
    let (service, _) = monthly_service();
    let ctx = GenerationContext::new();
    assert_eq!(
        service.generate_at("acme", "inv", &ctx, at(2024, 3, 1)).unwrap(),
        "INV-202403-0001"
    );
    assert_eq!(
        service.generate_at("acme", "inv", &ctx, at(2024, 3, 31)).unwrap(),
        "INV-202403-0002"
    );
}

#[test]
fn test_month_crossing_resets_exactly_once() {
    let (service, store) = monthly_service();
    let ctx = GenerationContext::new();
    for _ in 0..5 {
        service.generate_at("acme", "inv", &ctx, at(2024, 3, 10)).unwrap();
    }

    // several calls in April: exactly one reset regardless of call count
    assert_eq!(
        service.generate_at("acme", "inv", &ctx, at(2024, 4, 1)).unwrap(),
        "INV-202404-0001"
    );
    assert_eq!(
        service.generate_at("acme", "inv", &ctx, at(2024, 4, 2)).unwrap(),
        "INV-202404-0002"
    );
    assert_eq!(
        service.generate_at("acme", "inv", &ctx, at(2024, 4, 30)).unwrap(),
        "INV-202404-0003"
    );

    let seq = store.find("acme", "inv").unwrap().unwrap();
    let resets = service
        .generation_log_by_id(seq.id)
        .unwrap()
        .iter()
        .filter(|e| e.action == LogAction::Reset)
        .count();
    assert_eq!(resets, 1, "crossing one boundary must reset exactly once");
}

#[test]
fn test_yearly_reset() {
    let store = Arc::new(InMemorySequenceStore::new());
    let service = GenerationService::new(store);
    service
        .create_sequence(
            Sequence::new("acme", "po", "PO-{YEAR}-{COUNTER:4}")
                .with_reset_period(ResetPeriod::Yearly),
        )
        .unwrap();
    let ctx = GenerationContext::new();

    service.generate_at("acme", "po", &ctx, at(2024, 3, 15)).unwrap();
    assert_eq!(
        service.generate_at("acme", "po", &ctx, at(2024, 12, 31)).unwrap(),
        "PO-2024-0002"
    );
    assert_eq!(
        service.generate_at("acme", "po", &ctx, at(2025, 1, 1)).unwrap(),
        "PO-2025-0001"
    );
}

#[test]
fn test_count_limit_resets_before_increment() {
    // reset fires at the start of the call that observes the limit; the
    // first counter issued after the rollover is step_size
    let store = Arc::new(InMemorySequenceStore::new());
    let service = GenerationService::new(store.clone());
    service
        .create_sequence(Sequence::new("acme", "lot", "{COUNTER:2}").with_reset_limit(3))
        .unwrap();
    let ctx = GenerationContext::new();

    assert_eq!(service.generate_at("acme", "lot", &ctx, at(2024, 3, 1)).unwrap(), "01");
    assert_eq!(service.generate_at("acme", "lot", &ctx, at(2024, 3, 1)).unwrap(), "02");
    assert_eq!(service.generate_at("acme", "lot", &ctx, at(2024, 3, 1)).unwrap(), "03");
    // counter sits at the limit: this call resets, then issues step_size
    assert_eq!(service.generate_at("acme", "lot", &ctx, at(2024, 3, 1)).unwrap(), "01");

    let seq = store.find("acme", "lot").unwrap().unwrap();
    assert_eq!(seq.current_value, 1);
    assert!(seq.last_reset_at.is_some());
}

#[test]
fn test_needs_reset_is_advisory_and_read_only() {
    let (service, store) = monthly_service();
    let ctx = GenerationContext::new();
    service.generate_at("acme", "inv", &ctx, at(2024, 3, 10)).unwrap();

    let before = store.find("acme", "inv").unwrap().unwrap();
    assert!(service.needs_reset_at("acme", "inv", at(2024, 4, 1)).unwrap());
    let after = store.find("acme", "inv").unwrap().unwrap();
    assert_eq!(before.version, after.version, "needs_reset must not mutate");
    assert_eq!(before.current_value, after.current_value);
}

#[test]
fn test_preview_simulates_pending_reset() {
    let (service, store) = monthly_service();
    let ctx = GenerationContext::new();
    for _ in 0..7 {
        service.generate_at("acme", "inv", &ctx, at(2024, 3, 10)).unwrap();
    }

    assert_eq!(
        service.preview_at("acme", "inv", &ctx, at(2024, 4, 1)).unwrap(),
        "INV-202404-0001"
    );
    // the preview neither reset nor consumed anything
    let seq = store.find("acme", "inv").unwrap().unwrap();
    assert_eq!(seq.current_value, 7);
    assert!(seq.last_reset_at.is_none());
}

#[test]
fn test_never_period_with_limit_only() {
    let store = Arc::new(InMemorySequenceStore::new());
    let service = GenerationService::new(store);
    service
        .create_sequence(Sequence::new("acme", "tok", "{COUNTER:2}").with_reset_limit(2))
        .unwrap();
    let ctx = GenerationContext::new();

    // time never resets this sequence, only the count limit does
    assert_eq!(service.generate_at("acme", "tok", &ctx, at(2024, 1, 1)).unwrap(), "01");
    assert_eq!(service.generate_at("acme", "tok", &ctx, at(2026, 6, 1)).unwrap(), "02");
    assert_eq!(service.generate_at("acme", "tok", &ctx, at(2030, 1, 1)).unwrap(), "01");
}
