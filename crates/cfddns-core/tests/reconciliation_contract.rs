//! Architectural Contract Test: Reconciliation Decisions
//!
//! Verifies the create / update / skip decision for a single hostname.
//!
//! Constraints verified:
//! - Missing records are created with the observed address
//! - Matching records cost no mutation
//! - Updates carry only the fields that differ
//! - Proxied records never trigger a TTL update
//! - Records of the other address family are never matched
//! - A failed listing falls through to create, and stays distinguishable
//! - One listing per record type per pass
//! - Failed writes are reported, not retried
//!
//! If this test fails, the engine is writing records it should not (or
//! skipping ones it should).

mod common;

use cfddns_core::engine::LookupStatus;
use cfddns_core::{
    DesiredRecord, NewRecord, RecordPatch, RecordType, Reconciler, ReconciliationOutcome,
    ZoneState,
};
use common::*;

fn desired(name: &str, proxied: bool, ttl: u32) -> DesiredRecord {
    DesiredRecord {
        name: name.to_string(),
        proxied,
        ttl,
    }
}

#[tokio::test]
async fn missing_record_is_created_with_observed_address() {
    let provider = MockDnsProvider::new("example.com");
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Created);
    assert_eq!(
        provider.calls(),
        vec![
            ProviderCall::List(RecordType::A),
            ProviderCall::Create(NewRecord {
                record_type: RecordType::A,
                name: "home.example.com".to_string(),
                content: "1.2.3.4".to_string(),
                proxied: false,
                ttl: 300,
            }),
        ]
    );

    let stored = provider
        .record("home.example.com", RecordType::A)
        .expect("record was created");
    assert_eq!(stored.content, "1.2.3.4");
    assert_eq!(zone.lookup_status(RecordType::A), Some(&LookupStatus::Listed));
}

#[tokio::test]
async fn matching_record_costs_no_mutation() {
    let provider = MockDnsProvider::new("example.com");
    provider.seed("home.example.com", "1.2.3.4", false, 300);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Unchanged);
    assert_eq!(provider.mutation_count(), 0);
}

#[tokio::test]
async fn address_change_patches_only_content() {
    let provider = MockDnsProvider::new("example.com");
    let existing = provider.seed("home.example.com", "1.2.3.4", false, 300);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("5.6.7.8"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Updated);
    let updates: Vec<_> = provider
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ProviderCall::Update(..)))
        .collect();
    assert_eq!(
        updates,
        vec![ProviderCall::Update(
            existing.id.clone(),
            RecordPatch {
                content: Some("5.6.7.8".to_string()),
                proxied: None,
                ttl: None,
            }
        )]
    );

    let stored = provider
        .record("home.example.com", RecordType::A)
        .expect("record still present");
    assert_eq!(stored.content, "5.6.7.8");
    assert_eq!(stored.ttl, 300);
}

#[tokio::test]
async fn proxy_toggle_patches_only_proxied() {
    let provider = MockDnsProvider::new("example.com");
    let existing = provider.seed("www.example.com", "1.2.3.4", false, 1);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("www", true, 1), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Updated);
    assert!(provider.calls().contains(&ProviderCall::Update(
        existing.id,
        RecordPatch {
            content: None,
            proxied: Some(true),
            ttl: None,
        }
    )));
}

#[tokio::test]
async fn proxied_record_ignores_ttl_difference() {
    let provider = MockDnsProvider::new("example.com");
    provider.seed("www.example.com", "1.2.3.4", true, 1);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("www", true, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Unchanged);
    assert_eq!(provider.mutation_count(), 0);
}

#[tokio::test]
async fn other_address_family_is_never_matched() {
    let provider = MockDnsProvider::new("example.com");
    let v4 = provider.seed("home.example.com", "1.2.3.4", false, 300);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("2001:db8::1"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Created);
    assert_eq!(provider.calls()[0], ProviderCall::List(RecordType::Aaaa));

    let v6 = provider
        .record("home.example.com", RecordType::Aaaa)
        .expect("AAAA record created");
    assert_eq!(v6.content, "2001:db8::1");
    assert_eq!(
        provider.record("home.example.com", RecordType::A),
        Some(v4),
        "A record must be left alone"
    );
}

#[tokio::test]
async fn equivalent_ipv6_spelling_is_unchanged() {
    let provider = MockDnsProvider::new("example.com");
    provider.seed("home.example.com", "2001:0db8:0000::0001", false, 300);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("2001:db8::1"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Unchanged);
}

#[tokio::test]
async fn failed_listing_falls_through_to_create() {
    let provider = MockDnsProvider::new("example.com");
    provider.seed("home.example.com", "1.2.3.4", false, 300);
    provider.fail_listing(true);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Created);
    assert!(
        zone.lookup_error(RecordType::A).is_some(),
        "failed listing must be distinguishable from an empty one"
    );
    assert!(matches!(
        zone.lookup_status(RecordType::A),
        Some(LookupStatus::Failed(_))
    ));
}

#[tokio::test]
async fn empty_listing_is_not_reported_as_failure() {
    let provider = MockDnsProvider::new("example.com");
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    reconciler
        .reconcile(&desired("home", false, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(zone.lookup_error(RecordType::A), None);
}

#[tokio::test]
async fn one_listing_per_type_per_pass() {
    let provider = MockDnsProvider::new("example.com");
    provider.seed("a.example.com", "1.2.3.4", false, 300);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");
    let observation = observed("1.2.3.4");

    for name in ["a", "b", "c"] {
        reconciler
            .reconcile(&desired(name, false, 300), &observation, &mut zone)
            .await;
    }

    assert_eq!(provider.list_count(), 1);
    assert_eq!(provider.mutation_count(), 2);
}

#[tokio::test]
async fn hostname_repeated_within_pass_sees_earlier_write() {
    let provider = MockDnsProvider::new("example.com");
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");
    let observation = observed("1.2.3.4");

    let first = reconciler
        .reconcile(&desired("home", false, 300), &observation, &mut zone)
        .await;
    let second = reconciler
        .reconcile(&desired("home.example.com", false, 300), &observation, &mut zone)
        .await;

    assert_eq!(first, ReconciliationOutcome::Created);
    assert_eq!(second, ReconciliationOutcome::Unchanged);
    assert_eq!(provider.records().len(), 1);
}

#[tokio::test]
async fn apex_hostname_targets_base_domain() {
    let provider = MockDnsProvider::new("example.com");
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("@", false, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert_eq!(outcome, ReconciliationOutcome::Created);
    assert!(provider.record("example.com", RecordType::A).is_some());
}

#[tokio::test]
async fn failed_write_is_reported_once() {
    let provider = MockDnsProvider::new("example.com");
    provider.fail_writes(true);
    let reconciler = Reconciler::new(&provider);
    let mut zone = ZoneState::new("example.com");

    let outcome = reconciler
        .reconcile(&desired("home", false, 300), &observed("1.2.3.4"), &mut zone)
        .await;

    assert!(outcome.is_failure(), "got {:?}", outcome);
    assert_eq!(provider.mutation_count(), 1, "no retry within a pass");
    assert!(provider.records().is_empty());
}
