#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use meterpush_core::{AttributeSet, ErrorKind, InstrumentKind, Registry, Resource};

#[test]
fn duplicate_names_are_rejected_across_kinds() {
    let registry = Registry::new("http");
    registry.register_counter("requests", "").unwrap();

    let err = registry.register_counter("requests", "").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    let err = registry.register_histogram("requests", "").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::DuplicateName);
    assert_eq!(registry.len(), 1);
}

#[test]
fn empty_name_is_rejected() {
    let registry = Registry::new("http");
    let err = registry.register_counter("", "").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn collect_copies_all_instruments_sorted_by_name() {
    let registry = Registry::new("http");
    let c = registry.register_counter("b_total", "requests").unwrap();
    let u = registry.register_up_down_counter("a_active", "").unwrap();
    let h = registry.register_histogram("c_seconds", "").unwrap();
    let attrs = AttributeSet::path("/x");

    c.add(3, &attrs).unwrap();
    u.add(1, &attrs).unwrap();
    h.record(0.2, &attrs).unwrap();

    let snap = registry.collect();
    assert_eq!(snap.scope, "http");
    let names: Vec<_> = snap.metrics.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a_active", "b_total", "c_seconds"]);

    let counter = snap.metric("b_total").unwrap();
    assert_eq!(counter.kind, InstrumentKind::Counter);
    assert_eq!(counter.description.as_deref(), Some("requests"));
    assert_eq!(snap.point("b_total", &attrs).unwrap().as_counter(), Some(3));
    assert_eq!(snap.point("a_active", &attrs).unwrap().as_up_down(), Some(1));
    assert_eq!(
        snap.point("c_seconds", &attrs).unwrap().as_histogram().unwrap().count,
        1
    );
    assert_eq!(snap.data_point_count(), 3);
}

#[test]
fn snapshot_is_not_affected_by_later_writes() {
    let registry = Registry::new("http");
    let c = registry.register_counter("hits", "").unwrap();
    let attrs = AttributeSet::path("/x");

    c.add(1, &attrs).unwrap();
    let before = registry.collect();
    c.add(41, &attrs).unwrap();

    assert_eq!(before.point("hits", &attrs).unwrap().as_counter(), Some(1));
    assert_eq!(
        registry.collect().point("hits", &attrs).unwrap().as_counter(),
        Some(42)
    );
}

#[test]
fn writes_after_close_are_dropped_and_counted() {
    let registry = Registry::new("http");
    let c = registry.register_counter("hits", "").unwrap();
    let h = registry.register_histogram("lat", "").unwrap();
    let attrs = AttributeSet::path("/x");

    c.add(1, &attrs).unwrap();
    registry.close();
    assert!(registry.is_closed());

    c.add(1, &attrs).unwrap();
    h.record(0.1, &attrs).unwrap();

    assert_eq!(c.value(&attrs), Some(1));
    assert!(h.snapshot(&attrs).is_none());
    assert_eq!(registry.dropped_writes(), 2);
}

#[test]
fn snapshot_serializes_attributes_as_map() {
    let registry = Registry::new("http");
    let c = registry.register_counter("hits", "").unwrap();
    c.add(2, &AttributeSet::path("/api/fast")).unwrap();

    let json = serde_json::to_value(registry.collect()).unwrap();
    let point = &json["metrics"][0]["points"][0];
    assert_eq!(point["attributes"]["path"], "/api/fast");
    assert_eq!(point["value"]["counter"], 2);
    assert_eq!(json["metrics"][0]["kind"], "counter");
}

#[test]
fn resource_carries_identity_keys() {
    let r = Resource::new("myapp", "otlp", "localhost");
    assert_eq!(r.get("service.name"), Some("myapp"));
    assert_eq!(r.get("job"), Some("otlp"));
    assert_eq!(r.get("instance"), Some("localhost"));
}

#[test]
fn listener_failures_are_not_configuration_errors() {
    let err = meterpush_core::MeterError::Server("listener failed: reset".into());
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.kind().as_str(), "SERVER");
    assert_ne!(err.kind(), ErrorKind::Configuration);
}
