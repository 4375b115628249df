//! Mapping from registry metric names to Prometheus names and labels.
//!
//! Kafka client libraries encode the broker or topic a metric belongs to in
//! the metric name itself (`requests-for-broker-7`, `bytes-for-topic-events`).
//! This module decomposes those names into a base name plus label values, and
//! sanitizes the pieces into Prometheus's allowed character set.

const BROKER_MARKER: &str = "-for-broker-";
const TOPIC_MARKER: &str = "-for-topic-";

/// A registry metric name split into a base name and label values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Name with the marker suffix stripped.
    pub base: String,
    /// Broker id, empty unless the name carried a broker marker.
    pub broker: String,
    /// Topic name, empty unless the name carried a topic marker.
    pub topic: String,
    /// True when the name yields neither a broker nor a topic. Such entries
    /// are per-process aggregates and are not republished.
    pub skip: bool,
}

/// Split a raw metric name on the first broker or topic marker.
///
/// The broker marker is checked before the topic marker; everything after the
/// matched marker becomes the label value, unexamined. Pure and total.
pub fn parse_metric_name(raw: &str) -> ParsedName {
    let (base, broker, topic) = if let Some(i) = raw.find(BROKER_MARKER) {
        (
            raw[..i].to_string(),
            raw[i + BROKER_MARKER.len()..].to_string(),
            String::new(),
        )
    } else if let Some(i) = raw.find(TOPIC_MARKER) {
        (
            raw[..i].to_string(),
            String::new(),
            raw[i + TOPIC_MARKER.len()..].to_string(),
        )
    } else {
        (raw.to_string(), String::new(), String::new())
    };

    let skip = broker.is_empty() && topic.is_empty();
    ParsedName {
        base,
        broker,
        topic,
        skip,
    }
}

/// Replace every byte outside `[A-Za-z0-9_:]` with `_`.
///
/// Byte-wise and length-preserving; idempotent.
pub fn sanitize_name(name: &str) -> String {
    name.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b':' {
                b as char
            } else {
                '_'
            }
        })
        .collect()
}

/// Join non-empty name segments with `_`.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    let mut out = String::with_capacity(namespace.len() + subsystem.len() + name.len() + 2);
    for part in [namespace, subsystem, name] {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('_');
        }
        out.push_str(part);
    }
    out
}
