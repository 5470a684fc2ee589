//! Prometheus counters for sends and detected matches.

use domains::MessageType;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TypeLabels {
    pub message_type: String,
}

impl From<MessageType> for TypeLabels {
    fn from(message_type: MessageType) -> Self {
        Self { message_type: message_type.as_str().to_string() }
    }
}

pub struct Metrics {
    registry: Registry,
    messages_sent: Family<TypeLabels, Counter>,
    matches_detected: Family<TypeLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let messages_sent = Family::<TypeLabels, Counter>::default();
        let matches_detected = Family::<TypeLabels, Counter>::default();
        // Counters get the `_total` suffix on exposition.
        registry.register(
            "heartconnect_messages_sent",
            "Messages accepted for delivery",
            messages_sent.clone(),
        );
        registry.register(
            "heartconnect_matches_detected",
            "Sends that completed a mutual match",
            matches_detected.clone(),
        );
        Self { registry, messages_sent, matches_detected }
    }

    pub fn record_send(&self, message_type: MessageType, is_match: bool) {
        let labels = TypeLabels::from(message_type);
        self.messages_sent.get_or_create(&labels).inc();
        if is_match {
            self.matches_detected.get_or_create(&labels).inc();
        }
    }

    /// OpenMetrics text exposition of every registered metric.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sends_and_matches_per_type() {
        let metrics = Metrics::new();
        metrics.record_send(MessageType::Confess, false);
        metrics.record_send(MessageType::Confess, true);
        metrics.record_send(MessageType::Share, false);

        let body = metrics.render().unwrap();
        assert!(body.contains(r#"heartconnect_messages_sent_total{message_type="confess"} 2"#));
        assert!(body.contains(r#"heartconnect_messages_sent_total{message_type="share"} 1"#));
        assert!(body.contains(r#"heartconnect_matches_detected_total{message_type="confess"} 1"#));
        assert!(!body.contains(r#"heartconnect_matches_detected_total{message_type="share"}"#));
    }
}
