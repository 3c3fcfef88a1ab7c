use chrono::NaiveDateTime;
use rumqttc::Publish;
use std::fmt;

/// One publish received on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: String,
    pub retained: bool,
    pub timestamp: NaiveDateTime,
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let retained = if self.retained { " (retained)" } else { "" };
        write!(
            f,
            "{} - {}: {:?}{}",
            self.timestamp, self.topic, self.payload, retained
        )
    }
}

impl InboundMessage {
    pub fn from_topic(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        InboundMessage {
            topic: topic.into(),
            payload: payload.into(),
            retained: false,
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    /// Non-UTF-8 bytes are replaced, which makes such payloads unrecognized downstream.
    pub fn from_publish(publish: &Publish) -> Self {
        InboundMessage {
            topic: publish.topic.clone(),
            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
            retained: publish.retain,
            timestamp: chrono::Local::now().naive_local(),
        }
    }
}
