//! Messages delivered by the broker for subscribed topics.

/// Raw payload delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Concrete topic the payload was published on.
    pub topic: String,
    /// Payload bytes as received.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Decode the payload as UTF-8 text.
    ///
    /// Invalid sequences are replaced rather than rejected, so delivery
    /// never fails on a malformed payload.
    #[must_use]
    pub fn into_text(self) -> TextMessage {
        TextMessage {
            body: String::from_utf8_lossy(&self.payload).into_owned(),
            topic: self.topic,
        }
    }
}

/// A broker message decoded as UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub topic: String,
    pub body: String,
}
