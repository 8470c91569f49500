//! Topic layout for one pixie
//!
//! ```text
//! pixie/{id}                    server -> device commands (JSON with "action")
//! pixie/{id}/request/{kind}     device -> server requests
//! pixie/{id}/response/{kind}    server -> device responses (raw bytes)
//! ```

use core::fmt;

/// The four request/response pairs the device uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Device configuration (JSON)
    Config,
    /// A carousel photo by index or id (binary)
    Photo,
    /// Currently playing song id (JSON)
    Song,
    /// Album cover for a song (binary RGB565)
    Cover,
}

impl RequestKind {
    /// All kinds, in topic-table order
    pub const ALL: [RequestKind; 4] = [
        RequestKind::Config,
        RequestKind::Photo,
        RequestKind::Song,
        RequestKind::Cover,
    ];

    /// Topic segment for this kind
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestKind::Config => "config",
            RequestKind::Photo => "photo",
            RequestKind::Song => "song",
            RequestKind::Cover => "cover",
        }
    }

    /// Parse a topic segment
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precomputed topic names for one pixie id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pixie_id: u32,
    command: String,
    request_prefix: String,
    response_prefix: String,
}

impl Topics {
    /// Topic names for `pixie_id`
    pub fn new(pixie_id: u32) -> Self {
        Self {
            pixie_id,
            command: format!("pixie/{pixie_id}"),
            request_prefix: format!("pixie/{pixie_id}/request/"),
            response_prefix: format!("pixie/{pixie_id}/response/"),
        }
    }

    /// Device id these topics belong to
    pub fn pixie_id(&self) -> u32 {
        self.pixie_id
    }

    /// Bus client identifier
    pub fn client_id(&self) -> String {
        format!("pixie-sim-{}", self.pixie_id)
    }

    /// Command topic (`pixie/{id}`)
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Request topic for `kind`
    pub fn request(&self, kind: RequestKind) -> String {
        format!("{}{}", self.request_prefix, kind)
    }

    /// Response topic for `kind`
    pub fn response(&self, kind: RequestKind) -> String {
        format!("{}{}", self.response_prefix, kind)
    }

    /// Wildcard subscription covering every response kind
    pub fn response_wildcard(&self) -> String {
        format!("{}#", self.response_prefix)
    }

    /// Everything the device subscribes to after connecting
    pub fn subscriptions(&self) -> [String; 2] {
        [self.command.clone(), self.response_wildcard()]
    }

    /// Whether `topic` is this device's command topic
    pub fn is_command(&self, topic: &str) -> bool {
        topic == self.command
    }

    /// Request kind named by `topic`, if it is one of this device's request topics
    pub fn request_kind(&self, topic: &str) -> Option<RequestKind> {
        topic
            .strip_prefix(self.request_prefix.as_str())
            .and_then(RequestKind::from_name)
    }

    /// Trailing segment of a response topic for this device, if `topic` is one
    pub fn response_segment<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.response_prefix.as_str())
            .filter(|segment| !segment.is_empty() && !segment.contains('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        let topics = Topics::new(12);
        assert_eq!(topics.command(), "pixie/12");
        assert_eq!(topics.request(RequestKind::Photo), "pixie/12/request/photo");
        assert_eq!(topics.response(RequestKind::Cover), "pixie/12/response/cover");
        assert_eq!(topics.response_wildcard(), "pixie/12/response/#");
        assert_eq!(topics.client_id(), "pixie-sim-12");
    }

    #[test]
    fn test_response_segment() {
        let topics = Topics::new(12);
        assert_eq!(topics.response_segment("pixie/12/response/song"), Some("song"));
        assert_eq!(topics.response_segment("pixie/13/response/song"), None);
        assert_eq!(topics.response_segment("pixie/12/response/"), None);
        assert_eq!(topics.response_segment("pixie/12"), None);
    }

    #[test]
    fn test_request_kind_from_topic() {
        let topics = Topics::new(7);
        assert_eq!(
            topics.request_kind("pixie/7/request/cover"),
            Some(RequestKind::Cover)
        );
        assert_eq!(topics.request_kind("pixie/7/request/other"), None);
        assert_eq!(topics.request_kind("pixie/8/request/cover"), None);
    }

    #[test]
    fn test_request_kind_names() {
        for kind in RequestKind::ALL {
            assert_eq!(RequestKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(RequestKind::from_name("weather"), None);
    }
}
