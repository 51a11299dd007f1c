/// YouTube video ids are 11-character opaque strings.
pub type VideoId = String;

/// YouTube channel ids (`UC...`) are opaque strings.
pub type ChannelId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
