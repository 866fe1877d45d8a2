pub mod atomic;
pub mod feed_document;
pub mod traits;
pub mod xml_feed_store;

pub use feed_document::FeedDocument;
pub use traits::FeedStore;
pub use xml_feed_store::XmlFeedStore;
