mod fetcher;
mod normalize;

pub use fetcher::{FeedFetcher, FetchOutcome};
pub use normalize::{normalize_entry, truncate_chars, EntryOutcome, RawEntry};
