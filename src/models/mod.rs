mod article;
mod event;
mod feed;
mod settings;
mod watchlist;

pub use article::{Article, NewArticle};
pub use event::RefreshEvent;
pub use feed::Feed;
pub use settings::{Settings, MIN_REFRESH_INTERVAL_SECS};
pub use watchlist::Ticker;
