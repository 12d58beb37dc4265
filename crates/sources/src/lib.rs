pub mod article_source;
pub mod cache;
pub mod feed;
pub mod fetch;
pub mod funding;
pub mod patent_source;
pub mod rate_limit;

pub use article_source::{ArticleSource, FeedConfig, RssArticleSource};
pub use cache::UrlCache;
pub use patent_source::{PatentQueryBuilder, PatentSource, WarehousePatentSource};
pub use rate_limit::DomainRateLimiter;
