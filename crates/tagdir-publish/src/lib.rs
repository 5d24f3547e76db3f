//! Side-effect collaborators run after tag writes: the XML sitemap and the
//! search-engine URL push.

mod error;
mod seo;
mod sitemap;

pub use error::PublishError;
pub use seo::BaiduPush;
pub use sitemap::XmlSitemap;
