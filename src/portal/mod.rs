pub mod catalog;
pub mod parse;
pub mod session;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::Product;

pub use catalog::CatalogScraper;
pub use session::PortalSession;

/// Anything that can produce the distributor's product list.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_products(&mut self) -> Result<Vec<Product>>;
}
