//! Category traversal and infinite-scroll harvesting.

use super::parse;
use super::session::PortalSession;
use super::types::{CategoryLink, Product, ProductDefaults};
use super::ProductSource;
use crate::config::PortalConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// Walks the portal's category menu and collects the product cards out of
/// each category's listing.
pub struct CatalogScraper<'a> {
    session: &'a PortalSession,
    portal: &'a PortalConfig,
    defaults: ProductDefaults,
}

impl<'a> CatalogScraper<'a> {
    pub fn new(
        session: &'a PortalSession,
        portal: &'a PortalConfig,
        defaults: ProductDefaults,
    ) -> Self {
        Self {
            session,
            portal,
            defaults,
        }
    }

    /// Category links found on the current page (the post-login landing
    /// page carries the full menu).
    pub async fn discover_categories(&self) -> Result<Vec<CategoryLink>> {
        let html = self.session.page_source().await?;
        let links = parse::extract_category_links(&html, self.portal);
        tracing::info!(count = links.len(), "category links discovered");
        Ok(links)
    }

    /// Scrape one category to exhaustion.
    ///
    /// The listing loads more cards as the page scrolls, so extraction is
    /// incremental: each poll parses the full page source but only keeps
    /// cards with unseen titles, then scrolls and waits. The loop ends after
    /// `settle_polls` consecutive polls with no height growth and no new
    /// cards, or at the `max_scroll_polls` hard cap.
    pub async fn scrape_category(&self, link: &CategoryLink) -> Result<Vec<Product>> {
        self.session.goto_recovering(&link.url).await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut products: Vec<Product> = Vec::new();
        let mut last_height = 0u64;
        let mut idle_polls = 0u32;

        for poll in 0..self.portal.max_scroll_polls {
            let html = match self.session.page_source().await {
                Ok(html) => html,
                Err(e) => {
                    // A scroll can invalidate the DOM mid-read; the next
                    // poll sees a settled page.
                    tracing::warn!(
                        category = %link.name,
                        poll,
                        error = %e,
                        "page source read failed, polling again"
                    );
                    tokio::time::sleep(Duration::from_millis(self.portal.scroll_poll_ms)).await;
                    continue;
                }
            };

            let mut fresh = 0usize;
            for product in
                parse::extract_products(&html, self.portal, &self.defaults, Some(&link.name))
            {
                if seen.insert(product.title.clone()) {
                    products.push(product);
                    fresh += 1;
                }
            }

            let height = self.session.scroll_height().await.unwrap_or(last_height);
            if height == last_height && fresh == 0 {
                idle_polls += 1;
                if idle_polls >= self.portal.settle_polls {
                    break;
                }
            } else {
                idle_polls = 0;
            }
            last_height = height;

            self.session.scroll_to_bottom().await?;
            tokio::time::sleep(Duration::from_millis(self.portal.scroll_poll_ms)).await;
        }

        tracing::info!(category = %link.name, count = products.len(), "category scraped");
        Ok(products)
    }

    /// Traverse every category. A category that fails to scrape is skipped;
    /// products seen under more than one category are kept once.
    pub async fn scrape_all(&self) -> Result<Vec<Product>> {
        let mut categories = self.discover_categories().await?;
        if self.portal.max_categories > 0 && categories.len() > self.portal.max_categories {
            categories.truncate(self.portal.max_categories);
        }

        if categories.is_empty() {
            // Some portal tenants put the whole catalog on the landing page.
            tracing::warn!("no category links found, scraping the current page only");
            let html = self.session.page_source().await?;
            return Ok(parse::extract_products(
                &html,
                self.portal,
                &self.defaults,
                None,
            ));
        }

        let mut all: Vec<Product> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (i, link) in categories.iter().enumerate() {
            tracing::info!(
                category = %link.name,
                "[{}/{}] entering category",
                i + 1,
                categories.len()
            );
            match self.scrape_category(link).await {
                Ok(products) => {
                    for product in products {
                        if seen.insert(product.title.clone()) {
                            all.push(product);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        category = %link.name,
                        error = %e,
                        "category scrape failed, continuing with the next one"
                    );
                }
            }
        }
        Ok(all)
    }
}

#[async_trait]
impl ProductSource for CatalogScraper<'_> {
    async fn fetch_products(&mut self) -> Result<Vec<Product>> {
        self.scrape_all().await
    }
}
