//! Listing management against the marketplace account: batch publishing of
//! worthwhile rows and bulk deletion of everything active.

use crate::config::{MeliConfig, StrategyConfig};
use crate::engine::{margin, CategoryResolver};
use crate::meli::rest::MeliRest;
use crate::meli::types::{ItemDescription, NewItem, PictureSource};
use crate::report::Comparison;
use anyhow::{Context, Result};

#[derive(Debug, Default)]
pub struct PublishSummary {
    pub attempted: usize,
    pub published: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct PurgeSummary {
    pub found: usize,
    pub deleted: usize,
    pub failed: usize,
}

pub struct Publisher<'a> {
    rest: &'a mut MeliRest,
    resolver: CategoryResolver,
    strategy: StrategyConfig,
    listing: MeliConfig,
    dry_run: bool,
}

impl<'a> Publisher<'a> {
    pub fn new(
        rest: &'a mut MeliRest,
        resolver: CategoryResolver,
        strategy: StrategyConfig,
        listing: MeliConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            rest,
            resolver,
            strategy,
            listing,
            dry_run,
        }
    }

    /// Publish each row that is flagged worth publishing (or every row with
    /// `all`). One row failing does not stop the batch.
    pub async fn publish_batch(&mut self, rows: &[Comparison], all: bool) -> Result<PublishSummary> {
        let mut summary = PublishSummary::default();
        for row in rows {
            if !all && !row.worth_publishing {
                summary.skipped += 1;
                continue;
            }
            summary.attempted += 1;

            let price = margin::publish_price(row.portal_price, self.strategy.publish_markup);
            if self.dry_run {
                tracing::info!(title = %row.title, price, "DRY RUN: would publish listing");
                continue;
            }

            let predicted = match self.rest.predict_category(&row.title).await {
                Ok(predicted) => predicted,
                Err(e) => {
                    tracing::debug!(title = %row.title, error = %e, "category prediction unavailable");
                    None
                }
            };
            let category_id = self.resolver.resolve(
                predicted,
                row.meli_category.as_deref(),
                row.category.as_deref(),
            );
            let item = self.build_item(row, category_id, price);

            match self.rest.publish(&item).await {
                Ok(published) => {
                    summary.published += 1;
                    tracing::info!(
                        item_id = %published.id,
                        permalink = %published.permalink,
                        title = %row.title,
                        "listing published"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(title = %row.title, error = %e, "publish failed, moving on");
                }
            }
        }
        Ok(summary)
    }

    /// Delete every active listing on the account.
    pub async fn purge_all(&mut self) -> Result<PurgeSummary> {
        let user_id = self
            .rest
            .my_user_id()
            .await
            .context("could not resolve the account behind the token")?;
        let ids = self
            .rest
            .active_item_ids(user_id)
            .await
            .context("could not list active items")?;
        tracing::info!(count = ids.len(), "active listings found");

        let mut summary = PurgeSummary {
            found: ids.len(),
            ..Default::default()
        };
        for id in &ids {
            if self.dry_run {
                tracing::info!(item_id = %id, "DRY RUN: would delete listing");
                continue;
            }
            match self.rest.delete_item(id).await {
                Ok(()) => {
                    summary.deleted += 1;
                    tracing::debug!(item_id = %id, "listing deleted");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(item_id = %id, error = %e, "delete failed, moving on");
                }
            }
        }
        Ok(summary)
    }

    fn build_item(&self, row: &Comparison, category_id: String, price: f64) -> NewItem {
        let pictures = if row.image.is_empty() {
            Vec::new()
        } else {
            vec![PictureSource {
                source: row.image.clone(),
            }]
        };
        NewItem {
            title: row.title.clone(),
            category_id,
            price,
            currency_id: self.listing.currency.clone(),
            available_quantity: row.stock,
            buying_mode: self.listing.buying_mode.clone(),
            listing_type_id: self.listing.listing_type.clone(),
            condition: self.listing.condition.clone(),
            description: ItemDescription {
                plain_text: row.description.clone(),
            },
            pictures,
        }
    }
}
