//! End-to-end run: log into the portal, scrape the catalog, price every
//! product against the marketplace and write the comparison spreadsheet.

use crate::config::Config;
use crate::engine::margin;
use crate::meli::rest::MeliRest;
use crate::portal::types::ProductDefaults;
use crate::portal::{CatalogScraper, PortalSession, ProductSource};
use crate::report::{self, Comparison};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub struct RunSummary {
    pub scraped: usize,
    pub worthwhile: usize,
    pub report_path: PathBuf,
}

/// Price every scraped product against the marketplace and decide whether
/// it is worth publishing. A failed lookup counts as "not found" and keeps
/// the product in the report with a zero marketplace price.
pub async fn compare_products(
    source: &mut dyn ProductSource,
    rest: &MeliRest,
    config: &Config,
) -> Result<Vec<Comparison>> {
    let products = source.fetch_products().await?;
    tracing::info!(count = products.len(), "products scraped, fetching marketplace prices");

    let mut rows = Vec::with_capacity(products.len());
    for (i, product) in products.iter().enumerate() {
        let reference = match rest.search_reference(&product.title).await {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(
                    title = %product.title,
                    error = %e,
                    "marketplace search failed, recording no match"
                );
                None
            }
        };
        let meli_price = margin::round_centavos(
            reference.as_ref().map(|r| r.price).unwrap_or(0.0),
        );
        let meli_category = reference.and_then(|r| r.category_id);

        let margin_value =
            margin::round_centavos(margin::margin(meli_price, product.portal_price));
        let worth =
            margin::worth_publishing(margin_value, config.strategy.margin_threshold);
        tracing::debug!(
            title = %product.title,
            portal = product.portal_price,
            meli = meli_price,
            margin = margin_value,
            worth,
            "[{}/{}] compared",
            i + 1,
            products.len()
        );

        rows.push(Comparison {
            title: product.title.clone(),
            portal_price: product.portal_price,
            meli_price,
            margin: margin_value,
            worth_publishing: worth,
            meli_category,
            image: product.image.clone(),
            description: product.description.clone(),
            stock: product.stock,
            brand: product.brand.clone(),
            category: product.category.clone(),
            checked_at: chrono::Utc::now().to_rfc3339(),
        });
    }
    Ok(rows)
}

/// The full `run` flow, browser lifecycle included.
pub async fn run(config: &Config, username: &str, cnpj: &str) -> Result<RunSummary> {
    let session = PortalSession::connect(&config.webdriver, config.portal.clone()).await?;
    let outcome = run_with_session(&session, config, username, cnpj).await;
    // Close the browser whether or not the run succeeded.
    if let Err(e) = session.quit().await {
        tracing::warn!(error = %e, "webdriver session did not shut down cleanly");
    }
    outcome
}

async fn run_with_session(
    session: &PortalSession,
    config: &Config,
    username: &str,
    cnpj: &str,
) -> Result<RunSummary> {
    session.login(username, cnpj).await?;

    let defaults = ProductDefaults {
        description: config.strategy.default_description.clone(),
        stock: config.strategy.default_stock,
    };
    let mut scraper = CatalogScraper::new(session, &config.portal, defaults);
    let rest = MeliRest::new(&config.meli, None);

    let rows = compare_products(&mut scraper, &rest, config).await?;

    let path = Path::new(&config.report.output_path);
    report::write_report(path, &rows)?;
    let worthwhile = rows.iter().filter(|row| row.worth_publishing).count();
    tracing::info!(
        scraped = rows.len(),
        worthwhile,
        report = %path.display(),
        "comparison spreadsheet written"
    );

    Ok(RunSummary {
        scraped: rows.len(),
        worthwhile,
        report_path: path.to_path_buf(),
    })
}
