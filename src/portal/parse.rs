//! HTML extraction for the portal's listing pages.
//!
//! All functions are pure so they can run against saved page sources. The
//! portal gets restyled every few months; every lookup therefore starts
//! from the configured selector and falls back through the class names the
//! portal has used before.

use super::types::{CategoryLink, Product, ProductDefaults};
use crate::config::PortalConfig;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

// ── product cards ───────────────────────────────────────────────────────

pub fn extract_products(
    html: &str,
    portal: &PortalConfig,
    defaults: &ProductDefaults,
    category: Option<&str>,
) -> Vec<Product> {
    let document = Html::parse_document(html);
    let card_selectors = [
        portal.card_selector.as_str(),
        ".produto-card",
        ".product-card",
        "[class*='produto']",
        "[class*='product']",
    ];
    let title_selectors = [
        portal.title_selector.as_str(),
        ".titulo",
        ".title",
        "h3",
        "[class*='titulo']",
        "[class*='title']",
    ];
    let price_selectors = [
        portal.price_selector.as_str(),
        ".preco",
        ".price",
        "[class*='preco']",
        "[class*='price']",
    ];
    let brand_selectors = [portal.brand_selector.as_str(), ".marca", "[class*='brand']"];

    let mut products = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for selector_str in &card_selectors {
        let Ok(card_selector) = Selector::parse(selector_str) else {
            continue;
        };
        for card in document.select(&card_selector) {
            let Some(title) = first_text(&card, &title_selectors) else {
                tracing::debug!("card without a title, skipped");
                continue;
            };
            if title.len() < 3 {
                continue;
            }
            let price_text = first_text(&card, &price_selectors).unwrap_or_default();
            let Some(portal_price) = parse_brl_price(&price_text) else {
                tracing::debug!(title = %title, "card without a parseable price, skipped");
                continue;
            };
            // A broad fallback selector can match a wrapper as well as the
            // cards inside it, echoing the first card's title; first one wins.
            if !seen.insert(title.clone()) {
                continue;
            }
            let image = first_attr(&card, &["img"], "src")
                .map(|src| absolutize(&portal.base_url, &src))
                .unwrap_or_default();
            let brand = first_text(&card, &brand_selectors);
            products.push(Product {
                title,
                portal_price,
                image,
                description: defaults.description.clone(),
                stock: defaults.stock,
                brand,
                category: category.map(|c| c.to_string()),
            });
        }
        // First selector that yields cards wins; the rest are fallbacks.
        if !products.is_empty() {
            break;
        }
    }
    products
}

// ── category menu ───────────────────────────────────────────────────────

pub fn extract_category_links(html: &str, portal: &PortalConfig) -> Vec<CategoryLink> {
    let document = Html::parse_document(html);
    let selectors = [
        portal.category_selector.as_str(),
        "a[href*='categoria']",
        "a[href*='category']",
        ".menu a",
        "nav a",
    ];
    let mut links: Vec<CategoryLink> = Vec::new();
    for selector_str in &selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                continue;
            }
            let url = absolutize(&portal.base_url, href);
            if links.iter().any(|link| link.url == url) {
                continue;
            }
            let mut name = clean_text(&element.text().collect::<Vec<_>>().join(" "));
            if name.is_empty() {
                name = url
                    .rsplit('/')
                    .find(|segment| !segment.is_empty())
                    .unwrap_or("categoria")
                    .to_string();
            }
            links.push(CategoryLink { name, url });
        }
        if !links.is_empty() {
            break;
        }
    }
    links
}

// ── price parsing ───────────────────────────────────────────────────────

/// Parse a Brazilian price string ("R$ 1.234,56") into a float. Returns
/// `None` when the text carries no usable number.
pub fn parse_brl_price(text: &str) -> Option<f64> {
    let text = text.replace('\u{a0}', " ");
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let numeric: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let numeric = numeric.trim_end_matches(|c| c == '.' || c == ',');
    if numeric.is_empty() {
        return None;
    }
    let normalized = if numeric.contains(',') {
        // Brazilian format: dots group thousands, the comma is the decimal.
        numeric.replace('.', "").replace(',', ".")
    } else if looks_like_thousands(numeric) {
        numeric.replace('.', "")
    } else {
        numeric.to_string()
    };
    normalized.parse::<f64>().ok()
}

/// "1.234" and "1.234.567" are dot-grouped integers; "12.34" is a plain
/// decimal.
fn looks_like_thousands(numeric: &str) -> bool {
    let mut groups = numeric.split('.');
    let Some(first) = groups.next() else {
        return false;
    };
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && !first.is_empty()
        && first.len() <= 3
        && rest.iter().all(|group| group.len() == 3)
}

// ── helpers ─────────────────────────────────────────────────────────────

fn first_text(card: &ElementRef, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = card.select(&selector).next() {
            let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn first_attr(card: &ElementRef, selectors: &[&str], attr: &str) -> Option<String> {
    for selector_str in selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in card.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                if !value.trim().is_empty() {
                    return Some(value.trim().to_string());
                }
            }
        }
    }
    None
}

fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portal_config() -> PortalConfig {
        PortalConfig {
            base_url: "https://portal.distribuidora.test".to_string(),
            ..Default::default()
        }
    }

    fn defaults() -> ProductDefaults {
        ProductDefaults {
            description: "Produto novo.".to_string(),
            stock: 10,
        }
    }

    const LISTING_PAGE: &str = r#"
        <html><body>
        <div class="lista">
          <div class="produto-card">
            <div class="titulo">  Fone de Ouvido
                Bluetooth XYZ </div>
            <div class="preco">R$ 1.234,56</div>
            <div class="marca">XYZ Audio</div>
            <img src="/img/fone.jpg"/>
          </div>
          <div class="produto-card">
            <div class="titulo">Mouse Gamer ABC</div>
            <div class="preco">R$ 99,90</div>
            <img src="https://cdn.distribuidora.test/mouse.jpg"/>
          </div>
          <div class="produto-card">
            <div class="titulo">Sem preço ainda</div>
            <div class="preco">consulte</div>
          </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_products_from_listing() {
        let products = extract_products(LISTING_PAGE, &portal_config(), &defaults(), Some("Informática"));

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title, "Fone de Ouvido Bluetooth XYZ");
        assert!((products[0].portal_price - 1234.56).abs() < 1e-9);
        assert_eq!(products[0].image, "https://portal.distribuidora.test/img/fone.jpg");
        assert_eq!(products[0].brand.as_deref(), Some("XYZ Audio"));
        assert_eq!(products[0].category.as_deref(), Some("Informática"));
        assert_eq!(products[0].stock, 10);

        assert_eq!(products[1].title, "Mouse Gamer ABC");
        assert!((products[1].portal_price - 99.9).abs() < 1e-9);
        assert_eq!(products[1].image, "https://cdn.distribuidora.test/mouse.jpg");
        assert_eq!(products[1].brand, None);
    }

    #[test]
    fn test_extract_products_with_fallback_selectors() {
        // Restyled page: different class names, prices without the symbol.
        let html = r#"
            <div class="product-card">
              <h3>Teclado Mecânico QWE</h3>
              <span class="price">349,00</span>
            </div>
        "#;
        let products = extract_products(html, &portal_config(), &defaults(), None);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Teclado Mecânico QWE");
        assert!((products[0].portal_price - 349.0).abs() < 1e-9);
        assert_eq!(products[0].category, None);
    }

    #[test]
    fn test_extract_products_from_empty_page() {
        assert!(extract_products("<html><body></body></html>", &portal_config(), &defaults(), None).is_empty());
    }

    #[test]
    fn test_extract_products_keeps_first_card_per_title() {
        // The grid wrapper matches [class*='produto'] too and echoes the
        // first card inside it.
        let html = r#"
            <div class="produtos-grid">
              <div class="produto-item">
                <h3>Mouse Gamer RGB</h3>
                <span class="price">R$ 119,90</span>
              </div>
              <div class="produto-item">
                <h3>Teclado Mecanico</h3>
                <span class="price">R$ 349,00</span>
              </div>
            </div>
        "#;
        let products = extract_products(html, &portal_config(), &defaults(), None);
        let titles: Vec<&str> = products.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Mouse Gamer RGB", "Teclado Mecanico"]);
        assert!((products[0].portal_price - 119.9).abs() < 1e-9);
        assert!((products[1].portal_price - 349.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_products_skips_card_without_title() {
        let html = r#"
            <div class="produto-card">
              <div class="preco">R$ 59,90</div>
            </div>
            <div class="produto-card">
              <div class="titulo">Caneca Térmica</div>
              <div class="preco">R$ 59,90</div>
            </div>
        "#;
        let products = extract_products(html, &portal_config(), &defaults(), None);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Caneca Térmica");
    }

    #[test]
    fn test_extract_category_links() {
        // The href="#" anchor needs the double-# raw string guard.
        let html = r##"
            <nav>
              <a href="/categoria/informatica">Informática</a>
              <a href="/categoria/perfumaria">Perfumaria</a>
              <a href="/categoria/informatica">Informática (repetida)</a>
              <a href="#">Topo</a>
              <a href="javascript:void(0)">Menu</a>
              <a href="https://portal.distribuidora.test/categoria/casa">Casa e Jardim</a>
            </nav>
        "##;
        let links = extract_category_links(html, &portal_config());
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].name, "Informática");
        assert_eq!(links[0].url, "https://portal.distribuidora.test/categoria/informatica");
        assert_eq!(links[1].name, "Perfumaria");
        assert_eq!(links[2].name, "Casa e Jardim");
    }

    #[test]
    fn test_extract_category_links_name_falls_back_to_slug() {
        let html = r#"<a href="/categoria/limpeza"><img src="/icons/limpeza.png"/></a>"#;
        let links = extract_category_links(html, &portal_config());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "limpeza");
    }

    #[test]
    fn test_parse_brl_price_variants() {
        assert_eq!(parse_brl_price("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_brl_price("R$19,90"), Some(19.9));
        assert_eq!(parse_brl_price("R$\u{a0}49,90 à vista"), Some(49.9));
        assert_eq!(parse_brl_price("99,90"), Some(99.9));
        assert_eq!(parse_brl_price("1234.56"), Some(1234.56));
        assert_eq!(parse_brl_price("1.234"), Some(1234.0));
        assert_eq!(parse_brl_price("1.234.567"), Some(1234567.0));
        assert_eq!(parse_brl_price("12.34"), Some(12.34));
        assert_eq!(parse_brl_price("350"), Some(350.0));
    }

    #[test]
    fn test_parse_brl_price_rejects_junk() {
        assert_eq!(parse_brl_price(""), None);
        assert_eq!(parse_brl_price("consulte"), None);
        assert_eq!(parse_brl_price("R$ --"), None);
    }

    #[test]
    fn test_absolutize() {
        let base = "https://portal.distribuidora.test/";
        assert_eq!(absolutize(base, "https://x.test/a"), "https://x.test/a");
        assert_eq!(absolutize(base, "//cdn.test/a.jpg"), "https://cdn.test/a.jpg");
        assert_eq!(absolutize(base, "/categoria/casa"), "https://portal.distribuidora.test/categoria/casa");
        assert_eq!(absolutize(base, "categoria/casa"), "https://portal.distribuidora.test/categoria/casa");
    }
}
