/// Normalized product record scraped from the distributor portal.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub title: String,
    /// Distributor price in BRL.
    pub portal_price: f64,
    /// Absolute URL of the card's main image; empty when the card has none.
    pub image: String,
    pub description: String,
    pub stock: u32,
    pub brand: Option<String>,
    /// Name of the portal category the card was found under.
    pub category: Option<String>,
}

/// One entry of the portal's category menu.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

/// Static attributes stamped onto every scraped card. The portal does not
/// expose stock or long descriptions on the listing page.
#[derive(Debug, Clone)]
pub struct ProductDefaults {
    pub description: String,
    pub stock: u32,
}
