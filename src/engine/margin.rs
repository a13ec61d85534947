//! Decision math for the portal-to-marketplace flip.
//!
//! All prices are in BRL. The margin compares the marketplace's going price
//! for a product against the distributor's price; `worth_publishing` applies
//! the configured cutoff on top.

/// margin = marketplace price - portal price
///
/// A product with no marketplace hit carries a zero marketplace price, so
/// its margin goes negative and it never clears the cutoff.
pub fn margin(meli_price: f64, portal_price: f64) -> f64 {
    meli_price - portal_price
}

/// True when the margin strictly clears the cutoff.
pub fn worth_publishing(margin: f64, threshold: f64) -> bool {
    margin > threshold
}

/// Listing price: the distributor price plus the flat markup.
pub fn publish_price(portal_price: f64, markup: f64) -> f64 {
    round_centavos(portal_price + markup)
}

/// Round to whole centavos.
pub fn round_centavos(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_is_meli_minus_portal() {
        assert!((margin(80.0, 50.0) - 30.0).abs() < 1e-9);
        assert!((margin(0.0, 50.0) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_worth_publishing_threshold_is_strict() {
        assert!(!worth_publishing(20.0, 20.0));
        assert!(worth_publishing(20.01, 20.0));
        assert!(!worth_publishing(19.99, 20.0));
        assert!(!worth_publishing(-5.0, 20.0));
    }

    #[test]
    fn test_publish_price_adds_markup() {
        assert!((publish_price(49.9, 30.0) - 79.9).abs() < 1e-9);
        assert!((publish_price(0.0, 30.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_centavos() {
        assert!((round_centavos(19.899999) - 19.9).abs() < 1e-9);
        assert!((round_centavos(55.128) - 55.13).abs() < 1e-9);
        assert!((round_centavos(10.0) - 10.0).abs() < 1e-9);
    }
}
