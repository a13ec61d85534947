use std::collections::HashMap;

/// Resolves the marketplace category for a new listing.
///
/// Sources are tried in order and the first answer wins: the marketplace's
/// own domain-discovery prediction, the category observed on the first
/// search hit, the configured portal-to-marketplace mapping, and finally
/// the configured default. The chain never fails.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    map: HashMap<String, String>,
    default_id: String,
}

impl CategoryResolver {
    pub fn new(map: HashMap<String, String>, default_id: String) -> Self {
        Self { map, default_id }
    }

    pub fn resolve(
        &self,
        predicted: Option<String>,
        observed: Option<&str>,
        portal_category: Option<&str>,
    ) -> String {
        predicted
            .filter(|id| !id.is_empty())
            .or_else(|| {
                observed
                    .filter(|id| !id.is_empty())
                    .map(|id| id.to_string())
            })
            .or_else(|| {
                portal_category.and_then(|name| self.map.get(&normalize(name)).cloned())
            })
            .unwrap_or_else(|| self.default_id.clone())
    }
}

/// Portal category names are free text; the mapping is keyed lowercase.
fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> CategoryResolver {
        let mut map = HashMap::new();
        map.insert("perfumaria".to_string(), "MLB1246".to_string());
        CategoryResolver::new(map, "MLB3530".to_string())
    }

    #[test]
    fn test_prediction_wins() {
        let id = resolver().resolve(
            Some("MLB1276".to_string()),
            Some("MLB9999"),
            Some("Perfumaria"),
        );
        assert_eq!(id, "MLB1276");
    }

    #[test]
    fn test_observed_category_when_no_prediction() {
        let id = resolver().resolve(None, Some("MLB9999"), Some("Perfumaria"));
        assert_eq!(id, "MLB9999");
    }

    #[test]
    fn test_mapping_is_case_insensitive() {
        let id = resolver().resolve(None, None, Some("  Perfumaria "));
        assert_eq!(id, "MLB1246");
    }

    #[test]
    fn test_default_closes_the_chain() {
        let id = resolver().resolve(None, None, Some("Papelaria"));
        assert_eq!(id, "MLB3530");
        let id = resolver().resolve(None, None, None);
        assert_eq!(id, "MLB3530");
    }

    #[test]
    fn test_empty_prediction_falls_through() {
        let id = resolver().resolve(Some(String::new()), Some("MLB9999"), None);
        assert_eq!(id, "MLB9999");
    }
}
