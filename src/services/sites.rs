use crate::config::SiteEntry;
use crate::errors::ServiceError;
use serde::Serialize;
use utoipa::ToSchema;

/// Static site registry injected from configuration.
///
/// Configuration and statistics are deliberately static example data: the
/// predecessor system served hardcoded payloads here and no backing store
/// exists yet.
pub struct SiteRegistry {
    sites: Vec<SiteEntry>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteFeatures {
    pub wishlist: bool,
    pub cart: bool,
    pub user_profile: bool,
    pub multi_currency: bool,
    pub live_chat: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteLocalization {
    pub default_language: String,
    pub available_languages: Vec<String>,
    pub default_currency: String,
    pub available_currencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteConfigResponse {
    pub id: String,
    pub name: String,
    pub theme: String,
    pub features: SiteFeatures,
    pub localization: SiteLocalization,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodCounters {
    pub today: u64,
    pub yesterday: u64,
    pub this_week: u64,
    pub this_month: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteStatistics {
    pub site_id: String,
    pub visitors: PeriodCounters,
    pub orders: PeriodCounters,
    pub revenue: PeriodCounters,
}

impl SiteRegistry {
    pub fn new(sites: Vec<SiteEntry>) -> Self {
        Self { sites }
    }

    fn find(&self, site_id: &str) -> Result<&SiteEntry, ServiceError> {
        self.sites
            .iter()
            .find(|s| s.id == site_id)
            .ok_or_else(|| ServiceError::NotFound(format!("site '{}'", site_id)))
    }

    pub fn list_sites(&self) -> Vec<SiteSummary> {
        self.sites
            .iter()
            .map(|s| SiteSummary {
                id: s.id.clone(),
                name: s.name.clone(),
                url: format!("/?site={}", s.id),
                description: format!("{} mall storefront", s.name),
            })
            .collect()
    }

    pub fn get_config(&self, site_id: &str) -> Result<SiteConfigResponse, ServiceError> {
        let site = self.find(site_id)?;
        Ok(SiteConfigResponse {
            id: site.id.clone(),
            name: site.name.clone(),
            theme: site.theme.clone(),
            features: SiteFeatures {
                wishlist: true,
                cart: true,
                user_profile: true,
                multi_currency: false,
                live_chat: false,
            },
            localization: SiteLocalization {
                default_language: site.default_language.clone(),
                available_languages: vec!["en-US".to_string(), "zh-CN".to_string()],
                default_currency: site.default_currency.clone(),
                available_currencies: vec!["USD".to_string(), "CNY".to_string()],
            },
        })
    }

    /// Example statistics only; no store backs these numbers.
    pub fn get_statistics(&self, site_id: &str) -> Result<SiteStatistics, ServiceError> {
        let site = self.find(site_id)?;
        Ok(SiteStatistics {
            site_id: site.id.clone(),
            visitors: PeriodCounters {
                today: 1245,
                yesterday: 1043,
                this_week: 6789,
                this_month: 24567,
            },
            orders: PeriodCounters {
                today: 37,
                yesterday: 42,
                this_week: 245,
                this_month: 987,
            },
            revenue: PeriodCounters {
                today: 12450,
                yesterday: 15678,
                this_week: 78901,
                this_month: 324567,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteEntry;

    fn registry() -> SiteRegistry {
        SiteRegistry::new(vec![SiteEntry {
            id: "main".into(),
            name: "Main Mall".into(),
            theme: "default".into(),
            default_currency: "USD".into(),
            default_language: "en-US".into(),
        }])
    }

    #[test]
    fn known_site_returns_config() {
        let cfg = registry().get_config("main").unwrap();
        assert_eq!(cfg.id, "main");
        assert!(cfg.features.wishlist);
    }

    #[test]
    fn unknown_site_is_not_found() {
        let err = registry().get_config("nope").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = registry().get_statistics("nope").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn list_sites_includes_all_entries() {
        let sites = registry().list_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, "main");
    }
}
