use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
///
/// Checks numeric bounds on crawler settings, user-agent completeness,
/// and per-site overrides (positive rates, well-formed sitemap URLs).
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let crawler = &config.crawler;

    if crawler.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation(
            "max-concurrent-jobs must be at least 1".to_string(),
        ));
    }

    if crawler.max_pages_per_site == 0 {
        return Err(ConfigError::Validation(
            "max-pages-per-site must be at least 1".to_string(),
        ));
    }

    if crawler.requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(
            "requests-per-second must be positive".to_string(),
        ));
    }

    if crawler.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "cache-capacity must be at least 1".to_string(),
        ));
    }

    if let Some(0) = crawler.max_images_per_site {
        return Err(ConfigError::Validation(
            "max-images-per-site must be at least 1 when set".to_string(),
        ));
    }

    validate_user_agent(config)?;

    for entry in &config.site {
        if entry.domain.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site entry has an empty domain".to_string(),
            ));
        }

        if let Some(rate) = entry.rate_limit {
            if rate <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "rate-limit for {} must be positive",
                    entry.domain
                )));
            }
        }

        if let Some(0) = entry.max_pages {
            return Err(ConfigError::Validation(format!(
                "max-pages for {} must be at least 1",
                entry.domain
            )));
        }

        if let Some(0) = entry.detection_threshold {
            return Err(ConfigError::Validation(format!(
                "detection-threshold for {} must be at least 1",
                entry.domain
            )));
        }

        if let Some(sitemap) = &entry.sitemap_url {
            Url::parse(sitemap).map_err(|_| ConfigError::InvalidUrl(sitemap.clone()))?;
        }
    }

    Ok(())
}

fn validate_user_agent(config: &Config) -> Result<(), ConfigError> {
    let ua = &config.user_agent;

    if ua.crawler_name.trim().is_empty() || ua.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name and version must be set".to_string(),
        ));
    }

    if !ua.contact_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "contact-email does not look like an email address: {}",
            ua.contact_email
        )));
    }

    Url::parse(&ua.contact_url)
        .map_err(|_| ConfigError::InvalidUrl(ua.contact_url.clone()))?;

    Ok(())
}
