use crate::{ConversionConfig, ConvertError};

pub const ACCEPTED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Checks a config before anything touches the network or storage.
pub fn validate_config(config: &ConversionConfig) -> Result<(), ConvertError> {
    validate_url(config.url())?;
    if config.timeout().is_zero() {
        return Err(ConvertError::InvalidTimeout);
    }
    Ok(())
}

pub fn validate_url(url: &str) -> Result<(), ConvertError> {
    if url.is_empty() || !ACCEPTED_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ConvertError::InvalidUrl {
            url: url.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/a?b=c").is_ok());
    }

    #[test]
    fn rejects_empty_and_foreign_schemes() {
        for url in ["", "ftp://example.com", "example.com", "HTTPS://example.com", " https://x"] {
            assert!(
                matches!(validate_url(url), Err(ConvertError::InvalidUrl { .. })),
                "{url:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ConversionConfig::builder("https://example.com")
            .timeout_millis(0)
            .build();
        assert!(matches!(
            validate_config(&config),
            Err(ConvertError::InvalidTimeout)
        ));
    }
}
