//! Error types for the carbon credit marketplace

/// Result type for marketplace operations
pub type MarketResult<T> = std::result::Result<T, MarketError>;

/// Marketplace error types
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Company already registered with email {0}")]
    DuplicateCompany(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl MarketError {
    pub(crate) fn company_not_found(id: &str) -> Self {
        MarketError::NotFound {
            kind: "Company",
            id: id.to_string(),
        }
    }

    pub(crate) fn listing_not_found(id: &str) -> Self {
        MarketError::NotFound {
            kind: "Listing",
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MarketError::company_not_found("abc123").to_string(),
            "Company not found: abc123"
        );
        assert_eq!(
            MarketError::InvalidAmount("credit amount must be positive".to_string()).to_string(),
            "Invalid amount: credit amount must be positive"
        );
    }
}
