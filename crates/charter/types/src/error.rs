use thiserror::Error;

/// Errors raised while interpreting a [`Change`](crate::Change).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
    #[error("unknown governable parameter: {0}")]
    UnknownParameter(String),

    #[error("invalid asset symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("asset not listed: {0}")]
    AssetNotListed(String),
}

impl ChangeError {
    pub fn invalid_value(key: impl ToString, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display() {
        let err = ChangeError::invalid_value("risk.liquidation_penalty", "abc", "not a decimal");
        let msg = err.to_string();
        assert!(msg.contains("risk.liquidation_penalty"));
        assert!(msg.contains("\"abc\""));
    }
}
