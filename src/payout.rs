//! Prize payout helpers: winner payment addresses

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Payment-related fields of a buyer's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// bech32 LNURL
    pub lud06: Option<String>,
    /// Lightning address (`user@domain`)
    pub lud16: Option<String>,
}

/// Lightning address shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_lightning_address(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Payout address from profile metadata.
///
/// Only a well-formed `lud16` is accepted; a bare `lud06` would need LNURL
/// decoding and is skipped.
pub fn lightning_address_from_metadata(metadata: Option<&ProfileMetadata>) -> Option<String> {
    let metadata = metadata?;
    if let Some(lud16) = metadata.lud16.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        if is_valid_lightning_address(lud16) {
            return Some(lud16.to_string());
        }
        warn!("Profile lud16 {:?} is not a lightning address", lud16);
        return None;
    }
    if metadata.lud06.is_some() {
        warn!("Profile has lud06 only; lud16 required for payouts");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_lightning_address("alice@getalby.com"));
        assert!(is_valid_lightning_address("a.b@sub.example.org"));
        assert!(!is_valid_lightning_address("alice"));
        assert!(!is_valid_lightning_address("@example.com"));
        assert!(!is_valid_lightning_address("alice@localhost"));
        assert!(!is_valid_lightning_address("alice@example."));
        assert!(!is_valid_lightning_address("al ice@example.com"));
        assert!(!is_valid_lightning_address("a@b@example.com"));
    }

    #[test]
    fn test_prefers_lud16() {
        let meta = ProfileMetadata {
            lud06: Some("lnurl1xyz".into()),
            lud16: Some("bob@example.com".into()),
        };
        assert_eq!(lightning_address_from_metadata(Some(&meta)).as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_malformed_lud16_is_none() {
        for bad in ["bob", "bob@localhost", "bob @example.com", "@example.com"] {
            let meta = ProfileMetadata { lud06: None, lud16: Some(bad.into()) };
            assert_eq!(lightning_address_from_metadata(Some(&meta)), None, "{}", bad);
        }
        let padded = ProfileMetadata { lud06: None, lud16: Some(" bob@example.com\n".into()) };
        assert_eq!(
            lightning_address_from_metadata(Some(&padded)).as_deref(),
            Some("bob@example.com")
        );
    }

    #[test]
    fn test_lud06_only_is_none() {
        let meta = ProfileMetadata { lud06: Some("lnurl1xyz".into()), lud16: None };
        assert_eq!(lightning_address_from_metadata(Some(&meta)), None);
        assert_eq!(lightning_address_from_metadata(None), None);
    }
}
