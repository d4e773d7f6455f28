//! checkin::admin — shared-PIN gate for the admin surface
//!
//! The PIN is kept and compared in base32 form. The encoding is reversible and only
//! keeps the plain digits out of config files; it is not a secret store.
use base32::Alphabet;
use storage::config::AdminCfg;

const ALPHABET: Alphabet = Alphabet::RFC4648 { padding: false };

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AdminError {
    #[error("Incorrect PIN!")]
    IncorrectPin,
}

pub fn encode_pin(pin: &str) -> String { base32::encode(ALPHABET, pin.as_bytes()) }

#[derive(Debug, Clone)]
pub struct PinGate { encoded: String }

impl PinGate {
    pub fn from_encoded(encoded: &str) -> Self { Self { encoded: encoded.trim().to_string() } }

    pub fn from_pin(pin: &str) -> Self { Self { encoded: encode_pin(pin) } }

    pub fn from_config(cfg: &AdminCfg) -> Self {
        match (&cfg.encoded_pin, &cfg.pin) {
            (Some(enc), _) => Self::from_encoded(enc),
            (None, Some(pin)) => Self::from_pin(pin),
            (None, None) => Self::from_pin(storage::config::DEFAULT_PIN),
        }
    }

    pub fn check(&self, entered: &str) -> Result<AdminSession, AdminError> {
        if encode_pin(entered) == self.encoded { Ok(AdminSession { _private: () }) } else { Err(AdminError::IncorrectPin) }
    }
}

/// Proof of a passed PIN check; admin-only desk operations take one.
#[derive(Debug)]
pub struct AdminSession { _private: () }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pin_encodes_to_known_form() {
        assert_eq!(encode_pin("2050"), "GIYDKMA");
    }

    #[test]
    fn plain_and_encoded_config_agree() {
        let plain = PinGate::from_config(&AdminCfg { pin: Some("2050".into()), encoded_pin: None });
        let encoded = PinGate::from_config(&AdminCfg { pin: None, encoded_pin: Some("GIYDKMA".into()) });
        assert!(plain.check("2050").is_ok());
        assert!(encoded.check("2050").is_ok());
        assert_eq!(encoded.check("2051").unwrap_err(), AdminError::IncorrectPin);
        assert!(plain.check("").is_err());
    }
}
