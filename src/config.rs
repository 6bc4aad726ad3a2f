use crate::error::{PaymentError, Result};
use std::str::FromStr;

pub const DEFAULT_CHECKOUT_BASE_URL: &str = "https://checkout.sandbox.thebazaar.local/pay";
pub const DEFAULT_CONFIRM_AFTER: u32 = 2;

/// How the sandbox gateway settles mobile-money payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SandboxBehavior {
    #[default]
    Approve,
    Decline,
    /// Payments stay in `processing` forever.
    NeverConfirm,
    /// Every call fails as if the gateway were down.
    Unavailable,
}

impl FromStr for SandboxBehavior {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(SandboxBehavior::Approve),
            "DECLINE" => Ok(SandboxBehavior::Decline),
            "NEVER_CONFIRM" => Ok(SandboxBehavior::NeverConfirm),
            "UNAVAILABLE" => Ok(SandboxBehavior::Unavailable),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown sandbox behavior '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub checkout_base_url: String,
    /// Status reads before a mobile-money payment settles.
    pub confirm_after: u32,
    pub behavior: SandboxBehavior,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            checkout_base_url: DEFAULT_CHECKOUT_BASE_URL.to_string(),
            confirm_after: DEFAULT_CONFIRM_AFTER,
            behavior: SandboxBehavior::default(),
        }
    }
}

impl SandboxConfig {
    /// Reads `BAZAAR_CHECKOUT_BASE_URL`, `BAZAAR_SANDBOX_CONFIRM_AFTER` and
    /// `BAZAAR_SANDBOX_BEHAVIOR`, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let confirm_after = match lookup("BAZAAR_SANDBOX_CONFIRM_AFTER") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                PaymentError::ValidationError(format!(
                    "BAZAAR_SANDBOX_CONFIRM_AFTER='{}': {}",
                    raw, e
                ))
            })?,
            None => defaults.confirm_after,
        };
        let behavior = match lookup("BAZAAR_SANDBOX_BEHAVIOR") {
            Some(raw) => raw.parse()?,
            None => defaults.behavior,
        };

        Ok(Self {
            checkout_base_url: lookup("BAZAAR_CHECKOUT_BASE_URL")
                .unwrap_or(defaults.checkout_base_url),
            confirm_after,
            behavior,
        })
    }
}
