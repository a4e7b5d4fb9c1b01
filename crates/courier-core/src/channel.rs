//! Messaging channel and address normalization.
//!
//! Twilio routes WhatsApp traffic through addresses prefixed with
//! `whatsapp:`. Courier stores and displays bare numbers and applies the tag
//! only on the provider wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const WHATSAPP_TAG: &str = "whatsapp:";

/// The messaging transport of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    WhatsApp,
}

impl Channel {
    /// Detect the channel of an inbound delivery from its raw addresses.
    ///
    /// WhatsApp iff either side carries the `whatsapp:` tag.
    pub fn detect(from: &str, to: &str) -> Self {
        if from.starts_with(WHATSAPP_TAG) || to.starts_with(WHATSAPP_TAG) {
            Self::WhatsApp
        } else {
            Self::Sms
        }
    }

    /// Strip a leading channel tag, leaving the bare dialable number.
    pub fn strip_tag(address: &str) -> &str {
        address.strip_prefix(WHATSAPP_TAG).unwrap_or(address)
    }

    /// Apply this channel's tag to a bare address for a provider call.
    ///
    /// SMS addresses pass through untouched.
    pub fn tag(self, address: &str) -> String {
        match self {
            Self::Sms => address.to_string(),
            Self::WhatsApp => format!("{WHATSAPP_TAG}{address}"),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::WhatsApp => "whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::WhatsApp),
            other => Err(crate::Error::Validation(format!(
                "unknown channel: {other}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn detect_sms_when_untagged() {
        assert_eq!(Channel::detect("+15551230000", "+15551234567"), Channel::Sms);
    }

    #[test]
    fn detect_whatsapp_from_either_side() {
        assert_eq!(
            Channel::detect("whatsapp:+15551230000", "+15551234567"),
            Channel::WhatsApp
        );
        assert_eq!(
            Channel::detect("+15551230000", "whatsapp:+15551234567"),
            Channel::WhatsApp
        );
    }

    #[test]
    fn strip_tag_removes_prefix_once() {
        assert_eq!(Channel::strip_tag("whatsapp:+15551234567"), "+15551234567");
        assert_eq!(Channel::strip_tag("+15551234567"), "+15551234567");
    }

    #[test]
    fn tag_applies_only_for_whatsapp() {
        assert_eq!(Channel::Sms.tag("+15551234567"), "+15551234567");
        assert_eq!(
            Channel::WhatsApp.tag("+15551234567"),
            "whatsapp:+15551234567"
        );
    }

    #[test]
    fn parse_round_trips() {
        assert_eq!("sms".parse::<Channel>().unwrap(), Channel::Sms);
        assert_eq!("whatsapp".parse::<Channel>().unwrap(), Channel::WhatsApp);
        assert!("email".parse::<Channel>().is_err());
    }
}
