//! Urgency tiers

use serde::{Deserialize, Serialize};

/// Urgency tier of an alert
///
/// Ordered so that comparisons follow escalation direction:
/// `Normal < UrgentSms < UrgentPhone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// In-app notification only
    Normal = 0,
    /// In-app plus SMS
    UrgentSms = 1,
    /// In-app plus SMS plus phone call
    UrgentPhone = 2,
}

impl Tier {
    /// The tier one step above this one, if any
    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Normal => Some(Tier::UrgentSms),
            Tier::UrgentSms => Some(Tier::UrgentPhone),
            Tier::UrgentPhone => None,
        }
    }

    /// Whether this is the highest tier
    pub fn is_max(&self) -> bool {
        self.next().is_none()
    }

    /// Short channel name used by gateways (`app`, `sms`, `phone`)
    pub fn channel(&self) -> &'static str {
        match self {
            Tier::Normal => "app",
            Tier::UrgentSms => "sms",
            Tier::UrgentPhone => "phone",
        }
    }

    /// Get a human-readable description of the channels involved
    pub fn description(&self) -> &'static str {
        match self {
            Tier::Normal => "In-app only",
            Tier::UrgentSms => "In-app and SMS",
            Tier::UrgentPhone => "In-app, SMS and phone call",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Normal
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Normal => write!(f, "NORMAL"),
            Tier::UrgentSms => write!(f, "URGENT_SMS"),
            Tier::UrgentPhone => write!(f, "URGENT_PHONE"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "app" => Ok(Tier::Normal),
            "urgent_sms" | "sms" => Ok(Tier::UrgentSms),
            "urgent_phone" | "phone" => Ok(Tier::UrgentPhone),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}
