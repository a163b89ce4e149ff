use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often notifications may be delivered to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Never,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Never => "NEVER",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "NEVER" => Ok(Frequency::Never),
            other => Err(format!("unknown frequency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub price_changed: bool,
    pub frequency: Frequency,
}

/// A stored device. The id is assigned by the store when the device is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub settings: NotificationSettings,
}

/// Client input for appending a device. Carries no id on purpose: ids come from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    pub name: String,
    #[serde(flatten)]
    pub settings: NotificationSettings,
}

impl NewDevice {
    pub fn new(name: impl Into<String>, price_changed: bool, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            settings: NotificationSettings {
                price_changed,
                frequency,
            },
        }
    }

    /// Materialise the input into a stored device under the given id.
    pub fn into_device(self, id: String) -> Device {
        Device {
            id,
            name: self.name,
            settings: self.settings,
        }
    }
}
