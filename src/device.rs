use rust_decimal::Decimal;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use std::fmt;

/// Opaque device identifier. The backend sends it either as a JSON string or
/// as a number; both end up as the same textual id.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "RawDeviceId")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDeviceId {
    Number(u64),
    Text(String),
}

impl From<RawDeviceId> for DeviceId {
    fn from(raw: RawDeviceId) -> Self {
        match raw {
            RawDeviceId::Number(n) => Self(n.to_string()),
            RawDeviceId::Text(s) => Self(s),
        }
    }
}

/// Place (player slot) number on a device.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlaceId(pub u32);

impl PlaceId {
    /// Place numbers start at 1; `0` is what a missing id decodes to.
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub places: Vec<Place>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub place: PlaceId,
    #[serde(default)]
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balances: Decimal,
}

/// Echo of a successful balance update. `balances` is the authoritative
/// post-update value for `place`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub place: PlaceId,
    #[serde(with = "rust_decimal::serde::float")]
    pub balances: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(rename = "deviceId", default)]
    pub device_id: Option<DeviceId>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Place>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Place>>::deserialize(deserializer)?.unwrap_or_default())
}
