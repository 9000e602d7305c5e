use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Heat,
    Cool,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "heat",
            Self::Cool => "cool",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Heat => "Heat",
            Self::Cool => "Cool",
        }
    }

    pub fn from_form(value: &str) -> Option<Self> {
        match value {
            "heat" => Some(Self::Heat),
            "cool" => Some(Self::Cool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempUnit {
    #[serde(rename = "f")]
    Fahrenheit,
    #[serde(rename = "c")]
    Celsius,
}

impl TempUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fahrenheit => "f",
            Self::Celsius => "c",
        }
    }

    /// Case-insensitive match on the unit tag sent by the sensor.
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("f") {
            Some(Self::Fahrenheit)
        } else if tag.eq_ignore_ascii_case("c") {
            Some(Self::Celsius)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutletAction {
    On,
    Off,
}

impl OutletAction {
    pub fn from_state(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub title: String,
    pub heading: String,
    #[serde(rename = "sensorIp")]
    pub sensor_ip: String,
    #[serde(rename = "sensorConfigured")]
    pub sensor_configured: bool,
    #[serde(rename = "lastKnownTemp")]
    pub last_known_temp: Option<f32>,
    #[serde(rename = "lastReadingEpoch")]
    pub last_reading_epoch: Option<i64>,
    #[serde(rename = "desiredTemp")]
    pub desired_temp: f32,
    #[serde(rename = "tempPadding")]
    pub temp_padding: f32,
    pub mode: &'static str,
    #[serde(rename = "autoControl")]
    pub auto_control: bool,
    #[serde(rename = "controlOn")]
    pub control_on: bool,
    #[serde(rename = "networkMode")]
    pub network_mode: &'static str,
    #[serde(rename = "factoryDefault")]
    pub factory_default: bool,
}

/// How the network layer should come up at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode {
    Station {
        hostname: String,
        ssid: String,
    },
    AccessPoint {
        ssid: String,
        ip: String,
        subnet: String,
        gateway: String,
    },
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Station { .. } => "station",
            Self::AccessPoint { .. } => "access_point",
        }
    }
}
