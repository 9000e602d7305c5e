use crate::types::ControlMode;

pub const HOSTNAME_MAX_LEN: usize = 63;
pub const SSID_MAX_LEN: usize = 32;
pub const PASSWORD_MAX_LEN: usize = 63;
pub const ADMIN_USER_MAX_LEN: usize = 12;
pub const ADMIN_PWD_MAX_LEN: usize = 12;
pub const IPV4_MAX_LEN: usize = 15;
pub const TITLE_MAX_LEN: usize = 50;
pub const HEADING_MAX_LEN: usize = 50;

pub const MIN_DESIRED_TEMP_F: f32 = -100.0;
pub const MAX_DESIRED_TEMP_F: f32 = 100.0;
pub const MIN_TEMP_PADDING_F: f32 = 0.0;
pub const MAX_TEMP_PADDING_F: f32 = 100.0;

/// Value the station credentials hold until someone configures them.
pub const UNSET_CREDENTIAL: &str = "SET_ME";

/// Everything that survives a power cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationRecord {
    pub hostname: String,
    pub ssid: String,
    pub pwd: String,
    pub admin_user: String,
    pub admin_pwd: String,
    pub ap_ssid: String,
    pub ap_pwd: String,
    pub ap_net_ip: String,
    pub ap_subnet: String,
    pub ap_gateway: String,
    pub title: String,
    pub heading: String,
    pub sensor_ip: String,
    pub desired_temp: f32,
    pub temp_padding: f32,
    pub mode: ControlMode,
    pub auto_control: bool,
    pub wifi_timeout_ms: u32,
}

impl Default for ConfigurationRecord {
    fn default() -> Self {
        Self {
            hostname: "TempBuddy-Ctrl".to_string(),
            ssid: UNSET_CREDENTIAL.to_string(),
            pwd: UNSET_CREDENTIAL.to_string(),
            admin_user: "admin".to_string(),
            admin_pwd: "admin".to_string(),
            ap_ssid: "TempBuddy_Ctrl".to_string(),
            ap_pwd: String::new(),
            ap_net_ip: "192.168.1.1".to_string(),
            ap_subnet: "255.255.255.0".to_string(),
            ap_gateway: "192.168.1.1".to_string(),
            title: "Temp Buddy Control - IOT".to_string(),
            heading: "Device Info".to_string(),
            sensor_ip: String::new(),
            desired_temp: 70.0,
            temp_padding: 2.0,
            mode: ControlMode::Heat,
            auto_control: false,
            wifi_timeout_ms: 5_000,
        }
    }
}

/// The factory template a fresh or reset device starts from, and the
/// baseline for "has this been customized" checks.
pub fn factory_template() -> ConfigurationRecord {
    ConfigurationRecord::default()
}

/// Per-boot state that is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RuntimeState {
    pub control_on: bool,
    pub last_known_temp: f32,
    /// Set once `last_known_temp` holds a reading (or a seeded value)
    /// rather than the boot default.
    pub has_reading: bool,
}
