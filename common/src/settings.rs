//! The device settings context.
//!
//! [`SettingsStore`] owns the persisted [`ConfigurationRecord`] and the
//! per-boot [`RuntimeState`]. Setters only touch memory; nothing reaches
//! the backing store until [`SettingsStore::save`] runs, and every save
//! writes the whole block with a freshly computed tag.

use std::sync::OnceLock;

use log::{info, warn};

use crate::{
    config::{
        factory_template, ConfigurationRecord, RuntimeState, ADMIN_PWD_MAX_LEN,
        ADMIN_USER_MAX_LEN, HEADING_MAX_LEN, HOSTNAME_MAX_LEN, IPV4_MAX_LEN, MAX_DESIRED_TEMP_F,
        MAX_TEMP_PADDING_F, MIN_DESIRED_TEMP_F, MIN_TEMP_PADDING_F, PASSWORD_MAX_LEN,
        SSID_MAX_LEN, TITLE_MAX_LEN,
    },
    record::{self, IntegrityTag},
    storage::{BlockStore, StoreError},
    text::{parse_ipv4, valid_dot_notation_ip},
    types::{ControlMode, NetworkMode},
};

fn template_tag() -> &'static IntegrityTag {
    static TAG: OnceLock<IntegrityTag> = OnceLock::new();
    TAG.get_or_init(|| record::compute_tag(&factory_template()))
}

#[derive(Debug)]
pub struct SettingsStore<S> {
    store: S,
    record: ConfigurationRecord,
    runtime: RuntimeState,
    dirty: bool,
}

impl<S: BlockStore> SettingsStore<S> {
    /// Starts from the factory template without touching `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            record: factory_template(),
            runtime: RuntimeState::default(),
            dirty: false,
        }
    }

    /// Reads the persisted block and trusts it only if it decodes cleanly.
    ///
    /// `Ok(true)` means a valid prior record is now in memory. `Ok(false)`
    /// means the region was blank or untrustworthy and has been replaced by
    /// the factory defaults. `Err` is reserved for the store itself failing.
    pub fn load(&mut self) -> Result<bool, StoreError> {
        let Some(block) = self.store.read()? else {
            info!("no stored settings found; persisting factory defaults");
            self.factory_default()?;
            return Ok(false);
        };

        match record::decode(&block) {
            Ok(record) => {
                info!("loaded settings record ({} bytes)", block.len());
                self.record = record;
                self.dirty = false;
                Ok(true)
            }
            Err(err) => {
                warn!("stored settings rejected ({err}); wiping and restoring factory defaults");
                if let Err(wipe_err) = self.store.wipe() {
                    warn!("failed to wipe settings store: {wipe_err}");
                }
                self.factory_default()?;
                Ok(false)
            }
        }
    }

    /// Writes the current record as one block. On failure the in-memory
    /// values stay as they are so a later retry can succeed.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let block = record::encode(&self.record);
        match self.store.write(&block) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                warn!("failed to persist settings: {err}");
                Err(err)
            }
        }
    }

    pub fn factory_default(&mut self) -> Result<(), StoreError> {
        info!("restoring factory default settings");
        self.record = factory_template();
        self.dirty = true;
        self.save()
    }

    pub fn is_factory_default(&self) -> bool {
        self.integrity_tag() == *template_tag()
    }

    /// Station SSID and password have both been changed from the template.
    pub fn is_network_set(&self) -> bool {
        let template = factory_template();
        self.record.ssid != template.ssid && self.record.pwd != template.pwd
    }

    pub fn network_mode(&self) -> NetworkMode {
        if self.is_network_set() {
            NetworkMode::Station {
                hostname: self.record.hostname.clone(),
                ssid: self.record.ssid.clone(),
            }
        } else {
            NetworkMode::AccessPoint {
                ssid: self.record.ap_ssid.clone(),
                ip: self.record.ap_net_ip.clone(),
                subnet: self.record.ap_subnet.clone(),
                gateway: self.record.ap_gateway.clone(),
            }
        }
    }

    /// Tag of the record as it stands in memory.
    pub fn integrity_tag(&self) -> IntegrityTag {
        record::compute_tag(&self.record)
    }

    /// True when a setter changed something that has not been saved yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn record(&self) -> &ConfigurationRecord {
        &self.record
    }

    pub fn runtime(&self) -> RuntimeState {
        self.runtime
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn hostname(&self) -> &str {
        &self.record.hostname
    }

    pub fn ssid(&self) -> &str {
        &self.record.ssid
    }

    pub fn pwd(&self) -> &str {
        &self.record.pwd
    }

    pub fn admin_user(&self) -> &str {
        &self.record.admin_user
    }

    pub fn admin_pwd(&self) -> &str {
        &self.record.admin_pwd
    }

    pub fn ap_ssid(&self) -> &str {
        &self.record.ap_ssid
    }

    pub fn ap_pwd(&self) -> &str {
        &self.record.ap_pwd
    }

    pub fn ap_net_ip(&self) -> &str {
        &self.record.ap_net_ip
    }

    pub fn ap_subnet(&self) -> &str {
        &self.record.ap_subnet
    }

    pub fn ap_gateway(&self) -> &str {
        &self.record.ap_gateway
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn heading(&self) -> &str {
        &self.record.heading
    }

    pub fn sensor_ip(&self) -> &str {
        &self.record.sensor_ip
    }

    pub fn desired_temp(&self) -> f32 {
        self.record.desired_temp
    }

    pub fn temp_padding(&self) -> f32 {
        self.record.temp_padding
    }

    pub fn mode(&self) -> ControlMode {
        self.record.mode
    }

    pub fn is_auto_control(&self) -> bool {
        self.record.auto_control
    }

    pub fn wifi_timeout_ms(&self) -> u32 {
        self.record.wifi_timeout_ms
    }

    pub fn is_control_on(&self) -> bool {
        self.runtime.control_on
    }

    pub fn last_known_temp(&self) -> f32 {
        self.runtime.last_known_temp
    }

    pub fn has_reading(&self) -> bool {
        self.runtime.has_reading
    }

    pub fn set_hostname(&mut self, value: &str) -> bool {
        let accepted = !value.is_empty() && value.len() <= HOSTNAME_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.hostname)
    }

    pub fn set_ssid(&mut self, value: &str) -> bool {
        let accepted = value.len() <= SSID_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.ssid)
    }

    pub fn set_pwd(&mut self, value: &str) -> bool {
        let accepted = value.len() <= PASSWORD_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.pwd)
    }

    pub fn set_admin_user(&mut self, value: &str) -> bool {
        let accepted = !value.is_empty() && value.len() <= ADMIN_USER_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.admin_user)
    }

    pub fn set_admin_pwd(&mut self, value: &str) -> bool {
        let accepted = !value.is_empty() && value.len() <= ADMIN_PWD_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.admin_pwd)
    }

    pub fn set_ap_ssid(&mut self, value: &str) -> bool {
        let accepted = !value.is_empty() && value.len() <= SSID_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.ap_ssid)
    }

    /// An empty password leaves the access point open.
    pub fn set_ap_pwd(&mut self, value: &str) -> bool {
        let accepted = value.len() <= PASSWORD_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.ap_pwd)
    }

    pub fn set_ap_net_ip(&mut self, value: &str) -> bool {
        let accepted = value.len() <= IPV4_MAX_LEN && parse_ipv4(value).is_some();
        self.apply_text(accepted, value, |record| &mut record.ap_net_ip)
    }

    pub fn set_ap_subnet(&mut self, value: &str) -> bool {
        let accepted = value.len() <= IPV4_MAX_LEN && parse_ipv4(value).is_some();
        self.apply_text(accepted, value, |record| &mut record.ap_subnet)
    }

    pub fn set_ap_gateway(&mut self, value: &str) -> bool {
        let accepted = value.len() <= IPV4_MAX_LEN && parse_ipv4(value).is_some();
        self.apply_text(accepted, value, |record| &mut record.ap_gateway)
    }

    pub fn set_title(&mut self, value: &str) -> bool {
        let accepted = value.len() <= TITLE_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.title)
    }

    pub fn set_heading(&mut self, value: &str) -> bool {
        let accepted = value.len() <= HEADING_MAX_LEN;
        self.apply_text(accepted, value, |record| &mut record.heading)
    }

    /// Empty clears the sensor; anything else must pass
    /// [`valid_dot_notation_ip`].
    pub fn set_sensor_ip(&mut self, value: &str) -> bool {
        let accepted =
            value.is_empty() || (value.len() <= IPV4_MAX_LEN && valid_dot_notation_ip(value));
        self.apply_text(accepted, value, |record| &mut record.sensor_ip)
    }

    pub fn set_desired_temp(&mut self, value: f32) -> bool {
        if !value.is_finite() || !(MIN_DESIRED_TEMP_F..=MAX_DESIRED_TEMP_F).contains(&value) {
            return false;
        }
        if self.record.desired_temp != value {
            self.record.desired_temp = value;
            self.dirty = true;
        }
        true
    }

    pub fn set_temp_padding(&mut self, value: f32) -> bool {
        if !value.is_finite() || !(MIN_TEMP_PADDING_F..=MAX_TEMP_PADDING_F).contains(&value) {
            return false;
        }
        if self.record.temp_padding != value {
            self.record.temp_padding = value;
            self.dirty = true;
        }
        true
    }

    pub fn set_mode(&mut self, mode: ControlMode) -> bool {
        if self.record.mode != mode {
            self.record.mode = mode;
            self.dirty = true;
        }
        true
    }

    pub fn set_auto_control(&mut self, enabled: bool) -> bool {
        if self.record.auto_control != enabled {
            self.record.auto_control = enabled;
            self.dirty = true;
        }
        true
    }

    pub fn set_wifi_timeout_ms(&mut self, value: u32) -> bool {
        if value == 0 {
            return false;
        }
        if self.record.wifi_timeout_ms != value {
            self.record.wifi_timeout_ms = value;
            self.dirty = true;
        }
        true
    }

    pub fn set_control_on(&mut self, on: bool) {
        self.runtime.control_on = on;
    }

    pub fn set_last_known_temp(&mut self, temp_f: f32) -> bool {
        if !temp_f.is_finite() {
            return false;
        }
        self.runtime.last_known_temp = temp_f;
        self.runtime.has_reading = true;
        true
    }

    fn apply_text(
        &mut self,
        accepted: bool,
        value: &str,
        field: impl FnOnce(&mut ConfigurationRecord) -> &mut String,
    ) -> bool {
        if !accepted {
            return false;
        }
        let slot = field(&mut self.record);
        if slot.as_str() != value {
            *slot = value.to_string();
            self.dirty = true;
        }
        true
    }
}
