//! Web form handling for the status and admin pages.
//!
//! Request bodies and query strings are parsed with the text helpers and
//! applied to the settings through their validating setters.

use crate::{
    config::{MAX_DESIRED_TEMP_F, MAX_TEMP_PADDING_F, MIN_DESIRED_TEMP_F, MIN_TEMP_PADDING_F},
    settings::SettingsStore,
    storage::BlockStore,
    text::{decode_url_string, parse_float, parse_int, split_into},
    types::ControlMode,
};

/// Pairs beyond this many are dropped.
pub const MAX_FORM_FIELDS: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: Vec<(String, String)>,
}

impl FormFields {
    /// Parses `a=1&b=2` style input. Keys are lower-cased; values are
    /// url-decoded.
    pub fn parse(raw: &str) -> Self {
        let mut pairs = [""; MAX_FORM_FIELDS];
        let count = split_into(raw, '&', &mut pairs);

        let fields = pairs[..count]
            .iter()
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (
                    decode_url_string(key).to_ascii_lowercase(),
                    decode_url_string(value),
                )
            })
            .collect();

        Self { fields }
    }

    /// Appends `other` after the existing fields; earlier keys win on lookup.
    pub fn extend(&mut self, other: FormFields) {
        self.fields.extend(other.fields);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Value for `key`, or `""` when absent.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn source_is(&self, source: &str) -> bool {
        self.value("source").eq_ignore_ascii_case(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    NoChange,
    Saved,
    SaveFailed,
}

impl UpdateOutcome {
    fn from_save(saved: bool) -> Self {
        if saved {
            Self::Saved
        } else {
            Self::SaveFailed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Saved { reboot_required: bool },
    SaveFailed,
}

/// Handles a submission to the status page, routed by its `source` field.
pub fn apply_root_form<S: BlockStore>(
    settings: &mut SettingsStore<S>,
    form: &FormFields,
) -> UpdateOutcome {
    if form.source_is("manualcontrols") && !settings.is_auto_control() {
        apply_manual_controls(settings, form)
    } else if form.source_is("autocontrols") && settings.is_auto_control() {
        apply_auto_controls(settings, form)
    } else {
        UpdateOutcome::NoChange
    }
}

/// Manual section: may turn auto-control on (saved right away) and, while
/// it stays off, switches the outlet request.
pub fn apply_manual_controls<S: BlockStore>(
    settings: &mut SettingsStore<S>,
    form: &FormFields,
) -> UpdateOutcome {
    let mut outcome = UpdateOutcome::NoChange;

    let auto_control = form.value("autocontrol");
    if !auto_control.is_empty() {
        settings.set_auto_control(auto_control.eq_ignore_ascii_case("enabled"));
        outcome = UpdateOutcome::from_save(settings.save().is_ok());
    }

    if !settings.is_auto_control() {
        let control = form.value("control");
        if control.eq_ignore_ascii_case("on") {
            settings.set_control_on(true);
        } else if control.eq_ignore_ascii_case("off") {
            settings.set_control_on(false);
        }
    }

    outcome
}

/// Auto section: toggles auto-control and updates the setpoint and padding
/// together. Saves once if anything was submitted.
pub fn apply_auto_controls<S: BlockStore>(
    settings: &mut SettingsStore<S>,
    form: &FormFields,
) -> UpdateOutcome {
    let mut was_update = false;

    let auto_control = form.value("autocontrol");
    if !auto_control.is_empty() {
        settings.set_auto_control(auto_control.eq_ignore_ascii_case("enabled"));
        was_update = true;
    }

    let desired = parse_float(form.value("desiredtemp"));
    let padding = parse_float(form.value("temppadding"));
    if let (Some(desired), Some(padding)) = (desired, padding) {
        settings.set_desired_temp(desired);
        settings.set_temp_padding(padding);
        was_update = true;
    }

    if !was_update {
        return UpdateOutcome::NoChange;
    }
    UpdateOutcome::from_save(settings.save().is_ok())
}

/// Applies the admin settings form and saves.
///
/// A changed station SSID or password needs a reboot to take effect. The
/// first time a sensor address is set, the last known temperature is
/// seeded with the setpoint so nothing switches before the first reading.
pub fn apply_admin_settings<S: BlockStore>(
    settings: &mut SettingsStore<S>,
    form: &FormFields,
) -> AdminOutcome {
    let mut reboot_required = false;

    let ssid = form.value("ssid");
    if !ssid.is_empty() && ssid != settings.ssid() && settings.set_ssid(ssid) {
        reboot_required = true;
    }
    let pwd = form.value("pwd");
    if !pwd.is_empty() && pwd != settings.pwd() && settings.set_pwd(pwd) {
        reboot_required = true;
    }

    let hostname = form.value("hostname");
    if !hostname.is_empty() {
        settings.set_hostname(hostname);
    }
    let title = form.value("title");
    if !title.is_empty() {
        settings.set_title(title);
    }
    let heading = form.value("heading");
    if !heading.is_empty() {
        settings.set_heading(heading);
    }

    match form.value("autocontrol") {
        "enabled" => {
            settings.set_auto_control(true);
        }
        "disabled" => {
            settings.set_auto_control(false);
        }
        _ => {}
    }
    if let Some(mode) = ControlMode::from_form(form.value("controltype")) {
        settings.set_mode(mode);
    }

    if let Some(desired) = parse_float(form.value("desiredtemp"))
        .filter(|value| (MIN_DESIRED_TEMP_F..=MAX_DESIRED_TEMP_F).contains(value))
    {
        settings.set_desired_temp(desired);
    }

    if let Some(sensor_ip) = form.get("sensorip") {
        let first_sensor = !sensor_ip.is_empty() && settings.sensor_ip().is_empty();
        if settings.set_sensor_ip(sensor_ip) && first_sensor {
            let desired = settings.desired_temp();
            settings.set_last_known_temp(desired);
        }
    }

    if let Some(padding) = parse_float(form.value("temppadding"))
        .filter(|value| (MIN_TEMP_PADDING_F..=MAX_TEMP_PADDING_F).contains(value))
    {
        settings.set_temp_padding(padding);
    }

    if let Some(timeout) = parse_int(form.value("timeout")).and_then(|ms| u32::try_from(ms).ok()) {
        settings.set_wifi_timeout_ms(timeout);
    }

    let admin_user = form.value("adminuser");
    if !admin_user.is_empty() {
        settings.set_admin_user(admin_user);
    }
    let admin_pwd = form.value("adminpwd");
    if !admin_pwd.is_empty() {
        settings.set_admin_pwd(admin_pwd);
    }

    match settings.save() {
        Ok(()) => AdminOutcome::Saved { reboot_required },
        Err(_) => AdminOutcome::SaveFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn settings() -> SettingsStore<MemoryStore> {
        let mut settings = SettingsStore::new(MemoryStore::new());
        settings.load().expect("load");
        settings
    }

    #[test]
    fn parses_and_decodes_pairs() {
        let form = FormFields::parse("source=settings&Title=Green+House%21&empty=&flag&&pwd=a%2Bb");

        assert_eq!(form.get("source"), Some("settings"));
        assert_eq!(form.get("title"), Some("Green House!"));
        assert_eq!(form.get("empty"), Some(""));
        assert_eq!(form.get("flag"), Some(""));
        assert_eq!(form.value("pwd"), "a+b");
        assert_eq!(form.get("missing"), None);
        assert_eq!(form.value("missing"), "");
    }

    #[test]
    fn field_budget_is_bounded() {
        let raw: Vec<String> = (0..40).map(|index| format!("k{index}={index}")).collect();
        let form = FormFields::parse(&raw.join("&"));

        assert_eq!(form.get("k23"), Some("23"));
        assert_eq!(form.get("k24"), None);
    }

    #[test]
    fn extend_keeps_first_value() {
        let mut form = FormFields::parse("control=on");
        form.extend(FormFields::parse("control=off&source=manualcontrols"));

        assert_eq!(form.value("control"), "on");
        assert_eq!(form.value("source"), "manualcontrols");
    }

    #[test]
    fn manual_controls_switch_outlet() {
        let mut settings = settings();
        let form = FormFields::parse("source=manualcontrols&control=on");

        assert_eq!(apply_root_form(&mut settings, &form), UpdateOutcome::NoChange);
        assert!(settings.is_control_on());

        let form = FormFields::parse("source=MANUALCONTROLS&control=OFF");
        apply_root_form(&mut settings, &form);
        assert!(!settings.is_control_on());
    }

    #[test]
    fn manual_form_can_enable_auto_control() {
        let mut settings = settings();
        let writes = settings.store().write_count();
        let form = FormFields::parse("source=manualcontrols&autocontrol=enabled&control=on");

        assert_eq!(apply_root_form(&mut settings, &form), UpdateOutcome::Saved);
        assert!(settings.is_auto_control());
        assert!(!settings.is_control_on());
        assert_eq!(settings.store().write_count(), writes + 1);
    }

    #[test]
    fn manual_form_ignored_while_auto() {
        let mut settings = settings();
        settings.set_auto_control(true);
        let form = FormFields::parse("source=manualcontrols&control=on");

        assert_eq!(apply_root_form(&mut settings, &form), UpdateOutcome::NoChange);
        assert!(!settings.is_control_on());
    }

    #[test]
    fn auto_controls_update_setpoint_pair() {
        let mut settings = settings();
        settings.set_auto_control(true);
        let form = FormFields::parse("source=autocontrols&autocontrol=enabled&desiredtemp=66.5&temppadding=1.5");

        assert_eq!(apply_root_form(&mut settings, &form), UpdateOutcome::Saved);
        assert_eq!(settings.desired_temp(), 66.5);
        assert_eq!(settings.temp_padding(), 1.5);
    }

    #[test]
    fn auto_controls_need_both_values() {
        let mut settings = settings();
        settings.set_auto_control(true);
        let form = FormFields::parse("source=autocontrols&desiredtemp=66.5");

        assert_eq!(apply_root_form(&mut settings, &form), UpdateOutcome::NoChange);
        assert_eq!(settings.desired_temp(), 70.0);
    }

    #[test]
    fn auto_controls_report_save_failure() {
        let mut settings = settings();
        settings.set_auto_control(true);
        settings.store_mut().set_fail_writes(true);
        let form = FormFields::parse("source=autocontrols&autocontrol=disabled");

        assert_eq!(apply_root_form(&mut settings, &form), UpdateOutcome::SaveFailed);
        assert!(!settings.is_auto_control());
    }

    #[test]
    fn admin_network_change_requires_reboot() {
        let mut settings = settings();
        let form = FormFields::parse("source=settings&ssid=HomeNet&pwd=correct+horse&sensorip=");

        assert_eq!(
            apply_admin_settings(&mut settings, &form),
            AdminOutcome::Saved {
                reboot_required: true
            }
        );
        assert_eq!(settings.ssid(), "HomeNet");
        assert_eq!(settings.pwd(), "correct horse");
        assert!(settings.is_network_set());
    }

    #[test]
    fn admin_same_credentials_do_not_reboot() {
        let mut settings = settings();
        let form = FormFields::parse("ssid=SET_ME&pwd=SET_ME&title=Garage&controltype=cool");

        assert_eq!(
            apply_admin_settings(&mut settings, &form),
            AdminOutcome::Saved {
                reboot_required: false
            }
        );
        assert_eq!(settings.title(), "Garage");
        assert_eq!(settings.mode(), ControlMode::Cool);
    }

    #[test]
    fn admin_range_checks_leave_fields_unchanged() {
        let mut settings = settings();
        let form = FormFields::parse(
            "desiredtemp=150&temppadding=-1&adminuser=much-too-long-name&adminpwd=secret&timeout=abc",
        );

        apply_admin_settings(&mut settings, &form);

        assert_eq!(settings.desired_temp(), 70.0);
        assert_eq!(settings.temp_padding(), 2.0);
        assert_eq!(settings.admin_user(), "admin");
        assert_eq!(settings.admin_pwd(), "secret");
        assert_eq!(settings.wifi_timeout_ms(), 5_000);
    }

    #[test]
    fn first_sensor_seeds_last_known_temp() {
        let mut settings = settings();
        let form = FormFields::parse("sensorip=192.168.1.40&desiredtemp=65");

        apply_admin_settings(&mut settings, &form);

        assert_eq!(settings.sensor_ip(), "192.168.1.40");
        assert_eq!(settings.last_known_temp(), 65.0);

        settings.set_last_known_temp(61.0);
        apply_admin_settings(&mut settings, &FormFields::parse("sensorip=192.168.1.41"));
        assert_eq!(settings.last_known_temp(), 61.0);
    }

    #[test]
    fn invalid_sensor_ip_is_ignored() {
        let mut settings = settings();
        apply_admin_settings(&mut settings, &FormFields::parse("sensorip=192.168.1.40"));
        apply_admin_settings(&mut settings, &FormFields::parse("sensorip=999.1.1.1"));

        assert_eq!(settings.sensor_ip(), "192.168.1.40");
    }

    #[test]
    fn admin_save_failure_reported() {
        let mut settings = settings();
        settings.store_mut().set_fail_writes(true);

        assert_eq!(
            apply_admin_settings(&mut settings, &FormFields::parse("title=Garage")),
            AdminOutcome::SaveFailed
        );
        assert_eq!(settings.title(), "Garage");
    }
}
