use crate::{
    config::{ConfigurationRecord, RuntimeState},
    sensor::is_sensor_configured,
    settings::SettingsStore,
    storage::BlockStore,
    types::{ControlMode, OutletAction},
};

/// Auto-control decision for the latest reading.
///
/// `None` while auto-control is off, no sensor is configured, nothing has
/// been read since boot, or the reading sits inside the padding band. Heat mode switches off above the
/// setpoint and on below `setpoint - padding`; cool mode mirrors that.
pub fn decide_control(record: &ConfigurationRecord, runtime: &RuntimeState) -> Option<bool> {
    if !record.auto_control || !is_sensor_configured(&record.sensor_ip) || !runtime.has_reading {
        return None;
    }

    let temp = runtime.last_known_temp;
    let setpoint = record.desired_temp;
    let padding = record.temp_padding;

    match record.mode {
        ControlMode::Heat => {
            if temp > setpoint {
                Some(false)
            } else if temp < setpoint - padding {
                Some(true)
            } else {
                None
            }
        }
        ControlMode::Cool => {
            if temp < setpoint {
                Some(false)
            } else if temp > setpoint + padding {
                Some(true)
            } else {
                None
            }
        }
    }
}

/// Tracks the physical outlet and reconciles it with the requested state.
#[derive(Debug, Clone, Default)]
pub struct ControlEngine {
    outlet_on: bool,
}

impl ControlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_outlet_on(&self) -> bool {
        self.outlet_on
    }

    /// Runs one decide-and-actuate step. Returns the action to drive the
    /// outlet with, or `None` when it already matches.
    pub fn tick<S: BlockStore>(&mut self, settings: &mut SettingsStore<S>) -> Option<OutletAction> {
        if let Some(on) = decide_control(settings.record(), &settings.runtime()) {
            settings.set_control_on(on);
        }

        let requested = settings.is_control_on();
        if requested == self.outlet_on {
            return None;
        }
        self.outlet_on = requested;
        Some(OutletAction::from_state(requested))
    }
}
