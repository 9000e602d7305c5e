//! The single owner of the device settings.
//!
//! Web handlers never touch [`SettingsStore`] directly. They send a
//! [`ControlRequest`] and wait on its reply channel; the control task
//! serves requests between its once-a-second control ticks. Sensor polls
//! run as detached tasks and report back through the same channel.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use tempbuddy_common::{
    forms::{apply_admin_settings, apply_root_form},
    sensor::{is_sensor_configured, SENSOR_INFO_PATH},
    text::valid_dot_notation_ip,
    AdminOutcome, BlockStore, ControlEngine, ControllerStatus, FormFields, OutletAction,
    PollThrottle, SettingsStore,
};

use crate::pages::{self, HtmlPage};

pub const REQUEST_QUEUE_DEPTH: usize = 16;

/// Requests into the control task.
#[derive(Debug)]
pub enum ControlRequest {
    /// JSON snapshot for `/api/status`.
    Status { reply: oneshot::Sender<ControllerStatus> },

    /// Status page submission; replies with the rendered page.
    RootForm {
        form: FormFields,
        reply: oneshot::Sender<HtmlPage>,
    },

    /// Admin page request. `credentials` come from the Basic auth header.
    Admin {
        credentials: Option<(String, String)>,
        form: FormFields,
        reply: oneshot::Sender<AdminReply>,
    },

    /// Result of a sensor poll.
    SensorReading { temp_f: f32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminReply {
    Unauthorized,
    Page {
        page: HtmlPage,
        reboot_required: bool,
    },
}

/// Where and how long to poll the remote sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorPoll {
    pub url: String,
    pub timeout: Duration,
}

pub struct ControlContext<S> {
    settings: SettingsStore<S>,
    engine: ControlEngine,
    throttle: PollThrottle,
    polled_ip: String,
    sensor_port: u16,
    last_reading_epoch: Option<i64>,
}

impl<S: BlockStore> ControlContext<S> {
    pub fn new(settings: SettingsStore<S>, sensor_port: u16) -> Self {
        Self {
            settings,
            engine: ControlEngine::new(),
            throttle: PollThrottle::default(),
            polled_ip: String::new(),
            sensor_port,
            last_reading_epoch: None,
        }
    }

    #[cfg(test)]
    fn settings(&self) -> &SettingsStore<S> {
        &self.settings
    }

    pub fn handle(&mut self, request: ControlRequest) {
        match request {
            ControlRequest::Status { reply } => {
                let _ = reply.send(self.status());
            }
            ControlRequest::RootForm { form, reply } => {
                let outcome = apply_root_form(&mut self.settings, &form);
                let _ = reply.send(pages::status_page(&self.settings, outcome));
            }
            ControlRequest::Admin {
                credentials,
                form,
                reply,
            } => {
                let _ = reply.send(self.admin(credentials, &form));
            }
            ControlRequest::SensorReading { temp_f } => self.record_reading(temp_f),
        }
    }

    pub fn status(&self) -> ControllerStatus {
        let settings = &self.settings;
        let sensor_configured = is_sensor_configured(settings.sensor_ip());

        ControllerStatus {
            title: settings.title().to_string(),
            heading: settings.heading().to_string(),
            sensor_ip: settings.sensor_ip().to_string(),
            sensor_configured,
            last_known_temp: (sensor_configured && settings.has_reading())
                .then(|| settings.last_known_temp()),
            last_reading_epoch: self.last_reading_epoch,
            desired_temp: settings.desired_temp(),
            temp_padding: settings.temp_padding(),
            mode: settings.mode().as_str(),
            auto_control: settings.is_auto_control(),
            control_on: settings.is_control_on(),
            network_mode: settings.network_mode().as_str(),
            factory_default: settings.is_factory_default(),
        }
    }

    fn admin(&mut self, credentials: Option<(String, String)>, form: &FormFields) -> AdminReply {
        let authorized = credentials.is_some_and(|(user, pwd)| {
            user == self.settings.admin_user() && pwd == self.settings.admin_pwd()
        });
        if !authorized {
            debug!("admin request not authenticated");
            return AdminReply::Unauthorized;
        }

        if !form.value("source").eq_ignore_ascii_case("settings") {
            return AdminReply::Page {
                page: pages::admin_page(&self.settings),
                reboot_required: false,
            };
        }

        match apply_admin_settings(&mut self.settings, form) {
            AdminOutcome::Saved { reboot_required } => {
                info!("admin settings saved (reboot required: {reboot_required})");
                AdminReply::Page {
                    page: pages::admin_saved_page(self.settings.title(), reboot_required),
                    reboot_required,
                }
            }
            AdminOutcome::SaveFailed => {
                warn!("admin settings could not be saved");
                AdminReply::Page {
                    page: pages::admin_failed_page(),
                    reboot_required: false,
                }
            }
        }
    }

    pub fn record_reading(&mut self, temp_f: f32) {
        if self.settings.set_last_known_temp(temp_f) {
            debug!("sensor reading {temp_f:.1}F");
            self.last_reading_epoch = Some(Utc::now().timestamp());
        } else {
            warn!("discarding non-finite sensor reading");
        }
    }

    /// Returns the poll to start now, if the sensor is configured and the
    /// throttle allows one. A changed sensor address polls right away.
    pub fn due_poll(&mut self, now_ms: u64) -> Option<SensorPoll> {
        let sensor_ip = self.settings.sensor_ip();
        if sensor_ip != self.polled_ip {
            self.throttle.reset();
            self.polled_ip = sensor_ip.to_string();
        }

        if !is_sensor_configured(sensor_ip) || !self.throttle.poll_due(now_ms) {
            return None;
        }

        match sensor_url(sensor_ip, self.sensor_port) {
            Some(url) => Some(SensorPoll {
                url,
                timeout: Duration::from_millis(u64::from(self.settings.wifi_timeout_ms())),
            }),
            None => {
                warn!("configured sensor address '{sensor_ip}' is not a valid ip");
                None
            }
        }
    }

    /// Runs the control engine once; returns the outlet action, if any.
    pub fn run_engine(&mut self) -> Option<OutletAction> {
        self.engine.tick(&mut self.settings)
    }
}

pub fn sensor_url(sensor_ip: &str, port: u16) -> Option<String> {
    if !valid_dot_notation_ip(sensor_ip) {
        return None;
    }
    Some(format!("http://{sensor_ip}:{port}{SENSOR_INFO_PATH}"))
}

/// Serves requests and runs the control tick until every handler-side
/// sender is gone. Poll tasks report through `readings`, which does not
/// keep the channel open.
pub async fn run_control_task<S, F>(
    mut context: ControlContext<S>,
    mut requests: mpsc::Receiver<ControlRequest>,
    readings: mpsc::WeakSender<ControlRequest>,
    mut start_poll: F,
    mut now_ms: impl FnMut() -> u64,
) where
    S: BlockStore,
    F: FnMut(SensorPoll, mpsc::Sender<ControlRequest>),
{
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(request) => context.handle(request),
                None => break,
            },
            _ = interval.tick() => {
                if let Some(poll) = context.due_poll(now_ms()) {
                    if let Some(sender) = readings.upgrade() {
                        start_poll(poll, sender);
                    }
                }
                if let Some(action) = context.run_engine() {
                    execute_outlet_action(action);
                }
            }
        }
    }

    info!("control task stopped");
}

fn execute_outlet_action(action: OutletAction) {
    // The relay driver hooks in here on hardware builds.
    info!("outlet action: {action:?}");
}
