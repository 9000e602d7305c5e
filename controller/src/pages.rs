//! HTML served by the controller's web UI.
//!
//! Pages are plain templates with `${name}` placeholders filled in just
//! before sending. Every value that came from a user is escaped.

use tempbuddy_common::{
    forms::UpdateOutcome, sensor::is_sensor_configured, settings::SettingsStore,
    storage::BlockStore, types::ControlMode,
};

const PAGE_TEMPLATE: &str = concat!(
    "<!DOCTYPE HTML> ",
    "<html lang=\"en\"> ",
    "<head> ",
    "<title>${title}</title> ",
    "${metainsert} ",
    "<style> ",
    "body { background-color: #FFFFFF; color: #000000; } ",
    "h1 { text-align: center; background-color: #5878B0; color: #FFFFFF; border: 3px; border-radius: 15px; } ",
    "h2 { text-align: center; background-color: #58ADB0; color: #FFFFFF; border: 3px; } ",
    "#successful { text-align: center; color: #02CF39; } ",
    "#failed { text-align: center; color: #CF0202; } ",
    "#wrapper { background-color: #E6EFFF; padding: 20px; margin-left: auto; margin-right: auto; max-width: 700px; box-shadow: 3px 3px 3px #333; } ",
    "#info { font-size: 25px; font-weight: bold; line-height: 150%; } ",
    "button { background-color: #5878B0; color: white; font-size: 16px; padding: 10px 24px; border-radius: 12px; border: 2px solid black; } ",
    "</style> ",
    "</head> ",
    "<body> ",
    "<div id=\"wrapper\"> ",
    "<h1>${heading}</h1> ",
    "<div id=\"info\">${content}</div> ",
    "</div> ",
    "</body> ",
    "</html>",
);

const INFO_SECTION: &str = concat!(
    "<p><table>",
    "<tr><td>TempBuddy IP:</td><td>${sensorip}</td></tr>",
    "<tr><td>Last known temp:</td><td>${lastknowntemp}</td></tr>",
    "<tr><td>Control Type:</td><td>${controltype}</td></tr>",
    "<tr><td>Auto Ctrl Enabled:</td><td>${autocontrolenabled}</td></tr>",
    "<tr><td>Controlled Device is:</td><td>${deviceonstatus}</td></tr>",
    "</table></p>",
);

const AUTO_CONTROL_TOGGLE: &str = concat!(
    "<table>",
    "<tr><td>Auto Control:</td></tr>",
    "<tr><td>",
    "<input type=\"radio\" id=\"enabled\" name=\"autocontrol\" value=\"enabled\" ${enabledchecked}>",
    "<label for=\"enabled\">Enabled</label>",
    "</td><td>",
    "<input type=\"radio\" id=\"disabled\" name=\"autocontrol\" value=\"disabled\" ${disabledchecked}>",
    "<label for=\"disabled\">Disabled</label>",
    "</td></tr>",
    "</table>",
);

const MANUAL_CONTROL_BUTTONS: &str = concat!(
    "Manual Controls: ",
    "<button type=\"submit\" formaction=\"/?control=on\">On</button> ",
    "<button type=\"submit\" formaction=\"/?control=off\">Off</button>",
);

const AUTO_SETPOINT_FIELDS: &str = concat!(
    "<table>",
    "<tr><td><label for=\"desiredtemp\">Desired Temp:</label></td>",
    "<td><input type=\"number\" id=\"desiredtemp\" name=\"desiredtemp\" min=\"-100.0\" max=\"100.0\" step=\".1\" value=\"${desiredtemp}\"> (&deg;F)</td></tr>",
    "<tr><td><label for=\"temppadding\">Temp Padding:</label></td>",
    "<td><input type=\"number\" id=\"temppadding\" name=\"temppadding\" min=\"0.0\" max=\"100.0\" step=\".1\" value=\"${temppadding}\"> (&deg;F)</td></tr>",
    "</table>",
);

const ADMIN_FORM: &str = concat!(
    "<form name=\"settings\" method=\"post\" id=\"settings\" action=\"/admin\"> ",
    "<input type=\"hidden\" name=\"source\" value=\"settings\">",
    "<h2>WiFi</h2><table>",
    "<tr><td>Hostname:</td><td><input maxlength=\"63\" type=\"text\" value=\"${hostname}\" name=\"hostname\"></td></tr>",
    "<tr><td>SSID:</td><td><input maxlength=\"32\" type=\"text\" value=\"${ssid}\" name=\"ssid\"></td></tr>",
    "<tr><td>Password:</td><td><input maxlength=\"63\" type=\"text\" value=\"${pwd}\" name=\"pwd\"></td></tr>",
    "</table>",
    "<h2>Application</h2><table>",
    "<tr><td>Title:</td><td><input maxlength=\"50\" type=\"text\" value=\"${title}\" name=\"title\"></td></tr>",
    "<tr><td>Heading:</td><td><input maxlength=\"50\" type=\"text\" value=\"${heading}\" name=\"heading\"></td></tr>",
    "</table>",
    "<h2>Admin</h2><table>",
    "<tr><td>TempBuddy IP:</td><td><input maxlength=\"15\" type=\"text\" value=\"${sensorip}\" name=\"sensorip\"></td></tr>",
    "</table>",
    "${autocontroltoggle}",
    "<table>",
    "<tr><td>Controlling:</td></tr>",
    "<tr><td>",
    "<input type=\"radio\" id=\"heat\" name=\"controltype\" value=\"heat\" ${heatchecked}>",
    "<label for=\"heat\">Heat</label>",
    "</td><td>",
    "<input type=\"radio\" id=\"cool\" name=\"controltype\" value=\"cool\" ${coolchecked}>",
    "<label for=\"cool\">Cool</label>",
    "</td></tr>",
    "</table>",
    "${setpointfields}",
    "<table>",
    "<tr><td>Client Timeout:</td><td><input type=\"number\" value=\"${timeout}\" name=\"timeout\"> (milliseconds)</td></tr>",
    "<tr><td>Admin User:</td><td><input maxlength=\"12\" type=\"text\" value=\"${adminuser}\" name=\"adminuser\"></td></tr>",
    "<tr><td>Admin Password:</td><td><input maxlength=\"12\" type=\"text\" value=\"${adminpwd}\" name=\"adminpwd\"></td></tr>",
    "</table><br> ",
    "<button type=\"submit\">Submit</button> <a href='/'><h4>Home</h4></a>",
    "</form>",
);

const UPDATE_SUCCESSFUL_MSG: &str = "<div id=\"successful\">* Update was Successful!</div>";
const UPDATE_FAILED_MSG: &str = "<div id=\"failed\">* Update Failed!!!</div>";

pub const SETTINGS_HEADING: &str = "Device Settings";

/// A rendered page and the status it should go out with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPage {
    pub status: u16,
    pub body: String,
}

/// Wraps `content` in the shared page chrome. `redirect` adds a meta
/// refresh to the given URL after the given number of seconds.
pub fn render_page(
    status: u16,
    title: &str,
    heading: &str,
    content: &str,
    redirect: Option<(&str, u32)>,
) -> HtmlPage {
    let meta = match redirect {
        Some((url, delay_secs)) => format!(
            "<meta http-equiv=\"refresh\" content=\"{delay_secs}; URL={}\" />",
            escape_html(url)
        ),
        None => String::new(),
    };

    let body = fill(
        PAGE_TEMPLATE,
        &[
            ("title", escape_html(title).as_str()),
            ("heading", escape_html(heading).as_str()),
            ("metainsert", meta.as_str()),
            ("content", content),
        ],
    );
    HtmlPage { status, body }
}

/// Status page, optionally prefixed with the outcome of a form submission.
pub fn status_page<S: BlockStore>(settings: &SettingsStore<S>, outcome: UpdateOutcome) -> HtmlPage {
    let mut content = String::new();
    match outcome {
        UpdateOutcome::Saved => content.push_str(UPDATE_SUCCESSFUL_MSG),
        UpdateOutcome::SaveFailed => content.push_str(UPDATE_FAILED_MSG),
        UpdateOutcome::NoChange => {}
    }

    let sensor_ready = is_sensor_configured(settings.sensor_ip());
    let (sensor_ip, last_known) = if sensor_ready {
        let last_known = if settings.has_reading() {
            format!("{:.1}&deg;F", settings.last_known_temp())
        } else {
            "N/A".to_string()
        };
        (escape_html(settings.sensor_ip()), last_known)
    } else {
        ("Not Set".to_string(), "N/A".to_string())
    };

    content.push_str(&fill(
        INFO_SECTION,
        &[
            ("sensorip", sensor_ip.as_str()),
            ("lastknowntemp", last_known.as_str()),
            ("controltype", settings.mode().label()),
            ("autocontrolenabled", if settings.is_auto_control() { "True" } else { "False" }),
            ("deviceonstatus", if settings.is_control_on() { "ON" } else { "OFF" }),
        ],
    ));

    content.push_str("<br><hr><br>");
    if settings.is_auto_control() {
        content.push_str(&auto_controls_section(settings));
    } else {
        content.push_str(&manual_controls_section(sensor_ready));
    }

    render_page(200, settings.title(), settings.heading(), &content, None)
}

/// Manual section. The auto-control toggle only shows once a sensor is
/// configured, since auto-control has nothing to act on without one.
fn manual_controls_section(sensor_ready: bool) -> String {
    let mut section = String::from(
        "<form name=\"manualControls\" method=\"post\" id=\"manualControls\" action=\"/\"> \
         <input type=\"hidden\" name=\"source\" value=\"manualcontrols\">",
    );
    if sensor_ready {
        section.push_str(&auto_control_toggle(false));
        section.push_str("<br><button type=\"submit\">Update</button><br><br>");
    }
    section.push_str(MANUAL_CONTROL_BUTTONS);
    section.push_str("</form>");
    section
}

fn auto_controls_section<S: BlockStore>(settings: &SettingsStore<S>) -> String {
    let mut section = String::from(
        "<h2>Auto Controls</h2>\
         <form name=\"autoControls\" method=\"post\" id=\"autoControls\" action=\"/\"> \
         <input type=\"hidden\" name=\"source\" value=\"autocontrols\">",
    );
    section.push_str(&auto_control_toggle(true));
    section.push_str("<br>");
    section.push_str(setpoint_fields(settings).as_str());
    section.push_str("<br><button type=\"submit\">Update</button></form>");
    section
}

pub fn admin_page<S: BlockStore>(settings: &SettingsStore<S>) -> HtmlPage {
    let mode_is_heat = settings.mode() == ControlMode::Heat;
    let content = fill(
        ADMIN_FORM,
        &[
            ("hostname", escape_html(settings.hostname()).as_str()),
            ("ssid", escape_html(settings.ssid()).as_str()),
            ("pwd", escape_html(settings.pwd()).as_str()),
            ("title", escape_html(settings.title()).as_str()),
            ("heading", escape_html(settings.heading()).as_str()),
            ("sensorip", escape_html(settings.sensor_ip()).as_str()),
            ("autocontroltoggle", auto_control_toggle(settings.is_auto_control()).as_str()),
            ("heatchecked", checked(mode_is_heat)),
            ("coolchecked", checked(!mode_is_heat)),
            ("setpointfields", setpoint_fields(settings).as_str()),
            ("timeout", settings.wifi_timeout_ms().to_string().as_str()),
            ("adminuser", escape_html(settings.admin_user()).as_str()),
            ("adminpwd", escape_html(settings.admin_pwd()).as_str()),
        ],
    );
    render_page(200, settings.title(), SETTINGS_HEADING, &content, None)
}

pub fn admin_saved_page(title: &str, reboot_required: bool) -> HtmlPage {
    if reboot_required {
        render_page(
            200,
            title,
            SETTINGS_HEADING,
            "<div id=\"successful\">Settings update Successful!</div><h4>Device will reboot now...</h4>",
            None,
        )
    } else {
        render_page(
            200,
            title,
            SETTINGS_HEADING,
            "<div id=\"successful\">Settings update Successful!</div><a href='/'><h4>Home</h4></a>",
            Some(("/", 5)),
        )
    }
}

pub fn admin_failed_page() -> HtmlPage {
    render_page(
        500,
        "500 - Server Error",
        "Server Error!",
        "<div id=\"failed\">Error Saving Settings!!!</div>",
        Some(("/", 5)),
    )
}

pub fn not_found_page() -> HtmlPage {
    render_page(
        404,
        "404 Not Found",
        "OOPS! You broke it!!!",
        "Just kidding...<br>But seriously what you were looking for doesn't exist.",
        None,
    )
}

fn auto_control_toggle(enabled: bool) -> String {
    fill(
        AUTO_CONTROL_TOGGLE,
        &[
            ("enabledchecked", checked(enabled)),
            ("disabledchecked", checked(!enabled)),
        ],
    )
}

fn setpoint_fields<S: BlockStore>(settings: &SettingsStore<S>) -> String {
    fill(
        AUTO_SETPOINT_FIELDS,
        &[
            ("desiredtemp", format!("{:.1}", settings.desired_temp()).as_str()),
            ("temppadding", format!("{:.1}", settings.temp_padding()).as_str()),
        ],
    )
}

fn checked(on: bool) -> &'static str {
    if on {
        "checked"
    } else {
        ""
    }
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |page, (name, value)| {
        page.replace(&format!("${{{name}}}"), value)
    })
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '$' => escaped.push_str("&#36;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
