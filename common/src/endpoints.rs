pub const ALERTS_ENDPOINT: &str = "/rest/v1/alerts";
pub const DEVICE_READINGS_ENDPOINT: &str = "/rest/v1/device_readings";
pub const DEVICES_ENDPOINT: &str = "/rest/v1/devices";

pub const PORTAL_ROOT: &str = "/";
pub const PORTAL_CONNECT: &str = "/connect";
pub const PORTAL_API_CONFIGURE: &str = "/api/configure";
pub const PORTAL_API_STATUS: &str = "/api/status";

pub const CAPTIVE_PORTAL_PATHS: &[&str] = &[
    "/generate_204",
    "/gen_204",
    "/connecttest.txt",
    "/hotspot-detect.html",
    "/library/test/success.html",
    "/kindle-wifi/wifistub.html",
    "/ncsi.txt",
    "/fwlink",
    "/redirect",
    "/captiveportal",
    "/success.txt",
];

pub fn is_captive_portal_path(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    CAPTIVE_PORTAL_PATHS.contains(&path)
}
