use core::convert::TryInto;
use std::{
    io::BufRead,
    net::{Ipv4Addr, UdpSocket},
    sync::{mpsc, Arc, Mutex, OnceLock, PoisonError},
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use embedded_svc::{
    http::{client::Client as HttpClient, Method, Status},
    io::{Read, Write},
    wifi::{AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{
    adc::{
        attenuation::DB_11,
        oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
        ADC1,
    },
    gpio::{AnyOutputPin, Gpio34, Output, OutputPin, PinDriver},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver},
    prelude::*,
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    http::server::{Configuration as HttpConfiguration, EspHttpServer},
    log::EspLogger,
    nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault},
    wifi::{BlockingWifi, EspWifi},
};
use log::{debug, error, info, warn};
use serde::Serialize;

use smartgas_common::{
    annunciator::ALARM_TONE_HZ,
    apply_configuration, dns, Annunciator, Backend, BackendConfig, Clock, ConfigStore,
    ConfigureRequest, ConfigureResponse, ConnectivityError, Detector, DetectorConfig,
    DeviceIdentity, DeviceRecord, IndicatorAction, IndicatorSink, Io, OperatingMode,
    SampleSource, StatusSnapshot, StoreError, TransportError, WifiCredentials, WifiLink,
    config::{DEVICE_NAMESPACE, WIFI_NAMESPACE},
    PORTAL_API_CONFIGURE, PORTAL_API_STATUS, PORTAL_CONNECT, PORTAL_ROOT,
};

use crate::portal;

const NVS_KEY_SSID: &str = "ssid";
const NVS_KEY_PASSWORD: &str = "password";
const NVS_KEY_EMAIL: &str = "email";
const NVS_KEY_MOBILE: &str = "mobile";
const NVS_KEY_UUID: &str = "uuid";
const NVS_KEY_DEVICE_ID: &str = "device_id";
const NVS_VALUE_BYTES: usize = 256;
const MAX_HTTP_BODY: usize = 4096;
const WATCHDOG_TIMEOUT_SEC: u32 = 30;
const WATCHDOG_FEED_MS: u64 = 1_000;
const DNS_PORT: u16 = 53;
const DNS_PACKET_BYTES: usize = 512;
const CONSOLE_POLL_MS: u64 = 100;
const DEFAULT_BACKEND_URL: &str = "https://your-project-ref.supabase.co";

const JSON_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "application/json; charset=utf-8"),
    ("Access-Control-Allow-Origin", "*"),
];
const HTML_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "text/html; charset=utf-8"),
    ("Access-Control-Allow-Origin", "*"),
];

type HttpRequest<'a, 'b> =
    esp_idf_svc::http::server::Request<&'a mut esp_idf_svc::http::server::EspHttpConnection<'b>>;

#[derive(Clone)]
struct NvsStore {
    partition: EspDefaultNvsPartition,
    lock: Arc<Mutex<()>>,
}

// ADC1, pin 34, 11 dB attenuation.
struct AdcSensor {
    channel: AdcChannelDriver<'static, Gpio34, AdcDriver<'static, ADC1>>,
    last_raw: f32,
}

struct Indicators {
    status_led: PinDriver<'static, AnyOutputPin, Output>,
    alert_led: PinDriver<'static, AnyOutputPin, Output>,
    buzzer: LedcDriver<'static>,
    status_lit: bool,
}

struct StationLink {
    wifi: EspWifi<'static>,
    sys_loop: EspSystemEventLoop,
}

struct EspBackend {
    config: BackendConfig,
    timeout_ms: u64,
}

struct EspClock;

#[derive(Clone)]
struct PortalContext {
    store: NvsStore,
    status: Arc<Mutex<StatusSnapshot>>,
    configure_restart_delay_ms: u64,
    form_restart_delay_ms: u64,
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut store = NvsStore {
        partition: nvs_partition.clone(),
        lock: Arc::new(Mutex::new(())),
    };

    let peripherals = Peripherals::take()?;
    let mut sensor = AdcSensor::new(peripherals.adc1, peripherals.pins.gpio34)
        .context("failed to initialize gas sensor ADC")?;
    let buzzer_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default().frequency(ALARM_TONE_HZ.Hz()),
    )?;
    let mut indicators = Indicators::new(
        peripherals.pins.gpio2.downgrade_output(),
        peripherals.pins.gpio4.downgrade_output(),
        LedcDriver::new(peripherals.ledc.channel0, buzzer_timer, peripherals.pins.gpio25)?,
    )?;

    let mut link = StationLink {
        wifi: EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    };

    let config = DetectorConfig::default();
    let mut backend = EspBackend {
        config: backend_config(),
        timeout_ms: config.http_timeout_ms,
    };
    let mut clock = EspClock;

    init_watchdog(WATCHDOG_TIMEOUT_SEC)?;
    add_current_task_to_watchdog()?;

    let identity = DeviceIdentity::load_or_create(&mut store, random_bytes)
        .context("failed to load device identity")?;
    info!("SmartGas detector {identity}");

    let console = spawn_console_reader();
    let portal_store = store.clone();
    let mut detector = Detector::new(config, identity);
    let mut io = Io {
        sensor: &mut sensor,
        link: &mut link,
        backend: &mut backend,
        clock: &mut clock,
        store: &mut store,
        indicators: &mut indicators,
    };

    let report = match detector.boot(&mut io) {
        Ok(report) => report,
        Err(err) => {
            error!("{err}; halting in fault blink");
            let blinks = detector.config().hotspot_error_blinks;
            loop {
                io.run_actions(Annunciator::error_blink(blinks));
            }
        }
    };

    if report.mode == OperatingMode::Operational {
        disable_wifi_power_save();
        let tick_ms = detector.config().tick_interval_ms;
        loop {
            drain_console(&mut detector, &mut io, &console);
            detector.tick(&mut io);
            io.clock.sleep_ms(tick_ms);
        }
    }

    let status = Arc::new(Mutex::new(detector.status()));
    let server = create_provisioning_http_server(PortalContext {
        store: portal_store,
        status: status.clone(),
        configure_restart_delay_ms: detector.config().configure_restart_delay_ms,
        form_restart_delay_ms: detector.config().form_restart_delay_ms,
    })?;

    if detector.config().dns_redirect {
        let ap_addr = detector
            .access_point()
            .map(|ap| ap.address)
            .unwrap_or(Ipv4Addr::new(192, 168, 4, 1));
        spawn_dns_redirect(ap_addr);
    }

    // Keep the portal alive for the program lifetime.
    let _server = server;
    loop {
        drain_console(&mut detector, &mut io, &console);
        detector.provisioning_heartbeat(&mut io);
        *status.lock().unwrap_or_else(PoisonError::into_inner) = detector.status();
    }
}

fn backend_config() -> BackendConfig {
    BackendConfig {
        base_url: option_env!("SMARTGAS_BACKEND_URL")
            .unwrap_or(DEFAULT_BACKEND_URL)
            .to_string(),
        api_key: option_env!("SMARTGAS_API_KEY").unwrap_or_default().to_string(),
    }
}

fn create_provisioning_http_server(
    context: PortalContext,
) -> anyhow::Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        stack_size: 16 * 1024,
        uri_match_wildcard: true,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    {
        let context = context.clone();
        server.fn_handler::<anyhow::Error, _>(PORTAL_ROOT, Method::Get, move |req| {
            let device_id = context.snapshot().device_id;
            write_html(req, 200, &portal::render_setup_page(&device_id))
        })?;
    }

    {
        let context = context.clone();
        server.fn_handler::<anyhow::Error, _>(PORTAL_CONNECT, Method::Post, move |mut req| {
            let body = read_request_body(&mut req)?;
            let request = ConfigureRequest::from_form(&String::from_utf8_lossy(&body));
            let mut store = context.store.clone();

            match apply_configuration(&mut store, request) {
                Ok(credentials) => {
                    schedule_restart(context.form_restart_delay_ms);
                    write_html(req, 200, &portal::render_saved_page(&credentials.ssid))
                }
                Err(err) => write_html(
                    req,
                    err.http_status(),
                    &portal::render_error_page(&err.to_string()),
                ),
            }
        })?;
    }

    {
        let context = context.clone();
        server.fn_handler::<anyhow::Error, _>(PORTAL_API_CONFIGURE, Method::Post, move |mut req| {
            let body = read_request_body(&mut req)?;
            let request = serde_json::from_slice::<ConfigureRequest>(&body).unwrap_or_else(|err| {
                warn!("malformed configure payload: {err}");
                ConfigureRequest::default()
            });
            let mut store = context.store.clone();

            match apply_configuration(&mut store, request) {
                Ok(_) => {
                    schedule_restart(context.configure_restart_delay_ms);
                    write_json(req, 200, &ConfigureResponse::success())
                }
                Err(err) => write_json(req, err.http_status(), &ConfigureResponse::error(&err)),
            }
        })?;
    }

    server.fn_handler::<anyhow::Error, _>(PORTAL_API_CONFIGURE, Method::Options, |req| {
        req.into_response(
            204,
            None,
            &[
                ("Access-Control-Allow-Origin", "*"),
                ("Access-Control-Allow-Methods", "POST, GET, OPTIONS"),
                ("Access-Control-Allow-Headers", "Content-Type"),
            ],
        )?;
        Ok(())
    })?;

    {
        let context = context.clone();
        server.fn_handler::<anyhow::Error, _>(PORTAL_API_STATUS, Method::Get, move |req| {
            write_json(req, 200, &context.snapshot())
        })?;
    }

    // Captive checks and everything else land on the setup page.
    server.fn_handler::<anyhow::Error, _>("/*", Method::Get, |req| {
        req.into_response(
            302,
            Some("Found"),
            &[("Location", PORTAL_ROOT), ("Access-Control-Allow-Origin", "*")],
        )?;
        Ok(())
    })?;

    info!("provisioning portal ready");
    Ok(server)
}

impl PortalContext {
    fn snapshot(&self) -> StatusSnapshot {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn read_request_body(req: &mut HttpRequest<'_, '_>) -> anyhow::Result<Vec<u8>> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_HTTP_BODY {
        return Err(anyhow!("request body too large"));
    }

    let mut body = vec![0_u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(body)
}

fn write_json<T: Serialize>(req: HttpRequest<'_, '_>, status: u16, payload: &T) -> anyhow::Result<()> {
    let body = serde_json::to_vec(payload)?;
    req.into_response(status, None, JSON_HEADERS)?
        .write_all(&body)?;
    Ok(())
}

fn write_html(req: HttpRequest<'_, '_>, status: u16, page: &str) -> anyhow::Result<()> {
    req.into_response(status, None, HTML_HEADERS)?
        .write_all(page.as_bytes())?;
    Ok(())
}

fn schedule_restart(delay_ms: u64) {
    let spawned = thread::Builder::new()
        .name("prov-restart".into())
        .spawn(move || {
            thread::sleep(Duration::from_millis(delay_ms));
            restart();
        });
    if let Err(err) = spawned {
        warn!("failed to spawn restart thread, restarting now: {err}");
        restart();
    }
}

fn restart() -> ! {
    info!("restarting");
    unsafe { esp_idf_svc::sys::esp_restart() }
}

fn spawn_dns_redirect(ap_addr: Ipv4Addr) {
    let spawned = thread::Builder::new()
        .name("dns-redirect".into())
        .stack_size(6 * 1024)
        .spawn(move || {
            let socket = match UdpSocket::bind(("0.0.0.0", DNS_PORT)) {
                Ok(socket) => socket,
                Err(err) => {
                    warn!("dns redirect unavailable: {err}");
                    return;
                }
            };
            info!("dns redirect answering with {ap_addr}");

            let mut buffer = [0_u8; DNS_PACKET_BYTES];
            loop {
                let (len, peer) = match socket.recv_from(&mut buffer) {
                    Ok(received) => received,
                    Err(err) => {
                        warn!("dns receive failed: {err}");
                        continue;
                    }
                };
                if let Some(reply) = dns::redirect_response(&buffer[..len], ap_addr) {
                    if let Err(err) = socket.send_to(&reply, peer) {
                        warn!("dns reply to {peer} failed: {err}");
                    }
                }
            }
        });
    if let Err(err) = spawned {
        warn!("failed to spawn dns redirect thread: {err}");
    }
}

fn spawn_console_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("console".into())
        .stack_size(4 * 1024)
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => thread::sleep(Duration::from_millis(CONSOLE_POLL_MS)),
                    Ok(_) => {
                        if tx.send(line.clone()).is_err() {
                            return;
                        }
                    }
                }
            }
        });
    if let Err(err) = spawned {
        warn!("serial console unavailable: {err}");
    }
    rx
}

fn drain_console(detector: &mut Detector, io: &mut Io<'_>, console: &mpsc::Receiver<String>) {
    for line in console.try_iter() {
        let reply = detector.handle_line(&line, io);
        for out in &reply.lines {
            println!("{out}");
        }
        if let Some(delay_ms) = reply.restart_after_ms {
            io.clock.sleep_ms(delay_ms);
            restart();
        }
    }
}

impl NvsStore {
    fn open(&self, namespace: &str) -> Result<EspNvs<NvsDefault>, StoreError> {
        EspNvs::new(self.partition.clone(), namespace, true)
            .map_err(|err| StoreError::Backend(format!("open `{namespace}`: {err}")))
    }
}

fn nvs_get(nvs: &EspNvs<NvsDefault>, key: &str) -> Result<String, StoreError> {
    let mut buffer = [0_u8; NVS_VALUE_BYTES];
    nvs.get_str(key, &mut buffer)
        .map(|value| value.unwrap_or_default().to_string())
        .map_err(|err| StoreError::Backend(format!("read `{key}`: {err}")))
}

fn nvs_set(nvs: &mut EspNvs<NvsDefault>, key: &str, value: &str) -> Result<(), StoreError> {
    nvs.set_str(key, value)
        .map_err(|err| StoreError::Backend(format!("write `{key}`: {err}")))
}

impl ConfigStore for NvsStore {
    fn load_wifi(&mut self) -> Result<WifiCredentials, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let nvs = self.open(WIFI_NAMESPACE)?;
        Ok(WifiCredentials {
            ssid: nvs_get(&nvs, NVS_KEY_SSID)?,
            password: nvs_get(&nvs, NVS_KEY_PASSWORD)?,
            email: nvs_get(&nvs, NVS_KEY_EMAIL)?,
            mobile: nvs_get(&nvs, NVS_KEY_MOBILE)?,
        })
    }

    fn save_wifi(&mut self, credentials: &WifiCredentials) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut nvs = self.open(WIFI_NAMESPACE)?;
        nvs_set(&mut nvs, NVS_KEY_SSID, &credentials.ssid)?;
        nvs_set(&mut nvs, NVS_KEY_PASSWORD, &credentials.password)?;
        nvs_set(&mut nvs, NVS_KEY_EMAIL, &credentials.email)?;
        nvs_set(&mut nvs, NVS_KEY_MOBILE, &credentials.mobile)
    }

    fn load_device(&mut self) -> Result<DeviceRecord, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let nvs = self.open(DEVICE_NAMESPACE)?;
        Ok(DeviceRecord {
            uuid: nvs_get(&nvs, NVS_KEY_UUID)?,
            device_id: nvs_get(&nvs, NVS_KEY_DEVICE_ID)?,
        })
    }

    fn save_device(&mut self, record: &DeviceRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut nvs = self.open(DEVICE_NAMESPACE)?;
        nvs_set(&mut nvs, NVS_KEY_UUID, &record.uuid)?;
        nvs_set(&mut nvs, NVS_KEY_DEVICE_ID, &record.device_id)
    }
}

impl AdcSensor {
    fn new(adc: ADC1, pin: Gpio34) -> anyhow::Result<Self> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let channel = AdcChannelDriver::new(AdcDriver::new(adc)?, pin, &config)?;
        Ok(Self {
            channel,
            last_raw: 0.0,
        })
    }
}

impl SampleSource for AdcSensor {
    fn read_raw(&mut self) -> f32 {
        match self.channel.read_raw() {
            Ok(raw) => self.last_raw = f32::from(raw),
            Err(err) => warn!("adc read failed, repeating last sample: {err}"),
        }
        self.last_raw
    }
}

impl Indicators {
    fn new(
        status_pin: AnyOutputPin,
        alert_pin: AnyOutputPin,
        buzzer: LedcDriver<'static>,
    ) -> anyhow::Result<Self> {
        let mut status_led = PinDriver::output(status_pin)?;
        let mut alert_led = PinDriver::output(alert_pin)?;
        status_led.set_low()?;
        alert_led.set_low()?;
        let mut indicators = Self {
            status_led,
            alert_led,
            buzzer,
            status_lit: false,
        };
        indicators.set_buzzer(false);
        Ok(indicators)
    }

    fn set_status(&mut self, on: bool) {
        let result = if on {
            self.status_led.set_high()
        } else {
            self.status_led.set_low()
        };
        match result {
            Ok(()) => self.status_lit = on,
            Err(err) => warn!("failed to drive status LED: {err}"),
        }
    }

    fn set_alert(&mut self, on: bool) {
        let result = if on {
            self.alert_led.set_high()
        } else {
            self.alert_led.set_low()
        };
        if let Err(err) = result {
            warn!("failed to drive alert LED: {err}");
        }
    }

    fn set_buzzer(&mut self, on: bool) {
        let duty = if on { self.buzzer.get_max_duty() / 2 } else { 0 };
        if let Err(err) = self.buzzer.set_duty(duty) {
            warn!("failed to drive buzzer: {err}");
        }
    }
}

impl IndicatorSink for Indicators {
    fn apply(&mut self, action: IndicatorAction) {
        match action {
            IndicatorAction::StatusLed(on) => self.set_status(on),
            IndicatorAction::ToggleStatusLed => self.set_status(!self.status_lit),
            IndicatorAction::AlertLed(on) => self.set_alert(on),
            // The LEDC timer runs at a fixed frequency, so every tone sounds the same.
            IndicatorAction::Buzzer(on) => self.set_buzzer(on),
            IndicatorAction::Tone(_) => self.set_buzzer(true),
            IndicatorAction::Silence => self.set_buzzer(false),
            IndicatorAction::Delay(_) => {}
        }
    }
}

impl WifiLink for StationLink {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), ConnectivityError> {
        let configuration = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidCredentials("wifi ssid too long".into()))?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| {
                    ConnectivityError::InvalidCredentials("wifi password too long".into())
                })?,
            auth_method: AuthMethod::WPAWPA2Personal,
            ..Default::default()
        });

        let radio = |err: esp_idf_svc::sys::EspError| ConnectivityError::Radio(err.to_string());
        self.wifi.set_configuration(&configuration).map_err(radio)?;
        if !self.wifi.is_started().map_err(radio)? {
            self.wifi.start().map_err(radio)?;
        }
        info!("wifi started, connecting to `{}`", credentials.ssid);
        self.wifi.connect().map_err(radio)
    }

    fn is_connected(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        let access_point =
            |err: esp_idf_svc::sys::EspError| ConnectivityError::AccessPoint(err.to_string());
        let configuration = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| ConnectivityError::AccessPoint("ssid too long".into()))?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::AccessPoint("password too long".into()))?,
            auth_method: AuthMethod::WPA2Personal,
            channel: 1,
            ..Default::default()
        });

        let mut wifi =
            BlockingWifi::wrap(&mut self.wifi, self.sys_loop.clone()).map_err(access_point)?;
        let _ = wifi.disconnect();
        let _ = wifi.stop();
        wifi.set_configuration(&configuration).map_err(access_point)?;
        wifi.start().map_err(access_point)?;
        wifi.wait_netif_up().map_err(access_point)?;

        let ip = self
            .wifi
            .ap_netif()
            .get_ip_info()
            .map_err(access_point)?
            .ip;
        info!("provisioning AP `{ssid}` up at {ip}");
        Ok(ip)
    }
}

impl Backend for EspBackend {
    fn post_json(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError> {
        let url = self.config.url(path);
        let http_conf = HttpClientConfiguration {
            timeout: Some(Duration::from_millis(self.timeout_ms)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let request_error =
            |err: esp_idf_svc::io::EspIOError| TransportError::Request(format!("{err:?}"));

        let connection = EspHttpConnection::new(&http_conf)
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let mut client = HttpClient::wrap(connection);

        let authorization = format!("Bearer {}", self.config.api_key);
        let content_length = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("apikey", self.config.api_key.as_str()),
            ("Authorization", authorization.as_str()),
            ("Content-Length", content_length.as_str()),
        ];

        let mut request = client.post(&url, &headers).map_err(request_error)?;
        request.write_all(body).map_err(request_error)?;
        request.flush().map_err(request_error)?;
        let response = request.submit().map_err(request_error)?;

        let status = response.status();
        debug!("POST {url} -> {status}");
        Ok(status)
    }
}

impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        monotonic_ms()
    }

    // Feeds the task watchdog between slices.
    fn sleep_ms(&mut self, ms: u64) {
        let mut remaining = ms;
        loop {
            feed_watchdog();
            let slice = remaining.min(WATCHDOG_FEED_MS);
            if slice == 0 {
                return;
            }
            thread::sleep(Duration::from_millis(slice));
            remaining -= slice;
        }
    }
}

fn random_bytes() -> [u8; 16] {
    let mut bytes = [0_u8; 16];
    unsafe { esp_idf_svc::sys::esp_fill_random(bytes.as_mut_ptr().cast(), bytes.len() as _) };
    bytes
}

fn init_watchdog(timeout_sec: u32) -> anyhow::Result<()> {
    let config = esp_idf_svc::sys::esp_task_wdt_config_t {
        timeout_ms: timeout_sec.saturating_mul(1000),
        idle_core_mask: 0,
        trigger_panic: true,
    };
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_init failed with code {}", rc))
}

fn add_current_task_to_watchdog() -> anyhow::Result<()> {
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_add failed with code {}", rc))
}

fn feed_watchdog() {
    let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
}

fn disable_wifi_power_save() {
    let rc = unsafe { esp_idf_svc::sys::esp_wifi_set_ps(0) };
    if rc == esp_idf_svc::sys::ESP_OK {
        info!("wifi power save disabled");
    } else {
        warn!("failed to disable wifi power save: esp_err_t={rc}");
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
