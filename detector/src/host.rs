use std::{
    io::{BufRead, ErrorKind},
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc, Mutex, OnceLock, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    net::{TcpListener, UdpSocket},
    sync::watch,
};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use smartgas_common::{
    apply_configuration,
    config::{DEVICE_NAMESPACE, WIFI_NAMESPACE}, dns, Annunciator, Backend, BackendConfig, Clock, ConfigError,
    ConfigStore, ConfigureRequest, ConfigureResponse, ConnectivityError, Detector,
    DetectorConfig, DeviceIdentity, DeviceRecord, IndicatorAction, IndicatorSink, Io,
    OperatingMode, SampleSource, StatusSnapshot, StoreError, TransportError, WifiCredentials,
    WifiLink, CAPTIVE_PORTAL_PATHS, PORTAL_API_CONFIGURE, PORTAL_API_STATUS, PORTAL_CONNECT,
    PORTAL_ROOT,
};

use crate::portal;

const DNS_PACKET_BYTES: usize = 512;

#[derive(Debug, Clone)]
struct HostSettings {
    data_dir: PathBuf,
    backend: BackendConfig,
    portal_port: u16,
    dns_port: u16,
    sim_baseline: f32,
    sim_jitter: f32,
    sim_wifi_available: bool,
    detector: DetectorConfig,
}

impl HostSettings {
    fn from_env() -> Self {
        let mut backend = BackendConfig::default();
        if let Ok(url) = std::env::var("SMARTGAS_BACKEND_URL") {
            backend.base_url = url;
        }
        if let Ok(key) = std::env::var("SMARTGAS_API_KEY") {
            backend.api_key = key;
        }

        let mut detector = DetectorConfig::default();
        detector.dns_redirect = env_parse("SMARTGAS_DNS_REDIRECT", detector.dns_redirect);
        detector.tick_interval_ms = env_parse("SMARTGAS_TICK_MS", detector.tick_interval_ms);
        detector.calibration.min_baseline = std::env::var("SMARTGAS_MIN_BASELINE")
            .ok()
            .and_then(|value| value.parse::<f32>().ok());
        detector.sanitize();

        Self {
            data_dir: std::env::var("SMARTGAS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./.smartgas")),
            backend,
            portal_port: env_parse("SMARTGAS_PORTAL_PORT", 8080),
            dns_port: env_parse("SMARTGAS_DNS_PORT", 5353),
            sim_baseline: env_parse("SMARTGAS_SIM_BASELINE", 80.0),
            sim_jitter: env_parse("SMARTGAS_SIM_JITTER", 4.0),
            sim_wifi_available: env_parse("SMARTGAS_SIM_WIFI", true),
            detector,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

struct SessionControl {
    restart: AtomicBool,
    shutdown: AtomicBool,
    stop: watch::Sender<bool>,
}

impl SessionControl {
    fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            restart: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            stop,
        }
    }

    fn begin_session(&self) {
        self.restart.store(false, Ordering::SeqCst);
        self.stop.send_replace(self.is_shutdown());
    }

    fn request_restart(&self) {
        self.restart.store(true, Ordering::SeqCst);
        self.stop.send_replace(true);
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.stop.send_replace(true);
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn should_stop(&self) -> bool {
        self.restart.load(Ordering::SeqCst) || self.is_shutdown()
    }

    async fn stopped(&self) {
        let mut stop = self.stop.subscribe();
        let _ = stop.wait_for(|stop| *stop).await;
    }
}

type Console = Arc<Mutex<mpsc::Receiver<String>>>;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = HostSettings::from_env();
    let control = Arc::new(SessionControl::new());
    let console = spawn_console_reader();

    {
        let control = control.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                control.request_shutdown();
            }
        });
    }

    loop {
        control.begin_session();
        run_session(&settings, control.clone(), console.clone()).await?;
        if control.is_shutdown() {
            return Ok(());
        }
        info!("restarting detector");
    }
}

async fn run_session(
    settings: &HostSettings,
    control: Arc<SessionControl>,
    console: Console,
) -> anyhow::Result<()> {
    let (mut detector, mut devices, boot) = {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let mut devices = HostDevices::new(&settings);
            let identity = DeviceIdentity::load_or_create(&mut devices.store, rand::random)
                .context("failed to load device identity")?;
            let mut detector = Detector::new(settings.detector.clone(), identity);
            let boot = detector.boot(&mut devices.io());
            Ok((detector, devices, boot))
        })
        .await
        .context("boot task panicked")??
    };

    let report = match boot {
        Ok(report) => report,
        Err(err) => {
            warn!("access point failed to start: {err}");
            let blinks = detector.config().hotspot_error_blinks;
            tokio::task::spawn_blocking(move || {
                while !control.should_stop() {
                    devices.io().run_actions(Annunciator::error_blink(blinks));
                }
            })
            .await
            .context("fault loop panicked")?;
            return Ok(());
        }
    };

    match report.mode {
        OperatingMode::Operational => tokio::task::spawn_blocking(move || {
            operational_loop(&mut detector, &mut devices, &console, &control)
        })
        .await
        .context("operational loop panicked"),
        OperatingMode::Provisioning => {
            provisioning_session(settings, detector, devices, console, control).await
        }
    }
}

fn operational_loop(
    detector: &mut Detector,
    devices: &mut HostDevices,
    console: &Console,
    control: &SessionControl,
) {
    let tick_ms = detector.config().tick_interval_ms;
    while !control.should_stop() {
        let mut io = devices.io();
        drain_console(detector, &mut io, console, control);
        if control.should_stop() {
            break;
        }
        detector.tick(&mut io);
        io.clock.sleep_ms(tick_ms);
    }
}

async fn provisioning_session(
    settings: &HostSettings,
    mut detector: Detector,
    mut devices: HostDevices,
    console: Console,
    control: Arc<SessionControl>,
) -> anyhow::Result<()> {
    let status = Arc::new(Mutex::new(detector.status()));
    let state = PortalState {
        store: devices.store.clone(),
        status: status.clone(),
        control: control.clone(),
        configure_restart_delay_ms: detector.config().configure_restart_delay_ms,
        form_restart_delay_ms: detector.config().form_restart_delay_ms,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.portal_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind provisioning portal at {addr}"))?;
    info!("provisioning portal listening on http://{addr}");

    let server = {
        let control = control.clone();
        tokio::spawn(async move {
            axum::serve(listener, portal_router(state))
                .with_graceful_shutdown(async move { control.stopped().await })
                .await
        })
    };

    if detector.config().dns_redirect {
        let ap_addr = detector
            .access_point()
            .map(|ap| ap.address)
            .unwrap_or(Ipv4Addr::LOCALHOST);
        let dns_port = settings.dns_port;
        let control = control.clone();
        tokio::spawn(async move {
            if let Err(err) = run_dns_redirect(dns_port, ap_addr, &control).await {
                warn!("dns redirect unavailable: {err:#}");
            }
        });
    }

    tokio::task::spawn_blocking(move || {
        while !control.should_stop() {
            let mut io = devices.io();
            drain_console(&mut detector, &mut io, &console, &control);
            detector.provisioning_heartbeat(&mut io);
            *status.lock().unwrap_or_else(PoisonError::into_inner) = detector.status();
        }
    })
    .await
    .context("provisioning loop panicked")?;

    server
        .await
        .context("portal task panicked")?
        .context("portal server failed")
}

async fn run_dns_redirect(
    port: u16,
    ap_addr: Ipv4Addr,
    control: &SessionControl,
) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind dns responder on port {port}"))?;
    info!("dns redirect answering with {ap_addr} on udp port {port}");

    let mut buffer = [0_u8; DNS_PACKET_BYTES];
    loop {
        tokio::select! {
            _ = control.stopped() => return Ok(()),
            received = socket.recv_from(&mut buffer) => {
                let (len, peer) = match received {
                    Ok(received) => received,
                    Err(err) => {
                        warn!("dns receive failed: {err}");
                        continue;
                    }
                };
                if let Some(reply) = dns::redirect_response(&buffer[..len], ap_addr) {
                    if let Err(err) = socket.send_to(&reply, peer).await {
                        warn!("dns reply to {peer} failed: {err}");
                    }
                }
            }
        }
    }
}

fn spawn_console_reader() -> Console {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("console read failed: {err}");
                        break;
                    }
                }
            }
        });
    if let Err(err) = spawned {
        warn!("console reader unavailable: {err}");
    }
    Arc::new(Mutex::new(rx))
}

fn drain_console(
    detector: &mut Detector,
    io: &mut Io<'_>,
    console: &Console,
    control: &SessionControl,
) {
    let lines: Vec<String> = console
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .try_iter()
        .collect();

    for line in lines {
        let reply = detector.handle_line(&line, io);
        for out in &reply.lines {
            println!("{out}");
        }
        if let Some(delay_ms) = reply.restart_after_ms {
            io.clock.sleep_ms(delay_ms);
            control.request_restart();
            return;
        }
    }
}

#[derive(Clone)]
struct PortalState {
    store: FileStore,
    status: Arc<Mutex<StatusSnapshot>>,
    control: Arc<SessionControl>,
    configure_restart_delay_ms: u64,
    form_restart_delay_ms: u64,
}

impl PortalState {
    fn snapshot(&self) -> StatusSnapshot {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn schedule_restart(&self, delay_ms: u64) {
        let control = self.control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            info!("configuration saved, restarting");
            control.request_restart();
        });
    }

    async fn save(&self, request: ConfigureRequest) -> Result<WifiCredentials, ConfigError> {
        let mut store = self.store.clone();
        tokio::task::spawn_blocking(move || apply_configuration(&mut store, request))
            .await
            .unwrap_or_else(|err| Err(StoreError::Backend(err.to_string()).into()))
    }
}

fn portal_router(state: PortalState) -> Router {
    let mut router = Router::new()
        .route(PORTAL_ROOT, get(handle_setup_page))
        .route(PORTAL_CONNECT, post(handle_connect_form))
        .route(
            PORTAL_API_CONFIGURE,
            post(handle_configure).options(handle_preflight),
        )
        .route(PORTAL_API_STATUS, get(handle_status));

    for path in CAPTIVE_PORTAL_PATHS {
        router = router.route(path, get(redirect_to_setup));
    }

    router
        .fallback(redirect_to_setup)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_setup_page(State(state): State<PortalState>) -> Html<String> {
    Html(portal::render_setup_page(&state.snapshot().device_id))
}

async fn handle_connect_form(State(state): State<PortalState>, body: String) -> Response {
    match state.save(ConfigureRequest::from_form(&body)).await {
        Ok(credentials) => {
            state.schedule_restart(state.form_restart_delay_ms);
            Html(portal::render_saved_page(&credentials.ssid)).into_response()
        }
        Err(err) => (
            config_error_status(&err),
            Html(portal::render_error_page(&err.to_string())),
        )
            .into_response(),
    }
}

async fn handle_configure(State(state): State<PortalState>, body: Bytes) -> Response {
    let request = serde_json::from_slice::<ConfigureRequest>(&body).unwrap_or_else(|err| {
        warn!("malformed configure payload: {err}");
        ConfigureRequest::default()
    });

    match state.save(request).await {
        Ok(_) => {
            state.schedule_restart(state.configure_restart_delay_ms);
            Json(ConfigureResponse::success()).into_response()
        }
        Err(err) => (config_error_status(&err), Json(ConfigureResponse::error(&err))).into_response(),
    }
}

async fn handle_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, GET, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

async fn handle_status(State(state): State<PortalState>) -> Json<StatusSnapshot> {
    Json(state.snapshot())
}

async fn redirect_to_setup() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, PORTAL_ROOT)])
}

fn config_error_status(err: &ConfigError) -> StatusCode {
    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

struct HostDevices {
    sensor: SimulatedSensor,
    link: SimulatedLink,
    backend: UreqBackend,
    clock: StdClock,
    store: FileStore,
    indicators: LogIndicators,
}

impl HostDevices {
    fn new(settings: &HostSettings) -> Self {
        Self {
            sensor: SimulatedSensor::new(settings.sim_baseline, settings.sim_jitter),
            link: SimulatedLink::new(settings.sim_wifi_available),
            backend: UreqBackend::new(
                settings.backend.clone(),
                settings.detector.http_timeout_ms,
            ),
            clock: StdClock,
            store: FileStore::new(&settings.data_dir),
            indicators: LogIndicators::default(),
        }
    }

    fn io(&mut self) -> Io<'_> {
        Io {
            sensor: &mut self.sensor,
            link: &mut self.link,
            backend: &mut self.backend,
            clock: &mut self.clock,
            store: &mut self.store,
            indicators: &mut self.indicators,
        }
    }
}

#[derive(Clone)]
struct FileStore {
    wifi_path: Arc<PathBuf>,
    device_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    fn new(data_dir: &Path) -> Self {
        Self {
            wifi_path: Arc::new(data_dir.join(format!("{WIFI_NAMESPACE}.json"))),
            device_path: Arc::new(data_dir.join(format!("{DEVICE_NAMESPACE}.json"))),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn load<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::read(path) {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|err| StoreError::Malformed(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(StoreError::Backend(format!("{}: {err}", path.display()))),
        }
    }

    fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| StoreError::Backend(format!("{}: {err}", parent.display())))?;
        }
        let payload =
            serde_json::to_vec_pretty(value).map_err(|err| StoreError::Malformed(err.to_string()))?;
        std::fs::write(path, payload)
            .map_err(|err| StoreError::Backend(format!("{}: {err}", path.display())))
    }
}

impl ConfigStore for FileStore {
    fn load_wifi(&mut self) -> Result<WifiCredentials, StoreError> {
        self.load(&self.wifi_path)
    }

    fn save_wifi(&mut self, credentials: &WifiCredentials) -> Result<(), StoreError> {
        self.save(&self.wifi_path, credentials)
    }

    fn load_device(&mut self) -> Result<DeviceRecord, StoreError> {
        self.load(&self.device_path)
    }

    fn save_device(&mut self, record: &DeviceRecord) -> Result<(), StoreError> {
        self.save(&self.device_path, record)
    }
}

struct SimulatedSensor {
    baseline: f32,
    jitter: f32,
    rng: StdRng,
}

impl SimulatedSensor {
    fn new(baseline: f32, jitter: f32) -> Self {
        Self {
            baseline,
            jitter: jitter.abs(),
            rng: StdRng::from_entropy(),
        }
    }
}

impl SampleSource for SimulatedSensor {
    fn read_raw(&mut self) -> f32 {
        if self.jitter == 0.0 {
            return self.baseline;
        }
        self.baseline + self.rng.gen_range(-self.jitter..=self.jitter)
    }
}

struct SimulatedLink {
    available: bool,
    connected: bool,
}

impl SimulatedLink {
    fn new(available: bool) -> Self {
        Self {
            available,
            connected: false,
        }
    }
}

impl WifiLink for SimulatedLink {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), ConnectivityError> {
        if !credentials.is_complete() {
            return Err(ConnectivityError::InvalidCredentials(
                "ssid and password are required".into(),
            ));
        }
        debug!("simulated association with `{}`", credentials.ssid);
        self.connected = self.available;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        _password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        self.connected = false;
        info!("simulated access point `{ssid}` up");
        Ok(Ipv4Addr::LOCALHOST)
    }
}

struct UreqBackend {
    agent: ureq::Agent,
    config: BackendConfig,
}

impl UreqBackend {
    fn new(config: BackendConfig, timeout_ms: u64) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_millis(timeout_ms))
                .build(),
            config,
        }
    }
}

impl Backend for UreqBackend {
    fn post_json(&mut self, path: &str, body: &[u8]) -> Result<u16, TransportError> {
        let url = self.config.url(path);
        debug!("POST {url} ({} bytes)", body.len());
        let result = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("apikey", &self.config.api_key)
            .set("Authorization", &format!("Bearer {}", self.config.api_key))
            .send_bytes(body);

        match result {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Request(err.to_string())),
        }
    }
}

struct StdClock;

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        monotonic_ms()
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

#[derive(Default)]
struct LogIndicators {
    status_lit: bool,
    alert_lit: bool,
    buzzer_on: bool,
    tone_hz: Option<u32>,
}

impl IndicatorSink for LogIndicators {
    fn apply(&mut self, action: IndicatorAction) {
        match action {
            IndicatorAction::StatusLed(on) => self.status_lit = on,
            IndicatorAction::ToggleStatusLed => {
                self.status_lit = !self.status_lit;
                debug!("status led {}", if self.status_lit { "on" } else { "off" });
            }
            IndicatorAction::AlertLed(on) => {
                if on != self.alert_lit {
                    debug!("alert led {}", if on { "on" } else { "off" });
                }
                self.alert_lit = on;
            }
            IndicatorAction::Buzzer(on) => {
                if on != self.buzzer_on {
                    debug!("buzzer {}", if on { "on" } else { "off" });
                }
                self.buzzer_on = on;
            }
            IndicatorAction::Tone(hz) => {
                if self.tone_hz != Some(hz) {
                    info!("buzzer tone {hz} Hz");
                }
                self.tone_hz = Some(hz);
            }
            IndicatorAction::Silence => {
                self.buzzer_on = false;
                if self.tone_hz.take().is_some() {
                    info!("buzzer silenced");
                }
            }
            IndicatorAction::Delay(_) => {}
        }
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
