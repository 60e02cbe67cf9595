//! varsync device firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                    │
//! │                                                          │
//! │   HttpTransport     NvsAdapter      SystemClock          │
//! │   (Transport)       (Storage)       (Clock)              │
//! │                                                          │
//! │   ─────────────── Port Trait Boundary ───────────────    │
//! │                                                          │
//! │   ┌──────────────────────────────────────────────────┐   │
//! │   │  SyncEngine (heartbeat · push · pull · retry)    │   │
//! │   │    └─ VariableCache └─ CallbackDispatcher        │   │
//! │   └──────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Build-time settings (used only when nothing is provisioned in NVS):
//! `VARSYNC_WIFI_SSID`, `VARSYNC_WIFI_PASS`, `VARSYNC_SERVER_URL`,
//! `VARSYNC_DEVICE_KEY`.
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use varsync::adapters::http::HttpTransport;
use varsync::adapters::nvs::NvsAdapter;
use varsync::adapters::pubsub;
use varsync::adapters::time::SystemClock;
use varsync::app::ports::Storage;
use varsync::config::{self, ClientConfig};
use varsync::sync::{SyncEngine, TickOutcome};

/// Host loop period.  The engine decides itself when a cycle is due.
const LOOP_PERIOD_MS: u32 = 50;

/// Cycles between cache snapshots.
const SNAPSHOT_EVERY_CYCLES: u32 = 10;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    let mac = pubsub::read_mac();
    info!("╔══════════════════════════════════════╗");
    info!(
        "║  varsync v{}  (VS-{:02X}{:02X}{:02X})",
        env!("CARGO_PKG_VERSION"),
        mac[3],
        mac[4],
        mac[5]
    );
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage, config and credential ─────────────────────
    let mut nvs = NvsAdapter::new();
    if !nvs.initialize() {
        warn!("NVS unavailable, running without persistence");
    }
    let config = resolve_config(&mut nvs);
    if let Err(e) = config.validate() {
        warn!("Config invalid ({}), sync will likely be rejected", e);
    }

    // ── 3. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let mut wifi = BlockingWifi::wrap(EspWifi::new(peripherals.modem, sysloop.clone(), None)?, sysloop)?;
    connect_wifi(&mut wifi)?;

    let mut transport = HttpTransport::new(&config.server_url)
        .map_err(|e| anyhow!("{}: {}", e, config.server_url))?
        .with_link_check(sta_associated);

    // ── 4. Sync engine ────────────────────────────────────────
    let mut engine = SyncEngine::new(&config, &mut transport, SystemClock::new());
    engine.on_write_bool("led", |on| info!("App: led -> {}", on));
    engine.on_write_int("interval", |v| info!("App: interval -> {}", v));
    engine.on_write_text("message", |m| info!("App: message -> '{}'", m));

    engine.restore_snapshot(&nvs);
    engine.begin();
    engine.sync_now();
    engine.virtual_write_text("firmware", env!("CARGO_PKG_VERSION"));

    info!("System ready. Entering sync loop.");

    // ── 5. Host loop ──────────────────────────────────────────
    let mut cycles: u32 = 0;
    loop {
        if let TickOutcome::Synced { heartbeat_ok, pull_ok } = engine.service() {
            if !heartbeat_ok || !pull_ok {
                warn!("Sync: cycle incomplete (hb={}, pull={})", heartbeat_ok, pull_ok);
            }
            cycles = cycles.wrapping_add(1);
            if cycles % SNAPSHOT_EVERY_CYCLES == 0 {
                engine.save_snapshot(&mut nvs);
            }
            if !wifi.is_connected().unwrap_or(false) {
                warn!("WiFi: link lost, reconnecting");
                if let Err(e) = connect_wifi(&mut wifi) {
                    warn!("WiFi: reconnect failed: {}", e);
                }
            }
        }
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}

/// Stored config if present, otherwise build-time defaults (persisted so
/// the next boot finds them).  A separately stored credential wins.
fn resolve_config(nvs: &mut NvsAdapter) -> ClientConfig {
    let mut cfg = match ClientConfig::load(nvs) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            ClientConfig::default()
        }
    };

    if cfg.device_key.is_empty() {
        cfg = ClientConfig {
            heartbeat_interval_ms: cfg.heartbeat_interval_ms,
            retries: cfg.retries,
            retry_base_delay_ms: cfg.retry_base_delay_ms,
            ..ClientConfig::new(
                option_env!("VARSYNC_DEVICE_KEY").unwrap_or_default(),
                option_env!("VARSYNC_SERVER_URL").unwrap_or(cfg.server_url.as_str()),
            )
        };
        match cfg.provision(nvs) {
            Ok(()) => info!("Config: provisioned from build settings"),
            Err(e) => warn!("Config: provisioning skipped ({})", e),
        }
    }

    if let Ok(key) = config::load_device_key(nvs) {
        cfg.device_key = key;
    }
    cfg
}

fn connect_wifi(wifi: &mut BlockingWifi<EspWifi<'static>>) -> Result<()> {
    let ssid = option_env!("VARSYNC_WIFI_SSID").unwrap_or_default();
    let password = option_env!("VARSYNC_WIFI_PASS").unwrap_or_default();

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: password.try_into().map_err(|_| anyhow!("password too long"))?,
        auth_method: if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;

    if !wifi.is_started()? {
        wifi.start()?;
    }
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("WiFi: connected to '{}'", ssid);
    Ok(())
}

/// Whether the station is associated with an access point.
fn sta_associated() -> bool {
    let mut info = esp_idf_svc::sys::wifi_ap_record_t::default();
    // SAFETY: `info` is a valid out-pointer for the duration of the call.
    unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut info) == esp_idf_svc::sys::ESP_OK }
}
