//! Single-threaded node driver.
//!
//! The firmware main loop is a plain one-second tick. Each tick it checks the
//! WiFi-reset button, counts down to the next push, pushes a fresh sensor
//! snapshot when the countdown runs out, and otherwise redraws the status
//! screen. A push result stays on screen until the next tick:
//!
//! ```text
//! ┌────────────────────────┐
//! │ BME280_ESP_03          │
//! │                        │
//! │ Temp:     21.5  C      │
//! │ Humi:     40    %      │
//! │ Pres:     1013.2 hPa   │
//! │ data push: 12   sek    │
//! └────────────────────────┘
//! ```
//!
//! [`Node::step`] is one such tick. The caller sleeps between ticks, keeps
//! WiFi up with [`join`] (which also synchronises the clock), and on
//! [`Step::Reprovision`] clears the stored configuration and calls
//! [`enter_provisioning`]. The busy [`Led`] is lit while joining and pushing.
//!
//! Hardware is reached through the [`Sensor`], [`Display`], [`Button`], [`Led`]
//! and [`Wifi`] traits only.

#![allow(missing_docs)]

use crate::config::NodeConfig;
use crate::diagnostics::{DiagnosticSink, Fault, TimeSync};
use crate::network::{Connect, Resolve, Secure};
use crate::telemetry::{Reading, Value};
use crate::uplink::{Error, Outcome, Uplink};
use core::fmt::Write;
use core::net::Ipv4Addr;
use heapless::String;

/// Capacity of a status line on the display.
pub const STATUS_LEN: usize = 24;

/// Environmental sensor producing one reading per call.
pub trait Sensor {
    type Error: core::fmt::Debug;
    /// Take a fresh snapshot of all metrics.
    fn snapshot(&mut self) -> Result<Reading, Self::Error>;
}

/// Monochrome text display with an explicit frame commit.
pub trait Display {
    type Error: core::fmt::Debug;
    /// Blank the frame buffer.
    fn clear(&mut self);
    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn text(&mut self, text: &str, x: i32, y: i32);
    /// Set or clear one pixel.
    fn pixel(&mut self, x: i32, y: i32, on: bool);
    /// Push the frame buffer to the panel.
    fn show(&mut self) -> Result<(), Self::Error>;
}

/// Momentary push button.
pub trait Button {
    fn is_pressed(&mut self) -> bool;
}

/// Busy indicator, usually the onboard LED.
pub trait Led {
    fn on(&mut self);
    fn off(&mut self);
}

impl<L: Led + ?Sized> Led for &mut L {
    fn on(&mut self) {
        (**self).on()
    }

    fn off(&mut self) {
        (**self).off()
    }
}

/// For boards without a spare LED.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLed;

impl Led for NoLed {
    fn on(&mut self) {}
    fn off(&mut self) {}
}

/// Station and access-point control of the WiFi radio.
pub trait Wifi {
    type Error: core::fmt::Debug;
    fn is_connected(&self) -> bool;
    /// Join `ssid`, blocking until associated or failed.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;
    fn disconnect(&mut self);
    /// Open an access point and return the node's address on it.
    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<Ipv4Addr, Self::Error>;
}

/// How a node names itself.
#[derive(Debug, Clone, Copy)]
pub struct Identity<'a> {
    /// Display title, DHCP host name and access-point SSID.
    pub name: &'a str,
    /// Access-point password used in provisioning mode.
    pub ap_password: &'a str,
    /// Collector base URL; the access token and `/telemetry` are appended.
    pub base_url: &'a str,
}

/// One metric row on the status screen.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub metric: &'a str,
    pub label: &'a str,
    pub unit: &'a str,
}

/// Rows for a BME280 temperature/humidity/pressure sensor.
pub const BME280_FIELDS: [Field<'static>; 3] = [
    Field {
        metric: "Temperatur",
        label: "Temp:",
        unit: " C",
    },
    Field {
        metric: "Luftfeuchte",
        label: "Humi:",
        unit: " %",
    },
    Field {
        metric: "Luftdruck",
        label: "Pres:",
        unit: " hPa",
    },
];

/// What a tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Counting down; `remaining` ticks until the next push.
    Waiting { remaining: u32 },
    /// A push was attempted.
    Pushed(Outcome),
    /// The push was due but the sensor could not be read.
    SensorFault,
    /// The push was due but the telemetry URL could not be built from the
    /// configuration. Reported to the sink as [`Error::MalformedUrl`].
    ConfigFault,
    /// The reset button is held: drop the configuration and provision again.
    Reprovision,
}

/// Text shown after a push, `POST done...` or `POST err <code>`.
pub fn status_text(outcome: &Outcome) -> String<STATUS_LEN> {
    let mut text = String::new();
    // Both forms fit in STATUS_LEN.
    let _ = match outcome.status_code() {
        200 => text.push_str("POST done..."),
        code => write!(text, "POST err {}", code).map_err(|_| ()),
    };
    text
}

/// Polling-loop state for a configured node.
#[derive(Debug)]
pub struct Node<'a, S, D, B, L> {
    identity: Identity<'a>,
    fields: &'a [Field<'a>],
    config: NodeConfig,
    sensor: S,
    display: D,
    button: B,
    led: L,
    elapsed: u32,
}

impl<'a, S, D, B, L> Node<'a, S, D, B, L>
where
    S: Sensor,
    D: Display,
    B: Button,
    L: Led,
{
    pub fn new(identity: Identity<'a>, config: NodeConfig, sensor: S, display: D, button: B, led: L) -> Self {
        Self {
            identity,
            fields: &BME280_FIELDS,
            config,
            sensor,
            display,
            button,
            led,
            elapsed: 0,
        }
    }

    /// Use other status rows than [`BME280_FIELDS`].
    pub fn with_fields(mut self, fields: &'a [Field<'a>]) -> Self {
        self.fields = fields;
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn display(&mut self) -> &mut D {
        &mut self.display
    }

    /// Run one tick of the polling loop.
    pub fn step<R, C, T, G>(&mut self, uplink: &mut Uplink<R, C, T>, sink: &mut G) -> Step
    where
        R: Resolve,
        C: Connect,
        T: Secure<C::Connection>,
        G: DiagnosticSink,
    {
        if self.button.is_pressed() {
            info!("wifi reset requested");
            return Step::Reprovision;
        }

        let step = if self.elapsed >= self.config.push_interval {
            self.elapsed = 0;
            self.led.on();
            let step = self.push(uplink, sink);
            self.led.off();
            step
        } else {
            self.elapsed += 1;
            Step::Waiting {
                remaining: self.config.push_interval - self.elapsed,
            }
        };

        // The next tick replaces the push result with the status screen.
        if !matches!(step, Step::Pushed(_)) {
            self.render_status();
        }
        step
    }

    fn push<R, C, T, G>(&mut self, uplink: &mut Uplink<R, C, T>, sink: &mut G) -> Step
    where
        R: Resolve,
        C: Connect,
        T: Secure<C::Connection>,
        G: DiagnosticSink,
    {
        let Ok(reading) = self.sensor.snapshot() else {
            warn!("sensor snapshot failed");
            return Step::SensorFault;
        };
        let Ok(url) = self.config.telemetry_url(self.identity.base_url) else {
            error!("telemetry url does not fit");
            sink.record(Fault::Uplink(Error::MalformedUrl));
            return Step::ConfigFault;
        };

        self.display.clear();
        self.display.text("POST...", 0, 15);
        self.commit();

        let outcome = uplink.post(&url, &reading, sink);

        self.display.text(&status_text(&outcome), 0, 45);
        self.commit();
        Step::Pushed(outcome)
    }

    /// Draw the status screen from a fresh snapshot and the countdown.
    pub fn render_status(&mut self) {
        let reading = self.sensor.snapshot().ok();

        self.display.clear();
        self.display.text(self.identity.name, 0, 0);
        for (row, field) in self.fields.iter().enumerate() {
            let y = 18 + 10 * row as i32;
            self.display.text(field.label, 0, y);
            let value = reading.as_ref().and_then(|r| r.get(field.metric));
            self.display.text(&value_text(value), 50, y);
            self.display.text(field.unit, 80, y);
        }

        let mut countdown: String<10> = String::new();
        let _ = write!(
            countdown,
            "{}",
            self.config.push_interval.saturating_sub(self.elapsed)
        );
        self.display.text("data push: ", 0, 55);
        self.display.text(&countdown, 80, 55);
        self.display.text("sek", 100, 55);
        self.commit();
    }

    fn commit(&mut self) {
        show_frame(&mut self.display);
    }

    /// Take the node apart, e.g. to hand the display to provisioning.
    pub fn release(self) -> (NodeConfig, S, D, B, L) {
        (self.config, self.sensor, self.display, self.button, self.led)
    }
}

fn show_frame<D: Display>(display: &mut D) {
    if display.show().is_err() {
        warn!("display update failed");
    }
}

fn value_text(value: Option<Value>) -> String<24> {
    let mut text = String::new();
    let _ = match value {
        Some(value) => write!(text, "{}", value),
        None => text.push_str("--").map_err(|_| core::fmt::Error),
    };
    text
}

/// Keep the station connected, showing progress on the display.
///
/// After a fresh join the clock is synchronised; a failed sync is recorded as
/// [`Fault::TimeSync`] and does not fail the join. The LED is lit throughout.
pub fn join<W, D, L, T, G>(
    wifi: &mut W,
    config: &NodeConfig,
    display: &mut D,
    led: &mut L,
    time: &mut T,
    sink: &mut G,
) -> Result<(), W::Error>
where
    W: Wifi,
    D: Display,
    L: Led,
    T: TimeSync,
    G: DiagnosticSink,
{
    if wifi.is_connected() {
        return Ok(());
    }
    led.on();
    display.clear();
    display.text("Wifi connecting ...", 0, 0);
    show_frame(display);

    info!("joining {}", config.ssid.as_str());
    let joined = wifi.connect(&config.ssid, &config.password);
    if joined.is_ok() && time.sync().is_err() {
        warn!("time sync failed");
        sink.record(Fault::TimeSync);
    }
    led.off();
    joined
}

/// Leave station mode, open the provisioning access point and show its details.
pub fn enter_provisioning<W: Wifi, D: Display>(
    wifi: &mut W,
    identity: &Identity<'_>,
    display: &mut D,
) -> Result<Ipv4Addr, W::Error> {
    if wifi.is_connected() {
        wifi.disconnect();
    }
    let ip = wifi.start_access_point(identity.name, identity.ap_password)?;

    let mut address: String<16> = String::new();
    let _ = write!(address, "{}", ip);

    display.clear();
    display.text("Wifi AccessPoint ", 0, 0);
    display.text("SSID: ", 0, 18);
    display.text(identity.name, 0, 28);
    display.text("IP: ", 0, 42);
    display.text(&address, 0, 52);
    show_frame(display);

    info!("provisioning access point up");
    Ok(ip)
}

/// Heart icon drawn on the splash screen, row-major 9x9.
const HEART: [[u8; 9]; 9] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 1, 1, 0],
    [1, 1, 1, 1, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 1, 0],
    [0, 0, 1, 1, 1, 1, 1, 0, 0],
    [0, 0, 0, 1, 1, 1, 0, 0, 0],
    [0, 0, 0, 0, 1, 0, 0, 0, 0],
];

/// Boot splash: "IoT with" followed by a heart.
pub fn splash<D: Display>(display: &mut D) -> Result<(), D::Error> {
    display.clear();
    for (y, row) in HEART.iter().enumerate() {
        for (x, &on) in row.iter().enumerate() {
            display.pixel(x as i32 + 93, y as i32 + 23, on == 1);
        }
    }
    display.text("IoT with ", 20, 25);
    display.show()
}
