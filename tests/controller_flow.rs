//! End-to-end tests against a fake LED class directory and an in-memory bus

use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;

use mqttled::{
    Config, ConnectionOutcome, Controller, ControllerContext, ControllerError, DeviceInfo,
    MemoryBus, MessageRouter, RefusalReason,
};

const NS: &str = "mqttled/ap/";

fn add_led(root: &Path, name: &str, brightness: &str, trigger: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("brightness"), brightness).unwrap();
    fs::write(dir.join("trigger"), trigger).unwrap();
}

fn read_attr(root: &Path, name: &str, attr: &str) -> String {
    fs::read_to_string(root.join(name).join(attr)).unwrap()
}

fn config(root: &Path, extra: &str) -> Config {
    let mut config = Config::from_toml(&format!(
        "[mqtt]\nhost = \"broker.lan\"\n\n[triggers]\ntriggers = [\"heartbeat\", \"timer\", \"default-on\"]\n{extra}"
    ))
    .unwrap();
    config.leds.path = root.to_path_buf();
    config
}

fn context() -> ControllerContext {
    ControllerContext::new(
        "mqttled",
        "ap",
        "homeassistant",
        DeviceInfo {
            identifiers: vec!["mqttled-ap".to_string()],
            name: "ap".to_string(),
            manufacturer: "OpenWrt".to_string(),
            model: "ap".to_string(),
        },
    )
}

struct Fixture {
    _dir: TempDir,
    bus: Arc<MemoryBus>,
    router: MessageRouter,
    controller: Controller,
}

fn setup(dir: TempDir, config: &Config) -> Result<Fixture, ControllerError> {
    let bus = Arc::new(MemoryBus::new());
    let mut router = MessageRouter::new();
    let controller = Controller::new(context(), config, bus.clone(), &mut router)?;
    Ok(Fixture {
        _dir: dir,
        bus,
        router,
        controller,
    })
}

fn two_leds() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    add_led(dir.path(), "green:wlan", "0", "heartbeat rtc-cmos [none] timer");
    add_led(dir.path(), "red:power", "255", "none [default-on] timer");
    dir
}

#[test]
fn test_led_starts_off_with_allowed_effects() {
    let dir = two_leds();
    let cfg = config(dir.path(), "");
    let fx = setup(dir, &cfg).unwrap();

    assert_eq!(fx.controller.light_ids().collect::<Vec<_>>(), vec!["green-wlan", "red-power"]);
    let light = fx.controller.light("green-wlan").unwrap().lock();
    assert!(!light.is_on());

    let discovery: serde_json::Value = serde_json::from_str(light.discovery_payload()).unwrap();
    assert_eq!(
        discovery,
        json!({
            "availability_topic": "mqttled/ap/connection",
            "state_topic": "mqttled/ap/green-wlan/state",
            "command_topic": "mqttled/ap/green-wlan/set",
            "unique_id": "ap_green-wlan",
            "brightness": true,
            "brightness_scale": 254,
            "effect": true,
            "effect_list": ["heartbeat", "timer"],
            "name": "green-wlan",
            "schema": "json",
            "device": {
                "identifiers": ["mqttled-ap"],
                "name": "ap",
                "manufacturer": "OpenWrt",
                "model": "ap"
            },
            "json_attributes_topic": "mqttled/ap/green-wlan/state"
        })
    );
}

#[test]
fn test_connect_announces_discovery_before_state() {
    let dir = two_leds();
    let cfg = config(dir.path(), "");
    let fx = setup(dir, &cfg).unwrap();

    fx.controller.on_connect(ConnectionOutcome::Accepted);

    assert_eq!(fx.bus.subscriptions(), vec![format!("{NS}#")]);
    let published = fx.bus.take();
    assert_eq!(published.len(), 5);
    assert!(published.iter().all(|p| p.retain));

    assert_eq!(published[0].topic, "mqttled/ap/connection");
    assert_eq!(published[0].payload_str(), "online");
    assert_eq!(published[1].topic, "homeassistant/light/ap/green-wlan/config");
    assert_eq!(published[2].topic, "homeassistant/light/ap/red-power/config");
    assert_eq!(published[3].topic, "mqttled/ap/green-wlan/state");
    assert_eq!(published[4].topic, "mqttled/ap/red-power/state");

    assert_eq!(
        published[3].json().unwrap(),
        json!({"state": "OFF", "brightness": 0, "trigger": "none"})
    );
    assert_eq!(
        published[4].json().unwrap(),
        json!({"state": "ON", "brightness": 255, "trigger": "default-on"})
    );
}

#[test]
fn test_refused_connection_announces_nothing() {
    let dir = two_leds();
    let cfg = config(dir.path(), "");
    let fx = setup(dir, &cfg).unwrap();

    fx.controller
        .on_connect(ConnectionOutcome::Refused(RefusalReason::NotAuthorized));
    assert!(fx.bus.published().is_empty());
    assert!(fx.bus.subscriptions().is_empty());
}

#[test]
fn test_off_command_publishes_once() {
    let dir = two_leds();
    let root = dir.path().to_path_buf();
    let cfg = config(&root, "");
    let mut fx = setup(dir, &cfg).unwrap();

    assert!(fx.router.dispatch("mqttled/ap/red-power/set", br#"{"state":"OFF"}"#));

    let published = fx.bus.take();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "mqttled/ap/red-power/state");
    assert!(published[0].retain);
    assert_eq!(
        published[0].json().unwrap(),
        json!({"state": "OFF", "brightness": 0, "trigger": "none"})
    );
    assert_eq!(read_attr(&root, "red:power", "trigger"), "none");
    assert_eq!(read_attr(&root, "red:power", "brightness"), "0");
}

#[test]
fn test_on_command_restores_brightness() {
    let dir = two_leds();
    let root = dir.path().to_path_buf();
    let cfg = config(&root, "");
    let mut fx = setup(dir, &cfg).unwrap();

    fx.router
        .dispatch("mqttled/ap/red-power/set", br#"{"state":"OFF"}"#);
    fx.router
        .dispatch("mqttled/ap/red-power/set", br#"{"state":"ON","effect":"timer"}"#);

    let published = fx.bus.take();
    assert_eq!(published.len(), 2);
    assert_eq!(
        published[1].json().unwrap(),
        json!({"state": "ON", "brightness": 255, "trigger": "timer"})
    );
    assert_eq!(read_attr(&root, "red:power", "trigger"), "timer");
    assert_eq!(read_attr(&root, "red:power", "brightness"), "255");
}

#[test]
fn test_on_with_brightness() {
    let dir = two_leds();
    let root = dir.path().to_path_buf();
    let cfg = config(&root, "");
    let mut fx = setup(dir, &cfg).unwrap();

    fx.router.dispatch(
        "mqttled/ap/green-wlan/set",
        br#"{"state":"ON","brightness":100}"#,
    );

    let published = fx.bus.take();
    assert_eq!(
        published[0].json().unwrap(),
        json!({"state": "ON", "brightness": 100, "trigger": "default-on"})
    );
    assert_eq!(read_attr(&root, "green:wlan", "brightness"), "100");
}

#[test]
fn test_rejected_commands_publish_nothing() {
    let dir = two_leds();
    let root = dir.path().to_path_buf();
    let cfg = config(&root, "");
    let mut fx = setup(dir, &cfg).unwrap();

    let bodies: [&[u8]; 3] = [br#"{"brightness":10}"#, br#"{"state":"BLINK"}"#, b"not json"];
    for body in bodies {
        assert!(fx.router.dispatch("mqttled/ap/red-power/set", body));
    }

    assert!(fx.bus.published().is_empty());
    assert_eq!(read_attr(&root, "red:power", "trigger"), "none [default-on] timer");
}

#[test]
fn test_unrouted_topic_goes_to_fallback() {
    let dir = two_leds();
    let cfg = config(dir.path(), "");
    let mut fx = setup(dir, &cfg).unwrap();

    // Handled by the controller's logging fallback
    assert!(!fx.router.dispatch("mqttled/ap/connection", b"online"));
    assert!(!fx.router.dispatch("mqttled/ap/green-wlan/state", b"{}"));
    assert!(fx.bus.published().is_empty());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    fx.router.set_fallback(move |topic, _| sink.lock().push(topic.to_string()));
    fx.router.dispatch("mqttled/ap/unknown/set", b"{}");
    assert_eq!(*seen.lock(), vec!["mqttled/ap/unknown/set"]);
}

#[test]
fn test_write_failure_still_publishes_state() {
    let dir = two_leds();
    let root = dir.path().to_path_buf();
    let cfg = config(&root, "");
    let mut fx = setup(dir, &cfg).unwrap();

    // Writing into a directory fails regardless of permissions
    let brightness = root.join("green:wlan").join("brightness");
    fs::remove_file(&brightness).unwrap();
    fs::create_dir(&brightness).unwrap();

    fx.router.dispatch(
        "mqttled/ap/green-wlan/set",
        br#"{"state":"ON","effect":"heartbeat","brightness":40}"#,
    );

    // The trigger write succeeded, the brightness write did not
    let published = fx.bus.take();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].json().unwrap(),
        json!({"state": "ON", "brightness": 0, "trigger": "heartbeat"})
    );
}

#[test]
fn test_include_list_and_missing_exclude() {
    let dir = two_leds();
    let cfg = config(
        dir.path(),
        "\n[leds]\nall = false\ninclude = [\"red:power\"]\nexclude = [\"blue:usb\"]\n",
    );
    let fx = setup(dir, &cfg).unwrap();
    assert_eq!(fx.controller.light_ids().collect::<Vec<_>>(), vec!["red-power"]);
}

#[test]
fn test_unreadable_led_is_skipped() {
    let dir = two_leds();
    fs::create_dir(dir.path().join("broken")).unwrap();
    fs::write(dir.path().join("broken").join("brightness"), "x").unwrap();
    let cfg = config(dir.path(), "");
    let fx = setup(dir, &cfg).unwrap();
    assert_eq!(fx.controller.len(), 2);
    assert!(fx.controller.light("broken").is_none());
}

#[test]
fn test_no_usable_leds() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("broken")).unwrap();
    let cfg = config(dir.path(), "");
    assert!(matches!(setup(dir, &cfg), Err(ControllerError::NoLights)));
}

#[test]
fn test_missing_class_dir() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("missing"), "");
    assert!(matches!(setup(dir, &cfg), Err(ControllerError::ListLeds(_))));
}

fn rgb_leds() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    add_led(dir.path(), "rgb:red", "255", "[none] timer heartbeat");
    add_led(dir.path(), "rgb:green", "128", "[none] heartbeat timer");
    add_led(dir.path(), "rgb:blue", "0", "[none] timer");
    add_led(dir.path(), "status", "1", "[none]");
    dir
}

const RGB_SECTION: &str = r#"
[rgb]
enablergb = true
name = "Status RGB"
red = "rgb:red"
green = "rgb:green"
blue = "rgb:blue"
"#;

#[test]
fn test_rgb_composite_owns_its_channels() {
    let dir = rgb_leds();
    let cfg = config(dir.path(), RGB_SECTION);
    let fx = setup(dir, &cfg).unwrap();

    assert_eq!(fx.controller.light_ids().collect::<Vec<_>>(), vec!["Status-RGB", "status"]);

    let light = fx.controller.light("Status-RGB").unwrap().lock();
    let discovery: serde_json::Value = serde_json::from_str(light.discovery_payload()).unwrap();
    assert_eq!(
        discovery,
        json!({
            "availability_topic": "mqttled/ap/connection",
            "state_topic": "mqttled/ap/Status-RGB/state",
            "command_topic": "mqttled/ap/Status-RGB/set",
            "unique_id": "ap_Status-RGB",
            "brightness": true,
            "brightness_scale": 254,
            "color_mode": true,
            "supported_color_modes": ["rgb"],
            "effect": true,
            "effect_list": ["timer"],
            "name": "Status-RGB",
            "schema": "json",
            "device": {
                "identifiers": ["mqttled-ap"],
                "name": "ap",
                "manufacturer": "OpenWrt",
                "model": "ap"
            },
            "json_attributes_topic": "mqttled/ap/Status-RGB/state"
        })
    );
}

#[test]
fn test_rgb_off_keeps_overall_brightness() {
    let dir = rgb_leds();
    let cfg = config(dir.path(), RGB_SECTION);
    let mut fx = setup(dir, &cfg).unwrap();

    fx.router
        .dispatch("mqttled/ap/Status-RGB/set", br#"{"state":"ON","brightness":128}"#);
    fx.router
        .dispatch("mqttled/ap/Status-RGB/set", br#"{"state":"OFF"}"#);

    let off = fx.bus.take().pop().unwrap().json().unwrap();
    assert_eq!(off["state"], "OFF");
    assert_eq!(off["brightness"], 128);
}

#[test]
fn test_rgb_command_flow() {
    let dir = rgb_leds();
    let root = dir.path().to_path_buf();
    let cfg = config(&root, RGB_SECTION);
    let mut fx = setup(dir, &cfg).unwrap();

    fx.router.dispatch(
        "mqttled/ap/Status-RGB/set",
        br#"{"state":"ON","effect":"timer","brightness":255,"color":{"r":10,"g":20,"b":30}}"#,
    );
    assert_eq!(read_attr(&root, "rgb:red", "brightness"), "10");
    assert_eq!(read_attr(&root, "rgb:green", "brightness"), "20");
    assert_eq!(read_attr(&root, "rgb:blue", "brightness"), "30");
    assert_eq!(read_attr(&root, "rgb:blue", "trigger"), "timer");

    // Halving the brightness keeps the reported color
    fx.router
        .dispatch("mqttled/ap/Status-RGB/set", br#"{"state":"ON","brightness":128}"#);
    assert_eq!(read_attr(&root, "rgb:green", "brightness"), "10");

    let published = fx.bus.take();
    assert_eq!(published.len(), 2);
    assert_eq!(
        published[1].json().unwrap(),
        json!({
            "state": "ON",
            "brightness": 128,
            "trigger": "default-on",
            "color_mode": "rgb",
            "color": {"r": 10, "g": 20, "b": 30}
        })
    );

    fx.router
        .dispatch("mqttled/ap/Status-RGB/set", br#"{"state":"OFF"}"#);
    let off = fx.bus.take().remove(0).json().unwrap();
    assert_eq!(off["state"], "OFF");
    assert_eq!(off["trigger"], "none");
    assert_eq!(off["color"], json!({"r": 10, "g": 20, "b": 30}));
    for channel in ["rgb:red", "rgb:green", "rgb:blue"] {
        assert_eq!(read_attr(&root, channel, "brightness"), "0");
    }
}

#[test]
fn test_missing_rgb_channel_is_fatal() {
    let dir = rgb_leds();
    fs::remove_dir_all(dir.path().join("rgb:blue")).unwrap();
    let cfg = config(dir.path(), RGB_SECTION);
    match setup(dir, &cfg) {
        Err(ControllerError::RgbChannel { channel, .. }) => assert_eq!(channel, "rgb:blue"),
        other => panic!("unexpected: {:?}", other.map(|fx| fx.controller.len())),
    }
}
