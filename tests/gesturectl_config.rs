use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use gesture_control::config::{BrightnessBackend, GestureConfig, VolumeBackend};
use gesture_control::control::Mixer;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "GESTURECTL_CONFIG",
        "GESTURECTL_DEVICE",
        "GESTURECTL_DETECTOR",
        "GESTURECTL_MODEL",
        "GESTURECTL_MIN_CONFIDENCE",
        "GESTURECTL_BRIGHTNESS_BACKEND",
        "GESTURECTL_VOLUME_BACKEND",
        "GESTURECTL_HYSTERESIS",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(body.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = GestureConfig::load().expect("load defaults");

    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert!(cfg.camera.mirror);
    assert_eq!(cfg.detector.backend, "tract");
    assert_eq!(cfg.detector.min_confidence, 0.7);
    assert_eq!((cfg.brightness.range.near, cfg.brightness.range.far), (30.0, 220.0));
    assert_eq!((cfg.volume.range.near, cfg.volume.range.far), (30.0, 200.0));
    assert_eq!(cfg.volume.hysteresis, 0.05);
    assert_eq!(cfg.brightness.backend, BrightnessBackend::Sysfs);
    assert_eq!(cfg.volume.backend, VolumeBackend::Mixer(Mixer::Pactl));
    assert!(cfg.display.enabled);
    assert_eq!(cfg.display.title, "Hand Gesture Control");
}

#[test]
fn loads_toml_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
            [camera]
            device = "/dev/video2"
            width = 640
            height = 480
            mirror = false

            [detector]
            backend = "stub"
            min_confidence = 0.6

            [brightness]
            near = 20.0
            far = 180.0
            backend = "dry-run"

            [volume]
            far = 150.0
            backend = "amixer"

            [display]
            enabled = false
        "#,
    );

    std::env::set_var("GESTURECTL_CONFIG", file.path());
    std::env::set_var("GESTURECTL_DEVICE", "stub://bench");
    std::env::set_var("GESTURECTL_HYSTERESIS", "0.1");

    let cfg = GestureConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://bench");
    assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
    assert!(!cfg.camera.mirror);
    assert_eq!(cfg.detector.backend, "stub");
    assert_eq!(cfg.detector.min_confidence, 0.6);
    assert_eq!((cfg.brightness.range.near, cfg.brightness.range.far), (20.0, 180.0));
    assert_eq!(cfg.brightness.backend, BrightnessBackend::DryRun);
    assert_eq!((cfg.volume.range.near, cfg.volume.range.far), (30.0, 150.0));
    assert_eq!(cfg.volume.hysteresis, 0.1);
    assert_eq!(cfg.volume.backend, VolumeBackend::Mixer(Mixer::Amixer));
    assert!(!cfg.display.enabled);

    clear_env();
}

#[test]
fn loads_json_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{ "volume": { "backend": "dry-run", "hysteresis": 0.02 } }"#,
    );
    let cfg = GestureConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.volume.backend, VolumeBackend::DryRun);
    assert_eq!(cfg.volume.hysteresis, 0.02);
}

#[test]
fn rejects_inverted_range() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(".toml", "[brightness]\nnear = 220.0\nfar = 30.0\n");
    let err = GestureConfig::load_from(Some(file.path())).expect_err("inverted range");
    assert!(err.to_string().contains("brightness"));
}

#[test]
fn rejects_bad_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("GESTURECTL_MIN_CONFIDENCE", "1.5");
    assert!(GestureConfig::load().is_err());
    clear_env();

    std::env::set_var("GESTURECTL_VOLUME_BACKEND", "oss");
    assert!(GestureConfig::load().is_err());
    clear_env();

    std::env::set_var("GESTURECTL_HYSTERESIS", "lots");
    assert!(GestureConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_unknown_keys() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(".toml", "[camera]\nresolution = \"hd\"\n");
    assert!(GestureConfig::load_from(Some(file.path())).is_err());
}
