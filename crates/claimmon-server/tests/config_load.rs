use claimmon_alert::rules::threshold::Tier;
use claimmon_common::types::AlertLevel;
use claimmon_server::config::MonitorConfig;
use claimmon_server::monitor::SystemMonitor;

#[test]
fn loads_config_file_with_defaults_for_missing_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor.toml");
    std::fs::write(
        &path,
        r#"
        http_port = 9100
        version = "2.4.1"

        [intervals]
        alert_check = 15000

        [thresholds]
        cooldown_secs = 90

        [thresholds.memory_usage]
        warning = 70.0
        critical = 85.0

        [alerting]
        channels = ["console", "webhook"]
        max_alerts_per_hour = 20

        [alerting.channel_settings.webhook]
        url = "https://hooks.example.com/claims-monitor"

        [alerting.min_level]
        webhook = "error"

        [emergency]
        feed_url = "https://feeds.example.com/fl/emergencies.json"
        traffic_warning_percent = 25.0
        "#,
    )
    .unwrap();

    let config = MonitorConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.http_port, 9100);
    assert_eq!(config.version, "2.4.1");
    assert_eq!(config.intervals.alert_check, 15_000);
    assert_eq!(config.intervals.metrics_collection, 30_000);
    assert_eq!(config.thresholds.memory_usage, Tier::new(70.0, 85.0));
    assert_eq!(config.thresholds.response_time, Tier::new(1000.0, 3000.0));
    assert_eq!(config.thresholds.cooldown_secs, 90);
    assert_eq!(config.thresholds.threshold_set().cooldown_secs, 90);
    assert_eq!(config.alerting.max_alerts_per_hour, 20);
    assert_eq!(config.alerting.min_level["webhook"], AlertLevel::Error);
    assert_eq!(config.emergency.traffic_warning_percent, 25.0);

    let monitor = SystemMonitor::new(config);
    assert_eq!(monitor.version(), "2.4.1");
    assert!(!monitor.is_running());
}

#[test]
fn missing_or_invalid_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(MonitorConfig::load(missing.to_str().unwrap()).is_err());

    let invalid = dir.path().join("invalid.toml");
    std::fs::write(&invalid, "http_port = \"not a number\"").unwrap();
    assert!(MonitorConfig::load(invalid.to_str().unwrap()).is_err());
}

#[test]
fn sample_config_parses() {
    let sample = include_str!("../../../config/monitor.toml");
    let config: MonitorConfig = toml::from_str(sample).unwrap();
    assert!(config.alerting.channels.contains(&"console".to_string()));
    assert_eq!(config.thresholds.cooldown_secs, 0);
}
