//! 设备命令测试
mod common;

use arlo_gateway::device::UNKNOWN_IP;
use arlo_gateway::error::GatewayError;
use arlo_gateway::protocol::Template;
use rstest::rstest;
use serde_json::{json, Map, Value};

use common::{device, RecordingChannel};

#[rstest]
#[case(json!({"quality": "ultra"}))]
#[case(json!({"quality": ""}))]
#[case(json!({"quality": 3}))]
#[case(json!({}))]
#[tokio::test]
async fn invalid_quality_sends_nothing(#[case] params: Value) {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    let result = camera.commands(channel.as_ref()).set_quality(&params).await;

    assert!(matches!(result, Err(GatewayError::Validation(_))));
    assert!(channel.sent().is_empty());
}

#[rstest]
#[case("low", Template::RaParamsLowQuality, Template::RegisterSetLowQuality)]
#[case("Medium", Template::RaParamsMediumQuality, Template::RegisterSetMediumQuality)]
#[case("HIGH", Template::RaParamsHighQuality, Template::RegisterSetHighQuality)]
#[case("insane", Template::RaParamsInsaneQuality, Template::RegisterSetInsaneQuality)]
#[tokio::test]
async fn quality_sends_ra_params_then_register_set(
    #[case] quality: &str,
    #[case] ra_params: Template,
    #[case] register_set: Template,
) {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    camera
        .commands(channel.as_ref())
        .set_quality(&json!({"quality": quality}))
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].message, ra_params.build());
    assert_eq!(sent[1].message, register_set.build());
    assert!(sent.iter().all(|s| s.ip == "10.0.0.2" && s.port == 4000));
}

#[rstest]
#[case("low", Template::RegisterSetLowQualityFloodlight)]
#[case("medium", Template::RegisterSetMediumQualityFloodlight)]
#[case("high", Template::RegisterSetHighQualityFloodlight)]
#[case("subscription", Template::RegisterSetHighQualityFloodlight)]
#[case("insane", Template::RegisterSetHighQualityFloodlight)]
#[tokio::test]
async fn floodlight_uses_shared_ra_params(#[case] quality: &str, #[case] register_set: Template) {
    let channel = RecordingChannel::new();
    let floodlight = device("10.0.0.3", "S2", "FB1001");

    floodlight
        .commands(channel.as_ref())
        .set_quality(&json!({"quality": quality}))
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(sent[0].message, Template::RaParamsFloodlight.build());
    assert_eq!(sent[1].message, register_set.build());
}

#[tokio::test]
async fn quality_fails_when_second_command_fails() {
    let channel = RecordingChannel::failing_after(1);
    let camera = device("10.0.0.2", "S1", "VMC4030");

    let result = camera
        .commands(channel.as_ref())
        .set_quality(&json!({"quality": "low"}))
        .await;

    assert!(matches!(result, Err(GatewayError::CommandTransmission { .. })));
    assert_eq!(channel.types(), vec!["raParams"]);
}

#[tokio::test]
async fn arm_fills_defaults() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    camera
        .commands(channel.as_ref())
        .arm(&json!({"PIRTargetState": "Armed", "PIRStartSensitivity": 0, "PIRAction": ""}))
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    let values = sent[0].message.set_values().unwrap();
    assert_eq!(values["PIRTargetState"], "Armed");
    assert_eq!(values["PIRStartSensitivity"], 80);
    assert_eq!(values["PIRAction"], "Stream");
    assert_eq!(values["VideoMotionEstimationEnable"], false);
    assert_eq!(values["VideoMotionSensitivity"], 80);
    assert_eq!(values["AudioTargetState"], "Disarmed");
    assert_eq!(values["DefaultMotionStreamTimeLimit"], 10);
}

#[tokio::test]
async fn arm_keeps_supplied_values() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    camera
        .commands(channel.as_ref())
        .arm(&json!({
            "PIRTargetState": "Disarmed",
            "PIRStartSensitivity": 50,
            "AudioTargetState": "Armed"
        }))
        .await
        .unwrap();

    let values = channel.sent()[0].message.set_values().unwrap().clone();
    assert_eq!(values["PIRStartSensitivity"], 50);
    assert_eq!(values["AudioTargetState"], "Armed");
}

#[tokio::test]
async fn arm_requires_target_state() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    let result = camera.commands(channel.as_ref()).arm(&json!({})).await;

    assert!(matches!(result, Err(GatewayError::Validation(_))));
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn camera_register_writes() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");
    let commands = camera.commands(channel.as_ref());

    commands
        .pir_led(&json!({"enabled": true, "sensitivity": 40}))
        .await
        .unwrap();
    commands
        .night_mode_light_source_alert(&json!({"enabled": true}))
        .await
        .unwrap();
    commands.video_flip(&json!({"enabled": true})).await.unwrap();
    commands.video_mirror(&json!({"enabled": false})).await.unwrap();
    commands.night_mode_grey(&json!({"value": 2})).await.unwrap();
    commands.set_user_stream_active(true).await.unwrap();

    let values: Vec<Map<String, Value>> = channel
        .sent()
        .iter()
        .map(|s| s.message.set_values().unwrap().clone())
        .collect();
    assert_eq!(values[0]["PIREnableLED"], true);
    assert_eq!(values[0]["PIRLEDSensitivity"], 40);
    assert_eq!(values[1]["NightModeLightSourceAlert"], 1);
    assert_eq!(values[2]["VideoFlip"], true);
    assert_eq!(values[3]["VideoMirror"], false);
    assert_eq!(values[4]["NightModeGrey"], 2);
    assert_eq!(values[5]["UserStreamActive"], 1);
}

#[tokio::test]
async fn snapshot_carries_destination() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    camera
        .commands(channel.as_ref())
        .snapshot_request("http://gateway/snapshot/S1")
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(sent[0].message.get_str("Type"), Some("fullSnapshot"));
    assert_eq!(
        sent[0].message.get_str("DestinationURL"),
        Some("http://gateway/snapshot/S1")
    );
}

#[tokio::test]
async fn update_settings_requires_object() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    let result = camera
        .commands(channel.as_ref())
        .update_settings(&json!({"settings": "VideoFlip"}))
        .await;
    assert!(matches!(result, Err(GatewayError::Validation(_))));
    assert!(channel.sent().is_empty());

    camera
        .commands(channel.as_ref())
        .update_settings(&json!({"settings": {"VideoFlip": true}}))
        .await
        .unwrap();
    assert_eq!(
        channel.sent()[0].message.set_values().unwrap()["VideoFlip"],
        true
    );
}

#[tokio::test]
async fn generic_device_rejects_camera_operations() {
    let channel = RecordingChannel::new();
    let doorbell = device("10.0.0.4", "D1", "AVD1001");
    let commands = doorbell.commands(channel.as_ref());

    let results = vec![
        commands.set_quality(&json!({"quality": "low"})).await,
        commands.video_flip(&json!({"enabled": true})).await,
        commands.snapshot_request("http://x").await,
        commands.set_activity_zones(&json!({})).await,
        commands.unset_activity_zones().await,
        commands.mic_request(true).await,
    ];

    for result in results {
        assert!(matches!(
            result,
            Err(GatewayError::UnsupportedOperation { ref serial, .. }) if serial == "D1"
        ));
    }
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn generic_device_uses_device_port() {
    let channel = RecordingChannel::new();
    let doorbell = device("10.0.0.4", "D1", "AVD1001");
    let commands = doorbell.commands(channel.as_ref());

    commands.status_request().await.unwrap();
    commands
        .register_set(&json!({"ChimeVolume": 3}))
        .await
        .unwrap();
    commands
        .arm(&json!({"PIRTargetState": "Armed"}))
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|s| s.port == 4100));
    assert_eq!(sent[0].message.get_str("Type"), Some("statusRequest"));
    assert_eq!(sent[1].message.set_values().unwrap()["ChimeVolume"], 3);
}

#[tokio::test]
async fn send_raw_rejects_non_object() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");

    let result = camera.commands(channel.as_ref()).send_raw(&json!([1, 2])).await;
    assert!(matches!(result, Err(GatewayError::Validation(_))));

    camera
        .commands(channel.as_ref())
        .send_raw(&json!({"Type": "custom", "Value": 1}))
        .await
        .unwrap();
    assert_eq!(channel.types(), vec!["custom"]);
}

#[tokio::test]
async fn epoch_time_is_current() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.2", "S1", "VMC4030");
    let before = chrono::Utc::now().timestamp();

    camera.commands(channel.as_ref()).send_epoch_time().await.unwrap();

    let sent = channel.sent();
    let epoch = sent[0].message.get("EpochBSTime").and_then(Value::as_i64).unwrap();
    assert!(epoch >= before);
}

#[tokio::test]
async fn initial_setup_for_standard_camera() {
    let channel = RecordingChannel::new();
    let camera = device("192.168.1.50", "ABC123", "VMC4030");

    camera
        .commands(channel.as_ref())
        .send_initial_register_set("US", 60, "default", None)
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(
        channel.types(),
        vec!["registerSet", "registerSet", "raParams", "registerSet"]
    );
    assert_eq!(sent[0].message.set_values().unwrap()["PIRTargetState"], "Armed");
    let initial = sent[1].message.set_values().unwrap();
    assert_eq!(initial["WifiCountryCode"], "US");
    assert_eq!(initial["VideoAntiFlickerRate"], 60);
    assert_eq!(sent[2].message, Template::RaParamsInsaneQuality.build());
    assert_eq!(sent[3].message, Template::RegisterSetInsaneQuality.build());
}

#[tokio::test]
async fn initial_setup_applies_device_settings() {
    let channel = RecordingChannel::new();
    let camera = device("192.168.1.50", "ABC123", "VMC4030");
    let settings = json!({"VideoQuality": "low", "VideoMirror": true});

    camera
        .commands(channel.as_ref())
        .send_initial_register_set("GB", 50, "default", settings.as_object())
        .await
        .unwrap();

    let sent = channel.sent();
    let initial = sent[1].message.set_values().unwrap();
    assert_eq!(initial["WifiCountryCode"], "GB");
    assert_eq!(initial["VideoMirror"], true);
    assert!(!initial.contains_key("VideoQuality"));
    assert_eq!(sent[2].message, Template::RaParamsLowQuality.build());
}

#[tokio::test]
async fn initial_setup_for_ultra_skips_arm() {
    let channel = RecordingChannel::new();
    let camera = device("10.0.0.8", "U1", "VMC5040");

    camera
        .commands(channel.as_ref())
        .send_initial_register_set("US", 60, "high", None)
        .await
        .unwrap();

    assert_eq!(channel.types(), vec!["registerSet", "raParams", "registerSet"]);
    let sent = channel.sent();
    assert_eq!(sent[1].message, Template::RaParamsHighQuality.build());
}

#[tokio::test]
async fn initial_setup_for_generic_device() {
    let channel = RecordingChannel::new();
    let doorbell = device("10.0.0.4", "D1", "AVD1001");

    doorbell
        .commands(channel.as_ref())
        .send_initial_register_set("US", 60, "default", None)
        .await
        .unwrap();

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].port, 4100);
    assert_eq!(sent[0].message.set_values().unwrap()["WifiCountryCode"], "US");
}

#[tokio::test]
async fn commands_to_unknown_ip_are_still_attempted() {
    let channel = RecordingChannel::new();
    let camera = device(UNKNOWN_IP, "S1", "VMC4030");

    camera.commands(channel.as_ref()).status_request().await.unwrap();

    assert_eq!(channel.sent()[0].ip, UNKNOWN_IP);
}
