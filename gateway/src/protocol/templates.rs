//! 命令报文模板
//!
//! 每次调用 [`Template::build`] 都会生成一份全新的可变报文，
//! 调用方随意修改也不会影响默认值。

use serde_json::{json, Value};

use super::Message;

/// 命令模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Response,
    RegisterSet,
    RegisterSetInitialSubscription,
    RegisterSetInitialUltra,
    RegisterSetInitialFloodlight,
    RaParamsLowQuality,
    RaParamsMediumQuality,
    RaParamsHighQuality,
    RaParamsSubscriptionQuality,
    RaParamsInsaneQuality,
    RaParamsFloodlight,
    RegisterSetLowQuality,
    RegisterSetMediumQuality,
    RegisterSetHighQuality,
    RegisterSetSubscriptionQuality,
    RegisterSetInsaneQuality,
    RegisterSetLowQualityFloodlight,
    RegisterSetMediumQualityFloodlight,
    RegisterSetHighQualityFloodlight,
    ActivityZoneAll,
    ActivityZoneDelete,
    Snapshot,
    StatusRequest,
    EpochBsTime,
    AudioMic,
    AudioSpeaker,
}

impl Template {
    pub fn build(self) -> Message {
        let value = match self {
            Self::Response => json!({"Type": "response", "ID": 0, "Response": "Ack"}),
            Self::RegisterSet => register_set(json!({})),
            Self::RegisterSetInitialSubscription => register_set(json!({
                "VideoExposureCompensation": 0,
                "VideoMirror": false,
                "VideoFlip": false,
                "VideoWindowStartX": 0,
                "VideoWindowStartY": 0,
                "VideoWindowEndX": 1280,
                "VideoWindowEndY": 720,
                "MaxMissedBeaconTime": 10,
                "MaxStreamTimeLimit": 1800,
                "VideoAntiFlickerRate": 50,
                "WifiCountryCode": "US",
                "NightVisionMode": true,
                "HdrControl": "auto",
                "MaxUserStreamTimeLimit": 1800,
                "MaxMotionStreamTimeLimit": 120,
                "VideoTargetBitrate": 1500,
                "ChargeNotificationLed": 1,
                "AudioMicAGCOn": 1,
                "AudioSpkrEnable": true,
                "AudioMicEnable": true
            })),
            Self::RegisterSetInitialUltra => register_set(json!({
                "VideoExposureCompensation": 0,
                "VideoMirror": false,
                "VideoFlip": false,
                "VideoWindowStartX": 0,
                "VideoWindowStartY": 0,
                "VideoWindowEndX": 3840,
                "VideoWindowEndY": 2160,
                "MaxMissedBeaconTime": 10,
                "MaxStreamTimeLimit": 1800,
                "VideoAntiFlickerRate": 50,
                "WifiCountryCode": "US",
                "NightVisionMode": true,
                "HdrControl": "auto",
                "MaxUserStreamTimeLimit": 1800,
                "MaxMotionStreamTimeLimit": 120,
                "VideoOutputResolution": "2160p",
                "Spotlight": {"Enabled": false, "Intensity": 100},
                "AudioMicAGCOn": 1,
                "AudioSpkrEnable": true,
                "AudioMicEnable": true
            })),
            Self::RegisterSetInitialFloodlight => register_set(json!({
                "VideoExposureCompensation": 0,
                "VideoMirror": false,
                "VideoFlip": false,
                "VideoWindowStartX": 0,
                "VideoWindowStartY": 0,
                "VideoWindowEndX": 2560,
                "VideoWindowEndY": 1440,
                "MaxMissedBeaconTime": 10,
                "MaxStreamTimeLimit": 1800,
                "VideoAntiFlickerRate": 50,
                "WifiCountryCode": "US",
                "NightVisionMode": true,
                "HdrControl": "auto",
                "MaxUserStreamTimeLimit": 1800,
                "MaxMotionStreamTimeLimit": 120,
                "Floodlight": {"Enabled": true, "Brightness": 255, "Duration": 30},
                "AudioSpkrEnable": true,
                "AudioMicEnable": true
            })),
            Self::RaParamsLowQuality => ra_params(&[
                ("1080p", 300_000, 500_000, 400_000),
                ("720p", 200_000, 400_000, 300_000),
                ("480p", 100_000, 300_000, 200_000),
            ]),
            Self::RaParamsMediumQuality => ra_params(&[
                ("1080p", 500_000, 1_000_000, 800_000),
                ("720p", 400_000, 800_000, 600_000),
                ("480p", 200_000, 500_000, 350_000),
            ]),
            Self::RaParamsHighQuality => ra_params(&[
                ("1080p", 1_000_000, 2_000_000, 1_500_000),
                ("720p", 800_000, 1_500_000, 1_100_000),
                ("480p", 400_000, 800_000, 600_000),
            ]),
            Self::RaParamsSubscriptionQuality => ra_params(&[
                ("1080p", 1_500_000, 3_000_000, 2_200_000),
                ("720p", 1_000_000, 2_000_000, 1_500_000),
                ("480p", 500_000, 1_000_000, 750_000),
            ]),
            Self::RaParamsInsaneQuality => ra_params(&[
                ("1080p", 3_000_000, 6_000_000, 4_500_000),
                ("720p", 2_000_000, 4_000_000, 3_000_000),
                ("480p", 1_000_000, 2_000_000, 1_500_000),
            ]),
            Self::RaParamsFloodlight => ra_params(&[
                ("1440p", 1_500_000, 4_000_000, 2_500_000),
                ("1080p", 1_000_000, 3_000_000, 2_000_000),
                ("720p", 500_000, 1_500_000, 1_000_000),
            ]),
            Self::RegisterSetLowQuality => quality_register_set("480p", 500, 20),
            Self::RegisterSetMediumQuality => quality_register_set("720p", 1000, 24),
            Self::RegisterSetHighQuality => quality_register_set("1080p", 2000, 24),
            Self::RegisterSetSubscriptionQuality => quality_register_set("1080p", 3000, 24),
            Self::RegisterSetInsaneQuality => quality_register_set("1080p", 6000, 30),
            Self::RegisterSetLowQualityFloodlight => quality_register_set("720p", 1000, 20),
            Self::RegisterSetMediumQualityFloodlight => quality_register_set("1080p", 2000, 24),
            Self::RegisterSetHighQualityFloodlight => quality_register_set("1440p", 4000, 24),
            Self::ActivityZoneAll => json!({
                "Type": "activityZones",
                "ID": 0,
                "ActivityZones": [{
                    "id": 0,
                    "name": "All",
                    "coords": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
                    "sensitivity": 80
                }]
            }),
            Self::ActivityZoneDelete => json!({
                "Type": "activityZones",
                "ID": 0,
                "ActivityZones": []
            }),
            Self::Snapshot => json!({
                "Type": "fullSnapshot",
                "ID": 0,
                "DestinationURL": ""
            }),
            Self::StatusRequest => json!({"Type": "statusRequest", "ID": 0}),
            Self::EpochBsTime => json!({"Type": "epochBSTime", "ID": 0, "EpochBSTime": 0}),
            Self::AudioMic => json!({"Type": "audioMicRequest", "ID": 0, "Enable": false}),
            Self::AudioSpeaker => json!({"Type": "audioSpkrRequest", "ID": 0, "Enable": false}),
        };

        match value {
            Value::Object(map) => Message::from_map(map),
            _ => Message::new(),
        }
    }
}

fn register_set(values: Value) -> Value {
    json!({"Type": "registerSet", "ID": 0, "SetValues": values})
}

fn quality_register_set(resolution: &str, target_bitrate_kbps: u32, frame_rate: u32) -> Value {
    register_set(json!({
        "VideoOutputResolution": resolution,
        "VideoTargetBitrate": target_bitrate_kbps,
        "VideoFrameRate": frame_rate,
        "VideoQualityControl": "Auto"
    }))
}

/// `raParams`：每个分辨率的码率区间
fn ra_params(levels: &[(&str, u32, u32, u32)]) -> Value {
    let mut params = serde_json::Map::new();
    for (resolution, min_bps, max_bps, target_bps) in levels {
        params.insert(
            resolution.to_string(),
            json!({
                "minbps": min_bps,
                "maxbps": max_bps,
                "targetbps": target_bps,
                "minQP": 24,
                "maxQP": 38,
                "vbr": true
            }),
        );
    }
    json!({"Type": "raParams", "ID": 0, "Params": params})
}
