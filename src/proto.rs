//! Message definitions for the interval-stats protobuf written by Android 10
//! (`usagestatsservice.proto`).
//!
//! Only the fields this crate reads are declared, prost skips the rest while decoding.
#![allow(clippy::derive_partial_eq_without_eq)]

use prost::Message;
use serde::Serialize;

#[derive(Clone, PartialEq, Serialize, Message)]
pub struct IntervalStatsProto {
    #[prost(int64, optional, tag = "1")]
    pub end_time_ms: Option<i64>,
    #[prost(message, optional, tag = "2")]
    pub stringpool: Option<StringPool>,
    #[prost(int32, optional, tag = "3")]
    pub major_version: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub minor_version: Option<i32>,
    #[prost(message, repeated, tag = "20")]
    pub packages: Vec<UsageStats>,
    #[prost(message, repeated, tag = "21")]
    pub configurations: Vec<Configuration>,
    #[prost(message, repeated, tag = "22")]
    pub event_log: Vec<Event>,
}

/// Strings shared by every entry of the interval, referenced by 1-based index.
#[derive(Clone, PartialEq, Serialize, Message)]
pub struct StringPool {
    #[prost(int32, optional, tag = "1")]
    pub size: Option<i32>,
    #[prost(string, repeated, tag = "2")]
    pub strings: Vec<String>,
}

#[derive(Clone, PartialEq, Serialize, Message)]
pub struct UsageStats {
    #[prost(string, optional, tag = "1")]
    pub package: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub package_index: Option<i32>,
    #[prost(int64, optional, tag = "3")]
    pub last_time_active_ms: Option<i64>,
    #[prost(int64, optional, tag = "4")]
    pub total_time_active_ms: Option<i64>,
    #[prost(int32, optional, tag = "5")]
    pub last_event: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub app_launch_count: Option<i32>,
    #[prost(int64, optional, tag = "8")]
    pub last_time_service_used_ms: Option<i64>,
    #[prost(int64, optional, tag = "9")]
    pub total_time_service_used_ms: Option<i64>,
    #[prost(int64, optional, tag = "10")]
    pub last_time_visible_ms: Option<i64>,
    #[prost(int64, optional, tag = "11")]
    pub total_time_visible_ms: Option<i64>,
}

#[derive(Clone, PartialEq, Serialize, Message)]
pub struct Configuration {
    #[prost(message, optional, tag = "1")]
    pub config: Option<ConfigurationProto>,
    #[prost(int64, optional, tag = "2")]
    pub last_time_active_ms: Option<i64>,
    #[prost(int64, optional, tag = "3")]
    pub total_time_active_ms: Option<i64>,
    #[prost(int32, optional, tag = "4")]
    pub count: Option<i32>,
    #[prost(bool, optional, tag = "5")]
    pub active: Option<bool>,
}

#[derive(Clone, PartialEq, Serialize, Message)]
pub struct Event {
    #[prost(string, optional, tag = "1")]
    pub package: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub package_index: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub class: Option<String>,
    #[prost(int32, optional, tag = "4")]
    pub class_index: Option<i32>,
    #[prost(int64, optional, tag = "5")]
    pub time_ms: Option<i64>,
    #[prost(int32, optional, tag = "6")]
    pub flags: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub r#type: Option<i32>,
    #[prost(message, optional, tag = "8")]
    pub config: Option<ConfigurationProto>,
    #[prost(string, optional, tag = "9")]
    pub shortcut_id: Option<String>,
}

/// `android.content.res.Configuration`, as dumped by `ConfigurationProto`.
#[derive(Clone, PartialEq, Serialize, Message)]
pub struct ConfigurationProto {
    #[prost(float, optional, tag = "1")]
    pub font_scale: Option<f32>,
    #[prost(uint32, optional, tag = "2")]
    pub mcc: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub mnc: Option<u32>,
    #[prost(message, repeated, tag = "4")]
    pub locales: Vec<LocaleProto>,
    #[prost(uint32, optional, tag = "5")]
    pub screen_layout: Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub color_mode: Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub touchscreen: Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub keyboard: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub keyboard_hidden: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub hard_keyboard_hidden: Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub navigation: Option<u32>,
    #[prost(uint32, optional, tag = "12")]
    pub navigation_hidden: Option<u32>,
    #[prost(uint32, optional, tag = "13")]
    pub orientation: Option<u32>,
    #[prost(uint32, optional, tag = "14")]
    pub ui_mode: Option<u32>,
    #[prost(uint32, optional, tag = "15")]
    pub screen_width_dp: Option<u32>,
    #[prost(uint32, optional, tag = "16")]
    pub screen_height_dp: Option<u32>,
    #[prost(uint32, optional, tag = "17")]
    pub smallest_screen_width_dp: Option<u32>,
    #[prost(uint32, optional, tag = "18")]
    pub density_dpi: Option<u32>,
    #[prost(string, optional, tag = "20")]
    pub locale_list: Option<String>,
}

#[derive(Clone, PartialEq, Serialize, Message)]
pub struct LocaleProto {
    #[prost(string, optional, tag = "1")]
    pub language: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub country: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub variant: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub script: Option<String>,
}

impl IntervalStatsProto {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        IntervalStatsProto::decode(bytes)
    }

    pub fn strings(&self) -> &[String] {
        self.stringpool
            .as_ref()
            .map(|pool| pool.strings.as_slice())
            .unwrap_or(&[])
    }
}
