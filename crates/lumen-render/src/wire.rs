// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire shapes of image, calibration and annotation messages.
//!
//! Each family is a closed enum over the schemas the renderer accepts.
//! Messages arrive decoded as JSON-like values and are deserialized with
//! serde; ROS 1 and ROS 2 field spellings are both accepted.

use lumen_player::Time;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Wire decoding errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

pub const ROS_IMAGE_SCHEMAS: &[&str] = &["sensor_msgs/Image", "sensor_msgs/msg/Image"];
pub const ROS_COMPRESSED_IMAGE_SCHEMAS: &[&str] = &[
    "sensor_msgs/CompressedImage",
    "sensor_msgs/msg/CompressedImage",
];
pub const RAW_IMAGE_SCHEMAS: &[&str] = &[
    "foxglove.RawImage",
    "foxglove_msgs/RawImage",
    "foxglove_msgs/msg/RawImage",
];
pub const COMPRESSED_IMAGE_SCHEMAS: &[&str] = &[
    "foxglove.CompressedImage",
    "foxglove_msgs/CompressedImage",
    "foxglove_msgs/msg/CompressedImage",
];
pub const ROS_CAMERA_INFO_SCHEMAS: &[&str] =
    &["sensor_msgs/CameraInfo", "sensor_msgs/msg/CameraInfo"];
pub const CAMERA_CALIBRATION_SCHEMAS: &[&str] = &[
    "foxglove.CameraCalibration",
    "foxglove_msgs/CameraCalibration",
    "foxglove_msgs/msg/CameraCalibration",
];
pub const IMAGE_ANNOTATIONS_SCHEMAS: &[&str] = &[
    "foxglove.ImageAnnotations",
    "foxglove_msgs/ImageAnnotations",
    "foxglove_msgs/msg/ImageAnnotations",
];
pub const ROS_IMAGE_MARKER_SCHEMAS: &[&str] = &[
    "visualization_msgs/ImageMarker",
    "visualization_msgs/msg/ImageMarker",
];
pub const ROS_IMAGE_MARKER_ARRAY_SCHEMAS: &[&str] = &[
    "foxglove_msgs/ImageMarkerArray",
    "foxglove_msgs/msg/ImageMarkerArray",
    "studio_msgs/ImageMarkerArray",
    "webviz_msgs/ImageMarkerArray",
];

fn is_one_of(schema_name: &str, schemas: &[&str]) -> bool {
    schemas.contains(&schema_name)
}

/// ROS arrays of `uint8` sometimes arrive as `null` for empty payloads.
fn bytes_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    Ok(Option::<Vec<u8>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `std_msgs/Header`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub stamp: Time,
    #[serde(default)]
    pub frame_id: String,
}

/// `sensor_msgs/Image`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosImage {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub encoding: String,
    #[serde(default)]
    pub is_bigendian: u8,
    pub step: u32,
    #[serde(default, deserialize_with = "bytes_or_empty")]
    pub data: Vec<u8>,
}

/// `sensor_msgs/CompressedImage`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosCompressedImage {
    pub header: Header,
    pub format: String,
    #[serde(default, deserialize_with = "bytes_or_empty")]
    pub data: Vec<u8>,
}

/// `foxglove.RawImage`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawImage {
    pub timestamp: Time,
    #[serde(default)]
    pub frame_id: String,
    pub width: u32,
    pub height: u32,
    pub encoding: String,
    pub step: u32,
    #[serde(default, deserialize_with = "bytes_or_empty")]
    pub data: Vec<u8>,
}

/// `foxglove.CompressedImage`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompressedImage {
    pub timestamp: Time,
    #[serde(default)]
    pub frame_id: String,
    pub format: String,
    #[serde(default, deserialize_with = "bytes_or_empty")]
    pub data: Vec<u8>,
}

/// Any accepted image message.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageMessage {
    Ros(RosImage),
    RosCompressed(RosCompressedImage),
    Raw(RawImage),
    Compressed(CompressedImage),
}

impl ImageMessage {
    /// Check if a schema is an image schema.
    pub fn accepts(schema_name: &str) -> bool {
        is_one_of(schema_name, ROS_IMAGE_SCHEMAS)
            || is_one_of(schema_name, ROS_COMPRESSED_IMAGE_SCHEMAS)
            || is_one_of(schema_name, RAW_IMAGE_SCHEMAS)
            || is_one_of(schema_name, COMPRESSED_IMAGE_SCHEMAS)
    }

    /// Decode a message of the given schema.
    pub fn decode(schema_name: &str, value: &Value) -> Result<Self, DecodeError> {
        if is_one_of(schema_name, ROS_IMAGE_SCHEMAS) {
            Ok(Self::Ros(RosImage::deserialize(value)?))
        } else if is_one_of(schema_name, ROS_COMPRESSED_IMAGE_SCHEMAS) {
            Ok(Self::RosCompressed(RosCompressedImage::deserialize(value)?))
        } else if is_one_of(schema_name, RAW_IMAGE_SCHEMAS) {
            Ok(Self::Raw(RawImage::deserialize(value)?))
        } else if is_one_of(schema_name, COMPRESSED_IMAGE_SCHEMAS) {
            Ok(Self::Compressed(CompressedImage::deserialize(value)?))
        } else {
            Err(DecodeError::UnsupportedSchema(schema_name.to_string()))
        }
    }
}

/// `sensor_msgs/CameraInfo`. ROS 1 uses upper-case matrix names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosCameraInfo {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    #[serde(default)]
    pub distortion_model: String,
    #[serde(default, alias = "D")]
    pub d: Vec<f64>,
    #[serde(default, alias = "K")]
    pub k: Vec<f64>,
    #[serde(default, alias = "R")]
    pub r: Vec<f64>,
    #[serde(default, alias = "P")]
    pub p: Vec<f64>,
}

/// `foxglove.CameraCalibration`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraCalibrationMessage {
    pub timestamp: Time,
    #[serde(default)]
    pub frame_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub distortion_model: String,
    #[serde(default, rename = "D")]
    pub d: Vec<f64>,
    #[serde(default, rename = "K")]
    pub k: Vec<f64>,
    #[serde(default, rename = "R")]
    pub r: Vec<f64>,
    #[serde(default, rename = "P")]
    pub p: Vec<f64>,
}

/// Any accepted calibration message.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationMessage {
    Ros(RosCameraInfo),
    Foxglove(CameraCalibrationMessage),
}

impl CalibrationMessage {
    /// Check if a schema is a calibration schema.
    pub fn accepts(schema_name: &str) -> bool {
        is_one_of(schema_name, ROS_CAMERA_INFO_SCHEMAS)
            || is_one_of(schema_name, CAMERA_CALIBRATION_SCHEMAS)
    }

    /// Decode a message of the given schema.
    pub fn decode(schema_name: &str, value: &Value) -> Result<Self, DecodeError> {
        if is_one_of(schema_name, ROS_CAMERA_INFO_SCHEMAS) {
            Ok(Self::Ros(RosCameraInfo::deserialize(value)?))
        } else if is_one_of(schema_name, CAMERA_CALIBRATION_SCHEMAS) {
            Ok(Self::Foxglove(CameraCalibrationMessage::deserialize(value)?))
        } else {
            Err(DecodeError::UnsupportedSchema(schema_name.to_string()))
        }
    }
}

/// `foxglove.Point2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct WirePoint2 {
    pub x: f64,
    pub y: f64,
}

/// `foxglove.Color` / `std_msgs/ColorRGBA`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct WireColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

/// `foxglove.CircleAnnotation`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CircleAnnotation {
    pub timestamp: Time,
    pub position: WirePoint2,
    pub diameter: f64,
    #[serde(default)]
    pub thickness: f64,
    #[serde(default)]
    pub fill_color: Option<WireColor>,
    #[serde(default)]
    pub outline_color: Option<WireColor>,
}

/// `foxglove.PointsAnnotation`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointsAnnotation {
    pub timestamp: Time,
    /// 1 = points, 2 = line loop, 3 = line strip, 4 = line list.
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub points: Vec<WirePoint2>,
    #[serde(default)]
    pub outline_color: Option<WireColor>,
    #[serde(default)]
    pub outline_colors: Vec<WireColor>,
    #[serde(default)]
    pub fill_color: Option<WireColor>,
    #[serde(default)]
    pub thickness: f64,
}

/// `foxglove.TextAnnotation`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextAnnotation {
    pub timestamp: Time,
    pub position: WirePoint2,
    pub text: String,
    #[serde(default)]
    pub font_size: f64,
    #[serde(default)]
    pub text_color: Option<WireColor>,
    #[serde(default)]
    pub background_color: Option<WireColor>,
}

/// `foxglove.ImageAnnotations`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageAnnotations {
    #[serde(default)]
    pub circles: Vec<CircleAnnotation>,
    #[serde(default)]
    pub points: Vec<PointsAnnotation>,
    #[serde(default)]
    pub texts: Vec<TextAnnotation>,
}

/// `geometry_msgs/Point`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RosPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

pub const IMAGE_MARKER_CIRCLE: i32 = 0;
pub const IMAGE_MARKER_LINE_STRIP: i32 = 1;
pub const IMAGE_MARKER_LINE_LIST: i32 = 2;
pub const IMAGE_MARKER_POLYGON: i32 = 3;
pub const IMAGE_MARKER_POINTS: i32 = 4;
pub const IMAGE_MARKER_ADD: i32 = 0;

/// `visualization_msgs/ImageMarker`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosImageMarker {
    pub header: Header,
    #[serde(default)]
    pub ns: String,
    #[serde(default)]
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(default)]
    pub action: i32,
    #[serde(default)]
    pub position: RosPoint,
    #[serde(default)]
    pub scale: f64,
    #[serde(default)]
    pub outline_color: WireColor,
    #[serde(default)]
    pub filled: u8,
    #[serde(default)]
    pub fill_color: WireColor,
    #[serde(default)]
    pub points: Vec<RosPoint>,
    #[serde(default)]
    pub outline_colors: Vec<WireColor>,
}

/// `foxglove_msgs/ImageMarkerArray`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RosImageMarkerArray {
    #[serde(default)]
    pub markers: Vec<RosImageMarker>,
}

/// Any accepted annotation message.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationMessage {
    Foxglove(ImageAnnotations),
    RosMarker(RosImageMarker),
    RosMarkerArray(RosImageMarkerArray),
}

impl AnnotationMessage {
    /// Check if a schema is an annotation schema.
    pub fn accepts(schema_name: &str) -> bool {
        is_one_of(schema_name, IMAGE_ANNOTATIONS_SCHEMAS)
            || is_one_of(schema_name, ROS_IMAGE_MARKER_SCHEMAS)
            || is_one_of(schema_name, ROS_IMAGE_MARKER_ARRAY_SCHEMAS)
    }

    /// Decode a message of the given schema.
    pub fn decode(schema_name: &str, value: &Value) -> Result<Self, DecodeError> {
        if is_one_of(schema_name, IMAGE_ANNOTATIONS_SCHEMAS) {
            Ok(Self::Foxglove(ImageAnnotations::deserialize(value)?))
        } else if is_one_of(schema_name, ROS_IMAGE_MARKER_SCHEMAS) {
            Ok(Self::RosMarker(RosImageMarker::deserialize(value)?))
        } else if is_one_of(schema_name, ROS_IMAGE_MARKER_ARRAY_SCHEMAS) {
            Ok(Self::RosMarkerArray(RosImageMarkerArray::deserialize(value)?))
        } else {
            Err(DecodeError::UnsupportedSchema(schema_name.to_string()))
        }
    }
}
