// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical image, calibration and annotation shapes.
//!
//! Every wire variant converges on one of the types here; the message
//! handler never looks at wire shapes.

use crate::wire::{
    AnnotationMessage, CalibrationMessage, ImageMessage, RosImageMarker, RosPoint, WireColor,
    WirePoint2, IMAGE_MARKER_ADD, IMAGE_MARKER_CIRCLE, IMAGE_MARKER_LINE_LIST,
    IMAGE_MARKER_LINE_STRIP, IMAGE_MARKER_POINTS, IMAGE_MARKER_POLYGON,
};
use lumen_player::Time;
use serde::Serialize;

/// RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl From<WireColor> for Color {
    fn from(c: WireColor) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl From<WirePoint2> for Point2 {
    fn from(p: WirePoint2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<RosPoint> for Point2 {
    fn from(p: RosPoint) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Image pixel payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageData {
    Raw {
        width: u32,
        height: u32,
        encoding: String,
        step: u32,
        is_bigendian: bool,
        data: Vec<u8>,
    },
    Compressed {
        format: String,
        data: Vec<u8>,
    },
}

/// An image in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedImage {
    pub stamp: Time,
    pub frame_id: String,
    pub data: ImageData,
}

impl From<ImageMessage> for NormalizedImage {
    fn from(message: ImageMessage) -> Self {
        match message {
            ImageMessage::Ros(img) => Self {
                stamp: img.header.stamp,
                frame_id: img.header.frame_id,
                data: ImageData::Raw {
                    width: img.width,
                    height: img.height,
                    encoding: img.encoding,
                    step: img.step,
                    is_bigendian: img.is_bigendian != 0,
                    data: img.data,
                },
            },
            ImageMessage::RosCompressed(img) => Self {
                stamp: img.header.stamp,
                frame_id: img.header.frame_id,
                data: ImageData::Compressed {
                    format: img.format,
                    data: img.data,
                },
            },
            ImageMessage::Raw(img) => Self {
                stamp: img.timestamp,
                frame_id: img.frame_id,
                data: ImageData::Raw {
                    width: img.width,
                    height: img.height,
                    encoding: img.encoding,
                    step: img.step,
                    is_bigendian: false,
                    data: img.data,
                },
            },
            ImageMessage::Compressed(img) => Self {
                stamp: img.timestamp,
                frame_id: img.frame_id,
                data: ImageData::Compressed {
                    format: img.format,
                    data: img.data,
                },
            },
        }
    }
}

/// Camera intrinsics in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraCalibration {
    pub stamp: Time,
    pub frame_id: String,
    pub width: u32,
    pub height: u32,
    pub distortion_model: String,
    pub d: Vec<f64>,
    pub k: Vec<f64>,
    pub r: Vec<f64>,
    pub p: Vec<f64>,
}

impl From<CalibrationMessage> for CameraCalibration {
    fn from(message: CalibrationMessage) -> Self {
        match message {
            CalibrationMessage::Ros(info) => Self {
                stamp: info.header.stamp,
                frame_id: info.header.frame_id,
                width: info.width,
                height: info.height,
                distortion_model: info.distortion_model,
                d: info.d,
                k: info.k,
                r: info.r,
                p: info.p,
            },
            CalibrationMessage::Foxglove(cal) => Self {
                stamp: cal.timestamp,
                frame_id: cal.frame_id,
                width: cal.width,
                height: cal.height,
                distortion_model: cal.distortion_model,
                d: cal.d,
                k: cal.k,
                r: cal.r,
                p: cal.p,
            },
        }
    }
}

/// How a point list is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsStyle {
    Points,
    LineLoop,
    LineStrip,
    LineList,
}

impl PointsStyle {
    fn from_foxglove(kind: u8) -> Option<Self> {
        match kind {
            1 => Some(Self::Points),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::LineList),
            _ => None,
        }
    }
}

/// A single image annotation in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    Circle {
        stamp: Time,
        position: Point2,
        radius: f64,
        thickness: f64,
        fill_color: Option<Color>,
        outline_color: Option<Color>,
    },
    Points {
        stamp: Time,
        style: PointsStyle,
        points: Vec<Point2>,
        outline_color: Option<Color>,
        outline_colors: Vec<Color>,
        fill_color: Option<Color>,
        thickness: f64,
    },
    Text {
        stamp: Time,
        position: Point2,
        text: String,
        font_size: f64,
        text_color: Option<Color>,
        background_color: Option<Color>,
    },
}

impl Annotation {
    /// Timestamp carried by this annotation.
    pub fn stamp(&self) -> Time {
        match self {
            Annotation::Circle { stamp, .. }
            | Annotation::Points { stamp, .. }
            | Annotation::Text { stamp, .. } => *stamp,
        }
    }
}

/// Normalize an annotation message into a flat list.
///
/// Foxglove messages yield circles, then points, then texts. ROS markers
/// whose action is not ADD, or whose type is unknown, are dropped.
pub fn normalize_annotations(message: AnnotationMessage) -> Vec<Annotation> {
    match message {
        AnnotationMessage::Foxglove(msg) => {
            let mut out =
                Vec::with_capacity(msg.circles.len() + msg.points.len() + msg.texts.len());
            out.extend(msg.circles.into_iter().map(|c| Annotation::Circle {
                stamp: c.timestamp,
                position: c.position.into(),
                radius: c.diameter / 2.0,
                thickness: c.thickness,
                fill_color: c.fill_color.map(Color::from),
                outline_color: c.outline_color.map(Color::from),
            }));
            out.extend(msg.points.into_iter().filter_map(|p| {
                let Some(style) = PointsStyle::from_foxglove(p.kind) else {
                    tracing::debug!("Skipping points annotation with unknown type {}", p.kind);
                    return None;
                };
                Some(Annotation::Points {
                    stamp: p.timestamp,
                    style,
                    points: p.points.into_iter().map(Point2::from).collect(),
                    outline_color: p.outline_color.map(Color::from),
                    outline_colors: p.outline_colors.into_iter().map(Color::from).collect(),
                    fill_color: p.fill_color.map(Color::from),
                    thickness: p.thickness,
                })
            }));
            out.extend(msg.texts.into_iter().map(|t| Annotation::Text {
                stamp: t.timestamp,
                position: t.position.into(),
                text: t.text,
                font_size: t.font_size,
                text_color: t.text_color.map(Color::from),
                background_color: t.background_color.map(Color::from),
            }));
            out
        }
        AnnotationMessage::RosMarker(marker) => normalize_marker(marker).into_iter().collect(),
        AnnotationMessage::RosMarkerArray(array) => array
            .markers
            .into_iter()
            .filter_map(normalize_marker)
            .collect(),
    }
}

fn normalize_marker(marker: RosImageMarker) -> Option<Annotation> {
    if marker.action != IMAGE_MARKER_ADD {
        return None;
    }

    let stamp = marker.header.stamp;
    let fill_color = (marker.filled != 0).then(|| Color::from(marker.fill_color));
    let style = match marker.kind {
        IMAGE_MARKER_CIRCLE => {
            return Some(Annotation::Circle {
                stamp,
                position: marker.position.into(),
                radius: marker.scale,
                thickness: 1.0,
                fill_color,
                outline_color: Some(marker.outline_color.into()),
            });
        }
        IMAGE_MARKER_LINE_STRIP => PointsStyle::LineStrip,
        IMAGE_MARKER_LINE_LIST => PointsStyle::LineList,
        IMAGE_MARKER_POLYGON => PointsStyle::LineLoop,
        IMAGE_MARKER_POINTS => PointsStyle::Points,
        other => {
            tracing::debug!("Skipping image marker with unknown type {}", other);
            return None;
        }
    };

    Some(Annotation::Points {
        stamp,
        style,
        points: marker.points.into_iter().map(Point2::from).collect(),
        outline_color: Some(marker.outline_color.into()),
        outline_colors: marker.outline_colors.into_iter().map(Color::from).collect(),
        fill_color,
        thickness: marker.scale,
    })
}
