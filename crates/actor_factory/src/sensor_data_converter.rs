//! CARLA 传感器数据转换
//!
//! 将 CARLA 原生传感器数据转换为 `SensorPacket`。
//! 仅在 `real-carla` feature 启用时编译。

use bytes::Bytes;
use carla::sensor::data::Image;
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{ImageData, ImageFormat, SensorPacket, SensorPayload};

/// 将 CARLA Image 转换为 SensorPayload
fn image_to_payload(image: &Image) -> SensorPayload {
    let data = Bytes::copy_from_slice(image.as_raw_bytes());
    SensorPayload::Image(ImageData {
        width: image.width() as u32,
        height: image.height() as u32,
        format: ImageFormat::Bgra8,
        data,
    })
}

/// 将 CARLA 传感器数据转换为 SensorPacket
///
/// 相机图像转为 `Image`，其余数据原样保留为 `Raw`，由渲染端拒绝。
pub fn convert_sensor_data(sensor_id: &str, data: &SensorData) -> Option<SensorPacket> {
    let timestamp = data.timestamp();
    let frame_id = data.frame() as u64;

    let payload = match Image::try_from(data.clone()) {
        Ok(image) => image_to_payload(&image),
        Err(_) => SensorPayload::Raw(Bytes::new()),
    };

    Some(SensorPacket {
        sensor_id: sensor_id.to_string(),
        timestamp,
        frame_id: Some(frame_id),
        payload,
    })
}
