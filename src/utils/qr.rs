use crate::error::{AppError, AppResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// 二维码负载工具
/// 负载格式: "event:{id}" / "gift:{id}" / "event:{event_id}:user:{user_id}"
/// 对外输出 data URL（base64 负载），真正的二维码图像渲染由外部服务完成

pub fn event_payload(event_id: i64) -> String {
    format!("event:{event_id}")
}

pub fn gift_payload(gift_id: i64) -> String {
    format!("gift:{gift_id}")
}

pub fn completion_payload(event_id: i64, user_id: i64) -> String {
    format!("event:{event_id}:user:{user_id}")
}

pub fn render_data_url(payload: &str) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(payload))
}

/// 解析活动二维码负载（仅接受 "event:{id}" 形式）
pub fn parse_event_payload(data: &str) -> AppResult<i64> {
    let mut parts = data.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("event"), Some(id), None) => id
            .parse::<i64>()
            .map_err(|_| AppError::ValidationError("Invalid QR code format".to_string())),
        _ => Err(AppError::ValidationError(
            "Invalid QR code format".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_formats() {
        assert_eq!(event_payload(42), "event:42");
        assert_eq!(gift_payload(7), "gift:7");
        assert_eq!(completion_payload(42, 7), "event:42:user:7");
    }

    #[test]
    fn data_url_is_base64_of_payload() {
        let url = render_data_url("event:42");
        assert!(url.starts_with("data:image/png;base64,"));
        let encoded = url.trim_start_matches("data:image/png;base64,");
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"event:42");
    }

    #[test]
    fn parse_valid_event_payload() {
        assert_eq!(parse_event_payload("event:42").unwrap(), 42);
    }

    #[test]
    fn parse_rejects_malformed_payloads() {
        assert!(parse_event_payload("gift:42").is_err());
        assert!(parse_event_payload("event:abc").is_err());
        assert!(parse_event_payload("event:42:user:7").is_err());
        assert!(parse_event_payload("").is_err());
    }
}
