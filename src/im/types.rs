use serde::Deserialize;
use tracing::{debug, error};

use crate::im::error::{ClientError, Result};

/// 服务端错误响应结构（FastAPI 的 `{"detail": ...}`）
///
/// `detail` 可能是字符串，也可能是参数校验失败时的对象数组
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorDetail {
    /// 提取可读的错误信息
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("; "))
                }
            }
            other => Some(other.to_string()),
        }
    }
}

/// 从错误响应 body 中提取错误信息，解析不了时返回原始文本
pub(crate) fn extract_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorDetail>(body)
        .ok()
        .and_then(|d| d.message())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

/// 通用 HTTP 响应处理函数：检查状态码并直接反序列化为目标结构体
/// 所有 API 都可以共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(ClientError::Http {
            status: status.as_u16(),
            message: extract_error_message(&body_bytes),
        });
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    serde_json::from_slice::<T>(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        ClientError::Decode(e)
    })
}
