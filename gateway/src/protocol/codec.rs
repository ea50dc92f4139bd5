//! 线路分帧
//!
//! 每一帧形如 `L:<n> <json>`，`<n>` 是后面 JSON 文本的字节数。

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::Message;
use crate::error::ProtocolError;

const FRAME_PREFIX: &[u8] = b"L:";

/// 帧头（`L:` + 长度 + 空格）的最大字节数
const MAX_HEADER_LEN: u64 = 16;

/// 单帧负载上限
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// 编码为一帧
pub fn encode(message: &Message) -> Vec<u8> {
    let body = message.to_json();
    let mut frame = Vec::with_capacity(body.len() + 12);
    frame.extend_from_slice(FRAME_PREFIX);
    frame.extend_from_slice(body.len().to_string().as_bytes());
    frame.push(b' ');
    frame.extend_from_slice(body.as_bytes());
    frame
}

/// 从一段完整的字节中解码一帧，多余的尾部字节被忽略
pub fn decode(frame: &[u8]) -> Result<Message, ProtocolError> {
    let space = frame
        .iter()
        .position(|b| *b == b' ')
        .ok_or(ProtocolError::Truncated)?;
    let len = parse_header(&frame[..space])?;
    let body = frame
        .get(space + 1..space + 1 + len)
        .ok_or(ProtocolError::Truncated)?;
    Message::from_slice(body)
}

/// 从流中读取一帧
///
/// 对端在发送任何字节之前关闭连接时返回 `Ok(None)`。
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Vec::with_capacity(MAX_HEADER_LEN as usize);
    let mut limited = (&mut *reader).take(MAX_HEADER_LEN);
    let n = limited.read_until(b' ', &mut header).await?;
    if n == 0 {
        return Ok(None);
    }
    if header.pop() != Some(b' ') {
        return Err(ProtocolError::Truncated);
    }

    let len = parse_header(&header)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::Truncated
        } else {
            ProtocolError::Io(e)
        }
    })?;

    Message::from_slice(&body).map(Some)
}

/// 向流写入一帧并 flush
pub async fn write_message<W>(writer: &mut W, message: &Message) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(message)).await?;
    writer.flush().await
}

fn parse_header(header: &[u8]) -> Result<usize, ProtocolError> {
    let digits = header
        .strip_prefix(FRAME_PREFIX)
        .ok_or(ProtocolError::MissingPrefix)?;
    let text = std::str::from_utf8(digits)
        .map_err(|_| ProtocolError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidLength(text.to_string()));
    }
    let len: usize = text
        .parse()
        .map_err(|_| ProtocolError::InvalidLength(text.to_string()))?;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    Ok(len)
}
