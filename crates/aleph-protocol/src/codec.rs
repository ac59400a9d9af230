use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{AlephMessage, MAX_MESSAGE_SIZE};

/// Codec for encoding/decoding push protocol messages.
pub struct AlephCodec;

impl AlephCodec {
    /// Encode a message with framing: [4 bytes len][1 byte tag][payload]
    pub fn encode(msg: &AlephMessage) -> ProtocolResult<Vec<u8>> {
        Self::encode_limited(msg, MAX_MESSAGE_SIZE)
    }

    /// Encode with an explicit payload size limit.
    pub fn encode_limited(msg: &AlephMessage, max: usize) -> ProtocolResult<Vec<u8>> {
        let payload = Self::encode_payload(msg)?;
        if payload.len() > max {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> ProtocolResult<(AlephMessage, usize)> {
        if data.len() < 5 {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        Self::check_length(len, MAX_MESSAGE_SIZE)?;
        let msg = Self::decode_body(&data[4..total])?;
        Ok((msg, total))
    }

    /// Encode payload only (no framing).
    pub fn encode_payload(msg: &AlephMessage) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload(data: &[u8]) -> ProtocolResult<AlephMessage> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    fn check_length(len: usize, max: usize) -> ProtocolResult<()> {
        if len < 1 {
            return Err(ProtocolError::FramingError("zero-length frame".into()));
        }
        if len - 1 > max {
            return Err(ProtocolError::MessageTooLarge { size: len - 1, max });
        }
        Ok(())
    }

    // `body` is [tag][payload]; the tag must agree with the decoded variant.
    fn decode_body(body: &[u8]) -> ProtocolResult<AlephMessage> {
        let tag = body[0];
        let msg = Self::decode_payload(&body[1..])?;
        if msg.type_tag() != tag {
            return Err(ProtocolError::InvalidMessageType(tag));
        }
        Ok(msg)
    }
}

/// Read one framed message from a stream.
///
/// Returns `Ok(None)` if the stream ends cleanly before a new frame starts.
pub async fn read_message<R>(reader: &mut R, max: usize) -> ProtocolResult<Option<AlephMessage>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::FramingError("stream ended inside frame header".into()));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    AlephCodec::check_length(len, max)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::FramingError("stream ended inside frame body".into())
        } else {
            ProtocolError::Io(e)
        }
    })?;
    AlephCodec::decode_body(&body).map(Some)
}

/// Write one framed message and flush.
pub async fn write_message<W>(writer: &mut W, msg: &AlephMessage, max: usize) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = AlephCodec::encode_limited(msg, max)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    tracing::trace!(message = msg.type_name(), bytes = frame.len(), "wrote frame");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::*;

    fn sample_result() -> AlephMessage {
        AlephMessage::PushResult(PushResult {
            objects_stored: 2,
            statements_recorded: 2,
            error: None,
        })
    }

    #[test]
    fn framed_decode_restores_message() {
        let msg = AlephMessage::Reject {
            error: "not authorized".into(),
        };
        let encoded = AlephCodec::encode(&msg).unwrap();
        let (decoded, consumed) = AlephCodec::decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn type_tags_unique() {
        let msgs = vec![
            AlephMessage::PushOpen { requester: String::new(), namespace: String::new() },
            AlephMessage::Accept,
            AlephMessage::Reject { error: String::new() },
            AlephMessage::PushRequest(PushRequest {
                namespace: String::new(),
                statements: vec![],
                bodies: vec![],
            }),
            sample_result(),
            AlephMessage::Ping { nonce: 0 },
            AlephMessage::Pong { nonce: 0 },
            AlephMessage::Error { code: 0, message: String::new() },
        ];
        let mut tags: Vec<u8> = msgs.iter().map(|m| m.type_tag()).collect();
        let len = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), len, "type tags should be unique");
    }

    #[test]
    fn decode_truncated() {
        let err = AlephCodec::decode(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_zero_length() {
        let data = [0u8, 0, 0, 0, 0];
        let err = AlephCodec::decode(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_rejects_mismatched_tag() {
        let mut encoded = AlephCodec::encode(&AlephMessage::Accept).unwrap();
        encoded[4] = 3;
        let err = AlephCodec::decode(&encoded).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessageType(3)));
    }

    #[test]
    fn encode_respects_limit() {
        let msg = AlephMessage::Reject { error: "x".repeat(64) };
        let err = AlephCodec::encode_limited(&msg, 16).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { max: 16, .. }));
    }

    #[tokio::test]
    async fn stream_roundtrip_and_clean_eof() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_message(&mut a, &AlephMessage::Accept, MAX_MESSAGE_SIZE).await.unwrap();
        write_message(&mut a, &sample_result(), MAX_MESSAGE_SIZE).await.unwrap();
        drop(a);

        assert_eq!(read_message(&mut b, MAX_MESSAGE_SIZE).await.unwrap(), Some(AlephMessage::Accept));
        assert_eq!(read_message(&mut b, MAX_MESSAGE_SIZE).await.unwrap(), Some(sample_result()));
        assert_eq!(read_message(&mut b, MAX_MESSAGE_SIZE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_stream_is_framing_error() {
        let frame = AlephCodec::encode(&sample_result()).unwrap();
        let partial = &frame[..frame.len() - 2];
        let mut reader = partial;
        let err = read_message(&mut reader, MAX_MESSAGE_SIZE).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_reading_body() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&(1_000u32).to_be_bytes());
        frame.push(2);
        let mut reader = frame.as_slice();
        let err = read_message(&mut reader, 100).await.unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { size: 999, max: 100 }));
    }
}
