//! Streaming codec for `tokio_util::codec::Framed`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::DwgError;
use crate::frame::{MAX_BODY_SIZE, Message};
use crate::header::{HEADER_SIZE, MessageHeader};
use crate::message::Endpoint;

/// Frames DWG messages over a byte stream.
///
/// The decoder only yields messages its [`Endpoint`] accepts; the encoder
/// writes any message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DwgCodec {
    endpoint: Endpoint,
}

impl DwgCodec {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Codec for the SMS server side of the connection.
    pub fn server() -> Self {
        Self::new(Endpoint::Server)
    }

    /// Codec for the gateway side, used by simulators.
    pub fn gateway() -> Self {
        Self::new(Endpoint::Gateway)
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

impl Decoder for DwgCodec {
    type Item = Message;
    type Error = DwgError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let header = MessageHeader::from_bytes(&src[..HEADER_SIZE])?;
        let body_length = header.body_length() as usize;
        if body_length > MAX_BODY_SIZE {
            return Err(DwgError::FrameTooLarge {
                size: body_length,
                max: MAX_BODY_SIZE,
            });
        }

        let frame_length = HEADER_SIZE + body_length;
        if src.len() < frame_length {
            src.reserve(frame_length - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_length);
        Message::decode(&frame, self.endpoint).map(Some)
    }
}

impl Encoder<Message> for DwgCodec {
    type Error = DwgError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)
    }
}
