use crate::core::errors::DecodeError;

/// Codec trait for turning raw WebSocket text frames into typed messages
///
/// Binance raw streams carry exactly one JSON document per frame, so a codec
/// only has to decode; subscriptions are expressed in the socket URL.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this stream
    type Message: Send;

    /// Decode one text frame
    ///
    /// # Returns
    /// - `Ok(message)` - Successfully decoded message
    /// - `Err(error)` - The frame was not valid JSON or had an unexpected shape
    fn decode_frame(&self, frame: &str) -> Result<Self::Message, DecodeError>;
}
