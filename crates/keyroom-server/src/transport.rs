//! [`FrameReader`] and [`FrameWriter`] over an Axum `WebSocket`.
//!
//! The socket is split with [`StreamExt::split`] so the participant's
//! read loop and write loop can each own one half. Pings from the peer
//! are answered by the socket itself; both pings and pongs surface as
//! [`Frame::Liveness`] so they restart the read deadline.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use keyroom_core::{Frame, FrameReader, FrameWriter, SessionError};

/// Split an upgraded socket into its two halves.
pub fn split(socket: WebSocket) -> (SocketReader, SocketWriter) {
    let (sink, stream) = socket.split();
    (SocketReader { stream }, SocketWriter { sink })
}

/// Receiving half of a `WebSocket`.
#[derive(Debug)]
pub struct SocketReader {
    stream: SplitStream<WebSocket>,
}

impl FrameReader for SocketReader {
    async fn next_frame(&mut self) -> Result<Option<Frame>, SessionError> {
        match self.stream.next().await {
            None | Some(Ok(Message::Close(_))) => Ok(None),
            Some(Ok(Message::Text(text))) => Ok(Some(Frame::Text(text.as_str().to_owned()))),
            Some(Ok(Message::Binary(bytes))) => Ok(Some(Frame::Binary(bytes.to_vec()))),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => Ok(Some(Frame::Liveness)),
            Some(Err(e)) => Err(transport_error(&e)),
        }
    }
}

/// Sending half of a `WebSocket`.
#[derive(Debug)]
pub struct SocketWriter {
    sink: SplitSink<WebSocket, Message>,
}

impl FrameWriter for SocketWriter {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| transport_error(&e))
    }

    async fn send_ping(&mut self) -> Result<(), SessionError> {
        self.sink
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(|e| transport_error(&e))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| transport_error(&e))
    }
}

fn transport_error(e: &axum::Error) -> SessionError {
    SessionError::Transport(e.to_string())
}
