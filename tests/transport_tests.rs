use binance_ws_streams::core::kernel::{
    CloseOptions, DropHandler, StreamHandle, Transport, TungsteniteHandle, TungsteniteTransport,
    WsConfig, NORMAL_CLOSURE,
};
use binance_ws_streams::exchanges::binance::CLOSE_REASON;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;

const WAIT: Duration = Duration::from_secs(5);

/// What the local server saw on one accepted connection
#[derive(Debug)]
struct ServerClose {
    code: u16,
    reason: String,
}

/// Accept `connections` sockets in turn; send `frames` on each and report the close frame
async fn serve(
    listener: TcpListener,
    connections: usize,
    frames: Vec<Message>,
    closes: mpsc::UnboundedSender<Option<ServerClose>>,
) {
    for _ in 0..connections {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        for frame in &frames {
            if ws.send(frame.clone()).await.is_err() {
                return;
            }
        }

        let mut seen = None;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(frame) = message {
                seen = frame.map(|frame| ServerClose {
                    code: u16::from(frame.code),
                    reason: frame.reason.into_owned(),
                });
                break;
            }
        }
        let _ = closes.send(seen);
    }
}

fn frame_sink() -> (
    mpsc::UnboundedReceiver<String>,
    Arc<dyn Fn(String) + Send + Sync>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = Arc::new(move |frame: String| {
        let _ = tx.send(frame);
    });
    (rx, handler)
}

fn drop_counter() -> (Arc<AtomicUsize>, DropHandler) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let on_drop: DropHandler = Arc::new(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, on_drop)
}

async fn wait_until_inactive(handle: &TungsteniteHandle) {
    timeout(WAIT, async {
        while handle.is_active() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[cfg(test)]
mod transport_tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_arrive_in_order_and_close_sends_reason() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closes_tx, mut closes_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(
            listener,
            1,
            vec![
                Message::Text(r#"{"seq":1}"#.to_string()),
                Message::Binary(br#"{"seq":2}"#.to_vec()),
                Message::Text(r#"{"seq":3}"#.to_string()),
            ],
            closes_tx,
        ));

        let (mut frames, handler) = frame_sink();
        let mut handle = TungsteniteTransport::new().open(
            &format!("ws://{}/btcusdt@trade", addr),
            handler,
            None,
        );
        assert!(handle.url().ends_with("/btcusdt@trade"));

        for expected in [r#"{"seq":1}"#, r#"{"seq":2}"#, r#"{"seq":3}"#] {
            let frame = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
            assert_eq!(frame, expected);
        }

        handle.close(NORMAL_CLOSURE, CLOSE_REASON, CloseOptions::default());

        let close = timeout(WAIT, closes_rx.recv()).await.unwrap().unwrap().unwrap();
        assert_eq!(close.code, 1000);
        assert_eq!(close.reason, CLOSE_REASON);

        wait_until_inactive(&handle).await;
    }

    #[tokio::test]
    async fn test_close_without_keep_closed_reopens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closes_tx, mut closes_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(
            listener,
            2,
            vec![Message::Text("hello".to_string())],
            closes_tx,
        ));

        let transport = TungsteniteTransport::new().with_config(WsConfig {
            reopen_delay_ms: 10,
            ..WsConfig::default()
        });
        let (mut frames, handler) = frame_sink();
        let mut handle = transport.open(&format!("ws://{}/!ticker@arr", addr), handler, None);

        assert_eq!(timeout(WAIT, frames.recv()).await.unwrap().unwrap(), "hello");
        handle.close(
            NORMAL_CLOSURE,
            CLOSE_REASON,
            CloseOptions {
                keep_closed: false,
                fast_close: true,
            },
        );
        assert!(timeout(WAIT, closes_rx.recv()).await.unwrap().is_some());

        // the same handle now drives a fresh connection
        assert_eq!(timeout(WAIT, frames.recv()).await.unwrap().unwrap(), "hello");
        assert!(handle.is_active());

        handle.close(NORMAL_CLOSURE, CLOSE_REASON, CloseOptions::default());
        let close = timeout(WAIT, closes_rx.recv()).await.unwrap().unwrap().unwrap();
        assert_eq!(close.reason, CLOSE_REASON);
        println!("✅ Socket reopened after a non-final close");
    }

    #[tokio::test]
    async fn test_server_close_fires_drop_handler() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text("last".to_string())).await.unwrap();
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (count, on_drop) = drop_counter();
        let (mut frames, handler) = frame_sink();
        let handle = TungsteniteTransport::new().open(
            &format!("ws://{}/listen-key", addr),
            handler,
            Some(on_drop),
        );

        assert_eq!(timeout(WAIT, frames.recv()).await.unwrap().unwrap(), "last");
        wait_until_inactive(&handle).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_fires_drop_handler() {
        // bind then release a port so nothing is listening on it
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let (count, on_drop) = drop_counter();
        let (_frames, handler) = frame_sink();
        let handle = TungsteniteTransport::new().open(
            &format!("ws://{}/listen-key", addr),
            handler,
            Some(on_drop),
        );

        wait_until_inactive(&handle).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_requested_close_does_not_fire_drop_handler() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closes_tx, mut closes_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(
            listener,
            1,
            vec![Message::Text("hello".to_string())],
            closes_tx,
        ));

        let (count, on_drop) = drop_counter();
        let (mut frames, handler) = frame_sink();
        let mut handle = TungsteniteTransport::new().open(
            &format!("ws://{}/listen-key", addr),
            handler,
            Some(on_drop),
        );

        assert_eq!(timeout(WAIT, frames.recv()).await.unwrap().unwrap(), "hello");
        handle.close(NORMAL_CLOSURE, CLOSE_REASON, CloseOptions::default());
        assert!(timeout(WAIT, closes_rx.recv()).await.unwrap().is_some());
        wait_until_inactive(&handle).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
