//! JSON-RPC correlation layer over a DevTools WebSocket.
//!
//! Commands get a unique id and a oneshot channel; the read loop matches
//! responses back by id. Protocol events (messages without an id) are not
//! consumed by this client and are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::driver::DriverError;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, DriverError>>>>>;

/// A live DevTools connection. Cheap to share; all methods take `&self`.
pub struct CdpConnection {
	next_id: AtomicU64,
	pending: Pending,
	outbound: mpsc::UnboundedSender<Message>,
	reader: Mutex<Option<JoinHandle<()>>>,
	writer: Mutex<Option<JoinHandle<()>>>,
}

impl CdpConnection {
	/// Dials the browser's DevTools endpoint and spawns the IO loops.
	pub async fn connect(ws_endpoint: &str) -> Result<Self, DriverError> {
		let (stream, _) = connect_async(ws_endpoint)
			.await
			.map_err(|e| DriverError::Protocol(format!("websocket connect failed: {e}")))?;
		let (mut sink, mut source) = stream.split();

		let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if sink.send(message).await.is_err() {
					break;
				}
			}
		});

		let reader = tokio::spawn({
			let pending = Arc::clone(&pending);
			async move {
				while let Some(message) = source.next().await {
					let text = match message {
						Ok(Message::Text(text)) => text,
						Ok(Message::Close(_)) | Err(_) => break,
						Ok(_) => continue,
					};
					dispatch(&pending, &text);
				}
				// Connection gone: fail everything still in flight.
				for (_, tx) in pending.lock().drain() {
					let _ = tx.send(Err(DriverError::ConnectionClosed));
				}
			}
		});

		debug!(target = "bb.cdp", endpoint = %ws_endpoint, "devtools connection established");

		Ok(Self {
			next_id: AtomicU64::new(1),
			pending,
			outbound,
			reader: Mutex::new(Some(reader)),
			writer: Mutex::new(Some(writer)),
		})
	}

	/// Sends one command and awaits its response. `session_id` scopes the
	/// command to an attached target; `None` addresses the browser itself.
	pub async fn send(
		&self,
		session_id: Option<&str>,
		method: &str,
		params: Value,
	) -> Result<Value, DriverError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		let mut frame = json!({ "id": id, "method": method, "params": params });
		if let Some(session) = session_id {
			frame["sessionId"] = Value::String(session.to_string());
		}

		trace!(target = "bb.cdp", %method, id, "send");
		if self.outbound.send(Message::Text(frame.to_string().into())).is_err() {
			self.pending.lock().remove(&id);
			return Err(DriverError::ConnectionClosed);
		}

		rx.await.map_err(|_| DriverError::ConnectionClosed)?
	}

	/// Tears the connection down. In-flight commands fail with
	/// [`DriverError::ConnectionClosed`].
	pub fn close(&self) {
		if let Some(writer) = self.writer.lock().take() {
			writer.abort();
		}
		if let Some(reader) = self.reader.lock().take() {
			reader.abort();
		}
		for (_, tx) in self.pending.lock().drain() {
			let _ = tx.send(Err(DriverError::ConnectionClosed));
		}
	}
}

impl Drop for CdpConnection {
	fn drop(&mut self) {
		self.close();
	}
}

fn dispatch(pending: &Pending, text: &str) {
	let Ok(frame) = serde_json::from_str::<Value>(text) else {
		warn!(target = "bb.cdp", "unparseable frame from browser");
		return;
	};

	// Responses have an id; events do not and are ignored here.
	let Some(id) = frame.get("id").and_then(Value::as_u64) else {
		return;
	};

	let Some(tx) = pending.lock().remove(&id) else {
		warn!(target = "bb.cdp", id, "response for unknown command id");
		return;
	};

	let outcome = if let Some(error) = frame.get("error") {
		let message = error
			.get("message")
			.and_then(Value::as_str)
			.unwrap_or("unknown devtools error");
		Err(DriverError::Protocol(message.to_string()))
	} else {
		Ok(frame.get("result").cloned().unwrap_or(Value::Null))
	};
	let _ = tx.send(outcome);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dispatch_correlates_results_by_id() {
		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
		let (tx, mut rx) = oneshot::channel();
		pending.lock().insert(4, tx);

		dispatch(&pending, r#"{"id":4,"result":{"ok":true}}"#);

		let value = rx.try_recv().unwrap().unwrap();
		assert_eq!(value["ok"], true);
		assert!(pending.lock().is_empty());
	}

	#[test]
	fn dispatch_surfaces_protocol_errors() {
		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
		let (tx, mut rx) = oneshot::channel();
		pending.lock().insert(9, tx);

		dispatch(&pending, r#"{"id":9,"error":{"code":-32000,"message":"No node found"}}"#);

		let err = rx.try_recv().unwrap().unwrap_err();
		assert!(matches!(err, DriverError::Protocol(msg) if msg == "No node found"));
	}

	#[test]
	fn dispatch_ignores_events() {
		let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
		dispatch(&pending, r#"{"method":"Page.frameNavigated","params":{}}"#);
		assert!(pending.lock().is_empty());
	}
}
