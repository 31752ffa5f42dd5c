//! One-shot cancellation handle shared between the registry and the booking
//! task it controls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Fires at most once. Clones observe the same underlying token.
#[derive(Clone)]
pub struct CancelToken {
	fired: Arc<AtomicBool>,
	tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(false);
		Self {
			fired: Arc::new(AtomicBool::new(false)),
			tx: Arc::new(tx),
		}
	}

	/// Fires the token. Only the call that actually fired it gets `true`.
	pub fn cancel(&self) -> bool {
		if self.fired.swap(true, Ordering::SeqCst) {
			return false;
		}
		let _ = self.tx.send(true);
		true
	}

	pub fn is_cancelled(&self) -> bool {
		self.fired.load(Ordering::SeqCst)
	}

	/// Resolves once the token fires. A token fired before this call resolves
	/// immediately; the receiver subscribes to the current value first.
	pub async fn cancelled(&self) {
		let mut rx = self.tx.subscribe();
		let _ = rx.wait_for(|fired| *fired).await;
	}
}

impl Default for CancelToken {
	fn default() -> Self {
		Self::new()
	}
}
