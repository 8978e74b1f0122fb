use std::io::{self, Write};

use actix_web::web::Bytes;
use tokio::sync::mpsc;

/// Chunks buffered between the renderer thread and the HTTP response.
pub const CHANNEL_CAPACITY: usize = 16;

/// Blocking `Write` adapter feeding a streaming HTTP body.
///
/// Writes are buffered and sent as one chunk per flush. Once the response
/// side is dropped (the client disconnected) every flush fails, which stops
/// the renderer.
pub struct ChannelSink {
	tx: mpsc::Sender<io::Result<Bytes>>,
	pending: Vec<u8>,
}

impl ChannelSink {
	pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
		Self { tx, pending: Vec::new() }
	}
}

impl Write for ChannelSink {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		if self.tx.is_closed() {
			return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"));
		}
		self.pending.extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		if self.pending.is_empty() {
			return Ok(());
		}
		let chunk = Bytes::from(std::mem::take(&mut self.pending));
		self.tx
			.blocking_send(Ok(chunk))
			.map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
	}
}
