//! # Events Module
//!
//! Progress of history scans, delivered over channels.
//!
//! ## Design
//! The scanner only ever holds an [`EventSender`]. Front ends keep the
//! [`EventReceiver`] on their own thread and render what arrives; a scan
//! without a listener runs with [`null_sender`].
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! let printer = std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::HistoryScan(HistoryScanEvent::Tagged { id, images }) = event {
//!             println!("#{id}: {images} images tagged");
//!         }
//!     }
//! });
//!
//! scanner.run_with_events(&sender)?;
//! drop(sender);
//! printer.join().ok();
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
