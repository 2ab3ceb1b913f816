// ── Reactive record store ──
//
// Type-partitioned storage with single-writer collections and
// payload-less change notification.

mod collection;
mod notifier;
mod record_store;

pub use notifier::{ChangeNotifier, ChangeSignal};
pub use record_store::RecordStore;
