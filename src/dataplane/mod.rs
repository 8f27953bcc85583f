//! Data plane: forwarding state and the dispatch loop

mod arp_processor;
mod arp_table;
mod dispatch;
mod forwarder;
mod router;
mod routing;
pub mod synth;

pub use arp_processor::{
    process_arp, ArpAction, ArpPendingQueue, PendingForward, PendingPolicy,
    DEFAULT_PENDING_CAPACITY,
};
pub use arp_table::ArpCache;
pub use dispatch::run;
pub use forwarder::{forward, ForwardAction, InterfaceInfo};
pub use router::{Outbound, Router};
pub use routing::{is_contiguous, mask_length, LpmTrie, RouteEntry};
