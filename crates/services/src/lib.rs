//! # services
//!
//! Application logic for HeartConnect: receiver resolution, mutual-match
//! detection and the matched-inbox view. Talks to the outside world only
//! through the ports in `domains`.

pub mod feedback;
pub mod inbox;
pub mod matching;
pub mod messaging;
pub mod resolution;
pub mod validation;

pub use feedback::FeedbackService;
pub use inbox::InboxBuilder;
pub use matching::{MatchDetector, PairLocks};
pub use messaging::{MessageService, SENT_VIEW_LIMIT};
pub use resolution::{DirectoryScan, ReceiverResolver};
