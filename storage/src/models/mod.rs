//! Persistence models: one struct per archive table plus the per-message commit unit.

mod button_record;
mod message_record;
mod normalized_message;
mod reaction_record;
mod reply_record;

pub use button_record::ButtonRecord;
pub use message_record::MessageRecord;
pub use normalized_message::NormalizedMessage;
pub use reaction_record::ReactionRecord;
pub use reply_record::ReplyRecord;
