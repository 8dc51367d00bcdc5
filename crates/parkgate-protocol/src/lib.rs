pub mod codec;
pub mod crc;
pub mod events;
pub mod frame;
pub mod reply;
pub mod stream_parser;

pub use codec::{GateCodec, Inbound};
pub use crc::{Crc8, crc8};
pub use events::GateEvent;
pub use frame::Frame;
pub use reply::{LineAssembler, Reply};
pub use stream_parser::{DrainEvents, ParseEvent, ParserState, StreamParser};
