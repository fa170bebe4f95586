//! Common types shared by the msgfee router and node: coins, packed messages, transactions,
//! block headers and the additional-fee schedule.

pub mod api;
pub mod block;
pub mod codec;
pub mod coin;
pub mod event;
pub mod msg;
pub mod msgfee;
pub mod result;
pub mod tx;

pub use api::{Query, SyncInfo};
pub use block::{genesis_header, Header};
pub use coin::{Coin, CoinError, Coins};
pub use event::{Event, EventAttribute};
pub use msg::{AnyMsg, Msg, TypedMsg};
pub use msgfee::{MsgFee, MsgFeesParams, USD_DENOM};
pub use result::MsgResult;
pub use tx::{decode_tx, Fee, FeeTx, Transaction, Tx};
