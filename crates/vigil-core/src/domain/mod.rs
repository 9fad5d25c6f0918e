//! Domain model (ids, status, operation, errors).
//!
//! ここにはリモート操作の「形」だけを置きます。
//! HTTP やタイマーなどの I/O は ports / impls 側の責務です。

pub mod errors;
pub mod ids;
pub mod operation;
pub mod state;

pub use self::errors::{ApiError, CancelReason, PollerError};
pub use self::ids::OperationId;
pub use self::operation::{ErrorModel, Operation, Payload, PollPayload};
pub use self::state::OperationStatus;
