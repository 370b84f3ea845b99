//! Core traits for state machines.

use crate::{BlockContext, Call, CallContext, CallReceipt, RelayError};

/// A state machine that processes calls.
///
/// This is the core abstraction of the relay. The operator scheduler is a
/// state machine that is:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + block + call = same receipt
/// - **Atomic**: A call either applies completely or not at all
///
/// The host serializes calls; there is never more than one call in flight.
///
/// # Example
///
/// ```ignore
/// scheduler.set_block(BlockContext::new(BlockHeight(7), now, parent_hash));
/// let receipt = scheduler.handle(&CallContext::new(operator), Call::ExecuteJob { payload })?;
/// for notification in receipt.notifications {
///     publish(notification);
/// }
/// ```
pub trait StateMachine {
    /// Process a call.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Atomic**: On `Err`, no state observable through the query API changed
    /// - **No I/O**: Notifications are returned for the host to publish
    fn handle(&mut self, ctx: &CallContext, call: Call) -> Result<CallReceipt, RelayError>;

    /// Set the block subsequent calls execute in.
    ///
    /// Called by the host before the first call of each block.
    fn set_block(&mut self, block: BlockContext);

    /// Get the current block.
    fn block(&self) -> &BlockContext;
}
