//! Serial driver for 802.15.4/ZigBee radio modules.
//!
//! A [`Driver`] session owns the serial line the module is connected to and
//! layers the wire protocol from `waggle-proto` on top of it:
//!
//! - API-mode frame I/O: [`Driver::send`]/[`Driver::receive`] plus one thin
//!   constructor per transmit-request flavor.
//! - Transparent-mode configuration: the timed `+++` AT dialogue
//!   ([`Driver::xfer_at_command`]) and mode switching.
//! - Register access: named two-letter registers, 16-bit address and PAN
//!   setup ([`Driver::set_address16`]).
//!
//! Sessions are single-threaded; a tunnel that needs to send from one
//! thread while another blocks in receive calls [`Driver::split`] and moves
//! each half to its thread. A session-fatal failure poisons the half it
//! happened on — later calls fail [`DriverError::Inherited`] until the
//! session is recreated.

mod error;
mod registers;
mod session;
mod transport;

pub use error::{DriverError, TransportError};
pub use registers::{REG_ADDRESS_16, REG_PAN_ID};
pub use session::{Driver, DriverRx, DriverTx, Mode, SessionConfig, Timeout};
pub use transport::{BAUD_RATE, SerialLink, Transport};
