//! UDP/IP tunneling over an 802.15.4 radio link.
//!
//! The tunnel creates a TUN interface and bridges it onto the radio: IP
//! packets leaving the host lose their IP header and travel as radio
//! frames addressed by the host half of the destination address; frames
//! arriving from the PAN get an IP header synthesized from the sender's
//! radio address and are handed back to the kernel. Two threads drive the
//! bridge, serialized around the module's transmit-status reports.
//!
//! The daemon binary (`waggle-tunnel`) wires [`Tunnel`] to the CLI and the
//! process signal handlers.

mod error;
mod inet;
mod tun;
mod tunnel;

pub use error::{InetError, TunnelError};
pub use inet::{INET_FRAME_ID, ip_to_tx_request, rx_packet_to_ip};
pub use tun::{PacketIo, TunDevice};
pub use tunnel::{TUN_MTU, Tunnel, TunnelConfig, receive_loop, transmit_loop};
