//! APRS protocol pieces: passcode hashing, packet encoding and the APRS-IS session.

pub mod packet;
pub mod passcode;
pub mod session;

pub use packet::{build_position_packet, build_status_packet};
pub use passcode::calculate_passcode;
pub use session::{AprsIsSession, Connector, Login, SessionError, SessionState, TcpConnector};
