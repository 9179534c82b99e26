mod clock;
mod transport;

pub use self::clock::ScriptedClock;
pub use self::transport::{BrokenStreamListener, FakeTransport, Producer, TimeService};
