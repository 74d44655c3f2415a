//! Messaging pattern kinds.
//!
//! The discriminants match the transport's numeric socket types, so a
//! `SocketType` can cross the adapter boundary as a plain integer.

use std::fmt;

/// Messaging pattern a socket implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SocketType {
    /// Exclusive bidirectional link between two peers
    Pair = 0,
    /// Broadcast side of publish/subscribe
    Pub = 1,
    /// Filtered receive side of publish/subscribe
    Sub = 2,
    /// Strict request/reply client
    Req = 3,
    /// Strict request/reply server
    Rep = 4,
    /// Asynchronous, load-balanced request side
    Dealer = 5,
    /// Identity-routed reply side
    Router = 6,
    /// Pipeline receive side
    Pull = 7,
    /// Pipeline send side
    Push = 8,
    /// Publisher that sees subscriptions
    XPub = 9,
    /// Subscriber that sends raw subscriptions
    XSub = 10,
    /// Raw stream peer
    Stream = 11,
}

impl SocketType {
    /// All pattern kinds in discriminant order.
    pub const ALL: [SocketType; 12] = [
        Self::Pair,
        Self::Pub,
        Self::Sub,
        Self::Req,
        Self::Rep,
        Self::Dealer,
        Self::Router,
        Self::Pull,
        Self::Push,
        Self::XPub,
        Self::XSub,
        Self::Stream,
    ];

    /// Numeric value understood by the transport.
    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Map a transport socket type number back to a pattern kind.
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Upper-case pattern name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
            Self::XPub => "XPUB",
            Self::XSub => "XSUB",
            Self::Stream => "STREAM",
        }
    }
}

impl Default for SocketType {
    fn default() -> Self {
        Self::Rep
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_type_display() {
        assert_eq!(SocketType::Dealer.to_string(), "DEALER");
        assert_eq!(SocketType::XPub.to_string(), "XPUB");
        assert_eq!(SocketType::Stream.to_string(), "STREAM");
    }

    #[test]
    fn test_raw_values_match_transport_numbering() {
        assert_eq!(SocketType::Pair.as_raw(), 0);
        assert_eq!(SocketType::Rep.as_raw(), 4);
        assert_eq!(SocketType::Push.as_raw(), 8);
        assert_eq!(SocketType::Stream.as_raw(), 11);

        for kind in SocketType::ALL {
            assert_eq!(SocketType::from_raw(kind.as_raw()), Some(kind));
        }
    }

    #[test]
    fn test_from_raw_out_of_range() {
        assert_eq!(SocketType::from_raw(-1), None);
        assert_eq!(SocketType::from_raw(12), None);
    }

    #[test]
    fn test_default_is_rep() {
        assert_eq!(SocketType::default(), SocketType::Rep);
    }
}
