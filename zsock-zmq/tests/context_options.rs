//! Context options; in its own test binary because the context is process-wide.

use zsock_core::socket_type::SocketType;
use zsock_core::transport::TransportAdapter;
use zsock_zmq::{context, ZmqTransport};

#[test]
fn test_io_threads_apply_to_live_and_future_contexts() {
    assert_eq!(context::io_threads(), Ok(context::DEFAULT_IO_THREADS));

    context::set_io_threads(2).unwrap();
    assert_eq!(context::io_threads(), Ok(2));

    let transport = ZmqTransport::new();
    let socket = transport.create_socket(SocketType::Pair).unwrap();
    assert!(context::is_active());
    assert_eq!(context::io_threads(), Ok(2));

    context::set_io_threads(3).unwrap();
    assert_eq!(context::io_threads(), Ok(3));

    transport.destroy(socket);
    assert!(!context::is_active());
    assert_eq!(context::io_threads(), Ok(3));
}
