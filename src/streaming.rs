//! Fire-and-forget transform broadcast over TCP.
//!
//! The publisher owns a non-blocking listener and a set of subscriber
//! sockets. Publishing never blocks the frame loop: a subscriber that
//! cannot take a whole 128-byte message right now is dropped. Subscribers
//! reconnect on their own schedule and simply start receiving from the next
//! published frame; there is no replay and no acknowledgement.

use crate::{
    constants::TRANSFORM_MESSAGE_LEN,
    transform::RenderTransform,
    Error, Result,
};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};

/// One-to-many transform publisher
pub struct PosePublisher {
    listener: TcpListener,
    subscribers: Vec<TcpStream>,
}

impl PosePublisher {
    /// Bind the broadcast endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the address cannot be bound. This is
    /// fatal at startup; there is no retry.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        log::info!("Publishing transforms on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            subscribers: Vec::new(),
        })
    }

    /// The bound local address, useful when binding to port 0
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of currently connected subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Broadcast one transform to every connected subscriber.
    ///
    /// Accepts any pending connections first, then writes the 128-byte
    /// message to each subscriber without blocking. Subscribers that fail
    /// or would block are disconnected. Returns the number of subscribers
    /// the message was delivered to; zero subscribers is not an error.
    pub fn publish(&mut self, transform: &RenderTransform) -> usize {
        self.accept_pending();
        let message = transform.to_wire();

        let mut delivered = 0;
        self.subscribers.retain_mut(|stream| {
            match stream.write(&message) {
                Ok(TRANSFORM_MESSAGE_LEN) => {
                    delivered += 1;
                    true
                }
                Ok(n) => {
                    // A partial write would desynchronize the frame stream
                    log::warn!("Dropping slow subscriber after short write of {n} bytes");
                    false
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    log::warn!("Dropping subscriber with a full send buffer");
                    false
                }
                Err(e) => {
                    log::debug!("Dropping disconnected subscriber: {e}");
                    false
                }
            }
        });
        delivered
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = Self::configure(&stream) {
                        log::warn!("Rejecting subscriber {peer}: {e}");
                        continue;
                    }
                    log::info!("Subscriber connected from {peer}");
                    self.subscribers.push(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("Failed to accept subscriber: {e}");
                    break;
                }
            }
        }
    }

    fn configure(stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)
    }
}

/// Transform subscriber that keeps only the newest complete message
pub struct PoseSubscriber {
    stream: TcpStream,
    buffer: Vec<u8>,
    closed: bool,
}

impl PoseSubscriber {
    /// Connect to a publisher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the connection cannot be established.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            buffer: Vec::new(),
            closed: false,
        })
    }

    /// Drain the socket and decode the newest complete transform.
    ///
    /// Returns `Ok(None)` when no complete message has arrived since the
    /// last call. Older messages are discarded; a consumer that polls
    /// slower than the frame rate always sees the latest pose.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] if the publisher closed the
    /// connection mid-message, leaving a partial frame behind.
    pub fn latest(&mut self) -> Result<Option<RenderTransform>> {
        let mut chunk = [0u8; 4096];
        while !self.closed {
            match self.stream.read(&mut chunk) {
                Ok(0) => self.closed = true,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.closed = true;
                    if self.buffer.len() % TRANSFORM_MESSAGE_LEN != 0 {
                        self.buffer.clear();
                    }
                    return Err(Error::Transport(e));
                }
            }
        }

        let complete = self.buffer.len() / TRANSFORM_MESSAGE_LEN;
        if complete == 0 {
            if self.closed && !self.buffer.is_empty() {
                let actual = self.buffer.len();
                self.buffer.clear();
                return Err(Error::MalformedMessage {
                    expected: TRANSFORM_MESSAGE_LEN,
                    actual,
                });
            }
            return Ok(None);
        }

        let start = (complete - 1) * TRANSFORM_MESSAGE_LEN;
        let transform =
            RenderTransform::from_wire(&self.buffer[start..start + TRANSFORM_MESSAGE_LEN])?;
        // Keep any trailing partial message for the next poll
        self.buffer.drain(..complete * TRANSFORM_MESSAGE_LEN);
        if self.closed && !self.buffer.is_empty() {
            let actual = self.buffer.len();
            self.buffer.clear();
            return Err(Error::MalformedMessage {
                expected: TRANSFORM_MESSAGE_LEN,
                actual,
            });
        }
        Ok(Some(transform))
    }

    /// Whether the publisher has closed the connection
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
