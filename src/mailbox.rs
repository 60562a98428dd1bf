//! Bounded FIFO mailbox and message records.
//!
//! Grounded on the original kernel's `msgobj`/`mailbox` structs and its
//! `send_wait`/`receive_wait`/`send_no_wait`/`receive_no_wait` logic.
//! A mailbox holds a single FIFO queue whose entries are *either*
//! blocked senders, *or* blocked receivers, *or* buffered (non-blocking)
//! messages — never a mix, matching the original's sign-encoded
//! `nBlockedMsg` counter (`+N` senders waiting, `-N` receivers waiting)
//! kept alongside a separate `nMessages` counter for buffered messages.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::ptr::NonNull;

use crate::task::TaskListEntry;

/// What a queued [`Message`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A task blocked in `send_wait`, still waiting for a receiver.
    BlockedSender,
    /// A task blocked in `receive_wait`, still waiting for a sender.
    BlockedReceiver,
    /// A message buffered by `send_no_wait`, not yet collected.
    Buffered,
}

/// Outcome recorded on a message once its rendezvous is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Pending,
    Completed,
    DeadlineReached,
}

/// Where a message's bytes live.
pub enum Payload {
    /// Aliases the blocked caller's own buffer (`send_wait`/`receive_wait`).
    /// Valid only while the owning task is actually blocked.
    Borrowed(*mut u8, usize),
    /// A copy owned by the mailbox (`send_no_wait`).
    Owned(Box<[u8]>),
}

impl Payload {
    pub fn as_ptr(&self) -> *const u8 {
        match self {
            Payload::Borrowed(p, _) => *p as *const u8,
            Payload::Owned(b) => b.as_ptr(),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        match self {
            Payload::Borrowed(p, _) => *p,
            Payload::Owned(b) => b.as_mut_ptr(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Borrowed(_, n) => *n,
            Payload::Owned(b) => b.len(),
        }
    }
}

/// One queued message: the original's `msgobj`, minus the intrusive
/// links (the Rust port uses a `VecDeque` rather than a hand-rolled
/// doubly-linked queue, since the mailbox queue is never walked or
/// spliced from outside this module).
pub struct Message {
    pub kind: Kind,
    pub payload: Payload,
    pub status: MessageStatus,
    /// The blocked task this message belongs to, if any (buffered
    /// messages created by `send_no_wait` have no owning task).
    pub owner: Option<NonNull<TaskListEntry>>,
}

/// A fixed-capacity mailbox.
pub struct Mailbox {
    queue: VecDeque<Box<Message>>,
    pub data_size: usize,
    pub max_messages: usize,
    /// Count of buffered (non-blocking) messages currently queued.
    pub n_messages: i64,
    /// Signed count of blocked parties: positive = blocked senders,
    /// negative = blocked receivers, zero = none blocked.
    pub n_blocked: i64,
}

/// Opaque handle returned by `kernel::create_mailbox`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MailboxHandle(pub(crate) NonNull<Mailbox>);

// SAFETY: only ever touched from within a kernel critical section.
unsafe impl Send for MailboxHandle {}

impl Mailbox {
    pub fn new(max_messages: usize, data_size: usize) -> Box<Self> {
        Box::new(Mailbox {
            queue: VecDeque::new(),
            data_size,
            max_messages,
            n_messages: 0,
            n_blocked: 0,
        })
    }

    pub fn is_idle(&self) -> bool {
        self.n_messages == 0 && self.n_blocked == 0
    }

    /// `|n_messages| + |n_blocked|`, per the original `no_messages`.
    pub fn no_messages(&self) -> usize {
        (self.n_messages.unsigned_abs() + self.n_blocked.unsigned_abs()) as usize
    }

    /// Pop the front message if it matches `kind`.
    pub fn pop_front_if(&mut self, kind: Kind) -> Option<Box<Message>> {
        match self.queue.front() {
            Some(m) if m.kind == kind => self.queue.pop_front(),
            _ => None,
        }
    }

    pub fn push_back(&mut self, msg: Box<Message>) -> *mut Message {
        self.queue.push_back(msg);
        self.queue.back_mut().unwrap().as_mut() as *mut Message
    }

    /// Remove a specific queued message (used for deadline withdrawal
    /// and for non-blocking-queue overflow eviction). Returns it if it
    /// was still present.
    pub fn remove(&mut self, target: *const Message) -> Option<Box<Message>> {
        let idx = self
            .queue
            .iter()
            .position(|m| m.as_ref() as *const Message == target)?;
        self.queue.remove(idx)
    }

    pub fn front_kind(&self) -> Option<Kind> {
        self.queue.front().map(|m| m.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_messages_sums_absolute_counters() {
        let mut m = Mailbox::new(4, 8);
        m.n_messages = 2;
        m.n_blocked = -3;
        assert_eq!(m.no_messages(), 5);
    }

    #[test]
    fn idle_iff_both_counters_zero() {
        let mut m = Mailbox::new(4, 8);
        assert!(m.is_idle());
        m.n_blocked = 1;
        assert!(!m.is_idle());
    }
}
