//! Property tests for the quantified invariants in the testable
//! properties section: sort order, size consistency, FIFO-among-equals
//! for task lists; bookkeeping and exclusivity for mailboxes.

use proptest::prelude::*;

use tempus::list::TaskList;
use tempus::mailbox::{Kind, Mailbox, Message, Payload};
use tempus::task::TaskListEntry;

extern "C" fn noop() -> ! {
    loop {
        std::thread::park();
    }
}

fn reachable_len_forward(list: &TaskList) -> usize {
    let mut count = 0;
    let mut cursor = list.peek_ptr();
    while let Some(n) = cursor {
        count += 1;
        cursor = unsafe { n.as_ref().next };
    }
    count
}

proptest! {
    /// Sort order and size consistency hold after any sequence of
    /// inserts, for a deadline-sorted list.
    #[test]
    fn deadline_list_stays_sorted(deadlines in prop::collection::vec(0u64..1000, 0..40)) {
        let mut list = TaskList::create();
        for (id, d) in deadlines.iter().enumerate() {
            let e = TaskListEntry::try_new(id, noop, *d).expect("test allocation must succeed");
            list.insert_by_deadline(e);
        }
        prop_assert_eq!(list.len(), deadlines.len());
        prop_assert_eq!(reachable_len_forward(&list), deadlines.len());

        let mut prev = None;
        while let Some(e) = list.remove_first() {
            if let Some(p) = prev {
                prop_assert!(p <= e.deadline);
            }
            prev = Some(e.deadline);
        }
    }

    /// Entries inserted with equal deadlines come back out in the same
    /// relative order they went in.
    #[test]
    fn equal_deadlines_preserve_insertion_order(count in 0usize..20, deadline in 0u64..100) {
        let mut list = TaskList::create();
        for id in 0..count {
            list.insert_by_deadline(TaskListEntry::try_new(id, noop, deadline).unwrap());
        }
        let mut seen = Vec::new();
        while let Some(e) = list.remove_first() {
            seen.push(e.id);
        }
        prop_assert_eq!(seen, (0..count).collect::<Vec<_>>());
    }

    /// `|n_messages|` tracks the number of queued buffered records.
    #[test]
    fn buffered_bookkeeping_matches_queue_len(n_buffered in 0i64..10) {
        let mut mbox = Mailbox::new(16, 4);
        for _ in 0..n_buffered {
            mbox.push_back(Box::new(Message {
                kind: Kind::Buffered,
                payload: Payload::Owned(vec![0u8; 4].into_boxed_slice()),
                status: tempus::mailbox::MessageStatus::Completed,
                owner: None,
            }));
            mbox.n_messages += 1;
        }
        prop_assert_eq!(mbox.no_messages(), n_buffered as usize);
        prop_assert_eq!(mbox.n_blocked, 0);
    }

    /// `|n_blocked|` tracks the number of queued blocked-sender records.
    #[test]
    fn blocked_sender_bookkeeping_matches_queue_len(n_senders in 0i64..10) {
        let mut mbox = Mailbox::new(16, 4);
        let mut bufs: Vec<[u8; 4]> = vec![[0u8; 4]; n_senders as usize];
        for buf in bufs.iter_mut() {
            mbox.push_back(Box::new(Message {
                kind: Kind::BlockedSender,
                payload: Payload::Borrowed(buf.as_mut_ptr(), 4),
                status: tempus::mailbox::MessageStatus::Pending,
                owner: None,
            }));
            mbox.n_blocked += 1;
        }
        prop_assert_eq!(mbox.no_messages(), n_senders as usize);
        prop_assert_eq!(mbox.n_messages, 0);
    }
}
