//! Seed scenarios 1-3: list behavior in isolation, no kernel singleton
//! involved. Grounded directly on the walk-the-list seed scenarios.

use tempus::list::TaskList;
use tempus::task::TaskListEntry;

extern "C" fn noop() -> ! {
    loop {
        std::thread::park();
    }
}

fn entry(id: usize, deadline: u64) -> Box<TaskListEntry> {
    let mut e = TaskListEntry::try_new(id, noop, deadline).expect("test allocation must succeed");
    e.wake_tick = Some(deadline);
    e
}

#[test]
fn empty_list_behaves_like_empty() {
    let mut list = TaskList::create();
    assert!(list.peek().is_none());
    assert!(list.remove_first().is_none());
    assert_eq!(list.len(), 0);
}

#[test]
fn timer_list_walks_in_wake_tick_order() {
    let delays = [1u64, 10, 5, 11, 6, 2, 9, 4, 7, 8, 3];
    let mut list = TaskList::create();
    for (id, &d) in delays.iter().enumerate() {
        list.insert_by_wake(entry(id, d));
    }
    assert_eq!(list.len(), 11);

    let mut seen = Vec::new();
    while let Some(e) = list.remove_first() {
        seen.push(e.wake_tick.unwrap());
    }
    assert_eq!(seen, (1..=11).collect::<Vec<_>>());
}

#[test]
fn ready_list_walks_in_deadline_order() {
    let deadlines = [1u64, 10, 5, 11, 6, 2, 9, 4, 7, 8, 3];
    let mut list = TaskList::create();
    for (id, &d) in deadlines.iter().enumerate() {
        list.insert_by_deadline(entry(id, d));
    }

    let mut seen = Vec::new();
    while let Some(e) = list.remove_first() {
        seen.push(e.deadline);
    }
    assert_eq!(seen, (1..=11).collect::<Vec<_>>());
}
