//! Integration tests: rescuing escaping allocations out of a closing scope.
//!
//! The poisoning allocator scribbles over every block it gets back and
//! hands those blocks out again, so any escape still pointing into
//! released memory would read poison instead of its payload.

use swiff_arena::{ScopeAllocator, ScopeError, LOCAL_HEADER_SIZE};
use swiff_test_utils::{CountingAllocator, PoisoningAllocator};

#[test]
fn escape_survives_arena_reuse() {
    let mut scope = ScopeAllocator::new(PoisoningAllocator::new());
    let mark = scope.enter_local();
    let mut escaped = scope.store_local(&[0xAB; 200]).unwrap();
    let original = escaped;
    for _ in 0..10 {
        let _scratch = scope.store_local(&[0x11; 3000]).unwrap();
    }
    scope.leave_local(mark, &mut [&mut escaped]).unwrap();
    assert_ne!(escaped, original);
    assert!(matches!(
        scope.local(original),
        Err(ScopeError::StaleHandle { .. })
    ));

    // Return every cached block so it is poisoned, then chew through it.
    assert!(scope.collect() > 0);
    let churn = scope.enter_local();
    for _ in 0..20 {
        let _scratch = scope.store_local(&[0x00; 4000]).unwrap();
    }
    scope.leave_local(churn, &mut []).unwrap();

    assert!(scope.raw().reused() > 0);
    assert_eq!(scope.local(escaped).unwrap(), &[0xAB; 200][..]);
}

#[test]
fn escapes_from_many_arenas_are_all_rescued() {
    let mut scope = ScopeAllocator::new(PoisoningAllocator::new());
    let _scratch = scope.store_local(b"parent").unwrap();
    let mark = scope.enter_local();
    let mut keep = Vec::new();
    for i in 0..12u8 {
        keep.push(scope.store_local(&vec![i; 1500]).unwrap());
        let _scratch = scope.alloc_local(700).unwrap();
    }
    let mut refs: Vec<&mut _> = keep.iter_mut().collect();
    scope.leave_local(mark, &mut refs).unwrap();

    for (i, ptr) in keep.iter().enumerate() {
        assert_eq!(scope.local(*ptr).unwrap(), &vec![i as u8; 1500][..]);
    }
    assert_eq!(scope.metrics().escapes_moved, 11);
}

#[test]
fn escape_in_mark_arena_is_compacted_down() {
    let mut scope = ScopeAllocator::new(CountingAllocator::new());
    let _scratch = scope.store_local(b"parent").unwrap();
    let mark = scope.enter_local();
    let _scratch = scope.alloc_local(500).unwrap();
    let mut keep = scope.store_local(b"compact me").unwrap();
    let _scratch = scope.alloc_local(500).unwrap();
    scope.leave_local(mark, &mut [&mut keep]).unwrap();

    assert_eq!(keep.arena(), mark.arena());
    assert_eq!(keep.offset(), mark.offset() + LOCAL_HEADER_SIZE);
    assert_eq!(scope.local(keep).unwrap(), b"compact me");
    assert_eq!(scope.metrics().bytes_rescued, 10);
}

#[test]
fn handles_outside_the_scope_are_not_moved() {
    let mut scope = ScopeAllocator::new(CountingAllocator::new());
    let mut parent = scope.store_local(b"parent").unwrap();
    let mut sibling = scope.store_local(b"sibling").unwrap();
    let mark = scope.enter_local();
    let _scratch = scope.alloc_local(3000).unwrap();
    let _scratch = scope.alloc_local(3000).unwrap();
    let (p, g) = (parent, sibling);
    scope
        .leave_local(mark, &mut [&mut parent, &mut sibling])
        .unwrap();
    assert_eq!((parent, sibling), (p, g));
    assert_eq!(scope.metrics().bytes_rescued, 0);
}

#[test]
fn duplicate_escapes_are_rescued_once() {
    let mut scope = ScopeAllocator::new(CountingAllocator::new());
    let mark = scope.enter_local();
    let mut a = scope.store_local(&[5; 64]).unwrap();
    let mut b = a;
    scope.leave_local(mark, &mut [&mut a, &mut b]).unwrap();
    assert_eq!(a, b);
    assert_eq!(scope.metrics().bytes_rescued, 64);
    assert_eq!(scope.local(b).unwrap(), &[5; 64][..]);
}

#[test]
fn oversized_escape_is_spliced_not_copied() {
    let mut scope = ScopeAllocator::new(CountingAllocator::new());
    let outer = scope.enter_local();
    let mark = scope.enter_local();
    let small = scope.alloc_local(333).unwrap();
    let mut big = scope.alloc_local(8172).unwrap();
    scope.local_mut(big).unwrap().fill(0x5A);
    let before = big;

    // 333 -> 336 aligned + 16 header; 8172 -> 8176 + 16 = an exact 8192.
    let usage = scope.usage();
    assert_ne!(small.arena(), big.arena());
    assert_eq!(usage.local.used_bytes, 352 + 8192);
    assert_eq!(usage.local.capacity_bytes, 4040 + 8192);

    scope.leave_local(mark, &mut [&mut big]).unwrap();
    assert_eq!(big, before);
    assert_eq!(scope.metrics().bytes_rescued, 0);
    assert_eq!(scope.metrics().arenas_spliced, 1);
    assert_eq!(scope.usage().cached_arenas, 1);
    assert_eq!(scope.usage().local.arenas, 1);
    assert_eq!(scope.local_len(big).unwrap(), 8172);
    assert!(scope.local(big).unwrap().iter().all(|&b| b == 0x5A));

    // The enclosing scope owns the spliced arena now.
    scope.leave_local(outer, &mut []).unwrap();
    assert!(matches!(
        scope.local(big),
        Err(ScopeError::StaleHandle { .. })
    ));
    assert_eq!(scope.raw().deallocs(), 1);
    assert_eq!(scope.raw().live(), 1);
}

#[test]
fn spliced_arena_sits_on_top_of_the_surviving_chain() {
    let mut scope = ScopeAllocator::new(CountingAllocator::new());
    let outer = scope.enter_local();
    let parent = scope.store_local(b"parent").unwrap();
    let mark = scope.enter_local();
    let mut big = scope.alloc_local(8172).unwrap();
    scope.leave_local(mark, &mut [&mut big]).unwrap();
    assert_eq!(scope.raw().allocs(), 2);

    // The spliced arena is full, so even a tiny allocation skips the room
    // left in the parent's arena and takes a new one.
    let next = scope.alloc_local(16).unwrap();
    assert_ne!(next.arena(), parent.arena());
    assert_ne!(next.arena(), big.arena());
    assert_eq!(scope.raw().allocs(), 3);
    assert_eq!(scope.usage().local.arenas, 3);

    scope.leave_local(outer, &mut []).unwrap();
    assert_eq!(scope.usage().local.arenas, 0);
    assert_eq!(scope.usage().cached_arenas, 2);
    assert_eq!(scope.raw().live(), 2);
}

#[test]
fn escape_chain_climbs_nested_scopes() {
    let mut scope = ScopeAllocator::new(PoisoningAllocator::new());
    let mut marks = Vec::new();
    for _ in 0..4 {
        marks.push(scope.enter_local());
        let _scratch = scope.alloc_local(2500).unwrap();
    }
    let mut payload = scope.store_local(b"bubble up").unwrap();
    while let Some(mark) = marks.pop() {
        let _scratch = scope.alloc_local(1800).unwrap();
        scope.leave_local(mark, &mut [&mut payload]).unwrap();
        assert_eq!(scope.local(payload).unwrap(), b"bubble up");
    }
    assert_eq!(scope.usage().local.arenas, 1);
}

#[test]
fn corrupt_escape_leaves_scope_open() {
    let mut scope = ScopeAllocator::new(CountingAllocator::new());
    let mark = scope.enter_local();
    let ptr = scope.store_local(&[1; 64]).unwrap();
    let inner = scope.enter_local();
    let mut discarded = scope.alloc_local(0).unwrap();
    scope.leave_local(inner, &mut []).unwrap();
    let before = scope.usage();

    assert!(matches!(
        scope.leave_local(mark, &mut [&mut discarded]),
        Err(ScopeError::OutOfBounds { .. })
    ));
    assert_eq!(scope.usage(), before);
    assert_eq!(scope.local(ptr).unwrap(), &[1; 64][..]);
}
