//! Integration tests for `virtual_vec` against the real platform.
//!
//! These tests reserve and commit real virtual memory, so capacities are derived from the page
//! size of the host rather than hardcoded.

use std::ptr;
use std::thread;

use testing::{LifecycleCounts, Tracked};
use virtual_vec::{DEFAULT_MAX_BYTES, Error, VirtualVec};

/// Capacity, in elements, of the smallest whole number of pages that holds `count` elements.
fn page_rounded_capacity<T>(count: usize, page_size: usize) -> usize {
    let bytes = count * size_of::<T>();
    bytes.div_ceil(page_size) * page_size / size_of::<T>()
}

fn values<T: Clone>(vec: &VirtualVec<T>) -> Vec<T> {
    (0..vec.len()).map(|i| vec[i].clone()).collect()
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn default_reservation_is_one_gibibyte() {
    let vec = VirtualVec::<u32>::new();

    assert!(vec.page_size().is_power_of_two());
    assert_eq!(vec.max_capacity(), DEFAULT_MAX_BYTES / size_of::<u32>());
    assert_eq!(vec.capacity(), 0);
    assert!(vec.is_empty());
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn default_is_equivalent_to_new() {
    let vec = VirtualVec::<u64>::default();

    assert_eq!(vec.max_capacity(), DEFAULT_MAX_BYTES / size_of::<u64>());
    assert!(vec.is_empty());
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn push_sequence_reports_values_in_order() {
    let mut vec = VirtualVec::new();

    for value in [123_u32, 456, 789, 123_456_789] {
        vec.push(value).unwrap();
    }

    assert_eq!(vec.len(), 4);
    assert_eq!(values(&vec), vec![123, 456, 789, 123_456_789]);

    // The first growth step is 8 elements, rounded up to a whole page.
    assert_eq!(
        vec.capacity(),
        page_rounded_capacity::<u32>(8, vec.page_size())
    );
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn reserve_rounds_up_to_whole_pages() {
    let mut vec = VirtualVec::<u32>::new();

    vec.reserve(100).unwrap();
    assert_eq!(vec.capacity(), vec.page_size() / size_of::<u32>());

    vec.reserve(2500).unwrap();
    assert_eq!(
        vec.capacity(),
        page_rounded_capacity::<u32>(2500, vec.page_size())
    );
    assert!(vec.is_empty());
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn large_push_sequence_keeps_address_and_values() {
    let mut vec = VirtualVec::<u64>::new();
    vec.push(0).unwrap();
    let first = ptr::from_ref(&vec[0]);

    for i in 1..100_000 {
        vec.push(i).unwrap();
    }

    assert_eq!(ptr::from_ref(&vec[0]), first);
    assert_eq!(vec.len(), 100_000);

    for i in (0..100_000).step_by(997) {
        assert_eq!(vec[i as usize], i);
    }
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn resize_big_then_small_keeps_capacity() {
    let mut vec = VirtualVec::<u32>::new();

    vec.resize(2500, &0xDEAD_BEEF).unwrap();
    assert_eq!(vec.len(), 2500);
    assert_eq!(vec[0], 0xDEAD_BEEF);
    assert_eq!(vec[2499], 0xDEAD_BEEF);

    let capacity = vec.capacity();
    assert_eq!(
        capacity,
        page_rounded_capacity::<u32>(2500, vec.page_size())
    );

    vec.resize_default(500).unwrap();

    assert_eq!(vec.len(), 500);
    assert_eq!(vec.capacity(), capacity);
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn erase_scenarios() {
    let mut vec = VirtualVec::new();
    for value in [123_u32, 456, 789, 123_456_789] {
        vec.push(value).unwrap();
    }

    let mut by_index = vec.clone();
    by_index.erase(1).unwrap();
    assert_eq!(values(&by_index), vec![123, 789, 123_456_789]);

    let mut by_range = vec.clone();
    by_range.erase_range(1, 2).unwrap();
    assert_eq!(values(&by_range), vec![123, 123_456_789]);

    let mut by_swap = vec.clone();
    by_swap.erase_by_swap(1).unwrap();
    assert_eq!(values(&by_swap), vec![123, 123_456_789, 789]);

    // The original is untouched by operations on its copies.
    assert_eq!(values(&vec), vec![123, 456, 789, 123_456_789]);
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn limited_reservation_is_exhausted_cleanly() {
    let page_size = VirtualVec::<u8>::new().page_size();

    let mut vec = VirtualVec::<u64>::builder()
        .max_bytes(page_size * 2 + 1)
        .build()
        .unwrap();

    let max_capacity = page_size * 2 / size_of::<u64>();
    assert_eq!(vec.max_capacity(), max_capacity);

    for i in 0..max_capacity {
        vec.push(i as u64).unwrap();
    }

    assert_eq!(vec.capacity(), max_capacity);

    let result = vec.push(0);
    assert!(matches!(result, Err(Error::CapacityExceeded { .. })));

    let result = vec.reserve(max_capacity + 1);
    assert!(matches!(result, Err(Error::CapacityExceeded { .. })));

    assert_eq!(vec.len(), max_capacity);
    assert_eq!(vec[max_capacity - 1], (max_capacity - 1) as u64);
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn reservation_smaller_than_one_element_fails() {
    let result = VirtualVec::<u8>::builder().max_bytes(1).build();

    assert!(matches!(
        result,
        Err(Error::CapacityExceeded {
            requested: 1,
            max_capacity: 0
        })
    ));
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn shrink_to_fit_returns_pages_and_keeps_values() {
    let mut vec = VirtualVec::<u64>::new();
    vec.resize(100_000, &7).unwrap();

    vec.resize_default(10).unwrap();
    vec.shrink_to_fit().unwrap();

    assert_eq!(
        vec.capacity(),
        page_rounded_capacity::<u64>(10, vec.page_size())
    );
    assert_eq!(values(&vec), vec![7; 10]);

    // Decommitted pages can be committed again.
    vec.resize(100_000, &9).unwrap();
    assert_eq!(vec[9], 7);
    assert_eq!(vec[99_999], 9);
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn copy_construction_and_assignment() {
    let counts = LifecycleCounts::new();

    let mut first = VirtualVec::new();
    for value in [13, 57, 911, 24, 68, 1012] {
        first.push(Tracked::new(&counts, value)).unwrap();
    }

    let mut second = VirtualVec::new();
    for value in [312, 654, 987, 121_110, 151_413, 181_716, 212_019, 242_322, 272_625] {
        second.push(Tracked::new(&counts, value)).unwrap();
    }

    counts.reset();

    let copy = second.clone();
    assert_eq!(counts.clones(), 9);
    assert_eq!(copy.capacity(), second.capacity());

    first.clone_from(&copy);
    assert_eq!(counts.drops(), 6);
    assert_eq!(counts.clones(), 18);

    let first_values: Vec<_> = (0..first.len()).map(|i| first[i].value()).collect();
    let second_values: Vec<_> = (0..second.len()).map(|i| second[i].value()).collect();
    assert_eq!(first_values, second_values);
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn assigning_smaller_container_drops_old_elements() {
    let counts = LifecycleCounts::new();

    let mut large = VirtualVec::new();
    large.resize(1000, &Tracked::new(&counts, 1122)).unwrap();
    let capacity = large.capacity();

    let mut small = VirtualVec::new();
    small.push(Tracked::new(&counts, 987)).unwrap();
    small.push(Tracked::new(&counts, 654)).unwrap();

    counts.reset();
    large.clone_from(&small);

    assert_eq!(counts.drops(), 1000);
    assert_eq!(large.len(), 2);
    assert_eq!(large.capacity(), capacity);
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn container_moves_between_threads() {
    let mut vec = VirtualVec::new();
    vec.resize(1000, &String::from("hello")).unwrap();

    let vec = thread::spawn(move || {
        vec.erase_range(0, 498).unwrap();
        vec
    })
    .join()
    .unwrap();

    assert_eq!(vec.len(), 501);
    assert_eq!(vec[500], "hello");
}

#[test]
#[cfg_attr(miri, ignore)] // Test uses the real platform which cannot be executed under Miri.
fn index_errors_are_reported() {
    let mut vec = VirtualVec::<u32>::new();
    vec.push(1).unwrap();

    assert!(matches!(
        vec.get(1),
        Err(Error::IndexOutOfBounds { index: 1, len: 1 })
    ));
    assert!(matches!(
        vec.erase_range(1, 0),
        Err(Error::InvalidRange { first: 1, last: 0 })
    ));
    assert!(matches!(vec.erase_by_swap(5), Err(Error::IndexOutOfBounds { .. })));
}
