//! Example code for the `README.md` file.
//!
//! This contains the same code that appears in the `virtual_vec` package `README.md`.
//!
//! Run with `RUST_LOG=trace` to see the reservation and every commit being logged.

use tracing_subscriber::EnvFilter;
use virtual_vec::{Error, VirtualVec};

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Reserves 1 GiB of address space without using any physical memory yet.
    let mut numbers = VirtualVec::new();

    for value in [123_u32, 456, 789, 123_456_789] {
        numbers.push(value)?;
    }

    println!(
        "{} elements, capacity {} (page size {})",
        numbers.len(),
        numbers.capacity(),
        numbers.page_size()
    );

    // Order-preserving removal: [123, 789, 123456789]
    numbers.erase(1)?;

    // Constant-time removal that moves the last element into the hole: [123456789, 789]
    numbers.erase_by_swap(0)?;

    for index in 0..numbers.len() {
        println!("numbers[{index}] = {}", numbers[index]);
    }

    // Growing never moves existing elements.
    let first = std::ptr::from_ref(&numbers[0]);
    numbers.resize(1_000_000, &0)?;
    assert_eq!(first, std::ptr::from_ref(&numbers[0]));

    // Smaller reservations fail cleanly once exhausted.
    let mut bounded = VirtualVec::<u64>::builder().max_bytes(64 * 1024).build()?;
    bounded.resize_default(bounded.max_capacity())?;

    match bounded.push(1) {
        Err(Error::CapacityExceeded { max_capacity, .. }) => {
            println!("bounded container is full at {max_capacity} elements");
        }
        other => println!("unexpected result: {other:?}"),
    }

    Ok(())
}
