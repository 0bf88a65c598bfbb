use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};

use crate::address_space::AddressSpace;
use crate::pal::{Platform, PlatformFacade};
use crate::rounding::round_down_to_multiple;
use crate::{Error, Result, VirtualVecBuilder};

/// Capacity, in elements, of the first growth step of an empty container.
const INITIAL_GROW_ELEMENTS: usize = 8;

/// A growable sequence of `T` stored in a reserved range of virtual address space.
///
/// On creation, the container reserves a fixed range of address space (1 GiB by default) without
/// using any physical memory. As elements are added, whole pages at the front of the range are
/// committed. Growth therefore never moves existing elements: the start address of the storage
/// stays the same for the lifetime of the container.
///
/// Capacity only grows, except through an explicit [`shrink_to_fit()`][Self::shrink_to_fit].
/// Removing elements, resizing to a smaller length or assigning a smaller container keeps the
/// committed memory for reuse.
///
/// # Errors
///
/// Operations that may need more capacity return a [`Result`]. They fail with
/// [`Error::CapacityExceeded`] when the reserved address space cannot hold the requested number
/// of elements and with [`Error::AddressSpace`] if the operating system refuses to commit memory.
/// Indexed operations fail with [`Error::IndexOutOfBounds`].
///
/// # Element lifecycle
///
/// Elements are constructed in place one at a time as they enter the container and dropped one
/// at a time as they leave it, in increasing index order. The order-preserving erase operations
/// move later elements forward with [`Clone::clone_from`], so an erase of `M` trailing elements
/// performs `M` assignments and drops only the vacated slots at the end.
///
/// # Examples
///
/// ```
/// use virtual_vec::VirtualVec;
///
/// let mut numbers = VirtualVec::new();
///
/// numbers.push(123_u64)?;
/// numbers.push(456)?;
/// numbers.push(789)?;
///
/// numbers.erase(1)?;
///
/// assert_eq!(numbers.len(), 2);
/// assert_eq!(numbers[0], 123);
/// assert_eq!(numbers[1], 789);
/// # Ok::<(), virtual_vec::Error>(())
/// ```
///
/// # Thread safety
///
/// The container is [`Send`] if `T` is [`Send`] and [`Sync`] if `T` is [`Sync`], just like
/// [`Vec`]. It performs no internal synchronization.
pub struct VirtualVec<T> {
    space: AddressSpace,

    /// Number of live elements, occupying slots `[0, len)`.
    len: usize,

    /// Number of whole elements that fit into the committed memory.
    capacity: usize,

    /// Number of whole elements that fit into the reserved address space.
    max_capacity: usize,

    _owns: PhantomData<T>,
}

impl<T> VirtualVec<T> {
    /// Creates an empty container that reserves [`DEFAULT_MAX_BYTES`][crate::DEFAULT_MAX_BYTES]
    /// of address space.
    ///
    /// Use [`builder()`][Self::builder] to reserve a different amount or to handle reservation
    /// failures.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses the reservation, if `T` is a zero-sized type or
    /// if `T` requires an alignment greater than the page size.
    #[must_use]
    pub fn new() -> Self {
        match Self::builder().build() {
            Ok(vec) => vec,
            Err(e) => panic!("failed to create VirtualVec: {e}"),
        }
    }

    /// Starts building a container with custom settings.
    pub fn builder() -> VirtualVecBuilder<T> {
        VirtualVecBuilder::new()
    }

    pub(crate) fn new_inner(platform: PlatformFacade, max_bytes: usize) -> Result<Self> {
        assert!(
            size_of::<T>() > 0,
            "VirtualVec does not support zero-sized element types"
        );

        let page_size = platform.page_size();

        assert!(
            align_of::<T>() <= page_size.get(),
            "element alignment {} exceeds the page size {page_size}",
            align_of::<T>()
        );

        let reserved_len = round_down_to_multiple(max_bytes, page_size.get());
        let max_capacity = Self::slots_in(reserved_len);

        if max_capacity == 0 {
            return Err(Error::CapacityExceeded {
                requested: 1,
                max_capacity,
            });
        }

        let space = AddressSpace::reserve(platform, page_size, reserved_len)?;

        Ok(Self {
            space,
            len: 0,
            capacity: 0,
            max_capacity,
            _owns: PhantomData,
        })
    }

    /// Number of whole elements that fit into `bytes`.
    #[expect(
        clippy::integer_division,
        reason = "a partial element at the end of a range is unusable, so flooring is intended"
    )]
    fn slots_in(bytes: usize) -> usize {
        // Cannot divide by zero, zero-sized types are rejected on creation.
        bytes / size_of::<T>()
    }

    /// Number of bytes occupied by `count` elements.
    ///
    /// Only called with counts up to the maximum capacity, which fit in the reservation,
    /// so this cannot overflow.
    fn bytes_for(count: usize) -> usize {
        count.wrapping_mul(size_of::<T>())
    }

    /// Returns the number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the container holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the container can hold without committing more memory.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of elements that fit into the reserved address space.
    ///
    /// No operation can grow the container beyond this.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Returns the page size of the host, which is the granularity of growth.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.space.page_size().get()
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not less than the length.
    pub fn get(&self, index: usize) -> Result<&T> {
        self.check_index(index)?;

        // SAFETY: The index is in bounds, so the slot holds a live element. The reference
        // borrows `self`, so the element cannot be removed while it exists.
        Ok(unsafe { self.slot(index).as_ref() })
    }

    /// Returns an exclusive reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not less than the length.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        self.check_index(index)?;

        // SAFETY: The index is in bounds, so the slot holds a live element. The reference
        // borrows `self` exclusively, so it is the only reference to the element.
        Ok(unsafe { self.slot(index).as_mut() })
    }

    /// Appends an element to the end of the container.
    ///
    /// If the container is full, it grows by doubling its capacity (or to 8 elements, if empty),
    /// limited by the reserved address space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the container already holds
    /// [`max_capacity()`][Self::max_capacity] elements and [`Error::AddressSpace`] if the
    /// operating system refuses to commit more memory. The value is dropped in both cases.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.capacity {
            if self.len >= self.max_capacity {
                return Err(Error::CapacityExceeded {
                    requested: self.len.saturating_add(1),
                    max_capacity: self.max_capacity,
                });
            }

            self.grow_by_bytes(self.default_grow_bytes())?;
        }

        debug_assert!(self.len < self.capacity);

        // SAFETY: The slot is within capacity and does not hold a live element.
        unsafe { self.slot(self.len).write(value) };

        // Cannot overflow, bounded by capacity.
        self.len = self.len.wrapping_add(1);

        Ok(())
    }

    /// Ensures that the container can hold at least `capacity` elements without committing
    /// more memory.
    ///
    /// Does nothing if the capacity is already sufficient. Never changes the length or the
    /// existing elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `capacity` is greater than
    /// [`max_capacity()`][Self::max_capacity] and [`Error::AddressSpace`] if the operating
    /// system refuses to commit more memory.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity > self.max_capacity {
            return Err(Error::CapacityExceeded {
                requested: capacity,
                max_capacity: self.max_capacity,
            });
        }

        if capacity <= self.capacity {
            return Ok(());
        }

        // Cannot underflow, guarded by the check above.
        self.grow_by_bytes(Self::bytes_for(capacity.wrapping_sub(self.capacity)))
    }

    /// Resizes the container to `new_len` elements, filling new slots with clones of `value`.
    ///
    /// If the container shrinks, the elements beyond `new_len` are dropped in increasing index
    /// order. Capacity is never reduced. Does nothing if `new_len` equals the length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `new_len` is greater than
    /// [`max_capacity()`][Self::max_capacity] and [`Error::AddressSpace`] if the operating
    /// system refuses to commit more memory.
    pub fn resize(&mut self, new_len: usize, value: &T) -> Result<()>
    where
        T: Clone,
    {
        self.resize_with(new_len, || value.clone())
    }

    /// Resizes the container to `new_len` elements, filling new slots with [`Default::default()`].
    ///
    /// If the container shrinks, the elements beyond `new_len` are dropped in increasing index
    /// order. Capacity is never reduced. Does nothing if `new_len` equals the length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if `new_len` is greater than
    /// [`max_capacity()`][Self::max_capacity] and [`Error::AddressSpace`] if the operating
    /// system refuses to commit more memory.
    pub fn resize_default(&mut self, new_len: usize) -> Result<()>
    where
        T: Default,
    {
        self.resize_with(new_len, T::default)
    }

    fn resize_with(&mut self, new_len: usize, mut f: impl FnMut() -> T) -> Result<()> {
        if new_len > self.max_capacity {
            return Err(Error::CapacityExceeded {
                requested: new_len,
                max_capacity: self.max_capacity,
            });
        }

        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }

        self.reserve(new_len)?;

        while self.len < new_len {
            // SAFETY: The slot is within capacity and does not hold a live element.
            unsafe { self.slot(self.len).write(f()) };

            // Incremented per element so that a panicking constructor leaves only
            // constructed elements inside the live range. Cannot overflow, bounded by new_len.
            self.len = self.len.wrapping_add(1);
        }

        Ok(())
    }

    /// Drops all elements. Capacity is not reduced.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Removes the element at `index`, shifting all later elements one slot forward.
    ///
    /// Each later element is assigned into its predecessor with [`Clone::clone_from`], then the
    /// now redundant last slot is dropped. This preserves the order of the remaining elements
    /// and costs one assignment per later element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not less than the length.
    pub fn erase(&mut self, index: usize) -> Result<()>
    where
        T: Clone,
    {
        self.check_index(index)?;

        // Cannot underflow, the index check above proves we are not empty.
        let last = self.len.wrapping_sub(1);

        for target in index..last {
            // SAFETY: Both slots are live and distinct.
            unsafe { self.assign_slot(target, target.wrapping_add(1)) };
        }

        self.truncate(last);

        Ok(())
    }

    /// Removes the elements in the closed range `[first, last]`, shifting all later elements
    /// forward.
    ///
    /// `first == last` removes exactly one element. Each element after the range is assigned
    /// into the slot `last - first + 1` positions earlier with [`Clone::clone_from`], in
    /// increasing index order, then the now redundant slots at the end are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] if `last` is smaller than `first` and
    /// [`Error::IndexOutOfBounds`] if `last` is not less than the length.
    pub fn erase_range(&mut self, first: usize, last: usize) -> Result<()>
    where
        T: Clone,
    {
        if last < first {
            return Err(Error::InvalidRange { first, last });
        }

        self.check_index(last)?;

        // Cannot overflow or underflow: first <= last < len.
        let count = last.wrapping_sub(first).wrapping_add(1);
        let new_len = self.len.wrapping_sub(count);

        for target in first..new_len {
            // SAFETY: Both slots are live and distinct, as count is nonzero and
            // target + count < len.
            unsafe { self.assign_slot(target, target.wrapping_add(count)) };
        }

        self.truncate(new_len);

        Ok(())
    }

    /// Removes the element at `index` by overwriting it with the last element.
    ///
    /// This takes constant time but does not preserve the order of the elements. At most one
    /// assignment (via [`Clone::clone_from`]) and exactly one drop take place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index` is not less than the length.
    pub fn erase_by_swap(&mut self, index: usize) -> Result<()>
    where
        T: Clone,
    {
        self.check_index(index)?;

        // Cannot underflow, the index check above proves we are not empty.
        let last = self.len.wrapping_sub(1);

        if index < last {
            // SAFETY: Both slots are live and distinct.
            unsafe { self.assign_slot(index, last) };
        }

        self.truncate(last);

        Ok(())
    }

    /// Returns committed memory that is not needed for the current elements to the operating
    /// system, in whole pages.
    ///
    /// Afterwards, the capacity is the number of elements that fit into the pages still
    /// needed for the current length, so it may remain greater than the length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressSpace`] if the operating system refuses to decommit memory, in
    /// which case the capacity is unchanged.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        self.space.decommit_beyond(Self::bytes_for(self.len))?;
        self.capacity = Self::slots_in(self.space.committed_len());

        Ok(())
    }

    /// Creates a copy of the container with the same maximum size, at least the same capacity
    /// and clones of all elements in the same order.
    ///
    /// This is the fallible form of [`Clone::clone()`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressSpace`] if the operating system refuses to reserve or commit
    /// memory for the copy.
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
    {
        let mut copy = Self::new_inner(self.space.platform().clone(), self.space.reserved_len())?;

        copy.reserve(self.capacity)?;
        copy.extend_from(self)?;

        Ok(copy)
    }

    /// Replaces the contents of the container with clones of the elements of `other`.
    ///
    /// All current elements are dropped first. If `other` has a greater capacity, the container
    /// grows to at least that capacity; a container never gives up capacity on assignment.
    ///
    /// This is the fallible form of [`Clone::clone_from()`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the capacity of `other` exceeds
    /// [`max_capacity()`][Self::max_capacity] and [`Error::AddressSpace`] if the operating
    /// system refuses to commit more memory. The container is empty after a failure.
    pub fn assign_from(&mut self, other: &Self) -> Result<()>
    where
        T: Clone,
    {
        self.clear();

        if other.capacity > self.capacity {
            self.reserve(other.capacity)?;
        }

        self.extend_from(other)
    }

    fn extend_from(&mut self, other: &Self) -> Result<()>
    where
        T: Clone,
    {
        for index in 0..other.len {
            // SAFETY: The index is below the length of `other`, so the slot is live.
            let element = unsafe { other.slot(index).as_ref() };

            self.push(element.clone())?;
        }

        Ok(())
    }

    /// Commits at least `bytes` more memory, limited by the reserved address space.
    fn grow_by_bytes(&mut self, bytes: usize) -> Result<()> {
        if bytes == 0 {
            return Ok(());
        }

        if self.space.uncommitted_len() == 0 {
            return Err(Error::CapacityExceeded {
                requested: self.capacity.saturating_add(Self::slots_in(bytes).max(1)),
                max_capacity: self.max_capacity,
            });
        }

        self.space.commit(bytes)?;
        self.capacity = Self::slots_in(self.space.committed_len());

        Ok(())
    }

    /// The growth step used when appending to a full container: double the capacity, with
    /// a minimum of a few elements for an empty container.
    fn default_grow_bytes(&self) -> usize {
        let elements = if self.capacity == 0 {
            INITIAL_GROW_ELEMENTS
        } else {
            self.capacity
        };

        // May exceed the reservation, in which case growth is clamped to what remains.
        elements.saturating_mul(size_of::<T>())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.len {
            Ok(())
        } else {
            Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            })
        }
    }

    /// Drops the elements in `[new_len, len)` and shortens the live range accordingly.
    ///
    /// Does nothing if `new_len` is not less than the length.
    fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }

        // Cannot underflow, guarded by the check above.
        let count = self.len.wrapping_sub(new_len);

        // Shortened first, so that a panicking destructor can at worst leak the remaining
        // elements, never expose them again.
        self.len = new_len;

        // SAFETY: The slots in [new_len, new_len + count) held live elements that are no longer
        // part of the live range, so nothing else can reach them. Dropping a slice drops its
        // elements in increasing index order.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.slot(new_len).as_ptr(),
                count,
            ));
        }
    }

    /// Assigns the element in slot `source` into the element in slot `target`.
    ///
    /// # Safety
    ///
    /// Both slots must hold live elements and must not be the same slot.
    unsafe fn assign_slot(&mut self, target: usize, source: usize)
    where
        T: Clone,
    {
        debug_assert_ne!(target, source);

        // SAFETY: Forwarding the guarantees from the caller. The slots are distinct, so the
        // exclusive and the shared reference do not overlap.
        let (target, source) = unsafe { (self.slot(target).as_mut(), self.slot(source).as_ref()) };

        target.clone_from(source);
    }

    /// Pointer to the slot at `index`.
    ///
    /// The pointer is aligned for `T` because the reservation is page-aligned, the alignment
    /// of `T` is at most the page size and the size of `T` is a multiple of its alignment.
    /// It is only valid to read or write through if `index` is less than the capacity.
    fn slot(&self, index: usize) -> NonNull<T> {
        debug_assert!(index < self.capacity);

        // SAFETY: Slots below capacity lie inside the committed prefix of the reservation.
        unsafe { self.space.base().cast::<T>().add(index) }
    }
}

impl<T> Default for VirtualVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for VirtualVec<T> {
    fn drop(&mut self) {
        // The address space is released afterwards, when the field is dropped.
        self.clear();
    }
}

impl<T: Clone> Clone for VirtualVec<T> {
    /// # Panics
    ///
    /// Panics if the operating system refuses to reserve or commit memory for the copy.
    /// Use [`try_clone()`][VirtualVec::try_clone] to handle this.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(e) => panic!("failed to clone VirtualVec: {e}"),
        }
    }

    /// # Panics
    ///
    /// Panics if `source` does not fit into the address space of `self` or the operating
    /// system refuses to commit memory. Use [`assign_from()`][VirtualVec::assign_from]
    /// to handle this.
    fn clone_from(&mut self, source: &Self) {
        if let Err(e) = self.assign_from(source) {
            panic!("failed to assign VirtualVec: {e}");
        }
    }
}

impl<T> Index<usize> for VirtualVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Ok(element) => element,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T> IndexMut<usize> for VirtualVec<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Ok(element) => element,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T> fmt::Debug for VirtualVec<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualVec")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("max_capacity", &self.max_capacity)
            .field("space", &self.space)
            .finish()
    }
}

// SAFETY: The container owns its elements exclusively, like a `Vec<T>`, so moving it to another
// thread moves the elements with it. The address space has no thread affinity.
unsafe impl<T: Send> Send for VirtualVec<T> {}

// SAFETY: Shared references to the container only give out shared references to elements.
unsafe impl<T: Sync> Sync for VirtualVec<T> {}
