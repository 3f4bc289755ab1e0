//! # Block Allocator
//!
//! Fixed-size slab for uniform records that are allocated and freed in an
//! order unrelated to their creation (where arena tip reclaim cannot help).

use std::marker::PhantomData;
use std::ptr::NonNull;

use bytemuck::Pod;

use super::{align_up, AllocSlice, Allocator};
use crate::error::{fatal, MemoryError, MemoryResult};

/// End-of-list marker for the intrusive free list.
const END: u32 = u32::MAX;

/// Handle to a block in a [`BlockAllocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BlockHandle(u32);

impl BlockHandle {
    /// Index of the block within its pool.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A pool of `T`-sized blocks threaded onto an intrusive free list.
///
/// One contiguous buffer is carved from the parent allocator at construction.
/// A free block's first word holds the index of the next free block, so both
/// operations are O(1). A per-block in-use flag, carved from the same parent,
/// rejects stale and double-freed handles before they can touch the list.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: BlockAllocator<LineRecord> = BlockAllocator::new(SystemAllocator::instance(), 1024);
///
/// let handle = pool.allocate_block()?;
/// pool.get_mut(handle).len = 5;
/// pool.deallocate_block(handle);
/// ```
pub struct BlockAllocator<'a, T: Pod> {
    parent: &'a dyn Allocator,
    /// Allocated flag per block. Carved before `buffer` so both are
    /// reclaimed at an arena tip on drop.
    in_use: AllocSlice<'a, bool>,
    buffer: NonNull<u8>,
    /// Bytes between consecutive blocks.
    stride: usize,
    /// Total number of blocks.
    blocks: usize,
    /// Head of the free list, or `END`.
    free_head: u32,
    /// Number of blocks handed out.
    allocated: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> BlockAllocator<'a, T> {
    const STRIDE: usize = align_up(
        if std::mem::size_of::<T>() > 4 { std::mem::size_of::<T>() } else { 4 },
        Self::ALIGN,
    );
    const ALIGN: usize = if std::mem::align_of::<T>() > 4 { std::mem::align_of::<T>() } else { 4 };

    /// Creates a pool of `blocks` blocks carved from `parent`.
    ///
    /// # Panics
    ///
    /// Fatal if the parent cannot provide the buffer.
    #[must_use]
    #[track_caller]
    pub fn new(parent: &'a dyn Allocator, blocks: usize) -> Self {
        match Self::try_new(parent, blocks) {
            Ok(pool) => pool,
            Err(err) => fatal(err),
        }
    }

    /// Creates a pool, reporting failure.
    ///
    /// # Errors
    ///
    /// [`MemoryError::CapacityExceeded`] if `blocks` does not fit a 32-bit
    /// index, or the parent's allocation error.
    pub fn try_new(parent: &'a dyn Allocator, blocks: usize) -> MemoryResult<Self> {
        if blocks >= END as usize {
            return Err(MemoryError::CapacityExceeded { capacity: END as usize - 1 });
        }
        let bytes = Self::STRIDE
            .checked_mul(blocks)
            .ok_or(MemoryError::CapacityExceeded { capacity: blocks })?;
        let in_use = AllocSlice::try_from_fn(blocks, |_| false, parent)?;
        let buffer = parent
            .allocate(bytes, Self::ALIGN)
            .ok_or_else(|| super::allocation_failure(parent, bytes))?;

        // SAFETY: the buffer is valid for `bytes` bytes. Zeroing it up front
        // means every block is initialized before any handle can observe it.
        unsafe { std::ptr::write_bytes(buffer.as_ptr(), 0, bytes) };

        let mut pool = Self {
            parent,
            in_use,
            buffer,
            stride: Self::STRIDE,
            blocks,
            free_head: END,
            allocated: 0,
            _marker: PhantomData,
        };
        for index in (0..blocks).rev() {
            pool.push_free(index as u32);
        }
        Ok(pool)
    }

    /// Total number of blocks.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.blocks
    }

    /// Number of blocks currently handed out.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Number of free blocks.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.blocks - self.allocated
    }

    /// Pops a block off the free list, zeroed.
    ///
    /// Returns `None` when every block is in use; the pool never grows.
    pub fn allocate_block(&mut self) -> Option<BlockHandle> {
        if self.free_head == END {
            return None;
        }
        let index = self.free_head;
        assert!(
            (index as usize) < self.blocks && !self.in_use[index as usize],
            "block free list corrupted at {index}"
        );
        self.free_head = self.next_free(index);
        // SAFETY: index < blocks was checked above, so the block lies inside
        // the buffer.
        unsafe { std::ptr::write_bytes(self.block_ptr(index), 0, self.stride) };
        self.in_use[index as usize] = true;
        self.allocated += 1;
        Some(BlockHandle(index))
    }

    /// Pops a block, reporting exhaustion as an error.
    ///
    /// # Errors
    ///
    /// [`MemoryError::PoolExhausted`] when every block is in use.
    pub fn try_allocate_block(&mut self) -> MemoryResult<BlockHandle> {
        self.allocate_block()
            .ok_or(MemoryError::PoolExhausted { blocks: self.blocks })
    }

    /// Pushes a block back onto the free list.
    ///
    /// The handle must not be used again until the block is handed out anew.
    ///
    /// # Panics
    ///
    /// Panics if the handle is out of range or the block is already free.
    pub fn deallocate_block(&mut self, handle: BlockHandle) {
        self.check_allocated(handle);
        self.in_use[handle.index()] = false;
        self.push_free(handle.0);
        self.allocated -= 1;
    }

    /// Reads a block.
    ///
    /// # Panics
    ///
    /// Panics if the handle is out of range or the block is free.
    #[must_use]
    pub fn get(&self, handle: BlockHandle) -> &T {
        bytemuck::from_bytes(self.block_bytes(handle))
    }

    /// Writes a block.
    ///
    /// # Panics
    ///
    /// Panics if the handle is out of range or the block is free.
    pub fn get_mut(&mut self, handle: BlockHandle) -> &mut T {
        self.check_allocated(handle);
        // SAFETY: the block is inside the buffer, fully initialized (zeroed at
        // construction) and exclusively borrowed through `&mut self`.
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(self.block_ptr(handle.0), std::mem::size_of::<T>())
        };
        bytemuck::from_bytes_mut(bytes)
    }

    /// Returns true if `handle` names a block currently handed out.
    #[must_use]
    pub fn is_allocated(&self, handle: BlockHandle) -> bool {
        self.in_use.get(handle.index()).copied().unwrap_or(false)
    }

    #[track_caller]
    fn check_allocated(&self, handle: BlockHandle) {
        assert!(handle.index() < self.blocks, "block {} out of range", handle.0);
        assert!(self.in_use[handle.index()], "block {} is not allocated", handle.0);
    }

    fn block_bytes(&self, handle: BlockHandle) -> &[u8] {
        self.check_allocated(handle);
        // SAFETY: the block is inside the buffer and fully initialized.
        unsafe { std::slice::from_raw_parts(self.block_ptr(handle.0), std::mem::size_of::<T>()) }
    }

    #[inline]
    fn block_ptr(&self, index: u32) -> *mut u8 {
        debug_assert!((index as usize) < self.blocks);
        // SAFETY: callers pass index < blocks; stride * blocks fits the buffer.
        unsafe { self.buffer.as_ptr().add(index as usize * self.stride) }
    }

    #[inline]
    fn next_free(&self, index: u32) -> u32 {
        // SAFETY: blocks are aligned to at least 4 bytes and hold at least one u32.
        unsafe { self.block_ptr(index).cast::<u32>().read() }
    }

    #[inline]
    fn push_free(&mut self, index: u32) {
        // SAFETY: as in `next_free`.
        unsafe { self.block_ptr(index).cast::<u32>().write(self.free_head) };
        self.free_head = index;
    }
}

impl<T: Pod> Drop for BlockAllocator<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the buffer came from `parent` with exactly this size.
        unsafe { self.parent.deallocate(self.buffer, self.stride * self.blocks) };
    }
}
