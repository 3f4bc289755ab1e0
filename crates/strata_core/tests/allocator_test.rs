//! Integration tests for allocators and containers.

#![allow(unsafe_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_core::{
    kilobytes, AllocBox, Allocator, ArenaAllocator, BlockAllocator, DynArray, FixedArray, LineLog,
    SystemAllocator, MAX_ALIGN,
};

#[test]
fn test_arena_cursor_stays_in_bounds() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5157_A7A);
    let arena = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(4));
    let total = arena.total_bytes().unwrap();
    let mut live: Vec<(std::ptr::NonNull<u8>, usize)> = Vec::new();

    for _ in 0..10_000 {
        if rng.gen_bool(0.6) {
            let size = rng.gen_range(0..200);
            let align = 1 << rng.gen_range(0..7);
            if let Some(ptr) = arena.allocate(size, align) {
                let start = ptr.as_ptr() as usize;
                assert_eq!(start % align, 0);
                assert!(arena.contains(ptr.as_ptr()) || size == 0);
                for &(other, other_size) in &live {
                    let other_start = other.as_ptr() as usize;
                    let disjoint =
                        start + size <= other_start || other_start + other_size <= start;
                    assert!(
                        size == 0 || other_size == 0 || disjoint,
                        "[{start:#x}, +{size}) overlaps live [{other_start:#x}, +{other_size})"
                    );
                }
                live.push((ptr, size));
            }
        } else if let Some((ptr, size)) = live.pop() {
            unsafe { arena.deallocate(ptr, size) };
        }
        assert!(arena.used_bytes() <= total);
        assert_eq!(arena.used_bytes() + arena.remaining_bytes(), total);
    }
}

#[test]
fn test_lifo_release_returns_to_empty() {
    let arena = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(1));
    let sizes = [1, 17, 32, 5, 64, 100];
    let blocks: Vec<_> = sizes
        .iter()
        .map(|&size| (arena.allocate(size, 8).unwrap(), size))
        .collect();
    for (ptr, size) in blocks.into_iter().rev() {
        unsafe { arena.deallocate(ptr, size) };
    }
    assert_eq!(arena.used_bytes(), 0);
}

#[test]
fn test_dyn_array_growth_is_pow2_and_ordered() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let heap = SystemAllocator::instance();
    for _ in 0..20 {
        let n = rng.gen_range(0..5_000);
        let mut array = DynArray::new(heap);
        for i in 0..n {
            array.push(i);
        }
        assert_eq!(array.len(), n);
        assert!(array.capacity() >= n);
        if n > 0 {
            assert!(array.capacity().is_power_of_two());
            assert!(array.capacity() >= 16);
        }
        assert!(array.iter().copied().eq(0..n));
    }
}

#[test]
fn test_dyn_array_in_frame_arena() {
    let mut frame = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(64));
    for _ in 0..3 {
        {
            let mut visible = DynArray::new(&frame);
            visible.extend(0..1000u32);
            assert_eq!(visible[999], 999);
            // Sole tenant of the arena: every doubling happened in place.
            assert_eq!(frame.used_bytes(), 1024 * 4);
        }
        frame.reset();
        assert_eq!(frame.used_bytes(), 0);
    }
}

#[test]
fn test_relocate_from_scratch_to_persistent() {
    let persistent = SystemAllocator::instance();
    let scratch = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(4));
    let mut names = DynArray::new(&scratch);
    names.push(String::from("main.lua"));
    names.push(String::from("other.lua"));

    let kept = names.relocate(persistent);
    assert_eq!(scratch.used_bytes(), 0);
    assert_eq!(kept.as_slice(), ["main.lua", "other.lua"]);
}

#[test]
fn test_containers_share_one_arena() {
    let arena = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(8));
    let mut ids = FixedArray::new(32, &arena);
    let mut pool: BlockAllocator<[u32; 4]> = BlockAllocator::new(&arena, 8);
    let boxed = AllocBox::new_in(0xFEED_u64, &arena);

    ids.push(1u16);
    let block = pool.allocate_block().unwrap();
    pool.get_mut(block)[2] = 9;

    assert_eq!(*boxed, 0xFEED);
    assert_eq!(pool.get(block)[2], 9);
    assert_eq!(ids[0], 1);
    assert_eq!(arena.used_bytes() % MAX_ALIGN, 0);
}

#[test]
fn test_line_log_keeps_newest() {
    let arena = ArenaAllocator::new(SystemAllocator::instance(), kilobytes(64));
    let mut log = LineLog::new(16, &arena);
    for i in 0..1000 {
        log.push_line(&format!("[frame {i}] ok"));
    }
    assert_eq!(log.len(), 16);
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.first(), Some(&"[frame 984] ok"));
    assert_eq!(lines.last(), Some(&"[frame 999] ok"));
}
