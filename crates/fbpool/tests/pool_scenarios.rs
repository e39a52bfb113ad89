//! End-to-end pool behaviour through the public API.
//!
//! The chunk cache is process-wide and tests in this binary run in parallel, so
//! every test uses its own blocks-per-chunk value to get a private cache slot.

use std::collections::HashSet;
use std::ptr::NonNull;

use nebula_fbpool::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn growth_and_chunk_recycling() {
    let alloc = FixedBlockAllocator::<u64, 4>::new();

    let blocks: Vec<_> = (0..5).map(|_| alloc.allocate(1).unwrap()).collect();
    let stats = alloc.stats();
    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.outstanding, 5);
    assert_eq!(stats.free_blocks, 3);
    assert_eq!(alloc.allocation_count(), 5);

    let unique: HashSet<_> = blocks.iter().map(|b| b.as_ptr().addr()).collect();
    assert_eq!(unique.len(), 5);

    let cache = alloc.cache_stats();
    assert_eq!(cache.created, 2);
    assert_eq!(cache.cached, 0);

    for block in blocks {
        // SAFETY: Test code, every block is live and returned once.
        unsafe { alloc.deallocate(block, 1) };
    }
    assert_eq!(alloc.allocation_count(), 0);

    let layout = alloc.chunk_layout();
    drop(alloc);
    assert_eq!(GlobalChunkCache::stats(&layout).cached, 2);

    // A fresh pool with the same layout takes its chunk from the cache
    let again = FixedBlockAllocator::<u64, 4>::new();
    again.allocate(1).unwrap();
    let cache = again.cache_stats();
    assert_eq!(cache.created, 2);
    assert_eq!(cache.cached, 1);
}

#[test]
fn recycled_chunk_keeps_its_address() {
    let first = FixedBlockAllocator::<u64, 11>::new();
    let block = first.allocate(1).unwrap();
    drop(first);

    let second = FixedBlockAllocator::<u64, 11>::new();
    assert_eq!(second.allocate(1).unwrap(), block);
}

#[test]
fn sharing_handles_use_one_pool() {
    let a = FixedBlockAllocator::<u64, 12>::new();
    let b = a.rebind::<i64>();
    assert_eq!(a.refcount(), 2);
    assert_eq!(b.refcount(), 2);
    assert!(a == b);

    let block = a.allocate(1).unwrap();
    assert_eq!(b.allocation_count(), 1);
    assert!(b.owns(block.as_ptr().cast::<i64>()));

    // SAFETY: Test code, b shares a's pool.
    unsafe { b.deallocate(block.cast::<i64>(), 1) };
    assert_eq!(a.allocation_count(), 0);

    // The freed block is next in line for either handle
    assert_eq!(b.allocate(1).unwrap().cast::<u64>(), block);
}

#[test]
fn pool_survives_while_any_handle_lives() {
    let a = FixedBlockAllocator::<u64, 13>::new();
    let b = a.clone();
    let block = a.allocate(1).unwrap();

    drop(a);
    assert_eq!(b.refcount(), 1);
    assert!(b.owns(block.as_ptr()));
    assert_eq!(b.cache_stats().cached, 0);

    let layout = b.chunk_layout();
    drop(b);
    assert_eq!(GlobalChunkCache::stats(&layout).cached, 1);
}

#[test]
fn different_block_size_rebind_is_independent() {
    let small = FixedBlockAllocator::<u64, 14>::new();
    let large = small.rebind::<[u64; 3]>();

    assert!(!small.shares_pool_with(&large));
    assert_eq!(small.refcount(), 1);
    assert_eq!(large.refcount(), 1);
    assert_eq!(large.block_size(), 24);

    let block = large.allocate(1).unwrap();
    assert!(large.owns(block.as_ptr()));
    assert!(!small.owns(block.as_ptr().cast::<u64>()));
    assert_eq!(small.allocation_count(), 0);
}

#[test]
fn freed_blocks_are_reused_lifo() {
    let alloc = FixedBlockAllocator::<u32, 15>::new();
    let a = alloc.allocate(1).unwrap();
    let b = alloc.allocate(1).unwrap();
    let c = alloc.allocate(1).unwrap();

    // SAFETY: Test code, blocks are live and returned once.
    unsafe {
        alloc.deallocate(a, 1);
        alloc.deallocate(c, 1);
    }
    assert_eq!(alloc.allocate(1).unwrap(), c);
    assert_eq!(alloc.allocate(1).unwrap(), a);
    assert_ne!(alloc.allocate(1).unwrap(), b);
}

#[test]
fn foreign_pointers_are_not_owned() {
    let alloc = FixedBlockAllocator::<u64, 16>::new();
    let other = FixedBlockAllocator::<u64, 16>::new();
    let block = alloc.allocate(1).unwrap();
    let on_stack = 0u64;
    let on_heap = Box::new(0u64);

    assert!(alloc.owns(block.as_ptr()));
    assert!(!other.owns(block.as_ptr()));
    assert!(!alloc.owns(&raw const on_stack));
    assert!(!alloc.owns(&raw const *on_heap));
}

#[test]
#[should_panic(expected = "does not belong to this pool")]
fn foreign_deallocation_is_caught() {
    let alloc = FixedBlockAllocator::<u64, 17>::with_config(PoolConfig::debug());
    let _block = alloc.allocate(1).unwrap();
    let mut outsider = 0u64;

    // SAFETY: Test code, deliberately violates the deallocation contract.
    unsafe { alloc.deallocate(NonNull::from(&mut outsider), 1) };
}

#[rstest]
#[case::production(PoolConfig::production())]
#[case::debug(PoolConfig::debug())]
#[case::performance(PoolConfig::performance())]
fn every_config_round_trips_values(#[case] config: PoolConfig) {
    let alloc = FixedBlockAllocator::<String, 18>::with_config(config);
    let blocks: Vec<_> = (0..40).map(|_| alloc.allocate(1).unwrap()).collect();

    // SAFETY: Test code, each block is constructed, read and destroyed once.
    unsafe {
        for (i, block) in blocks.iter().enumerate() {
            alloc.construct(*block, i.to_string());
        }
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.as_ref(), &i.to_string());
            alloc.destroy(*block);
            alloc.deallocate(*block, 1);
        }
    }

    assert_eq!(alloc.config(), config);
    assert_eq!(alloc.allocation_count(), 0);
    assert_eq!(alloc.stats().free_blocks, alloc.stats().capacity());
}

#[test]
fn bulk_requests_bypass_the_pool() {
    let alloc = FixedBlockAllocator::<u16, 19>::new();
    let buffer = alloc.allocate(1000).unwrap();

    assert_eq!(alloc.allocation_count(), 0);
    assert_eq!(alloc.stats().chunks, 0);
    assert_eq!(alloc.cache_stats().created, 0);

    // SAFETY: Test code, buffer holds 1000 u16 slots.
    unsafe {
        for i in 0..1000 {
            buffer.add(i).write(i as u16);
        }
        assert_eq!(buffer.add(999).read(), 999);
        alloc.deallocate(buffer, 1000);
    }
}

#[test]
fn release_recycles_chunks_and_keeps_handle_usable() {
    let alloc = FixedBlockAllocator::<u64, 20>::new();
    for _ in 0..45 {
        alloc.allocate(1).unwrap();
    }
    assert_eq!(alloc.stats().chunks, 3);

    let view = alloc.clone();
    // SAFETY: Test code, refused while shared so nothing changes.
    let err = unsafe { alloc.release() }.unwrap_err();
    assert_eq!(err.code(), "MEM:POOL:STATE");
    assert_eq!(alloc.allocation_count(), 45);
    drop(view);

    // SAFETY: Test code, no block is used after the release.
    unsafe { alloc.release().unwrap() };
    assert_eq!(alloc.allocation_count(), 0);
    assert_eq!(alloc.refcount(), 1);
    assert_eq!(alloc.cache_stats().cached, 3);

    alloc.allocate(1).unwrap();
    assert_eq!(alloc.cache_stats().created, 3);
    assert_eq!(alloc.cache_stats().cached, 2);
}

#[test]
fn dump_reports_cache_counters() {
    let alloc = FixedBlockAllocator::<u64, 21>::new();
    alloc.allocate(1).unwrap();

    let mut out = Vec::new();
    alloc.dump(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!(
            "21 x 8B blocks ({}B chunk, align 8): chunks created: 1, cached: 0\n",
            alloc.chunk_size()
        )
    );
}

#[test]
fn equal_layouts_share_a_cache_slot() {
    let wide = FixedBlockAllocator::<u64, 23, 8>::new();
    let narrow = FixedBlockAllocator::<u64, 23, 4>::new();
    assert_eq!(wide.chunk_layout(), narrow.chunk_layout());

    wide.allocate(1).unwrap();
    drop(wide);
    assert_eq!(narrow.cache_stats().cached, 1);

    // The chunk retired by one instantiation is reused by the other
    narrow.allocate(1).unwrap();
    let cache = narrow.cache_stats();
    assert_eq!(cache.created, 1);
    assert_eq!(cache.cached, 0);
}

#[test]
fn pool_box_lifecycle() {
    let alloc = FixedBlockAllocator::<Vec<u8>, 22>::new();
    let mut boxed = PoolBox::new_in(vec![1, 2, 3], &alloc).unwrap();
    boxed.push(4);

    assert_eq!(alloc.allocation_count(), 1);
    assert_eq!(boxed.into_inner(), vec![1, 2, 3, 4]);
    assert_eq!(alloc.allocation_count(), 0);
    assert_eq!(alloc.refcount(), 1);
}
