//! The tracking resource has to behave like a chunk resource with the same
//! options, so that code tested against it behaves the same in production.
use chunk_resource::{
    AllocError, ChunkOptions, ChunkResource, FreeError, MemoryResource, TrackingResource,
};

/// Run a fixed sequence of requests and record the outcome of each.
fn replay<R: MemoryResource>(resource: &mut R) -> Vec<Result<usize, AllocError>> {
    let mut outcomes = Vec::new();
    let mut live = Vec::new();

    for &(size, align) in &[(8, 8), (64, 1), (0, 4), (65, 1), (1, 32), (1, 3), (16, 16)] {
        match resource.allocate_bytes_aligned(size, align) {
            Ok(ptr) => {
                live.push((ptr, size));
                outcomes.push(Ok(resource.available_blocks()));
            }
            Err(error) => outcomes.push(Err(error)),
        }
    }
    outcomes.push(resource.allocate_object::<[u8; 64]>(1).map(|_| 0));
    outcomes.push(resource.allocate_object::<u16>(usize::MAX).map(|_| 0));

    while let Some((ptr, size)) = live.pop() {
        resource.deallocate_bytes(ptr.as_ptr(), size);
        outcomes.push(Ok(resource.available_blocks()));
    }
    outcomes
}

#[test]
fn same_outcomes_as_a_chunk_resource() {
    const OPTIONS: ChunkOptions = ChunkOptions::new(64, 16, 3);
    let options = OPTIONS;
    let mut chunks = ChunkResource::<{ OPTIONS.storage_size() }, 3>::new(options);
    let mut tracking = TrackingResource::new(options).unwrap();

    let expected = replay(&mut chunks);
    assert_eq!(replay(&mut tracking), expected);
    assert_eq!(
        expected[..3],
        [Ok(2), Ok(1), Ok(1)],
        "zero-sized requests do not consume blocks"
    );
    assert_eq!(expected[7], Err(AllocError::OutOfMemory));
}

#[test]
fn detects_size_mismatch() {
    let mut resource = TrackingResource::new(ChunkOptions::new(32, 8, 2)).unwrap();
    let numbers = resource.allocate_object::<u32>(4).unwrap();
    assert_eq!(
        resource.try_deallocate_object(numbers.as_ptr(), 3),
        Err(FreeError::SizeMismatch {
            expected: 16,
            actual: 12
        })
    );
    assert_eq!(resource.try_deallocate_object(numbers.as_ptr(), 4), Ok(()));
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "invalid size")]
fn size_mismatch_panics_in_debug_builds() {
    let mut resource = TrackingResource::new(ChunkOptions::new(32, 8, 2)).unwrap();
    let block = resource.allocate_bytes(16).unwrap();
    resource.deallocate_bytes(block.as_ptr(), 32);
}
