use chunk_resource::{
    ChunkOptions, ChunkResource, LockedResource, MemoryResource, OptionsError, TrackingResource,
};

const OPTIONS: ChunkOptions = ChunkOptions::new(64, 8, 4);
type Resource = ChunkResource<{ OPTIONS.storage_size() }, { OPTIONS.block_count }>;

#[test]
fn options_are_usable_in_const_contexts() {
    const OPTIONS: ChunkOptions = ChunkOptions::new(24, 4, 16).normalized();
    const _: () = assert!(OPTIONS.is_valid());
    assert_eq!(OPTIONS, ChunkOptions::new(24, 8, 16));
}

#[test]
fn is_usable_in_const_contexts() {
    const _RESOURCE: Resource = Resource::new(OPTIONS);
    static _ALLOCATOR: LockedResource<Resource> = LockedResource::new(Resource::new(OPTIONS));
}

#[test]
fn static_resource_serves_requests() {
    static ALLOCATOR: LockedResource<Resource> = LockedResource::new(Resource::new(OPTIONS));

    let mut resource = ALLOCATOR.lock();
    let block = resource.allocate_bytes(64).unwrap();
    assert!(resource.maybe_owns(block.as_ptr()));
    assert_eq!(resource.available_blocks(), 3);
    resource.deallocate_bytes(block.as_ptr(), 64);
    assert_eq!(resource.available_blocks(), 4);
}

#[test]
fn supports_global_alloc() {
    fn assert<T: core::alloc::GlobalAlloc>(_: T) {}
    assert(LockedResource::new(Resource::new(OPTIONS)))
}

#[test]
fn locked_resource_is_sync() {
    fn assert<T: Send + Sync>() {}
    assert::<LockedResource<Resource>>();
    assert::<LockedResource<TrackingResource>>();
}

#[test]
fn resources_are_interchangeable() {
    fn exercise(resource: &mut dyn MemoryResource) -> usize {
        let block = resource.allocate_bytes(8).unwrap();
        let available = resource.available_blocks();
        resource.deallocate_bytes(block.as_ptr(), 8);
        available
    }

    let options = ChunkOptions::new(8, 8, 2);
    let mut chunks = ChunkResource::<17, 2>::new(options);
    let mut tracking = TrackingResource::new(options).unwrap();
    assert_eq!(exercise(&mut chunks), exercise(&mut tracking));
}

#[test]
fn invalid_options() {
    let error = ChunkResource::<16, 0>::try_new(ChunkOptions::new(16, 16, 0)).err();
    assert_eq!(error, Some(OptionsError::ZeroBlockCount));
    assert_eq!(
        OptionsError::ZeroBlockCount.to_string(),
        "block count must not be 0"
    );

    let error = TrackingResource::new(ChunkOptions::new(16, 3, 1)).unwrap_err();
    assert_eq!(error, OptionsError::InvalidAlign { align: 3 });
}

#[test]
#[should_panic(expected = "block count differs from the resource capacity")]
fn block_count_must_match() {
    let _resource = ChunkResource::<1024, 4>::new(ChunkOptions::new(64, 8, 5));
}
