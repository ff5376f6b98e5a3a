use super::error::Error;
use super::*;

const CAPACITY: usize = 64;

#[test]
fn test_read_write_erase() {
    let mut storage: MemoryStorage<CAPACITY> = MemoryStorage::new();
    let data = [0xDE, 0xAD, 0xBE, 0xEF];

    Storage::write(&mut storage, 0, &data).unwrap();

    let mut buf = [0; 4];
    ReadStorage::read(&mut storage, 0, &mut buf).unwrap();
    assert_eq!(buf, data);

    BlockingErase::erase(&mut storage, 0, 4).unwrap();
    ReadStorage::read(&mut storage, 0, &mut buf).unwrap();
    assert_eq!(buf, [ERASED_BYTE; 4]);
}

#[test]
fn test_out_of_bounds() {
    let mut storage: MemoryStorage<CAPACITY> = MemoryStorage::new();

    assert_eq!(
        Storage::write(&mut storage, CAPACITY as u32, &[0; 1]),
        Err(Error::OutOfBounds)
    );
    assert_eq!(
        ReadStorage::read(&mut storage, (CAPACITY - 1) as u32, &mut [0; 2]),
        Err(Error::OutOfBounds)
    );
    assert_eq!(
        BlockingErase::erase(&mut storage, 0, (CAPACITY + 1) as u32),
        Err(Error::OutOfBounds)
    );
    assert_eq!(
        BlockingErase::erase(&mut storage, 4, 2),
        Err(Error::OutOfBounds)
    );
}

#[test]
fn test_through_mutable_reference() {
    let mut storage: MemoryStorage<CAPACITY> = MemoryStorage::new();
    {
        let mut borrowed = &mut storage;
        Storage::write(&mut borrowed, 10, &[7]).unwrap();
        assert_eq!(ReadStorage::capacity(&borrowed), CAPACITY);
    }
    assert_eq!(storage.as_slice()[10], 7);
}
