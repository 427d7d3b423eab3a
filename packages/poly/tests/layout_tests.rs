//! Integration tests for containers whose base is a field in the middle of the object.

use std::mem::offset_of;

use poly::{DeepOffset, OffsetCache, Poly, UniqueOffset, make};
use testing::{DropCounter, Header, Packet};

fn header_offset() -> isize {
    -isize::try_from(offset_of!(Packet, header)).unwrap()
}

#[test]
fn base_view_points_into_object() {
    let drops = DropCounter::new();
    let header: Poly<Header, DeepOffset<Header>> = make(Packet::counted(7, b"abc", &drops));

    assert_eq!(header.id, 7);
    assert_eq!(OffsetCache::<Header, Packet>::get(), Some(header_offset()));

    let packet = header.downcast_ref::<Packet>().unwrap();
    let object_address = std::ptr::from_ref(packet).addr();
    let view_address = header.as_ptr().unwrap().as_ptr().addr();

    assert_ne!(object_address, view_address);
    assert_eq!(packet.payload, b"abc");
}

#[test]
fn mutation_through_view_reaches_object() {
    let mut header: Poly<Header, DeepOffset<Header>> =
        make(Packet::counted(1, b"", &DropCounter::new()));

    header.flags = 0b101;
    header.downcast_mut::<Packet>().unwrap().payload.push(42);

    let packet = header.into_box::<Packet>().unwrap();
    assert_eq!(packet.header.flags, 0b101);
    assert_eq!(packet.payload, [42]);
}

#[test]
fn clone_copies_whole_object() {
    let drops = DropCounter::new();
    let original: Poly<Header, DeepOffset<Header>> = make(Packet::counted(3, b"xyz", &drops));

    let copy = original.clone();

    assert_ne!(copy, original);
    assert_eq!(*copy, *original);
    assert_eq!(copy.downcast_ref::<Packet>().unwrap().payload, b"xyz");

    drop(original);
    drop(copy);
    assert_eq!(drops.drops(), 2);
}

#[test]
fn drop_frees_whole_object_once() {
    let drops = DropCounter::new();

    let header: Poly<Header, UniqueOffset<Header>> = make(Packet::counted(9, b"", &drops));
    assert!(header.is::<Packet>());
    assert!(!header.is::<Header>());

    drop(header);
    assert_eq!(drops.drops(), 1);
}

#[test]
fn nested_field_view() {
    let drops = DropCounter::new();

    let id: Poly<u32, DeepOffset<u32>> = make(Packet::counted(1234, b"", &drops));
    assert_eq!(*id, 1234);

    let header: Poly<Header, UniqueOffset<Header>> = id.transform::<Packet, _, _, _>().unwrap();
    assert_eq!(header.id, 1234);
    assert_eq!(drops.drops(), 0);

    drop(header);
    assert_eq!(drops.drops(), 1);
}

#[test]
fn plain_value_is_its_own_base() {
    let header: Poly<Header, DeepOffset<Header>> = make(Header { id: 5, flags: 1 });

    assert!(header.is::<Header>());
    assert_eq!(OffsetCache::<Header, Header>::get(), Some(0));
    assert_eq!(*header.into_box::<Header>().unwrap(), Header { id: 5, flags: 1 });
}
