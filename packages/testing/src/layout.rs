use poly::upcast_field;

use crate::DropCounter;

/// A base that lives in the middle of [`Packet`], never at its start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Identifies the packet.
    pub id: u32,
    /// Free-form flags.
    pub flags: u16,
}

/// An object whose [`Header`] sits after other fields, so viewing it as a `Header` moves the
/// pointer away from the start of the allocation.
#[derive(Clone, Debug, Default)]
#[repr(C)]
pub struct Packet {
    /// Position in a stream of packets.
    pub sequence: u64,
    /// The packet contents.
    pub payload: Vec<u8>,
    /// The part of the packet that containers over [`Header`] see.
    pub header: Header,
    /// Counts drops of this object and its clones.
    pub drops: DropCounter,
}

impl Packet {
    /// Creates a packet that reports its drops to `drops`.
    #[must_use]
    pub fn counted(id: u32, payload: &[u8], drops: &DropCounter) -> Self {
        Self {
            sequence: 1,
            payload: payload.to_vec(),
            header: Header { id, flags: 0 },
            drops: drops.clone(),
        }
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        self.drops.record();
    }
}

upcast_field!(Packet, header: Header);
upcast_field!(Packet, header.id: u32);
