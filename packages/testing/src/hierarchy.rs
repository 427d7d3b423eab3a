use poly::{Dynamic, upcast};

use crate::DropCounter;

/// The root interface of the fixture hierarchy.
pub trait Node: Dynamic + Send + Sync {
    /// A lowercase name unique to the exact type.
    fn name(&self) -> &'static str;

    /// A value shared by every type in the hierarchy.
    fn value(&self) -> u32;
}

/// The first intermediate interface.
pub trait Left: Node {
    /// The value only visible through this interface.
    fn left(&self) -> u32;

    /// Changes the value only visible through this interface.
    fn set_left(&mut self, value: u32);
}

/// The second intermediate interface.
pub trait Right: Node {
    /// The value only visible through this interface.
    fn right(&self) -> u32;
}

/// Implements only [`Node`].
#[derive(Clone, Debug, Default)]
pub struct Base {
    /// Reported by [`Node::value`].
    pub value: u32,
    /// Counts drops of this object and its clones.
    pub drops: DropCounter,
}

/// Implements [`Node`] and [`Left`].
#[derive(Clone, Debug, Default)]
pub struct Mid1 {
    /// Reported by [`Node::value`].
    pub value: u32,
    /// Reported by [`Left::left`].
    pub left: u32,
    /// Counts drops of this object and its clones.
    pub drops: DropCounter,
}

/// Implements [`Node`] and [`Right`].
#[derive(Clone, Debug, Default)]
pub struct Mid2 {
    /// Reported by [`Node::value`].
    pub value: u32,
    /// Reported by [`Right::right`].
    pub right: u32,
    /// Counts drops of this object and its clones.
    pub drops: DropCounter,
}

/// Implements [`Node`], [`Left`] and [`Right`], so it can be viewed through either
/// intermediate interface.
#[derive(Clone, Debug, Default)]
pub struct Der {
    /// Reported by [`Node::value`].
    pub value: u32,
    /// Reported by [`Left::left`].
    pub left: u32,
    /// Reported by [`Right::right`].
    pub right: u32,
    /// Counts drops of this object and its clones.
    pub drops: DropCounter,
}

/// Implements [`Node`] but cannot be cloned.
#[derive(Debug, Default)]
pub struct Socket {
    /// Reported by [`Node::value`].
    pub port: u16,
    /// Counts drops of this object and its clones.
    pub drops: DropCounter,
}

impl Der {
    /// Creates a `Der` that reports its drops to `drops`.
    #[must_use]
    pub fn counted(drops: &DropCounter) -> Self {
        Self {
            value: 1,
            left: 2,
            right: 3,
            drops: drops.clone(),
        }
    }
}

macro_rules! node {
    ($type:ty, $name:literal) => {
        impl Node for $type {
            fn name(&self) -> &'static str {
                $name
            }

            fn value(&self) -> u32 {
                self.value
            }
        }

        impl Drop for $type {
            fn drop(&mut self) {
                self.drops.record();
            }
        }
    };
}

node!(Base, "base");
node!(Mid1, "mid1");
node!(Mid2, "mid2");
node!(Der, "der");

impl Node for Socket {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn value(&self) -> u32 {
        u32::from(self.port)
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.drops.record();
    }
}

impl Left for Mid1 {
    fn left(&self) -> u32 {
        self.left
    }

    fn set_left(&mut self, value: u32) {
        self.left = value;
    }
}

impl Left for Der {
    fn left(&self) -> u32 {
        self.left
    }

    fn set_left(&mut self, value: u32) {
        self.left = value;
    }
}

impl Right for Mid2 {
    fn right(&self) -> u32 {
        self.right
    }
}

impl Right for Der {
    fn right(&self) -> u32 {
        self.right
    }
}

upcast!(Base => dyn Node);
upcast!(Mid1 => dyn Node, dyn Left);
upcast!(Mid2 => dyn Node, dyn Right);
upcast!(Der => dyn Node, dyn Left, dyn Right);
upcast!(Socket => dyn Node);
