// A poisoned lock means the process is in an unrecoverable/unsafe state and must exit (we panic).
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - continued execution \
    is not safe because we can no longer guarantee that recorded offsets are consistent";

pub(crate) const ERR_OFFSET_NOT_RECORDED: &str = "no offset has been recorded for this base and \
    derived type pair - the pointer did not come from a container";

pub(crate) const ERR_UNBOUND_POLICY: &str = "policy is not bound to a concrete type - it was \
    default-constructed and never attached to an object";

pub(crate) const ERR_EMPTY: &str = "dereferenced an empty container";
