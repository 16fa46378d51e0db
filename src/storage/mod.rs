pub mod encoding;
pub mod layout;
pub mod slot;

pub use encoding::TitleEncoding;
pub use layout::{SlotPosition, SolType, StorageLayout, VariableDecl};
pub use slot::{derive_dynamic_array_base_slot, wrapping_add, wrapping_sub, Slot};
