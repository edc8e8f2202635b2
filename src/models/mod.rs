pub mod artifact;
pub mod catalog;
pub mod enums;
pub mod money;
pub mod order;
pub mod party;
pub mod result;

pub use artifact::*;
pub use catalog::*;
pub use money::*;
pub use order::*;
pub use party::*;
pub use result::*;
