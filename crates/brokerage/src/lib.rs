pub mod remote;
pub mod traits;
