pub mod ping;
pub mod wol;
