pub mod channel;
pub mod replacer;
