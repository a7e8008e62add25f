pub mod bus;
pub mod probe;
pub mod validate;
