pub mod diagnostic;
pub mod method_state;
