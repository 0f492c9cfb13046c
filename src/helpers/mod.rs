pub mod fields;
pub mod numeric;
