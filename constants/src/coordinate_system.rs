/// Up axis handed to the packaging converter for both input and output.
/// Using the same axis on both sides keeps model space untouched.
pub const UP_AXIS: &str = "Z";
