pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
/// Missing or unreadable input, bad arguments or configuration
pub const INPUT_ERROR: i32 = 2;
