//! Process exit codes.

use cachefirst_core::CacheFirstError;

pub const EXIT_SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1;
pub const STORE_ERROR: i32 = 2;
pub const SEED_ERROR: i32 = 3;

pub fn for_error(err: &CacheFirstError) -> i32 {
    match err.exit_code() {
        1 => CONFIG_ERROR,
        2 => STORE_ERROR,
        _ => SEED_ERROR,
    }
}
