pub mod log_helpers;
