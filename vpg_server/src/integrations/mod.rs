pub mod operator_log;
