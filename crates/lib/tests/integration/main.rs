mod common;
mod publish_tests;
mod task_tests;
