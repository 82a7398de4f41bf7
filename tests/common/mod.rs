//! Shared helpers for integration tests.

#![allow(dead_code)]

use prefapply::CommandOutput;

pub fn ok() -> CommandOutput {
    CommandOutput::succeeded(Some(String::new()), Some(String::new()))
}

pub fn exit_with(stderr: &str) -> CommandOutput {
    CommandOutput::exited(Some(1), Some(String::new()), Some(stderr.to_string()))
}
