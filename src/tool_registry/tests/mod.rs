//! Unit tests for the tool registry bounded context.
