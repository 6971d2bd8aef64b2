// Integration test suite for the chat microservice core.
//
// Organized by feature area; every module shares `common::TestClient` for
// per-test DB lifecycle management.

mod common;

mod end_to_end;
mod messages;
mod participants;
mod rate_limit;
mod realtime;
mod rooms;
mod system;
