//! Integration tests for the bridge over the in-memory engine.

mod helpers;

mod broadcast_test;
mod group_test;
mod hub_test;
mod send_test;
mod transfer_test;
