#![allow(non_snake_case)]

mod device_api;
mod fake_server;
