pub mod amount;
pub mod api;
pub mod config;
pub mod console;
pub mod device;
pub mod logging;
pub mod worker;

pub use amount::{
    Amount,
    Direction,
    is_valid_amount,
};
pub use api::{
    ApiError,
    DeviceApi,
    DeviceService,
};
pub use console::{
    Command,
    Console,
};
pub use device::{
    BalanceUpdate,
    Device,
    DeviceId,
    DeviceSummary,
    Place,
    PlaceId,
};
