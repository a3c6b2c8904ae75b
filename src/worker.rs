use crate::{
    api::{
        ApiError,
        DeviceService,
    },
    console::{
        Command,
        Console,
        Ticket,
    },
    device::{
        BalanceUpdate,
        Device,
        DeviceSummary,
        PlaceId,
    },
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};
use tracing::{
    debug,
    warn,
};

/// Outcome of a [`Command`], delivered back to the event loop.
#[derive(Debug)]
pub enum ApiEvent {
    Devices(Vec<DeviceSummary>),
    Device {
        ticket: Ticket,
        device: Option<Device>,
    },
    BalanceUpdated {
        ticket: Ticket,
        place: PlaceId,
        result: Result<BalanceUpdate, ApiError>,
    },
}

impl ApiEvent {
    /// Feeds the outcome into the console. Returns whether it changed the
    /// visible state.
    pub fn apply(self, console: &mut Console) -> bool {
        match self {
            ApiEvent::Devices(devices) => {
                console.devices_loaded(devices);
                true
            }
            ApiEvent::Device { ticket, device } => console.device_loaded(ticket, device),
            ApiEvent::BalanceUpdated {
                ticket,
                place,
                result,
            } => console.update_finished(ticket, place, result),
        }
    }
}

/// Runs each command on its own task so slow requests never hold up the
/// event loop or each other.
#[derive(Clone)]
pub struct CommandRunner<S> {
    service: S,
    events: mpsc::UnboundedSender<ApiEvent>,
}

impl<S: DeviceService> CommandRunner<S> {
    pub fn new(service: S) -> (Self, mpsc::UnboundedReceiver<ApiEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { service, events }, receiver)
    }

    pub fn run(&self, command: Command) -> JoinHandle<()> {
        let service = self.service.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            debug!(?command, "running command");
            let event = execute(&service, command).await;
            if events.send(event).is_err() {
                warn!("event receiver dropped; discarding api result");
            }
        })
    }

    pub fn run_all(&self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.run(command);
        }
    }
}

pub async fn execute<S: DeviceService>(service: &S, command: Command) -> ApiEvent {
    match command {
        Command::LoadDevices => ApiEvent::Devices(service.list_devices().await),
        Command::FetchDevice { device_id, ticket } => ApiEvent::Device {
            ticket,
            device: service.get_device(&device_id).await,
        },
        Command::UpdateBalance {
            device_id,
            place,
            delta,
            ticket,
        } => ApiEvent::BalanceUpdated {
            ticket,
            place,
            result: service.update_place_balance(&device_id, place, delta).await,
        },
    }
}
