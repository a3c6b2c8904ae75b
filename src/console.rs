//! Console state: device list, selected device, its places and the
//! per-place balance update flow.
//!
//! Nothing here performs I/O. Operations that need the backend return a
//! [`Command`]; the caller runs it and feeds the outcome back through the
//! matching `*_loaded` / `update_finished` method.

use crate::{
    amount::{
        Amount,
        Direction,
        INVALID_AMOUNT_MESSAGE,
    },
    api::ApiError,
    device::{
        BalanceUpdate,
        Device,
        DeviceId,
        DeviceSummary,
        Place,
        PlaceId,
    },
};
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::{
    HashMap,
    HashSet,
};
use tracing::{
    debug,
    info,
    warn,
};

/// Tags requests so late responses can be told apart from current ones.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Ticket(u64);

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    LoadDevices,
    FetchDevice {
        device_id: DeviceId,
        ticket: Ticket,
    },
    UpdateBalance {
        device_id: DeviceId,
        place: PlaceId,
        delta: Decimal,
        ticket: Ticket,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DetailState {
    Loading,
    Loaded,
    NotFound,
}

#[derive(Clone, Debug)]
pub struct Selection {
    pub device_id: DeviceId,
    pub name: String,
    pub detail: DetailState,
    /// Fixed for as long as this device stays selected.
    ticket: Ticket,
    /// Most recent detail fetch; replaced on every refetch.
    fetch: Ticket,
}

#[derive(Debug, Default)]
pub struct Console {
    devices: Vec<DeviceSummary>,
    loading_devices: bool,
    selection: Option<Selection>,
    places: Vec<Place>,
    amounts: HashMap<PlaceId, String>,
    updating: HashSet<PlaceId>,
    /// Balances echoed by updates while a detail fetch was outstanding. The
    /// fetch may have been answered before the update landed, so these win
    /// over its snapshot.
    echoed: HashMap<PlaceId, Decimal>,
    error: Option<String>,
    status: String,
    next_ticket: u64,
}

impl Console {
    pub fn new() -> Self {
        Self {
            status: String::from("Ready"),
            ..Self::default()
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    pub fn devices(&self) -> &[DeviceSummary] {
        &self.devices
    }

    pub fn loading_devices(&self) -> bool {
        self.loading_devices
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_device_id(&self) -> Option<&DeviceId> {
        self.selection.as_ref().map(|s| &s.device_id)
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn amount(&self, place: PlaceId) -> &str {
        self.amounts.get(&place).map(String::as_str).unwrap_or("")
    }

    pub fn is_updating(&self, place: PlaceId) -> bool {
        self.updating.contains(&place)
    }

    /// Whether deposit/withdraw are currently available for `place`.
    pub fn can_submit(&self, place: PlaceId) -> bool {
        !self.is_updating(place) && Amount::parse(self.amount(place)).is_ok()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "console error");
        self.error = Some(message);
    }

    pub fn load_devices(&mut self) -> Command {
        self.loading_devices = true;
        self.set_status("Loading devices...");
        Command::LoadDevices
    }

    pub fn devices_loaded(&mut self, devices: Vec<DeviceSummary>) {
        self.loading_devices = false;
        if let Some(selection) = self.selection.as_mut()
            && let Some(summary) = devices.iter().find(|d| d.id == selection.device_id)
            && selection.name.is_empty()
        {
            selection.name = summary.name.clone();
        }
        self.set_status(match devices.len() {
            0 => String::from("No devices found"),
            1 => String::from("1 device"),
            n => format!("{n} devices"),
        });
        self.devices = devices;
    }

    /// Switches to `device_id`, dropping everything tied to the previous
    /// selection. Responses for earlier selections are ignored from here on.
    ///
    /// Selecting the device that is already selected only re-fetches it, so
    /// updates in flight for it stay tracked.
    pub fn select_device(&mut self, device_id: DeviceId) -> Command {
        if self.selected_device_id() == Some(&device_id) {
            return self.refetch_selected(device_id);
        }
        let name = self
            .devices
            .iter()
            .find(|d| d.id == device_id)
            .map(|d| d.name.clone())
            .unwrap_or_default();
        let ticket = self.issue_ticket();
        self.places.clear();
        self.amounts.clear();
        self.updating.clear();
        self.echoed.clear();
        self.error = None;
        info!(device = %device_id, "device selected");
        self.set_status(format!("Loading device {}...", display_name(&name, &device_id)));
        self.selection = Some(Selection {
            device_id: device_id.clone(),
            name,
            detail: DetailState::Loading,
            ticket,
            fetch: ticket,
        });
        Command::FetchDevice { device_id, ticket }
    }

    /// Reloads the device list and re-fetches the selected device without
    /// clearing what is on screen.
    pub fn refresh(&mut self) -> Vec<Command> {
        let mut commands = vec![self.load_devices()];
        if let Some(device_id) = self.selected_device_id().cloned() {
            commands.push(self.refetch_selected(device_id));
        }
        commands
    }

    fn refetch_selected(&mut self, device_id: DeviceId) -> Command {
        let ticket = self.issue_ticket();
        if let Some(selection) = self.selection.as_mut() {
            selection.fetch = ticket;
            selection.detail = DetailState::Loading;
        }
        debug!(device = %device_id, ?ticket, "re-fetching selected device");
        Command::FetchDevice { device_id, ticket }
    }

    /// Applies a device detail response. Returns `false` when the response
    /// belongs to a fetch that has since been superseded.
    pub fn device_loaded(&mut self, ticket: Ticket, device: Option<Device>) -> bool {
        let Some(selection) = self.selection.as_mut() else {
            debug!(?ticket, "device response without selection dropped");
            return false;
        };
        if selection.fetch != ticket {
            debug!(
                ?ticket,
                current = ?selection.fetch,
                "stale device response dropped"
            );
            return false;
        }
        match device {
            Some(device) => {
                if !device.name.is_empty() {
                    selection.name = device.name;
                }
                selection.detail = DetailState::Loaded;
                self.places = device.places;
                for place in self.places.iter_mut() {
                    if let Some(balance) = self.echoed.get(&place.place) {
                        place.balances = *balance;
                    }
                }
                self.echoed.clear();
                let known: HashSet<PlaceId> = self.places.iter().map(|p| p.place).collect();
                self.amounts.retain(|place, _| known.contains(place));
                let status = format!(
                    "{}: {} place{}",
                    display_name(&selection.name, &selection.device_id),
                    self.places.len(),
                    if self.places.len() == 1 { "" } else { "s" }
                );
                self.set_status(status);
            }
            None => {
                selection.detail = DetailState::NotFound;
                self.echoed.clear();
                let message = format!("Device {} not found", selection.device_id);
                self.places.clear();
                self.amounts.clear();
                self.set_status(message);
            }
        }
        true
    }

    pub fn set_amount(&mut self, place: PlaceId, raw: impl Into<String>) {
        self.amounts.insert(place, raw.into());
    }

    /// Typing into the amount field. Only characters that can appear in a
    /// plain decimal are taken.
    pub fn push_amount_char(&mut self, place: PlaceId, c: char) {
        if c.is_ascii_digit() || c == '.' {
            self.amounts.entry(place).or_default().push(c);
        }
    }

    pub fn pop_amount_char(&mut self, place: PlaceId) {
        if let Some(raw) = self.amounts.get_mut(&place) {
            raw.pop();
        }
    }

    /// Starts a deposit or withdraw on `place`.
    ///
    /// Returns `None` when nothing should be sent: no device, unknown place,
    /// an update already in flight for the place, or an invalid amount (the
    /// latter also raises the validation message).
    pub fn request_update(&mut self, place: PlaceId, direction: Direction) -> Option<Command> {
        let selection = self.selection.as_ref()?;
        if selection.detail == DetailState::NotFound
            || !self.places.iter().any(|p| p.place == place)
        {
            return None;
        }
        if self.updating.contains(&place) {
            debug!(%place, "update already in flight");
            return None;
        }
        let amount = match Amount::parse(self.amount(place)) {
            Ok(amount) => amount,
            Err(_) => {
                self.set_error(INVALID_AMOUNT_MESSAGE);
                return None;
            }
        };
        let command = Command::UpdateBalance {
            device_id: selection.device_id.clone(),
            place,
            delta: amount.delta(direction),
            ticket: selection.ticket,
        };
        self.updating.insert(place);
        self.error = None;
        let status = format!("{} {amount} on place {place}...", direction.label());
        self.set_status(status);
        Some(command)
    }

    /// Reconciles the outcome of an update started with `ticket`.
    /// Outcomes for a device that is no longer selected are dropped.
    pub fn update_finished(
        &mut self,
        ticket: Ticket,
        place: PlaceId,
        result: Result<BalanceUpdate, ApiError>,
    ) -> bool {
        let current = self.selection.as_ref().map(|s| s.ticket);
        if current != Some(ticket) {
            debug!(%place, "update outcome for previous selection dropped");
            return false;
        }
        self.updating.remove(&place);
        match result {
            Ok(update) => {
                if self
                    .selection
                    .as_ref()
                    .is_some_and(|s| s.detail == DetailState::Loading)
                {
                    self.echoed.insert(update.place, update.balances);
                }
                match self.places.iter_mut().find(|p| p.place == update.place) {
                    Some(existing) => existing.balances = update.balances,
                    None => warn!(place = %update.place, "update echo for unknown place"),
                }
                self.amounts.remove(&place);
                let currency = if update.currency.is_empty() {
                    self.places
                        .iter()
                        .find(|p| p.place == update.place)
                        .map(|p| p.currency.clone())
                        .unwrap_or_default()
                } else {
                    update.currency
                };
                let status = format!(
                    "Place {} balance: {:.2} {}",
                    update.place, update.balances, currency
                );
                self.set_status(status.trim_end());
            }
            Err(err) => {
                self.set_error(err.user_message());
                self.set_status(format!("Update on place {place} failed"));
            }
        }
        if !self.updating.is_empty() {
            let pending = self.updating.iter().sorted().join(", ");
            let status = format!("{} | updating place(s) {pending}", self.status);
            self.set_status(status);
        }
        true
    }
}

fn display_name<'a>(name: &'a str, id: &'a DeviceId) -> &'a str {
    if name.is_empty() { id.as_str() } else { name }
}
