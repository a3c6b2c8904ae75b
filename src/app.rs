use crate::ui::{
    self,
    InputEventReceiver,
    UserEvent,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use device_console::{
    amount::Direction,
    api::DeviceApi,
    config::AppConfig,
    console::Console,
    worker::{
        ApiEvent,
        CommandRunner,
    },
};
use tokio::sync::mpsc;
use tracing::{
    info,
    warn,
};

pub async fn run_app(config: AppConfig) -> Result<()> {
    let api = DeviceApi::new(&config.api_url)
        .wrap_err_with(|| format!("invalid api url {:?}", config.api_url))?;
    let (runner, api_events) = CommandRunner::new(api);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        Console::new(),
        runner,
        api_events,
        &mut ui_state,
        &mut input_events,
    )
    .await;
    ui::terminal_exit()?;
    info!("UI closed");
    res
}

async fn run_loop(
    mut console: Console,
    runner: CommandRunner<DeviceApi>,
    mut api_events: mpsc::UnboundedReceiver<ApiEvent>,
    ui_state: &mut ui::UiState,
    input_events: &mut InputEventReceiver,
) -> Result<()> {
    runner.run(console.load_devices());
    ui::draw(ui_state, &console).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = api_events.recv() => {
                let Some(event) = maybe_event else {
                    warn!("api event channel closed");
                    break;
                };
                if event.apply(&mut console) {
                    ui::draw(ui_state, &console).wrap_err("draw after api event failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            raw = ui::next_raw_event(input_events) => {
                let raw = raw?;
                let Some(event) = ui::interpret_event(ui_state, &console, raw) else {
                    continue;
                };
                match event {
                    UserEvent::Quit => break,
                    UserEvent::Redraw => {}
                    UserEvent::Refresh => runner.run_all(console.refresh()),
                    UserEvent::DismissError => console.dismiss_error(),
                    UserEvent::SelectDevice(device_id) => {
                        ui_state.reset_place_cursor();
                        runner.run(console.select_device(device_id));
                    }
                    UserEvent::AmountChar(place, c) => console.push_amount_char(place, c),
                    UserEvent::AmountBackspace(place) => console.pop_amount_char(place),
                    UserEvent::Deposit(place) => {
                        if let Some(command) = console.request_update(place, Direction::Deposit) {
                            runner.run(command);
                        }
                    }
                    UserEvent::Withdraw(place) => {
                        if let Some(command) = console.request_update(place, Direction::Withdraw) {
                            runner.run(command);
                        }
                    }
                }
                ui::draw(ui_state, &console).wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}
