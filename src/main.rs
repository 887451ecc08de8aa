//! Interactive serial terminal. Lists the host's serial ports, asks for a port and a
//! baud rate, then prints everything received while sending each entered line,
//! null terminated, until `q` is entered.

use std::process::ExitCode;
use std::time::SystemTime;

use fern::colors::{Color, ColoredLevelConfig};
use log::{debug, error, info, LevelFilter};
use tokio::io::{AsyncBufReadExt, BufReader};

use uart_terminal::api::{SerialSession, TxLoopExit};
use uart_terminal::console;
use uart_terminal::errors::Error;
use uart_terminal::types::SessionConfig;
use uart_terminal::utils::{self, LOG_LEVEL_ENV};

fn setup_logger() -> Result<(), fern::InitError> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}

async fn run() -> Result<(), Error> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let ports = utils::stream::available_serial_ports()?;
    console::print_port_list(&mut stdout, &ports).await?;

    let port_name = console::prompt_port_selection(&mut lines, &mut stdout, &ports).await?;
    let baud_rate = console::prompt_baud_rate(&mut lines, &mut stdout).await?;
    let config = SessionConfig::new(port_name, baud_rate)?;

    let Some(serial_stream) = console::open_or_deny(&config, &mut stdout).await? else {
        return Ok(());
    };

    console::print_usage_banner(&mut stdout).await?;

    let mut session = SerialSession::new().connect(serial_stream, tokio::io::stdout());
    let tx_result = session.run_tx_loop(&mut lines).await;

    // The port is released on every path, after the receive task has been joined
    let rx_result = session.disconnect().await;

    match tx_result {
        Ok(TxLoopExit::Quit) | Ok(TxLoopExit::InputClosed) => info!("Session ended"),
        Ok(TxLoopExit::ReceiverStopped) => debug!("Session ended by receive task"),
        Err(e) => {
            if let Err(rx_error) = &rx_result {
                error!("Receive task also failed: {}", rx_error);
            }
            return Err(e);
        }
    }

    rx_result.map(|_| ())
}

fn main() -> ExitCode {
    if let Err(e) = setup_logger() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run());

    // A stdin read left pending by an early exit must not hold the process open
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::InputClosed) => {
            info!("Input closed before the session started");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("\nError: {e}");
            ExitCode::FAILURE
        }
    }
}
