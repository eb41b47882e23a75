mod cli;

use std::io;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells::Bash};
use itertools::Itertools;
use json::JsonValue;
use log::error;

use lx200::commands::{
    Focuser, FocusSpeed, Gps, HomeStatus, Library, Pec, Precision, Slew, Telescope,
};
use lx200::port::PortConfig;
use lx200::protocol::ProtocolClient;

use cli::{CalendarDate, Cli, ClockTime, Commands, FocusAction, HomeAction, PecAction, ReplyKind};

#[derive(Clone, Copy)]
enum OutputFormat {
    Plain,
    Json,
}

fn latin1_bytes(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| anyhow!("{:?} is not a Latin-1 character", c))
        })
        .collect()
}

fn port_config(cli: &Cli) -> Result<PortConfig> {
    Ok(PortConfig {
        port_name: cli.port.clone(),
        baud_rate: cli.baudrate,
        timeout: Duration::from_secs(cli.timeout),
        write_timeout: Duration::from_secs(cli.write_timeout),
        simulate: cli.simulate,
        simulated_reply: latin1_bytes(&cli.sim_reply)?,
        force: cli.force,
    })
}

fn pair(labels: [&str; 2], values: [f64; 2], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Plain => values.iter().map(|v| format!("{:.6}", v)).join(" "),
        OutputFormat::Json => {
            let mut object = JsonValue::new_object();
            for (label, value) in labels.iter().zip(values) {
                object[*label] = value.into();
            }
            json::stringify(object)
        }
    }
}

fn lines(values: &[String], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Plain => values.iter().join("\n"),
        OutputFormat::Json => json::stringify(values.to_vec()),
    }
}

fn flag(accepted: bool, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Plain => if accepted { "1" } else { "0" }.to_string(),
        OutputFormat::Json => json::stringify(accepted),
    }
}

fn cmd_goto(scope: &mut Telescope, ra: f64, dec: f64) -> Result<String> {
    if !scope.set_target_ra(ra)? {
        return Err(anyhow!("Target right ascension rejected"));
    }
    if !scope.set_target_dec(dec)? {
        return Err(anyhow!("Target declination rejected"));
    }
    match scope.slew_to_target()? {
        Slew::Started => Ok(String::new()),
        Slew::BelowHorizon(message) => Err(anyhow!("Object below horizon: {}", message)),
        Slew::AboveLimit(message) => Err(anyhow!("Object above higher limit: {}", message)),
    }
}

fn cmd_site(
    scope: &mut Telescope,
    location: Option<(f64, f64)>,
    fmt: OutputFormat,
) -> Result<String> {
    if let Some((latitude, longitude)) = location {
        if !scope.set_site_latitude(latitude)? {
            return Err(anyhow!("Site latitude rejected"));
        }
        if !scope.set_site_longitude(longitude)? {
            return Err(anyhow!("Site longitude rejected"));
        }
    }
    let latitude = scope.get_site_latitude()?;
    let longitude = scope.get_site_longitude()?;
    Ok(pair(["latitude", "longitude"], [latitude, longitude], fmt))
}

fn cmd_time(
    scope: &mut Telescope,
    local: Option<ClockTime>,
    date: Option<CalendarDate>,
    utc_offset: Option<f64>,
    fmt: OutputFormat,
) -> Result<String> {
    if let Some(offset) = utc_offset {
        if !scope.set_utc_offset(offset)? {
            return Err(anyhow!("UTC offset {} rejected", offset));
        }
    }
    if let Some(time) = local {
        if !scope.set_local_time(time.hour, time.minute, time.second)? {
            return Err(anyhow!("Local time rejected"));
        }
    }
    if let Some(date) = date {
        if !scope.change_date(date.month, date.day, date.year)? {
            return Err(anyhow!("Date rejected"));
        }
    }
    let times = [
        scope.get_date()?,
        scope.local_time()?,
        scope.sidereal_time()?,
        format!("{:+.1}", scope.get_utc_offset()?),
    ];
    Ok(lines(&times, fmt))
}

fn cmd_home(scope: &mut Telescope, action: HomeAction) -> Result<String> {
    match action {
        HomeAction::Store => scope.store_home()?,
        HomeAction::Align => scope.align_home()?,
        HomeAction::Park => scope.find_home()?,
        HomeAction::Status => {
            let status = match scope.home_status()? {
                HomeStatus::Failed => "failed",
                HomeStatus::Found => "found",
                HomeStatus::Searching => "searching",
            };
            return Ok(status.to_string());
        }
    }
    Ok(String::new())
}

fn cmd_raw(
    client: &mut ProtocolClient,
    mnemonic: &str,
    args: &[String],
    reply: ReplyKind,
    fmt: OutputFormat,
) -> Result<String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let result = match reply {
        ReplyKind::None => client.send_only(mnemonic, &args).map(|_| String::new()),
        ReplyKind::Bool => {
            let accepted = client.send_for_bool(mnemonic, &args)?;
            if let Some(e) = client.take_last_error() {
                return Err(e).with_context(|| format!("No answer to {}", mnemonic));
            }
            Ok(flag(accepted, fmt))
        }
        ReplyKind::String => client.send_for_string(mnemonic, &args),
        ReplyKind::Status => client.send_for_status(mnemonic, &args, b'0').map(|status| {
            let code = char::from(status.code).to_string();
            match status.message {
                Some(message) => lines(&[code, message], fmt),
                None => code,
            }
        }),
    };
    result.with_context(|| format!("Command {} failed", mnemonic))
}

fn run(client: &mut ProtocolClient, cli: &Cli, fmt: OutputFormat) -> Result<String> {
    let precision = if cli.high_precision {
        Precision::High
    } else {
        Precision::Low
    };
    let mut scope = Telescope::new(client, cli.retries).with_precision(precision);

    match &cli.command {
        Commands::Alignment => Ok(scope
            .alignment()?
            .map_or_else(|| "unknown".to_string(), |mode| mode.to_string())),
        Commands::SetAlignment { mode } => {
            scope.set_alignment_mode(*mode)?;
            Ok(String::new())
        }
        Commands::Position => {
            let ra = scope.get_ra()?;
            let dec = scope.get_dec()?;
            Ok(pair(["ra", "dec"], [ra, dec], fmt))
        }
        Commands::Altaz => {
            let altitude = scope.get_altitude()?;
            let azimuth = scope.get_azimuth()?;
            Ok(pair(["altitude", "azimuth"], [altitude, azimuth], fmt))
        }
        Commands::Goto { ra, dec } => cmd_goto(&mut scope, ra.0, dec.0),
        Commands::Abort => Ok(scope.abort_slew().map(|_| String::new())?),
        Commands::Sync => Ok(scope.sync()?),
        Commands::Move { direction, rate } => {
            if let Some(rate) = rate {
                scope.set_slew_rate(*rate)?;
            }
            Ok(scope.start_move(*direction).map(|_| String::new())?)
        }
        Commands::Stop { direction } => Ok(scope.stop_move(*direction).map(|_| String::new())?),
        Commands::Info => {
            let info = [
                scope.product_name()?,
                scope.firmware_version()?,
                scope.firmware_date()?,
                scope.firmware_time()?,
            ];
            Ok(lines(&info, fmt))
        }
        Commands::Time {
            local,
            date,
            utc_offset,
        } => cmd_time(&mut scope, *local, *date, *utc_offset, fmt),
        Commands::Home { action } => cmd_home(&mut scope, *action),
        Commands::Site {
            latitude,
            longitude,
        } => {
            let location = latitude.zip(*longitude).map(|(lat, long)| (lat.0, long.0));
            cmd_site(&mut scope, location, fmt)
        }
        Commands::SetBaud { rate } => {
            if !scope.set_baud_rate(*rate)? {
                return Err(anyhow!("Baud rate {} rejected", rate));
            }
            Ok(format!("Reconnect at {} bps", rate))
        }
        Commands::Focus { action } => {
            let mut focuser = Focuser::new(client);
            let outcome = match action {
                FocusAction::In => focuser.focus_in(),
                FocusAction::Out => focuser.focus_out(),
                FocusAction::Stop => focuser.stop(),
                FocusAction::Fast => focuser.set_speed(FocusSpeed::Fast),
                FocusAction::Slow => focuser.set_speed(FocusSpeed::Slow),
            };
            outcome.map(|_| String::new()).map_err(Into::into)
        }
        Commands::Messier { number } => {
            Library::new(client, cli.retries).select_messier(*number)?;
            Ok(String::new())
        }
        Commands::Ngc { number } => {
            Library::new(client, cli.retries).select_ngc(*number)?;
            Ok(String::new())
        }
        Commands::Object => Ok(Library::new(client, cli.retries).object_info()?),
        Commands::Pec { action } => {
            let mut pec = Pec::new(client)?;
            match action {
                PecAction::Toggle => pec.toggle()?,
                PecAction::RaOn => pec.set_ra(true)?,
                PecAction::RaOff => pec.set_ra(false)?,
                PecAction::DecOn => pec.set_dec(true)?,
                PecAction::DecOff => pec.set_dec(false)?,
            }
            Ok(String::new())
        }
        Commands::Restart => {
            Gps::new(client, cli.retries).restart()?;
            Ok("Reconnect once the handbox is back".to_string())
        }
        Commands::GpsTime => {
            if !Gps::new(client, cli.retries).update_time()? {
                return Err(anyhow!("GPS time update failed"));
            }
            Ok(String::new())
        }
        Commands::Raw {
            mnemonic,
            args,
            reply,
        } => cmd_raw(client, mnemonic, args, *reply, fmt),
    }
}

fn do_main() -> Result<String> {
    if std::env::var("GENERATE_COMPLETION").is_ok() {
        generate(Bash, &mut Cli::command(), "lx200-tool", &mut io::stdout());

        return Ok(String::default());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let fmt = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    let config = port_config(&cli)?;
    let mut client = ProtocolClient::new();
    client
        .connect(&config)
        .with_context(|| format!("Failed to connect to {}", config.port_name))?;

    let result = run(&mut client, &cli, fmt);
    client.close()?;
    result
}

fn main() {
    match do_main() {
        Ok(s) => println!("{}", s),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
